//! The `initialize` / `notifications/initialized` lifecycle.

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{McpError, Result};

/// Lifecycle state of a client's handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// `initialize` has not been sent.
    Uninitialized,
    /// `initialize` was sent and has not completed successfully.
    Initializing,
    /// The handshake completed; the session is usable.
    Ready,
}

impl std::fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// What the caller should do after [`Handshake::begin`].
#[derive(Debug, Clone, PartialEq)]
pub enum Begin {
    /// Send `initialize`.
    Start,
    /// Already ready; here is the stored `initialize` result.
    AlreadyReady(Value),
}

#[derive(Debug)]
struct Inner {
    state: HandshakeState,
    result: Option<Value>,
}

/// Handshake state machine: Uninitialized → Initializing → Ready.
///
/// There is no rollback: a failed handshake leaves the machine in
/// `Initializing` and the client must be discarded.
#[derive(Debug)]
pub struct Handshake {
    inner: Mutex<Inner>,
}

impl Default for Handshake {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: HandshakeState::Uninitialized,
                result: None,
            }),
        }
    }
}

impl Handshake {
    /// Create a machine in the `Uninitialized` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.inner.lock().state
    }

    /// Enter `Initializing`.
    pub fn begin(&self) -> Result<Begin> {
        let mut inner = self.inner.lock();
        match inner.state {
            HandshakeState::Uninitialized => {
                inner.state = HandshakeState::Initializing;
                Ok(Begin::Start)
            }
            HandshakeState::Ready => Ok(Begin::AlreadyReady(
                inner.result.clone().unwrap_or(Value::Null),
            )),
            HandshakeState::Initializing => Err(McpError::handshake(
                "initialize already attempted on this client; create a new client",
            )),
        }
    }

    /// Move from `Initializing` to `Ready`, storing the `initialize` result.
    pub fn complete(&self, result: Value) {
        let mut inner = self.inner.lock();
        debug_assert_eq!(inner.state, HandshakeState::Initializing);
        inner.state = HandshakeState::Ready;
        inner.result = Some(result);
    }

    /// The stored `initialize` result, once ready.
    pub fn result(&self) -> Option<Value> {
        self.inner.lock().result.clone()
    }
}
