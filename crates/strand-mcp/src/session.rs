//! Session affinity.
//!
//! A server may assign a session id through the `mcp-session-id` response
//! header. The tracker holds at most one id per client and attaches it to every
//! later exchange.

use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::{McpError, Result};

/// Header carrying the session id (matched case-insensitively).
pub const SESSION_HEADER: &str = "mcp-session-id";

/// What to do when a response carries a session id different from the held one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionConflictPolicy {
    /// Keep the first id and log the conflict.
    #[default]
    KeepFirst,
    /// Adopt the newest id.
    Overwrite,
    /// Keep the first id and fail the exchange.
    Reject,
}

/// Tracks the session id for one client instance.
#[derive(Debug, Default)]
pub struct SessionTracker {
    session_id: RwLock<Option<String>>,
    policy: SessionConflictPolicy,
}

impl SessionTracker {
    /// Create a tracker with the given conflict policy.
    pub fn new(policy: SessionConflictPolicy) -> Self {
        Self {
            session_id: RwLock::new(None),
            policy,
        }
    }

    /// The configured conflict policy.
    pub fn policy(&self) -> SessionConflictPolicy {
        self.policy
    }

    /// The session id currently held.
    pub fn current(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    /// Inspect response headers and capture the session id.
    pub fn observe(&self, headers: &HeaderMap) -> Result<()> {
        let Some(value) = headers.get(SESSION_HEADER) else {
            return Ok(());
        };
        let received = value
            .to_str()
            .map_err(|_| McpError::malformed("session id header is not valid ASCII"))?
            .trim();
        if received.is_empty() {
            return Ok(());
        }

        let mut held = self.session_id.write();
        let previous = held.clone();
        match previous.as_deref() {
            None => {
                tracing::debug!(session_id = %received, "session established");
                *held = Some(received.to_string());
                Ok(())
            }
            Some(current) if current == received => Ok(()),
            Some(current) => match self.policy {
                SessionConflictPolicy::KeepFirst => {
                    tracing::warn!(
                        held = %current,
                        received = %received,
                        "ignoring conflicting session id"
                    );
                    Ok(())
                }
                SessionConflictPolicy::Overwrite => {
                    tracing::debug!(
                        previous = %current,
                        session_id = %received,
                        "session id replaced"
                    );
                    *held = Some(received.to_string());
                    Ok(())
                }
                SessionConflictPolicy::Reject => Err(McpError::SessionConflict {
                    held: current.to_string(),
                    received: received.to_string(),
                }),
            },
        }
    }

    /// Add the session header to an outbound header set, if a session is held.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Some(id) = self.session_id.read().as_deref() {
            match HeaderValue::from_str(id) {
                Ok(value) => {
                    headers.insert(SESSION_HEADER, value);
                }
                Err(_) => tracing::warn!(session_id = %id, "session id is not a valid header"),
            }
        }
    }

    /// Forget the held session id.
    pub fn clear(&self) {
        self.session_id.write().take();
    }
}
