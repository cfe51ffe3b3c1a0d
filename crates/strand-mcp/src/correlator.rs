//! Request/response correlation.
//!
//! Every outbound request gets a fresh identifier and a pending entry. Responses
//! may arrive on any exchange and in any order; they are matched to their
//! entry purely by identifier.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{McpError, Result};
use crate::protocol::JsonRpcResponse;

type Completion = oneshot::Sender<Result<Value>>;

/// Outcome of routing a response through the correlator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The response settled the pending request with this id.
    Resolved(u64),
    /// No pending request matched; the response was dropped.
    Unmatched(Option<u64>),
}

/// Table of in-flight requests keyed by identifier.
#[derive(Debug, Default)]
pub struct Correlator {
    /// Last identifier handed out. Starts at 0; the first id is 1.
    last_id: AtomicU64,
    pending: Mutex<HashMap<u64, Completion>>,
}

impl Correlator {
    /// Create an empty correlator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next request identifier.
    pub fn allocate_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The identifier the next call to [`allocate_id`](Self::allocate_id) will return.
    pub fn peek_next_id(&self) -> u64 {
        self.last_id.load(Ordering::SeqCst) + 1
    }

    /// Record a pending entry for `id`.
    pub fn register(&self, id: u64) -> PendingRequest<'_> {
        let (tx, rx) = oneshot::channel();
        if self.pending.lock().insert(id, tx).is_some() {
            tracing::warn!(id, "replaced an existing pending request");
        }
        PendingRequest {
            id,
            rx,
            correlator: self,
        }
    }

    /// Settle the pending entry matching `response.id`.
    pub fn resolve_response(&self, response: JsonRpcResponse) -> Resolution {
        let Some(id) = response.id else {
            tracing::warn!("dropping response without id");
            return Resolution::Unmatched(None);
        };

        let Some(tx) = self.pending.lock().remove(&id) else {
            tracing::warn!(id, "dropping response for unknown request");
            return Resolution::Unmatched(Some(id));
        };

        let outcome = response
            .into_result()
            .map_err(|e| McpError::server_error(e.code, e.message, e.data));
        if tx.send(outcome).is_err() {
            tracing::debug!(id, "pending request receiver dropped");
        }
        Resolution::Resolved(id)
    }

    /// Remove the entry for `id` without completing it.
    pub fn cancel(&self, id: u64) -> bool {
        self.pending.lock().remove(&id).is_some()
    }

    /// Drop every pending entry without resolving it.
    ///
    /// Waiters observe the dropped sender as [`McpError::ConnectionClosed`].
    pub fn abandon_all(&self) -> usize {
        let abandoned: Vec<_> = self.pending.lock().drain().collect();
        abandoned.len()
    }

    /// Number of requests still awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether a request with `id` is still pending.
    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.lock().contains_key(&id)
    }
}

/// The caller's side of a pending entry.
#[derive(Debug)]
pub struct PendingRequest<'a> {
    id: u64,
    rx: oneshot::Receiver<Result<Value>>,
    correlator: &'a Correlator,
}

impl PendingRequest<'_> {
    /// Identifier of the request.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the matching response.
    ///
    /// With a deadline, an unanswered request is removed from the table and
    /// fails with [`McpError::Timeout`].
    pub async fn wait(mut self, deadline: Option<Duration>) -> Result<Value> {
        let id = self.id;
        let received = match deadline {
            Some(limit) => match tokio::time::timeout(limit, &mut self.rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.correlator.cancel(id);
                    tracing::warn!(id, timeout_ms = limit.as_millis() as u64, "request timed out");
                    return Err(McpError::Timeout { id });
                }
            },
            None => (&mut self.rx).await,
        };
        received.unwrap_or(Err(McpError::ConnectionClosed))
    }
}

impl Drop for PendingRequest<'_> {
    /// A caller that stops waiting takes its entry with it.
    fn drop(&mut self) {
        if self.correlator.cancel(self.id) {
            tracing::debug!(id = self.id, "pending request dropped before its response");
        }
    }
}
