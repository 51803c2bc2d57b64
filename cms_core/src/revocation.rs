//! Session revocation signal.
//!
//! When the backend answers a call with the revocation message, the API
//! client publishes one [`RevocationEvent`] on a [`RevocationChannel`]. The
//! top-level layout subscribes and forces a logout. The first revocation wins:
//! later ones are dropped until the channel is re-armed by a fresh login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

/// Error message the backend sends when a user's access is revoked.
///
/// Matched by exact string equality.
pub const DEFAULT_REVOKED_MESSAGE: &str = "Access revoked";

/// Structured error code that also marks a revocation.
pub const REVOKED_CODE: &str = "ACCESS_REVOKED";

/// Returns true when an API error body marks the session as revoked.
pub fn is_revocation(message: Option<&str>, code: Option<&str>, expected_message: &str) -> bool {
    message == Some(expected_message) || code == Some(REVOKED_CODE)
}

/// Payload broadcast when the backend revokes the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    /// HTTP status of the call that carried the revocation.
    pub status: u16,
    /// Path of the call that carried the revocation.
    pub path: String,
    pub message: String,
}

impl RevocationEvent {
    pub fn new(status: u16, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            status,
            path: path.into(),
            message: message.into(),
        }
    }
}

struct Inner {
    tx: broadcast::Sender<RevocationEvent>,
    fired: AtomicBool,
}

/// One-shot, fire-and-forget revocation broadcast.
#[derive(Clone)]
pub struct RevocationChannel {
    inner: Arc<Inner>,
}

impl RevocationChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                tx,
                fired: AtomicBool::new(false),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RevocationEvent> {
        self.inner.tx.subscribe()
    }

    /// Publishes a revocation. Returns `false` if one was already published.
    pub fn signal(&self, event: RevocationEvent) -> bool {
        if self.inner.fired.swap(true, Ordering::SeqCst) {
            debug!(path = %event.path, "Revocation already signalled, dropping");
            return false;
        }

        warn!(
            event_id = %event.event_id,
            status = event.status,
            path = %event.path,
            "Session access revoked by server"
        );
        // No subscribers is fine: nobody is left to log out.
        let _ = self.inner.tx.send(event);
        true
    }

    pub fn is_revoked(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Allows the next revocation to be published again.
    pub fn rearm(&self) {
        self.inner.fired.store(false, Ordering::SeqCst);
    }
}

impl Default for RevocationChannel {
    fn default() -> Self {
        Self::new(16)
    }
}

impl std::fmt::Debug for RevocationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationChannel")
            .field("revoked", &self.is_revoked())
            .field("subscribers", &self.inner.tx.receiver_count())
            .finish()
    }
}
