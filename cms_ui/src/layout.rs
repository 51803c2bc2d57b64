use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::state::AppState;

/// Starts the top-level layout task: every revocation event forces a logout.
///
/// The subscription is taken before the task is spawned, so events published
/// right after this call returns are not missed.
pub fn spawn_revocation_listener(state: Arc<AppState>) -> JoinHandle<()> {
    let mut rx = state.revocations.subscribe();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    warn!(
                        event_id = %event.event_id,
                        path = %event.path,
                        "Revocation received, forcing logout"
                    );
                    state.session.force_logout();
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Revocation listener lagged, forcing logout");
                    state.session.force_logout();
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Revocation listener stopped");
    })
}
