use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use cms_core::RevocationEvent;
use futures::{stream::Stream, StreamExt};
use serde::Serialize;
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::BroadcastStream;
use tracing::error;

use crate::state::AppState;

/// SSE event name used for revocations
pub const REVOKED_EVENT: &str = "revoked";

/// Payload pushed to the browser when the session is revoked.
#[derive(Debug, Clone, Serialize)]
pub struct RevocationNotice {
    #[serde(flatten)]
    pub event: RevocationEvent,
    /// Where the browser should navigate
    pub redirect: String,
}

/// Server-Sent Events handler streaming revocation events
pub async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.revocations.subscribe();
    let redirect = state.login_path().to_string();

    let stream = BroadcastStream::new(rx).map(move |msg| match msg {
        Ok(event) => {
            let notice = RevocationNotice {
                event,
                redirect: redirect.clone(),
            };
            match serde_json::to_string(&notice) {
                Ok(json) => Ok(Event::default().event(REVOKED_EVENT).data(json)),
                Err(e) => {
                    error!("Failed to serialize revocation: {}", e);
                    Ok(Event::default().comment("Error serializing revocation"))
                }
            }
        }
        Err(e) => {
            error!("Error receiving from broadcast: {}", e);
            Ok(Event::default().comment("Error receiving revocation"))
        }
    });

    Sse::new(stream)
}
