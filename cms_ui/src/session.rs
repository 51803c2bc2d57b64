use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    Json,
};
use cms_core::{Session, SessionState};
use std::sync::Arc;
use tracing::info;

use crate::error::{ApiResponse, UiError};
use crate::state::AppState;

/// Current session snapshot.
pub async fn session_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SessionState>> {
    Json(ApiResponse::success(state.session.snapshot()))
}

/// Re-fetches the profile. A successful fetch starts a new session, so the
/// revocation signal is re-armed.
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Session>>, UiError> {
    let session = state.session.refresh(&state.client).await?;
    state.revocations.rearm();
    info!(session_id = %session.id, "Session refreshed");
    Ok(Json(ApiResponse::success(session)))
}

pub async fn logout_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, UiError> {
    state.session.logout()?;
    Ok(Redirect::to(state.login_path()))
}
