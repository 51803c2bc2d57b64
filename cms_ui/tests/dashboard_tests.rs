use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use cms_core::{
    ApiResult, Capability, ClientConfig, CredentialStore, InMemoryCredentialStore, PermissionSet,
    Profile, ProfileSource, RevocationEvent, Role,
};
use cms_ui::{app, layout::spawn_revocation_listener, state::AppState};
use http_body_util::BodyExt;
use std::{sync::Arc, time::Duration};
use tokio::time::{sleep, timeout};
use tower::ServiceExt;

struct FixedProfile(Profile);

#[async_trait]
impl ProfileSource for FixedProfile {
    async fn fetch_profile(&self) -> ApiResult<Profile> {
        Ok(self.0.clone())
    }
}

fn setup_state() -> (Arc<AppState>, Arc<InMemoryCredentialStore>) {
    let store = Arc::new(InMemoryCredentialStore::with_token("secret"));
    // Nothing listens on port 9; no test here reaches the backend.
    let state = AppState::new(ClientConfig::new("http://127.0.0.1:9"), store.clone()).unwrap();
    (Arc::new(state), store)
}

async fn sign_in(state: &AppState, permissions: PermissionSet) {
    let source = FixedProfile(Profile::with_role(Role::new("editor", permissions)));
    state.session.refresh(&source).await.unwrap();
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, location, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_ping_endpoint() {
    let (state, _) = setup_state();
    let (status, _, body) = get(app(state), "/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "pong");
}

#[tokio::test]
async fn test_loading_dashboard_renders_no_guarded_elements() {
    let (state, _) = setup_state();
    let (status, _, body) = get(app(state), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<nav><ul></ul></nav>"));
    assert!(!body.contains("data-action"));
}

#[tokio::test]
async fn test_editor_dashboard() {
    let (state, _) = setup_state();
    sign_in(
        &state,
        PermissionSet::from_granted([Capability::ContentView, Capability::MediaView]),
    )
    .await;

    let (status, _, body) = get(app(state), "/").await;
    assert_eq!(status, StatusCode::OK);

    assert!(body.contains("<a href=\"/content\">Content</a>"));
    assert!(body.contains("<a href=\"/media\">Media</a>"));
    assert!(body.contains("<a href=\"/\">Overview</a>"));
    assert!(!body.contains("href=\"/users\""));
    assert!(!body.contains("href=\"/settings\""));

    // Lock: disabled button plus indicator.
    assert!(body.contains("guard-locked"));
    assert!(body.contains("data-action=\"users.create\" disabled"));
    // Disable: disabled button without indicator.
    assert!(body.contains("data-action=\"media.upload\" disabled"));
}

#[tokio::test]
async fn test_signed_out_redirects_to_login() {
    let (state, _) = setup_state();
    state.session.force_logout();

    let (status, location, _) = get(app(state), "/").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn test_login_page_explains_reauthentication() {
    let (state, _) = setup_state();
    let (status, _, body) = get(app(state), "/login").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("cms_cli login --token &lt;token&gt;"));
    assert!(body.contains("CMS_API_TOKEN"));
    assert!(body.contains("<a href=\"/\">"));
}

#[tokio::test]
async fn test_session_snapshot_endpoint() {
    let (state, _) = setup_state();
    sign_in(&state, PermissionSet::wildcard()).await;

    let (status, _, body) = get(app(state), "/api/session").await;
    assert_eq!(status, StatusCode::OK);

    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["data"]["state"], "active");
    assert_eq!(value["data"]["session"]["role_name"], "editor");
    assert_eq!(value["data"]["session"]["permissions"]["all"], true);
}

#[tokio::test]
async fn test_refresh_without_credentials_is_unauthorized() {
    let (state, store) = setup_state();
    store.clear().unwrap();

    let response = app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/session/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(state.session.snapshot().is_signed_out());
}

#[tokio::test]
async fn test_logout_clears_credentials() {
    let (state, store) = setup_state();
    sign_in(&state, PermissionSet::wildcard()).await;

    let response = app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(state.session.snapshot().is_signed_out());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_revocation_streams_and_forces_logout() {
    let (state, store) = setup_state();
    sign_in(&state, PermissionSet::wildcard()).await;
    let _listener = spawn_revocation_listener(state.clone());

    let response = app(state.clone())
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body();

    assert!(state
        .revocations
        .signal(RevocationEvent::new(403, "/api/media", "Access revoked")));

    let frame = timeout(Duration::from_secs(1), body.frame())
        .await
        .expect("Timeout waiting for SSE frame")
        .expect("Stream ended")
        .unwrap();
    let data = frame.into_data().unwrap();
    let text = String::from_utf8(data.to_vec()).unwrap();
    assert!(text.contains("event: revoked"), "got: {text}");
    assert!(text.contains("\"redirect\":\"/login\""), "got: {text}");
    assert!(text.contains("/api/media"), "got: {text}");

    timeout(Duration::from_secs(1), async {
        while !state.session.snapshot().is_signed_out() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Session was not signed out");
    assert!(store.load().unwrap().is_none());
}
