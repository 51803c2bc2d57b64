//! Session context.
//!
//! [`SessionContext`] is an explicit object shared by reference between the
//! components that consult permissions. Its state changes only through
//! [`SessionContext::refresh`] (and the logout operations); everything else
//! reads an immutable [`Session`] snapshot synchronously.

use crate::credentials::CredentialStore;
use crate::error::{ApiError, ApiResult};
use crate::permission::{has_permission, PermissionSet, Requirement};
use crate::role::Profile;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Anything able to fetch the current user's profile.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self) -> ApiResult<Profile>;
}

/// Role and permissions of the authenticated user, fetched once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub role_name: Option<String>,
    pub permissions: Option<PermissionSet>,
    pub established_at: DateTime<Utc>,
}

impl Session {
    pub fn from_profile(profile: Profile) -> Self {
        let (role_name, permissions) = match profile.role {
            Some(role) => (Some(role.name), Some(role.permissions)),
            None => (None, None),
        };
        Self {
            id: Uuid::new_v4(),
            role_name,
            permissions,
            established_at: Utc::now(),
        }
    }

    pub fn can(&self, required: impl Into<Requirement>) -> bool {
        has_permission(self.permissions.as_ref(), required)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "session", rename_all = "snake_case")]
pub enum SessionState {
    /// The profile has not been fetched yet.
    Loading,
    Active(Session),
    SignedOut,
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn permissions(&self) -> Option<&PermissionSet> {
        self.session().and_then(|s| s.permissions.as_ref())
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_signed_out(&self) -> bool {
        matches!(self, SessionState::SignedOut)
    }
}

/// Current state plus a counter bumped by every sign-out and reset, so a
/// fetch started before one of those can tell its result is stale.
struct Slot {
    state: SessionState,
    generation: u64,
}

pub struct SessionContext {
    slot: RwLock<Slot>,
    credentials: Arc<dyn CredentialStore>,
}

impl SessionContext {
    /// Creates a context in the `Loading` state.
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            slot: RwLock::new(Slot {
                state: SessionState::Loading,
                generation: 0,
            }),
            credentials,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.slot.read().state.clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.slot.read().state.session().cloned()
    }

    pub fn permissions(&self) -> Option<PermissionSet> {
        self.slot.read().state.permissions().cloned()
    }

    /// Synchronous permission check against the current snapshot.
    pub fn can(&self, required: impl Into<Requirement>) -> bool {
        has_permission(self.slot.read().state.permissions(), required)
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Fetches the profile and replaces the session.
    ///
    /// A revocation signs the session out. Other failures restore the
    /// previous state, except that a failed first load becomes `SignedOut`.
    /// A result arriving after a logout or reset is discarded with
    /// [`ApiError::NotAuthenticated`].
    pub async fn refresh(&self, source: &dyn ProfileSource) -> ApiResult<Session> {
        let (previous, generation) = {
            let slot = self.slot.read();
            (slot.state.clone(), slot.generation)
        };

        match source.fetch_profile().await {
            Ok(profile) => {
                let session = Session::from_profile(profile);
                let mut slot = self.slot.write();
                if slot.generation != generation {
                    warn!(session_id = %session.id, "Discarding profile fetched before sign-out");
                    return Err(ApiError::NotAuthenticated);
                }
                slot.state = SessionState::Active(session.clone());
                info!(
                    session_id = %session.id,
                    role = ?session.role_name,
                    "Session established"
                );
                Ok(session)
            }
            Err(err) if err.is_revoked() => {
                warn!("Profile fetch reported revoked access");
                self.force_logout();
                Err(err)
            }
            Err(err) => {
                error!("Profile fetch failed: {}", err);
                let mut slot = self.slot.write();
                if slot.generation == generation {
                    slot.state = match previous {
                        SessionState::Loading => SessionState::SignedOut,
                        other => other,
                    };
                }
                Err(err)
            }
        }
    }

    /// Returns the cached session, fetching the profile only when none exists.
    pub async fn ensure_loaded(&self, source: &dyn ProfileSource) -> ApiResult<Session> {
        if let Some(session) = self.session() {
            return Ok(session);
        }
        self.refresh(source).await
    }

    /// User-initiated logout.
    pub fn logout(&self) -> ApiResult<()> {
        self.credentials.clear().map_err(ApiError::from)?;
        self.sign_out();
        info!("Logged out");
        Ok(())
    }

    /// Logout forced by a revocation. Never fails: a credential store error
    /// is logged and the session is signed out regardless.
    pub fn force_logout(&self) {
        if let Err(e) = self.credentials.clear() {
            error!("Failed to clear credentials: {}", e);
        }
        self.sign_out();
        warn!("Session forcibly signed out");
    }

    /// Puts the context back into `Loading`, e.g. after a new login.
    pub fn reset(&self) {
        self.replace(SessionState::Loading);
    }

    fn sign_out(&self) {
        self.replace(SessionState::SignedOut);
    }

    fn replace(&self, state: SessionState) {
        let mut slot = self.slot.write();
        slot.state = state;
        slot.generation += 1;
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &self.slot.read().state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Credentials, InMemoryCredentialStore};
    use crate::permission::Capability;
    use crate::role::Role;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    enum Reply {
        Profile(Profile),
        Revoked,
        Failure,
    }

    struct StubSource {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProfileSource for StubSource {
        async fn fetch_profile(&self) -> ApiResult<Profile> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Profile(profile) => Ok(profile.clone()),
                Reply::Revoked => Err(ApiError::Revoked("Access revoked".to_string())),
                Reply::Failure => Err(ApiError::Api {
                    status: 500,
                    message: "Internal error".to_string(),
                }),
            }
        }
    }

    /// Holds the fetch open until `release` is notified.
    struct GatedSource {
        profile: Profile,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ProfileSource for GatedSource {
        async fn fetch_profile(&self) -> ApiResult<Profile> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(self.profile.clone())
        }
    }

    fn editor() -> Profile {
        Profile::with_role(Role::new(
            "editor",
            PermissionSet::from_granted([Capability::ContentView, Capability::ContentEdit]),
        ))
    }

    fn context() -> (SessionContext, Arc<InMemoryCredentialStore>) {
        let store = Arc::new(InMemoryCredentialStore::with_token("secret"));
        (SessionContext::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_starts_loading_and_denies() {
        let (ctx, _) = context();
        assert!(ctx.snapshot().is_loading());
        assert!(!ctx.can(Capability::ContentView));
    }

    #[tokio::test]
    async fn test_refresh_establishes_session() {
        let (ctx, _) = context();
        let source = StubSource::new(Reply::Profile(editor()));

        let session = ctx.refresh(&source).await.unwrap();
        assert_eq!(session.role_name.as_deref(), Some("editor"));
        assert!(ctx.can(Capability::ContentEdit));
        assert!(!ctx.can(Capability::UsersView));
        assert!(ctx.can([Capability::UsersView, Capability::ContentView]));
    }

    #[tokio::test]
    async fn test_ensure_loaded_fetches_once() {
        let (ctx, _) = context();
        let source = StubSource::new(Reply::Profile(editor()));

        let first = ctx.ensure_loaded(&source).await.unwrap();
        let second = ctx.ensure_loaded(&source).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_first_load_signs_out() {
        let (ctx, store) = context();
        let source = StubSource::new(Reply::Failure);

        assert!(ctx.refresh(&source).await.is_err());
        assert!(ctx.snapshot().is_signed_out());
        // Not a revocation: credentials survive.
        assert!(store.load().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_active_session() {
        let (ctx, _) = context();
        ctx.refresh(&StubSource::new(Reply::Profile(editor())))
            .await
            .unwrap();

        assert!(ctx.refresh(&StubSource::new(Reply::Failure)).await.is_err());
        assert!(ctx.can(Capability::ContentView));
    }

    #[tokio::test]
    async fn test_revoked_refresh_clears_credentials() {
        let (ctx, store) = context();
        ctx.refresh(&StubSource::new(Reply::Profile(editor())))
            .await
            .unwrap();

        let err = ctx
            .refresh(&StubSource::new(Reply::Revoked))
            .await
            .unwrap_err();
        assert!(err.is_revoked());
        assert!(ctx.snapshot().is_signed_out());
        assert!(store.load().unwrap().is_none());
        assert!(!ctx.can(Capability::ContentView));
    }

    #[tokio::test]
    async fn test_logout_and_reset() {
        let (ctx, store) = context();
        ctx.refresh(&StubSource::new(Reply::Profile(editor())))
            .await
            .unwrap();

        ctx.logout().unwrap();
        assert!(ctx.snapshot().is_signed_out());
        assert!(store.load().unwrap().is_none());

        store.save(&Credentials::new("fresh")).unwrap();
        ctx.reset();
        assert!(ctx.snapshot().is_loading());
    }

    #[tokio::test]
    async fn test_forced_logout_during_fetch_wins() {
        let (ctx, store) = context();
        let source = GatedSource {
            profile: editor(),
            entered: Notify::new(),
            release: Notify::new(),
        };

        let (result, _) = tokio::join!(ctx.refresh(&source), async {
            source.entered.notified().await;
            ctx.force_logout();
            source.release.notify_one();
        });

        assert!(matches!(result, Err(ApiError::NotAuthenticated)));
        assert!(ctx.snapshot().is_signed_out());
        assert!(store.load().unwrap().is_none());
        assert!(!ctx.can(Capability::ContentView));
    }

    #[tokio::test]
    async fn test_refresh_after_reset_installs_session() {
        let (ctx, _) = context();
        ctx.force_logout();
        ctx.reset();

        ctx.refresh(&StubSource::new(Reply::Profile(editor())))
            .await
            .unwrap();
        assert!(ctx.can(Capability::ContentView));
    }

    #[test]
    fn test_refresh_outside_runtime() {
        let (ctx, _) = context();
        let source = StubSource::new(Reply::Profile(editor()));
        tokio_test::block_on(ctx.refresh(&source)).unwrap();
        assert!(ctx.session().is_some());
    }

    #[test]
    fn test_roleless_session_denies() {
        let session = Session::from_profile(Profile {
            role: None,
            user: None,
        });
        assert!(!session.can(Capability::ContentView));
    }

    #[test]
    fn test_state_serialization() {
        let value = serde_json::to_value(SessionState::Loading).unwrap();
        assert_eq!(value, serde_json::json!({ "state": "loading" }));
    }
}
