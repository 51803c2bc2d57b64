use cms_core::{
    ApiClient, ApiResult, ClientConfig, CredentialStore, RevocationChannel, SessionContext,
};
use std::sync::Arc;

/// Capacity of the revocation broadcast channel
const REVOCATION_CAPACITY: usize = 16;

/// Shared application state
pub struct AppState {
    /// Current user's session, shared by reference with every handler
    pub session: Arc<SessionContext>,

    /// Backend API client
    pub client: ApiClient,

    /// Revocation events published by the client
    pub revocations: RevocationChannel,
}

impl AppState {
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> ApiResult<Self> {
        let revocations = RevocationChannel::new(REVOCATION_CAPACITY);
        let client = ApiClient::new(config, credentials.clone(), revocations.clone())?;
        Ok(Self {
            session: Arc::new(SessionContext::new(credentials)),
            client,
            revocations,
        })
    }

    /// Where signed-out users are sent.
    pub fn login_path(&self) -> &str {
        &self.client.config().login_path
    }
}
