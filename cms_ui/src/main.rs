use anyhow::Context;
use cms_core::{
    ClientConfig, CredentialStore, Credentials, FileCredentialStore, InMemoryCredentialStore,
};
use cms_ui::{app, layout::spawn_revocation_listener, state::AppState};
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Configuration file, overridable with CMS_UI_CONFIG
const DEFAULT_CONFIG_PATH: &str = "cms.toml";

/// Listen address, overridable with CMS_UI_ADDR
const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    info!("Starting cms_ui server...");

    let config_path =
        std::env::var("CMS_UI_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = ClientConfig::load_or_default(&config_path)
        .with_context(|| format!("loading configuration from {config_path}"))?;

    let credentials: Arc<dyn CredentialStore> = match &config.credentials_path {
        Some(path) => Arc::new(FileCredentialStore::new(path)),
        None => Arc::new(InMemoryCredentialStore::new()),
    };
    if let Ok(token) = std::env::var("CMS_API_TOKEN") {
        credentials
            .save(&Credentials::new(token))
            .context("storing CMS_API_TOKEN")?;
    }

    let state = Arc::new(AppState::new(config, credentials).context("building API client")?);
    spawn_revocation_listener(state.clone());

    // Fetch the profile once up front; guards render nothing until it lands.
    if let Err(e) = state.session.refresh(&state.client).await {
        warn!("Initial profile fetch failed: {}", e);
    }

    let addr: SocketAddr = std::env::var("CMS_UI_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .context("parsing CMS_UI_ADDR")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server started successfully");

    axum::serve(listener, app(state)).await?;
    Ok(())
}
