//! Backend API client.
//!
//! A single wrapper over `reqwest` that adds the bearer token from the
//! credential store, surfaces `{ message }` error bodies as [`ApiError::Api`],
//! and turns the revocation message into one [`RevocationEvent`].

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{ApiError, ApiResult};
use crate::revocation::{is_revocation, RevocationChannel, RevocationEvent};
use crate::role::Profile;
use crate::session::ProfileSource;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Error body returned by the backend.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialStore>,
    revocations: RevocationChannel,
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        revocations: RevocationChannel,
    ) -> ApiResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            config,
            credentials,
            revocations,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn revocations(&self) -> &RevocationChannel {
        &self.revocations
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// Issues a DELETE, discarding any response body.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let builder = self.builder(Method::DELETE, path)?;
        self.send(builder, path).await?;
        Ok(())
    }

    /// Sends a request and decodes a JSON response. An empty body decodes
    /// as JSON `null`.
    pub async fn request<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<T> {
        let mut builder = self.builder(method, path)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = self.send(builder, path).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn builder(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = self.config.url(path);
        debug!(method = %method, url = %url, "API request");
        let mut builder = self.http.request(method, url);
        if let Some(credentials) = self.credentials.load()? {
            builder = builder.bearer_auth(credentials.token);
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> ApiResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(self.failure(status, path, response).await)
    }

    async fn failure(&self, status: StatusCode, path: &str, response: Response) -> ApiError {
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

        if is_revocation(
            body.message.as_deref(),
            body.code.as_deref(),
            &self.config.revoked_message,
        ) {
            let message = body
                .message
                .unwrap_or_else(|| self.config.revoked_message.clone());
            self.revocations
                .signal(RevocationEvent::new(status.as_u16(), path, message.clone()));
            return ApiError::Revoked(message);
        }

        let message = body.message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
        warn!(status = status.as_u16(), path = %path, "API error: {}", message);
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl ProfileSource for ApiClient {
    async fn fetch_profile(&self) -> ApiResult<Profile> {
        if self.credentials.load()?.is_none() {
            return Err(ApiError::NotAuthenticated);
        }
        let path = self.config.profile_path.clone();
        self.get(&path).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("revocations", &self.revocations)
            .finish()
    }
}
