use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cms_core::ApiError;
use serde::Serialize;
use thiserror::Error;

/// JSON envelope returned by the dashboard API.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Errors returned by dashboard handlers.
#[derive(Debug, Error)]
pub enum UiError {
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl UiError {
    fn status(&self) -> StatusCode {
        match self {
            UiError::Api(ApiError::Revoked(_) | ApiError::NotAuthenticated) => {
                StatusCode::UNAUTHORIZED
            }
            UiError::Api(ApiError::Credentials(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            UiError::Api(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response() {
        let success = ApiResponse::success("test data");
        assert!(success.success);
        assert_eq!(success.data, Some("test data"));
        assert_eq!(success.error, None);

        let error = ApiResponse::<()>::error("test error");
        assert!(!error.success);
        assert_eq!(error.data, None);
        assert_eq!(error.error, Some("test error".to_string()));
    }

    #[test]
    fn test_status_mapping() {
        let revoked = UiError::from(ApiError::Revoked("Access revoked".to_string()));
        assert_eq!(revoked.status(), StatusCode::UNAUTHORIZED);

        let upstream = UiError::from(ApiError::Api {
            status: 500,
            message: "boom".to_string(),
        });
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
