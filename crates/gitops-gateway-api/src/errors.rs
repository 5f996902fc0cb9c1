//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use gitops_gateway_core::{request::RequestBodyError, GatewayError};
use tracing::{error, warn};

/// Webhook handler errors with HTTP status code mapping
///
/// | Failure | Status |
/// |---|---|
/// | signature or payload extraction | `403 Forbidden` |
/// | envelope or event conversion | `400 Bad Request` |
/// | unsupported event type | `200 OK`, logged at error |
/// | repository not allowlisted | `403 Forbidden` |
/// | synchronous collaborator failure | `500 Internal Server Error` |
/// | no resolver for the request | `400 Bad Request` |
/// | body too large | `413 Payload Too Large` |
/// | body unreadable | `500 Internal Server Error` |
///
/// An unsupported event type is a defect on our side, not the provider's, so
/// it is acknowledged to stop the provider from redelivering it.
///
/// # Security Considerations
///
/// Internal failures return a generic message; the details are logged with
/// the request id.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Body(#[from] RequestBodyError),
}

impl WebhookHandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Gateway(err) => match err {
                GatewayError::RequestValidation(_) => StatusCode::FORBIDDEN,
                GatewayError::WebhookParsing(_) | GatewayError::EventConversion(_) => {
                    StatusCode::BAD_REQUEST
                }
                GatewayError::UnsupportedEventType { .. } => StatusCode::OK,
                GatewayError::RepoNotAllowlisted { .. } => StatusCode::FORBIDDEN,
                GatewayError::Downstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                GatewayError::NoResolver => StatusCode::BAD_REQUEST,
            },
            Self::Body(RequestBodyError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Body(RequestBodyError::Read { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Gateway(GatewayError::NoResolver) => "Ignoring request".to_string(),
            Self::Gateway(GatewayError::Downstream { operation, .. }) => {
                format!("{operation} failed")
            }
            Self::Body(RequestBodyError::Read { .. }) => {
                "Internal server error occurred. Please try again later.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            Self::Gateway(GatewayError::Downstream { .. }) | Self::Body(RequestBodyError::Read { .. }) => {
                error!(error = %self, "Webhook request failed")
            }
            Self::Gateway(GatewayError::UnsupportedEventType { .. }) => {
                error!(error = %self, "Acknowledging unsupported event type")
            }
            _ => warn!(error = %self, status = %status, "Webhook request rejected"),
        }

        let body = serde_json::json!({
            "error": self.public_message(),
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
