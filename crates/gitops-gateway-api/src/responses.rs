//! Response types for the API.

use chrono::{DateTime, Utc};
use gitops_gateway_core::router::RouteOutcome;
use serde::Serialize;

/// Body returned for an acknowledged delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookResponse {
    /// `processed` or `ignored`
    pub status: String,
    pub message: String,
    pub request_id: String,
}

impl WebhookResponse {
    pub fn from_outcome(outcome: RouteOutcome, request_id: impl Into<String>) -> Self {
        let (status, message) = match outcome {
            RouteOutcome::Processed { .. } => ("processed", "Processing...".to_string()),
            RouteOutcome::Ignored { reason } => ("ignored", reason),
        };
        Self {
            status: status.to_string(),
            message,
            request_id: request_id.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub async_tasks_in_flight: usize,
}
