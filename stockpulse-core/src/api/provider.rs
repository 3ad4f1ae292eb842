//! Dashboard API trait and structured error types.
//!
//! The DashboardApi trait abstracts over backends (the REST service, the
//! in-process simulation, scripted fakes) so the sync engine can be driven and
//! tested without a network.

use crate::domain::{Company, CompanyId, CompanyStatus, Sample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown to the user when a failure carries no message of its own.
pub const FALLBACK_MESSAGE: &str = "Unable to load stock data. Please try again later.";

/// Structured error types for backend calls.
///
/// Displayable in both CLI output and user notifications.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Http { status: u16, message: Option<String> },

    #[error("backend rejected request: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Message the backend attached to the failure, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::Http { message, .. } | ApiError::Rejected { message } => message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty()),
            _ => None,
        }
    }

    /// Text for a user-visible notification. Never empty.
    pub fn user_message(&self) -> String {
        if let Some(message) = self.backend_message() {
            return message.to_string();
        }
        match self {
            ApiError::NetworkUnreachable(detail) | ApiError::Timeout(detail)
                if !detail.trim().is_empty() =>
            {
                self.to_string()
            }
            _ => FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// `{ success, data, message }` envelope wrapping every backend payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, turning `success: false` or a missing body into
    /// `ApiError::Rejected`.
    pub fn into_data(self) -> Result<T, ApiError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (_, _) => Err(ApiError::Rejected {
                message: self.message,
            }),
        }
    }
}

/// Payload of `companies/dashboard/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub company: CompanyStatus,
    #[serde(default)]
    pub stocks: Vec<Sample>,
}

/// Trait for dashboard backends.
///
/// Implementations handle transport specifics. Polling, merging and
/// cancellation live above this trait in the sync controller.
pub trait DashboardApi: Send + Sync {
    /// Human-readable name of this backend.
    fn name(&self) -> &str;

    /// List the companies available for display, in backend order.
    fn list_companies(&self) -> Result<Vec<Company>, ApiError>;

    /// Fetch dashboard data for a company.
    ///
    /// `since = None` requests the full history; `Some(t)` requests only
    /// samples with `timestamp >= t`.
    fn get_dashboard(
        &self,
        company: &CompanyId,
        since: Option<DateTime<Utc>>,
    ) -> Result<DashboardSnapshot, ApiError>;
}
