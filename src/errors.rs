use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// JSON body returned for every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Conflict")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Error taxonomy for the fulfillment pipeline.
///
/// The split between `StateConflict`, `Provider` and `Transient` matters to
/// callers: state conflicts mean "re-fetch and look again", provider errors
/// carry the carrier's own detail and are not retried for shipment creation,
/// and transient errors are safe to retry with backoff everywhere else.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid transition, stale approval, double-acknowledgement.
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// The carrier API returned an explicit failure.
    #[error("Provider error ({provider}): {detail}")]
    Provider { provider: String, detail: String },

    /// Timeout or connectivity failure talking to an external system.
    #[error("Transient error: {0}")]
    Transient(String),

    /// No enabled shipping provider configured for the company.
    #[error("No shipping provider: {0}")]
    NoShippingProvider(String),

    /// Stored credential bundle failed to unseal or deserialize.
    /// Deliberately distinct from `Provider`/`Transient` so operators can
    /// tell configuration problems from carrier outages.
    #[error("Invalid provider credentials: {0}")]
    InvalidProviderCredentials(String),

    /// Actor identity resolved, but the target is outside their scope.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DatabaseError(_) | ServiceError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::StateConflict(_) => StatusCode::CONFLICT,
            ServiceError::Provider { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::NoShippingProvider(_) => StatusCode::PRECONDITION_FAILED,
            ServiceError::InvalidProviderCredentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::EventError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Never leak raw database detail to clients.
            ServiceError::DatabaseError(_) => "A database error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: self.public_message(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_errors_are_distinct_from_provider_errors() {
        let cred = ServiceError::InvalidProviderCredentials("bad tag".into());
        let api = ServiceError::Provider {
            provider: "shiprocket".into(),
            detail: "pickup not scheduled".into(),
        };
        assert_ne!(cred.status_code(), api.status_code());
    }

    #[test]
    fn database_detail_is_not_leaked() {
        let err = ServiceError::DatabaseError(sea_orm::error::DbErr::Custom(
            "secret dsn".into(),
        ));
        assert!(!err.public_message().contains("secret dsn"));
    }
}
