//! Lockstep API — error types and command outcome responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lockstep_core::error::DomainError;
use lockstep_core::outcome::CommandOutcome;
use lockstep_orders::application::query_handlers::OrderView;
use lockstep_orders::domain::aggregates::Order;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// JSON body returned when a command loses a version race.
#[derive(Debug, Serialize)]
pub struct ConflictBody {
    /// Always `version_conflict`.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// The contended order.
    pub aggregate_id: Uuid,
    /// The version the command was decided against.
    pub attempted_version: i64,
    /// The live version at the time of the attempt.
    pub current_version: i64,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            DomainError::AggregateNotFound(_) => (StatusCode::NOT_FOUND, "aggregate_not_found"),
            DomainError::AggregateQuarantined(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "aggregate_quarantined")
            }
            DomainError::LogAppendFailure { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "log_append_failure")
            }
            DomainError::ReplayGap { .. } | DomainError::StreamMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "stream_integrity_error")
            }
            DomainError::Deserialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "deserialization_error")
            }
            DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Turns a command outcome into a response: the accepted state as an
/// `OrderView` with `success`, 409 on a version conflict and 422 on a
/// domain rule violation.
pub fn outcome_response(outcome: CommandOutcome<Order>, success: StatusCode) -> Response {
    match outcome {
        CommandOutcome::Accepted { new_state } => {
            (success, Json(OrderView::from(&new_state))).into_response()
        }
        CommandOutcome::Conflict {
            aggregate_id,
            attempted_version,
            current_version,
        } => {
            let body = ConflictBody {
                error: "version_conflict",
                message: format!(
                    "order {aggregate_id} moved past version {attempted_version}; re-fetch and retry"
                ),
                aggregate_id,
                attempted_version,
                current_version,
            };
            (StatusCode::CONFLICT, Json(body)).into_response()
        }
        CommandOutcome::DomainRuleViolation { reason } => {
            let body = ErrorBody {
                error: "domain_rule_violation",
                message: reason,
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
    }
}
