use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::BookingStatus;

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("slot unavailable: conflicts with booking {conflicting_id}")]
    SlotUnavailable { conflicting_id: String },

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("service is not active: {0}")]
    ServiceInactive(String),

    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid recurrence range: {0}")]
    InvalidRecurrenceRange(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("outside business hours, available: {hours}")]
    OutsideBusinessHours { hours: String },

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<anyhow::Error> for SchedulingError {
    fn from(e: anyhow::Error) -> Self {
        SchedulingError::Persistence(format!("{e:#}"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Scheduling(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Scheduling(e) => match e {
                SchedulingError::SlotUnavailable { .. } => StatusCode::CONFLICT,
                SchedulingError::ServiceNotFound(_)
                | SchedulingError::ProviderNotFound(_)
                | SchedulingError::NotFound(_) => StatusCode::NOT_FOUND,
                SchedulingError::ServiceInactive(_)
                | SchedulingError::InvalidRecurrenceRange(_)
                | SchedulingError::InvalidRequest(_)
                | SchedulingError::OutsideBusinessHours { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                SchedulingError::InvalidTransition { .. } => StatusCode::CONFLICT,
                SchedulingError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
