use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, PriceQuote, RecurringSeries, WaitlistEntry};
use crate::services::scheduler::{
    BookingRequest, CancelOutcome, OccurrenceResult, PackageRequest, RecurringRequest,
};
use crate::state::AppState;

/// Per-occurrence result of a recurring or package request.
#[derive(Serialize)]
pub struct OccurrenceResponse {
    service_id: String,
    start_time: NaiveDateTime,
    booking: Option<Booking>,
    error: Option<String>,
}

impl From<OccurrenceResult> for OccurrenceResponse {
    fn from(o: OccurrenceResult) -> Self {
        let (booking, error) = match o.outcome {
            Ok(b) => (Some(b), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            service_id: o.service_id,
            start_time: o.start_time,
            booking,
            error,
        }
    }
}

#[derive(Serialize)]
pub struct BookingChangeResponse {
    booking: Booking,
    /// Waitlist entry offered the freed slot, if any.
    waitlist_offer: Option<WaitlistEntry>,
    offer_quote: Option<PriceQuote>,
    /// The offer was recorded but the waiting user was not reached.
    offer_error: Option<String>,
    /// The booking changed but the waitlist could not be consulted.
    promotion_error: Option<String>,
}

impl From<CancelOutcome> for BookingChangeResponse {
    fn from(o: CancelOutcome) -> Self {
        let (waitlist_offer, offer_quote, offer_error) = match o.promotion {
            Some(p) => (Some(p.entry), Some(p.quote), p.notification_error),
            None => (None, None, None),
        };
        Self {
            booking: o.booking,
            waitlist_offer,
            offer_quote,
            offer_error,
            promotion_error: o.promotion_error,
        }
    }
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Vec<Booking>>), AppError> {
    let bookings = state.scheduler.create_booking(req).await?;
    Ok((StatusCode::CREATED, Json(bookings)))
}

// POST /api/bookings/recurring
#[derive(Serialize)]
pub struct RecurringResponse {
    series: RecurringSeries,
    occurrences: Vec<OccurrenceResponse>,
}

pub async fn create_recurring(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecurringRequest>,
) -> Result<(StatusCode, Json<RecurringResponse>), AppError> {
    let outcome = state.scheduler.create_recurring_booking(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecurringResponse {
            series: outcome.series,
            occurrences: outcome.occurrences.into_iter().map(Into::into).collect(),
        }),
    ))
}

// POST /api/bookings/package
pub async fn create_package(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PackageRequest>,
) -> Result<(StatusCode, Json<Vec<OccurrenceResponse>>), AppError> {
    let results = state.scheduler.create_package_booking(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(results.into_iter().map(Into::into).collect()),
    ))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingChangeResponse>, AppError> {
    let outcome = state.scheduler.cancel_booking(&id).await?;
    Ok(Json(outcome.into()))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<BookingChangeResponse>, AppError> {
    let next = BookingStatus::parse(&req.status)
        .ok_or_else(|| AppError::BadRequest(format!("unknown status: {}", req.status)))?;
    let outcome = state.scheduler.transition_booking(&id, next).await?;
    Ok(Json(outcome.into()))
}

// POST /api/series/:id/cancel
#[derive(Serialize)]
pub struct SeriesCancelResponse {
    cancelled: Vec<BookingChangeResponse>,
}

pub async fn cancel_series(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SeriesCancelResponse>, AppError> {
    let outcomes = state.scheduler.cancel_series(&id).await?;
    Ok(Json(SeriesCancelResponse {
        cancelled: outcomes.into_iter().map(Into::into).collect(),
    }))
}
