use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::PriceQuote;
use crate::state::AppState;

// GET /api/availability
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub provider_id: String,
    pub service_id: String,
    pub date: NaiveDate,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    date: NaiveDate,
    slots: Vec<NaiveDateTime>,
}

pub async fn available_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let slots = state.scheduler.check_availability(
        &query.provider_id,
        &query.service_id,
        query.date,
    )?;
    Ok(Json(AvailabilityResponse {
        date: query.date,
        slots,
    }))
}

// GET /api/quote
#[derive(Deserialize)]
pub struct QuoteQuery {
    pub service_id: String,
    pub at: NaiveDateTime,
}

pub async fn quote(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<PriceQuote>, AppError> {
    let quote = state.scheduler.quote_price(&query.service_id, query.at)?;
    Ok(Json(quote))
}
