use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::WaitlistEntry;
use crate::state::AppState;

// POST /api/waitlist
#[derive(Deserialize)]
pub struct JoinWaitlistRequest {
    pub user_id: String,
    pub service_id: String,
    /// Empty means any date.
    #[serde(default)]
    pub preferred_dates: Vec<NaiveDate>,
    pub notes: Option<String>,
}

pub async fn join_waitlist(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JoinWaitlistRequest>,
) -> Result<(StatusCode, Json<WaitlistEntry>), AppError> {
    let entry = state.scheduler.add_to_waitlist(
        &req.user_id,
        &req.service_id,
        req.preferred_dates,
        req.notes,
    )?;
    Ok((StatusCode::CREATED, Json(entry)))
}

// POST /api/waitlist/:id/resolve
#[derive(Deserialize)]
pub struct ResolveRequest {
    pub accepted: bool,
}

pub async fn resolve_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<WaitlistEntry>, AppError> {
    let entry = state
        .scheduler
        .waitlist()
        .resolve_offer(&id, req.accepted)
        .await?;
    Ok(Json(entry))
}
