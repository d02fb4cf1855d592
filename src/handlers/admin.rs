use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::models::{Package, Provider, Service, MAX_DURATION_MINUTES};
use crate::state::AppState;

// POST /api/admin/services
pub async fn upsert_service(
    State(state): State<Arc<AppState>>,
    Json(service): Json<Service>,
) -> Result<Json<Service>, AppError> {
    if service.duration().is_none() {
        return Err(AppError::BadRequest(format!(
            "duration_minutes must be between 1 and {MAX_DURATION_MINUTES}"
        )));
    }
    if service.base_price < 0.0 {
        return Err(AppError::BadRequest(
            "base_price must not be negative".to_string(),
        ));
    }
    state.scheduler.store().save_service(&service)?;
    tracing::info!(service_id = %service.id, "service saved");
    Ok(Json(service))
}

// POST /api/admin/providers
pub async fn upsert_provider(
    State(state): State<Arc<AppState>>,
    Json(provider): Json<Provider>,
) -> Result<Json<Provider>, AppError> {
    if let Some(hours) = &provider.business_hours {
        hours
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
    }
    state.scheduler.store().save_provider(&provider)?;
    tracing::info!(provider_id = %provider.id, "provider saved");
    Ok(Json(provider))
}

// POST /api/admin/packages
pub async fn upsert_package(
    State(state): State<Arc<AppState>>,
    Json(package): Json<Package>,
) -> Result<Json<Package>, AppError> {
    if package.service_ids.is_empty() {
        return Err(AppError::BadRequest(
            "package must contain at least one service".to_string(),
        ));
    }
    state.scheduler.store().save_package(&package)?;
    tracing::info!(package_id = %package.id, "package saved");
    Ok(Json(package))
}
