pub mod admin;
pub mod availability;
pub mod bookings;
pub mod health;
pub mod waitlist;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/bookings/recurring", post(bookings::create_recurring))
        .route("/api/bookings/package", post(bookings::create_package))
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/api/bookings/:id/status", post(bookings::update_status))
        .route("/api/series/:id/cancel", post(bookings::cancel_series))
        .route("/api/quote", get(availability::quote))
        .route("/api/availability", get(availability::available_slots))
        .route("/api/waitlist", post(waitlist::join_waitlist))
        .route("/api/waitlist/:id/resolve", post(waitlist::resolve_offer))
        .route("/api/admin/services", post(admin::upsert_service))
        .route("/api/admin/providers", post(admin::upsert_provider))
        .route("/api/admin/packages", post(admin::upsert_package))
        .with_state(state)
}
