use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use slotwise::config::AppConfig;
use slotwise::db::{BookingStore, SqliteStore};
use slotwise::handlers;
use slotwise::models::BusinessHours;
use slotwise::services::availability::AvailabilityChecker;
use slotwise::services::clock::{Clock, SystemClock};
use slotwise::services::notifications::logger::LogNotifier;
use slotwise::services::notifications::webhook::WebhookNotifier;
use slotwise::services::notifications::NotificationSender;
use slotwise::services::pricing::PricingEngine;
use slotwise::services::recurrence::RecurrenceExpander;
use slotwise::services::scheduler::BookingScheduler;
use slotwise::services::waitlist::WaitlistManager;
use slotwise::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let store: Arc<dyn BookingStore> = Arc::new(SqliteStore::open(&config.database_url)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let notifier: Arc<dyn NotificationSender> = if config.notify_webhook_url.is_empty() {
        tracing::info!("no NOTIFY_WEBHOOK_URL set, notifications will only be logged");
        Arc::new(LogNotifier)
    } else {
        tracing::info!("delivering notifications to {}", config.notify_webhook_url);
        Arc::new(WebhookNotifier::new(config.notify_webhook_url.clone()))
    };

    let pricing = PricingEngine::new(clock.clone());
    let waitlist = WaitlistManager::new(
        store.clone(),
        clock.clone(),
        pricing.clone(),
        notifier.clone(),
    );
    let scheduler = BookingScheduler::new(
        store,
        clock,
        AvailabilityChecker::new(config.slot_granularity_minutes),
        RecurrenceExpander::default(),
        pricing,
        waitlist,
        notifier,
    )
    .with_default_hours(BusinessHours::every_day(
        config.default_open,
        config.default_close,
    ));

    let state = Arc::new(AppState {
        scheduler: Arc::new(scheduler),
    });

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
