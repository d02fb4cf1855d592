use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDateTime;
use serde_json::{json, Value};
use tower::ServiceExt;

use slotwise::config::AppConfig;
use slotwise::db::{self, BookingStore, SqliteStore};
use slotwise::handlers;
use slotwise::services::availability::AvailabilityChecker;
use slotwise::services::clock::FixedClock;
use slotwise::services::notifications::{Notification, NotificationSender};
use slotwise::services::pricing::PricingEngine;
use slotwise::services::recurrence::RecurrenceExpander;
use slotwise::services::scheduler::BookingScheduler;
use slotwise::services::waitlist::WaitlistManager;
use slotwise::state::AppState;

// ── Mock Notifier ──

#[derive(Default)]
struct MockNotifier {
    sent: Mutex<Vec<(String, Notification)>>,
    unreachable: bool,
}

#[async_trait]
impl NotificationSender for MockNotifier {
    async fn send(&self, user_id: &str, notification: &Notification) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((user_id.to_string(), notification.clone()));
        if self.unreachable {
            anyhow::bail!("webhook returned 503");
        }
        Ok(())
    }
}

// ── Helpers ──

struct TestApp {
    state: Arc<AppState>,
    store: Arc<SqliteStore>,
    notifier: Arc<MockNotifier>,
}

fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

fn test_app() -> TestApp {
    test_app_with(MockNotifier::default())
}

fn test_app_with(notifier: MockNotifier) -> TestApp {
    let config = AppConfig {
        database_url: ":memory:".to_string(),
        ..AppConfig::default()
    };
    let store = Arc::new(SqliteStore::new(db::init_db(":memory:").unwrap()));
    let clock = Arc::new(FixedClock::new(dt("2025-06-01 08:00")));
    let notifier = Arc::new(notifier);

    let pricing = PricingEngine::new(clock.clone());
    let waitlist = WaitlistManager::new(
        store.clone(),
        clock.clone(),
        pricing.clone(),
        notifier.clone(),
    );
    let scheduler = BookingScheduler::new(
        store.clone(),
        clock,
        AvailabilityChecker::new(config.slot_granularity_minutes),
        RecurrenceExpander::default(),
        pricing,
        waitlist,
        notifier.clone(),
    );

    TestApp {
        state: Arc::new(AppState {
            scheduler: Arc::new(scheduler),
        }),
        store,
        notifier,
    }
}

async fn call(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = handlers::router(app.state.clone())
        .oneshot(req)
        .await
        .unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Provider `studio` offering a 60 minute `cut` at 50.00.
async fn seed_catalogue(app: &TestApp) {
    let (status, _) = call(
        app,
        "POST",
        "/api/admin/providers",
        Some(json!({"id": "studio", "name": "Studio", "business_hours": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        app,
        "POST",
        "/api/admin/services",
        Some(json!({
            "id": "cut",
            "business_id": "studio",
            "name": "Haircut",
            "duration_minutes": 60,
            "base_price": 50.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

fn booking_body(user: &str, start: &str) -> Value {
    json!({
        "user_id": user,
        "provider_id": "studio",
        "service_ids": ["cut"],
        "start_time": start,
        "notes": null
    })
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, json) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

// ── Bookings ──

#[tokio::test]
async fn test_create_booking_and_conflict() {
    let app = test_app();
    seed_catalogue(&app).await;

    let (status, json) = call(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("alice", "2025-06-16T10:00:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json[0]["status"], "pending");
    assert_eq!(json[0]["end_time"], "2025-06-16T11:00:00");
    assert_eq!(json[0]["price"], 60.0);

    let (status, json) = call(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("bob", "2025-06-16T10:30:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("slot unavailable"));

    let (status, _) = call(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("bob", "2025-06-16T11:00:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(app.notifier.sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_service_is_not_found() {
    let app = test_app();
    seed_catalogue(&app).await;

    let mut body = booking_body("alice", "2025-06-16T10:00:00");
    body["service_ids"] = json!(["massage"]);
    let (status, _) = call(&app, "POST", "/api/bookings", Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recurring_booking_reports_occurrences() {
    let app = test_app();
    seed_catalogue(&app).await;
    call(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("bob", "2025-06-09T10:00:00")),
    )
    .await;

    let (status, json) = call(
        &app,
        "POST",
        "/api/bookings/recurring",
        Some(json!({
            "user_id": "alice",
            "service_id": "cut",
            "start": "2025-06-02T10:00:00",
            "frequency": "weekly",
            "end_date": "2025-06-16"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let occurrences = json["occurrences"].as_array().unwrap();
    assert_eq!(occurrences.len(), 3);
    assert!(occurrences[0]["booking"].is_object());
    assert!(occurrences[1]["booking"].is_null());
    assert!(occurrences[1]["error"].as_str().unwrap().contains("slot unavailable"));
    assert!(occurrences[2]["booking"].is_object());

    let series_id = json["series"]["id"].as_str().unwrap();
    assert_eq!(app.store.bookings_for_series(series_id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_recurring_invalid_range() {
    let app = test_app();
    seed_catalogue(&app).await;

    let (status, _) = call(
        &app,
        "POST",
        "/api/bookings/recurring",
        Some(json!({
            "user_id": "alice",
            "service_id": "cut",
            "start": "2025-06-02T10:00:00",
            "frequency": "monthly",
            "end_date": "2025-05-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_package_booking() {
    let app = test_app();
    seed_catalogue(&app).await;
    let (status, _) = call(
        &app,
        "POST",
        "/api/admin/packages",
        Some(json!({
            "id": "pkg",
            "business_id": "studio",
            "name": "Two cuts",
            "service_ids": ["cut", "cut"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = call(
        &app,
        "POST",
        "/api/bookings/package",
        Some(json!({
            "user_id": "alice",
            "package_id": "pkg",
            "preferred_dates": ["2025-06-16T10:00:00", "2025-06-23T10:00:00"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["booking"]["package_id"], "pkg");
    assert_eq!(items[1]["booking"]["start_time"], "2025-06-23T10:00:00");
}

#[tokio::test]
async fn test_status_transitions() {
    let app = test_app();
    seed_catalogue(&app).await;
    let (_, json) = call(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("alice", "2025-06-16T10:00:00")),
    )
    .await;
    let id = json[0]["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/bookings/{id}/status"),
        Some(json!({"status": "completed"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/bookings/{id}/status"),
        Some(json!({"status": "teleported"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = call(
        &app,
        "POST",
        &format!("/api/bookings/{id}/status"),
        Some(json!({"status": "confirmed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["status"], "confirmed");

    let (status, _) = call(&app, "POST", "/api/bookings/missing/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_offers_slot_to_waitlist() {
    let app = test_app();
    seed_catalogue(&app).await;
    let (_, json) = call(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("alice", "2025-06-16T10:00:00")),
    )
    .await;
    let id = json[0]["id"].as_str().unwrap().to_string();

    let (status, entry) = call(
        &app,
        "POST",
        "/api/waitlist",
        Some(json!({"user_id": "carol", "service_id": "cut", "preferred_dates": ["2025-06-16"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["status"], "pending");
    let entry_id = entry["id"].as_str().unwrap().to_string();

    let (status, json) = call(&app, "POST", &format!("/api/bookings/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["status"], "cancelled");
    assert_eq!(json["waitlist_offer"]["id"], entry_id.as_str());
    assert_eq!(json["waitlist_offer"]["status"], "notified");
    assert!(json["offer_error"].is_null());
    assert!(json["promotion_error"].is_null());

    {
        let sent = app.notifier.sent.lock().unwrap();
        assert!(sent
            .iter()
            .any(|(user, n)| user == "carol" && matches!(n, Notification::WaitlistOffer { .. })));
    }

    let (status, json) = call(
        &app,
        "POST",
        &format!("/api/waitlist/{entry_id}/resolve"),
        Some(json!({"accepted": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "converted");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/waitlist/{entry_id}/resolve"),
        Some(json!({"accepted": true})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_cancel_reports_undelivered_offer() {
    let app = test_app_with(MockNotifier {
        unreachable: true,
        ..MockNotifier::default()
    });
    seed_catalogue(&app).await;
    let (status, json) = call(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("alice", "2025-06-16T10:00:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json[0]["id"].as_str().unwrap().to_string();

    call(
        &app,
        "POST",
        "/api/waitlist",
        Some(json!({"user_id": "carol", "service_id": "cut", "preferred_dates": ["2025-06-16"]})),
    )
    .await;

    let (status, json) = call(&app, "POST", &format!("/api/bookings/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["status"], "cancelled");
    assert_eq!(json["waitlist_offer"]["status"], "notified");
    assert!(json["offer_error"].as_str().unwrap().contains("503"));
    assert!(json["promotion_error"].is_null());
}

#[tokio::test]
async fn test_cancel_unknown_series() {
    let app = test_app();
    let (status, _) = call(&app, "POST", "/api/series/nope/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Quotes & Availability ──

#[tokio::test]
async fn test_quote_endpoint() {
    let app = test_app();
    seed_catalogue(&app).await;

    let (status, json) = call(
        &app,
        "GET",
        "/api/quote?service_id=cut&at=2025-06-16T10:00:00",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["base_price"], 50.0);
    assert_eq!(json["final_price"], 60.0);
    assert_eq!(json["adjustments"][0]["kind"], "PEAK_HOUR");
    assert_eq!(json["adjustments"][0]["amount"], 10.0);
}

#[tokio::test]
async fn test_availability_endpoint() {
    let app = test_app();
    seed_catalogue(&app).await;
    call(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("alice", "2025-06-16T09:00:00")),
    )
    .await;

    let (status, json) = call(
        &app,
        "GET",
        "/api/availability?provider_id=studio&service_id=cut&date=2025-06-16",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots[0], "2025-06-16T10:00:00");
    assert_eq!(slots.last().unwrap(), "2025-06-16T16:00:00");
}

#[tokio::test]
async fn test_stored_service_with_huge_duration_is_rejected() {
    let app = test_app();
    seed_catalogue(&app).await;
    let mut service = app.store.get_service("cut").unwrap().unwrap();
    service.id = "endless".to_string();
    service.duration_minutes = 1_000_000_000_000;
    app.store.save_service(&service).unwrap();

    let (status, _) = call(
        &app,
        "GET",
        "/api/availability?provider_id=studio&service_id=endless&date=2025-06-16",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let mut body = booking_body("alice", "2025-06-16T10:00:00");
    body["service_ids"] = json!(["endless"]);
    let (status, _) = call(&app, "POST", "/api/bookings", Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ── Admin ──

#[tokio::test]
async fn test_admin_rejects_bad_input() {
    let app = test_app();

    let (status, _) = call(
        &app,
        "POST",
        "/api/admin/services",
        Some(json!({
            "id": "zero",
            "business_id": "studio",
            "name": "Nothing",
            "duration_minutes": 0,
            "base_price": 10.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = call(
        &app,
        "POST",
        "/api/admin/services",
        Some(json!({
            "id": "marathon",
            "business_id": "studio",
            "name": "Marathon",
            "duration_minutes": 1_441,
            "base_price": 10.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("1440"));

    let (status, _) = call(
        &app,
        "POST",
        "/api/admin/providers",
        Some(json!({
            "id": "studio",
            "name": "Studio",
            "business_hours": {"slots": [{"day": "monday", "start": "17:00", "end": "09:00"}]}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
