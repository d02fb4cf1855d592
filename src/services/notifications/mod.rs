pub mod logger;
pub mod webhook;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::PriceQuote;

/// Structured payload delivered to a user.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A booking was created and awaits confirmation.
    BookingPending {
        booking_id: String,
        service_id: String,
        start_time: NaiveDateTime,
        quote: PriceQuote,
    },
    BookingCancelled {
        booking_id: String,
        start_time: NaiveDateTime,
    },
    /// A freed slot offered to a waitlisted user.
    WaitlistOffer {
        entry_id: String,
        service_id: String,
        date: NaiveDate,
        start_time: NaiveDateTime,
        quote: PriceQuote,
    },
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, user_id: &str, notification: &Notification) -> anyhow::Result<()>;
}
