use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{Months, NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::db::BookingStore;
use crate::errors::SchedulingError;
use crate::models::{PriceQuote, WaitlistEntry, WaitlistStatus};
use crate::services::clock::Clock;
use crate::services::locks::KeyedLocks;
use crate::services::notifications::{Notification, NotificationSender};
use crate::services::pricing::PricingEngine;

pub const BASE_PRIORITY: f64 = 1.0;
pub const DAILY_WAIT_BONUS: f64 = 0.1;

/// Multiplier for a user's booking count over the trailing twelve months.
pub fn loyalty_multiplier(bookings_last_year: i64) -> f64 {
    match bookings_last_year {
        n if n >= 20 => 2.0,
        n if n >= 10 => 1.5,
        n if n >= 5 => 1.25,
        _ => 1.0,
    }
}

pub fn priority_score(bookings_last_year: i64, days_waiting: i64) -> f64 {
    BASE_PRIORITY * loyalty_multiplier(bookings_last_year) + days_waiting as f64 * DAILY_WAIT_BONUS
}

/// Result of offering a freed slot to the top waitlist entry.
#[derive(Debug, Clone)]
pub struct Promotion {
    pub entry: WaitlistEntry,
    pub quote: PriceQuote,
    /// Set when the offer was recorded but could not be delivered.
    pub notification_error: Option<String>,
}

pub struct WaitlistManager {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    pricing: PricingEngine,
    notifier: Arc<dyn NotificationSender>,
    service_locks: KeyedLocks,
}

impl WaitlistManager {
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        pricing: PricingEngine,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            store,
            clock,
            pricing,
            notifier,
            service_locks: KeyedLocks::new(),
        }
    }

    pub fn add(
        &self,
        user_id: &str,
        service_id: &str,
        preferred_dates: Vec<NaiveDate>,
        notes: Option<String>,
    ) -> Result<WaitlistEntry, SchedulingError> {
        if self.store.get_service(service_id)?.is_none() {
            return Err(SchedulingError::ServiceNotFound(service_id.to_string()));
        }

        let now = self.clock.now();
        let entry = WaitlistEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            service_id: service_id.to_string(),
            preferred_dates,
            priority: self.priority_for(user_id, &now)?,
            notes,
            status: WaitlistStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.store.create_waitlist_entry(&entry)?;

        tracing::info!(
            entry_id = %entry.id,
            user_id,
            service_id,
            priority = entry.priority,
            "added to waitlist"
        );
        Ok(entry)
    }

    /// Priority of a user's entry created at `created_at`, evaluated now.
    pub fn priority_for(
        &self,
        user_id: &str,
        created_at: &NaiveDateTime,
    ) -> Result<f64, SchedulingError> {
        let now = self.clock.now();
        let year_ago = now
            .checked_sub_months(Months::new(12))
            .unwrap_or(NaiveDateTime::MIN);
        let bookings = self
            .store
            .count_user_bookings_between(user_id, &year_ago, &now)?;
        let days_waiting = (now - *created_at).num_days().max(0);
        Ok(priority_score(bookings, days_waiting))
    }

    /// Offer a freed slot to the single highest-priority pending entry of the
    /// service whose preferences accept the slot's date. Ties go to the
    /// earliest entry.
    pub async fn on_slot_freed(
        &self,
        service_id: &str,
        slot_start: NaiveDateTime,
    ) -> Result<Option<Promotion>, SchedulingError> {
        let date = slot_start.date();
        let guard = self.service_locks.lock(service_id).await;

        let service = self
            .store
            .get_service(service_id)?
            .ok_or_else(|| SchedulingError::ServiceNotFound(service_id.to_string()))?;

        let mut candidates = vec![];
        for mut entry in self.store.pending_waitlist_entries(service_id)? {
            if !entry.accepts(date) {
                continue;
            }
            entry.priority = self.priority_for(&entry.user_id, &entry.created_at)?;
            candidates.push(entry);
        }

        let Some(mut entry) = candidates.into_iter().max_by(rank) else {
            tracing::debug!(service_id, %date, "freed slot has no waitlist taker");
            return Ok(None);
        };

        entry.status = WaitlistStatus::Notified;
        entry.updated_at = self.clock.now();
        self.store.update_waitlist_entry(&entry)?;
        drop(guard);

        let demand = self.store.count_service_bookings_on(service_id, date)?;
        let quote = self.pricing.quote(service.base_price, slot_start, demand);

        tracing::info!(
            entry_id = %entry.id,
            user_id = %entry.user_id,
            service_id,
            priority = entry.priority,
            "promoting waitlist entry"
        );

        let notification = Notification::WaitlistOffer {
            entry_id: entry.id.clone(),
            service_id: service_id.to_string(),
            date,
            start_time: slot_start,
            quote: quote.clone(),
        };
        // The entry stays NOTIFIED even if delivery fails.
        let notification_error = match self.notifier.send(&entry.user_id, &notification).await {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(
                    entry_id = %entry.id,
                    error = %e,
                    "waitlist offer not delivered, needs manual follow-up"
                );
                Some(format!("{e:#}"))
            }
        };

        Ok(Some(Promotion {
            entry,
            quote,
            notification_error,
        }))
    }

    /// Record the user's answer to an offer: CONVERTED when accepted, EXPIRED otherwise.
    pub async fn resolve_offer(
        &self,
        entry_id: &str,
        accepted: bool,
    ) -> Result<WaitlistEntry, SchedulingError> {
        let service_id = self
            .store
            .get_waitlist_entry(entry_id)?
            .ok_or_else(|| SchedulingError::NotFound(format!("waitlist entry {entry_id}")))?
            .service_id;
        let _guard = self.service_locks.lock(&service_id).await;

        let mut entry = self
            .store
            .get_waitlist_entry(entry_id)?
            .ok_or_else(|| SchedulingError::NotFound(format!("waitlist entry {entry_id}")))?;
        if entry.status != WaitlistStatus::Notified {
            return Err(SchedulingError::InvalidRequest(format!(
                "waitlist entry {entry_id} is {}, not notified",
                entry.status.as_str()
            )));
        }

        entry.status = if accepted {
            WaitlistStatus::Converted
        } else {
            WaitlistStatus::Expired
        };
        entry.updated_at = self.clock.now();
        self.store.update_waitlist_entry(&entry)?;

        tracing::info!(entry_id, status = entry.status.as_str(), "waitlist offer resolved");
        Ok(entry)
    }
}

fn rank(a: &WaitlistEntry, b: &WaitlistEntry) -> Ordering {
    a.priority
        .partial_cmp(&b.priority)
        .unwrap_or(Ordering::Equal)
        // earlier entries rank higher
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}
