use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::BookingStore;
use crate::errors::SchedulingError;
use crate::models::{
    Booking, BookingStatus, BusinessHours, Frequency, PriceQuote, Provider, RecurringSeries,
    Service,
};
use crate::services::availability::AvailabilityChecker;
use crate::services::clock::Clock;
use crate::services::locks::KeyedLocks;
use crate::services::notifications::{Notification, NotificationSender};
use crate::services::pricing::PricingEngine;
use crate::services::recurrence::RecurrenceExpander;
use crate::services::waitlist::{Promotion, WaitlistManager};

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub user_id: String,
    pub provider_id: String,
    /// Booked back to back, in order, from `start_time`.
    pub service_ids: Vec<String>,
    pub start_time: NaiveDateTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecurringRequest {
    pub user_id: String,
    pub service_id: String,
    /// First occurrence; its time of day applies to every occurrence.
    pub start: NaiveDateTime,
    pub frequency: Frequency,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub skip_dates: Vec<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageRequest {
    pub user_id: String,
    pub package_id: String,
    pub preferred_dates: Vec<NaiveDateTime>,
    pub notes: Option<String>,
}

/// Outcome of one occurrence of a recurring or package request.
#[derive(Debug)]
pub struct OccurrenceResult {
    pub service_id: String,
    pub start_time: NaiveDateTime,
    pub outcome: Result<Booking, SchedulingError>,
}

#[derive(Debug)]
pub struct RecurringOutcome {
    pub series: RecurringSeries,
    pub occurrences: Vec<OccurrenceResult>,
}

#[derive(Debug)]
pub struct CancelOutcome {
    pub booking: Booking,
    pub promotion: Option<Promotion>,
    /// Set when the status change was saved but the waitlist could not be consulted.
    pub promotion_error: Option<String>,
}

struct SlotPlan {
    service: Service,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

/// Tags shared by every booking created by one request.
#[derive(Default, Clone)]
struct Grouping {
    series_id: Option<String>,
    package_id: Option<String>,
}

pub struct BookingScheduler {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    availability: AvailabilityChecker,
    recurrence: RecurrenceExpander,
    pricing: PricingEngine,
    waitlist: WaitlistManager,
    notifier: Arc<dyn NotificationSender>,
    provider_locks: KeyedLocks,
    default_hours: BusinessHours,
}

impl BookingScheduler {
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        availability: AvailabilityChecker,
        recurrence: RecurrenceExpander,
        pricing: PricingEngine,
        waitlist: WaitlistManager,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN);
        Self {
            store,
            clock,
            availability,
            recurrence,
            pricing,
            waitlist,
            notifier,
            provider_locks: KeyedLocks::new(),
            default_hours: BusinessHours::every_day(nine, five),
        }
    }

    /// Opening hours used for providers that have none configured.
    pub fn with_default_hours(mut self, hours: BusinessHours) -> Self {
        self.default_hours = hours;
        self
    }

    pub fn store(&self) -> &Arc<dyn BookingStore> {
        &self.store
    }

    pub fn waitlist(&self) -> &WaitlistManager {
        &self.waitlist
    }

    // ── Lookups ──

    fn load_provider(&self, id: &str) -> Result<Provider, SchedulingError> {
        self.store
            .get_provider(id)?
            .ok_or_else(|| SchedulingError::ProviderNotFound(id.to_string()))
    }

    /// An active, bookable service offered by `provider_id` (any provider when `None`).
    fn load_service(&self, id: &str, provider_id: Option<&str>) -> Result<Service, SchedulingError> {
        let service = self
            .store
            .get_service(id)?
            .filter(|s| provider_id.map_or(true, |p| s.business_id == p))
            .ok_or_else(|| SchedulingError::ServiceNotFound(id.to_string()))?;
        if !service.active {
            return Err(SchedulingError::ServiceInactive(id.to_string()));
        }
        if service.duration().is_none() {
            return Err(SchedulingError::InvalidRequest(format!(
                "service {id} has an unbookable duration of {} minutes",
                service.duration_minutes
            )));
        }
        Ok(service)
    }

    fn slot_end(start: NaiveDateTime, service: &Service) -> Result<NaiveDateTime, SchedulingError> {
        service
            .duration()
            .and_then(|d| start.checked_add_signed(d))
            .ok_or_else(|| {
                SchedulingError::InvalidRequest(format!(
                    "service {} starting at {start} ends out of range",
                    service.id
                ))
            })
    }

    // ── Core check-then-act ──

    /// Check every planned interval and persist them. Caller holds the provider lock.
    fn place_locked(
        &self,
        user_id: &str,
        provider: &Provider,
        plan: &[SlotPlan],
        grouping: &Grouping,
        notes: Option<&str>,
    ) -> Result<Vec<(Booking, PriceQuote)>, SchedulingError> {
        let (Some(first), Some(last)) = (plan.first(), plan.last()) else {
            return Ok(vec![]);
        };

        if let Some(hours) = provider.business_hours.as_ref().filter(|h| !h.slots.is_empty()) {
            for slot in plan {
                if !hours.contains(&slot.start, &slot.end) {
                    return Err(SchedulingError::OutsideBusinessHours {
                        hours: hours.to_human_readable(),
                    });
                }
            }
        }

        let existing = self
            .store
            .active_bookings_for_provider(&provider.id, &first.start, &last.end)?;
        for slot in plan {
            if let Some(conflict) =
                self.availability
                    .find_conflict(&provider.id, &slot.start, &slot.end, &existing)
            {
                return Err(SchedulingError::SlotUnavailable {
                    conflicting_id: conflict.id.clone(),
                });
            }
        }

        let now = self.clock.now();
        let mut created = Vec::with_capacity(plan.len());
        for slot in plan {
            let demand = self
                .store
                .count_service_bookings_on(&slot.service.id, slot.start.date())?;
            let quote = self.pricing.quote(slot.service.base_price, slot.start, demand);
            let booking = Booking {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                provider_id: provider.id.clone(),
                service_id: slot.service.id.clone(),
                start_time: slot.start,
                end_time: slot.end,
                duration_minutes: slot.service.duration_minutes,
                price: quote.final_price,
                status: BookingStatus::Pending,
                series_id: grouping.series_id.clone(),
                package_id: grouping.package_id.clone(),
                notes: notes.map(str::to_string),
                created_at: now,
                updated_at: now,
            };
            self.store.create_booking(&booking)?;
            tracing::info!(
                booking_id = %booking.id,
                provider_id = %booking.provider_id,
                service_id = %booking.service_id,
                start = %booking.start_time,
                price = booking.price,
                "booking created"
            );
            created.push((booking, quote));
        }
        Ok(created)
    }

    async fn place(
        &self,
        user_id: &str,
        provider: &Provider,
        plan: &[SlotPlan],
        grouping: &Grouping,
        notes: Option<&str>,
    ) -> Result<Vec<Booking>, SchedulingError> {
        let created = {
            let _guard = self.provider_locks.lock(&provider.id).await;
            self.place_locked(user_id, provider, plan, grouping, notes)?
        };

        let mut bookings = Vec::with_capacity(created.len());
        for (booking, quote) in created {
            self.notify(
                &booking.user_id,
                Notification::BookingPending {
                    booking_id: booking.id.clone(),
                    service_id: booking.service_id.clone(),
                    start_time: booking.start_time,
                    quote,
                },
            )
            .await;
            bookings.push(booking);
        }
        Ok(bookings)
    }

    async fn notify(&self, user_id: &str, notification: Notification) {
        if let Err(e) = self.notifier.send(user_id, &notification).await {
            tracing::warn!(user_id, error = %e, "failed to send notification");
        }
    }

    // ── Operations ──

    /// Book one or more services back to back for a provider. Either every
    /// interval is free and all are created, or nothing is written.
    pub async fn create_booking(
        &self,
        req: BookingRequest,
    ) -> Result<Vec<Booking>, SchedulingError> {
        if req.service_ids.is_empty() {
            return Err(SchedulingError::InvalidRequest("no services requested".into()));
        }
        let provider = self.load_provider(&req.provider_id)?;

        let mut plan = Vec::with_capacity(req.service_ids.len());
        let mut cursor = req.start_time;
        for service_id in &req.service_ids {
            let service = self.load_service(service_id, Some(provider.id.as_str()))?;
            let end = Self::slot_end(cursor, &service)?;
            plan.push(SlotPlan {
                service,
                start: cursor,
                end,
            });
            cursor = end;
        }

        self.place(
            &req.user_id,
            &provider,
            &plan,
            &Grouping::default(),
            req.notes.as_deref(),
        )
        .await
    }

    async fn book_occurrence(
        &self,
        user_id: &str,
        provider: &Provider,
        service: &Service,
        start: NaiveDateTime,
        grouping: &Grouping,
        notes: Option<&str>,
    ) -> Result<Booking, SchedulingError> {
        let plan = [SlotPlan {
            service: service.clone(),
            start,
            end: Self::slot_end(start, service)?,
        }];
        let mut created = self.place(user_id, provider, &plan, grouping, notes).await?;
        created
            .pop()
            .ok_or_else(|| SchedulingError::Persistence("booking was not created".into()))
    }

    /// Expand the recurrence and book every date. Occurrences are independent:
    /// a failed one is reported and earlier ones are kept.
    pub async fn create_recurring_booking(
        &self,
        req: RecurringRequest,
    ) -> Result<RecurringOutcome, SchedulingError> {
        let start_date = req.start.date();
        let dates = self
            .recurrence
            .expand(start_date, req.frequency, req.end_date, &req.skip_dates)?;
        let service = self.load_service(&req.service_id, None)?;
        let provider = self.load_provider(&service.business_id)?;

        let series = RecurringSeries {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id.clone(),
            service_id: service.id.clone(),
            frequency: req.frequency,
            start_date,
            end_date: req.end_date,
            start_time: req.start.time(),
            skip_dates: req.skip_dates.clone(),
            created_at: self.clock.now(),
        };
        self.store.create_series(&series)?;
        tracing::info!(
            series_id = %series.id,
            frequency = series.frequency.as_str(),
            occurrences = dates.len(),
            "recurring series created"
        );

        let grouping = Grouping {
            series_id: Some(series.id.clone()),
            package_id: None,
        };
        let mut occurrences = Vec::with_capacity(dates.len());
        for date in dates {
            let start = date.and_time(series.start_time);
            let outcome = self
                .book_occurrence(
                    &req.user_id,
                    &provider,
                    &service,
                    start,
                    &grouping,
                    req.notes.as_deref(),
                )
                .await;
            if let Err(e) = &outcome {
                tracing::warn!(series_id = %series.id, %start, error = %e, "occurrence not booked");
            }
            occurrences.push(OccurrenceResult {
                service_id: service.id.clone(),
                start_time: start,
                outcome,
            });
        }

        Ok(RecurringOutcome {
            series,
            occurrences,
        })
    }

    /// Pair `service[i]` with `preferred_dates[i]` (or the first date when the
    /// list runs short) and book each pair independently.
    pub async fn create_package_booking(
        &self,
        req: PackageRequest,
    ) -> Result<Vec<OccurrenceResult>, SchedulingError> {
        let package = self
            .store
            .get_package(&req.package_id)?
            .ok_or_else(|| SchedulingError::NotFound(format!("package {}", req.package_id)))?;
        let Some(first_date) = req.preferred_dates.first().copied() else {
            return Err(SchedulingError::InvalidRequest("no preferred dates given".into()));
        };
        let provider = self.load_provider(&package.business_id)?;

        let grouping = Grouping {
            series_id: None,
            package_id: Some(package.id.clone()),
        };
        let mut occurrences = Vec::with_capacity(package.service_ids.len());
        for (i, service_id) in package.service_ids.iter().enumerate() {
            let start = req.preferred_dates.get(i).copied().unwrap_or(first_date);
            let outcome = match self.load_service(service_id, Some(provider.id.as_str())) {
                Ok(service) => {
                    self.book_occurrence(
                        &req.user_id,
                        &provider,
                        &service,
                        start,
                        &grouping,
                        req.notes.as_deref(),
                    )
                    .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = &outcome {
                tracing::warn!(package_id = %package.id, %service_id, error = %e, "package item not booked");
            }
            occurrences.push(OccurrenceResult {
                service_id: service_id.clone(),
                start_time: start,
                outcome,
            });
        }
        Ok(occurrences)
    }

    /// Move a booking through the status machine. Cancelling frees the slot
    /// and offers it to the waitlist.
    pub async fn transition_booking(
        &self,
        booking_id: &str,
        next: BookingStatus,
    ) -> Result<CancelOutcome, SchedulingError> {
        let provider_id = self
            .store
            .get_booking(booking_id)?
            .ok_or_else(|| SchedulingError::NotFound(format!("booking {booking_id}")))?
            .provider_id;

        let booking = {
            let _guard = self.provider_locks.lock(&provider_id).await;
            let mut booking = self
                .store
                .get_booking(booking_id)?
                .ok_or_else(|| SchedulingError::NotFound(format!("booking {booking_id}")))?;
            booking.transition(next, self.clock.now())?;
            self.store
                .update_booking_status(&booking.id, booking.status, &booking.updated_at)?;
            booking
        };
        tracing::info!(booking_id, status = booking.status.as_str(), "booking status changed");

        let mut promotion = None;
        let mut promotion_error = None;
        if booking.status == BookingStatus::Cancelled {
            self.notify(
                &booking.user_id,
                Notification::BookingCancelled {
                    booking_id: booking.id.clone(),
                    start_time: booking.start_time,
                },
            )
            .await;
            // The cancellation is already saved; a failed promotion must not undo that.
            match self
                .waitlist
                .on_slot_freed(&booking.service_id, booking.start_time)
                .await
            {
                Ok(p) => promotion = p,
                Err(e) => {
                    tracing::error!(
                        booking_id = %booking.id,
                        service_id = %booking.service_id,
                        error = %e,
                        "freed slot not offered to waitlist, needs manual follow-up"
                    );
                    promotion_error = Some(e.to_string());
                }
            }
        }

        Ok(CancelOutcome {
            booking,
            promotion,
            promotion_error,
        })
    }

    pub async fn cancel_booking(&self, booking_id: &str) -> Result<CancelOutcome, SchedulingError> {
        self.transition_booking(booking_id, BookingStatus::Cancelled).await
    }

    /// Cancel the still-future, still-active bookings of a series. Past and
    /// finished occurrences are left as they are.
    pub async fn cancel_series(&self, series_id: &str) -> Result<Vec<CancelOutcome>, SchedulingError> {
        if self.store.get_series(series_id)?.is_none() {
            return Err(SchedulingError::NotFound(format!("series {series_id}")));
        }

        let now = self.clock.now();
        let mut cancelled = vec![];
        for booking in self.store.bookings_for_series(series_id)? {
            if booking.start_time <= now || !booking.status.is_active() {
                continue;
            }
            match self.cancel_booking(&booking.id).await {
                Ok(outcome) => cancelled.push(outcome),
                // Raced with another transition; nothing left to cancel.
                Err(SchedulingError::InvalidTransition { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        tracing::info!(series_id, cancelled = cancelled.len(), "series cancelled");
        Ok(cancelled)
    }

    pub fn quote_price(
        &self,
        service_id: &str,
        candidate: NaiveDateTime,
    ) -> Result<PriceQuote, SchedulingError> {
        let service = self
            .store
            .get_service(service_id)?
            .ok_or_else(|| SchedulingError::ServiceNotFound(service_id.to_string()))?;
        let demand = self
            .store
            .count_service_bookings_on(service_id, candidate.date())?;
        Ok(self.pricing.quote(service.base_price, candidate, demand))
    }

    /// Free start times for `service_id` with `provider_id` on `date`.
    pub fn check_availability(
        &self,
        provider_id: &str,
        service_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<NaiveDateTime>, SchedulingError> {
        let provider = self.load_provider(provider_id)?;
        let service = self.load_service(service_id, Some(provider.id.as_str()))?;

        let hours = provider
            .business_hours
            .as_ref()
            .filter(|h| !h.slots.is_empty())
            .unwrap_or(&self.default_hours);
        let windows = hours.windows_on(date);

        let day_start = date.and_time(NaiveTime::MIN);
        let day_end = date
            .succ_opt()
            .map_or(NaiveDateTime::MAX, |next| next.and_time(NaiveTime::MIN));
        let existing = self
            .store
            .active_bookings_for_provider(&provider.id, &day_start, &day_end)?;

        Ok(self.availability.find_available_slots(
            date,
            service.duration_minutes,
            &existing,
            &windows,
        ))
    }

    pub fn add_to_waitlist(
        &self,
        user_id: &str,
        service_id: &str,
        preferred_dates: Vec<NaiveDate>,
        notes: Option<String>,
    ) -> Result<crate::models::WaitlistEntry, SchedulingError> {
        self.waitlist.add(user_id, service_id, preferred_dates, notes)
    }
}
