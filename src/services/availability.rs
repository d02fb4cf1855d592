use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::Booking;

pub const DEFAULT_GRANULARITY_MINUTES: i64 = 30;

/// Interval conflict detection and free-slot search. Pure: no I/O.
#[derive(Debug, Clone)]
pub struct AvailabilityChecker {
    granularity: Duration,
}

impl Default for AvailabilityChecker {
    fn default() -> Self {
        Self::new(DEFAULT_GRANULARITY_MINUTES)
    }
}

impl AvailabilityChecker {
    pub fn new(granularity_minutes: i64) -> Self {
        Self {
            granularity: Duration::try_minutes(granularity_minutes.max(1))
                .unwrap_or_else(|| Duration::minutes(DEFAULT_GRANULARITY_MINUTES)),
        }
    }

    /// True if `[start, end)` overlaps any active booking of `provider_id`.
    pub fn has_conflict(
        &self,
        provider_id: &str,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
        existing: &[Booking],
    ) -> bool {
        self.find_conflict(provider_id, start, end, existing).is_some()
    }

    pub fn find_conflict<'a>(
        &self,
        provider_id: &str,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
        existing: &'a [Booking],
    ) -> Option<&'a Booking> {
        existing.iter().find(|b| {
            b.provider_id == provider_id && b.status.is_active() && b.overlaps(start, end)
        })
    }

    /// Candidate start times on `date`, stepping through each opening window at
    /// the configured granularity. `existing` is expected to hold one provider's
    /// bookings.
    pub fn find_available_slots(
        &self,
        date: NaiveDate,
        duration_minutes: i64,
        existing: &[Booking],
        windows: &[(NaiveTime, NaiveTime)],
    ) -> Vec<NaiveDateTime> {
        let Some(duration) = Duration::try_minutes(duration_minutes).filter(|d| *d > Duration::zero())
        else {
            return vec![];
        };
        let mut slots = vec![];

        for (open, close) in windows {
            let window_end = date.and_time(*close);
            let mut candidate = date.and_time(*open);

            while let Some(candidate_end) = candidate.checked_add_signed(duration) {
                if candidate_end > window_end {
                    break;
                }
                let taken = existing
                    .iter()
                    .any(|b| b.status.is_active() && b.overlaps(&candidate, &candidate_end));
                if !taken {
                    slots.push(candidate);
                }
                match candidate.checked_add_signed(self.granularity) {
                    Some(next) => candidate = next,
                    None => break,
                }
            }
        }

        slots.sort();
        slots.dedup();
        slots
    }
}
