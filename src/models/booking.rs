use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::SchedulingError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub provider_id: String,
    pub service_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    /// Snapshot of the service duration at creation time.
    pub duration_minutes: i64,
    /// Snapshot of the quoted final price at creation time.
    pub price: f64,
    pub status: BookingStatus,
    pub series_id: Option<String>,
    pub package_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }

    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: &NaiveDateTime, end: &NaiveDateTime) -> bool {
        self.start_time < *end && *start < self.end_time
    }

    /// Move to `next`, rejecting anything the status machine does not allow.
    pub fn transition(
        &mut self,
        next: BookingStatus,
        at: NaiveDateTime,
    ) -> Result<(), SchedulingError> {
        if !self.status.can_transition_to(next) {
            return Err(SchedulingError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            "no_show" => Some(BookingStatus::NoShow),
            _ => None,
        }
    }

    /// Pending and confirmed bookings hold their slot.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, NoShow)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            id: "b-1".to_string(),
            user_id: "u-1".to_string(),
            provider_id: "p-1".to_string(),
            service_id: "s-1".to_string(),
            start_time: dt("2025-06-16 10:00"),
            end_time: dt("2025-06-16 11:00"),
            duration_minutes: 60,
            price: 50.0,
            status,
            series_id: None,
            package_id: None,
            notes: None,
            created_at: dt("2025-06-01 09:00"),
            updated_at: dt("2025-06-01 09:00"),
        }
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
            BookingStatus::NoShow,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("bogus"), None);
    }

    #[test]
    fn test_pending_can_be_confirmed_or_cancelled() {
        let mut b = booking(BookingStatus::Pending);
        b.transition(BookingStatus::Confirmed, dt("2025-06-02 09:00")).unwrap();
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert_eq!(b.updated_at, dt("2025-06-02 09:00"));

        let mut b = booking(BookingStatus::Pending);
        b.transition(BookingStatus::Cancelled, dt("2025-06-02 09:00")).unwrap();
        assert_eq!(b.status, BookingStatus::Cancelled);
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let mut b = booking(BookingStatus::Cancelled);
        let err = b
            .transition(BookingStatus::Confirmed, dt("2025-06-02 09:00"))
            .unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidTransition { .. }));
        assert_eq!(b.status, BookingStatus::Cancelled);
        assert_eq!(b.updated_at, dt("2025-06-01 09:00"));
    }

    #[test]
    fn test_pending_cannot_complete() {
        let mut b = booking(BookingStatus::Pending);
        assert!(b.transition(BookingStatus::Completed, dt("2025-06-02 09:00")).is_err());
        assert!(b.transition(BookingStatus::NoShow, dt("2025-06-02 09:00")).is_err());
    }

    #[test]
    fn test_overlaps_is_half_open() {
        let b = booking(BookingStatus::Confirmed);
        assert!(b.overlaps(&dt("2025-06-16 10:30"), &dt("2025-06-16 11:30")));
        assert!(!b.overlaps(&dt("2025-06-16 11:00"), &dt("2025-06-16 12:00")));
        assert!(!b.overlaps(&dt("2025-06-16 09:00"), &dt("2025-06-16 10:00")));
    }
}
