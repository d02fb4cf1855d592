use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WaitlistStatus {
    Pending,
    Notified,
    Expired,
    Converted,
}

impl WaitlistStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitlistStatus::Pending => "pending",
            WaitlistStatus::Notified => "notified",
            WaitlistStatus::Expired => "expired",
            WaitlistStatus::Converted => "converted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WaitlistStatus::Pending),
            "notified" => Some(WaitlistStatus::Notified),
            "expired" => Some(WaitlistStatus::Expired),
            "converted" => Some(WaitlistStatus::Converted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitlistEntry {
    pub id: String,
    pub user_id: String,
    pub service_id: String,
    pub preferred_dates: Vec<NaiveDate>,
    /// Score as of the last evaluation; recomputed whenever entries are ranked.
    pub priority: f64,
    pub notes: Option<String>,
    pub status: WaitlistStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl WaitlistEntry {
    /// An entry with no preferred dates accepts any date.
    pub fn accepts(&self, date: NaiveDate) -> bool {
        self.preferred_dates.is_empty() || self.preferred_dates.contains(&date)
    }
}
