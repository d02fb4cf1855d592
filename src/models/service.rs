use serde::{Deserialize, Serialize};

/// Longest bookable service: one day.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    /// The provider (business) offering this service.
    pub business_id: String,
    pub name: String,
    pub duration_minutes: i64,
    pub base_price: f64,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}

impl Service {
    /// `None` when the stored duration is not a positive span of at most a day.
    pub fn duration(&self) -> Option<chrono::Duration> {
        if !(1..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            return None;
        }
        chrono::Duration::try_minutes(self.duration_minutes)
    }
}
