use serde::{Deserialize, Serialize};

use super::BusinessHours;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    /// Weekly opening windows. `None` falls back to the configured default day.
    pub business_hours: Option<BusinessHours>,
}
