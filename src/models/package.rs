use serde::{Deserialize, Serialize};

/// A bundle of services sold together and booked in one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub business_id: String,
    pub name: String,
    /// Ordered; position i is paired with the i-th preferred date.
    pub service_ids: Vec<String>,
}
