use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentKind {
    PeakHour,
    LastMinute,
    HighDemand,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceAdjustment {
    pub kind: AdjustmentKind,
    /// Signed: surcharges are positive, discounts negative.
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub base_price: f64,
    pub adjustments: Vec<PriceAdjustment>,
    pub final_price: f64,
}

impl PriceQuote {
    pub fn adjustment(&self, kind: AdjustmentKind) -> Option<f64> {
        self.adjustments
            .iter()
            .find(|a| a.kind == kind)
            .map(|a| a.amount)
    }
}
