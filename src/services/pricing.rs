use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Timelike};

use crate::models::{AdjustmentKind, PriceAdjustment, PriceQuote};
use crate::services::clock::Clock;

#[derive(Debug, Clone)]
pub struct PricingRules {
    /// Inclusive hour range `[first, last]` considered peak.
    pub peak_hours: (u32, u32),
    pub peak_multiplier: f64,
    pub last_minute_window: Duration,
    pub last_minute_discount: f64,
    /// `(minimum demand, multiplier)`, highest threshold first.
    pub demand_tiers: Vec<(i64, f64)>,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            peak_hours: (9, 17),
            peak_multiplier: 1.2,
            last_minute_window: Duration::hours(24),
            last_minute_discount: 0.3,
            demand_tiers: vec![(10, 1.5), (5, 1.25)],
        }
    }
}

/// Context-sensitive price quotes. Rules compound in a fixed order: peak hour,
/// last minute, demand.
#[derive(Clone)]
pub struct PricingEngine {
    clock: Arc<dyn Clock>,
    rules: PricingRules,
}

impl PricingEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_rules(clock, PricingRules::default())
    }

    pub fn with_rules(clock: Arc<dyn Clock>, rules: PricingRules) -> Self {
        Self { clock, rules }
    }

    pub fn quote(&self, base_price: f64, candidate: NaiveDateTime, demand: i64) -> PriceQuote {
        let mut running = base_price;
        let mut adjustments = vec![];

        let (first, last) = self.rules.peak_hours;
        if (first..=last).contains(&candidate.hour()) {
            running *= self.rules.peak_multiplier;
            // Reported against the base, even though the running price compounds.
            push_adjustment(
                &mut adjustments,
                AdjustmentKind::PeakHour,
                base_price * (self.rules.peak_multiplier - 1.0),
            );
        }

        if candidate - self.clock.now() <= self.rules.last_minute_window {
            let discount = running * self.rules.last_minute_discount;
            running -= discount;
            push_adjustment(&mut adjustments, AdjustmentKind::LastMinute, -discount);
        }

        let multiplier = self.demand_multiplier(demand);
        if multiplier > 1.0 {
            let delta = running * (multiplier - 1.0);
            running *= multiplier;
            push_adjustment(&mut adjustments, AdjustmentKind::HighDemand, delta);
        }

        PriceQuote {
            base_price,
            adjustments,
            final_price: round_cents(running),
        }
    }

    fn demand_multiplier(&self, demand: i64) -> f64 {
        self.rules
            .demand_tiers
            .iter()
            .find(|(min, _)| demand >= *min)
            .map(|(_, m)| *m)
            .unwrap_or(1.0)
    }
}

fn push_adjustment(adjustments: &mut Vec<PriceAdjustment>, kind: AdjustmentKind, amount: f64) {
    let amount = round_cents(amount);
    if amount != 0.0 {
        adjustments.push(PriceAdjustment { kind, amount });
    }
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
