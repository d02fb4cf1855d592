use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

const DAY_ORDER: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub day: String,
    pub start: String,
    pub end: String,
}

/// Weekly opening windows of a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessHours {
    pub slots: Vec<TimeSlot>,
}

impl BusinessHours {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let hours: BusinessHours = serde_json::from_str(s)?;
        hours.validate()?;
        Ok(hours)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for slot in &self.slots {
            parse_weekday(&slot.day)?;
            let start = parse_time(&slot.start)?;
            let end = parse_time(&slot.end)?;
            if start >= end {
                anyhow::bail!("window {}-{} on {} is empty", slot.start, slot.end, slot.day);
            }
        }
        Ok(())
    }

    /// The same window on every day of the week.
    pub fn every_day(open: NaiveTime, close: NaiveTime) -> Self {
        let start = open.format("%H:%M").to_string();
        let end = close.format("%H:%M").to_string();
        Self {
            slots: DAY_ORDER
                .iter()
                .map(|day| TimeSlot {
                    day: day.to_string(),
                    start: start.clone(),
                    end: end.clone(),
                })
                .collect(),
        }
    }

    /// Opening windows on `date`, ordered by start time.
    pub fn windows_on(&self, date: NaiveDate) -> Vec<(NaiveTime, NaiveTime)> {
        let day = weekday_key(date.weekday());
        let mut windows: Vec<(NaiveTime, NaiveTime)> = self
            .slots
            .iter()
            .filter(|slot| slot.day.eq_ignore_ascii_case(day))
            .filter_map(|slot| Some((parse_time(&slot.start).ok()?, parse_time(&slot.end).ok()?)))
            .collect();
        windows.sort();
        windows
    }

    /// True when `[start, end)` fits inside a single window of its day.
    pub fn contains(&self, start: &NaiveDateTime, end: &NaiveDateTime) -> bool {
        if start.date() != end.date() {
            return false;
        }
        self.windows_on(start.date())
            .iter()
            .any(|(open, close)| start.time() >= *open && end.time() <= *close)
    }

    pub fn to_human_readable(&self) -> String {
        if self.slots.is_empty() {
            return String::new();
        }

        let mut sorted_slots = self.slots.clone();
        sorted_slots.sort_by_key(|s| {
            DAY_ORDER
                .iter()
                .position(|d| *d == s.day.to_lowercase())
                .unwrap_or(DAY_ORDER.len())
        });

        sorted_slots
            .iter()
            .map(|s| format!("{}: {}-{}", capitalize(&s.day), s.start, s.end))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn weekday_key(weekday: Weekday) -> &'static str {
    DAY_ORDER[weekday.num_days_from_monday() as usize]
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
    }
}

fn parse_weekday(s: &str) -> anyhow::Result<()> {
    if DAY_ORDER.contains(&s.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(anyhow::anyhow!("invalid weekday: {s}"))
    }
}

pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| anyhow::anyhow!("invalid time: {s}"))
}
