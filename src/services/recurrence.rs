use chrono::{Duration, Months, NaiveDate};

use crate::errors::SchedulingError;
use crate::models::Frequency;

pub const DEFAULT_MAX_OCCURRENCES: usize = 260;

/// Expands a recurrence rule into concrete dates.
///
/// Occurrence `n` is always derived from the start date (`start + n * step`),
/// never from the previous occurrence, so a monthly series anchored on the
/// 31st clamps to short months without drifting: Jan 31, Feb 28, Mar 31, ...
#[derive(Debug, Clone)]
pub struct RecurrenceExpander {
    max_occurrences: usize,
}

impl Default for RecurrenceExpander {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OCCURRENCES)
    }
}

impl RecurrenceExpander {
    pub fn new(max_occurrences: usize) -> Self {
        Self { max_occurrences }
    }

    /// Dates from `start` through `end` inclusive, minus `skip`.
    ///
    /// Skipped dates still consume their step in the cadence.
    pub fn expand(
        &self,
        start: NaiveDate,
        frequency: Frequency,
        end: NaiveDate,
        skip: &[NaiveDate],
    ) -> Result<Vec<NaiveDate>, SchedulingError> {
        if end < start {
            return Err(SchedulingError::InvalidRecurrenceRange(format!(
                "end date {end} is before start date {start}"
            )));
        }

        let mut dates = vec![];
        for n in 0.. {
            let Some(date) = nth_occurrence(start, frequency, n) else {
                break;
            };
            if date > end {
                break;
            }
            if n as usize >= self.max_occurrences {
                return Err(SchedulingError::InvalidRecurrenceRange(format!(
                    "more than {} occurrences between {start} and {end}",
                    self.max_occurrences
                )));
            }
            if !skip.contains(&date) {
                dates.push(date);
            }
        }
        Ok(dates)
    }
}

fn nth_occurrence(start: NaiveDate, frequency: Frequency, n: u32) -> Option<NaiveDate> {
    match frequency {
        Frequency::Weekly => start.checked_add_signed(Duration::weeks(n as i64)),
        Frequency::Biweekly => start.checked_add_signed(Duration::weeks(2 * n as i64)),
        // chrono clamps to the last day of the target month.
        Frequency::Monthly => start.checked_add_months(Months::new(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_weekly_inclusive_bounds() {
        let dates = RecurrenceExpander::default()
            .expand(d("2025-06-02"), Frequency::Weekly, d("2025-06-23"), &[])
            .unwrap();
        assert_eq!(
            dates,
            vec![d("2025-06-02"), d("2025-06-09"), d("2025-06-16"), d("2025-06-23")]
        );
    }

    #[test]
    fn test_biweekly() {
        let dates = RecurrenceExpander::default()
            .expand(d("2025-06-02"), Frequency::Biweekly, d("2025-07-10"), &[])
            .unwrap();
        assert_eq!(dates, vec![d("2025-06-02"), d("2025-06-16"), d("2025-06-30")]);
    }

    #[test]
    fn test_monthly_clamps_to_month_end() {
        let dates = RecurrenceExpander::default()
            .expand(d("2025-01-31"), Frequency::Monthly, d("2025-05-31"), &[])
            .unwrap();
        assert_eq!(
            dates,
            vec![
                d("2025-01-31"),
                d("2025-02-28"),
                d("2025-03-31"),
                d("2025-04-30"),
                d("2025-05-31"),
            ]
        );
    }

    #[test]
    fn test_monthly_leap_year() {
        let dates = RecurrenceExpander::default()
            .expand(d("2024-01-31"), Frequency::Monthly, d("2024-02-29"), &[])
            .unwrap();
        assert_eq!(dates, vec![d("2024-01-31"), d("2024-02-29")]);
    }

    #[test]
    fn test_skip_does_not_shift_cadence() {
        let dates = RecurrenceExpander::default()
            .expand(
                d("2025-06-02"),
                Frequency::Weekly,
                d("2025-06-30"),
                &[d("2025-06-16"), d("2025-06-18")],
            )
            .unwrap();
        assert_eq!(
            dates,
            vec![d("2025-06-02"), d("2025-06-09"), d("2025-06-23"), d("2025-06-30")]
        );
    }

    #[test]
    fn test_length_and_bounds() {
        let expander = RecurrenceExpander::default();
        let start = d("2025-03-05");
        let end = d("2025-11-20");
        let skip = [d("2025-04-02"), d("2025-07-30")];
        for frequency in [Frequency::Weekly, Frequency::Biweekly, Frequency::Monthly] {
            let all = expander.expand(start, frequency, end, &[]).unwrap();
            let kept = expander.expand(start, frequency, end, &skip).unwrap();
            let skipped_in_cadence = all.iter().filter(|d| skip.contains(d)).count();
            assert_eq!(kept.len(), all.len() - skipped_in_cadence);
            assert!(kept.iter().all(|d| start <= *d && *d <= end));
            assert!(kept.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_single_day_range() {
        let dates = RecurrenceExpander::default()
            .expand(d("2025-06-02"), Frequency::Monthly, d("2025-06-02"), &[])
            .unwrap();
        assert_eq!(dates, vec![d("2025-06-02")]);
    }

    #[test]
    fn test_end_before_start_rejected() {
        let err = RecurrenceExpander::default()
            .expand(d("2025-06-02"), Frequency::Weekly, d("2025-06-01"), &[])
            .unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidRecurrenceRange(_)));
    }

    #[test]
    fn test_occurrence_limit() {
        let err = RecurrenceExpander::new(3)
            .expand(d("2025-06-02"), Frequency::Weekly, d("2025-12-31"), &[])
            .unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidRecurrenceRange(_)));
    }
}
