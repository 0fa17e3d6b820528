//! Fiscal calendar arithmetic.
//!
//! The fiscal year starts in February: Q1 covers Feb-Apr, Q2 May-Jul,
//! Q3 Aug-Oct, and Q4 Nov-Jan. The fiscal year is named for the calendar
//! year in which its Q4 ends, so August 2024 belongs to FY25 Q3 and
//! January 2025 is still FY25 Q4.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// A fiscal quarter derived from a date. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiscalQuarter {
    pub fiscal_year: i32,
    pub quarter: u8,
    pub label: String,
}

impl FiscalQuarter {
    fn new(fiscal_year: i32, quarter: u8) -> Self {
        Self {
            fiscal_year,
            quarter,
            label: format!("FY{} Q{}", fiscal_year.rem_euclid(100), quarter),
        }
    }

    /// Sort key ordering quarters chronologically.
    pub fn ordinal(&self) -> i64 {
        i64::from(self.fiscal_year) * 4 + i64::from(self.quarter)
    }
}

/// Maps a date to its fiscal quarter. Only the month matters; day-of-month
/// never shifts the result, so Dec 31 and Jan 1 stay in the same Q4 span.
pub fn fiscal_quarter_of(date: &impl Datelike) -> FiscalQuarter {
    let month = date.month();
    let year = date.year();
    match month {
        2..=4 => FiscalQuarter::new(year + 1, 1),
        5..=7 => FiscalQuarter::new(year + 1, 2),
        8..=10 => FiscalQuarter::new(year + 1, 3),
        11 | 12 => FiscalQuarter::new(year + 1, 4),
        _ => FiscalQuarter::new(year, 4),
    }
}

/// Steps backward `offset` quarters from `(fiscal_year, quarter)`, wrapping
/// quarter 0 to Q4 of the prior fiscal year.
pub fn quarter_offset(fiscal_year: i32, quarter: u8, offset: u32) -> (i32, u8) {
    let mut target = i64::from(quarter) - i64::from(offset);
    let mut years_back = 0_i32;
    while target <= 0 {
        target += 4;
        years_back += 1;
    }
    (fiscal_year - years_back, target as u8)
}

/// Returns the last `n` fiscal quarters as `(fiscal_year, quarter)` pairs,
/// most recent first, starting at the quarter containing `reference`.
pub fn trailing_quarters(n: usize, reference: &impl Datelike) -> Vec<(i32, u8)> {
    let current = fiscal_quarter_of(reference);
    let mut quarters = Vec::with_capacity(n);
    let mut fy = current.fiscal_year;
    let mut q = current.quarter;
    for _ in 0..n {
        quarters.push((fy, q));
        if q == 1 {
            q = 4;
            fy -= 1;
        } else {
            q -= 1;
        }
    }
    quarters
}

/// Parses a quarter label such as `FY25 Q3` into `(2025, 3)`.
pub fn parse_quarter_label(label: &str) -> Option<(i32, u8)> {
    let rest = label.trim().strip_prefix("FY")?;
    let (year_part, quarter_part) = rest.split_once(" Q")?;
    let short_year = year_part.parse::<i32>().ok()?;
    let quarter = quarter_part.parse::<u8>().ok()?;
    if !(1..=4).contains(&quarter) {
        return None;
    }
    Some((short_year + 2000, quarter))
}

/// Quarter-over-quarter percentage change; `None` when the prior period is
/// empty.
pub fn quarter_over_quarter_change(current: usize, previous: usize) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    Some((current as f64 - previous as f64) / previous as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::{
        fiscal_quarter_of, parse_quarter_label, quarter_offset, quarter_over_quarter_change,
        trailing_quarters,
    };
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn unit_fiscal_quarter_of_matches_known_buckets() {
        assert_eq!(fiscal_quarter_of(&date(2024, 8, 15)).label, "FY25 Q3");
        assert_eq!(fiscal_quarter_of(&date(2025, 1, 20)).label, "FY25 Q4");
        assert_eq!(fiscal_quarter_of(&date(2025, 2, 3)).label, "FY26 Q1");
        assert_eq!(fiscal_quarter_of(&date(2024, 5, 1)).label, "FY25 Q2");
        assert_eq!(fiscal_quarter_of(&date(2024, 11, 2)).label, "FY25 Q4");
    }

    #[test]
    fn spec_fiscal_year_boundary_splits_between_january_and_february() {
        let january = fiscal_quarter_of(&date(2025, 1, 31));
        let february = fiscal_quarter_of(&date(2025, 2, 1));
        assert_eq!(january.fiscal_year, 2025);
        assert_eq!(january.quarter, 4);
        assert_eq!(february.fiscal_year, 2026);
        assert_eq!(february.quarter, 1);
    }

    #[test]
    fn regression_day_of_month_never_shifts_the_q4_fiscal_year() {
        let dec_31 = fiscal_quarter_of(&date(2024, 12, 31));
        let jan_1 = fiscal_quarter_of(&date(2025, 1, 1));
        assert_eq!(dec_31.fiscal_year, jan_1.fiscal_year);
        assert_eq!(dec_31.quarter, 4);
        assert_eq!(jan_1.quarter, 4);
    }

    #[test]
    fn unit_trailing_quarters_walks_backward_with_wraparound() {
        let quarters = trailing_quarters(6, &date(2025, 3, 10));
        assert_eq!(
            quarters,
            vec![
                (2026, 1),
                (2025, 4),
                (2025, 3),
                (2025, 2),
                (2025, 1),
                (2024, 4),
            ]
        );
    }

    #[test]
    fn unit_trailing_quarters_returns_exactly_n_distinct_pairs() {
        let quarters = trailing_quarters(12, &date(2024, 8, 1));
        assert_eq!(quarters.len(), 12);
        let mut deduped = quarters.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), 12);
        for pair in quarters.windows(2) {
            let (prev_fy, prev_q) = pair[0];
            let (next_fy, next_q) = pair[1];
            let prev_ordinal = i64::from(prev_fy) * 4 + i64::from(prev_q);
            let next_ordinal = i64::from(next_fy) * 4 + i64::from(next_q);
            assert_eq!(prev_ordinal - next_ordinal, 1);
        }
    }

    #[test]
    fn unit_quarter_offset_wraps_into_prior_fiscal_years() {
        assert_eq!(quarter_offset(2026, 1, 0), (2026, 1));
        assert_eq!(quarter_offset(2026, 1, 1), (2025, 4));
        assert_eq!(quarter_offset(2026, 2, 5), (2025, 1));
        assert_eq!(quarter_offset(2026, 3, 8), (2024, 3));
    }

    #[test]
    fn unit_parse_quarter_label_round_trips_generated_labels() {
        assert_eq!(parse_quarter_label("FY25 Q3"), Some((2025, 3)));
        assert_eq!(parse_quarter_label("FY26 Q1"), Some((2026, 1)));
        assert_eq!(parse_quarter_label("FY26 Q5"), None);
        assert_eq!(parse_quarter_label("All Time"), None);
    }

    #[test]
    fn unit_quarter_over_quarter_change_handles_empty_prior_period() {
        assert_eq!(quarter_over_quarter_change(10, 0), None);
        assert_eq!(quarter_over_quarter_change(15, 10), Some(50.0));
        assert_eq!(quarter_over_quarter_change(5, 10), Some(-50.0));
    }
}
