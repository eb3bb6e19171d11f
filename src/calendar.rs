use crate::error::{Result, SyntheticLedgerError};
use chrono::{Datelike, Days, NaiveDate};

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .checked_sub_days(Days::new(1))
        .unwrap()
}

pub fn first_day_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

/// Returns every (year, month) pair from `start`'s month through `end`'s month
/// inclusive, in chronological order.
pub fn month_sequence(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let mut year = start.year();
    let mut month = start.month();

    while (year, month) <= (end.year(), end.month()) {
        months.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    months
}

/// Builds a date on `day` of the month after (year, month), clamping the day
/// to the target month's length (e.g. day 31 after January lands on Feb 28/29).
pub fn day_in_next_month(year: i32, month: u32, day: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    let clamped = day.min(last_day_of_month(next_year, next_month).day());
    NaiveDate::from_ymd_opt(next_year, next_month, clamped).unwrap()
}

pub fn days_after(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(days as u64)).unwrap()
}

pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

/// Formats a date as its "YYYY-MM" period bucket key.
pub fn period_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Parses a period string in the format "YYYY-MM" and returns the first and
/// last day of that month.
pub fn parse_period(period: &str) -> Result<(NaiveDate, NaiveDate)> {
    let start_str = format!("{}-01", period.trim());
    let start_date = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").map_err(|_| {
        SyntheticLedgerError::DateError(format!(
            "Invalid period format: {}. Expected YYYY-MM",
            period
        ))
    })?;

    let end_date = last_day_of_month(start_date.year(), start_date.month());
    Ok((start_date, end_date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2023, 2),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day_of_month(2023, 12),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_month_sequence_spans_year_boundary() {
        let start = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
        let months = month_sequence(start, end);
        assert_eq!(months, vec![(2023, 11), (2023, 12), (2024, 1), (2024, 2)]);
    }

    #[test]
    fn test_month_sequence_single_month() {
        let start = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 5, 31).unwrap();
        assert_eq!(month_sequence(start, end), vec![(2023, 5)]);
    }

    #[test]
    fn test_day_in_next_month_clamps() {
        assert_eq!(
            day_in_next_month(2023, 1, 31),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
        assert_eq!(
            day_in_next_month(2023, 12, 25),
            NaiveDate::from_ymd_opt(2024, 1, 25).unwrap()
        );
    }

    #[test]
    fn test_months_between() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(months_between(start, end), 14);
        assert_eq!(months_between(start, start), 0);
    }

    #[test]
    fn test_period_key() {
        let date = NaiveDate::from_ymd_opt(2023, 4, 17).unwrap();
        assert_eq!(period_key(date), "2023-04");
    }

    #[test]
    fn test_parse_period() {
        let (start, end) = parse_period("2023-02").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());

        assert!(parse_period("2023/02").is_err());
    }
}
