//! Calendar grid model
//!
//! Pure mapping from a year to per-month day metadata, plus the canonical
//! `YYYY-MM-DD` date-key format used to index notes by date. Dates are
//! plain civil dates (`NaiveDate`), never round-tripped through UTC, so a
//! key can never shift by a day across timezones or DST transitions.

use crate::error::{AppError, Result};
use chrono::{Datelike, Local, NaiveDate, Weekday};

/// Weekday abbreviations, Sunday first.
pub const WEEKDAY_ABBREVS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Month abbreviations, January first.
pub const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One day cell of the year grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    /// Day of month, 1-based.
    pub day: u32,
    pub weekday: &'static str,
    pub is_weekend: bool,
    pub is_today: bool,
}

/// Twelve month columns of day cells for the given year, with the today
/// flag computed against the local calendar date.
pub fn year_grid(year: i32) -> [Vec<DayCell>; 12] {
    year_grid_with_today(year, Local::now().date_naive())
}

/// Grid with an injectable "today", for deterministic rendering and tests.
pub fn year_grid_with_today(year: i32, today: NaiveDate) -> [Vec<DayCell>; 12] {
    std::array::from_fn(|month_index| {
        let month = month_index as u32 + 1;
        (1..=31)
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .map(|date| {
                let weekday = date.weekday();
                DayCell {
                    date,
                    day: date.day(),
                    weekday: WEEKDAY_ABBREVS[weekday.num_days_from_sunday() as usize],
                    is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
                    is_today: date == today,
                }
            })
            .collect()
    })
}

/// Format a date as the canonical zero-padded `YYYY-MM-DD` key.
pub fn format_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` key back into a date.
pub fn parse_date_key(key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date key: {key}")))
}
