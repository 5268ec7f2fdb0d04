//! Month label ordering and `"auto"` period resolution.
//!
//! Month columns hold free-form labels (`"July"`, `"jul"`, `"7"`). Tables and
//! charts are ordered by calendar month; labels that are not recognisable
//! months sort after December, alphabetically.

use chrono::{Datelike, Month, NaiveDate, Utc};

/// Calendar number (1-12) of a month label, if it names one.
///
/// Accepts full English names and three-letter abbreviations in any case,
/// and the numbers `1`-`12`.
pub fn month_number(label: &str) -> Option<u32> {
    let trimmed = label.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    trimmed
        .parse::<Month>()
        .ok()
        .map(|m| m.number_from_month())
}

/// Sort key for a month label: calendar months first, then everything else.
pub fn month_sort_key(label: &str) -> (u32, String) {
    (
        month_number(label).unwrap_or(13),
        label.trim().to_lowercase(),
    )
}

/// Full English name of the month containing `date`.
pub fn month_name(date: NaiveDate) -> String {
    Month::try_from(date.month() as u8)
        .map(|m| m.name().to_string())
        .unwrap_or_else(|_| date.month().to_string())
}

/// Week of the month `date` falls in, counting days 1-7 as week 1.
pub fn week_of_month(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}

/// Current (UTC) month, week-of-month and year as report labels.
pub fn current_period() -> (String, String, String) {
    period_for(Utc::now().date_naive())
}

/// Month, week-of-month and year labels for `date`.
pub fn period_for(date: NaiveDate) -> (String, String, String) {
    (
        month_name(date),
        week_of_month(date).to_string(),
        date.year().to_string(),
    )
}
