//! Timezone-aware time/date utilities and the natural-language date-expression
//! resolver (§4.2).
//!
//! Grounded on the teacher's `utils/time.rs` warn-and-fallback idiom (never
//! panic on a bad timestamp, log and fall back to a safe default) and on the
//! original `utils/time.py`'s folder/filename formatting semantics.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Weekday};
use chrono_tz::Tz;

use crate::core::constants::{DATE_FOLDER_FORMAT, DEFAULT_TIMEZONE, TIME_FILENAME_FORMAT};

/// Resolve the configured timezone, falling back to the default on an
/// unrecognized IANA name.
pub fn resolve_timezone(name: Option<&str>) -> Tz {
    let name = name.unwrap_or(DEFAULT_TIMEZONE);
    name.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(timezone = name, "unknown timezone, falling back to default");
        DEFAULT_TIMEZONE
            .parse::<Tz>()
            .expect("default timezone constant must be valid")
    })
}

/// The server's current date in the configured timezone, `YYYY-MM-DD`.
pub fn today(tz: Tz) -> NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}

/// Folder name for a date: unchanged if already given, else today's date.
pub fn format_date_folder(date: Option<&str>, tz: Tz) -> String {
    match date {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => today(tz).format(DATE_FOLDER_FORMAT).to_string(),
    }
}

/// Recognize both the canonical `YYYY-MM-DD` form and the legacy
/// `YYYY年MM月DD日` form written by older snapshots.
pub fn parse_day_folder_name(name: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(name, "%Y-%m-%d") {
        return Some(d);
    }
    let cleaned: String = name
        .replace('年', "-")
        .replace('月', "-")
        .replace('日', "");
    NaiveDate::parse_from_str(&cleaned, "%Y-%m-%d").ok()
}

/// File-safe `HH-MM` timestamp (colons are not valid in Windows filenames).
pub fn format_time_filename(tz: Tz) -> String {
    chrono::Utc::now().with_timezone(&tz).format(TIME_FILENAME_FORMAT).to_string()
}

/// `HH:MM` for on-screen display right now.
pub fn current_time_display(tz: Tz) -> String {
    chrono::Utc::now().with_timezone(&tz).format("%H:%M").to_string()
}

/// Convert a filename-safe `HH-MM` string to the `HH:MM` display form.
pub fn convert_time_for_display(time_str: &str) -> String {
    time_str.replacen('-', ":", 1)
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DateRangeError {
    #[error("unrecognized date expression: {0}")]
    Unrecognized(String),
    #[error("invalid date in range: {0}")]
    InvalidDate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn single(date: NaiveDate) -> Self {
        let s = date.format("%Y-%m-%d").to_string();
        Self {
            start: s.clone(),
            end: s,
        }
    }

    pub fn span(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.format("%Y-%m-%d").to_string(),
            end: end.format("%Y-%m-%d").to_string(),
        }
    }

    /// All dates in the inclusive range, as `YYYY-MM-DD` strings.
    pub fn dates(&self) -> Result<Vec<String>, DateRangeError> {
        let start = NaiveDate::parse_from_str(&self.start, "%Y-%m-%d")
            .map_err(|_| DateRangeError::InvalidDate(self.start.clone()))?;
        let end = NaiveDate::parse_from_str(&self.end, "%Y-%m-%d")
            .map_err(|_| DateRangeError::InvalidDate(self.end.clone()))?;
        let mut out = Vec::new();
        let mut d = start;
        while d <= end {
            out.push(d.format("%Y-%m-%d").to_string());
            d += Duration::days(1);
        }
        Ok(out)
    }
}

/// Resolve a date expression into an inclusive `{start, end}` range (§4.2).
///
/// Accepts: `today`/`今天`, `yesterday`/`昨天`, `this week`/`本周`,
/// `last week`/`上周`, `this month`/`本月`, `last month`/`上月`,
/// `last N days`/`最近N天`, a single `YYYY-MM-DD` date, or `{start, end}` which
/// is returned unchanged after validation.
pub fn resolve_date_range(expr: &str, tz: Tz) -> Result<DateRange, DateRangeError> {
    let today = today(tz);
    let trimmed = expr.trim();
    let lower = trimmed.to_lowercase();

    match lower.as_str() {
        "today" | "今天" => return Ok(DateRange::single(today)),
        "yesterday" | "昨天" => return Ok(DateRange::single(today - Duration::days(1))),
        "this week" | "本周" => return Ok(week_range(today, 0)),
        "last week" | "上周" => return Ok(week_range(today, -1)),
        "this month" | "本月" => return Ok(month_range(today, 0)),
        "last month" | "上月" => return Ok(month_range(today, -1)),
        _ => {}
    }

    if let Some(n) = parse_last_n_days(&lower) {
        if n == 0 {
            return Err(DateRangeError::Unrecognized(expr.to_string()));
        }
        let start = today - Duration::days((n - 1) as i64);
        return Ok(DateRange::span(start, today));
    }

    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(DateRange::single(d));
    }

    Err(DateRangeError::Unrecognized(expr.to_string()))
}

fn parse_last_n_days(lower: &str) -> Option<u32> {
    if let Some(rest) = lower.strip_prefix("last ").and_then(|r| r.strip_suffix(" days")) {
        return rest.trim().parse::<u32>().ok();
    }
    if let Some(rest) = lower.strip_prefix("最近").and_then(|r| r.strip_suffix("天")) {
        return rest.trim().parse::<u32>().ok();
    }
    None
}

fn week_range(today: NaiveDate, offset_weeks: i64) -> DateRange {
    let days_since_monday = today.weekday().num_days_from_monday() as i64;
    let monday = today - Duration::days(days_since_monday) + Duration::weeks(offset_weeks);
    let sunday = monday + Duration::days(6);
    DateRange::span(monday, sunday)
}

fn month_range(today: NaiveDate, offset_months: i64) -> DateRange {
    let mut year = today.year();
    let mut month = today.month() as i64 + offset_months;
    while month < 1 {
        month += 12;
        year -= 1;
    }
    while month > 12 {
        month -= 12;
        year += 1;
    }
    let month = month as u32;
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid year/month");
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("valid year/month");
    let last = next_first - Duration::days(1);
    DateRange::span(first, last)
}

/// Parse a legacy-or-canonical folder name into a `DateTime<Tz>` at midnight,
/// used by retention pruning to compare folder age against a cutoff.
pub fn folder_datetime(name: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let date = parse_day_folder_name(name)?;
    tz.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shanghai() -> Tz {
        resolve_timezone(None)
    }

    #[test]
    fn resolves_last_n_days_english_and_chinese() {
        let tz = shanghai();
        let range_en = resolve_date_range("last 7 days", tz).unwrap();
        let range_cn = resolve_date_range("最近7天", tz).unwrap();
        assert_eq!(range_en, range_cn);
        assert_eq!(range_en.dates().unwrap().len(), 7);
    }

    #[test]
    fn resolves_single_date() {
        let tz = shanghai();
        let range = resolve_date_range("2025-01-15", tz).unwrap();
        assert_eq!(range.start, "2025-01-15");
        assert_eq!(range.end, "2025-01-15");
    }

    #[test]
    fn rejects_unrecognized_expression() {
        let tz = shanghai();
        assert!(resolve_date_range("next decade", tz).is_err());
    }

    #[test]
    fn week_range_spans_monday_to_sunday() {
        let monday = NaiveDate::from_ymd_opt(2025, 11, 24).unwrap();
        let range = week_range(monday, 0);
        assert_eq!(range.start, "2025-11-24");
        assert_eq!(range.end, "2025-11-30");
    }

    #[test]
    fn legacy_folder_name_parses() {
        assert_eq!(
            parse_day_folder_name("2025年11月26日"),
            NaiveDate::from_ymd_opt(2025, 11, 26)
        );
    }

    #[test]
    fn display_conversion_is_one_shot() {
        assert_eq!(convert_time_for_display("09-05"), "09:05");
    }
}
