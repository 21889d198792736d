//! Normalization of raw cell text into record values.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static JP_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日").expect("date pattern"));
static SLASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})[/-](\d{1,2})[/-](\d{1,2})").expect("date pattern"));
static YEAR_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})年?$").expect("year pattern"));
static HORSE_WEIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*\(([+-]?\d+)\)").expect("weight pattern"));

/// Trimmed text, `None` when nothing is left.
pub fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `"1:35.2"` → 95.2, `"59.8"` → 59.8.
pub fn finish_time_seconds(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    match raw.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u32 = minutes.parse().ok()?;
            let seconds: f64 = seconds.parse().ok()?;
            Some(f64::from(minutes) * 60.0 + seconds)
        }
        None => raw.parse().ok(),
    }
}

/// `"480(+2)"` → (480, 2). `"480(計不)"` keeps the weight with no change.
pub fn horse_weight(raw: &str) -> Option<(u32, Option<i32>)> {
    let raw = raw.trim();
    if let Some(caps) = HORSE_WEIGHT.captures(raw) {
        let weight = caps[1].parse().ok()?;
        return Some((weight, caps[2].parse().ok()));
    }
    let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok().map(|w| (w, None))
}

/// Dates as printed by netkeiba (`2024年1月6日`) or JBIS (`2021/04/14`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let caps = JP_DATE
        .captures(raw)
        .or_else(|| SLASH_DATE.captures(raw))?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

/// Birth date as stored: full ISO date when available, else the year.
pub fn birth_date(raw: &str) -> Option<String> {
    if let Some(date) = parse_date(raw) {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    YEAR_ONLY
        .captures(raw.trim())
        .map(|caps| caps[1].to_string())
}

/// Leading integer of a cell ("1 R" → 1, "16頭" → 16).
pub fn leading_number(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim()
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
