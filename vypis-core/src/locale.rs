//! Czech locale value parsing.
//!
//! Dates are printed as `dd.mm.yyyy`. Amounts use `,` as the decimal separator
//! and `.` or spaces as thousands separators, e.g. `1.234,56` or `1 234,56`.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{LocaleParseError, Result};

/// Explicit sign token carried by an amount cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Unsigned,
    Positive,
    Negative,
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").expect("date regex"))
}

fn leading_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<date>\d{1,2}\.\d{1,2}\.\d{4})(?:\s+(?P<rest>.*))?$")
            .expect("leading date regex")
    })
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?P<sign>[+-])?\s*",
            r"(?P<int>\d{1,3}(?:[ .\x{a0}\x{202f}]\d{3})+|\d+)",
            r"(?:,(?P<frac>\d+))?",
            r"(?:\s*\p{L}{1,3})?$"
        ))
        .expect("amount regex")
    })
}

/// Parse a `dd.mm.yyyy` date, rejecting values outside the calendar.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let token = text.trim();
    let caps = date_re()
        .captures(token)
        .ok_or_else(|| LocaleParseError::date(token))?;

    let day: u32 = caps[1].parse().map_err(|_| LocaleParseError::date(token))?;
    let month: u32 = caps[2].parse().map_err(|_| LocaleParseError::date(token))?;
    let year: i32 = caps[3].parse().map_err(|_| LocaleParseError::date(token))?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| LocaleParseError::date(token))
}

/// Parse a localized amount and return its magnitude.
///
/// Callers resolve direction from the layout column or from [`amount_sign`].
pub fn parse_amount(text: &str) -> Result<Decimal> {
    let token = text.trim();
    let normalized = token.replace('\u{2212}', "-");
    let caps = amount_re()
        .captures(&normalized)
        .ok_or_else(|| LocaleParseError::amount(token))?;

    let int: String = caps["int"].chars().filter(|c| c.is_ascii_digit()).collect();
    let canonical = match caps.name("frac") {
        Some(frac) => format!("{int}.{}", frac.as_str()),
        None => int,
    };

    Decimal::from_str(&canonical)
        .map(|d| d.abs())
        .map_err(|_| LocaleParseError::amount(token))
}

/// Report the explicit sign of an amount cell without parsing its value.
pub fn amount_sign(text: &str) -> Sign {
    match text.trim_start().chars().next() {
        Some('-') | Some('\u{2212}') => Sign::Negative,
        Some('+') => Sign::Positive,
        _ => Sign::Unsigned,
    }
}

/// True when the cell looks like a localized amount.
pub fn is_amount_shaped(text: &str) -> bool {
    let token = text.trim();
    !token.is_empty() && amount_re().is_match(&token.replace('\u{2212}', "-"))
}

/// Split a cell that starts with a date-shaped token into `(date, rest)`.
///
/// Only the shape is checked; the date itself may still fail [`parse_date`].
pub fn split_leading_date(text: &str) -> Option<(&str, &str)> {
    let caps = leading_date_re().captures(text.trim())?;
    let date = caps.name("date")?.as_str();
    let rest = caps.name("rest").map(|m| m.as_str().trim()).unwrap_or("");
    Some((date, rest))
}
