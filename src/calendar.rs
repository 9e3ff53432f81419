//! Calendar Helpers
//! Month naming, fiscal-year ordering and the date formats found in the plant extracts.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub const SHORT_MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Rank given to month labels that are not month names, so they sort last.
const UNKNOWN_MONTH_RANK: u32 = 13;

/// Long month name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

pub fn short_month_name(month: u32) -> Option<&'static str> {
    SHORT_MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// 1-based month number from a long or short month name, case-insensitive.
pub fn month_from_name(name: &str) -> Option<u32> {
    let name = name.trim();
    MONTH_NAMES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name))
        .or_else(|| {
            SHORT_MONTH_NAMES
                .iter()
                .position(|m| m.eq_ignore_ascii_case(name))
        })
        .map(|i| i as u32 + 1)
}

/// Position of a month inside the April→March financial year (April = 1, March = 12).
pub fn fiscal_month_rank(month: u32) -> u32 {
    match month {
        4..=12 => month - 3,
        1..=3 => month + 9,
        _ => UNKNOWN_MONTH_RANK,
    }
}

/// Orders month names April→March. Labels that are not month names go last.
pub fn fiscal_month_cmp(a: &str, b: &str) -> Ordering {
    let rank = |m: &str| month_from_name(m).map_or(UNKNOWN_MONTH_RANK, fiscal_month_rank);
    rank(a).cmp(&rank(b))
}

/// Orders month names January→December. Labels that are not month names go last.
pub fn calendar_month_cmp(a: &str, b: &str) -> Ordering {
    let rank = |m: &str| month_from_name(m).unwrap_or(UNKNOWN_MONTH_RANK);
    rank(a).cmp(&rank(b))
}

/// Calendar quarter (1..=4) of a 1-based month.
pub fn quarter(month: u32) -> u32 {
    (month.clamp(1, 12) - 1) / 3 + 1
}

/// A calendar month of a specific year. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// "Mar 2024"
    pub fn short_label(&self) -> String {
        format!(
            "{} {}",
            short_month_name(self.month).unwrap_or("???"),
            self.year
        )
    }

    /// "March 2024"
    pub fn long_label(&self) -> String {
        format!("{} {}", month_name(self.month).unwrap_or("???"), self.year)
    }

    /// Parse a "Mar 2024" or "March 2024" label.
    pub fn parse_label(label: &str) -> Option<Self> {
        let (month, year) = label.trim().split_once(' ')?;
        Some(Self {
            year: year.trim().parse().ok()?,
            month: month_from_name(month)?,
        })
    }
}

/// Orders month labels such as "Mar 2024" chronologically. Unparseable labels go last.
pub fn month_label_cmp(a: &str, b: &str) -> Ordering {
    match (YearMonth::parse_label(a), YearMonth::parse_label(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

impl fmt::Display for YearMonth {
    /// "2024-03"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// How a date column is written in a given extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `DD-MM-YYYY` or `DD/MM/YYYY`
    DayMonthYear,
    /// `MM-DD-YYYY` or `MM/DD/YYYY`
    MonthDayYear,
    /// `YYYY-MM-DD`
    Iso,
    /// Free-form: ISO dates and datetimes, RFC 3339, US slashes, spelled-out months.
    Auto,
}

const AUTO_DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const AUTO_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

impl DateFormat {
    /// Parse `text` in this format. Impossible calendar dates yield `None`.
    pub fn parse(self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match self {
            DateFormat::DayMonthYear => parse_any(text, &["%d-%m-%Y", "%d/%m/%Y"]),
            DateFormat::MonthDayYear => parse_any(text, &["%m-%d-%Y", "%m/%d/%Y"]),
            DateFormat::Iso => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok(),
            DateFormat::Auto => parse_any(text, &AUTO_DATE_FORMATS)
                .or_else(|| {
                    AUTO_DATETIME_FORMATS
                        .iter()
                        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                        .map(|dt| dt.date())
                })
                .or_else(|| {
                    DateTime::parse_from_rfc3339(text)
                        .ok()
                        .map(|dt| dt.date_naive())
                }),
        }
    }
}

fn parse_any(text: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
}
