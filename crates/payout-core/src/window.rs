//! Inclusive calendar-date query window.

use std::fmt;

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Length of the window used when the caller gives no dates.
pub const DEFAULT_WINDOW_DAYS: u64 = 30;

/// Wire format for calendar dates.
const WIRE_FORMAT: &str = "%Y-%m-%d";

static WIRE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Parse a `YYYY-MM-DD` wire date.
///
/// The shape is checked first so that `2024/01/01` or `2024-1-1` are
/// rejected even though chrono would otherwise be lenient about padding.
pub fn parse_wire_date(value: &str) -> Result<NaiveDate> {
    if !WIRE_DATE.is_match(value) {
        return Err(CoreError::InvalidDate(value.to_string()));
    }
    NaiveDate::parse_from_str(value, WIRE_FORMAT)
        .map_err(|_| CoreError::InvalidDate(value.to_string()))
}

/// Query bounds, both ends inclusive, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireWindow")]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

/// Unchecked bounds as they arrive over the wire.
#[derive(Deserialize)]
struct WireWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<WireWindow> for DateWindow {
    type Error = CoreError;

    fn try_from(wire: WireWindow) -> Result<Self> {
        Self::new(wire.start, wire.end)
    }
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(CoreError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// `[today - days, today]`.
    pub fn trailing_days(days: u64, today: NaiveDate) -> Self {
        let start = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// `[today - 30d, today]`.
    pub fn default_for(today: NaiveDate) -> Self {
        Self::trailing_days(DEFAULT_WINDOW_DAYS, today)
    }

    /// Build a window from optional wire dates, filling gaps with the
    /// default window's bounds.
    pub fn from_wire(from: Option<&str>, to: Option<&str>, today: NaiveDate) -> Result<Self> {
        let fallback = Self::default_for(today);
        let start = from.map(parse_wire_date).transpose()?.unwrap_or(fallback.start);
        let end = to.map(parse_wire_date).transpose()?.unwrap_or(fallback.end);
        Self::new(start, end)
    }

    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[inline]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// `start` as `YYYY-MM-DD`.
    pub fn start_wire(&self) -> String {
        self.start.format(WIRE_FORMAT).to_string()
    }

    /// `end` as `YYYY-MM-DD`.
    pub fn end_wire(&self) -> String {
        self.end.format(WIRE_FORMAT).to_string()
    }

    /// Number of days between the bounds.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_wire(), self.end_wire())
    }
}
