//! Date range selection.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use payout_core::DateWindow;

use crate::error::{DashboardError, DashboardResult};

/// Fixed trailing ranges offered as buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangePreset {
    Last7Days,
    Last30Days,
    Last90Days,
}

impl RangePreset {
    pub const ALL: [RangePreset; 3] = [Self::Last7Days, Self::Last30Days, Self::Last90Days];

    pub fn days(&self) -> u64 {
        match self {
            Self::Last7Days => 7,
            Self::Last30Days => 30,
            Self::Last90Days => 90,
        }
    }

    /// Short key: `7d`, `30d`, `90d`.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::Last90Days => "90d",
        }
    }

    /// Button label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Last7Days => "7 Days",
            Self::Last30Days => "30 Days",
            Self::Last90Days => "90 Days",
        }
    }
}

impl FromStr for RangePreset {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "7d" => Ok(Self::Last7Days),
            "30d" => Ok(Self::Last30Days),
            "90d" => Ok(Self::Last90Days),
            other => Err(DashboardError::UnknownRange(other.to_string())),
        }
    }
}

impl fmt::Display for RangePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// What the user picked: a preset, resolved against today on every
/// fetch, or a fixed custom window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelection {
    Preset(RangePreset),
    Custom(DateWindow),
}

impl Default for RangeSelection {
    fn default() -> Self {
        Self::Preset(RangePreset::Last30Days)
    }
}

impl RangeSelection {
    /// A custom range. The end may not be after `today`, the start may
    /// not be after the end.
    pub fn custom(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> DashboardResult<Self> {
        if end > today {
            return Err(DashboardError::EndInFuture { end, today });
        }
        let window =
            DateWindow::new(start, end).map_err(|_| DashboardError::StartAfterEnd { start, end })?;
        Ok(Self::Custom(window))
    }

    /// Concrete query window as of `today`.
    pub fn window(&self, today: NaiveDate) -> DateWindow {
        match self {
            Self::Preset(preset) => DateWindow::trailing_days(preset.days(), today),
            Self::Custom(window) => *window,
        }
    }

    pub fn preset(&self) -> Option<RangePreset> {
        match self {
            Self::Preset(p) => Some(*p),
            Self::Custom(_) => None,
        }
    }
}

impl fmt::Display for RangeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preset(p) => write!(f, "{}", p.label()),
            Self::Custom(w) => write!(f, "custom ({w})"),
        }
    }
}
