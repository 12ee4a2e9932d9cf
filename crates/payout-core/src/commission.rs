//! Commission extraction and aggregation.
//!
//! `extract_commissions` is a pure function: it filters statement rows to
//! commissions, normalises each into a `CommissionRecord`, and builds a
//! `Summary` whose totals are always derived from the record set.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::transaction::RawTransaction;
use crate::window::DateWindow;
use crate::{COMMISSION_ACTION, DEFAULT_CURRENCY};

/// A single normalised commission payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRecord {
    /// Transaction time.
    pub date: DateTime<Utc>,
    /// Absolute value of the upstream amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Upstream long description, or the action type when it has none.
    pub description: String,
    pub currency: String,
    /// Upstream transaction id.
    pub reference: String,
}

impl CommissionRecord {
    /// Normalise one statement row. The caller has already checked that
    /// the row is a commission.
    fn from_raw(raw: &RawTransaction) -> Result<Self> {
        let reference = raw.reference();

        let amount = raw.amount.as_ref().ok_or_else(|| CoreError::MissingField {
            reference: reference.clone(),
            field: "amount",
        })?;
        let amount = amount
            .to_decimal()
            .ok_or_else(|| CoreError::InvalidAmount {
                reference: reference.clone(),
                value: amount.as_text(),
            })?
            .abs();

        let time = raw
            .transaction_time
            .as_ref()
            .ok_or_else(|| CoreError::MissingField {
                reference: reference.clone(),
                field: "transaction_time",
            })?;
        let date = time.to_utc().ok_or_else(|| CoreError::InvalidTimestamp {
            reference: reference.clone(),
            value: time.as_text(),
        })?;

        Ok(Self {
            date,
            amount,
            description: non_empty(raw.longcode.as_deref())
                .unwrap_or(&raw.action_type)
                .to_string(),
            currency: non_empty(raw.currency.as_deref())
                .unwrap_or(DEFAULT_CURRENCY)
                .to_string(),
            reference,
        })
    }
}

/// Empty strings count as missing, matching how the upstream omits fields.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Aggregate figures over a record set.
///
/// Only constructible from records, so `total` and `count` cannot drift
/// from the data they describe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    #[serde(with = "rust_decimal::serde::float")]
    total: Decimal,
    count: usize,
    date_range: DateWindow,
}

impl Summary {
    /// Fails when the total does not fit in a `Decimal`.
    pub fn from_records(records: &[CommissionRecord], date_range: DateWindow) -> Result<Self> {
        let total = records
            .iter()
            .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.amount))
            .ok_or(CoreError::TotalOverflow {
                count: records.len(),
            })?;
        Ok(Self {
            total,
            count: records.len(),
            date_range,
        })
    }

    fn empty(date_range: DateWindow) -> Self {
        Self {
            total: Decimal::ZERO,
            count: 0,
            date_range,
        }
    }

    #[inline]
    pub fn total(&self) -> Decimal {
        self.total
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn date_range(&self) -> DateWindow {
        self.date_range
    }
}

/// Records plus their summary; the unit a fetch produces and replaces.
///
/// A deserialized report keeps only the records and the window; the
/// summary figures are recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireReport")]
pub struct CommissionReport {
    pub commissions: Vec<CommissionRecord>,
    pub summary: Summary,
}

#[derive(Deserialize)]
struct WireReport {
    commissions: Vec<CommissionRecord>,
    summary: WireSummary,
}

#[derive(Deserialize)]
struct WireSummary {
    date_range: DateWindow,
}

impl TryFrom<WireReport> for CommissionReport {
    type Error = CoreError;

    fn try_from(wire: WireReport) -> Result<Self> {
        Self::new(wire.commissions, wire.summary.date_range)
    }
}

impl CommissionReport {
    pub fn new(commissions: Vec<CommissionRecord>, date_range: DateWindow) -> Result<Self> {
        let summary = Summary::from_records(&commissions, date_range)?;
        Ok(Self {
            commissions,
            summary,
        })
    }

    /// An empty report for the given window.
    pub fn empty(date_range: DateWindow) -> Self {
        Self {
            commissions: Vec::new(),
            summary: Summary::empty(date_range),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commissions.is_empty()
    }
}

/// Filter statement rows to commissions and summarise them.
///
/// Rows whose `action_type` is not exactly `"commission"` are dropped
/// without inspection. A commission row with a missing or non-numeric
/// amount, or an unreadable time, fails the whole extraction, as does a
/// total too large to represent.
pub fn extract_commissions(
    transactions: &[RawTransaction],
    date_range: DateWindow,
) -> Result<CommissionReport> {
    let records = transactions
        .iter()
        .filter(|t| t.action_type == COMMISSION_ACTION)
        .map(CommissionRecord::from_raw)
        .collect::<Result<Vec<_>>>()?;

    CommissionReport::new(records, date_range)
}
