//! Upstream statement rows.
//!
//! The trading API is loose about types: amounts arrive as strings or
//! numbers, ids as strings or numbers, times as epoch seconds or text.
//! These types accept any JSON at all and defer strict validation to the
//! point where a row is known to be a commission, so an odd row of some
//! other kind never fails a statement.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Amount as sent by the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(serde_json::Number),
    Text(String),
    Other(Value),
}

impl RawAmount {
    /// Parse to an exact decimal. `None` when the value is not numeric.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let text = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
            Self::Other(_) => return None,
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok()
    }

    /// Textual form as received, for error messages.
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::Other(v) => v.to_string(),
        }
    }
}

/// Transaction time: epoch seconds, numeric string, or RFC 3339 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Epoch(i64),
    Text(String),
    Other(Value),
}

impl RawTimestamp {
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Epoch(secs) => Utc.timestamp_opt(*secs, 0).single(),
            Self::Text(text) => {
                let text = text.trim();
                if let Ok(secs) = text.parse::<i64>() {
                    return Utc.timestamp_opt(secs, 0).single();
                }
                if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                    return Some(dt.with_timezone(&Utc));
                }
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            }
            Self::Other(_) => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Epoch(secs) => secs.to_string(),
            Self::Text(s) => s.clone(),
            Self::Other(v) => v.to_string(),
        }
    }
}

/// Transaction id: string or number on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawReference {
    Number(u64),
    Text(String),
    Other(Value),
}

impl RawReference {
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::Other(v) => v.to_string(),
        }
    }
}

/// Wrong-typed values (including `null`) read as the default.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Rows that are not JSON objects cannot be commissions and are skipped.
fn object_rows<'de, D>(deserializer: D) -> Result<Option<Vec<RawTransaction>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(rows.map(|rows| {
        rows.into_iter()
            .filter(Value::is_object)
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect()
    }))
}

/// One row of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default, deserialize_with = "lenient")]
    pub action_type: String,
    #[serde(default)]
    pub amount: Option<RawAmount>,
    #[serde(default)]
    pub transaction_time: Option<RawTimestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub longcode: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<RawReference>,
}

impl RawTransaction {
    /// Reference used in error messages and records; `"<unknown>"` when absent.
    pub fn reference(&self) -> String {
        self.transaction_id
            .as_ref()
            .map(RawReference::as_text)
            .unwrap_or_else(|| "<unknown>".to_string())
    }
}

/// The `statement` object of an upstream reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementPayload {
    /// Absent or `null` both mean "no transactions". Anything other than
    /// an array is still an error.
    #[serde(default, deserialize_with = "object_rows")]
    pub transactions: Option<Vec<RawTransaction>>,
    #[serde(default, deserialize_with = "lenient")]
    pub count: Option<u64>,
}

impl StatementPayload {
    pub fn into_transactions(self) -> Vec<RawTransaction> {
        self.transactions.unwrap_or_default()
    }
}
