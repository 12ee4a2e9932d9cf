//! Core domain types for the payout commission dashboard.
//!
//! This crate provides the types shared by every transport:
//! - `Token`: opaque bearer credential, redacted in logs, zeroized on drop
//! - `DateWindow`: inclusive calendar-date query bounds (`YYYY-MM-DD` on the wire)
//! - `RawTransaction`: validated boundary type for upstream statement rows
//! - `CommissionRecord`, `Summary`, `CommissionReport`: derived results
//! - `extract_commissions`: the pure commission extraction step

pub mod commission;
pub mod error;
pub mod token;
pub mod transaction;
pub mod window;

pub use commission::{extract_commissions, CommissionRecord, CommissionReport, Summary};
pub use error::{CoreError, ErrorKind, Result};
pub use token::Token;
pub use transaction::{RawAmount, RawReference, RawTimestamp, RawTransaction, StatementPayload};
pub use window::{parse_wire_date, DateWindow, DEFAULT_WINDOW_DAYS};

/// Currency assumed when a transaction does not carry one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// The `action_type` value that marks a commission payout.
pub const COMMISSION_ACTION: &str = "commission";
