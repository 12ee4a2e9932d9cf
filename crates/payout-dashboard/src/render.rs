//! Plain-text rendering of the dashboard view.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};
use payout_core::{CommissionRecord, CommissionReport};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::controller::ViewState;
use crate::range::{RangePreset, RangeSelection};

const TITLE: &str = "Deriv Broker Commissions";

/// `$1234.50`: two decimals, half away from zero.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${rounded:.2}")
}

/// Transaction time as a local calendar date.
fn format_date(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// Render the whole view.
pub fn render_view(state: &ViewState) -> String {
    match state {
        ViewState::SignedOut => "Not signed in. Log in with your API token to view commissions.\n"
            .to_string(),
        ViewState::Idle => format!("{TITLE}\n\nNo data loaded.\n"),
        ViewState::Loading { window, .. } => {
            format!("Loading commission data...\n({window})\n")
        }
        ViewState::Error { error, .. } => {
            format!("Error Loading Data\n{}\n\nRetry to try again.\n", error.message)
        }
        ViewState::Loaded { selection, report } => render_report(*selection, report),
    }
}

fn render_report(selection: RangeSelection, report: &CommissionReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;
    let range = summary.date_range();

    let _ = writeln!(out, "{TITLE}");
    let _ = writeln!(out, "{}", range_bar(selection));
    let _ = writeln!(out);
    let _ = writeln!(out, "Total Commissions: {}", format_amount(summary.total()));
    let _ = writeln!(out, "{} transactions", summary.count());
    let _ = writeln!(out, "Date Range: {} to {}", range.start_wire(), range.end_wire());
    let _ = writeln!(out);
    let _ = writeln!(out, "Commission Details");

    if report.is_empty() {
        let _ = writeln!(out, "No commissions in this period.");
        return out;
    }
    out.push_str(&render_table(&report.commissions));
    out
}

/// `[7 Days]  *30 Days*  [90 Days]  [Custom]`, marking the active choice.
fn range_bar(selection: RangeSelection) -> String {
    let active = selection.preset();
    let mut parts: Vec<String> = RangePreset::ALL
        .iter()
        .map(|p| {
            if Some(*p) == active {
                format!("*{}*", p.label())
            } else {
                format!("[{}]", p.label())
            }
        })
        .collect();
    parts.push(match selection {
        RangeSelection::Custom(w) => format!("*Custom {w}*"),
        RangeSelection::Preset(_) => "[Custom]".to_string(),
    });
    parts.join("  ")
}

fn render_table(records: &[CommissionRecord]) -> String {
    let rows: Vec<[String; 4]> = records
        .iter()
        .map(|r| {
            [
                format_date(r.date),
                format_amount(r.amount),
                r.description.clone(),
                r.reference.clone(),
            ]
        })
        .collect();
    let header = ["Date", "Amount", "Description", "Reference"].map(str::to_string);

    let mut widths = header.clone().map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&header).chain(rows.iter()) {
        let line = row
            .iter()
            .zip(widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}
