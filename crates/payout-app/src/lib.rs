//! Commission dashboard application.
//!
//! Wires the crates together behind one binary:
//! - `serve`: the HTTP proxy in front of the statement API
//! - `login` / `logout`: verify a token and keep or drop the session
//! - `report`: load commissions for a date range and print the dashboard

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, ConfigSource, DashboardSettings, TelemetrySettings, Transport, UpstreamSettings};
pub use error::{AppError, AppResult};
