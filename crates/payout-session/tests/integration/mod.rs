//! Integration test support for payout-session.
//!
//! The mock upstream speaks the session protocol over a real WebSocket:
//! - Scripted replies to authorize / statement requests
//! - Records every frame the client sends
//! - Records whether the client closed the connection

pub mod common;
