//! NIDS demo server
//!
//! Serves the HTML page and JSON/CSV prediction API over a classifier that is
//! loaded once at startup.

pub mod api;
pub mod config;
pub mod ui;
