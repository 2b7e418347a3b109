//! Retail Insights - backend API for the retail pipeline dashboard.
//!
//! This library exposes the core modules for use in integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod insights;
pub mod jobs;
pub mod logging;
pub mod queries;
pub mod server;
pub mod warehouse;
