//! TeamPulse: community and workforce engagement metrics.
//!
//! Syncs chat activity, HR lifecycle data, and webinar attendance exports
//! into a local SQLite store, rolls them up into per-day engagement metrics,
//! and serves dashboard-shaped queries over the result.

pub mod adapters;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod migrations;
pub mod scheduler;
pub mod services;
pub mod trend;
