//! Run-level plumbing:
//! - `config`: validated builder-based configuration
//! - `telemetry`: tracing setup and run counters
//! - `runner`: end-to-end annotation orchestration

pub mod config;
pub mod runner;
pub mod telemetry;
