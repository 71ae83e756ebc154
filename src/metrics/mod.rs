//! Metrics aggregation and telemetry.

pub mod hub;
pub mod sink;
