//! Environment-interaction workers.

pub mod actor;
pub mod noise;
