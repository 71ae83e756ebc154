//! Optimization loop shell.

pub mod learner;
