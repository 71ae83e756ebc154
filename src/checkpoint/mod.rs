//! Checkpoint persistence.

pub mod checkpointer;
