//! Small shared helpers used across the orchestration core.

pub mod duration_serde;
