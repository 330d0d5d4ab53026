/// Helpers for running code against a standalone in-memory state
pub mod runtime;
