//! Common utilities used across the cvm workspace.
//!
//! This crate holds the small helpers that every other crate reaches for: hex encoding and
//! decoding of bytecode and calldata, and file IO used by the configuration and the CLI.

/// General utility functions and types for common tasks.
pub mod utils;
