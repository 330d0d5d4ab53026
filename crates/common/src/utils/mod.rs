/// Hexadecimal encoding helpers for primitive types.
pub mod hex;

/// Input/output utilities for file manipulation.
pub mod io;

/// String manipulation and hex parsing utilities.
pub mod strings;
