//! The Disassembler module turns CVM bytecode into human-readable assembly, one instruction per
//! line, with the immediate data of every PUSH instruction.

/// Error types for the disassembler module
pub mod error;

mod core;
mod interfaces;

// re-export the public interface
pub use core::disassemble;
pub use error::Error;
pub use interfaces::{DisassemblerArgs, DisassemblerArgsBuilder};
