//! CVM virtual machine implementation
//!
//! This crate provides the energy-metered contract virtual machine: the instruction set and its
//! pricing, the interpreter, the call/create engine, precompiled contracts and an in-memory state,
//! plus runtime helpers for running code outside of a block.

/// Core VM implementation, including memory, stack, storage, opcodes and the engine
pub mod core;

/// Extensions to the core VM, including runtime helpers for tooling and tests
pub mod ext;
