//! Transaction and block processing for the CVM.
//!
//! This crate sits on top of [`cvm_vm`]: it turns transactions into messages, buys and refunds
//! their energy against a block's [`EnergyPool`](energy_pool::EnergyPool), runs them through the
//! engine and assembles receipts for a whole block.

/// Error types for the core module
pub mod error;

/// Chain and consensus engine interfaces, and block context construction
pub mod chain;
/// The per-block energy pool
pub mod energy_pool;
/// Speculative block execution used to warm up state
pub mod state_prefetcher;
/// Block processing
pub mod state_processor;
/// Transaction level state transition
pub mod state_transition;
/// Messages, transactions, headers, blocks and receipts
pub mod types;

pub use error::Error;
