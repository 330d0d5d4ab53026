/// Chain configuration and the upgrade rules derived from it
pub mod chains;

/// Protocol constants: energy prices, limits and well-known hashes
pub mod constants;

/// Contract frames and jump destination analysis
pub mod contract;

/// VM error taxonomy
pub mod errors;

/// Named protocol upgrades
pub mod hardfork;

/// Log implementation for event handling
pub mod log;

/// Memory implementation for VM memory management
pub mod memory;

/// Opcode definitions and metadata
pub mod opcodes;

/// Precompiled contracts
pub mod precompiles;

/// Stack and return stack implementations
pub mod stack;

/// The state accessor trait and an in-memory implementation
pub mod state;

/// Storage implementation for contract storage
pub mod storage;

/// Execution tracing hooks and the struct logger
pub mod tracer;

/// The CVM engine and interpreter
pub mod vm;
