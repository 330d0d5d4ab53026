//! The CVM: jump tables, energy pricing, the interpreter loop and the call/create engine.
//!
//! The engine ([`Cvm`]) owns the instruction set for its block and runs nested frames through the
//! interpreter. Instruction behavior lives in [`handlers`], pricing in the energy and memory
//! tables.

mod core;
mod energy_table;
mod execution;
mod jump_table;
mod memory_table;

/// Opcode handlers organized by category.
pub mod handlers;

pub use self::core::{
    can_transfer, transfer, BlockContext, CallOutcome, CanTransferFn, Config, CreateOutcome, Cvm,
    TransferFn, TxContext,
};
pub use energy_table::{memory_energy_cost, Charge};
pub use execution::{Exit, Scope};
pub use jump_table::{
    enable_cip, instruction_set, new_byzantium_instruction_set,
    new_constantinople_instruction_set, new_frontier_instruction_set,
    new_homestead_instruction_set, new_istanbul_instruction_set,
    new_spurious_dragon_instruction_set, new_tangerine_whistle_instruction_set,
    new_yolo_v1_instruction_set, valid_cip, EnergyFn, ExecutionFn, JumpTable, MemorySizeFn,
    Operation, ACTIVATEABLE_CIPS,
};
