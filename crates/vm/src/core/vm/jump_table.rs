//! Instruction sets: the per-opcode execution function, energy pricing, stack bounds and control
//! flags, one table per protocol upgrade.

use std::{fmt, sync::Arc};

use alloy::primitives::Bytes;
use eyre::{eyre, Result};
use lazy_static::lazy_static;

use super::{
    super::{
        chains::Rules,
        constants::*,
        errors::VmError,
        opcodes::*,
        stack::Stack,
    },
    core::Cvm,
    energy_table::*,
    execution::Scope,
    handlers::{
        arithmetic, bitwise, block, comparison, control, crypto, environment, logging, memory,
        stack, storage, system,
    },
    memory_table::*,
};

/// Executes one instruction. May move the program counter when the operation `jumps`.
pub type ExecutionFn = fn(&mut u64, &mut Cvm<'_>, &mut Scope<'_>) -> Result<Bytes, VmError>;

/// Prices the dynamic part of an instruction, given the word-aligned memory size it needs.
pub type EnergyFn = fn(&mut Cvm<'_>, &mut Scope<'_>, u64) -> Result<Charge, VmError>;

/// Computes the memory an instruction touches from its operands. `None` signals overflow.
pub type MemorySizeFn = fn(&Stack) -> Option<u64>;

/// A single instruction set entry.
#[derive(Clone, Copy)]
pub struct Operation {
    /// The instruction body.
    pub execute: ExecutionFn,
    /// The fixed energy charged before anything else.
    pub constant_energy: u64,
    /// The variable energy charged after the constant part.
    pub dynamic_energy: Option<EnergyFn>,
    /// Minimum stack height required.
    pub min_stack: usize,
    /// Maximum stack height allowed, so that pushes cannot overflow.
    pub max_stack: usize,
    /// The memory size the instruction needs.
    pub memory_size: Option<MemorySizeFn>,
    /// Whether the instruction ends the frame.
    pub halts: bool,
    /// Whether the instruction sets the program counter itself.
    pub jumps: bool,
    /// Whether the instruction modifies state, and is thus forbidden in read-only frames.
    pub writes: bool,
    /// Whether the instruction ends the frame with a revert.
    pub reverts: bool,
    /// Whether the instruction's output becomes the frame's return data.
    pub returns: bool,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("constant_energy", &self.constant_energy)
            .field("dynamic_energy", &self.dynamic_energy.is_some())
            .field("min_stack", &self.min_stack)
            .field("max_stack", &self.max_stack)
            .field("memory_size", &self.memory_size.is_some())
            .field("halts", &self.halts)
            .field("jumps", &self.jumps)
            .field("writes", &self.writes)
            .field("reverts", &self.reverts)
            .field("returns", &self.returns)
            .finish()
    }
}

impl Operation {
    /// An instruction popping `pops` and pushing `pushes` stack items.
    const fn new(execute: ExecutionFn, constant_energy: u64, pops: usize, pushes: usize) -> Self {
        Self {
            execute,
            constant_energy,
            dynamic_energy: None,
            min_stack: pops,
            max_stack: STACK_LIMIT + pops - pushes,
            memory_size: None,
            halts: false,
            jumps: false,
            writes: false,
            reverts: false,
            returns: false,
        }
    }

    /// DUPn needs `n` items and pushes one.
    const fn dup(execute: ExecutionFn, n: usize) -> Self {
        Self::new(execute, ENERGY_FASTEST_STEP, n, n + 1)
    }

    /// SWAPn needs `n + 1` items and leaves the height unchanged.
    const fn swap(execute: ExecutionFn, n: usize) -> Self {
        Self::new(execute, ENERGY_FASTEST_STEP, n + 1, n + 1)
    }

    const fn dynamic(mut self, energy: EnergyFn) -> Self {
        self.dynamic_energy = Some(energy);
        self
    }

    const fn memory(mut self, size: MemorySizeFn) -> Self {
        self.memory_size = Some(size);
        self
    }

    const fn halts(mut self) -> Self {
        self.halts = true;
        self
    }

    const fn jumps(mut self) -> Self {
        self.jumps = true;
        self
    }

    const fn writes(mut self) -> Self {
        self.writes = true;
        self
    }

    const fn reverts(mut self) -> Self {
        self.reverts = true;
        self
    }

    const fn returns(mut self) -> Self {
        self.returns = true;
        self
    }
}

/// An instruction set, indexed by opcode. Empty slots are invalid opcodes.
#[derive(Clone, Debug)]
pub struct JumpTable([Option<Operation>; 256]);

impl JumpTable {
    /// The operation bound to `op`, if any.
    #[inline]
    pub fn get(&self, op: u8) -> Option<Operation> {
        self.0[op as usize]
    }

    /// Mutable access to the operation bound to `op`.
    pub fn get_mut(&mut self, op: u8) -> Option<&mut Operation> {
        self.0[op as usize].as_mut()
    }

    /// Binds `operation` to `op`.
    pub fn set(&mut self, op: u8, operation: Operation) {
        self.0[op as usize] = Some(operation);
    }

    /// Changes the constant energy of an existing operation.
    fn reprice(&mut self, op: u8, constant_energy: u64) {
        if let Some(operation) = self.get_mut(op) {
            operation.constant_energy = constant_energy;
        }
    }

    /// Whether `op` is part of this instruction set.
    pub fn contains(&self, op: u8) -> bool {
        self.0[op as usize].is_some()
    }
}

lazy_static! {
    static ref FRONTIER_INSTRUCTION_SET: Arc<JumpTable> = Arc::new(new_frontier_instruction_set());
    static ref HOMESTEAD_INSTRUCTION_SET: Arc<JumpTable> =
        Arc::new(new_homestead_instruction_set());
    static ref TANGERINE_WHISTLE_INSTRUCTION_SET: Arc<JumpTable> =
        Arc::new(new_tangerine_whistle_instruction_set());
    static ref SPURIOUS_DRAGON_INSTRUCTION_SET: Arc<JumpTable> =
        Arc::new(new_spurious_dragon_instruction_set());
    static ref BYZANTIUM_INSTRUCTION_SET: Arc<JumpTable> =
        Arc::new(new_byzantium_instruction_set());
    static ref CONSTANTINOPLE_INSTRUCTION_SET: Arc<JumpTable> =
        Arc::new(new_constantinople_instruction_set());
    static ref ISTANBUL_INSTRUCTION_SET: Arc<JumpTable> = Arc::new(new_istanbul_instruction_set());
    static ref YOLO_V1_INSTRUCTION_SET: Arc<JumpTable> = Arc::new(new_yolo_v1_instruction_set());
}

/// The shared instruction set for `rules`. Callers that need to patch it must clone it first.
pub fn instruction_set(rules: &Rules) -> Arc<JumpTable> {
    let table = if rules.is_yolo_v1 {
        &*YOLO_V1_INSTRUCTION_SET
    } else if rules.is_istanbul {
        &*ISTANBUL_INSTRUCTION_SET
    } else if rules.is_constantinople {
        &*CONSTANTINOPLE_INSTRUCTION_SET
    } else if rules.is_byzantium {
        &*BYZANTIUM_INSTRUCTION_SET
    } else if rules.is_cip158 {
        &*SPURIOUS_DRAGON_INSTRUCTION_SET
    } else if rules.is_cip150 {
        &*TANGERINE_WHISTLE_INSTRUCTION_SET
    } else if rules.is_homestead {
        &*HOMESTEAD_INSTRUCTION_SET
    } else {
        &*FRONTIER_INSTRUCTION_SET
    };
    Arc::clone(table)
}

/// The CIPs [`enable_cip`] knows how to activate.
pub const ACTIVATEABLE_CIPS: [u32; 4] = [1344, 1884, 2200, 2315];

/// Whether `cip` can be activated on top of an instruction set.
pub fn valid_cip(cip: u32) -> bool {
    ACTIVATEABLE_CIPS.contains(&cip)
}

/// Patches `table` with the changes introduced by `cip`.
///
/// ```
/// use cvm_vm::core::{chains::ChainConfig, hardfork::HardFork, opcodes::BEGINSUB};
/// use cvm_vm::core::vm::{enable_cip, instruction_set};
///
/// let rules = ChainConfig::at_hardfork(1, HardFork::Istanbul).rules(0);
/// let mut table = (*instruction_set(&rules)).clone();
/// assert!(!table.contains(BEGINSUB));
///
/// enable_cip(2315, &mut table).unwrap();
/// assert!(table.contains(BEGINSUB));
/// assert!(enable_cip(9999, &mut table).is_err());
/// ```
pub fn enable_cip(cip: u32, table: &mut JumpTable) -> Result<()> {
    match cip {
        1344 => enable_1344(table),
        1884 => enable_1884(table),
        2200 => enable_2200(table),
        2315 => enable_2315(table),
        _ => return Err(eyre!("undefined cip {cip}")),
    }
    Ok(())
}

/// NETWORKID returns the network id of the chain.
fn enable_1344(table: &mut JumpTable) {
    table.set(NETWORKID, Operation::new(environment::network_id, ENERGY_QUICK_STEP, 0, 1));
}

/// Repricing of trie-size-dependent instructions, and SELFBALANCE.
fn enable_1884(table: &mut JumpTable) {
    table.reprice(SLOAD, SLOAD_ENERGY_CIP1884);
    table.reprice(BALANCE, BALANCE_ENERGY_CIP1884);
    table.reprice(EXTCODEHASH, EXTCODE_HASH_ENERGY_CIP1884);
    table.set(SELFBALANCE, Operation::new(environment::self_balance, SELF_BALANCE_ENERGY, 0, 1));
}

/// Net metered SSTORE with a reentrancy sentry.
fn enable_2200(table: &mut JumpTable) {
    table.reprice(SLOAD, SLOAD_ENERGY_CIP2200);
    if let Some(sstore) = table.get_mut(SSTORE) {
        sstore.dynamic_energy = Some(energy_sstore_cip2200);
    }
}

/// Simple subroutines.
fn enable_2315(table: &mut JumpTable) {
    table.set(BEGINSUB, Operation::new(control::begin_sub, ENERGY_QUICK_STEP, 0, 0));
    table.set(JUMPSUB, Operation::new(control::jump_sub, ENERGY_SLOW_STEP, 1, 0).jumps());
    table.set(RETURNSUB, Operation::new(control::return_sub, ENERGY_FAST_STEP, 0, 0).jumps());
}

/// Frontier plus DELEGATECALL.
pub fn new_homestead_instruction_set() -> JumpTable {
    let mut table = new_frontier_instruction_set();
    table.set(
        DELEGATECALL,
        Operation::new(system::delegate_call, CALL_ENERGY_FRONTIER, 6, 1)
            .dynamic(energy_delegate_call)
            .memory(memory_delegate_call)
            .returns(),
    );
    table
}

/// Homestead with the CIP150 repricing of IO-heavy instructions.
pub fn new_tangerine_whistle_instruction_set() -> JumpTable {
    let mut table = new_homestead_instruction_set();
    table.reprice(BALANCE, BALANCE_ENERGY_CIP150);
    table.reprice(EXTCODESIZE, EXTCODE_SIZE_ENERGY_CIP150);
    table.reprice(SLOAD, SLOAD_ENERGY_CIP150);
    table.reprice(EXTCODECOPY, EXTCODE_COPY_BASE_CIP150);
    table.reprice(CALL, CALL_ENERGY_CIP150);
    table.reprice(CALLCODE, CALL_ENERGY_CIP150);
    table.reprice(DELEGATECALL, CALL_ENERGY_CIP150);
    table
}

/// Tangerine Whistle with the CIP158 EXP pricing.
pub fn new_spurious_dragon_instruction_set() -> JumpTable {
    let mut table = new_tangerine_whistle_instruction_set();
    if let Some(exp) = table.get_mut(EXP) {
        exp.dynamic_energy = Some(energy_exp_cip158);
    }
    table
}

/// Spurious Dragon plus STATICCALL, return data and REVERT.
pub fn new_byzantium_instruction_set() -> JumpTable {
    let mut table = new_spurious_dragon_instruction_set();
    table.set(
        STATICCALL,
        Operation::new(system::static_call, CALL_ENERGY_CIP150, 6, 1)
            .dynamic(energy_static_call)
            .memory(memory_static_call)
            .returns(),
    );
    table.set(
        RETURNDATASIZE,
        Operation::new(environment::return_data_size, ENERGY_QUICK_STEP, 0, 1),
    );
    table.set(
        RETURNDATACOPY,
        Operation::new(environment::return_data_copy, ENERGY_FASTEST_STEP, 3, 0)
            .dynamic(energy_return_data_copy)
            .memory(memory_return_data_copy),
    );
    table.set(
        REVERT,
        Operation::new(system::revert, 0, 2, 0)
            .dynamic(pure_memory_energy)
            .memory(memory_revert)
            .reverts()
            .returns(),
    );
    table
}

/// Byzantium plus shifts, EXTCODEHASH and CREATE2.
pub fn new_constantinople_instruction_set() -> JumpTable {
    let mut table = new_byzantium_instruction_set();
    table.set(SHL, Operation::new(bitwise::shl, ENERGY_FASTEST_STEP, 2, 1));
    table.set(SHR, Operation::new(bitwise::shr, ENERGY_FASTEST_STEP, 2, 1));
    table.set(SAR, Operation::new(bitwise::sar, ENERGY_FASTEST_STEP, 2, 1));
    table.set(
        EXTCODEHASH,
        Operation::new(environment::ext_code_hash, EXTCODE_HASH_ENERGY_CONSTANTINOPLE, 1, 1),
    );
    table.set(
        CREATE2,
        Operation::new(system::create2, CREATE2_ENERGY, 4, 1)
            .dynamic(energy_create2)
            .memory(memory_create2)
            .writes()
            .returns(),
    );
    table
}

/// Constantinople plus CIP1344, CIP1884 and CIP2200.
pub fn new_istanbul_instruction_set() -> JumpTable {
    let mut table = new_constantinople_instruction_set();
    enable_1344(&mut table);
    enable_1884(&mut table);
    enable_2200(&mut table);
    table
}

/// Istanbul plus CIP2315 subroutines.
pub fn new_yolo_v1_instruction_set() -> JumpTable {
    let mut table = new_istanbul_instruction_set();
    enable_2315(&mut table);
    table
}

/// The instruction set the chain launched with.
pub fn new_frontier_instruction_set() -> JumpTable {
    let mut table = JumpTable([None; 256]);

    table.set(STOP, Operation::new(control::stop, 0, 0, 0).halts());

    table.set(ADD, Operation::new(arithmetic::add, ENERGY_FASTEST_STEP, 2, 1));
    table.set(MUL, Operation::new(arithmetic::mul, ENERGY_FAST_STEP, 2, 1));
    table.set(SUB, Operation::new(arithmetic::sub, ENERGY_FASTEST_STEP, 2, 1));
    table.set(DIV, Operation::new(arithmetic::div, ENERGY_FAST_STEP, 2, 1));
    table.set(SDIV, Operation::new(arithmetic::sdiv, ENERGY_FAST_STEP, 2, 1));
    table.set(MOD, Operation::new(arithmetic::modulo, ENERGY_FAST_STEP, 2, 1));
    table.set(SMOD, Operation::new(arithmetic::smod, ENERGY_FAST_STEP, 2, 1));
    table.set(ADDMOD, Operation::new(arithmetic::addmod, ENERGY_MID_STEP, 3, 1));
    table.set(MULMOD, Operation::new(arithmetic::mulmod, ENERGY_MID_STEP, 3, 1));
    table.set(EXP, Operation::new(arithmetic::exp, 0, 2, 1).dynamic(energy_exp_frontier));
    table.set(SIGNEXTEND, Operation::new(arithmetic::signextend, ENERGY_FAST_STEP, 2, 1));

    table.set(LT, Operation::new(comparison::lt, ENERGY_FASTEST_STEP, 2, 1));
    table.set(GT, Operation::new(comparison::gt, ENERGY_FASTEST_STEP, 2, 1));
    table.set(SLT, Operation::new(comparison::slt, ENERGY_FASTEST_STEP, 2, 1));
    table.set(SGT, Operation::new(comparison::sgt, ENERGY_FASTEST_STEP, 2, 1));
    table.set(EQ, Operation::new(comparison::eq, ENERGY_FASTEST_STEP, 2, 1));
    table.set(ISZERO, Operation::new(comparison::iszero, ENERGY_FASTEST_STEP, 1, 1));
    table.set(AND, Operation::new(bitwise::and, ENERGY_FASTEST_STEP, 2, 1));
    table.set(OR, Operation::new(bitwise::or, ENERGY_FASTEST_STEP, 2, 1));
    table.set(XOR, Operation::new(bitwise::xor, ENERGY_FASTEST_STEP, 2, 1));
    table.set(NOT, Operation::new(bitwise::not, ENERGY_FASTEST_STEP, 1, 1));
    table.set(BYTE, Operation::new(bitwise::byte, ENERGY_FASTEST_STEP, 2, 1));

    table.set(
        SHA3,
        Operation::new(crypto::sha3, SHA3_ENERGY, 2, 1).dynamic(energy_sha3).memory(memory_sha3),
    );

    table.set(ADDRESS, Operation::new(environment::address, ENERGY_QUICK_STEP, 0, 1));
    table.set(BALANCE, Operation::new(environment::balance, BALANCE_ENERGY_FRONTIER, 1, 1));
    table.set(ORIGIN, Operation::new(environment::origin, ENERGY_QUICK_STEP, 0, 1));
    table.set(CALLER, Operation::new(environment::caller, ENERGY_QUICK_STEP, 0, 1));
    table.set(CALLVALUE, Operation::new(environment::call_value, ENERGY_QUICK_STEP, 0, 1));
    table.set(
        CALLDATALOAD,
        Operation::new(environment::call_data_load, ENERGY_FASTEST_STEP, 1, 1),
    );
    table.set(CALLDATASIZE, Operation::new(environment::call_data_size, ENERGY_QUICK_STEP, 0, 1));
    table.set(
        CALLDATACOPY,
        Operation::new(environment::call_data_copy, ENERGY_FASTEST_STEP, 3, 0)
            .dynamic(energy_call_data_copy)
            .memory(memory_call_data_copy),
    );
    table.set(CODESIZE, Operation::new(environment::code_size, ENERGY_QUICK_STEP, 0, 1));
    table.set(
        CODECOPY,
        Operation::new(environment::code_copy, ENERGY_FASTEST_STEP, 3, 0)
            .dynamic(energy_code_copy)
            .memory(memory_code_copy),
    );
    table.set(ENERGYPRICE, Operation::new(environment::energy_price, ENERGY_QUICK_STEP, 0, 1));
    table.set(
        EXTCODESIZE,
        Operation::new(environment::ext_code_size, EXTCODE_SIZE_ENERGY_FRONTIER, 1, 1),
    );
    table.set(
        EXTCODECOPY,
        Operation::new(environment::ext_code_copy, EXTCODE_COPY_BASE_FRONTIER, 4, 0)
            .dynamic(energy_ext_code_copy)
            .memory(memory_ext_code_copy),
    );

    table.set(BLOCKHASH, Operation::new(block::blockhash, ENERGY_EXT_STEP, 1, 1));
    table.set(COINBASE, Operation::new(block::coinbase, ENERGY_QUICK_STEP, 0, 1));
    table.set(TIMESTAMP, Operation::new(block::timestamp, ENERGY_QUICK_STEP, 0, 1));
    table.set(NUMBER, Operation::new(block::number, ENERGY_QUICK_STEP, 0, 1));
    table.set(DIFFICULTY, Operation::new(block::difficulty, ENERGY_QUICK_STEP, 0, 1));
    table.set(ENERGYLIMIT, Operation::new(block::energy_limit, ENERGY_QUICK_STEP, 0, 1));

    table.set(POP, Operation::new(stack::pop, ENERGY_QUICK_STEP, 1, 0));
    table.set(
        MLOAD,
        Operation::new(memory::mload, ENERGY_FASTEST_STEP, 1, 1)
            .dynamic(pure_memory_energy)
            .memory(memory_mload),
    );
    table.set(
        MSTORE,
        Operation::new(memory::mstore, ENERGY_FASTEST_STEP, 2, 0)
            .dynamic(pure_memory_energy)
            .memory(memory_mstore),
    );
    table.set(
        MSTORE8,
        Operation::new(memory::mstore8, ENERGY_FASTEST_STEP, 2, 0)
            .dynamic(pure_memory_energy)
            .memory(memory_mstore8),
    );
    table.set(SLOAD, Operation::new(storage::sload, SLOAD_ENERGY_FRONTIER, 1, 1));
    table.set(SSTORE, Operation::new(storage::sstore, 0, 2, 0).dynamic(energy_sstore).writes());
    table.set(JUMP, Operation::new(control::jump, ENERGY_MID_STEP, 1, 0).jumps());
    table.set(JUMPI, Operation::new(control::jumpi, ENERGY_SLOW_STEP, 2, 0).jumps());
    table.set(PC, Operation::new(control::pc, ENERGY_QUICK_STEP, 0, 1));
    table.set(MSIZE, Operation::new(memory::msize, ENERGY_QUICK_STEP, 0, 1));
    table.set(ENERGY, Operation::new(control::energy, ENERGY_QUICK_STEP, 0, 1));
    table.set(JUMPDEST, Operation::new(control::jumpdest, JUMPDEST_ENERGY, 0, 0));

    for op in PUSH1..=PUSH32 {
        table.set(op, Operation::new(stack::push, ENERGY_FASTEST_STEP, 0, 1));
    }
    for (n, op) in (DUP1..=DUP16).enumerate() {
        table.set(op, Operation::dup(stack::dup, n + 1));
    }
    for (n, op) in (SWAP1..=SWAP16).enumerate() {
        table.set(op, Operation::swap(stack::swap, n + 1));
    }

    let log_energy: [EnergyFn; 5] =
        [energy_log0, energy_log1, energy_log2, energy_log3, energy_log4];
    for (n, op) in (LOG0..=LOG4).enumerate() {
        table.set(
            op,
            Operation::new(logging::log, 0, n + 2, 0)
                .dynamic(log_energy[n])
                .memory(memory_log)
                .writes(),
        );
    }

    table.set(
        CREATE,
        Operation::new(system::create, CREATE_ENERGY, 3, 1)
            .dynamic(pure_memory_energy)
            .memory(memory_create)
            .writes()
            .returns(),
    );
    table.set(
        CALL,
        Operation::new(system::call, CALL_ENERGY_FRONTIER, 7, 1)
            .dynamic(energy_call)
            .memory(memory_call)
            .returns(),
    );
    table.set(
        CALLCODE,
        Operation::new(system::call_code, CALL_ENERGY_FRONTIER, 7, 1)
            .dynamic(energy_call_code)
            .memory(memory_call)
            .returns(),
    );
    table.set(
        RETURN,
        Operation::new(system::ret, 0, 2, 0)
            .dynamic(pure_memory_energy)
            .memory(memory_return)
            .halts(),
    );
    table.set(
        SELFDESTRUCT,
        Operation::new(system::selfdestruct, 0, 1, 0).dynamic(energy_selfdestruct).halts().writes(),
    );

    table
}
