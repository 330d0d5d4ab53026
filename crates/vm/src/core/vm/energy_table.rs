//! Dynamic energy functions. Each is called after the constant cost was charged, with the
//! word-aligned memory size the instruction will need.

use alloy::primitives::{B256, U256};

use super::{
    super::{
        constants::*,
        errors::VmError,
        memory::{to_word_size, Memory},
    },
    core::Cvm,
    execution::Scope,
    handlers::{to_address, to_word},
};

/// Charges for growing `memory` to `new_size` bytes. Only the increase over the largest size
/// paid for so far is billed.
///
/// ```
/// use cvm_vm::core::{memory::Memory, vm::memory_energy_cost};
///
/// let mut memory = Memory::new();
/// assert_eq!(memory_energy_cost(&mut memory, 32).unwrap(), 3);
/// memory.resize(32);
/// // 32 words cost 96 + 2, one of which is already paid for
/// assert_eq!(memory_energy_cost(&mut memory, 1024).unwrap(), 95);
/// ```
pub fn memory_energy_cost(memory: &mut Memory, new_size: u64) -> Result<u64, VmError> {
    if new_size == 0 {
        return Ok(0);
    }
    // words beyond this square past u64
    if new_size > 0x1F_FFFF_FFE0 {
        return Err(VmError::EnergyUintOverflow);
    }

    let words = to_word_size(new_size);
    if words * 32 > memory.len() as u64 {
        let total = words * MEMORY_ENERGY + words * words / QUAD_COEFF_DIV;
        let fee = total - memory.last_energy_cost();
        memory.set_last_energy_cost(total);
        return Ok(fee);
    }
    Ok(0)
}

fn safe_add(a: u64, b: u64) -> Result<u64, VmError> {
    a.checked_add(b).ok_or(VmError::EnergyUintOverflow)
}

fn safe_mul(a: u64, b: u64) -> Result<u64, VmError> {
    a.checked_mul(b).ok_or(VmError::EnergyUintOverflow)
}

/// Reads stack item `n` as a u64, failing on overflow.
fn back_u64(scope: &Scope<'_>, n: usize) -> Result<u64, VmError> {
    u64::try_from(scope.stack.back(n)?).map_err(|_| VmError::EnergyUintOverflow)
}

/// The result of a dynamic energy function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Charge {
    /// Energy to deduct from the running frame.
    pub energy: u64,
    /// Energy a CALL family instruction hands to its callee. Zero for everything else.
    pub call_energy: u64,
}

impl From<u64> for Charge {
    fn from(energy: u64) -> Self {
        Self { energy, call_energy: 0 }
    }
}

/// Memory expansion plus three per copied word, the length being stack item `length`.
fn memory_copier_energy(
    scope: &mut Scope<'_>,
    memory_size: u64,
    length: usize,
) -> Result<u64, VmError> {
    let energy = memory_energy_cost(&mut scope.memory, memory_size)?;
    let words = safe_mul(to_word_size(back_u64(scope, length)?), COPY_ENERGY)?;
    safe_add(energy, words)
}

pub(crate) fn pure_memory_energy(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    memory_size: u64,
) -> Result<Charge, VmError> {
    memory_energy_cost(&mut scope.memory, memory_size).map(Charge::from)
}

pub(crate) fn energy_call_data_copy(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    memory_size: u64,
) -> Result<Charge, VmError> {
    memory_copier_energy(scope, memory_size, 2).map(Charge::from)
}

pub(crate) fn energy_code_copy(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    memory_size: u64,
) -> Result<Charge, VmError> {
    memory_copier_energy(scope, memory_size, 2).map(Charge::from)
}

pub(crate) fn energy_return_data_copy(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    memory_size: u64,
) -> Result<Charge, VmError> {
    memory_copier_energy(scope, memory_size, 2).map(Charge::from)
}

pub(crate) fn energy_ext_code_copy(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    memory_size: u64,
) -> Result<Charge, VmError> {
    memory_copier_energy(scope, memory_size, 3).map(Charge::from)
}

/// Legacy SSTORE pricing, or CIP1283 net metering on Constantinople before Petersburg.
pub(crate) fn energy_sstore(
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    _: u64,
) -> Result<Charge, VmError> {
    let address = scope.contract.address();
    let key = to_word(scope.stack.back(0)?);
    let value = to_word(scope.stack.back(1)?);
    let current = cvm.state.get_state(address, key);

    if cvm.rules.is_petersburg || !cvm.rules.is_constantinople {
        let energy = if current.is_zero() && !value.is_zero() {
            SSTORE_SET_ENERGY
        } else if !current.is_zero() && value.is_zero() {
            cvm.state.add_refund(SSTORE_REFUND_ENERGY);
            SSTORE_CLEAR_ENERGY
        } else {
            SSTORE_RESET_ENERGY
        };
        return Ok(energy.into());
    }

    if current == value {
        return Ok(NET_SSTORE_NOOP_ENERGY.into());
    }
    let original = cvm.state.get_committed_state(address, key);
    if original == current {
        if original.is_zero() {
            return Ok(NET_SSTORE_INIT_ENERGY.into());
        }
        if value.is_zero() {
            cvm.state.add_refund(NET_SSTORE_CLEAR_REFUND);
        }
        return Ok(NET_SSTORE_CLEAN_ENERGY.into());
    }
    net_metered_dirty_refunds(
        cvm,
        original,
        current,
        value,
        NET_SSTORE_CLEAR_REFUND,
        NET_SSTORE_RESET_CLEAR_REFUND,
        NET_SSTORE_RESET_REFUND,
    );
    Ok(NET_SSTORE_DIRTY_ENERGY.into())
}

/// Net metered SSTORE with a sentry: the write fails unless more than the call stipend remains.
pub(crate) fn energy_sstore_cip2200(
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    _: u64,
) -> Result<Charge, VmError> {
    if scope.contract.energy <= SSTORE_SENTRY_ENERGY_CIP2200 {
        return Err(VmError::OutOfEnergy);
    }

    let address = scope.contract.address();
    let key = to_word(scope.stack.back(0)?);
    let value = to_word(scope.stack.back(1)?);
    let current = cvm.state.get_state(address, key);

    if current == value {
        return Ok(SSTORE_NOOP_ENERGY_CIP2200.into());
    }
    let original = cvm.state.get_committed_state(address, key);
    if original == current {
        if original.is_zero() {
            return Ok(SSTORE_INIT_ENERGY_CIP2200.into());
        }
        if value.is_zero() {
            cvm.state.add_refund(SSTORE_CLEAR_REFUND_CIP2200);
        }
        return Ok(SSTORE_CLEAN_ENERGY_CIP2200.into());
    }
    net_metered_dirty_refunds(
        cvm,
        original,
        current,
        value,
        SSTORE_CLEAR_REFUND_CIP2200,
        SSTORE_INIT_REFUND_CIP2200,
        SSTORE_CLEAN_REFUND_CIP2200,
    );
    Ok(SSTORE_DIRTY_ENERGY_CIP2200.into())
}

/// Refund bookkeeping for a write to a slot already modified in this transaction.
fn net_metered_dirty_refunds(
    cvm: &mut Cvm<'_>,
    original: B256,
    current: B256,
    value: B256,
    clear_refund: u64,
    reset_to_zero_refund: u64,
    reset_refund: u64,
) {
    if !original.is_zero() {
        if current.is_zero() {
            cvm.state.sub_refund(clear_refund);
        } else if value.is_zero() {
            cvm.state.add_refund(clear_refund);
        }
    }
    if original == value {
        if original.is_zero() {
            cvm.state.add_refund(reset_to_zero_refund);
        } else {
            cvm.state.add_refund(reset_refund);
        }
    }
}

/// LOGn pricing: memory, a base fee, per topic and per data byte.
fn make_energy_log(topics: u64, scope: &mut Scope<'_>, memory_size: u64) -> Result<u64, VmError> {
    let requested = back_u64(scope, 1)?;
    let mut energy = memory_energy_cost(&mut scope.memory, memory_size)?;
    energy = safe_add(energy, LOG_ENERGY)?;
    energy = safe_add(energy, topics * LOG_TOPIC_ENERGY)?;
    safe_add(energy, safe_mul(requested, LOG_DATA_ENERGY)?)
}

pub(crate) fn energy_log0(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    size: u64,
) -> Result<Charge, VmError> {
    make_energy_log(0, scope, size).map(Charge::from)
}

pub(crate) fn energy_log1(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    size: u64,
) -> Result<Charge, VmError> {
    make_energy_log(1, scope, size).map(Charge::from)
}

pub(crate) fn energy_log2(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    size: u64,
) -> Result<Charge, VmError> {
    make_energy_log(2, scope, size).map(Charge::from)
}

pub(crate) fn energy_log3(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    size: u64,
) -> Result<Charge, VmError> {
    make_energy_log(3, scope, size).map(Charge::from)
}

pub(crate) fn energy_log4(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    size: u64,
) -> Result<Charge, VmError> {
    make_energy_log(4, scope, size).map(Charge::from)
}

pub(crate) fn energy_sha3(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    memory_size: u64,
) -> Result<Charge, VmError> {
    let energy = memory_energy_cost(&mut scope.memory, memory_size)?;
    let words = safe_mul(to_word_size(back_u64(scope, 1)?), SHA3_WORD_ENERGY)?;
    safe_add(energy, words).map(Charge::from)
}

/// CREATE2 also pays for hashing the init code.
pub(crate) fn energy_create2(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    memory_size: u64,
) -> Result<Charge, VmError> {
    let energy = memory_energy_cost(&mut scope.memory, memory_size)?;
    let words = safe_mul(to_word_size(back_u64(scope, 2)?), SHA3_WORD_ENERGY)?;
    safe_add(energy, words).map(Charge::from)
}

fn energy_exp(scope: &Scope<'_>, byte_energy: u64) -> Result<u64, VmError> {
    let exponent_bytes = (scope.stack.back(1)?.bit_len() as u64 + 7) / 8;
    safe_add(safe_mul(exponent_bytes, byte_energy)?, EXP_ENERGY)
}

pub(crate) fn energy_exp_frontier(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    _: u64,
) -> Result<Charge, VmError> {
    energy_exp(scope, EXP_BYTE_FRONTIER).map(Charge::from)
}

pub(crate) fn energy_exp_cip158(
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    _: u64,
) -> Result<Charge, VmError> {
    energy_exp(scope, EXP_BYTE_CIP158).map(Charge::from)
}

/// The energy forwarded to a callee.
///
/// From CIP150 on, a caller keeps 1/64th of what remains after paying `base`, and asking for more
/// than that yields everything else. Before it, the requested amount is forwarded as is.
fn call_energy(
    is_cip150: bool,
    available: u64,
    base: u64,
    requested: U256,
) -> Result<u64, VmError> {
    if is_cip150 {
        let available = available.wrapping_sub(base);
        let energy = available - available / 64;
        return Ok(match u64::try_from(requested) {
            Ok(requested) if requested <= energy => requested,
            _ => energy,
        });
    }
    u64::try_from(requested).map_err(|_| VmError::EnergyUintOverflow)
}

/// The total charge of a CALL family instruction, carrying the callee's allowance.
fn charge_call(cvm: &Cvm<'_>, scope: &Scope<'_>, base: u64) -> Result<Charge, VmError> {
    let call_energy =
        call_energy(cvm.rules.is_cip150, scope.contract.energy, base, scope.stack.back(0)?)?;
    Ok(Charge { energy: safe_add(base, call_energy)?, call_energy })
}

pub(crate) fn energy_call(
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    memory_size: u64,
) -> Result<Charge, VmError> {
    let transfers_value = !scope.stack.back(2)?.is_zero();
    let address = to_address(scope.stack.back(1)?);

    let mut energy = 0;
    if cvm.rules.is_cip158 {
        if transfers_value && cvm.state.empty(address) {
            energy += CALL_NEW_ACCOUNT_ENERGY;
        }
    } else if !cvm.state.exist(address) {
        energy += CALL_NEW_ACCOUNT_ENERGY;
    }
    if transfers_value {
        energy += CALL_VALUE_TRANSFER_ENERGY;
    }
    energy = safe_add(energy, memory_energy_cost(&mut scope.memory, memory_size)?)?;
    charge_call(cvm, scope, energy)
}

pub(crate) fn energy_call_code(
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    memory_size: u64,
) -> Result<Charge, VmError> {
    let mut energy = 0;
    if !scope.stack.back(2)?.is_zero() {
        energy += CALL_VALUE_TRANSFER_ENERGY;
    }
    energy = safe_add(energy, memory_energy_cost(&mut scope.memory, memory_size)?)?;
    charge_call(cvm, scope, energy)
}

pub(crate) fn energy_delegate_call(
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    memory_size: u64,
) -> Result<Charge, VmError> {
    let energy = memory_energy_cost(&mut scope.memory, memory_size)?;
    charge_call(cvm, scope, energy)
}

pub(crate) fn energy_static_call(
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    memory_size: u64,
) -> Result<Charge, VmError> {
    let energy = memory_energy_cost(&mut scope.memory, memory_size)?;
    charge_call(cvm, scope, energy)
}

pub(crate) fn energy_selfdestruct(
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
    _: u64,
) -> Result<Charge, VmError> {
    let mut energy = 0;
    if cvm.rules.is_cip150 {
        energy = SELFDESTRUCT_ENERGY_CIP150;
        let beneficiary = to_address(scope.stack.back(0)?);

        if cvm.rules.is_cip158 {
            if cvm.state.empty(beneficiary) &&
                !cvm.state.get_balance(scope.contract.address()).is_zero()
            {
                energy += CREATE_BY_SELFDESTRUCT_ENERGY;
            }
        } else if !cvm.state.exist(beneficiary) {
            energy += CREATE_BY_SELFDESTRUCT_ENERGY;
        }
    }

    if !cvm.state.has_suicided(scope.contract.address()) {
        cvm.state.add_refund(SELFDESTRUCT_REFUND_ENERGY);
    }
    Ok(energy.into())
}
