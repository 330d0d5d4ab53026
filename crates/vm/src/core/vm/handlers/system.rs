use alloy::primitives::{Bytes, U256};

use crate::core::{constants::CALL_STIPEND, errors::VmError};

use super::{
    super::{
        core::{CallOutcome, CreateOutcome, Cvm},
        execution::Scope,
    },
    from_address, low_u64, to_address,
};

/// Pushes the result of a creation and hands the unused energy back to the creator. Returns the
/// init code's output only when it reverted.
fn finish_create(cvm: &Cvm<'_>, scope: &mut Scope<'_>, outcome: CreateOutcome) -> Bytes {
    let code_store_failed = outcome.error == Some(VmError::CodeStoreOutOfEnergy);

    // before Homestead, failing to pay for the code still deploys an empty contract
    let deployed = match &outcome.error {
        None => true,
        Some(_) if code_store_failed => !cvm.rules.is_homestead,
        Some(_) => false,
    };
    scope.stack.push(if deployed { from_address(outcome.address) } else { U256::ZERO });
    scope.contract.energy += outcome.energy_left;

    match outcome.error {
        Some(VmError::ExecutionReverted) => outcome.output,
        _ => Bytes::new(),
    }
}

/// Pushes the success flag of a call, copies its output into the caller's memory and hands the
/// unused energy back.
fn finish_call(
    scope: &mut Scope<'_>,
    ret_offset: U256,
    ret_size: U256,
    outcome: CallOutcome,
) -> Bytes {
    scope.stack.push(if outcome.is_success() { U256::from(1) } else { U256::ZERO });

    if outcome.error.as_ref().map_or(true, VmError::is_revert) {
        scope.memory.set(low_u64(ret_offset), low_u64(ret_size), &outcome.output);
    }
    scope.contract.energy += outcome.energy_left;
    outcome.output
}

/// CREATE - Create a new account with associated code
pub fn create(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let value = scope.stack.pop()?;
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    let init_code = Bytes::from(scope.memory.get_copy(low_u64(offset), low_u64(size)));

    let mut energy = scope.contract.energy;
    if cvm.rules.is_cip150 {
        energy -= energy / 64;
    }
    scope.contract.use_energy(energy);

    let outcome = cvm.create(scope.contract.address(), init_code, energy, value);
    Ok(finish_create(cvm, scope, outcome))
}

/// CREATE2 - Create a new account at an address derived from a salt and the init code
pub fn create2(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let value = scope.stack.pop()?;
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    let salt = scope.stack.pop()?;
    let init_code = Bytes::from(scope.memory.get_copy(low_u64(offset), low_u64(size)));

    // CREATE2 only exists from Constantinople, so the 63/64 rule always applies
    let mut energy = scope.contract.energy;
    energy -= energy / 64;
    scope.contract.use_energy(energy);

    let outcome = cvm.create2(scope.contract.address(), init_code, energy, value, salt);
    Ok(finish_create(cvm, scope, outcome))
}

/// CALL - Message-call into an account
pub fn call(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    // the requested energy was already turned into the allowance
    scope.stack.pop()?;
    let mut energy = scope.call_energy;
    let address = to_address(scope.stack.pop()?);
    let value = scope.stack.pop()?;
    let in_offset = scope.stack.pop()?;
    let in_size = scope.stack.pop()?;
    let ret_offset = scope.stack.pop()?;
    let ret_size = scope.stack.pop()?;

    let input =
        Bytes::copy_from_slice(scope.memory.get_ptr(low_u64(in_offset), low_u64(in_size)));
    if !value.is_zero() {
        energy += CALL_STIPEND;
    }

    let outcome = cvm.call(scope.contract.address(), address, input, energy, value);
    Ok(finish_call(scope, ret_offset, ret_size, outcome))
}

/// CALLCODE - Message-call into this account with an alternative account's code
pub fn call_code(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.pop()?;
    let mut energy = scope.call_energy;
    let address = to_address(scope.stack.pop()?);
    let value = scope.stack.pop()?;
    let in_offset = scope.stack.pop()?;
    let in_size = scope.stack.pop()?;
    let ret_offset = scope.stack.pop()?;
    let ret_size = scope.stack.pop()?;

    let input =
        Bytes::copy_from_slice(scope.memory.get_ptr(low_u64(in_offset), low_u64(in_size)));
    if !value.is_zero() {
        energy += CALL_STIPEND;
    }

    let outcome = cvm.call_code(scope.contract.address(), address, input, energy, value);
    Ok(finish_call(scope, ret_offset, ret_size, outcome))
}

/// DELEGATECALL - Message-call into this account with an alternative account's code, keeping the
/// current caller and value
pub fn delegate_call(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    scope.stack.pop()?;
    let energy = scope.call_energy;
    let address = to_address(scope.stack.pop()?);
    let in_offset = scope.stack.pop()?;
    let in_size = scope.stack.pop()?;
    let ret_offset = scope.stack.pop()?;
    let ret_size = scope.stack.pop()?;

    let input =
        Bytes::copy_from_slice(scope.memory.get_ptr(low_u64(in_offset), low_u64(in_size)));

    let outcome = cvm.delegate_call(&*scope.contract, address, input, energy);
    Ok(finish_call(scope, ret_offset, ret_size, outcome))
}

/// STATICCALL - Static message-call into an account
pub fn static_call(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    scope.stack.pop()?;
    let energy = scope.call_energy;
    let address = to_address(scope.stack.pop()?);
    let in_offset = scope.stack.pop()?;
    let in_size = scope.stack.pop()?;
    let ret_offset = scope.stack.pop()?;
    let ret_size = scope.stack.pop()?;

    let input =
        Bytes::copy_from_slice(scope.memory.get_ptr(low_u64(in_offset), low_u64(in_size)));

    let outcome = cvm.static_call(scope.contract.address(), address, input, energy);
    Ok(finish_call(scope, ret_offset, ret_size, outcome))
}

/// RETURN - Halt execution returning output data
pub fn ret(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    Ok(Bytes::from(scope.memory.get_copy(low_u64(offset), low_u64(size))))
}

/// REVERT - Halt execution reverting state changes but returning data and remaining energy
pub fn revert(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    Ok(Bytes::from(scope.memory.get_copy(low_u64(offset), low_u64(size))))
}

/// SELFDESTRUCT - Halt execution and register account for later deletion
pub fn selfdestruct(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    let beneficiary = to_address(scope.stack.pop()?);
    let address = scope.contract.address();

    let balance = cvm.state.get_balance(address);
    cvm.state.add_balance(beneficiary, balance);
    cvm.state.suicide(address);
    Ok(Bytes::new())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;
    use crate::core::{
        state::{MemoryState, StateDb},
        vm::handlers::test_utils,
    };

    /// PUSH1 0x2a PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
    const RETURN_42: [u8; 10] = [0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];

    /// PUSH1 1 PUSH1 0 MSTORE8 PUSH1 1 PUSH1 0 REVERT
    const REVERT_01: [u8; 10] = [0x60, 0x01, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xfd];

    fn call_items(target: Address, value: u64) -> Vec<U256> {
        // energy, address, value, in offset, in size, ret offset, ret size
        vec![
            U256::from(10_000),
            from_address(target),
            U256::from(value),
            U256::ZERO,
            U256::ZERO,
            U256::ZERO,
            U256::from(32),
        ]
    }

    #[test]
    fn test_call_copies_output_and_refunds() {
        let target = Address::repeat_byte(0x42);
        let mut state = MemoryState::new();
        state.set_code(target, Bytes::from_static(&RETURN_42));

        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);
        let mut scope = test_utils::scope(&mut contract, &call_items(target, 0));
        scope.memory.resize(32);
        scope.call_energy = 10_000;

        let output = call(&mut 0, &mut cvm, &mut scope).expect("call failed");
        assert_eq!(output.len(), 32);
        assert_eq!(scope.stack.pop().expect("empty stack"), U256::from(1));
        assert_eq!(scope.memory.get_copy(31, 1), vec![0x2a]);
        // four PUSH1, MSTORE and one word of memory
        assert_eq!(scope.contract.energy, 10_000 - 18);
    }

    #[test]
    fn test_reverted_call_keeps_output_and_energy() {
        let target = Address::repeat_byte(0x42);
        let mut state = MemoryState::new();
        state.set_code(target, Bytes::from_static(&REVERT_01));

        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);
        let mut scope = test_utils::scope(&mut contract, &call_items(target, 0));
        scope.memory.resize(32);
        scope.call_energy = 10_000;

        let output = call(&mut 0, &mut cvm, &mut scope).expect("call failed");
        assert_eq!(output, Bytes::from_static(&[0x01]));
        assert_eq!(scope.stack.pop().expect("empty stack"), U256::ZERO);
        assert_eq!(scope.memory.get_copy(0, 1), vec![0x01]);
        assert_eq!(scope.contract.energy, 10_000 - 18);
    }

    #[test]
    fn test_call_without_funds_fails_and_refunds() {
        let target = Address::repeat_byte(0x42);
        let mut state = MemoryState::new();
        state.set_code(target, Bytes::from_static(&RETURN_42));

        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);
        let mut scope = test_utils::scope(&mut contract, &call_items(target, 1));
        scope.memory.resize(32);
        scope.call_energy = 10_000;

        call(&mut 0, &mut cvm, &mut scope).expect("call failed");
        assert_eq!(scope.stack.pop().expect("empty stack"), U256::ZERO);
        // the allowance and the stipend both come back
        assert_eq!(scope.contract.energy, 10_000 + CALL_STIPEND);
    }

    #[test]
    fn test_create_pushes_address() {
        let mut state = MemoryState::new();
        let creator = Address::repeat_byte(0xcc);
        let expected = creator.create(0);

        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(64_000);
        // value, offset, size: empty init code
        let mut scope = test_utils::scope(&mut contract, &[U256::ZERO, U256::ZERO, U256::ZERO]);

        let output = create(&mut 0, &mut cvm, &mut scope).expect("create failed");
        assert!(output.is_empty());
        assert_eq!(scope.stack.pop().expect("empty stack"), from_address(expected));
        // empty init code runs for free
        assert_eq!(scope.contract.energy, 64_000);
        assert_eq!(cvm.state.get_nonce(creator), 1);
        assert_eq!(cvm.state.get_nonce(expected), 1);
    }

    #[test]
    fn test_selfdestruct_moves_balance() {
        let mut state = MemoryState::new();
        let beneficiary = Address::repeat_byte(0xbe);
        state.add_balance(Address::repeat_byte(0xcc), U256::from(100));

        {
            let mut cvm = test_utils::cvm(&mut state);
            let mut contract = test_utils::contract(0);
            let mut scope = test_utils::scope(&mut contract, &[from_address(beneficiary)]);
            selfdestruct(&mut 0, &mut cvm, &mut scope).expect("selfdestruct failed");
        }

        assert_eq!(state.get_balance(beneficiary), U256::from(100));
        assert_eq!(state.get_balance(Address::repeat_byte(0xcc)), U256::ZERO);
        assert!(state.has_suicided(Address::repeat_byte(0xcc)));
    }
}
