use alloy::primitives::{Bytes, U256};

use crate::core::{errors::VmError, memory::get_data};

use super::{
    super::{core::Cvm, execution::Scope},
    from_address, from_word, low_u64, to_address,
};

/// Clamps a data offset: anything past u64 reads as past the end.
#[inline]
fn offset_or_max(offset: U256) -> u64 {
    u64::try_from(offset).unwrap_or(u64::MAX)
}

/// ADDRESS - Get address of currently executing account
pub fn address(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(from_address(scope.contract.address()));
    Ok(Bytes::new())
}

/// BALANCE - Get balance of the given account
pub fn balance(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let slot = scope.stack.peek_mut()?;
    *slot = cvm.state.get_balance(to_address(*slot));
    Ok(Bytes::new())
}

/// ORIGIN - Get execution origination address
pub fn origin(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(from_address(cvm.tx.origin));
    Ok(Bytes::new())
}

/// CALLER - Get caller address
pub fn caller(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(from_address(scope.contract.caller()));
    Ok(Bytes::new())
}

/// CALLVALUE - Get deposited value by the instruction/transaction responsible for this execution
pub fn call_value(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(scope.contract.value());
    Ok(Bytes::new())
}

/// CALLDATALOAD - Get input data of current environment, zero padded past its end
pub fn call_data_load(
    _: &mut u64,
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    let slot = scope.stack.peek_mut()?;
    *slot = match u64::try_from(*slot) {
        Ok(offset) => U256::from_be_slice(&get_data(&scope.contract.input, offset, 32)),
        Err(_) => U256::ZERO,
    };
    Ok(Bytes::new())
}

/// CALLDATASIZE - Get size of input data in current environment
pub fn call_data_size(
    _: &mut u64,
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    scope.stack.push(U256::from(scope.contract.input.len()));
    Ok(Bytes::new())
}

/// CALLDATACOPY - Copy input data in current environment to memory
pub fn call_data_copy(
    _: &mut u64,
    _: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    let memory_offset = scope.stack.pop()?;
    let data_offset = offset_or_max(scope.stack.pop()?);
    let length = low_u64(scope.stack.pop()?);

    let data = get_data(&scope.contract.input, data_offset, length);
    scope.memory.set(low_u64(memory_offset), length, &data);
    Ok(Bytes::new())
}

/// CODESIZE - Get size of code running in current environment
pub fn code_size(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(U256::from(scope.contract.code.len()));
    Ok(Bytes::new())
}

/// CODECOPY - Copy code running in current environment to memory
pub fn code_copy(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let memory_offset = scope.stack.pop()?;
    let code_offset = offset_or_max(scope.stack.pop()?);
    let length = low_u64(scope.stack.pop()?);

    let code = get_data(&scope.contract.code, code_offset, length);
    scope.memory.set(low_u64(memory_offset), length, &code);
    Ok(Bytes::new())
}

/// ENERGYPRICE - Get price of energy in current environment
pub fn energy_price(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    scope.stack.push(cvm.tx.energy_price);
    Ok(Bytes::new())
}

/// EXTCODESIZE - Get size of an account's code
pub fn ext_code_size(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    let slot = scope.stack.peek_mut()?;
    *slot = U256::from(cvm.state.get_code_size(to_address(*slot)));
    Ok(Bytes::new())
}

/// EXTCODECOPY - Copy an account's code to memory
pub fn ext_code_copy(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    let address = to_address(scope.stack.pop()?);
    let memory_offset = scope.stack.pop()?;
    let code_offset = offset_or_max(scope.stack.pop()?);
    let length = low_u64(scope.stack.pop()?);

    let code = get_data(&cvm.state.get_code(address), code_offset, length);
    scope.memory.set(low_u64(memory_offset), length, &code);
    Ok(Bytes::new())
}

/// RETURNDATASIZE - Get size of output data from the previous call
pub fn return_data_size(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    scope.stack.push(U256::from(cvm.return_data.len()));
    Ok(Bytes::new())
}

/// RETURNDATACOPY - Copy output data from the previous call to memory. Reading past the end of
/// the return data is an error.
pub fn return_data_copy(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    let memory_offset = scope.stack.pop()?;
    let data_offset = scope.stack.pop()?;
    let length = scope.stack.pop()?;

    let start = u64::try_from(data_offset).map_err(|_| VmError::ReturnDataOutOfBounds)?;
    let end = data_offset
        .checked_add(length)
        .and_then(|end| u64::try_from(end).ok())
        .ok_or(VmError::ReturnDataOutOfBounds)?;
    if (cvm.return_data.len() as u64) < end {
        return Err(VmError::ReturnDataOutOfBounds);
    }

    scope.memory.set(
        low_u64(memory_offset),
        low_u64(length),
        &cvm.return_data[start as usize..end as usize],
    );
    Ok(Bytes::new())
}

/// EXTCODEHASH - Get hash of an account's code, zero for empty accounts
pub fn ext_code_hash(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    let slot = scope.stack.peek_mut()?;
    let address = to_address(*slot);
    *slot = if cvm.state.empty(address) {
        U256::ZERO
    } else {
        from_word(cvm.state.get_code_hash(address))
    };
    Ok(Bytes::new())
}

/// NETWORKID - Get the network id of the chain
pub fn network_id(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    scope.stack.push(U256::from(cvm.rules.network_id));
    Ok(Bytes::new())
}

/// SELFBALANCE - Get balance of currently executing account
pub fn self_balance(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    scope.stack.push(cvm.state.get_balance(scope.contract.address()));
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

    #[test]
    fn test_call_data_load_pads_and_overflows() {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);
        contract.input = Bytes::from_static(&[0xff, 0xee]);

        let mut scope = test_utils::scope(&mut contract, &[U256::from(1)]);
        call_data_load(&mut 0, &mut cvm, &mut scope).expect("calldataload failed");
        assert_eq!(scope.stack.pop().expect("empty stack"), U256::from(0xee) << 248);

        scope.stack.push(U256::MAX);
        call_data_load(&mut 0, &mut cvm, &mut scope).expect("calldataload failed");
        assert_eq!(scope.stack.pop().expect("empty stack"), U256::ZERO);
    }

    #[test]
    fn test_return_data_bounds() {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        cvm.return_data = Bytes::from_static(&[1, 2, 3, 4]);
        let mut contract = test_utils::contract(0);

        // memory offset, data offset, length
        let mut scope =
            test_utils::scope(&mut contract, &[U256::ZERO, U256::from(2), U256::from(2)]);
        scope.memory.resize(32);
        return_data_copy(&mut 0, &mut cvm, &mut scope).expect("returndatacopy failed");
        assert_eq!(scope.memory.get_copy(0, 2), vec![3, 4]);

        for items in [
            [U256::ZERO, U256::from(3), U256::from(2)],
            [U256::ZERO, U256::MAX, U256::ZERO],
            [U256::ZERO, U256::from(1), U256::MAX],
        ] {
            let mut contract = test_utils::contract(0);
            let mut scope = test_utils::scope(&mut contract, &items);
            assert_eq!(
                return_data_copy(&mut 0, &mut cvm, &mut scope),
                Err(VmError::ReturnDataOutOfBounds)
            );
        }
    }

    #[test]
    fn test_ext_code_hash_of_empty_account() {
        let mut state = MemoryState::new();
        let target = Address::repeat_byte(0x42);
        state.add_balance(target, U256::ZERO);

        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);
        let mut scope = test_utils::scope(&mut contract, &[from_address(target)]);
        ext_code_hash(&mut 0, &mut cvm, &mut scope).expect("extcodehash failed");
        assert_eq!(scope.stack.pop().expect("empty stack"), U256::ZERO);
    }

    #[test]
    fn test_network_id() {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);
        let mut scope = test_utils::scope(&mut contract, &[]);
        network_id(&mut 0, &mut cvm, &mut scope).expect("networkid failed");
        assert_eq!(scope.stack.pop().expect("empty stack"), U256::from(1));
    }
}
