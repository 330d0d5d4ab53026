use alloy::primitives::{Bytes, U256};

use crate::core::errors::VmError;

use super::{
    super::{core::Cvm, execution::Scope},
    low_u64,
};

/// MLOAD - Load word from memory
pub fn mload(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let slot = scope.stack.peek_mut()?;
    *slot = U256::from_be_slice(scope.memory.get_ptr(low_u64(*slot), 32));
    Ok(Bytes::new())
}

/// MSTORE - Save word to memory
pub fn mstore(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let offset = scope.stack.pop()?;
    let value = scope.stack.pop()?;
    scope.memory.set32(low_u64(offset), value);
    Ok(Bytes::new())
}

/// MSTORE8 - Save byte to memory
pub fn mstore8(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let offset = scope.stack.pop()?;
    let value = scope.stack.pop()?;
    scope.memory.set_byte(low_u64(offset), value.byte(0));
    Ok(Bytes::new())
}

/// MSIZE - Get the size of active memory in bytes
pub fn msize(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(U256::from(scope.memory.len()));
    Ok(Bytes::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{state::MemoryState, vm::handlers::test_utils};

    #[test]
    fn test_mstore_then_mload() {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);

        let value = U256::from(0x1234_5678u64);
        let mut scope = test_utils::scope(&mut contract, &[U256::from(32), value]);
        scope.memory.resize(64);
        mstore(&mut 0, &mut cvm, &mut scope).expect("mstore failed");

        scope.stack.push(U256::from(32));
        mload(&mut 0, &mut cvm, &mut scope).expect("mload failed");
        assert_eq!(scope.stack.pop().expect("empty stack"), value);
    }

    #[test]
    fn test_mstore8_keeps_low_byte() {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);

        let mut scope = test_utils::scope(&mut contract, &[U256::from(1), U256::from(0xabcd)]);
        scope.memory.resize(32);
        mstore8(&mut 0, &mut cvm, &mut scope).expect("mstore8 failed");
        assert_eq!(scope.memory.get_copy(0, 3), vec![0x00, 0xcd, 0x00]);

        msize(&mut 0, &mut cvm, &mut scope).expect("msize failed");
        assert_eq!(scope.stack.pop().expect("empty stack"), U256::from(32));
    }
}
