use alloy::primitives::Bytes;

use crate::core::errors::VmError;

use super::{
    super::{core::Cvm, execution::Scope},
    from_word, to_word,
};

/// SLOAD - Load word from storage
pub fn sload(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let slot = scope.stack.peek_mut()?;
    *slot = from_word(cvm.state.get_state(scope.contract.address(), to_word(*slot)));
    Ok(Bytes::new())
}

/// SSTORE - Save word to storage
pub fn sstore(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let key = scope.stack.pop()?;
    let value = scope.stack.pop()?;
    cvm.state.set_state(scope.contract.address(), to_word(key), to_word(value));
    Ok(Bytes::new())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use super::*;
    use crate::core::{state::MemoryState, vm::handlers::test_utils};

    #[test]
    fn test_sstore_then_sload() {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);

        let mut scope = test_utils::scope(&mut contract, &[U256::from(7), U256::from(42)]);
        sstore(&mut 0, &mut cvm, &mut scope).expect("sstore failed");

        scope.stack.push(U256::from(7));
        sload(&mut 0, &mut cvm, &mut scope).expect("sload failed");
        assert_eq!(scope.stack.pop().expect("empty stack"), U256::from(42));

        scope.stack.push(U256::from(8));
        sload(&mut 0, &mut cvm, &mut scope).expect("sload failed");
        assert_eq!(scope.stack.pop().expect("empty stack"), U256::ZERO);
    }
}
