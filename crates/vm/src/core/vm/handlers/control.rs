use alloy::primitives::{Bytes, U256};

use crate::core::{constants::RETURN_STACK_LIMIT, errors::VmError};

use super::{
    super::{core::Cvm, execution::Scope},
    low_u64,
};

/// STOP - Halts execution
pub fn stop(_: &mut u64, _: &mut Cvm<'_>, _: &mut Scope<'_>) -> Result<Bytes, VmError> {
    Ok(Bytes::new())
}

/// JUMP - Alter the program counter
pub fn jump(pc: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let destination = scope.stack.pop()?;
    if !scope.contract.valid_jumpdest(destination) {
        return Err(VmError::InvalidJump);
    }
    *pc = low_u64(destination);
    Ok(Bytes::new())
}

/// JUMPI - Conditionally alter the program counter
pub fn jumpi(pc: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let destination = scope.stack.pop()?;
    let condition = scope.stack.pop()?;

    if condition.is_zero() {
        *pc += 1;
        return Ok(Bytes::new());
    }
    if !scope.contract.valid_jumpdest(destination) {
        return Err(VmError::InvalidJump);
    }
    *pc = low_u64(destination);
    Ok(Bytes::new())
}

/// JUMPDEST - Mark a valid destination for jumps
pub fn jumpdest(_: &mut u64, _: &mut Cvm<'_>, _: &mut Scope<'_>) -> Result<Bytes, VmError> {
    Ok(Bytes::new())
}

/// PC - Get the value of the program counter prior to the increment
pub fn pc(pc: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(U256::from(*pc));
    Ok(Bytes::new())
}

/// ENERGY - Get the amount of available energy, after paying for this instruction
pub fn energy(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(U256::from(scope.contract.energy));
    Ok(Bytes::new())
}

/// BEGINSUB - Marks the entry of a subroutine. Walking into one is an error.
pub fn begin_sub(_: &mut u64, _: &mut Cvm<'_>, _: &mut Scope<'_>) -> Result<Bytes, VmError> {
    Err(VmError::InvalidSubroutineEntry)
}

/// JUMPSUB - Enter the subroutine at the given BEGINSUB
pub fn jump_sub(pc: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    if scope.return_stack.len() >= RETURN_STACK_LIMIT {
        return Err(VmError::ReturnStackExceeded);
    }

    let destination = scope.stack.pop()?;
    let Ok(destination) = u64::try_from(destination) else {
        return Err(VmError::InvalidJump);
    };
    if !scope.contract.valid_jump_subdest(destination) {
        return Err(VmError::InvalidJump);
    }

    // code is bounded well below 4GiB, so the location always fits
    scope.return_stack.push(*pc as u32);
    *pc = destination + 1;
    Ok(Bytes::new())
}

/// RETURNSUB - Return to the instruction after the latest JUMPSUB
pub fn return_sub(pc: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let Some(location) = scope.return_stack.pop() else {
        return Err(VmError::InvalidRetsub);
    };
    *pc = u64::from(location) + 1;
    Ok(Bytes::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{state::MemoryState, vm::handlers::test_utils};

    #[test]
    fn test_jump_rejects_push_data() {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);
        // PUSH1 0x5b JUMPDEST
        contract.code = Bytes::from_static(&[0x60, 0x5b, 0x5b]);

        let mut scope = test_utils::scope(&mut contract, &[U256::from(1)]);
        assert_eq!(jump(&mut 0, &mut cvm, &mut scope), Err(VmError::InvalidJump));

        let mut pc = 0;
        scope.stack.push(U256::from(2));
        jump(&mut pc, &mut cvm, &mut scope).expect("jump failed");
        assert_eq!(pc, 2);
    }

    #[test]
    fn test_jumpi_falls_through() {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);

        // destination is invalid, but never checked when the condition is zero
        let mut scope = test_utils::scope(&mut contract, &[U256::from(99), U256::ZERO]);
        let mut pc = 5;
        jumpi(&mut pc, &mut cvm, &mut scope).expect("jumpi failed");
        assert_eq!(pc, 6);
    }

    #[test]
    fn test_subroutine_round_trip() {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);
        // PUSH1 4 JUMPSUB STOP BEGINSUB RETURNSUB
        contract.code = Bytes::from_static(&[0x60, 0x04, 0x5e, 0x00, 0x5c, 0x5d]);

        let mut scope = test_utils::scope(&mut contract, &[U256::from(4)]);
        let mut pc = 2;
        jump_sub(&mut pc, &mut cvm, &mut scope).expect("jumpsub failed");
        assert_eq!(pc, 5);
        assert_eq!(scope.return_stack.data(), &[2]);

        return_sub(&mut pc, &mut cvm, &mut scope).expect("returnsub failed");
        assert_eq!(pc, 3);
        assert_eq!(return_sub(&mut pc, &mut cvm, &mut scope), Err(VmError::InvalidRetsub));
    }

    #[test]
    fn test_jumpsub_needs_beginsub() {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);
        contract.code = Bytes::from_static(&[0x60, 0x03, 0x5e, 0x5b]);

        let mut scope = test_utils::scope(&mut contract, &[U256::from(3)]);
        assert_eq!(jump_sub(&mut 2, &mut cvm, &mut scope), Err(VmError::InvalidJump));
        assert_eq!(begin_sub(&mut 0, &mut cvm, &mut scope), Err(VmError::InvalidSubroutineEntry));
    }
}
