use alloy::primitives::{Bytes, U256};

use crate::core::{
    errors::VmError,
    memory::get_data,
    opcodes::{push_size, DUP1, SWAP1},
};

use super::super::{core::Cvm, execution::Scope};

/// POP - Remove item from stack
pub fn pop(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.pop()?;
    Ok(Bytes::new())
}

/// PUSH1-PUSH32 - Place an item on the stack. Immediates running past the end of the code are
/// zero padded on the right.
pub fn push(pc: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let size = push_size(scope.contract.get_op(*pc)) as u64;
    let data = get_data(&scope.contract.code, pc.saturating_add(1), size);
    scope.stack.push(U256::from_be_slice(&data));
    *pc += size;
    Ok(Bytes::new())
}

/// DUP1-DUP16 - Duplicate the nth stack item
pub fn dup(pc: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let n = (scope.contract.get_op(*pc) - DUP1) as usize + 1;
    scope.stack.dup(n)?;
    Ok(Bytes::new())
}

/// SWAP1-SWAP16 - Exchange the top stack item with the nth item below it
pub fn swap(pc: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let n = (scope.contract.get_op(*pc) - SWAP1) as usize + 1;
    scope.stack.swap(n)?;
    Ok(Bytes::new())
}
