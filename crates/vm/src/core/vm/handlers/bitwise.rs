use alloy::primitives::{Bytes, U256};

use crate::core::errors::VmError;

use super::{
    super::{core::Cvm, execution::Scope},
    low_u64,
};

/// AND - Bitwise AND operation
pub fn and(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.peek_mut()?;
    *b &= a;
    Ok(Bytes::new())
}

/// OR - Bitwise OR operation
pub fn or(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.peek_mut()?;
    *b |= a;
    Ok(Bytes::new())
}

/// XOR - Bitwise XOR operation
pub fn xor(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.peek_mut()?;
    *b ^= a;
    Ok(Bytes::new())
}

/// NOT - Bitwise NOT operation
pub fn not(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.peek_mut()?;
    *a = !*a;
    Ok(Bytes::new())
}

/// BYTE - Retrieve single byte from word, counting from the most significant byte
pub fn byte(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let index = scope.stack.pop()?;
    let value = scope.stack.peek_mut()?;
    *value = if index < U256::from(32) {
        U256::from(value.byte(31 - low_u64(index) as usize))
    } else {
        U256::ZERO
    };
    Ok(Bytes::new())
}

/// SHL - Shift left operation
pub fn shl(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let shift = scope.stack.pop()?;
    let value = scope.stack.peek_mut()?;
    *value =
        if shift < U256::from(256) { *value << low_u64(shift) as usize } else { U256::ZERO };
    Ok(Bytes::new())
}

/// SHR - Logical shift right operation
pub fn shr(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let shift = scope.stack.pop()?;
    let value = scope.stack.peek_mut()?;
    *value =
        if shift < U256::from(256) { *value >> low_u64(shift) as usize } else { U256::ZERO };
    Ok(Bytes::new())
}

/// SAR - Arithmetic shift right operation, filling with the sign bit
pub fn sar(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let shift = scope.stack.pop()?;
    let value = scope.stack.peek_mut()?;
    let negative = value.bit(255);

    *value = if shift >= U256::from(256) {
        if negative {
            U256::MAX
        } else {
            U256::ZERO
        }
    } else if negative {
        !((!*value) >> low_u64(shift) as usize)
    } else {
        *value >> low_u64(shift) as usize
    };
    Ok(Bytes::new())
}
