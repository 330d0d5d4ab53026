//! Memory size calculators. Each returns the highest byte offset an instruction touches, or `None`
//! if the operands do not fit in 64 bits.

use alloy::primitives::U256;

use super::super::stack::Stack;

/// `offset + length`, where a zero length touches nothing regardless of the offset.
fn calc_mem_size(offset: U256, length: U256) -> Option<u64> {
    let length: u64 = length.try_into().ok()?;
    if length == 0 {
        return Some(0);
    }
    let offset: u64 = offset.try_into().ok()?;
    offset.checked_add(length)
}

/// `offset + length` for a fixed length.
fn calc_mem_size_with_uint(offset: U256, length: u64) -> Option<u64> {
    let offset: u64 = offset.try_into().ok()?;
    offset.checked_add(length)
}

fn from_stack(stack: &Stack, offset: usize, length: usize) -> Option<u64> {
    calc_mem_size(stack.back(offset).ok()?, stack.back(length).ok()?)
}

pub(crate) fn memory_sha3(stack: &Stack) -> Option<u64> {
    from_stack(stack, 0, 1)
}

pub(crate) fn memory_call_data_copy(stack: &Stack) -> Option<u64> {
    from_stack(stack, 0, 2)
}

pub(crate) fn memory_return_data_copy(stack: &Stack) -> Option<u64> {
    from_stack(stack, 0, 2)
}

pub(crate) fn memory_code_copy(stack: &Stack) -> Option<u64> {
    from_stack(stack, 0, 2)
}

pub(crate) fn memory_ext_code_copy(stack: &Stack) -> Option<u64> {
    from_stack(stack, 1, 3)
}

pub(crate) fn memory_mload(stack: &Stack) -> Option<u64> {
    calc_mem_size_with_uint(stack.back(0).ok()?, 32)
}

pub(crate) fn memory_mstore8(stack: &Stack) -> Option<u64> {
    calc_mem_size_with_uint(stack.back(0).ok()?, 1)
}

pub(crate) fn memory_mstore(stack: &Stack) -> Option<u64> {
    calc_mem_size_with_uint(stack.back(0).ok()?, 32)
}

pub(crate) fn memory_create(stack: &Stack) -> Option<u64> {
    from_stack(stack, 1, 2)
}

pub(crate) fn memory_create2(stack: &Stack) -> Option<u64> {
    from_stack(stack, 1, 2)
}

/// The larger of the argument and return regions.
pub(crate) fn memory_call(stack: &Stack) -> Option<u64> {
    let ret = from_stack(stack, 5, 6)?;
    let args = from_stack(stack, 3, 4)?;
    Some(ret.max(args))
}

pub(crate) fn memory_delegate_call(stack: &Stack) -> Option<u64> {
    let ret = from_stack(stack, 4, 5)?;
    let args = from_stack(stack, 2, 3)?;
    Some(ret.max(args))
}

pub(crate) fn memory_static_call(stack: &Stack) -> Option<u64> {
    memory_delegate_call(stack)
}

pub(crate) fn memory_return(stack: &Stack) -> Option<u64> {
    from_stack(stack, 0, 1)
}

pub(crate) fn memory_revert(stack: &Stack) -> Option<u64> {
    from_stack(stack, 0, 1)
}

pub(crate) fn memory_log(stack: &Stack) -> Option<u64> {
    from_stack(stack, 0, 1)
}
