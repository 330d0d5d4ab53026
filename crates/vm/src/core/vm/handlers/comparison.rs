use alloy::primitives::{Bytes, U256};
use cvm_common::utils::strings::sign_uint;

use crate::core::errors::VmError;

use super::super::{core::Cvm, execution::Scope};

#[inline]
fn from_bool(value: bool) -> U256 {
    if value {
        U256::from(1)
    } else {
        U256::ZERO
    }
}

/// LT - Less than comparison
pub fn lt(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.peek_mut()?;
    *b = from_bool(a < *b);
    Ok(Bytes::new())
}

/// GT - Greater than comparison
pub fn gt(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.peek_mut()?;
    *b = from_bool(a > *b);
    Ok(Bytes::new())
}

/// SLT - Signed less than comparison
pub fn slt(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.peek_mut()?;
    *b = from_bool(sign_uint(a) < sign_uint(*b));
    Ok(Bytes::new())
}

/// SGT - Signed greater than comparison
pub fn sgt(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.peek_mut()?;
    *b = from_bool(sign_uint(a) > sign_uint(*b));
    Ok(Bytes::new())
}

/// EQ - Equality comparison
pub fn eq(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.peek_mut()?;
    *b = from_bool(a == *b);
    Ok(Bytes::new())
}

/// ISZERO - Is zero check
pub fn iszero(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.peek_mut()?;
    *a = from_bool(a.is_zero());
    Ok(Bytes::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{state::MemoryState, vm::handlers::test_utils};

    fn run(
        handler: fn(&mut u64, &mut Cvm<'_>, &mut Scope<'_>) -> Result<Bytes, VmError>,
        items: &[U256],
    ) -> U256 {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(0);
        let mut scope = test_utils::scope(&mut contract, items);
        handler(&mut 0, &mut cvm, &mut scope).expect("handler failed");
        scope.stack.pop().expect("empty stack")
    }

    #[test]
    fn test_unsigned_comparisons() {
        assert_eq!(run(lt, &[U256::from(1), U256::from(2)]), U256::from(1));
        assert_eq!(run(gt, &[U256::from(1), U256::from(2)]), U256::ZERO);
        assert_eq!(run(lt, &[U256::MAX, U256::from(2)]), U256::ZERO);
        assert_eq!(run(eq, &[U256::MAX, U256::MAX]), U256::from(1));
        assert_eq!(run(iszero, &[U256::ZERO]), U256::from(1));
    }

    #[test]
    fn test_signed_comparisons() {
        // -1 < 2
        assert_eq!(run(slt, &[U256::MAX, U256::from(2)]), U256::from(1));
        assert_eq!(run(sgt, &[U256::MAX, U256::from(2)]), U256::ZERO);
        assert_eq!(run(sgt, &[U256::from(2), U256::MAX]), U256::from(1));
    }
}
