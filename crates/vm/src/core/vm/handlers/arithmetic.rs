use alloy::primitives::{Bytes, U256};

use crate::core::errors::VmError;

use super::super::{core::Cvm, execution::Scope};

/// The magnitude of a two's complement word, and whether it was negative.
fn abs(value: U256) -> (U256, bool) {
    if value.bit(255) {
        (value.wrapping_neg(), true)
    } else {
        (value, false)
    }
}

/// ADD - Addition operation
pub fn add(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.peek_mut()?;
    *b = a.wrapping_add(*b);
    Ok(Bytes::new())
}

/// MUL - Multiplication operation
pub fn mul(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.peek_mut()?;
    *b = a.wrapping_mul(*b);
    Ok(Bytes::new())
}

/// SUB - Subtraction operation
pub fn sub(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.peek_mut()?;
    *b = a.wrapping_sub(*b);
    Ok(Bytes::new())
}

/// DIV - Integer division operation. Division by zero yields zero.
pub fn div(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let numerator = scope.stack.pop()?;
    let denominator = scope.stack.peek_mut()?;
    *denominator =
        if denominator.is_zero() { U256::ZERO } else { numerator.wrapping_div(*denominator) };
    Ok(Bytes::new())
}

/// SDIV - Signed integer division operation, truncating towards zero
pub fn sdiv(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let numerator = scope.stack.pop()?;
    let denominator = scope.stack.peek_mut()?;
    if denominator.is_zero() {
        return Ok(Bytes::new());
    }

    let (n, n_negative) = abs(numerator);
    let (d, d_negative) = abs(*denominator);
    let quotient = n.wrapping_div(d);
    *denominator = if n_negative != d_negative { quotient.wrapping_neg() } else { quotient };
    Ok(Bytes::new())
}

/// MOD - Modulo operation
pub fn modulo(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let modulus = scope.stack.peek_mut()?;
    *modulus = if modulus.is_zero() { U256::ZERO } else { a.wrapping_rem(*modulus) };
    Ok(Bytes::new())
}

/// SMOD - Signed modulo operation. The result takes the sign of the dividend.
pub fn smod(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let modulus = scope.stack.peek_mut()?;
    if modulus.is_zero() {
        return Ok(Bytes::new());
    }

    let (n, negative) = abs(a);
    let (m, _) = abs(*modulus);
    let remainder = n.wrapping_rem(m);
    *modulus = if negative { remainder.wrapping_neg() } else { remainder };
    Ok(Bytes::new())
}

/// ADDMOD - Modular addition operation
pub fn addmod(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.pop()?;
    let modulus = scope.stack.peek_mut()?;
    *modulus = a.add_mod(b, *modulus);
    Ok(Bytes::new())
}

/// MULMOD - Modular multiplication operation
pub fn mulmod(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let a = scope.stack.pop()?;
    let b = scope.stack.pop()?;
    let modulus = scope.stack.peek_mut()?;
    *modulus = a.mul_mod(b, *modulus);
    Ok(Bytes::new())
}

/// EXP - Exponential operation
pub fn exp(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let base = scope.stack.pop()?;
    let exponent = scope.stack.peek_mut()?;
    *exponent = base.wrapping_pow(*exponent);
    Ok(Bytes::new())
}

/// SIGNEXTEND - Sign extension operation
pub fn signextend(_: &mut u64, _: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let back = scope.stack.pop()?;
    let num = scope.stack.peek_mut()?;

    if back < U256::from(31) {
        let bit = back.as_limbs()[0] as usize * 8 + 7;
        let mask = (U256::from(1) << bit) - U256::from(1);
        *num = if num.bit(bit) { *num | !mask } else { *num & mask };
    }
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

    fn neg(value: u64) -> U256 {
        U256::from(value).wrapping_neg()
    }

    #[test]
    fn test_wrapping_arithmetic() {
        assert_eq!(run(add, &[U256::MAX, U256::from(2)]), U256::from(1));
        assert_eq!(run(sub, &[U256::from(1), U256::from(2)]), U256::MAX);
        assert_eq!(run(mul, &[U256::MAX, U256::from(2)]), U256::MAX - U256::from(1));
    }

    #[test]
    fn test_division_by_zero_is_zero() {
        assert_eq!(run(div, &[U256::from(10), U256::ZERO]), U256::ZERO);
        assert_eq!(run(sdiv, &[U256::from(10), U256::ZERO]), U256::ZERO);
        assert_eq!(run(modulo, &[U256::from(10), U256::ZERO]), U256::ZERO);
        assert_eq!(run(smod, &[U256::from(10), U256::ZERO]), U256::ZERO);
        assert_eq!(run(addmod, &[U256::from(1), U256::from(2), U256::ZERO]), U256::ZERO);
    }

    #[test]
    fn test_signed_division() {
        assert_eq!(run(sdiv, &[neg(10), U256::from(3)]), neg(3));
        assert_eq!(run(sdiv, &[neg(10), neg(3)]), U256::from(3));

        // the most negative value divided by -1 overflows back to itself
        let min = U256::from(1) << 255;
        assert_eq!(run(sdiv, &[min, U256::MAX]), min);
    }

    #[test]
    fn test_signed_modulo_follows_dividend() {
        assert_eq!(run(smod, &[neg(10), U256::from(3)]), neg(1));
        assert_eq!(run(smod, &[U256::from(10), neg(3)]), U256::from(1));
    }

    #[test]
    fn test_modular_arithmetic() {
        assert_eq!(run(addmod, &[U256::MAX, U256::from(2), U256::from(10)]), U256::from(7));
        assert_eq!(run(mulmod, &[U256::MAX, U256::MAX, U256::from(12)]), U256::from(9));
    }

    #[test]
    fn test_exp_wraps() {
        assert_eq!(run(exp, &[U256::from(2), U256::from(10)]), U256::from(1024));
        assert_eq!(run(exp, &[U256::from(2), U256::from(256)]), U256::ZERO);
    }

    #[test]
    fn test_signextend() {
        assert_eq!(run(signextend, &[U256::ZERO, U256::from(0xff)]), U256::MAX);
        assert_eq!(run(signextend, &[U256::ZERO, U256::from(0x17f)]), U256::from(0x7f));
        assert_eq!(run(signextend, &[U256::from(31), U256::from(0xff)]), U256::from(0xff));
    }
}
