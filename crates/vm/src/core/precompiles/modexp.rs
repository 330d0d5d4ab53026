use alloy::primitives::Bytes;
use num_bigint::BigUint;
use num_traits::{One, Zero};

use super::PrecompiledContract;
use crate::core::{
    constants::{MOD_EXP_MAX_EXPONENT_LEN, MOD_EXP_MAX_OPERAND_LEN, MOD_EXP_QUAD_COEFF_DIV},
    errors::VmError,
    memory::get_data,
};

/// Arbitrary precision modular exponentiation.
///
/// The input is three 32 byte big endian lengths followed by the base, exponent and modulus.
#[derive(Debug, Clone, Copy)]
pub struct BigModExp;

/// Reads one of the three length words, keeping the low 64 bits.
fn read_len(input: &[u8], offset: u64) -> BigUint {
    BigUint::from_bytes_be(&get_data(input, offset, 32))
}

fn low_u64(value: &BigUint) -> u64 {
    value.iter_u64_digits().next().unwrap_or_default()
}

/// Reads a length word, rejecting anything above `max` before it is allocated.
fn bounded_len(input: &[u8], offset: u64, max: u64, what: &str) -> Result<u64, VmError> {
    let len = read_len(input, offset);
    if len > BigUint::from(max) {
        return Err(VmError::Precompile(format!("modexp: {what} length {len} exceeds {max}")));
    }
    Ok(low_u64(&len))
}

/// The multiplication complexity of operands that are `x` bytes long.
fn mult_complexity(x: BigUint) -> BigUint {
    if x <= BigUint::from(64u32) {
        &x * &x
    } else if x <= BigUint::from(1024u32) {
        // x^2 / 4 + 96x - 3072
        &x * &x / 4u32 + &x * 96u32 - 3072u32
    } else {
        // x^2 / 16 + 480x - 199680
        &x * &x / 16u32 + &x * 480u32 - 199680u32
    }
}

impl PrecompiledContract for BigModExp {
    fn required_energy(&self, input: &[u8]) -> u64 {
        let base_len = read_len(input, 0);
        let exp_len = read_len(input, 32);
        let mod_len = read_len(input, 64);
        let body = input.get(96..).unwrap_or_default();

        // the leading 32 bytes of the exponent drive the price
        let exp_head = if BigUint::from(body.len()) <= base_len {
            BigUint::zero()
        } else {
            let head_len = if exp_len > BigUint::from(32u32) { 32 } else { low_u64(&exp_len) };
            BigUint::from_bytes_be(&get_data(body, low_u64(&base_len), head_len))
        };
        let msb = exp_head.bits().saturating_sub(1);

        let mut adjusted_exp_len = BigUint::zero();
        if exp_len > BigUint::from(32u32) {
            adjusted_exp_len = (exp_len - 32u32) * 8u32;
        }
        adjusted_exp_len += msb;

        let energy = mult_complexity(base_len.max(mod_len)) * adjusted_exp_len.max(BigUint::one()) /
            MOD_EXP_QUAD_COEFF_DIV;

        u64::try_from(&energy).unwrap_or(u64::MAX)
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, VmError> {
        let base_len = bounded_len(input, 0, MOD_EXP_MAX_OPERAND_LEN, "base")?;
        let mod_len = bounded_len(input, 64, MOD_EXP_MAX_OPERAND_LEN, "modulus")?;
        if base_len == 0 && mod_len == 0 {
            return Ok(Bytes::new());
        }

        let exp_len = bounded_len(input, 32, MOD_EXP_MAX_EXPONENT_LEN, "exponent")?;
        let body = input.get(96..).unwrap_or_default();

        let base = BigUint::from_bytes_be(&get_data(body, 0, base_len));
        let exp = BigUint::from_bytes_be(&get_data(body, base_len, exp_len));
        let modulus =
            BigUint::from_bytes_be(&get_data(body, base_len.saturating_add(exp_len), mod_len));

        let mut out = vec![0u8; mod_len as usize];
        if modulus.is_zero() {
            return Ok(out.into());
        }

        let result = base.modpow(&exp, &modulus).to_bytes_be();
        if result.len() <= out.len() {
            let start = out.len() - result.len();
            out[start..].copy_from_slice(&result);
        }
        Ok(out.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvm_common::utils::strings::decode_hex;

    fn input(base_len: u8, exp_len: u8, mod_len: u8, body: &str) -> Vec<u8> {
        let mut input = vec![0u8; 96];
        input[31] = base_len;
        input[63] = exp_len;
        input[95] = mod_len;
        input.extend(decode_hex(body).expect("invalid hex"));
        input
    }

    #[test]
    fn test_small_modexp() {
        let input = input(1, 1, 1, "030507");
        assert_eq!(BigModExp.run(&input).expect("modexp failed").as_ref(), &[5]);
        assert_eq!(BigModExp.required_energy(&input), 0);
    }

    #[test]
    fn test_fermat_little_theorem() {
        let input = input(
            1,
            32,
            32,
            "03\
             fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2e\
             fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f",
        );

        let out = BigModExp.run(&input).expect("modexp failed");
        let mut expected = [0u8; 32];
        expected[31] = 1;
        assert_eq!(out.as_ref(), &expected);
        assert_eq!(BigModExp.required_energy(&input), 13056);
    }

    #[test]
    fn test_zero_modulus_and_empty_operands() {
        let out = BigModExp.run(&input(1, 1, 2, "02030000")).expect("modexp failed");
        assert_eq!(out.as_ref(), &[0, 0]);
        assert!(BigModExp.run(&input(0, 4, 0, "")).expect("modexp failed").is_empty());
        assert!(BigModExp.run(&[]).expect("modexp failed").is_empty());
    }

    #[test]
    fn test_huge_lengths_saturate() {
        let mut input = vec![0xffu8; 96];
        input[..32].fill(0);
        assert_eq!(BigModExp.required_energy(&input), u64::MAX);
    }

    #[test]
    fn test_oversized_lengths_are_rejected() {
        let mut huge_exp = input(1, 0, 1, "0203");
        huge_exp[32..64].fill(0xff);
        let err = BigModExp.run(&huge_exp).unwrap_err();
        assert!(matches!(err, VmError::Precompile(reason) if reason.contains("exponent")));

        // nothing to compute, so the exponent length does not matter
        let mut empty = input(0, 0, 0, "");
        empty[32..64].fill(0xff);
        assert!(BigModExp.run(&empty).expect("modexp failed").is_empty());

        // only the low 64 bits are set, the length is still far too large
        let mut wide_mod = input(1, 1, 1, "020303");
        wide_mod[87] = 1;
        assert!(BigModExp.run(&wide_mod).is_err());

        let mut long_base = input(0, 1, 1, "0303");
        long_base[29] = 0x10;
        long_base[31] = 0x01;
        let err = BigModExp.run(&long_base).unwrap_err();
        assert_eq!(
            err,
            VmError::Precompile("modexp: base length 1048577 exceeds 1048576".to_string())
        );
    }
}
