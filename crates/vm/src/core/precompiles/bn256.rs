use alloy::primitives::Bytes;
use substrate_bn::{pairing_batch, AffineG1, AffineG2, Fq, Fq2, Fr, Group, Gt, G1, G2};

use super::PrecompiledContract;
use crate::core::{constants::*, errors::VmError, memory::get_data};

/// Size of one G1/G2 pair in the pairing check input.
const PAIR_SIZE: usize = 192;

fn read_fq(input: &[u8], offset: usize) -> Result<Fq, VmError> {
    Fq::from_slice(&input[offset..offset + 32])
        .map_err(|_| VmError::Precompile("bn256: coordinate exceeds modulus".to_string()))
}

/// Reads an affine G1 point. `(0, 0)` encodes the point at infinity.
fn read_g1(input: &[u8]) -> Result<G1, VmError> {
    let x = read_fq(input, 0)?;
    let y = read_fq(input, 32)?;
    if x.is_zero() && y.is_zero() {
        return Ok(G1::zero());
    }
    AffineG1::new(x, y)
        .map(Into::into)
        .map_err(|_| VmError::Precompile("bn256: malformed point".to_string()))
}

/// Reads an affine G2 point, imaginary parts first.
fn read_g2(input: &[u8]) -> Result<G2, VmError> {
    let x = Fq2::new(read_fq(input, 32)?, read_fq(input, 0)?);
    let y = Fq2::new(read_fq(input, 96)?, read_fq(input, 64)?);
    if x.is_zero() && y.is_zero() {
        return Ok(G2::zero());
    }
    AffineG2::new(x, y)
        .map(Into::into)
        .map_err(|_| VmError::Precompile("bn256: malformed point".to_string()))
}

fn write_g1(point: G1) -> Result<Bytes, VmError> {
    let mut out = [0u8; 64];
    // the point at infinity has no affine form and encodes as zeroes
    if let Some(affine) = AffineG1::from_jacobian(point) {
        affine
            .x()
            .to_big_endian(&mut out[..32])
            .and_then(|_| affine.y().to_big_endian(&mut out[32..]))
            .map_err(|_| VmError::Precompile("bn256: cannot encode point".to_string()))?;
    }
    Ok(Bytes::copy_from_slice(&out))
}

/// Point addition on the bn256 curve.
#[derive(Debug, Clone, Copy)]
pub struct Bn256Add {
    /// Whether the cheaper Istanbul pricing applies.
    pub istanbul: bool,
}

impl PrecompiledContract for Bn256Add {
    fn required_energy(&self, _input: &[u8]) -> u64 {
        if self.istanbul {
            BN256_ADD_ENERGY_ISTANBUL
        } else {
            BN256_ADD_ENERGY_BYZANTIUM
        }
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, VmError> {
        let input = get_data(input, 0, 128);
        let a = read_g1(&input[..64])?;
        let b = read_g1(&input[64..])?;
        write_g1(a + b)
    }
}

/// Scalar multiplication on the bn256 curve.
#[derive(Debug, Clone, Copy)]
pub struct Bn256ScalarMul {
    /// Whether the cheaper Istanbul pricing applies.
    pub istanbul: bool,
}

impl PrecompiledContract for Bn256ScalarMul {
    fn required_energy(&self, _input: &[u8]) -> u64 {
        if self.istanbul {
            BN256_SCALAR_MUL_ENERGY_ISTANBUL
        } else {
            BN256_SCALAR_MUL_ENERGY_BYZANTIUM
        }
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, VmError> {
        let input = get_data(input, 0, 96);
        let point = read_g1(&input[..64])?;
        let scalar = Fr::from_slice(&input[64..])
            .map_err(|_| VmError::Precompile("bn256: invalid scalar".to_string()))?;
        write_g1(point * scalar)
    }
}

/// The optimal ate pairing check over a list of G1/G2 pairs.
#[derive(Debug, Clone, Copy)]
pub struct Bn256Pairing {
    /// Whether the cheaper Istanbul pricing applies.
    pub istanbul: bool,
}

impl PrecompiledContract for Bn256Pairing {
    fn required_energy(&self, input: &[u8]) -> u64 {
        let pairs = (input.len() / PAIR_SIZE) as u64;
        if self.istanbul {
            BN256_PAIRING_BASE_ENERGY_ISTANBUL + pairs * BN256_PAIRING_PER_POINT_ENERGY_ISTANBUL
        } else {
            BN256_PAIRING_BASE_ENERGY_BYZANTIUM + pairs * BN256_PAIRING_PER_POINT_ENERGY_BYZANTIUM
        }
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, VmError> {
        if input.len() % PAIR_SIZE != 0 {
            return Err(VmError::Precompile("bad elliptic curve pairing size".to_string()));
        }

        let pairs = input
            .chunks(PAIR_SIZE)
            .map(|chunk| Ok((read_g1(&chunk[..64])?, read_g2(&chunk[64..])?)))
            .collect::<Result<Vec<_>, VmError>>()?;

        let mut out = [0u8; 32];
        if pairing_batch(&pairs) == Gt::one() {
            out[31] = 1;
        }
        Ok(Bytes::copy_from_slice(&out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvm_common::utils::strings::decode_hex;

    const G: &str = "0000000000000000000000000000000000000000000000000000000000000001\
                     0000000000000000000000000000000000000000000000000000000000000002";
    const TWO_G: &str = "030644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd3\
                         15ed738c0e0a7c92e7845f96b2ae9c0a68a6a449e3538fc7ff3ebf7a5a18a2c4";
    const THREE_G: &str = "0769bf9ac56bea3ff40232bcb1b6bd159315d84715b8e679f2d355961915abf0\
                           2ab799bee0489429554fdb7c8d086475319e63b40b9c5b57cdf1ff3dd9fe2261";

    fn hex(s: &str) -> Vec<u8> {
        decode_hex(s).expect("invalid hex")
    }

    #[test]
    fn test_add() {
        let add = Bn256Add { istanbul: true };
        let out = add.run(&hex(&format!("{G}{G}"))).expect("add failed");
        assert_eq!(out.as_ref(), hex(TWO_G).as_slice());

        let out = add.run(&hex(&format!("{G}{TWO_G}"))).expect("add failed");
        assert_eq!(out.as_ref(), hex(THREE_G).as_slice());

        // infinity is the identity, and empty input is two infinities
        let out = add.run(&hex(G)).expect("add failed");
        assert_eq!(out.as_ref(), hex(G).as_slice());
        assert_eq!(add.run(&[]).expect("add failed").as_ref(), &[0u8; 64]);
    }

    #[test]
    fn test_add_rejects_points_off_curve() {
        let mut input = hex(G);
        input[63] = 3;
        assert!(Bn256Add { istanbul: true }.run(&input).is_err());
    }

    #[test]
    fn test_scalar_mul() {
        let mul = Bn256ScalarMul { istanbul: false };
        let mut input = hex(G);
        input.extend([0u8; 31]);
        input.push(3);

        let out = mul.run(&input).expect("mul failed");
        assert_eq!(out.as_ref(), hex(THREE_G).as_slice());
        assert_eq!(mul.required_energy(&input), 40000);
    }

    #[test]
    fn test_pairing() {
        let pairing = Bn256Pairing { istanbul: true };
        let mut one = [0u8; 32];
        one[31] = 1;

        assert_eq!(pairing.run(&[]).expect("pairing failed").as_ref(), &one);
        assert!(pairing.run(&[0u8; 191]).is_err());

        // pairs with the point at infinity are neutral
        assert_eq!(pairing.run(&[0u8; 192]).expect("pairing failed").as_ref(), &one);

        assert_eq!(pairing.required_energy(&[0u8; 384]), 45000 + 2 * 34000);
        assert_eq!(Bn256Pairing { istanbul: false }.required_energy(&[]), 100000);
    }
}
