//! Natively implemented contracts living at the addresses `0x01` to `0x09`.

mod blake2;
mod bn256;
mod modexp;

pub use blake2::Blake2F;
pub use bn256::{Bn256Add, Bn256Pairing, Bn256ScalarMul};
pub use modexp::BigModExp;

use alloy::primitives::{Address, Bytes, Signature, B256, U256};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use tracing::trace;

use super::{chains::Rules, constants::*, errors::VmError, memory::get_data};

/// A contract implemented natively instead of in bytecode.
pub trait PrecompiledContract: Send + Sync + std::fmt::Debug {
    /// The energy charged for running the contract on `input`.
    fn required_energy(&self, input: &[u8]) -> u64;

    /// Runs the contract. Errors consume all energy handed to the call.
    fn run(&self, input: &[u8]) -> Result<Bytes, VmError>;
}

/// Charges the contract's price against `energy` and runs it, returning the output and the
/// energy left.
///
/// ```
/// use cvm_vm::core::{errors::VmError, precompiles::{run_precompiled_contract, Identity}};
///
/// let (out, left) = run_precompiled_contract(&Identity, &[1, 2, 3], 100).unwrap();
/// assert_eq!(out.as_ref(), &[1, 2, 3]);
/// assert_eq!(left, 82);
///
/// assert_eq!(run_precompiled_contract(&Identity, &[1], 10), Err(VmError::OutOfEnergy));
/// ```
pub fn run_precompiled_contract(
    contract: &dyn PrecompiledContract,
    input: &[u8],
    energy: u64,
) -> Result<(Bytes, u64), VmError> {
    let cost = contract.required_energy(input);
    if energy < cost {
        return Err(VmError::OutOfEnergy);
    }
    let output = contract.run(input)?;
    Ok((output, energy - cost))
}

/// Returns the precompiled contract at `address` under `rules`, if there is one.
pub fn precompile(rules: &Rules, address: Address) -> Option<&'static dyn PrecompiledContract> {
    let bytes = address.as_slice();
    if bytes[..19].iter().any(|b| *b != 0) {
        return None;
    }
    let index = bytes[19];

    let contract: &'static dyn PrecompiledContract = match index {
        1 => &Ecrecover,
        2 => &Sha256Hash,
        3 => &Ripemd160Hash,
        4 => &Identity,
        5 if rules.is_byzantium => &BigModExp,
        6 if rules.is_istanbul => &Bn256Add { istanbul: true },
        6 if rules.is_byzantium => &Bn256Add { istanbul: false },
        7 if rules.is_istanbul => &Bn256ScalarMul { istanbul: true },
        7 if rules.is_byzantium => &Bn256ScalarMul { istanbul: false },
        8 if rules.is_istanbul => &Bn256Pairing { istanbul: true },
        8 if rules.is_byzantium => &Bn256Pairing { istanbul: false },
        9 if rules.is_istanbul => &Blake2F,
        _ => return None,
    };
    trace!("resolved precompile {index:#04x}");
    Some(contract)
}

/// The addresses of the precompiled contracts active under `rules`.
pub fn active_precompiles(rules: &Rules) -> Vec<Address> {
    (1u8..=9)
        .map(Address::with_last_byte)
        .filter(|address| precompile(rules, *address).is_some())
        .collect()
}

fn words(len: usize) -> u64 {
    (len as u64).div_ceil(32)
}

/// secp256k1 public key recovery, returning the signer address left padded to 32 bytes.
#[derive(Debug, Clone, Copy)]
pub struct Ecrecover;

/// The order of the secp256k1 group.
const SECP256K1_N: U256 = U256::from_be_bytes([
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
]);

impl PrecompiledContract for Ecrecover {
    fn required_energy(&self, _input: &[u8]) -> u64 {
        ECRECOVER_ENERGY
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, VmError> {
        let input = get_data(input, 0, 128);
        let hash = B256::from_slice(&input[..32]);
        let r = U256::from_be_slice(&input[64..96]);
        let s = U256::from_be_slice(&input[96..128]);
        let v = input[63];

        // invalid signatures produce empty output rather than an error
        let in_range = |x: U256| !x.is_zero() && x < SECP256K1_N;
        if input[32..63].iter().any(|b| *b != 0) || !(v == 27 || v == 28) || !in_range(r) ||
            !in_range(s)
        {
            return Ok(Bytes::new());
        }

        let signature = Signature::new(r, s, v == 28);
        match signature.recover_address_from_prehash(&hash) {
            Ok(address) => Ok(Bytes::copy_from_slice(address.into_word().as_slice())),
            Err(_) => Ok(Bytes::new()),
        }
    }
}

/// SHA-256.
#[derive(Debug, Clone, Copy)]
pub struct Sha256Hash;

impl PrecompiledContract for Sha256Hash {
    fn required_energy(&self, input: &[u8]) -> u64 {
        words(input.len()) * SHA256_PER_WORD_ENERGY + SHA256_BASE_ENERGY
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, VmError> {
        Ok(Bytes::copy_from_slice(&Sha256::digest(input)))
    }
}

/// RIPEMD-160, left padded to 32 bytes.
#[derive(Debug, Clone, Copy)]
pub struct Ripemd160Hash;

impl PrecompiledContract for Ripemd160Hash {
    fn required_energy(&self, input: &[u8]) -> u64 {
        words(input.len()) * RIPEMD160_PER_WORD_ENERGY + RIPEMD160_BASE_ENERGY
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, VmError> {
        let mut out = [0u8; 32];
        out[12..].copy_from_slice(&Ripemd160::digest(input));
        Ok(Bytes::copy_from_slice(&out))
    }
}

/// Returns its input.
#[derive(Debug, Clone, Copy)]
pub struct Identity;

impl PrecompiledContract for Identity {
    fn required_energy(&self, input: &[u8]) -> u64 {
        words(input.len()) * IDENTITY_PER_WORD_ENERGY + IDENTITY_BASE_ENERGY
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, VmError> {
        Ok(Bytes::copy_from_slice(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{chains::ChainConfig, hardfork::HardFork};
    use cvm_common::utils::strings::decode_hex;

    fn rules(fork: HardFork) -> Rules {
        ChainConfig::at_hardfork(1, fork).rules(0)
    }

    #[test]
    fn test_active_sets() {
        assert_eq!(active_precompiles(&rules(HardFork::Homestead)).len(), 4);
        assert_eq!(active_precompiles(&rules(HardFork::Byzantium)).len(), 8);
        assert_eq!(active_precompiles(&rules(HardFork::Istanbul)).len(), 9);
        assert!(precompile(&rules(HardFork::Istanbul), Address::with_last_byte(10)).is_none());

        let mut not_precompile = [0u8; 20];
        not_precompile[0] = 1;
        not_precompile[19] = 1;
        assert!(precompile(&rules(HardFork::Istanbul), Address::from(not_precompile)).is_none());
    }

    #[test]
    fn test_bn256_pricing_follows_rules() {
        let add = Address::with_last_byte(6);
        let byzantium = precompile(&rules(HardFork::Byzantium), add).expect("missing bn256 add");
        let istanbul = precompile(&rules(HardFork::Istanbul), add).expect("missing bn256 add");

        assert_eq!(byzantium.required_energy(&[]), 500);
        assert_eq!(istanbul.required_energy(&[]), 150);
    }

    #[test]
    fn test_ecrecover() {
        let input = decode_hex(
            "5fc037121c0922523b56eb122a5f13640f153a59d200adf80bc5be0d0f07561f\
             000000000000000000000000000000000000000000000000000000000000001c\
             bb50e2d89a4ed70663d080659fe0ad4b9bc3e06c17a227433966cb59ceee020d\
             278abfbda8db6de2a791feeee8ee1ccc145d3e713b2c74b9ffa5b60fcc0fdfde",
        )
        .expect("invalid hex");

        let out = Ecrecover.run(&input).expect("ecrecover failed");
        assert_eq!(
            out.as_ref(),
            decode_hex("0000000000000000000000002c7536e3605d9c16a7a3d7b1898e529396a65c23")
                .expect("invalid hex")
                .as_slice()
        );

        // v outside {27, 28}
        let mut bad_v = input.clone();
        bad_v[63] = 29;
        assert!(Ecrecover.run(&bad_v).expect("ecrecover failed").is_empty());

        // garbage in the v padding
        let mut bad_padding = input;
        bad_padding[40] = 1;
        assert!(Ecrecover.run(&bad_padding).expect("ecrecover failed").is_empty());
    }

    #[test]
    fn test_hashes() {
        assert_eq!(
            Sha256Hash.run(b"").expect("sha256 failed").as_ref(),
            decode_hex("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .expect("invalid hex")
                .as_slice()
        );
        assert_eq!(
            Ripemd160Hash.run(b"").expect("ripemd160 failed").as_ref(),
            decode_hex("0000000000000000000000009c1185a5c5e9fc54612808977ee8f548b2258d31")
                .expect("invalid hex")
                .as_slice()
        );
        assert_eq!(Sha256Hash.required_energy(&[0; 33]), 84);
        assert_eq!(Ripemd160Hash.required_energy(&[0; 32]), 720);
    }
}
