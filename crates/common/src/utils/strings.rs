use alloy::primitives::{I256, U256};
use eyre::{eyre, Result};
use std::fmt::Write;

/// Converts a U256 to its two's complement signed representation.
pub fn sign_uint(unsigned: U256) -> I256 {
    I256::from_raw(unsigned)
}

/// Decodes a hex string into a vector of bytes
///
/// ```
/// use cvm_common::utils::strings::decode_hex;
///
/// let hex = "0x48656c6c6f20576f726c64"; // "Hello World" in hex
/// let result = decode_hex(hex).expect("should decode hex");
/// assert_eq!(result, vec![72, 101, 108, 108, 111, 32, 87, 111, 114, 108, 100]);
/// ```
pub fn decode_hex(mut s: &str) -> Result<Vec<u8>> {
    // normalize
    s = s.trim();
    s = s.strip_prefix("0x").unwrap_or(s);

    if s.is_empty() {
        return Ok(vec![]);
    }
    if s.len() % 2 != 0 {
        return Err(eyre!("invalid hex string: odd length {}", s.len()));
    }

    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .ok_or_else(|| eyre!("invalid hex string: {}", s))
                .and_then(|pair| u8::from_str_radix(pair, 16).map_err(|e| eyre!("{e}")))
        })
        .collect::<Result<Vec<u8>>>()
        .map_err(|_| eyre!("invalid hex string: {}", s))
}

/// Encodes a slice of bytes into a lowercase hex string, without prefix.
///
/// ```
/// use cvm_common::utils::strings::encode_hex;
///
/// assert_eq!(encode_hex(&[0x60, 0x01]), "6001");
/// ```
pub fn encode_hex(s: &[u8]) -> String {
    s.iter().fold(String::with_capacity(s.len() * 2), |mut acc, b| {
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
