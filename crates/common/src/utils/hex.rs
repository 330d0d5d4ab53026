use super::strings::encode_hex;
use alloy::primitives::{Address, Bytes, B256, U256};

/// A convenience function which encodes a given primitive type into a `0x`-prefixed, lowercase
/// hex string.
pub trait ToLowerHex {
    /// Encodes `self` as lowercase hex.
    fn to_lower_hex(&self) -> String;
}

impl ToLowerHex for Bytes {
    fn to_lower_hex(&self) -> String {
        format!("0x{}", encode_hex(self))
    }
}

impl ToLowerHex for Vec<u8> {
    fn to_lower_hex(&self) -> String {
        format!("0x{}", encode_hex(self))
    }
}

impl ToLowerHex for U256 {
    fn to_lower_hex(&self) -> String {
        format!("{:#x}", self)
    }
}

impl ToLowerHex for B256 {
    fn to_lower_hex(&self) -> String {
        format!("{:#x}", self)
    }
}

impl ToLowerHex for Address {
    fn to_lower_hex(&self) -> String {
        format!("{:#x}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_lower_hex() {
        assert_eq!(Bytes::from(vec![0xde, 0xad]).to_lower_hex(), "0xdead");
        assert_eq!(U256::from(255u64).to_lower_hex(), "0xff");
        assert_eq!(
            Address::with_last_byte(1).to_lower_hex(),
            "0x0000000000000000000000000000000000000001"
        );
    }
}
