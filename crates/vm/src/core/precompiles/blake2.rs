use alloy::primitives::Bytes;

use super::PrecompiledContract;
use crate::core::{constants::BLAKE2F_ROUND_ENERGY, errors::VmError};

/// Exact size of a BLAKE2 F input: rounds, state, message, offset counters and the final flag.
const BLAKE2F_INPUT_LENGTH: usize = 213;

const IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

const SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

/// The BLAKE2b F compression function with a caller chosen number of rounds.
#[derive(Debug, Clone, Copy)]
pub struct Blake2F;

#[inline(always)]
#[allow(clippy::many_single_char_names)]
fn g(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

/// Compresses the message block `m` into the state `h`.
fn compress(rounds: u32, h: &mut [u64; 8], m: &[u64; 16], t: [u64; 2], last: bool) {
    let mut v = [0u64; 16];
    v[..8].copy_from_slice(h);
    v[8..].copy_from_slice(&IV);
    v[12] ^= t[0];
    v[13] ^= t[1];
    if last {
        v[14] = !v[14];
    }

    for round in 0..rounds as usize {
        let s = &SIGMA[round % 10];
        g(&mut v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
        g(&mut v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
        g(&mut v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
        g(&mut v, 3, 7, 11, 15, m[s[6]], m[s[7]]);
        g(&mut v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
        g(&mut v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
        g(&mut v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
        g(&mut v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
    }

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }
}

fn read_u64_le(input: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&input[offset..offset + 8]);
    u64::from_le_bytes(word)
}

impl PrecompiledContract for Blake2F {
    fn required_energy(&self, input: &[u8]) -> u64 {
        if input.len() != BLAKE2F_INPUT_LENGTH {
            return 0;
        }
        let rounds = u32::from_be_bytes([input[0], input[1], input[2], input[3]]);
        rounds as u64 * BLAKE2F_ROUND_ENERGY
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, VmError> {
        if input.len() != BLAKE2F_INPUT_LENGTH {
            return Err(VmError::Precompile("invalid input length".to_string()));
        }
        let last = match input[212] {
            0 => false,
            1 => true,
            _ => return Err(VmError::Precompile("invalid final flag".to_string())),
        };

        let rounds = u32::from_be_bytes([input[0], input[1], input[2], input[3]]);
        let mut h = [0u64; 8];
        for (i, word) in h.iter_mut().enumerate() {
            *word = read_u64_le(input, 4 + i * 8);
        }
        let mut m = [0u64; 16];
        for (i, word) in m.iter_mut().enumerate() {
            *word = read_u64_le(input, 68 + i * 8);
        }
        let t = [read_u64_le(input, 196), read_u64_le(input, 204)];

        compress(rounds, &mut h, &m, t, last);

        let out = h.iter().flat_map(|word| word.to_le_bytes()).collect::<Vec<u8>>();
        Ok(out.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvm_common::utils::strings::decode_hex;

    /// Twelve rounds over the single block "abc", the same work as hashing it with BLAKE2b-512.
    const ABC_INPUT: &str = "0000000c\
        48c9bdf267e6096a3ba7ca8485ae67bb2bf894fe72f36e3cf1361d5f3af54fa5\
        d182e6ad7f520e511f6c3e2b8c68059b6bbd41fbabd9831f79217e1319cde05b\
        6162630000000000000000000000000000000000000000000000000000000000\
        0000000000000000000000000000000000000000000000000000000000000000\
        0000000000000000000000000000000000000000000000000000000000000000\
        0000000000000000000000000000000000000000000000000000000000000000\
        0300000000000000\
        0000000000000000\
        01";

    #[test]
    fn test_blake2f_abc() {
        let input = decode_hex(ABC_INPUT).expect("invalid hex");
        assert_eq!(input.len(), 213);
        assert_eq!(Blake2F.required_energy(&input), 12);

        let out = Blake2F.run(&input).expect("blake2f failed");
        assert_eq!(
            out.as_ref(),
            decode_hex(
                "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
                 7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923"
            )
            .expect("invalid hex")
            .as_slice()
        );
    }

    #[test]
    fn test_blake2f_rejects_bad_input() {
        let mut input = decode_hex(ABC_INPUT).expect("invalid hex");
        input[212] = 2;
        assert_eq!(
            Blake2F.run(&input),
            Err(VmError::Precompile("invalid final flag".to_string()))
        );

        input.pop();
        assert_eq!(Blake2F.required_energy(&input), 0);
        assert_eq!(
            Blake2F.run(&input),
            Err(VmError::Precompile("invalid input length".to_string()))
        );
    }
}
