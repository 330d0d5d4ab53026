use alloy::primitives::{Address, Bytes, B256, U256};
use bitvec::vec::BitVec;

use super::opcodes::{push_size, BEGINSUB, JUMPDEST};

/// Builds a bitmap over `code` where a set bit marks a byte that is an instruction rather than
/// PUSH immediate data.
///
/// ```
/// use cvm_vm::core::contract::code_bitmap;
///
/// // PUSH2 0x5b5b JUMPDEST
/// let bits = code_bitmap(&[0x61, 0x5b, 0x5b, 0x5b]);
/// assert!(bits[0] && !bits[1] && !bits[2] && bits[3]);
/// ```
pub fn code_bitmap(code: &[u8]) -> BitVec {
    let mut bits = BitVec::repeat(false, code.len());
    let mut pc = 0;
    while pc < code.len() {
        bits.set(pc, true);
        pc += 1 + push_size(code[pc]);
    }
    bits
}

/// A [`Contract`] is the code being run by a single call frame, along with the identities and
/// energy budget of that frame.
#[derive(Clone, Debug)]
pub struct Contract {
    /// The address that is reported by CALLER. For delegate calls this is inherited.
    pub caller_address: Address,

    /// The account whose storage and balance the code operates on.
    address: Address,

    /// Lazily computed instruction bitmap.
    analysis: Option<BitVec>,

    /// The code being executed.
    pub code: Bytes,

    /// The hash of `code`.
    pub code_hash: B256,

    /// The account the code was loaded from, if any. Differs from `address` for CALLCODE and
    /// DELEGATECALL frames.
    pub code_address: Option<Address>,

    /// The call input.
    pub input: Bytes,

    /// The remaining energy of this frame.
    pub energy: u64,

    value: U256,
}

impl Contract {
    /// Creates a new frame run by `caller` against `address`.
    pub fn new(caller: Address, address: Address, value: U256, energy: u64) -> Self {
        Self {
            caller_address: caller,
            address,
            analysis: None,
            code: Bytes::new(),
            code_hash: B256::ZERO,
            code_address: None,
            input: Bytes::new(),
            energy,
            value,
        }
    }

    /// Turns this frame into a delegate frame, inheriting the caller and value of `parent`.
    pub fn as_delegate(mut self, parent: &Contract) -> Self {
        self.caller_address = parent.caller_address;
        self.value = parent.value;
        self
    }

    /// Installs the code to run, with its hash and the account it came from.
    pub fn set_call_code(&mut self, address: Option<Address>, hash: B256, code: Bytes) {
        self.code = code;
        self.code_hash = hash;
        self.code_address = address;
        self.analysis = None;
    }

    /// The account this frame executes as.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The caller reported by CALLER.
    pub fn caller(&self) -> Address {
        self.caller_address
    }

    /// The value reported by CALLVALUE.
    pub fn value(&self) -> U256 {
        self.value
    }

    /// Returns the opcode at `n`, or STOP past the end of the code.
    pub fn get_op(&self, n: u64) -> u8 {
        usize::try_from(n).ok().and_then(|n| self.code.get(n).copied()).unwrap_or(0)
    }

    /// Deducts `energy` from the frame, returning false if not enough is left.
    pub fn use_energy(&mut self, energy: u64) -> bool {
        if self.energy < energy {
            return false;
        }
        self.energy -= energy;
        true
    }

    /// Whether `dest` is a JUMPDEST that is not inside PUSH data.
    pub fn valid_jumpdest(&mut self, dest: U256) -> bool {
        match usize::try_from(dest) {
            Ok(dest) if dest < self.code.len() && self.code[dest] == JUMPDEST => self.is_code(dest),
            _ => false,
        }
    }

    /// Whether `dest` is a BEGINSUB that is not inside PUSH data.
    pub fn valid_jump_subdest(&mut self, dest: u64) -> bool {
        match usize::try_from(dest) {
            Ok(dest) if dest < self.code.len() && self.code[dest] == BEGINSUB => self.is_code(dest),
            _ => false,
        }
    }

    fn is_code(&mut self, pos: usize) -> bool {
        let code = &self.code;
        let bits = self.analysis.get_or_insert_with(|| code_bitmap(code));
        bits.get(pos).map(|b| *b).unwrap_or(false)
    }
}
