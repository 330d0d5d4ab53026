//! CVM instruction handlers organized by category.
//!
//! Each submodule contains the handler functions for related opcodes. Handlers can assume the
//! interpreter already validated the stack and charged the energy for the instruction.

use alloy::primitives::{Address, B256, U256};

/// Arithmetic operations: ADD, MUL, SUB, DIV, SDIV, MOD, SMOD, ADDMOD, MULMOD, EXP, SIGNEXTEND
pub mod arithmetic;

/// Bitwise operations: AND, OR, XOR, NOT, BYTE, SHL, SHR, SAR
pub mod bitwise;

/// Block information: BLOCKHASH, COINBASE, TIMESTAMP, NUMBER, DIFFICULTY, ENERGYLIMIT
pub mod block;

/// Comparison operations: LT, GT, SLT, SGT, EQ, ISZERO
pub mod comparison;

/// Control flow: STOP, JUMP, JUMPI, JUMPDEST, PC, ENERGY and the subroutine instructions
pub mod control;

/// Cryptographic operations: SHA3
pub mod crypto;

/// Environment information: ADDRESS, BALANCE, CALLER, CALLVALUE, CALLDATALOAD, etc.
pub mod environment;

/// Logging operations: LOG0-LOG4
pub mod logging;

/// Memory operations: MLOAD, MSTORE, MSTORE8, MSIZE
pub mod memory;

/// Stack operations: POP, PUSH1-PUSH32, DUP1-DUP16, SWAP1-SWAP16
pub mod stack;

/// Storage operations: SLOAD, SSTORE
pub mod storage;

/// System operations: CREATE, CALL, CALLCODE, RETURN, DELEGATECALL, CREATE2, STATICCALL, REVERT,
/// SELFDESTRUCT
pub mod system;

/// The low 64 bits of a word. Callers only use it where the interpreter already checked the value
/// fits, or where truncation is the defined behavior.
#[inline]
pub(crate) fn low_u64(value: U256) -> u64 {
    value.as_limbs()[0]
}

/// The address held in the low 20 bytes of a word.
#[inline]
pub(crate) fn to_address(value: U256) -> Address {
    Address::from_word(to_word(value))
}

#[inline]
pub(crate) fn from_address(address: Address) -> U256 {
    U256::from_be_slice(address.as_slice())
}

#[inline]
pub(crate) fn to_word(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

#[inline]
pub(crate) fn from_word(word: B256) -> U256 {
    U256::from_be_bytes(word.0)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use alloy::primitives::{Address, B256, U256};

    use crate::core::{
        chains::ChainConfig,
        contract::Contract,
        hardfork::HardFork,
        memory::Memory,
        stack::{ReturnStack, Stack},
        state::MemoryState,
        vm::{can_transfer, transfer, BlockContext, Config, Cvm, Scope, TxContext},
    };

    /// A block context at `number` with deterministic block hashes.
    pub(crate) fn block_context<'a>(number: u64) -> BlockContext<'a> {
        BlockContext {
            can_transfer,
            transfer,
            get_hash: Box::new(|n| B256::from(U256::from(n).to_be_bytes::<32>())),
            coinbase: Address::repeat_byte(0xcb),
            energy_limit: 8_000_000,
            block_number: number,
            time: U256::from(1_600_000_000u64),
            difficulty: U256::from(131_072u64),
        }
    }

    /// An Istanbul engine over `state`.
    pub(crate) fn cvm(state: &mut MemoryState) -> Cvm<'_> {
        cvm_at(state, HardFork::Istanbul)
    }

    pub(crate) fn cvm_at(state: &mut MemoryState, fork: HardFork) -> Cvm<'_> {
        Cvm::new(
            block_context(1000),
            TxContext { origin: Address::repeat_byte(0x0a), energy_price: U256::from(1) },
            state,
            ChainConfig::at_hardfork(1, fork),
            Config::default(),
        )
    }

    /// A frame for `contract` with `items` on the stack, `items[0]` on top.
    pub(crate) fn scope<'c>(contract: &'c mut Contract, items: &[U256]) -> Scope<'c> {
        let mut stack = Stack::new();
        for item in items.iter().rev() {
            stack.push(*item);
        }
        Scope {
            memory: Memory::new(),
            stack,
            return_stack: ReturnStack::new(),
            contract,
            call_energy: 0,
        }
    }

    /// A frame of `energy` run by `0x0c` as `0xcc`.
    pub(crate) fn contract(energy: u64) -> Contract {
        Contract::new(Address::repeat_byte(0x0c), Address::repeat_byte(0xcc), U256::ZERO, energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_conversions() {
        let address = Address::repeat_byte(0x11);
        let word = from_address(address);
        assert_eq!(to_address(word), address);

        // the high 12 bytes are dropped
        assert_eq!(to_address(word | (U256::from(1) << 200)), address);
    }

    #[test]
    fn test_low_u64_truncates() {
        assert_eq!(low_u64(U256::from(7)), 7);
        assert_eq!(low_u64((U256::from(1) << 64) + U256::from(3)), 3);
    }
}
