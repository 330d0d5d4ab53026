//! Protocol parameters: energy costs, limits and well-known values.
//!
//! The values are consensus critical. Names follow the upgrade that introduced or repriced them.

use alloy::primitives::{b256, B256};

/// Keccak-256 of the empty byte string, the code hash of accounts without code.
pub const EMPTY_CODE_HASH: B256 =
    b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// Maximum depth of the operand stack.
pub const STACK_LIMIT: usize = 1024;
/// Maximum depth of the subroutine return stack.
pub const RETURN_STACK_LIMIT: usize = 1023;
/// Maximum depth of nested calls and creates.
pub const CALL_CREATE_DEPTH: usize = 1024;
/// Maximum size of deployed contract code.
pub const MAX_CODE_SIZE: usize = 24576;

// tiers
/// Cost of the quick tier.
pub const ENERGY_QUICK_STEP: u64 = 2;
/// Cost of the fastest tier.
pub const ENERGY_FASTEST_STEP: u64 = 3;
/// Cost of the fast tier.
pub const ENERGY_FAST_STEP: u64 = 5;
/// Cost of the mid tier.
pub const ENERGY_MID_STEP: u64 = 8;
/// Cost of the slow tier.
pub const ENERGY_SLOW_STEP: u64 = 10;
/// Cost of the ext tier.
pub const ENERGY_EXT_STEP: u64 = 20;

// transactions
/// Base cost of a transaction that is not a contract creation.
pub const TX_ENERGY: u64 = 21000;
/// Base cost of a contract creating transaction (Homestead onwards).
pub const TX_ENERGY_CONTRACT_CREATION: u64 = 53000;
/// Per byte cost of zero payload bytes.
pub const TX_DATA_ZERO_ENERGY: u64 = 4;
/// Per byte cost of non-zero payload bytes before CIP2028.
pub const TX_DATA_NON_ZERO_ENERGY_FRONTIER: u64 = 68;
/// Per byte cost of non-zero payload bytes after CIP2028.
pub const TX_DATA_NON_ZERO_ENERGY_CIP2028: u64 = 16;

// memory
/// Linear coefficient of memory expansion.
pub const MEMORY_ENERGY: u64 = 3;
/// Divisor of the quadratic memory expansion term.
pub const QUAD_COEFF_DIV: u64 = 512;
/// Per word cost of copy operations.
pub const COPY_ENERGY: u64 = 3;

// hashing and logging
/// Base cost of SHA3.
pub const SHA3_ENERGY: u64 = 30;
/// Per word cost of SHA3.
pub const SHA3_WORD_ENERGY: u64 = 6;
/// Base cost of a LOG operation.
pub const LOG_ENERGY: u64 = 375;
/// Per topic cost of a LOG operation.
pub const LOG_TOPIC_ENERGY: u64 = 375;
/// Per byte cost of LOG data.
pub const LOG_DATA_ENERGY: u64 = 8;

// exponentiation
/// Base cost of EXP.
pub const EXP_ENERGY: u64 = 10;
/// Per exponent byte cost of EXP before CIP158.
pub const EXP_BYTE_FRONTIER: u64 = 10;
/// Per exponent byte cost of EXP after CIP158.
pub const EXP_BYTE_CIP158: u64 = 50;

// calls
/// Energy handed to the callee for free when value is transferred.
pub const CALL_STIPEND: u64 = 2300;
/// Surcharge for calls transferring value.
pub const CALL_VALUE_TRANSFER_ENERGY: u64 = 9000;
/// Surcharge for calls that bring a new account into existence.
pub const CALL_NEW_ACCOUNT_ENERGY: u64 = 25000;
/// Base cost of CALL family instructions before CIP150.
pub const CALL_ENERGY_FRONTIER: u64 = 40;
/// Base cost of CALL family instructions after CIP150.
pub const CALL_ENERGY_CIP150: u64 = 700;

// account access
/// BALANCE before CIP150.
pub const BALANCE_ENERGY_FRONTIER: u64 = 20;
/// BALANCE after CIP150.
pub const BALANCE_ENERGY_CIP150: u64 = 400;
/// BALANCE after CIP1884.
pub const BALANCE_ENERGY_CIP1884: u64 = 700;
/// EXTCODESIZE before CIP150.
pub const EXTCODE_SIZE_ENERGY_FRONTIER: u64 = 20;
/// EXTCODESIZE after CIP150.
pub const EXTCODE_SIZE_ENERGY_CIP150: u64 = 700;
/// EXTCODECOPY base before CIP150.
pub const EXTCODE_COPY_BASE_FRONTIER: u64 = 20;
/// EXTCODECOPY base after CIP150.
pub const EXTCODE_COPY_BASE_CIP150: u64 = 700;
/// EXTCODEHASH in Constantinople.
pub const EXTCODE_HASH_ENERGY_CONSTANTINOPLE: u64 = 400;
/// EXTCODEHASH after CIP1884.
pub const EXTCODE_HASH_ENERGY_CIP1884: u64 = 700;
/// SLOAD before CIP150.
pub const SLOAD_ENERGY_FRONTIER: u64 = 50;
/// SLOAD after CIP150.
pub const SLOAD_ENERGY_CIP150: u64 = 200;
/// SLOAD after CIP1884.
pub const SLOAD_ENERGY_CIP1884: u64 = 800;
/// SLOAD after CIP2200.
pub const SLOAD_ENERGY_CIP2200: u64 = 800;
/// SELFBALANCE.
pub const SELF_BALANCE_ENERGY: u64 = ENERGY_FAST_STEP;

// storage, legacy metering
/// Setting a zero slot to non-zero.
pub const SSTORE_SET_ENERGY: u64 = 20000;
/// Changing a non-zero slot.
pub const SSTORE_RESET_ENERGY: u64 = 5000;
/// Clearing a non-zero slot.
pub const SSTORE_CLEAR_ENERGY: u64 = 5000;
/// Refund for clearing a non-zero slot.
pub const SSTORE_REFUND_ENERGY: u64 = 15000;

// storage, CIP1283 net metering
/// No-op write.
pub const NET_SSTORE_NOOP_ENERGY: u64 = 200;
/// Fresh slot initialisation.
pub const NET_SSTORE_INIT_ENERGY: u64 = 20000;
/// Clean slot modification.
pub const NET_SSTORE_CLEAN_ENERGY: u64 = 5000;
/// Dirty slot modification.
pub const NET_SSTORE_DIRTY_ENERGY: u64 = 200;
/// Refund for clearing a slot.
pub const NET_SSTORE_CLEAR_REFUND: u64 = 15000;
/// Refund for resetting a slot to its original non-zero value.
pub const NET_SSTORE_RESET_REFUND: u64 = 4800;
/// Refund for resetting a slot to its original zero value.
pub const NET_SSTORE_RESET_CLEAR_REFUND: u64 = 19800;

// storage, CIP2200 net metering
/// Minimum energy that must remain for SSTORE to proceed.
pub const SSTORE_SENTRY_ENERGY_CIP2200: u64 = 2300;
/// No-op write.
pub const SSTORE_NOOP_ENERGY_CIP2200: u64 = 800;
/// Dirty slot modification.
pub const SSTORE_DIRTY_ENERGY_CIP2200: u64 = 800;
/// Fresh slot initialisation.
pub const SSTORE_INIT_ENERGY_CIP2200: u64 = 20000;
/// Refund for resetting a slot to its original zero value.
pub const SSTORE_INIT_REFUND_CIP2200: u64 = 19200;
/// Clean slot modification.
pub const SSTORE_CLEAN_ENERGY_CIP2200: u64 = 5000;
/// Refund for resetting a slot to its original non-zero value.
pub const SSTORE_CLEAN_REFUND_CIP2200: u64 = 4200;
/// Refund for clearing a slot.
pub const SSTORE_CLEAR_REFUND_CIP2200: u64 = 15000;

// creation and destruction
/// Base cost of CREATE.
pub const CREATE_ENERGY: u64 = 32000;
/// Base cost of CREATE2.
pub const CREATE2_ENERGY: u64 = 32000;
/// Per byte cost of storing deployed code.
pub const CREATE_DATA_ENERGY: u64 = 200;
/// SELFDESTRUCT after CIP150.
pub const SELFDESTRUCT_ENERGY_CIP150: u64 = 5000;
/// Surcharge when SELFDESTRUCT brings the beneficiary into existence.
pub const CREATE_BY_SELFDESTRUCT_ENERGY: u64 = 25000;
/// Refund for the first SELFDESTRUCT of an account.
pub const SELFDESTRUCT_REFUND_ENERGY: u64 = 24000;
/// JUMPDEST.
pub const JUMPDEST_ENERGY: u64 = 1;

// precompiled contracts
/// ECRECOVER.
pub const ECRECOVER_ENERGY: u64 = 3000;
/// SHA256 base cost.
pub const SHA256_BASE_ENERGY: u64 = 60;
/// SHA256 per word cost.
pub const SHA256_PER_WORD_ENERGY: u64 = 12;
/// RIPEMD160 base cost.
pub const RIPEMD160_BASE_ENERGY: u64 = 600;
/// RIPEMD160 per word cost.
pub const RIPEMD160_PER_WORD_ENERGY: u64 = 120;
/// IDENTITY base cost.
pub const IDENTITY_BASE_ENERGY: u64 = 15;
/// IDENTITY per word cost.
pub const IDENTITY_PER_WORD_ENERGY: u64 = 3;
/// Divisor of the MODEXP complexity.
pub const MOD_EXP_QUAD_COEFF_DIV: u64 = 20;
/// Longest MODEXP base or modulus, in bytes. Longer operands cost more than 2^32 energy.
pub const MOD_EXP_MAX_OPERAND_LEN: u64 = 1 << 20;
/// Longest MODEXP exponent, in bytes.
pub const MOD_EXP_MAX_EXPONENT_LEN: u64 = 1 << 24;
/// BN256 point addition, Byzantium pricing.
pub const BN256_ADD_ENERGY_BYZANTIUM: u64 = 500;
/// BN256 point addition, Istanbul pricing.
pub const BN256_ADD_ENERGY_ISTANBUL: u64 = 150;
/// BN256 scalar multiplication, Byzantium pricing.
pub const BN256_SCALAR_MUL_ENERGY_BYZANTIUM: u64 = 40000;
/// BN256 scalar multiplication, Istanbul pricing.
pub const BN256_SCALAR_MUL_ENERGY_ISTANBUL: u64 = 6000;
/// BN256 pairing base cost, Byzantium pricing.
pub const BN256_PAIRING_BASE_ENERGY_BYZANTIUM: u64 = 100000;
/// BN256 pairing base cost, Istanbul pricing.
pub const BN256_PAIRING_BASE_ENERGY_ISTANBUL: u64 = 45000;
/// BN256 pairing per point cost, Byzantium pricing.
pub const BN256_PAIRING_PER_POINT_ENERGY_BYZANTIUM: u64 = 80000;
/// BN256 pairing per point cost, Istanbul pricing.
pub const BN256_PAIRING_PER_POINT_ENERGY_ISTANBUL: u64 = 34000;
/// BLAKE2F per round cost.
pub const BLAKE2F_ROUND_ENERGY: u64 = 1;
