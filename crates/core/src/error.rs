use alloy::primitives::{Address, B256, U256};

/// Error type for the Core module
///
/// Every variant except [`Error::Consensus`] aborts a transaction before it touched the state.
/// The block processor wraps them in [`Error::ApplyTransaction`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The sender's nonce is behind the transaction's
    #[error("nonce too high: address {address}, tx: {tx} state: {state}")]
    NonceTooHigh {
        /// The sender
        address: Address,
        /// Nonce of the transaction
        tx: u64,
        /// Nonce of the sender's account
        state: u64,
    },
    /// The sender's nonce is ahead of the transaction's
    #[error("nonce too low: address {address}, tx: {tx} state: {state}")]
    NonceTooLow {
        /// The sender
        address: Address,
        /// Nonce of the transaction
        tx: u64,
        /// Nonce of the sender's account
        state: u64,
    },
    /// The sender cannot pay for the energy it asks for
    #[error("insufficient funds for energy * price + value: address {address} have {have} want {want}")]
    InsufficientFunds {
        /// The sender
        address: Address,
        /// Balance of the sender
        have: U256,
        /// Cost of the energy
        want: U256,
    },
    /// The sender cannot pay the value of the topmost call
    #[error("insufficient funds for transfer: address {0}")]
    InsufficientFundsForTransfer(Address),
    /// The energy limit does not cover the intrinsic cost
    #[error("intrinsic energy too low: have {have}, want {want}")]
    IntrinsicEnergy {
        /// Energy bought by the transaction
        have: u64,
        /// Intrinsic cost of the transaction
        want: u64,
    },
    /// The block's energy pool cannot cover the transaction
    #[error("energy limit reached")]
    EnergyLimitReached,
    /// An energy computation overflowed 64 bits
    #[error("energy uint64 overflow")]
    EnergyUintOverflow,
    /// The consensus engine rejected something
    #[error("consensus error: {0}")]
    Consensus(String),
    /// A transaction of a block failed to apply
    #[error("could not apply tx {index} [{hash}]: {source}")]
    ApplyTransaction {
        /// Position of the transaction in the block
        index: usize,
        /// Hash of the transaction
        hash: B256,
        /// Why it failed
        source: Box<Error>,
    },
}
