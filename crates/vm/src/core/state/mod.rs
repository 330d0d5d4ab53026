//! The state accessor consumed by the engine, and an in-memory implementation of it.

mod journal;
mod memory;

pub use memory::{Account, MemoryState};

use alloy::primitives::{Address, Bytes, B256, U256};

use super::log::Log;

/// Read/write access to the world state during execution.
///
/// Every mutation made through this trait can be undone with [`StateDb::revert_to_snapshot`].
/// Snapshots nest: reverting an inner snapshot never undoes mutations made before it was taken.
pub trait StateDb {
    /// Creates a fresh account at `address`, keeping the balance of any account it replaces.
    fn create_account(&mut self, address: Address);

    /// Subtracts `amount` from the balance of `address`.
    fn sub_balance(&mut self, address: Address, amount: U256);
    /// Adds `amount` to the balance of `address`. Adding zero still touches the account.
    fn add_balance(&mut self, address: Address, amount: U256);
    /// Returns the balance of `address`, zero if it does not exist.
    fn get_balance(&self, address: Address) -> U256;

    /// Returns the nonce of `address`.
    fn get_nonce(&self, address: Address) -> u64;
    /// Sets the nonce of `address`.
    fn set_nonce(&mut self, address: Address, nonce: u64);

    /// Returns the code hash of `address`, or zero if the account does not exist.
    fn get_code_hash(&self, address: Address) -> B256;
    /// Returns the code of `address`.
    fn get_code(&self, address: Address) -> Bytes;
    /// Replaces the code of `address`.
    fn set_code(&mut self, address: Address, code: Bytes);
    /// Returns the length of the code of `address`.
    fn get_code_size(&self, address: Address) -> usize;

    /// Adds to the refund counter.
    fn add_refund(&mut self, energy: u64);
    /// Subtracts from the refund counter. Going below zero is a bug in the caller.
    fn sub_refund(&mut self, energy: u64);
    /// Returns the refund counter.
    fn get_refund(&self) -> u64;

    /// Returns the value of a slot as of the start of the current transaction.
    fn get_committed_state(&self, address: Address, key: B256) -> B256;
    /// Returns the live value of a slot.
    fn get_state(&self, address: Address, key: B256) -> B256;
    /// Sets the live value of a slot.
    fn set_state(&mut self, address: Address, key: B256, value: B256);

    /// Marks `address` as self-destructed and clears its balance. Returns false if the account
    /// does not exist.
    fn suicide(&mut self, address: Address) -> bool;
    /// Whether `address` was self-destructed in the current transaction.
    fn has_suicided(&self, address: Address) -> bool;

    /// Whether an account exists at `address`. Self-destructed accounts exist until finalised.
    fn exist(&self, address: Address) -> bool;
    /// Whether `address` is empty: zero nonce, zero balance and no code. Missing accounts are
    /// empty.
    fn empty(&self, address: Address) -> bool;

    /// Undoes every mutation made since the snapshot `id` was taken.
    fn revert_to_snapshot(&mut self, id: usize);
    /// Takes a snapshot of the current mutation history.
    fn snapshot(&mut self) -> usize;

    /// Records a log against the current transaction.
    fn add_log(&mut self, log: Log);
    /// Records the preimage of a SHA3 result.
    fn add_preimage(&mut self, hash: B256, preimage: Bytes);

    /// Calls `f` for each non-zero slot of `address` until it returns false.
    fn for_each_storage(&self, address: Address, f: &mut dyn FnMut(B256, B256) -> bool);
}

/// The extra state operations the block processor needs around each transaction.
pub trait BlockState: StateDb {
    /// Sets the transaction hash, block hash and transaction index attached to new logs.
    fn prepare(&mut self, tx_hash: B256, block_hash: B256, tx_index: usize);

    /// Returns the logs recorded for `tx_hash`.
    fn logs(&self, tx_hash: B256) -> Vec<Log>;

    /// Ends a transaction: removes self-destructed accounts, and touched empty accounts when
    /// `delete_empty` is set, then makes the live storage the new committed storage.
    fn finalise(&mut self, delete_empty: bool);

    /// Finalises and returns a commitment to the whole state.
    fn intermediate_root(&mut self, delete_empty: bool) -> B256;
}
