use alloy::primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

/// The [`Log`] struct represents a log emitted by a `LOG0-LOG4` opcode.
///
/// The interpreter fills in the emitting address, topics, data and block number; the state
/// accessor stamps the transaction and block context when the log is recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Address of the contract that emitted the log.
    pub address: Address,
    /// Indexed topics, at most four.
    pub topics: Vec<B256>,
    /// Unindexed payload.
    pub data: Bytes,
    /// Number of the block containing the transaction.
    pub block_number: u64,
    /// Hash of the emitting transaction.
    pub tx_hash: B256,
    /// Index of the emitting transaction in its block.
    pub tx_index: usize,
    /// Hash of the block containing the transaction.
    pub block_hash: B256,
    /// Index of the log within the block.
    pub index: usize,
}

impl Log {
    /// Creates a new [`Log`] with the given address, topics, data and block number.
    pub fn new(address: Address, topics: Vec<B256>, data: &[u8], block_number: u64) -> Log {
        Log {
            address,
            topics,
            data: Bytes::copy_from_slice(data),
            block_number,
            ..Default::default()
        }
    }
}
