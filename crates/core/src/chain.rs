use alloy::primitives::{Address, B256, U256};
use cvm_vm::core::{
    state::BlockState,
    vm::{can_transfer, transfer, BlockContext},
};

use crate::{
    error::Error,
    types::{Block, Header, Transaction},
};

/// A consensus engine. Only [`Engine::finalize`] is invoked by block processing; the remaining
/// hooks serve the block validation around it.
pub trait Engine {
    /// The account rewarded for sealing `header`.
    fn author(&self, header: &Header) -> Result<Address, Error>;

    /// Checks the uncles of `block` against the consensus rules.
    fn verify_uncles(&self, chain: &dyn ChainContext, block: &Block) -> Result<(), Error>;

    /// The difficulty of a block sealed at `time` on top of `parent`.
    fn calc_difficulty(&self, chain: &dyn ChainContext, time: u64, parent: &Header) -> U256;

    /// Runs after every transaction of the block was applied, e.g. to pay mining rewards.
    fn finalize(
        &self,
        chain: &dyn ChainContext,
        header: &Header,
        state: &mut dyn BlockState,
        txs: &[Transaction],
        uncles: &[Header],
    );
}

/// Read access to the chain a block is processed against.
pub trait ChainContext {
    /// The consensus engine of the chain.
    fn engine(&self) -> &dyn Engine;

    /// Looks up a header by hash and number.
    fn get_header(&self, hash: B256, number: u64) -> Option<Header>;
}

/// Returns a BLOCKHASH resolver for the block on top of `header`'s parent.
///
/// Hashes are found by walking back through parent hashes, and every hash seen on the way is
/// cached so that later lookups resume where the last one stopped.
pub fn get_hash_fn<'a>(
    header: &Header,
    chain: &'a dyn ChainContext,
) -> impl FnMut(u64) -> B256 + 'a {
    let number = header.number;
    let parent_hash = header.parent_hash;
    // cache[i] is the hash of block `number - 1 - i`
    let mut cache: Vec<B256> = Vec::new();

    move |n| {
        if n >= number {
            return B256::ZERO;
        }
        if cache.is_empty() {
            cache.push(parent_hash);
        }
        if let Some(hash) = cache.get((number - n - 1) as usize) {
            return *hash;
        }

        let mut last_hash = cache[cache.len() - 1];
        let mut last_number = number - cache.len() as u64;
        while let Some(header) = chain.get_header(last_hash, last_number) {
            let Some(parent_number) = header.number.checked_sub(1) else {
                break;
            };
            cache.push(header.parent_hash);
            last_hash = header.parent_hash;
            last_number = parent_number;
            if n == last_number {
                return last_hash;
            }
        }
        B256::ZERO
    }
}

/// Builds the [`BlockContext`] transactions of the block described by `header` execute in.
///
/// Without an explicit `author`, the block beneficiary is taken from the consensus engine.
pub fn new_block_context<'a>(
    header: &Header,
    chain: &'a dyn ChainContext,
    author: Option<Address>,
) -> BlockContext<'a> {
    let coinbase = author.unwrap_or_else(|| chain.engine().author(header).unwrap_or_default());

    BlockContext {
        can_transfer,
        transfer,
        get_hash: Box::new(get_hash_fn(header, chain)),
        coinbase,
        energy_limit: header.energy_limit,
        block_number: header.number,
        time: U256::from(header.time),
        difficulty: header.difficulty,
    }
}
