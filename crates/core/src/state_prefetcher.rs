use std::sync::atomic::{AtomicBool, Ordering};

use cvm_vm::core::{
    chains::ChainConfig,
    state::BlockState,
    vm::{Config, Cvm, TxContext},
};
use tracing::trace;

use crate::{
    chain::{new_block_context, ChainContext},
    energy_pool::EnergyPool,
    state_transition::apply_message,
    types::Block,
};

/// The [`StatePrefetcher`] runs a block's transactions against a throwaway state so that the
/// state backend caches whatever the canonical run will read.
///
/// Its results are discarded and its errors ignored.
pub struct StatePrefetcher<'a> {
    config: ChainConfig,
    chain: &'a dyn ChainContext,
}

impl std::fmt::Debug for StatePrefetcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatePrefetcher").field("config", &self.config).finish_non_exhaustive()
    }
}

impl<'a> StatePrefetcher<'a> {
    /// Creates a prefetcher for blocks of `chain`.
    pub fn new(config: ChainConfig, chain: &'a dyn ChainContext) -> Self {
        Self { config, chain }
    }

    /// Executes the transactions of `block` on `state` until one fails or `interrupt` is set.
    ///
    /// Returns how many transactions ran to completion.
    pub fn prefetch<S: BlockState>(
        &self,
        block: &Block,
        state: &mut S,
        cfg: &Config,
        interrupt: &AtomicBool,
    ) -> usize {
        let header = &block.header;
        let block_hash = block.hash();
        let byzantium = self.config.is_byzantium(header.number);
        let mut pool = EnergyPool::new(block.energy_limit());

        let mut done = 0;
        for (index, tx) in block.transactions.iter().enumerate() {
            if interrupt.load(Ordering::Relaxed) {
                trace!(number = header.number, done, "prefetch interrupted");
                return done;
            }
            state.prepare(tx.hash(), block_hash, index);

            let msg = tx.as_message();
            let context = new_block_context(header, self.chain, None);
            let tx_context = TxContext { origin: msg.from, energy_price: msg.energy_price };
            let result = {
                let config = self.config.clone();
                let mut cvm = Cvm::new(context, tx_context, &mut *state, config, cfg.clone());
                apply_message(&mut cvm, &msg, &mut pool)
            };
            if result.is_err() {
                return done;
            }
            done += 1;

            if !byzantium {
                state.intermediate_root(true);
            }
        }
        if byzantium {
            state.intermediate_root(true);
        }
        done
    }
}
