use alloy::primitives::Address;
use cvm_vm::core::{
    chains::ChainConfig,
    log::Log,
    state::BlockState,
    vm::{Config, Cvm, TxContext},
};
use tracing::{debug, trace};

use crate::{
    chain::{new_block_context, ChainContext},
    energy_pool::EnergyPool,
    error::Error,
    state_transition::apply_message,
    types::{logs_bloom, Block, Header, Receipt, Transaction},
};

/// Everything a processed block produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// One receipt per transaction, in block order.
    pub receipts: Vec<Receipt>,
    /// Every log of the block.
    pub logs: Vec<Log>,
    /// Energy used by the whole block.
    pub energy_used: u64,
}

/// The [`StateProcessor`] applies the transactions of a block to a state, one after another, and
/// hands the result to the consensus engine for finalisation.
pub struct StateProcessor<'a> {
    config: ChainConfig,
    chain: &'a dyn ChainContext,
}

impl std::fmt::Debug for StateProcessor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateProcessor").field("config", &self.config).finish_non_exhaustive()
    }
}

impl<'a> StateProcessor<'a> {
    /// Creates a processor for blocks of `chain`.
    pub fn new(config: ChainConfig, chain: &'a dyn ChainContext) -> Self {
        Self { config, chain }
    }

    /// Applies every transaction of `block` to `state`.
    ///
    /// The first transaction that fails aborts the whole block; the state is left wherever that
    /// transaction stopped and must be discarded by the caller.
    pub fn process<S: BlockState>(
        &self,
        block: &Block,
        state: &mut S,
        cfg: &Config,
    ) -> Result<ProcessOutput, Error> {
        let header = &block.header;
        let block_hash = block.hash();
        let mut pool = EnergyPool::new(block.energy_limit());
        let mut output = ProcessOutput::default();

        for (index, tx) in block.transactions.iter().enumerate() {
            let tx_hash = tx.hash();
            state.prepare(tx_hash, block_hash, index);

            let mut receipt = apply_transaction(
                &self.config,
                self.chain,
                None,
                &mut pool,
                state,
                header,
                tx,
                &mut output.energy_used,
                cfg,
            )
            .map_err(|e| Error::ApplyTransaction { index, hash: tx_hash, source: Box::new(e) })?;

            receipt.transaction_index = index;
            output.logs.extend(receipt.logs.iter().cloned());
            output.receipts.push(receipt);
        }

        self.chain.engine().finalize(
            self.chain,
            header,
            state,
            &block.transactions,
            &block.uncles,
        );

        debug!(
            number = header.number,
            txs = block.transactions.len(),
            energy_used = output.energy_used,
            logs = output.logs.len(),
            "processed block"
        );
        Ok(output)
    }
}

/// Applies `tx` to `state` and builds its receipt.
///
/// `used_energy` accumulates the energy used by the block so far. The receipt's transaction index
/// is left to the caller, which owns the iteration over the block.
#[allow(clippy::too_many_arguments)]
pub fn apply_transaction<S: BlockState>(
    config: &ChainConfig,
    chain: &dyn ChainContext,
    author: Option<Address>,
    pool: &mut EnergyPool,
    state: &mut S,
    header: &Header,
    tx: &Transaction,
    used_energy: &mut u64,
    cfg: &Config,
) -> Result<Receipt, Error> {
    let msg = tx.as_message();
    let tx_hash = tx.hash();

    let context = new_block_context(header, chain, author);
    let tx_context = TxContext { origin: msg.from, energy_price: msg.energy_price };
    let result = {
        let mut cvm = Cvm::new(context, tx_context, &mut *state, config.clone(), cfg.clone());
        apply_message(&mut cvm, &msg, pool)?
    };

    let root = if config.is_byzantium(header.number) {
        state.finalise(true);
        None
    } else {
        Some(state.intermediate_root(config.is_cip158(header.number)))
    };
    *used_energy += result.used_energy;

    let mut receipt = Receipt::new(root, result.failed(), *used_energy);
    receipt.tx_hash = tx_hash;
    receipt.energy_used = result.used_energy;
    if msg.is_create() {
        receipt.contract_address = Some(msg.from.create(tx.nonce));
    }
    receipt.logs = state.logs(tx_hash);
    receipt.bloom = logs_bloom(&receipt.logs);
    receipt.block_hash = header.hash();
    receipt.block_number = header.number;

    trace!(%tx_hash, used = result.used_energy, err = ?result.err, "applied transaction");
    Ok(receipt)
}
