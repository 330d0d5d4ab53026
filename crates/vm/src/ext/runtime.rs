//! Run code without a block or a chain around it.
//!
//! Every helper builds a one-off [`Cvm`] from a [`RuntimeConfig`]. The state lives in the config,
//! so it can be seeded before a run and inspected after it.

use std::{
    sync::{atomic::AtomicBool, Arc},
    time::{SystemTime, UNIX_EPOCH},
};

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use tracing::trace;

use crate::core::{
    chains::ChainConfig,
    state::{MemoryState, StateDb},
    tracer::Tracer,
    vm::{can_transfer, transfer, BlockContext, CallOutcome, Config, CreateOutcome, Cvm, TxContext},
};

/// Environment for the runtime helpers.
pub struct RuntimeConfig<'a> {
    /// Chain the code runs on.
    pub chain_config: ChainConfig,
    /// Block difficulty.
    pub difficulty: U256,
    /// Sender of the message, and transaction origin.
    pub origin: Address,
    /// Block beneficiary.
    pub coinbase: Address,
    /// Block number.
    pub block_number: u64,
    /// Block timestamp.
    pub time: U256,
    /// Energy given to the message, and the block energy limit.
    pub energy_limit: u64,
    /// Energy price of the transaction.
    pub energy_price: U256,
    /// Value sent with the message.
    pub value: U256,
    /// Engine options. Debug mode is switched on when a tracer is set.
    pub cvm_config: Config,
    /// State the message runs against.
    pub state: MemoryState,
    /// Tracer receiving every step.
    pub tracer: Option<&'a mut dyn Tracer>,
    /// Cancels the run when set, from any thread.
    pub abort: Arc<AtomicBool>,
}

impl Default for RuntimeConfig<'_> {
    fn default() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();

        Self {
            chain_config: ChainConfig::all_protocol_changes(),
            difficulty: U256::ZERO,
            origin: Address::ZERO,
            coinbase: Address::ZERO,
            block_number: 0,
            time: U256::from(now),
            energy_limit: u64::MAX,
            energy_price: U256::ZERO,
            value: U256::ZERO,
            cvm_config: Config::default(),
            state: MemoryState::new(),
            tracer: None,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl std::fmt::Debug for RuntimeConfig<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("chain_config", &self.chain_config)
            .field("origin", &self.origin)
            .field("block_number", &self.block_number)
            .field("energy_limit", &self.energy_limit)
            .field("value", &self.value)
            .field("tracing", &self.tracer.is_some())
            .finish_non_exhaustive()
    }
}

/// The address [`execute`] installs its code at.
pub fn contract_address() -> Address {
    Address::left_padding_from(b"contract")
}

/// Block hashes for the runtime: the keccak of the block number in decimal.
fn fake_hash(number: u64) -> B256 {
    keccak256(number.to_string())
}

fn new_cvm<'b>(cfg: &'b mut RuntimeConfig<'_>) -> Cvm<'b> {
    let context = BlockContext {
        can_transfer,
        transfer,
        get_hash: Box::new(fake_hash),
        coinbase: cfg.coinbase,
        energy_limit: cfg.energy_limit,
        block_number: cfg.block_number,
        time: cfg.time,
        difficulty: cfg.difficulty,
    };
    let tx = TxContext { origin: cfg.origin, energy_price: cfg.energy_price };

    let mut config = cfg.cvm_config.clone();
    config.debug |= cfg.tracer.is_some();

    let cvm = Cvm::new(context, tx, &mut cfg.state, cfg.chain_config.clone(), config)
        .with_cancel_handle(Arc::clone(&cfg.abort));
    match cfg.tracer.as_deref_mut() {
        Some(tracer) => cvm.with_tracer(tracer),
        None => cvm,
    }
}

/// Installs `code` at [`contract_address`] and calls it with `input`.
///
/// ```
/// use cvm_vm::ext::runtime::{execute, RuntimeConfig};
///
/// // PUSH1 0x2a PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
/// let code = [0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];
/// let outcome = execute(&code, &[], &mut RuntimeConfig::default());
/// assert!(outcome.is_success());
/// assert_eq!(outcome.output[31], 0x2a);
/// ```
pub fn execute(code: &[u8], input: &[u8], cfg: &mut RuntimeConfig<'_>) -> CallOutcome {
    let address = contract_address();
    cfg.state.create_account(address);
    cfg.state.set_code(address, Bytes::copy_from_slice(code));

    trace!(code_size = code.len(), input_size = input.len(), "executing code");
    let (origin, energy, value) = (cfg.origin, cfg.energy_limit, cfg.value);
    new_cvm(cfg).call(origin, address, Bytes::copy_from_slice(input), energy, value)
}

/// Runs `init_code` as a contract creation from the configured origin.
pub fn create(init_code: &[u8], cfg: &mut RuntimeConfig<'_>) -> CreateOutcome {
    trace!(code_size = init_code.len(), "creating contract");
    let (origin, energy, value) = (cfg.origin, cfg.energy_limit, cfg.value);
    new_cvm(cfg).create(origin, Bytes::copy_from_slice(init_code), energy, value)
}

/// Calls an account that already exists in the configured state.
pub fn call(address: Address, input: &[u8], cfg: &mut RuntimeConfig<'_>) -> CallOutcome {
    trace!(%address, input_size = input.len(), "calling contract");
    let (origin, energy, value) = (cfg.origin, cfg.energy_limit, cfg.value);
    new_cvm(cfg).call(origin, address, Bytes::copy_from_slice(input), energy, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        errors::VmError,
        tracer::{LogConfig, StructLogger},
    };

    /// Init code deploying the ten bytes of `PUSH1 0x2a ... RETURN`.
    fn deployer() -> Vec<u8> {
        let runtime = [0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];
        // PUSH10 <runtime> PUSH1 0 MSTORE PUSH1 10 PUSH1 22 RETURN
        let mut code = vec![0x69];
        code.extend_from_slice(&runtime);
        code.extend_from_slice(&[0x60, 0x00, 0x52, 0x60, 0x0a, 0x60, 0x16, 0xf3]);
        code
    }

    #[test]
    fn test_create_then_call() {
        let mut cfg = RuntimeConfig { energy_limit: 1_000_000, ..Default::default() };

        let created = create(&deployer(), &mut cfg);
        assert!(created.is_success(), "create failed: {:?}", created.error);
        assert_eq!(created.output.len(), 10);
        assert_eq!(cfg.state.get_code(created.address), created.output);

        let called = call(created.address, &[], &mut cfg);
        assert!(called.is_success());
        assert_eq!(U256::from_be_slice(&called.output), U256::from(0x2a));
        // four PUSH1, MSTORE and one word of memory
        assert_eq!(called.energy_left, 1_000_000 - 18);
    }

    #[test]
    fn test_execute_reports_invalid_opcode() {
        let mut cfg = RuntimeConfig { energy_limit: 100_000, ..Default::default() };
        let outcome = execute(&[0x0c], &[], &mut cfg);
        assert!(!outcome.is_success());
        assert_eq!(outcome.energy_left, 0);
    }

    #[test]
    fn test_modexp_with_unbounded_exponent_length_fails() {
        let mut input = vec![0u8; 96];
        input[31] = 1;
        input[32..64].fill(0xff);
        input[95] = 1;
        input.extend_from_slice(&[0x02, 0x03]);

        let outcome = call(Address::with_last_byte(0x05), &input, &mut RuntimeConfig::default());
        assert!(matches!(outcome.error, Some(VmError::Precompile(_))));
        assert_eq!(outcome.energy_left, 0);
    }

    #[test]
    fn test_execute_stops_when_aborted() {
        let abort = Arc::new(AtomicBool::new(true));
        let mut cfg = RuntimeConfig {
            energy_limit: 100_000,
            abort: Arc::clone(&abort),
            ..Default::default()
        };
        // JUMPDEST PUSH1 0 JUMP
        let outcome = execute(&[0x5b, 0x60, 0x00, 0x56], &[], &mut cfg);

        assert!(outcome.is_success());
        assert!(outcome.output.is_empty());
        assert!(outcome.energy_left > 0 && outcome.energy_left < 100_000);
    }

    #[test]
    fn test_execute_with_struct_logger() {
        let mut logger = StructLogger::new(LogConfig::default());
        {
            let mut cfg = RuntimeConfig {
                energy_limit: 100_000,
                tracer: Some(&mut logger),
                ..Default::default()
            };
            // PUSH1 1 PUSH1 2 ADD STOP
            let outcome = execute(&[0x60, 0x01, 0x60, 0x02, 0x01, 0x00], &[], &mut cfg);
            assert!(outcome.is_success());
        }

        let ops: Vec<&str> = logger.struct_logs().iter().map(|log| log.op_name()).collect();
        assert_eq!(ops, vec!["PUSH1", "PUSH1", "ADD", "STOP"]);
        assert_eq!(logger.struct_logs()[3].stack, vec![U256::from(3)]);
        assert_eq!(logger.energy_used(), 9);
    }
}
