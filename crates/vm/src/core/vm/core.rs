use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use tracing::{debug, error};

use super::{
    super::{
        chains::{ChainConfig, Rules},
        constants::{CALL_CREATE_DEPTH, CREATE_DATA_ENERGY, EMPTY_CODE_HASH, MAX_CODE_SIZE},
        contract::Contract,
        errors::VmError,
        precompiles::{precompile, run_precompiled_contract},
        state::StateDb,
        tracer::Tracer,
    },
    execution::Exit,
    jump_table::{enable_cip, instruction_set, JumpTable},
};

/// Checks whether `address` can afford to send `amount`.
pub type CanTransferFn = fn(&dyn StateDb, Address, U256) -> bool;

/// Moves `amount` from `sender` to `recipient`.
pub type TransferFn = fn(&mut dyn StateDb, Address, Address, U256);

/// The default [`CanTransferFn`]: a plain balance check.
pub fn can_transfer(state: &dyn StateDb, address: Address, amount: U256) -> bool {
    state.get_balance(address) >= amount
}

/// The default [`TransferFn`].
pub fn transfer(state: &mut dyn StateDb, sender: Address, recipient: Address, amount: U256) {
    state.sub_balance(sender, amount);
    state.add_balance(recipient, amount);
}

/// Block level facts, fixed for every call made while executing a block.
pub struct BlockContext<'a> {
    /// Balance check used before any value transfer.
    pub can_transfer: CanTransferFn,
    /// Value transfer primitive.
    pub transfer: TransferFn,
    /// Resolves BLOCKHASH. Only asked about the 256 most recent blocks.
    pub get_hash: Box<dyn FnMut(u64) -> B256 + 'a>,

    /// COINBASE.
    pub coinbase: Address,
    /// ENERGYLIMIT.
    pub energy_limit: u64,
    /// NUMBER.
    pub block_number: u64,
    /// TIMESTAMP.
    pub time: U256,
    /// DIFFICULTY.
    pub difficulty: U256,
}

impl fmt::Debug for BlockContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockContext")
            .field("coinbase", &self.coinbase)
            .field("energy_limit", &self.energy_limit)
            .field("block_number", &self.block_number)
            .field("time", &self.time)
            .field("difficulty", &self.difficulty)
            .finish_non_exhaustive()
    }
}

/// Transaction level facts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxContext {
    /// ORIGIN.
    pub origin: Address,
    /// ENERGYPRICE.
    pub energy_price: U256,
}

/// Engine options.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Reports every step to the tracer, if one is attached.
    pub debug: bool,
    /// Refuses to run nested calls and creates. Only the topmost frame executes.
    pub no_recursion: bool,
    /// Hands SHA3 preimages to the state.
    pub enable_preimage_recording: bool,
    /// CIPs to activate on top of the chain's instruction set. CIPs that fail to activate are
    /// dropped from this list.
    pub extra_cips: Vec<u32>,
}

/// The outcome of a message call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallOutcome {
    /// The returned bytes. Holds the revert reason when `error` is a revert.
    pub output: Bytes,
    /// Energy handed back to the caller.
    pub energy_left: u64,
    /// Why the call failed, if it did.
    pub error: Option<VmError>,
}

impl CallOutcome {
    fn new(output: Bytes, energy_left: u64, error: Option<VmError>) -> Self {
        Self { output, energy_left, error }
    }

    fn failed(energy_left: u64, error: VmError) -> Self {
        Self::new(Bytes::new(), energy_left, Some(error))
    }

    /// Whether the call completed without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// The outcome of a contract creation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateOutcome {
    /// The init code's output. Holds the revert reason when `error` is a revert.
    pub output: Bytes,
    /// The address of the new contract, zero when the creation was rejected up front.
    pub address: Address,
    /// Energy handed back to the creator.
    pub energy_left: u64,
    /// Why the creation failed, if it did.
    pub error: Option<VmError>,
}

impl CreateOutcome {
    /// Whether the contract was deployed.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Splits a frame's exit into its output and error, the way callers observe it.
fn into_parts(result: Result<Exit, VmError>) -> (Bytes, Option<VmError>) {
    match result {
        Ok(Exit::Return(output)) => (output, None),
        Ok(Exit::Revert(output)) => (output, Some(VmError::ExecutionReverted)),
        Err(err) => (Bytes::new(), Some(err)),
    }
}

/// The [`Cvm`] executes messages against a [`StateDb`].
///
/// One engine serves a single transaction (or a single synthetic call), including every nested
/// call and create it makes. It is not safe for concurrent use, but it can be cancelled from
/// another thread through [`Cvm::cancel_handle`].
pub struct Cvm<'a> {
    /// Block level facts.
    pub context: BlockContext<'a>,
    /// Transaction level facts.
    pub tx: TxContext,
    /// The state every frame reads and writes.
    pub state: &'a mut dyn StateDb,
    /// Engine options.
    pub config: Config,

    chain_config: ChainConfig,
    pub(crate) rules: Rules,
    pub(crate) table: Arc<JumpTable>,

    /// Current call depth. The topmost frame runs at depth 1.
    pub(crate) depth: usize,
    /// Set while a STATICCALL frame or any frame below it runs.
    pub(crate) read_only: bool,
    /// Output of the last call made by the running frame.
    pub(crate) return_data: Bytes,
    pub(crate) tracer: Option<&'a mut dyn Tracer>,
    pub(crate) abort: Arc<AtomicBool>,
}

impl fmt::Debug for Cvm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cvm")
            .field("context", &self.context)
            .field("tx", &self.tx)
            .field("config", &self.config)
            .field("rules", &self.rules)
            .field("depth", &self.depth)
            .field("read_only", &self.read_only)
            .field("tracing", &self.tracer.is_some())
            .field("cancelled", &self.cancelled())
            .finish_non_exhaustive()
    }
}

impl<'a> Cvm<'a> {
    /// Creates a new engine for the block described by `context`.
    ///
    /// The instruction set follows the upgrades active at `context.block_number`, plus any CIPs in
    /// `config.extra_cips`.
    pub fn new(
        context: BlockContext<'a>,
        tx: TxContext,
        state: &'a mut dyn StateDb,
        chain_config: ChainConfig,
        mut config: Config,
    ) -> Self {
        let rules = chain_config.rules(context.block_number);
        let mut table = instruction_set(&rules);

        if !config.extra_cips.is_empty() {
            let mut patched = (*table).clone();
            config.extra_cips.retain(|&cip| match enable_cip(cip, &mut patched) {
                Ok(()) => true,
                Err(e) => {
                    error!("cip activation failed: {}", e);
                    false
                }
            });
            table = Arc::new(patched);
        }

        debug!(
            block_number = context.block_number,
            network_id = rules.network_id,
            extra_cips = ?config.extra_cips,
            "created cvm"
        );

        Self {
            context,
            tx,
            state,
            config,
            chain_config,
            rules,
            table,
            depth: 0,
            read_only: false,
            return_data: Bytes::new(),
            tracer: None,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attaches a tracer. It only receives steps when [`Config::debug`] is set.
    pub fn with_tracer(mut self, tracer: &'a mut dyn Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Swaps in the next transaction of the same block, with its state.
    pub fn reset(&mut self, tx: TxContext, state: &'a mut dyn StateDb) {
        self.tx = tx;
        self.state = state;
    }

    /// Stops execution at the next cancellation check. Frames that are stopped this way finish
    /// successfully with the energy they had left.
    pub fn cancel(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// A flag that cancels this engine when set, usable from other threads.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Shares `abort` as this engine's cancellation flag, so the engine can be stopped before
    /// it exists.
    pub fn with_cancel_handle(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = abort;
        self
    }

    /// Whether [`Cvm::cancel`] was called.
    pub fn cancelled(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// The current call depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The upgrade rules in force for this block.
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// The chain the engine runs on.
    pub fn chain_config(&self) -> &ChainConfig {
        &self.chain_config
    }

    fn capture_start(
        &mut self,
        from: Address,
        to: Address,
        create: bool,
        input: &[u8],
        energy: u64,
        value: U256,
    ) {
        if self.config.debug && self.depth == 0 {
            if let Some(tracer) = self.tracer.as_deref_mut() {
                tracer.capture_start(from, to, create, input, energy, value);
            }
        }
    }

    fn capture_end(
        &mut self,
        output: &[u8],
        energy_used: u64,
        duration: Duration,
        err: Option<&VmError>,
    ) {
        if self.config.debug && self.depth == 0 {
            if let Some(tracer) = self.tracer.as_deref_mut() {
                tracer.capture_end(output, energy_used, duration, err);
            }
        }
    }

    /// Executes the code at `address` with `input`, transferring `value` from `caller`.
    ///
    /// Creates the account if it does not exist. Any state changes are reverted on error, and all
    /// the energy is consumed unless the error is a revert.
    ///
    /// From CIP158 on, a zero-value call to a missing account that is not a precompile is a no-op
    /// returning all of `energy`. Earlier rules still create the empty account.
    pub fn call(
        &mut self,
        caller: Address,
        address: Address,
        input: Bytes,
        energy: u64,
        value: U256,
    ) -> CallOutcome {
        if self.config.no_recursion && self.depth > 0 {
            return CallOutcome::new(Bytes::new(), energy, None);
        }
        if self.depth > CALL_CREATE_DEPTH {
            return CallOutcome::failed(energy, VmError::Depth);
        }
        if !(self.context.can_transfer)(&*self.state, caller, value) {
            return CallOutcome::failed(energy, VmError::InsufficientBalance);
        }

        let is_precompile = precompile(&self.rules, address).is_some();
        let exists = self.state.exist(address);
        if !exists && !is_precompile && self.rules.is_cip158 && value.is_zero() {
            // calling a non-existing account touches nothing, but the tracer still hears of it
            self.capture_start(caller, address, false, &input, energy, value);
            self.capture_end(&[], 0, Duration::ZERO, None);
            return CallOutcome::new(Bytes::new(), energy, None);
        }

        let snapshot = self.state.snapshot();
        if !exists {
            self.state.create_account(address);
        }
        (self.context.transfer)(&mut *self.state, caller, address, value);

        self.capture_start(caller, address, false, &input, energy, value);
        let start = Instant::now();

        let mut contract = Contract::new(caller, address, value, energy);
        let outcome = if !is_precompile && self.state.get_code_size(address) == 0 {
            CallOutcome::new(Bytes::new(), energy, None)
        } else {
            self.run_code_at(&mut contract, address, input, false, snapshot)
        };

        self.capture_end(
            &outcome.output,
            energy - outcome.energy_left,
            start.elapsed(),
            outcome.error.as_ref(),
        );
        outcome
    }

    /// Executes the code at `address` in the context of `caller`: storage and balance are the
    /// caller's, only the code comes from `address`.
    pub fn call_code(
        &mut self,
        caller: Address,
        address: Address,
        input: Bytes,
        energy: u64,
        value: U256,
    ) -> CallOutcome {
        if self.config.no_recursion && self.depth > 0 {
            return CallOutcome::new(Bytes::new(), energy, None);
        }
        if self.depth > CALL_CREATE_DEPTH {
            return CallOutcome::failed(energy, VmError::Depth);
        }
        if !(self.context.can_transfer)(&*self.state, caller, value) {
            return CallOutcome::failed(energy, VmError::InsufficientBalance);
        }

        let snapshot = self.state.snapshot();
        let mut contract = Contract::new(caller, caller, value, energy);
        self.run_code_at(&mut contract, address, input, false, snapshot)
    }

    /// Executes the code at `address` in the context of `parent`, keeping the parent's caller
    /// and value.
    pub fn delegate_call(
        &mut self,
        parent: &Contract,
        address: Address,
        input: Bytes,
        energy: u64,
    ) -> CallOutcome {
        if self.config.no_recursion && self.depth > 0 {
            return CallOutcome::new(Bytes::new(), energy, None);
        }
        if self.depth > CALL_CREATE_DEPTH {
            return CallOutcome::failed(energy, VmError::Depth);
        }

        let snapshot = self.state.snapshot();
        let mut contract = Contract::new(parent.address(), parent.address(), U256::ZERO, energy)
            .as_delegate(parent);
        self.run_code_at(&mut contract, address, input, false, snapshot)
    }

    /// Executes the code at `address` without allowing any state modification, in it or in any
    /// call it makes.
    pub fn static_call(
        &mut self,
        caller: Address,
        address: Address,
        input: Bytes,
        energy: u64,
    ) -> CallOutcome {
        if self.config.no_recursion && self.depth > 0 {
            return CallOutcome::new(Bytes::new(), energy, None);
        }
        if self.depth > CALL_CREATE_DEPTH {
            return CallOutcome::failed(energy, VmError::Depth);
        }

        let snapshot = self.state.snapshot();
        // touch the target, matching what a zero value call would do
        self.state.add_balance(address, U256::ZERO);

        let mut contract = Contract::new(caller, address, U256::ZERO, energy);
        self.run_code_at(&mut contract, address, input, true, snapshot)
    }

    /// Runs the precompile at `address`, or its code within `contract`, reverting to `snapshot`
    /// on failure.
    fn run_code_at(
        &mut self,
        contract: &mut Contract,
        address: Address,
        input: Bytes,
        read_only: bool,
        snapshot: usize,
    ) -> CallOutcome {
        let energy = contract.energy;
        let (output, mut energy_left, error) = match precompile(&self.rules, address) {
            Some(precompiled) => match run_precompiled_contract(precompiled, &input, energy) {
                Ok((output, left)) => (output, left, None),
                Err(err) => (Bytes::new(), 0, Some(err)),
            },
            None => {
                contract.set_call_code(
                    Some(address),
                    self.state.get_code_hash(address),
                    self.state.get_code(address),
                );
                let (output, error) = into_parts(self.run(contract, input, read_only));
                (output, contract.energy, error)
            }
        };

        if let Some(err) = &error {
            self.state.revert_to_snapshot(snapshot);
            if !err.is_revert() {
                energy_left = 0;
            }
        }
        CallOutcome::new(output, energy_left, error)
    }

    /// Deploys `code` at the address derived from `caller` and its nonce.
    pub fn create(
        &mut self,
        caller: Address,
        code: Bytes,
        energy: u64,
        value: U256,
    ) -> CreateOutcome {
        let address = caller.create(self.state.get_nonce(caller));
        self.create_at(caller, code, energy, value, address)
    }

    /// Deploys `code` at the address derived from `caller`, `salt` and the code hash.
    pub fn create2(
        &mut self,
        caller: Address,
        code: Bytes,
        energy: u64,
        value: U256,
        salt: U256,
    ) -> CreateOutcome {
        let address = caller.create2(salt.to_be_bytes::<32>(), keccak256(&code));
        self.create_at(caller, code, energy, value, address)
    }

    fn create_at(
        &mut self,
        caller: Address,
        code: Bytes,
        energy: u64,
        value: U256,
        address: Address,
    ) -> CreateOutcome {
        let rejected = |energy_left, error| CreateOutcome {
            output: Bytes::new(),
            address: Address::ZERO,
            energy_left,
            error: Some(error),
        };

        if self.depth > CALL_CREATE_DEPTH {
            return rejected(energy, VmError::Depth);
        }
        if !(self.context.can_transfer)(&*self.state, caller, value) {
            return rejected(energy, VmError::InsufficientBalance);
        }

        let nonce = self.state.get_nonce(caller);
        self.state.set_nonce(caller, nonce + 1);

        let code_hash = self.state.get_code_hash(address);
        if self.state.get_nonce(address) != 0 ||
            (code_hash != B256::ZERO && code_hash != EMPTY_CODE_HASH)
        {
            return rejected(0, VmError::ContractAddressCollision);
        }

        let snapshot = self.state.snapshot();
        self.state.create_account(address);
        if self.rules.is_cip158 {
            self.state.set_nonce(address, 1);
        }
        (self.context.transfer)(&mut *self.state, caller, address, value);

        let mut contract = Contract::new(caller, address, value, energy);
        let code_hash = keccak256(&code);
        contract.set_call_code(Some(address), code_hash, code.clone());

        if self.config.no_recursion && self.depth > 0 {
            return CreateOutcome { address, energy_left: energy, ..Default::default() };
        }

        self.capture_start(caller, address, true, &code, energy, value);
        let start = Instant::now();

        let (output, mut error) = into_parts(self.run(&mut contract, Bytes::new(), false));

        let max_code_size_exceeded = self.rules.is_cip158 && output.len() > MAX_CODE_SIZE;
        if error.is_none() && !max_code_size_exceeded {
            let create_data_energy = output.len() as u64 * CREATE_DATA_ENERGY;
            if contract.use_energy(create_data_energy) {
                self.state.set_code(address, output.clone());
            } else {
                error = Some(VmError::CodeStoreOutOfEnergy);
            }
        }

        // before Homestead, running out of energy while storing the code leaves an empty account
        if max_code_size_exceeded ||
            error.as_ref().is_some_and(|err| {
                self.rules.is_homestead || *err != VmError::CodeStoreOutOfEnergy
            })
        {
            self.state.revert_to_snapshot(snapshot);
            if !error.as_ref().is_some_and(VmError::is_revert) {
                contract.energy = 0;
            }
        }
        if max_code_size_exceeded && error.is_none() {
            error = Some(VmError::MaxCodeSizeExceeded);
        }

        self.capture_end(&output, energy - contract.energy, start.elapsed(), error.as_ref());
        CreateOutcome { output, address, energy_left: contract.energy, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        state::{BlockState, MemoryState},
        vm::handlers::test_utils,
    };

    #[test]
    fn test_call_past_depth_limit_returns_energy() {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        cvm.depth = CALL_CREATE_DEPTH + 1;

        let outcome =
            cvm.call(Address::ZERO, Address::repeat_byte(1), Bytes::new(), 5000, U256::ZERO);
        assert_eq!(outcome.error, Some(VmError::Depth));
        assert_eq!(outcome.energy_left, 5000);
    }

    #[test]
    fn test_no_recursion_skips_nested_calls() {
        let target = Address::repeat_byte(0x42);
        let mut state = MemoryState::new();
        // INVALID
        state.set_code(target, Bytes::from_static(&[0xfe]));

        let mut cvm = test_utils::cvm(&mut state);
        cvm.config.no_recursion = true;
        cvm.depth = 1;
        let outcome = cvm.call(Address::ZERO, target, Bytes::new(), 5000, U256::ZERO);
        assert!(outcome.is_success());
        assert_eq!(outcome.energy_left, 5000);
    }

    #[test]
    fn test_create_collision_burns_energy() {
        let mut state = MemoryState::new();
        let creator = Address::repeat_byte(0x0c);
        let taken = creator.create(0);
        state.set_nonce(taken, 1);

        let mut cvm = test_utils::cvm(&mut state);
        let outcome = cvm.create(creator, Bytes::new(), 5000, U256::ZERO);
        assert_eq!(outcome.error, Some(VmError::ContractAddressCollision));
        assert_eq!(outcome.energy_left, 0);
        assert_eq!(outcome.address, Address::ZERO);
        // the creator's nonce is still consumed
        assert_eq!(cvm.state.get_nonce(creator), 1);
    }

    #[test]
    fn test_create_rejects_oversized_code() {
        let mut state = MemoryState::new();
        let creator = Address::repeat_byte(0x0c);

        // PUSH2 0x6001 PUSH1 0 RETURN: returns MAX_CODE_SIZE + 1 zero bytes
        let init_code = Bytes::from_static(&[0x61, 0x60, 0x01, 0x60, 0x00, 0xf3]);
        let mut cvm = test_utils::cvm(&mut state);
        let outcome = cvm.create(creator, init_code, 10_000_000, U256::ZERO);
        assert_eq!(outcome.error, Some(VmError::MaxCodeSizeExceeded));
        assert_eq!(outcome.energy_left, 0);
        assert!(!cvm.state.exist(creator.create(0)));
    }

    #[test]
    fn test_value_call_creates_account() {
        let mut state = MemoryState::new();
        let sender = Address::repeat_byte(0x0c);
        let target = Address::repeat_byte(0x42);
        state.add_balance(sender, U256::from(10));
        state.finalise(true);

        let mut cvm = test_utils::cvm(&mut state);
        let outcome = cvm.call(sender, target, Bytes::new(), 5000, U256::from(3));
        assert!(outcome.is_success());
        assert_eq!(outcome.energy_left, 5000);
        assert_eq!(cvm.state.get_balance(target), U256::from(3));
        assert_eq!(cvm.state.get_balance(sender), U256::from(7));
    }
}
