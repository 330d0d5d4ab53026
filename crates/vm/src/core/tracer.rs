use std::time::Duration;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::{errors::VmError, opcodes::opcode_name, state::StateDb, vm::Scope};

/// Observes execution. Hooks are only invoked while [`Config::debug`](super::vm::Config) is set.
///
/// `capture_start` and `capture_end` bracket the outermost call or create, `capture_state` runs
/// before every instruction and `capture_fault` reports an instruction that failed after it was
/// announced through `capture_state`.
pub trait Tracer {
    /// Called before the top level frame starts.
    fn capture_start(
        &mut self,
        from: Address,
        to: Address,
        create: bool,
        input: &[u8],
        energy: u64,
        value: U256,
    );

    /// Called before every instruction, after its energy was charged. Also called with `err` set
    /// when an instruction fails before it could be announced.
    #[allow(clippy::too_many_arguments)]
    fn capture_state(
        &mut self,
        state: &dyn StateDb,
        pc: u64,
        op: u8,
        energy: u64,
        cost: u64,
        scope: &Scope<'_>,
        return_data: &[u8],
        depth: usize,
        err: Option<&VmError>,
    );

    /// Called when an announced instruction fails.
    #[allow(clippy::too_many_arguments)]
    fn capture_fault(
        &mut self,
        state: &dyn StateDb,
        pc: u64,
        op: u8,
        energy: u64,
        cost: u64,
        scope: &Scope<'_>,
        return_data: &[u8],
        depth: usize,
        err: &VmError,
    );

    /// Called after the top level frame finished.
    fn capture_end(
        &mut self,
        output: &[u8],
        energy_used: u64,
        duration: Duration,
        err: Option<&VmError>,
    );
}

/// Options for the [`StructLogger`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Skip copying the stack into every entry.
    pub disable_stack: bool,
    /// Stop recording after this many entries. Zero records everything.
    pub limit: usize,
}

/// A single recorded step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructLog {
    /// Program counter of the instruction.
    pub pc: u64,
    /// The opcode.
    pub op: u8,
    /// Energy left before the instruction was charged.
    pub energy: u64,
    /// What the instruction cost.
    pub energy_cost: u64,
    /// Call depth, 1 for the top level frame.
    pub depth: usize,
    /// Stack contents, bottom first.
    pub stack: Vec<U256>,
    /// Memory size in bytes.
    pub memory_size: usize,
    /// Refund counter.
    pub refund: u64,
    /// Why the instruction failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StructLog {
    /// The mnemonic of the executed opcode.
    pub fn op_name(&self) -> &'static str {
        opcode_name(self.op)
    }
}

/// A [`Tracer`] that records every step as a [`StructLog`].
#[derive(Clone, Debug, Default)]
pub struct StructLogger {
    config: LogConfig,
    logs: Vec<StructLog>,
    output: Vec<u8>,
    energy_used: u64,
    error: Option<VmError>,
}

impl StructLogger {
    /// Creates a logger with the given options.
    pub fn new(config: LogConfig) -> Self {
        Self { config, ..Default::default() }
    }

    /// The recorded steps.
    pub fn struct_logs(&self) -> &[StructLog] {
        &self.logs
    }

    /// The output of the top level frame.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// The energy used by the top level frame.
    pub fn energy_used(&self) -> u64 {
        self.energy_used
    }

    /// The error the top level frame ended with, if any.
    pub fn error(&self) -> Option<&VmError> {
        self.error.as_ref()
    }

    fn full(&self) -> bool {
        self.config.limit != 0 && self.logs.len() >= self.config.limit
    }
}

impl Tracer for StructLogger {
    fn capture_start(&mut self, _: Address, _: Address, _: bool, _: &[u8], _: u64, _: U256) {}

    fn capture_state(
        &mut self,
        state: &dyn StateDb,
        pc: u64,
        op: u8,
        energy: u64,
        cost: u64,
        scope: &Scope<'_>,
        _: &[u8],
        depth: usize,
        err: Option<&VmError>,
    ) {
        if self.full() {
            return;
        }

        let stack =
            if self.config.disable_stack { Vec::new() } else { scope.stack.data().to_vec() };
        self.logs.push(StructLog {
            pc,
            op,
            energy,
            energy_cost: cost,
            depth,
            stack,
            memory_size: scope.memory.len(),
            refund: state.get_refund(),
            error: err.map(ToString::to_string),
        });
    }

    fn capture_fault(
        &mut self,
        _: &dyn StateDb,
        pc: u64,
        _: u8,
        _: u64,
        _: u64,
        _: &Scope<'_>,
        _: &[u8],
        _: usize,
        err: &VmError,
    ) {
        // the failing step was already recorded by capture_state, unless the limit was hit
        if let Some(last) = self.logs.last_mut().filter(|log| log.pc == pc) {
            last.error = Some(err.to_string());
        }
    }

    fn capture_end(
        &mut self,
        output: &[u8],
        energy_used: u64,
        _: Duration,
        err: Option<&VmError>,
    ) {
        self.output = output.to_vec();
        self.energy_used = energy_used;
        self.error = err.cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        contract::Contract,
        memory::Memory,
        stack::{ReturnStack, Stack},
        state::MemoryState,
    };

    fn scope(contract: &mut Contract) -> Scope<'_> {
        let mut stack = Stack::new();
        stack.push(U256::from(1));
        Scope {
            memory: Memory::new(),
            stack,
            return_stack: ReturnStack::new(),
            contract,
            call_energy: 0,
        }
    }

    #[test]
    fn test_struct_logger_limit_and_fault() {
        let state = MemoryState::new();
        let mut contract = Contract::new(Address::ZERO, Address::ZERO, U256::ZERO, 100);
        let scope = scope(&mut contract);

        let mut logger = StructLogger::new(LogConfig { disable_stack: false, limit: 2 });
        for pc in 0..3 {
            logger.capture_state(&state, pc, 0x01, 100, 3, &scope, &[], 1, None);
        }
        logger.capture_fault(&state, 1, 0x01, 100, 3, &scope, &[], 1, &VmError::OutOfEnergy);
        logger.capture_end(&[0xaa], 50, Duration::ZERO, Some(&VmError::OutOfEnergy));

        let logs = logger.struct_logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].op_name(), "ADD");
        assert_eq!(logs[0].stack, vec![U256::from(1)]);
        assert_eq!(logs[1].error.as_deref(), Some("out of energy"));
        assert_eq!(logger.output(), &[0xaa]);
        assert_eq!(logger.energy_used(), 50);
        assert_eq!(logger.error(), Some(&VmError::OutOfEnergy));
    }
}
