use std::sync::{atomic::Ordering, Arc};

use alloy::primitives::Bytes;

#[cfg(feature = "step-tracing")]
use tracing::trace;

use super::{
    super::{
        contract::Contract,
        errors::VmError,
        memory::{to_word_size, Memory},
        opcodes::CALL,
        stack::{ReturnStack, Stack},
    },
    core::Cvm,
    jump_table::JumpTable,
};

/// How often, in executed instructions, the interpreter checks the abort flag.
const ABORT_CHECK_INTERVAL: u64 = 1000;

/// The per-frame machine state handed to every instruction.
#[derive(Debug)]
pub struct Scope<'c> {
    /// The frame's memory.
    pub memory: Memory,

    /// The operand stack.
    pub stack: Stack,

    /// The subroutine return stack.
    pub return_stack: ReturnStack,

    /// The contract being executed.
    pub contract: &'c mut Contract,

    /// The allowance the current CALL family instruction forwards to its callee, as priced by
    /// its dynamic energy function.
    pub call_energy: u64,
}

/// How a frame finished without error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Exit {
    /// STOP, RETURN, SELFDESTRUCT, running off the end of the code or an abort.
    Return(Bytes),

    /// REVERT, carrying the revert reason. Remaining energy is kept.
    Revert(Bytes),
}

impl Exit {
    /// The returned bytes, whatever the outcome.
    pub fn output(&self) -> &Bytes {
        match self {
            Exit::Return(output) | Exit::Revert(output) => output,
        }
    }
}

/// What the interpreter knew about the instruction that was executing when a frame failed.
#[derive(Clone, Copy, Debug, Default)]
struct StepTrace {
    pc: u64,
    op: u8,
    energy: u64,
    cost: u64,
    logged: bool,
}

impl Cvm<'_> {
    /// Runs `contract` with `input` until it halts, reverts or fails.
    ///
    /// The call depth is raised for the duration of the run. A read-only request is latched for
    /// this frame and everything below it, and released again when the frame that latched it
    /// returns.
    pub(crate) fn run(
        &mut self,
        contract: &mut Contract,
        input: Bytes,
        read_only: bool,
    ) -> Result<Exit, VmError> {
        self.depth += 1;

        let latched = read_only && !self.read_only;
        if latched {
            self.read_only = true;
        }

        let result = self.interpret(contract, input);

        if latched {
            self.read_only = false;
        }
        self.depth -= 1;
        result
    }

    fn interpret(&mut self, contract: &mut Contract, input: Bytes) -> Result<Exit, VmError> {
        // return data always belongs to the last call made by the running frame
        self.return_data = Bytes::new();

        if contract.code.is_empty() {
            return Ok(Exit::Return(Bytes::new()));
        }
        contract.input = input;

        let table = Arc::clone(&self.table);
        let mut scope = Scope {
            memory: Memory::new(),
            stack: Stack::new(),
            return_stack: ReturnStack::new(),
            contract,
            call_energy: 0,
        };
        let mut pc = 0u64;
        let mut steps = 0u64;
        let mut step = StepTrace::default();

        let result = loop {
            steps += 1;
            if steps % ABORT_CHECK_INTERVAL == 0 && self.abort.load(Ordering::Relaxed) {
                break Ok(Exit::Return(Bytes::new()));
            }

            match self.step(&table, &mut scope, &mut pc, &mut step) {
                Ok(None) => continue,
                Ok(Some(exit)) => break Ok(exit),
                Err(err) => break Err(err),
            }
        };

        if let Err(err) = &result {
            if self.config.debug {
                if let Some(tracer) = self.tracer.as_deref_mut() {
                    let depth = self.depth;
                    if step.logged {
                        tracer.capture_fault(
                            &*self.state,
                            step.pc,
                            step.op,
                            step.energy,
                            step.cost,
                            &scope,
                            &self.return_data,
                            depth,
                            err,
                        );
                    } else {
                        tracer.capture_state(
                            &*self.state,
                            step.pc,
                            step.op,
                            step.energy,
                            step.cost,
                            &scope,
                            &self.return_data,
                            depth,
                            Some(err),
                        );
                    }
                }
            }
        }

        result
    }

    /// Executes the instruction at `pc`. Returns the frame's exit once it halts.
    fn step(
        &mut self,
        table: &JumpTable,
        scope: &mut Scope<'_>,
        pc: &mut u64,
        step: &mut StepTrace,
    ) -> Result<Option<Exit>, VmError> {
        let op = scope.contract.get_op(*pc);
        *step = StepTrace { pc: *pc, op, energy: scope.contract.energy, cost: 0, logged: false };

        let operation = table.get(op).ok_or(VmError::InvalidOpCode(op))?;

        let len = scope.stack.len();
        if len < operation.min_stack {
            return Err(VmError::StackUnderflow { len, required: operation.min_stack });
        }
        if len > operation.max_stack {
            return Err(VmError::StackOverflow { len, limit: operation.max_stack });
        }

        if self.read_only && self.rules.is_byzantium {
            // a CALL may only run in a read-only frame if it transfers nothing
            if operation.writes || (op == CALL && !scope.stack.back(2)?.is_zero()) {
                return Err(VmError::WriteProtection);
            }
        }

        step.cost = operation.constant_energy;
        if !scope.contract.use_energy(operation.constant_energy) {
            return Err(VmError::OutOfEnergy);
        }

        // memory expansion is priced before anything is allocated
        let mut memory_size = 0;
        if let Some(memory_size_fn) = operation.memory_size {
            let size = memory_size_fn(&scope.stack).ok_or(VmError::EnergyUintOverflow)?;
            memory_size = to_word_size(size).checked_mul(32).ok_or(VmError::EnergyUintOverflow)?;
        }

        scope.call_energy = 0;
        if let Some(dynamic_energy) = operation.dynamic_energy {
            let charge =
                dynamic_energy(self, scope, memory_size).map_err(|_| VmError::OutOfEnergy)?;
            step.cost += charge.energy;
            if !scope.contract.use_energy(charge.energy) {
                return Err(VmError::OutOfEnergy);
            }
            scope.call_energy = charge.call_energy;
        }
        if memory_size > 0 {
            scope.memory.resize(memory_size);
        }

        if self.config.debug {
            if let Some(tracer) = self.tracer.as_deref_mut() {
                tracer.capture_state(
                    &*self.state,
                    *pc,
                    op,
                    step.energy,
                    step.cost,
                    scope,
                    &self.return_data,
                    self.depth,
                    None,
                );
                step.logged = true;
            }
        }

        #[cfg(feature = "step-tracing")]
        trace!(
            pc = *pc,
            opcode = crate::core::opcodes::opcode_name(op),
            energy = step.energy,
            cost = step.cost,
            depth = self.depth,
            "executing opcode"
        );

        let output = (operation.execute)(pc, self, scope)?;
        if operation.returns {
            self.return_data = output.clone();
        }

        if operation.reverts {
            return Ok(Some(Exit::Revert(output)));
        }
        if operation.halts {
            return Ok(Some(Exit::Return(output)));
        }
        if !operation.jumps {
            *pc += 1;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, B256, U256};

    use crate::core::{
        errors::VmError,
        state::{MemoryState, StateDb},
        vm::handlers::test_utils,
    };

    use super::*;

    const TARGET: Address = Address::repeat_byte(0x42);

    fn run_code(code: &'static [u8], energy: u64) -> (Result<Exit, VmError>, u64) {
        let mut state = MemoryState::new();
        let mut cvm = test_utils::cvm(&mut state);
        let mut contract = test_utils::contract(energy);
        contract.code = Bytes::from_static(code);
        let result = cvm.run(&mut contract, Bytes::new(), false);
        (result, contract.energy)
    }

    #[test]
    fn test_stop_and_end_of_code() {
        // PUSH1 1
        let (result, energy) = run_code(&[0x60, 0x01], 10);
        assert_eq!(result, Ok(Exit::Return(Bytes::new())));
        assert_eq!(energy, 7);
    }

    #[test]
    fn test_stack_underflow() {
        // ADD
        let (result, _) = run_code(&[0x01], 10);
        assert_eq!(result, Err(VmError::StackUnderflow { len: 0, required: 2 }));
    }

    #[test]
    fn test_out_of_energy_on_constant_cost() {
        // PUSH1 1 PUSH1 1 ADD
        let (result, _) = run_code(&[0x60, 0x01, 0x60, 0x01, 0x01], 8);
        assert_eq!(result, Err(VmError::OutOfEnergy));
    }

    #[test]
    fn test_revert_keeps_output() {
        // PUSH1 0xaa PUSH1 0 MSTORE8 PUSH1 1 PUSH1 0 REVERT
        let (result, energy) =
            run_code(&[0x60, 0xaa, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xfd], 100);
        assert_eq!(result, Ok(Exit::Revert(Bytes::from_static(&[0xaa]))));
        assert_eq!(energy, 100 - 18);
    }

    #[test]
    fn test_invalid_opcode() {
        let (result, _) = run_code(&[0xef], 10);
        assert_eq!(result, Err(VmError::InvalidOpCode(0xef)));
    }

    #[test]
    fn test_static_call_rejects_sstore() {
        let mut state = MemoryState::new();
        // PUSH1 1 PUSH1 0 SSTORE
        state.set_code(TARGET, Bytes::from_static(&[0x60, 0x01, 0x60, 0x00, 0x55]));

        let mut cvm = test_utils::cvm(&mut state);
        let outcome = cvm.static_call(Address::ZERO, TARGET, Bytes::new(), 100_000);
        assert_eq!(outcome.error, Some(VmError::WriteProtection));
        assert_eq!(outcome.energy_left, 0);
        assert!(!cvm.read_only);
        assert_eq!(cvm.state.get_state(TARGET, B256::ZERO), B256::ZERO);
    }

    #[test]
    fn test_cancelled_loop_stops() {
        let mut state = MemoryState::new();
        // JUMPDEST PUSH1 0 JUMP
        state.set_code(TARGET, Bytes::from_static(&[0x5b, 0x60, 0x00, 0x56]));

        let mut cvm = test_utils::cvm(&mut state);
        cvm.cancel();
        let outcome = cvm.call(Address::ZERO, TARGET, Bytes::new(), u64::MAX, U256::ZERO);
        assert!(outcome.is_success());
        // the flag is polled every thousand steps, three instructions per iteration
        assert!(outcome.energy_left < u64::MAX);
        assert!(u64::MAX - outcome.energy_left < 20_000);
    }
}
