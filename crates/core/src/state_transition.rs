use alloy::primitives::{Bytes, U256};
use cvm_vm::core::{
    constants::{
        TX_DATA_NON_ZERO_ENERGY_CIP2028, TX_DATA_NON_ZERO_ENERGY_FRONTIER, TX_DATA_ZERO_ENERGY,
        TX_ENERGY, TX_ENERGY_CONTRACT_CREATION,
    },
    errors::VmError,
    vm::Cvm,
};
use tracing::trace;

use crate::{energy_pool::EnergyPool, error::Error, types::Message};

/// The outcome of executing a message that passed every transaction level check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Energy used, refunds already deducted.
    pub used_energy: u64,
    /// Why execution failed, if it did. A revert is reported as
    /// [`VmError::ExecutionReverted`].
    pub err: Option<VmError>,
    /// Output of the top level frame. Holds the revert reason on revert.
    pub return_data: Bytes,
}

impl ExecutionResult {
    /// Whether execution failed, reverts included.
    pub fn failed(&self) -> bool {
        self.err.is_some()
    }

    /// The returned data, empty if execution failed.
    pub fn return_data(&self) -> Bytes {
        if self.failed() {
            Bytes::new()
        } else {
            self.return_data.clone()
        }
    }

    /// The revert reason, empty unless execution reverted.
    pub fn revert(&self) -> Bytes {
        match &self.err {
            Some(VmError::ExecutionReverted) => self.return_data.clone(),
            _ => Bytes::new(),
        }
    }
}

/// Computes the energy a message pays before any code runs.
///
/// ```
/// use cvm_core::state_transition::intrinsic_energy;
///
/// assert_eq!(intrinsic_energy(&[], false, true, true).unwrap(), 21_000);
/// assert_eq!(intrinsic_energy(&[], true, true, true).unwrap(), 53_000);
/// assert_eq!(intrinsic_energy(&[0, 1], false, true, true).unwrap(), 21_000 + 4 + 16);
/// ```
pub fn intrinsic_energy(
    data: &[u8],
    contract_creation: bool,
    is_homestead: bool,
    is_cip2028: bool,
) -> Result<u64, Error> {
    let mut energy =
        if contract_creation && is_homestead { TX_ENERGY_CONTRACT_CREATION } else { TX_ENERGY };

    if !data.is_empty() {
        let non_zero = data.iter().filter(|byte| **byte != 0).count() as u64;
        let non_zero_energy = if is_cip2028 {
            TX_DATA_NON_ZERO_ENERGY_CIP2028
        } else {
            TX_DATA_NON_ZERO_ENERGY_FRONTIER
        };
        if (u64::MAX - energy) / non_zero_energy < non_zero {
            return Err(Error::EnergyUintOverflow);
        }
        energy += non_zero * non_zero_energy;

        let zero = data.len() as u64 - non_zero;
        if (u64::MAX - energy) / TX_DATA_ZERO_ENERGY < zero {
            return Err(Error::EnergyUintOverflow);
        }
        energy += zero * TX_DATA_ZERO_ENERGY;
    }
    Ok(energy)
}

/// Applies `msg` on top of the engine's state, drawing its energy from `pool`.
///
/// An `Err` means the message was rejected before it touched the state. Failures of the code it
/// ran are reported in [`ExecutionResult::err`] instead.
pub fn apply_message(
    cvm: &mut Cvm<'_>,
    msg: &Message,
    pool: &mut EnergyPool,
) -> Result<ExecutionResult, Error> {
    StateTransition::new(cvm, msg, pool).transition_db()
}

/// The [`StateTransition`] walks a single message through its energy purchase, execution and
/// refund.
struct StateTransition<'c, 'a> {
    cvm: &'c mut Cvm<'a>,
    msg: &'c Message,
    pool: &'c mut EnergyPool,
    energy: u64,
    initial_energy: u64,
}

impl<'c, 'a> StateTransition<'c, 'a> {
    fn new(cvm: &'c mut Cvm<'a>, msg: &'c Message, pool: &'c mut EnergyPool) -> Self {
        Self { cvm, msg, pool, energy: 0, initial_energy: 0 }
    }

    fn buy_energy(&mut self) -> Result<(), Error> {
        let cost = U256::from(self.msg.energy_limit).saturating_mul(self.msg.energy_price);
        let balance = self.cvm.state.get_balance(self.msg.from);
        if balance < cost {
            let address = self.msg.from;
            return Err(Error::InsufficientFunds { address, have: balance, want: cost });
        }
        self.pool.sub_energy(self.msg.energy_limit)?;

        self.energy += self.msg.energy_limit;
        self.initial_energy = self.msg.energy_limit;
        self.cvm.state.sub_balance(self.msg.from, cost);
        Ok(())
    }

    /// Undoes [`StateTransition::buy_energy`] for a message rejected after the purchase.
    fn refund_purchase(&mut self, snapshot: usize) {
        self.cvm.state.revert_to_snapshot(snapshot);
        self.pool.add_energy(self.initial_energy);
    }

    fn pre_check(&mut self) -> Result<(), Error> {
        if self.msg.check_nonce {
            let address = self.msg.from;
            let state = self.cvm.state.get_nonce(address);
            let tx = self.msg.nonce;
            if state < tx {
                return Err(Error::NonceTooHigh { address, tx, state });
            }
            if state > tx {
                return Err(Error::NonceTooLow { address, tx, state });
            }
        }
        self.buy_energy()
    }

    fn transition_db(mut self) -> Result<ExecutionResult, Error> {
        let snapshot = self.cvm.state.snapshot();
        self.pre_check()?;

        let rules = *self.cvm.rules();
        let contract_creation = self.msg.is_create();

        let energy = intrinsic_energy(
            &self.msg.data,
            contract_creation,
            rules.is_homestead,
            rules.is_istanbul,
        )?;
        if self.energy < energy {
            self.refund_purchase(snapshot);
            return Err(Error::IntrinsicEnergy { have: self.energy, want: energy });
        }
        self.energy -= energy;

        let (from, value) = (self.msg.from, self.msg.value);
        if !value.is_zero() && !(self.cvm.context.can_transfer)(&*self.cvm.state, from, value) {
            self.refund_purchase(snapshot);
            return Err(Error::InsufficientFundsForTransfer(from));
        }

        trace!(%from, to = ?self.msg.to, energy = self.energy, "applying message");
        let (return_data, err) = match self.msg.to {
            None => {
                let outcome = self.cvm.create(from, self.msg.data.clone(), self.energy, value);
                self.energy = outcome.energy_left;
                (outcome.output, outcome.error)
            }
            Some(to) => {
                let nonce = self.cvm.state.get_nonce(from);
                self.cvm.state.set_nonce(from, nonce + 1);
                let outcome = self.cvm.call(from, to, self.msg.data.clone(), self.energy, value);
                self.energy = outcome.energy_left;
                (outcome.output, outcome.error)
            }
        };

        self.refund_energy();
        let used_energy = self.energy_used();
        let fee = U256::from(used_energy).saturating_mul(self.msg.energy_price);
        self.cvm.state.add_balance(self.cvm.context.coinbase, fee);

        Ok(ExecutionResult { used_energy, err, return_data })
    }

    /// Applies the refund counter, capped at half the energy used, and hands the leftover energy
    /// back to the sender and the pool.
    fn refund_energy(&mut self) {
        let refund = (self.energy_used() / 2).min(self.cvm.state.get_refund());
        self.energy += refund;

        let remaining = U256::from(self.energy).saturating_mul(self.msg.energy_price);
        self.cvm.state.add_balance(self.msg.from, remaining);
        self.pool.add_energy(self.energy);
    }

    fn energy_used(&self) -> u64 {
        self.initial_energy - self.energy
    }
}
