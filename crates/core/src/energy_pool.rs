use std::fmt;

use crate::error::Error;

/// Tracks the energy left in a block while its transactions execute.
///
/// ```
/// use cvm_core::energy_pool::EnergyPool;
///
/// let mut pool = EnergyPool::new(50_000);
/// pool.sub_energy(21_000).unwrap();
/// assert!(pool.sub_energy(30_000).is_err());
/// pool.add_energy(1_000);
/// assert_eq!(pool.energy(), 30_000);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnergyPool(u64);

impl EnergyPool {
    /// Creates a pool holding `energy`.
    pub fn new(energy: u64) -> Self {
        Self(energy)
    }

    /// Returns energy to the pool.
    ///
    /// # Panics
    ///
    /// Panics if the pool would exceed `u64::MAX`. Only more energy than a block ever held can
    /// be returned that way.
    pub fn add_energy(&mut self, amount: u64) -> &mut Self {
        self.0 = match self.0.checked_add(amount) {
            Some(energy) => energy,
            None => panic!("energy pool pushed above uint64"),
        };
        self
    }

    /// Reserves `amount` from the pool, failing if it holds less.
    pub fn sub_energy(&mut self, amount: u64) -> Result<(), Error> {
        self.0 = self.0.checked_sub(amount).ok_or(Error::EnergyLimitReached)?;
        Ok(())
    }

    /// The energy left.
    pub fn energy(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EnergyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_energy_leaves_pool_untouched_on_failure() {
        let mut pool = EnergyPool::new(10);
        assert_eq!(pool.sub_energy(11), Err(Error::EnergyLimitReached));
        assert_eq!(pool.energy(), 10);
        pool.sub_energy(10).unwrap();
        assert_eq!(pool.to_string(), "0");
    }

    #[test]
    #[should_panic(expected = "energy pool pushed above uint64")]
    fn test_add_energy_overflow_panics() {
        EnergyPool::new(u64::MAX).add_energy(1);
    }
}
