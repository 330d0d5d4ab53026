use alloy::primitives::B256;
use hashbrown::HashMap;

/// The [`Storage`] struct represents the key-value storage of a single account. \
/// \
/// Alongside the live values it keeps the values as of the last commit, which net metered
/// SSTORE pricing reads as the "original" value of a slot. Zero values are never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Storage {
    current: HashMap<B256, B256>,
    committed: HashMap<B256, B256>,
}

impl Storage {
    /// Creates a new, empty [`Storage`].
    ///
    /// ```
    /// use cvm_vm::core::storage::Storage;
    ///
    /// let storage = Storage::new();
    /// assert!(storage.is_empty());
    /// ```
    pub fn new() -> Storage {
        Storage::default()
    }

    /// Store a value. Storing zero deletes the slot.
    ///
    /// ```
    /// use cvm_vm::core::storage::Storage;
    /// use alloy::primitives::B256;
    ///
    /// let mut storage = Storage::new();
    /// storage.store(B256::with_last_byte(1), B256::with_last_byte(2));
    ///
    /// assert_eq!(storage.load(&B256::with_last_byte(1)), B256::with_last_byte(2));
    /// ```
    pub fn store(&mut self, key: B256, value: B256) {
        if value.is_zero() {
            self.current.remove(&key);
        } else {
            self.current.insert(key, value);
        }
    }

    /// Load the live value of a slot, zero if unset.
    pub fn load(&self, key: &B256) -> B256 {
        self.current.get(key).copied().unwrap_or_default()
    }

    /// Load the value of a slot as of the last commit, zero if unset.
    ///
    /// ```
    /// use cvm_vm::core::storage::Storage;
    /// use alloy::primitives::B256;
    ///
    /// let mut storage = Storage::new();
    /// let key = B256::ZERO;
    /// storage.store(key, B256::with_last_byte(1));
    /// assert_eq!(storage.committed(&key), B256::ZERO);
    ///
    /// storage.commit();
    /// assert_eq!(storage.committed(&key), B256::with_last_byte(1));
    /// ```
    pub fn committed(&self, key: &B256) -> B256 {
        self.committed.get(key).copied().unwrap_or_default()
    }

    /// Make the live values the new originals.
    pub fn commit(&mut self) {
        self.committed.clone_from(&self.current);
    }

    /// Whether no slot holds a non-zero value.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Iterates the non-zero live slots in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&B256, &B256)> {
        self.current.iter()
    }

    /// The non-zero live slots ordered by key.
    pub fn sorted(&self) -> Vec<(B256, B256)> {
        let mut slots: Vec<(B256, B256)> = self.current.iter().map(|(k, v)| (*k, *v)).collect();
        slots.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_zero_deletes() {
        let mut storage = Storage::new();
        let key = B256::with_last_byte(7);

        storage.store(key, B256::with_last_byte(1));
        assert!(!storage.is_empty());

        storage.store(key, B256::ZERO);
        assert!(storage.is_empty());
        assert_eq!(storage.load(&key), B256::ZERO);
    }

    #[test]
    fn test_sorted() {
        let mut storage = Storage::new();
        storage.store(B256::with_last_byte(9), B256::with_last_byte(1));
        storage.store(B256::with_last_byte(3), B256::with_last_byte(2));

        let keys: Vec<B256> = storage.sorted().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![B256::with_last_byte(3), B256::with_last_byte(9)]);
    }
}
