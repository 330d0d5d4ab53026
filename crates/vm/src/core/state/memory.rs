use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use hashbrown::HashMap;
use tracing::trace;

use super::{
    journal::{Journal, JournalEntry},
    BlockState, StateDb,
};
use crate::core::{constants::EMPTY_CODE_HASH, log::Log, storage::Storage};

/// A single account held by [`MemoryState`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// The account nonce.
    pub nonce: u64,
    /// The account balance.
    pub balance: U256,
    /// The account code.
    pub code: Bytes,
    /// keccak256 of `code`.
    pub code_hash: B256,
    /// The account storage.
    pub storage: Storage,
    /// Set by SELFDESTRUCT until the transaction is finalised.
    pub suicided: bool,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            code: Bytes::new(),
            code_hash: EMPTY_CODE_HASH,
            storage: Storage::new(),
            suicided: false,
        }
    }
}

impl Account {
    /// Whether the account has zero nonce, zero balance and no code.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == EMPTY_CODE_HASH
    }
}

/// An in-memory [`StateDb`] backed by a journal of reversible mutations.
///
/// ```
/// use cvm_vm::core::state::{MemoryState, StateDb};
/// use alloy::primitives::{Address, U256};
///
/// let mut state = MemoryState::new();
/// let alice = Address::with_last_byte(1);
///
/// let snapshot = state.snapshot();
/// state.add_balance(alice, U256::from(10));
/// assert_eq!(state.get_balance(alice), U256::from(10));
///
/// state.revert_to_snapshot(snapshot);
/// assert!(!state.exist(alice));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryState {
    accounts: HashMap<Address, Account>,
    journal: Journal,
    valid_revisions: Vec<(usize, usize)>,
    next_revision_id: usize,
    refund: u64,

    tx_hash: B256,
    block_hash: B256,
    tx_index: usize,
    logs: HashMap<B256, Vec<Log>>,
    log_size: usize,

    preimages: HashMap<B256, Bytes>,
}

impl MemoryState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the account at `address`, if any.
    pub fn account(&self, address: Address) -> Option<&Account> {
        self.accounts.get(&address)
    }

    /// Returns the recorded SHA3 preimages.
    pub fn preimages(&self) -> &HashMap<B256, Bytes> {
        &self.preimages
    }

    /// Returns every account address, ordered.
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.accounts.keys().copied().collect();
        addresses.sort_unstable();
        addresses
    }

    fn account_mut(&mut self, address: Address) -> &mut Account {
        if !self.accounts.contains_key(&address) {
            self.create_object(address);
        }
        self.accounts.entry(address).or_default()
    }

    /// Installs a fresh account, journaling whatever it replaces.
    fn create_object(&mut self, address: Address) -> Option<Account> {
        let prev = self.accounts.insert(address, Account::default());
        match &prev {
            Some(prev) => self
                .journal
                .append(JournalEntry::ResetObject { address, prev: Box::new(prev.clone()) }),
            None => self.journal.append(JournalEntry::CreateObject { address }),
        }
        prev
    }

    fn set_balance(&mut self, address: Address, balance: U256) {
        let account = self.account_mut(address);
        let prev = account.balance;
        account.balance = balance;
        self.journal.append(JournalEntry::Balance { address, prev });
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::CreateObject { address } => {
                self.accounts.remove(&address);
            }
            JournalEntry::ResetObject { address, prev } => {
                self.accounts.insert(address, *prev);
            }
            JournalEntry::Suicide { address, prev, prev_balance } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.suicided = prev;
                    account.balance = prev_balance;
                }
            }
            JournalEntry::Balance { address, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.balance = prev;
                }
            }
            JournalEntry::Nonce { address, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.nonce = prev;
                }
            }
            JournalEntry::Storage { address, key, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.storage.store(key, prev);
                }
            }
            JournalEntry::Code { address, prev_code, prev_hash } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.code = prev_code;
                    account.code_hash = prev_hash;
                }
            }
            JournalEntry::Refund { prev } => self.refund = prev,
            JournalEntry::AddLog { tx_hash } => {
                if let Some(logs) = self.logs.get_mut(&tx_hash) {
                    logs.pop();
                    if logs.is_empty() {
                        self.logs.remove(&tx_hash);
                    }
                }
                self.log_size -= 1;
            }
            JournalEntry::AddPreimage { hash } => {
                self.preimages.remove(&hash);
            }
            JournalEntry::Touch { .. } => {}
        }
    }
}

impl StateDb for MemoryState {
    fn create_account(&mut self, address: Address) {
        if let Some(prev) = self.create_object(address) {
            if let Some(account) = self.accounts.get_mut(&address) {
                account.balance = prev.balance;
            }
        }
    }

    fn sub_balance(&mut self, address: Address, amount: U256) {
        if amount.is_zero() {
            self.account_mut(address);
            return;
        }
        let balance = self.get_balance(address);
        self.set_balance(address, balance.wrapping_sub(amount));
    }

    fn add_balance(&mut self, address: Address, amount: U256) {
        if amount.is_zero() {
            if self.account_mut(address).is_empty() {
                self.journal.append(JournalEntry::Touch { address });
            }
            return;
        }
        let balance = self.get_balance(address);
        self.set_balance(address, balance.wrapping_add(amount));
    }

    fn get_balance(&self, address: Address) -> U256 {
        self.accounts.get(&address).map(|a| a.balance).unwrap_or_default()
    }

    fn get_nonce(&self, address: Address) -> u64 {
        self.accounts.get(&address).map(|a| a.nonce).unwrap_or_default()
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) {
        let account = self.account_mut(address);
        let prev = account.nonce;
        account.nonce = nonce;
        self.journal.append(JournalEntry::Nonce { address, prev });
    }

    fn get_code_hash(&self, address: Address) -> B256 {
        self.accounts.get(&address).map(|a| a.code_hash).unwrap_or_default()
    }

    fn get_code(&self, address: Address) -> Bytes {
        self.accounts.get(&address).map(|a| a.code.clone()).unwrap_or_default()
    }

    fn set_code(&mut self, address: Address, code: Bytes) {
        let hash = keccak256(&code);
        let account = self.account_mut(address);
        let prev_code = std::mem::replace(&mut account.code, code);
        let prev_hash = std::mem::replace(&mut account.code_hash, hash);
        self.journal.append(JournalEntry::Code { address, prev_code, prev_hash });
    }

    fn get_code_size(&self, address: Address) -> usize {
        self.accounts.get(&address).map(|a| a.code.len()).unwrap_or_default()
    }

    fn add_refund(&mut self, energy: u64) {
        self.journal.append(JournalEntry::Refund { prev: self.refund });
        self.refund += energy;
    }

    fn sub_refund(&mut self, energy: u64) {
        self.journal.append(JournalEntry::Refund { prev: self.refund });
        if energy > self.refund {
            panic!("refund counter below zero: {} - {}", self.refund, energy);
        }
        self.refund -= energy;
    }

    fn get_refund(&self) -> u64 {
        self.refund
    }

    fn get_committed_state(&self, address: Address, key: B256) -> B256 {
        self.accounts.get(&address).map(|a| a.storage.committed(&key)).unwrap_or_default()
    }

    fn get_state(&self, address: Address, key: B256) -> B256 {
        self.accounts.get(&address).map(|a| a.storage.load(&key)).unwrap_or_default()
    }

    fn set_state(&mut self, address: Address, key: B256, value: B256) {
        let account = self.account_mut(address);
        let prev = account.storage.load(&key);
        account.storage.store(key, value);
        self.journal.append(JournalEntry::Storage { address, key, prev });
    }

    fn suicide(&mut self, address: Address) -> bool {
        let Some(account) = self.accounts.get_mut(&address) else {
            return false;
        };
        let entry = JournalEntry::Suicide {
            address,
            prev: account.suicided,
            prev_balance: account.balance,
        };
        account.suicided = true;
        account.balance = U256::ZERO;
        self.journal.append(entry);
        true
    }

    fn has_suicided(&self, address: Address) -> bool {
        self.accounts.get(&address).map(|a| a.suicided).unwrap_or_default()
    }

    fn exist(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    fn empty(&self, address: Address) -> bool {
        self.accounts.get(&address).map(Account::is_empty).unwrap_or(true)
    }

    fn revert_to_snapshot(&mut self, id: usize) {
        let idx = match self.valid_revisions.binary_search_by_key(&id, |(rid, _)| *rid) {
            Ok(idx) => idx,
            Err(_) => panic!("revision id {id} cannot be reverted"),
        };
        let target = self.valid_revisions[idx].1;

        while self.journal.len() > target {
            match self.journal.pop() {
                Some(entry) => self.undo(entry),
                None => break,
            }
        }
        self.valid_revisions.truncate(idx);
        trace!("reverted state to snapshot {id}");
    }

    fn snapshot(&mut self) -> usize {
        let id = self.next_revision_id;
        self.next_revision_id += 1;
        self.valid_revisions.push((id, self.journal.len()));
        id
    }

    fn add_log(&mut self, mut log: Log) {
        self.journal.append(JournalEntry::AddLog { tx_hash: self.tx_hash });
        log.tx_hash = self.tx_hash;
        log.block_hash = self.block_hash;
        log.tx_index = self.tx_index;
        log.index = self.log_size;
        self.logs.entry(self.tx_hash).or_default().push(log);
        self.log_size += 1;
    }

    fn add_preimage(&mut self, hash: B256, preimage: Bytes) {
        if !self.preimages.contains_key(&hash) {
            self.journal.append(JournalEntry::AddPreimage { hash });
            self.preimages.insert(hash, preimage);
        }
    }

    fn for_each_storage(&self, address: Address, f: &mut dyn FnMut(B256, B256) -> bool) {
        let Some(account) = self.accounts.get(&address) else {
            return;
        };
        for (key, value) in account.storage.sorted() {
            if !f(key, value) {
                break;
            }
        }
    }
}

impl BlockState for MemoryState {
    fn prepare(&mut self, tx_hash: B256, block_hash: B256, tx_index: usize) {
        self.tx_hash = tx_hash;
        self.block_hash = block_hash;
        self.tx_index = tx_index;
    }

    fn logs(&self, tx_hash: B256) -> Vec<Log> {
        self.logs.get(&tx_hash).cloned().unwrap_or_default()
    }

    fn finalise(&mut self, delete_empty: bool) {
        for address in self.journal.dirty_accounts() {
            let Some(account) = self.accounts.get_mut(&address) else {
                continue;
            };
            if account.suicided || (delete_empty && account.is_empty()) {
                trace!("deleting account {address}");
                self.accounts.remove(&address);
            } else {
                account.storage.commit();
            }
        }
        self.journal.clear();
        self.valid_revisions.clear();
        self.refund = 0;
    }

    fn intermediate_root(&mut self, delete_empty: bool) -> B256 {
        self.finalise(delete_empty);

        let mut buf = Vec::with_capacity(self.accounts.len() * 124);
        for address in self.addresses() {
            let Some(account) = self.accounts.get(&address) else {
                continue;
            };
            let mut slots = Vec::new();
            for (key, value) in account.storage.sorted() {
                slots.extend_from_slice(key.as_slice());
                slots.extend_from_slice(value.as_slice());
            }

            buf.extend_from_slice(address.as_slice());
            buf.extend_from_slice(&account.nonce.to_be_bytes());
            buf.extend_from_slice(&account.balance.to_be_bytes::<32>());
            buf.extend_from_slice(account.code_hash.as_slice());
            buf.extend_from_slice(keccak256(&slots).as_slice());
        }
        keccak256(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    #[test]
    fn test_nested_snapshots() {
        let mut state = MemoryState::new();
        state.add_balance(addr(1), U256::from(100));

        let outer = state.snapshot();
        state.set_nonce(addr(1), 1);

        let inner = state.snapshot();
        state.set_state(addr(1), B256::ZERO, B256::with_last_byte(9));
        state.sub_balance(addr(1), U256::from(40));

        state.revert_to_snapshot(inner);
        assert_eq!(state.get_nonce(addr(1)), 1);
        assert_eq!(state.get_balance(addr(1)), U256::from(100));
        assert_eq!(state.get_state(addr(1), B256::ZERO), B256::ZERO);

        state.revert_to_snapshot(outer);
        assert_eq!(state.get_nonce(addr(1)), 0);
    }

    #[test]
    fn test_create_account_keeps_balance() {
        let mut state = MemoryState::new();
        state.add_balance(addr(1), U256::from(5));
        state.set_nonce(addr(1), 3);
        state.set_state(addr(1), B256::ZERO, B256::with_last_byte(1));

        state.create_account(addr(1));
        assert_eq!(state.get_balance(addr(1)), U256::from(5));
        assert_eq!(state.get_nonce(addr(1)), 0);
        assert_eq!(state.get_state(addr(1), B256::ZERO), B256::ZERO);
    }

    #[test]
    fn test_zero_add_balance_touches() {
        let mut state = MemoryState::new();
        state.add_balance(addr(2), U256::ZERO);
        assert!(state.exist(addr(2)));
        assert!(state.empty(addr(2)));

        state.finalise(true);
        assert!(!state.exist(addr(2)));
    }

    #[test]
    fn test_suicide_removed_on_finalise() {
        let mut state = MemoryState::new();
        state.add_balance(addr(3), U256::from(1));
        state.finalise(true);

        assert!(state.suicide(addr(3)));
        assert!(state.has_suicided(addr(3)));
        assert!(state.exist(addr(3)));
        assert_eq!(state.get_balance(addr(3)), U256::ZERO);

        state.finalise(false);
        assert!(!state.exist(addr(3)));
        assert!(!state.suicide(addr(4)));
    }

    #[test]
    fn test_committed_state_updates_on_finalise() {
        let mut state = MemoryState::new();
        let key = B256::with_last_byte(1);
        state.set_state(addr(1), key, B256::with_last_byte(2));
        assert_eq!(state.get_committed_state(addr(1), key), B256::ZERO);

        state.finalise(false);
        assert_eq!(state.get_committed_state(addr(1), key), B256::with_last_byte(2));
    }

    #[test]
    fn test_logs_are_reverted() {
        let mut state = MemoryState::new();
        let tx_hash = B256::with_last_byte(0xaa);
        state.prepare(tx_hash, B256::ZERO, 2);

        state.add_log(Log::new(addr(1), vec![], &[1], 0));
        let snapshot = state.snapshot();
        state.add_log(Log::new(addr(1), vec![], &[2], 0));
        state.revert_to_snapshot(snapshot);

        let logs = state.logs(tx_hash);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].tx_index, 2);
        assert_eq!(logs[0].index, 0);
    }

    #[test]
    fn test_refund_journaled() {
        let mut state = MemoryState::new();
        state.add_refund(10);
        let snapshot = state.snapshot();
        state.sub_refund(4);
        assert_eq!(state.get_refund(), 6);
        state.revert_to_snapshot(snapshot);
        assert_eq!(state.get_refund(), 10);
    }

    #[test]
    #[should_panic]
    fn test_refund_below_zero_panics() {
        let mut state = MemoryState::new();
        state.sub_refund(1);
    }

    #[test]
    fn test_root_is_deterministic() {
        let build = || {
            let mut state = MemoryState::new();
            state.add_balance(addr(2), U256::from(7));
            state.add_balance(addr(1), U256::from(3));
            state.set_code(addr(1), Bytes::from_static(&[0x00]));
            state
        };
        let root = build().intermediate_root(true);
        assert_eq!(root, build().intermediate_root(true));

        let mut other = build();
        other.set_nonce(addr(2), 1);
        assert_ne!(root, other.intermediate_root(true));
    }

    #[test]
    fn test_code_hash_of_missing_account_is_zero() {
        let mut state = MemoryState::new();
        assert_eq!(state.get_code_hash(addr(1)), B256::ZERO);
        state.create_account(addr(1));
        assert_eq!(state.get_code_hash(addr(1)), EMPTY_CODE_HASH);
    }
}
