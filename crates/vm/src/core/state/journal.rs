use alloy::primitives::{Address, Bytes, B256, U256};
use hashbrown::HashMap;

use super::memory::Account;

/// A single reversible mutation of a [`super::MemoryState`].
#[derive(Clone, Debug)]
pub(crate) enum JournalEntry {
    /// A new account was created where none existed.
    CreateObject { address: Address },
    /// An existing account was replaced by a fresh one.
    ResetObject { address: Address, prev: Box<Account> },
    Suicide { address: Address, prev: bool, prev_balance: U256 },
    Balance { address: Address, prev: U256 },
    Nonce { address: Address, prev: u64 },
    Storage { address: Address, key: B256, prev: B256 },
    Code { address: Address, prev_code: Bytes, prev_hash: B256 },
    Refund { prev: u64 },
    AddLog { tx_hash: B256 },
    AddPreimage { hash: B256 },
    Touch { address: Address },
}

impl JournalEntry {
    /// The account this entry dirties, if any.
    fn dirtied(&self) -> Option<Address> {
        match self {
            JournalEntry::CreateObject { address } |
            JournalEntry::ResetObject { address, .. } |
            JournalEntry::Suicide { address, .. } |
            JournalEntry::Balance { address, .. } |
            JournalEntry::Nonce { address, .. } |
            JournalEntry::Storage { address, .. } |
            JournalEntry::Code { address, .. } |
            JournalEntry::Touch { address } => Some(*address),
            JournalEntry::Refund { .. } |
            JournalEntry::AddLog { .. } |
            JournalEntry::AddPreimage { .. } => None,
        }
    }
}

/// An ordered list of state mutations, plus the number of entries touching each account.
#[derive(Clone, Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<JournalEntry>,
    dirties: HashMap<Address, usize>,
}

impl Journal {
    pub(crate) fn append(&mut self, entry: JournalEntry) {
        if let Some(address) = entry.dirtied() {
            *self.dirties.entry(address).or_insert(0) += 1;
        }
        self.entries.push(entry);
    }

    /// Removes and returns the newest entry.
    pub(crate) fn pop(&mut self) -> Option<JournalEntry> {
        let entry = self.entries.pop()?;
        if let Some(address) = entry.dirtied() {
            if let Some(count) = self.dirties.get_mut(&address) {
                *count -= 1;
                if *count == 0 {
                    self.dirties.remove(&address);
                }
            }
        }
        Some(entry)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// The accounts touched since the journal was last cleared.
    pub(crate) fn dirty_accounts(&self) -> Vec<Address> {
        self.dirties.keys().copied().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.dirties.clear();
    }
}
