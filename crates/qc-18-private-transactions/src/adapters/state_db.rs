//! # In-Memory State Store
//!
//! Journalled `StateDb` for tests and local development. The node runtime
//! plugs its own trie-backed store in through the same port.
//!
//! Every write records the account's previous value; a snapshot is a
//! journal length, and reverting replays the journal backwards. Once the
//! outermost snapshot is discarded the journal is dropped, so a store
//! driven only through `apply_message` stays bounded.

use crate::domain::entities::{AccountState, ContractPrivacyMetadata, SnapshotId};
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::StateError;
use crate::ports::outbound::StateDb;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Clone, Debug)]
struct JournalEntry {
    address: Address,
    previous: Option<AccountState>,
}

/// In-memory state with nested snapshots.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStateDb {
    accounts: HashMap<Address, AccountState>,
    journal: Vec<JournalEntry>,
    snapshots: Vec<usize>,
    rejected: HashSet<Address>,
}

impl InMemoryStateDb {
    /// Create a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account without journalling.
    #[must_use]
    pub fn with_account(mut self, address: Address, account: AccountState) -> Self {
        self.accounts.insert(address, account);
        self
    }

    /// Makes every later write to `address` fail with `WriteRejected`.
    pub fn reject_writes_to(&mut self, address: Address) {
        self.rejected.insert(address);
    }

    /// Returns a copy of one account.
    #[must_use]
    pub fn account(&self, address: &Address) -> Option<AccountState> {
        self.accounts.get(address).cloned()
    }

    /// Sorted copy of every account, for comparisons.
    #[must_use]
    pub fn dump(&self) -> BTreeMap<Address, AccountState> {
        self.accounts
            .iter()
            .map(|(addr, account)| (*addr, account.clone()))
            .collect()
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if no account exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Writes still held for rollback.
    #[must_use]
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Live rollback points.
    #[must_use]
    pub fn open_snapshots(&self) -> usize {
        self.snapshots.len()
    }

    fn modify<F>(&mut self, address: Address, f: F) -> Result<(), StateError>
    where
        F: FnOnce(&mut AccountState),
    {
        if self.rejected.contains(&address) {
            return Err(StateError::WriteRejected {
                address,
                reason: "writes disabled for account".to_string(),
            });
        }

        let previous = self.accounts.get(&address).cloned();
        self.journal.push(JournalEntry { address, previous });
        f(self.accounts.entry(address).or_default());
        Ok(())
    }
}

impl StateDb for InMemoryStateDb {
    fn snapshot(&mut self) -> SnapshotId {
        self.snapshots.push(self.journal.len());
        SnapshotId(self.snapshots.len() - 1)
    }

    fn revert_to_snapshot(&mut self, id: SnapshotId) -> Result<(), StateError> {
        let Some(&mark) = self.snapshots.get(id.0) else {
            return Err(StateError::InvalidSnapshot(id.0));
        };

        while self.journal.len() > mark {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry.previous {
                Some(account) => {
                    self.accounts.insert(entry.address, account);
                }
                None => {
                    self.accounts.remove(&entry.address);
                }
            }
        }
        self.snapshots.truncate(id.0);
        Ok(())
    }

    fn discard_snapshot(&mut self, id: SnapshotId) {
        self.snapshots.truncate(id.0);
        if self.snapshots.is_empty() {
            self.journal.clear();
        }
    }

    fn exists(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn balance(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map_or_else(U256::zero, |a| a.balance)
    }

    fn nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |a| a.nonce)
    }

    fn code(&self, address: &Address) -> Bytes {
        self.accounts
            .get(address)
            .map(|a| a.code.clone())
            .unwrap_or_default()
    }

    fn storage(&self, address: &Address, key: &Hash) -> Hash {
        self.accounts
            .get(address)
            .and_then(|a| a.storage.get(key).copied())
            .unwrap_or_default()
    }

    fn privacy_metadata(&self, address: &Address) -> Option<ContractPrivacyMetadata> {
        self.accounts.get(address).and_then(|a| a.privacy_metadata)
    }

    fn set_balance(&mut self, address: Address, balance: U256) -> Result<(), StateError> {
        self.modify(address, |a| a.balance = balance)
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), StateError> {
        self.modify(address, |a| a.nonce = nonce)
    }

    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        self.modify(address, |a| a.code = code)
    }

    fn set_storage(&mut self, address: Address, key: Hash, value: Hash) -> Result<(), StateError> {
        self.modify(address, |a| {
            if value.is_zero() {
                a.storage.remove(&key);
            } else {
                a.storage.insert(key, value);
            }
        })
    }

    fn set_privacy_metadata(
        &mut self,
        address: Address,
        metadata: ContractPrivacyMetadata,
    ) -> Result<(), StateError> {
        self.modify(address, |a| a.privacy_metadata = Some(metadata))
    }
}
