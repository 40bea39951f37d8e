//! # Core Domain Entities
//!
//! Business entities for private transaction execution: privacy flags, payload
//! metadata, messages, gas accounting and shared account snapshots.

use crate::domain::value_objects::{Address, Bytes, EncryptedPayloadHash, Hash, U256};
use crate::errors::TransitionError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// PRIVACY FLAG
// =============================================================================

/// Cross-node verification contract declared by a private transaction.
///
/// The flag is an open ordinal: values other than the named constants are
/// valid and compare numerically. A larger value demands stronger
/// verification.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivacyFlag(pub u64);

impl PrivacyFlag {
    /// Legacy behaviour, no cross-node checks.
    pub const STANDARD_PRIVATE: Self = Self(0);
    /// Every affected contract must belong to the same party set.
    pub const PARTY_PROTECTION: Self = Self(1);
    /// Party protection plus an attested merkle root of affected state.
    pub const STATE_VALIDATION: Self = Self(3);

    /// Returns true for the legacy flag.
    #[must_use]
    pub fn is_standard_private(self) -> bool {
        self == Self::STANDARD_PRIVATE
    }

    /// Returns true if affected contracts must be checked against the
    /// affiliated-consortium hashes.
    #[must_use]
    pub fn requires_party_protection(self) -> bool {
        self >= Self::PARTY_PROTECTION
    }

    /// Returns true if a merkle root must accompany the payload.
    #[must_use]
    pub fn requires_state_validation(self) -> bool {
        self >= Self::STATE_VALIDATION
    }
}

impl fmt::Debug for PrivacyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::STANDARD_PRIVATE => write!(f, "StandardPrivate"),
            Self::PARTY_PROTECTION => write!(f, "PartyProtection"),
            Self::STATE_VALIDATION => write!(f, "StateValidation"),
            Self(other) => write!(f, "PrivacyFlag({other})"),
        }
    }
}

impl fmt::Display for PrivacyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// PAYLOAD METADATA
// =============================================================================

/// Side information accompanying a sent or fetched payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraMetadata {
    /// Affiliated-consortium hashes: creation payloads of the contracts this
    /// payload is allowed to touch.
    pub ac_hashes: BTreeSet<EncryptedPayloadHash>,
    /// Merkle root of the affected contracts' state, if attested.
    pub ac_merkle_root: Option<Hash>,
    /// Flag the payload was published under.
    pub privacy_flag: PrivacyFlag,
}

impl ExtraMetadata {
    /// Metadata carrying only a flag.
    #[must_use]
    pub fn with_flag(privacy_flag: PrivacyFlag) -> Self {
        Self {
            privacy_flag,
            ..Self::default()
        }
    }
}

/// Privacy metadata attached to a transaction. Absent on transactions
/// created before privacy flags existed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPrivacyMetadata {
    /// Declared flag.
    pub privacy_flag: PrivacyFlag,
}

/// Privacy metadata stored against a contract in private state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractPrivacyMetadata {
    /// Reference hash of the payload that created the contract.
    pub creation_tx_hash: EncryptedPayloadHash,
    /// Flag the contract was created under.
    pub privacy_flag: PrivacyFlag,
}

/// A payload resolved through the transaction manager.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceivedPayload {
    /// Decrypted payload bytes.
    pub payload: Bytes,
    /// Metadata, if the exchange returned any.
    pub metadata: Option<ExtraMetadata>,
}

impl ReceivedPayload {
    /// The resolution of the zero sentinel.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the payload's flag, treating missing metadata as legacy.
    #[must_use]
    pub fn privacy_flag(&self) -> PrivacyFlag {
        self.metadata
            .as_ref()
            .map_or(PrivacyFlag::STANDARD_PRIVATE, |m| m.privacy_flag)
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// A transaction as seen by message application.
///
/// For a private transaction `data` is the reference hash of the real
/// payload, not the payload itself.
#[derive(Clone, Debug)]
pub struct Message {
    /// Recovered sender.
    pub from: Address,
    /// Recipient (None for contract creation).
    pub to: Option<Address>,
    /// Sender nonce.
    pub nonce: u64,
    /// Value transferred.
    pub value: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Gas price.
    pub gas_price: U256,
    /// On-chain data.
    pub data: Bytes,
    /// Whether the payload lives off-chain.
    pub is_private: bool,
    /// Declared privacy metadata.
    pub privacy_metadata: Option<TxPrivacyMetadata>,
    /// Transaction hash.
    pub hash: Hash,
}

impl Message {
    /// Returns true if this message creates a contract.
    #[must_use]
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Declared flag, legacy when the transaction carries none.
    #[must_use]
    pub fn declared_flag(&self) -> PrivacyFlag {
        self.privacy_metadata
            .map_or(PrivacyFlag::STANDARD_PRIVATE, |m| m.privacy_flag)
    }

    /// Reference hash of a private payload.
    #[must_use]
    pub fn payload_hash(&self) -> EncryptedPayloadHash {
        EncryptedPayloadHash::from_bytes_padded(self.data.as_slice())
    }
}

impl Default for Message {
    fn default() -> Self {
        Self {
            from: Address::ZERO,
            to: None,
            nonce: 0,
            value: U256::zero(),
            gas_limit: 21_000,
            gas_price: U256::zero(),
            data: Bytes::new(),
            is_private: false,
            privacy_metadata: None,
            hash: Hash::ZERO,
        }
    }
}

// =============================================================================
// BLOCK CONTEXT
// =============================================================================

/// Block-level information available during execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockContext {
    /// Block number.
    pub number: u64,
    /// Block timestamp (unix seconds).
    pub timestamp: u64,
    /// Block proposer.
    pub coinbase: Address,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Chain ID.
    pub chain_id: u64,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            coinbase: Address::ZERO,
            gas_limit: 30_000_000,
            chain_id: 1,
        }
    }
}

// =============================================================================
// GAS POOL
// =============================================================================

/// Gas still available in the block being processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasPool(u64);

impl GasPool {
    /// Creates a pool holding `gas`.
    #[must_use]
    pub const fn new(gas: u64) -> Self {
        Self(gas)
    }

    /// Returns the gas left in the pool.
    #[must_use]
    pub const fn gas(&self) -> u64 {
        self.0
    }

    /// Returns gas to the pool.
    pub fn add_gas(&mut self, amount: u64) -> &mut Self {
        self.0 = self.0.saturating_add(amount);
        self
    }

    /// Takes gas out of the pool.
    ///
    /// # Errors
    ///
    /// Returns `GasLimitReached` if the pool holds less than `amount`.
    pub fn sub_gas(&mut self, amount: u64) -> Result<(), TransitionError> {
        if self.0 < amount {
            return Err(TransitionError::GasLimitReached {
                requested: amount,
                available: self.0,
            });
        }
        self.0 -= amount;
        Ok(())
    }
}

// =============================================================================
// LOG (EVENT)
// =============================================================================

/// Emitted log (event) from contract execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log.
    pub address: Address,
    /// Indexed topics (up to 4).
    pub topics: Vec<Hash>,
    /// Non-indexed data.
    pub data: Bytes,
}

impl Log {
    /// Creates a new log.
    #[must_use]
    pub fn new(address: Address, topics: Vec<Hash>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
        }
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Rollback point in a mutable state store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(pub usize);

/// One account in a state store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountState {
    /// Balance.
    pub balance: U256,
    /// Nonce.
    pub nonce: u64,
    /// Contract code (empty for externally owned accounts).
    pub code: Bytes,
    /// Storage slots.
    pub storage: BTreeMap<Hash, Hash>,
    /// Privacy metadata (contracts created by protected transactions).
    pub privacy_metadata: Option<ContractPrivacyMetadata>,
}

impl AccountState {
    /// Returns true if the account holds code.
    #[must_use]
    pub fn is_contract(&self) -> bool {
        !self.code.is_empty()
    }
}

// =============================================================================
// MESSAGE OUTCOME
// =============================================================================

/// Result of applying one message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageOutcome {
    /// Return data.
    pub return_data: Bytes,
    /// Gas charged, intrinsic gas included.
    pub gas_used: u64,
    /// Receipt status is failure.
    pub failed: bool,
    /// Logs emitted.
    pub logs: Vec<Log>,
    /// Contracts created by the message.
    pub created_contracts: Vec<Address>,
}

// =============================================================================
// SHARED ACCOUNTS (STATE EXTENSION)
// =============================================================================

/// Account snapshot shipped by a node sharing private state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedAccountState {
    /// Decimal balance.
    #[serde(default)]
    pub balance: String,
    /// Nonce.
    #[serde(default)]
    pub nonce: u64,
    /// Hex-encoded code.
    #[serde(default)]
    pub code: String,
    /// Hex slot key to hex slot value.
    #[serde(default)]
    pub storage: BTreeMap<String, String>,
}

/// An account snapshot together with its privacy metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedAccount {
    /// State snapshot.
    pub state: SharedAccountState,
    /// Privacy metadata of the contract, if any.
    #[serde(default)]
    pub metadata: Option<ContractPrivacyMetadata>,
}

// =============================================================================
// TESTS
// =============================================================================
