//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the private execution path depends on:
//! - The payload-exchange wire client
//! - The transaction manager seam used by execution and state extension
//! - Mutable state stores (public and private)
//! - The execution engine
//!
//! Adapters implement these; the domain never sees a concrete service.

use crate::domain::entities::{
    BlockContext, ContractPrivacyMetadata, ExtraMetadata, Log, ReceivedPayload, SnapshotId,
};
use crate::domain::value_objects::{Address, Bytes, EncryptedPayloadHash, Hash, U256};
use crate::errors::{ExchangeError, ManagerError, StateError, VmError};
use async_trait::async_trait;

// =============================================================================
// PAYLOAD EXCHANGE (wire level)
// =============================================================================

/// Wire-level client of the external payload-exchange service.
///
/// Calls block for one network round trip. Callers must not hold a state
/// store lock across them.
#[async_trait]
pub trait PayloadExchangeClient: Send + Sync {
    /// Publishes `payload` from `from` to the `to` recipients.
    ///
    /// # Returns
    ///
    /// The content hash the service stored the payload under.
    async fn send_payload(
        &self,
        payload: &[u8],
        from: &str,
        to: &[String],
        metadata: &ExtraMetadata,
    ) -> Result<EncryptedPayloadHash, ExchangeError>;

    /// Fetches a payload by hash.
    ///
    /// # Returns
    ///
    /// * `Some((payload, metadata))` - This node is a participant
    /// * `None` - The service holds nothing for this node under that hash
    async fn receive_payload(
        &self,
        hash: &EncryptedPayloadHash,
    ) -> Result<Option<(Bytes, ExtraMetadata)>, ExchangeError>;

    /// Returns true if this node originally published the payload.
    async fn is_sender(&self, hash: &EncryptedPayloadHash) -> Result<bool, ExchangeError>;

    /// Diagnostic name of the service.
    fn name(&self) -> &'static str;
}

// =============================================================================
// PRIVATE TRANSACTION MANAGER
// =============================================================================

/// The single seam between execution and the payload-exchange service.
///
/// One instance is constructed at start-up and shared, behind an `Arc`, by
/// the state transition and the extension handler. Implementations must
/// tolerate concurrent use from parallel execution contexts.
#[async_trait]
pub trait PrivateTransactionManager: Send + Sync {
    /// Publishes a payload and returns its reference hash.
    async fn send(
        &self,
        payload: &[u8],
        from: &str,
        to: &[String],
        metadata: &ExtraMetadata,
    ) -> Result<EncryptedPayloadHash, ManagerError>;

    /// Distributes an already-signed payload.
    ///
    /// Implementations without this primitive return
    /// `ManagerError::Unsupported`.
    async fn send_signed(
        &self,
        hash: &EncryptedPayloadHash,
        to: &[String],
        metadata: &ExtraMetadata,
    ) -> Result<Bytes, ManagerError>;

    /// Resolves a reference hash.
    ///
    /// The zero hash resolves to `Some(ReceivedPayload::empty())` without a
    /// lookup. `None` means this node is not a participant.
    async fn receive(
        &self,
        hash: &EncryptedPayloadHash,
    ) -> Result<Option<ReceivedPayload>, ManagerError>;

    /// Resolves a reference hash bypassing any cache. May be unsupported.
    async fn receive_raw(
        &self,
        hash: &EncryptedPayloadHash,
    ) -> Result<Option<ReceivedPayload>, ManagerError>;

    /// Returns true if this node published the payload.
    async fn is_sender(&self, hash: &EncryptedPayloadHash) -> Result<bool, ManagerError>;

    /// Diagnostic name of the implementation.
    fn name(&self) -> &'static str;
}

// =============================================================================
// STATE STORE
// =============================================================================

/// Mutable account state with snapshot and revert.
///
/// A snapshot stays valid until it, or an earlier snapshot, is reverted.
/// Only the execution context that took a snapshot may write between the
/// snapshot and its revert.
pub trait StateDb: Send {
    /// Takes a rollback point.
    fn snapshot(&mut self) -> SnapshotId;

    /// Undoes every write made after `id` was taken.
    ///
    /// # Errors
    ///
    /// Returns `StateError::InvalidSnapshot` for an unknown or stale id.
    fn revert_to_snapshot(&mut self, id: SnapshotId) -> Result<(), StateError>;

    /// Keeps every write made after `id` and forgets `id` and any later
    /// rollback points. Stores without rollback bookkeeping ignore it.
    fn discard_snapshot(&mut self, _id: SnapshotId) {}

    /// Returns true if the account has ever been written.
    fn exists(&self, address: &Address) -> bool;

    /// Account balance, zero if absent.
    fn balance(&self, address: &Address) -> U256;

    /// Account nonce, zero if absent.
    fn nonce(&self, address: &Address) -> u64;

    /// Account code, empty if absent.
    fn code(&self, address: &Address) -> Bytes;

    /// Storage slot, zero if unset.
    fn storage(&self, address: &Address, key: &Hash) -> Hash;

    /// Privacy metadata of a contract.
    fn privacy_metadata(&self, address: &Address) -> Option<ContractPrivacyMetadata>;

    /// Sets the balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn set_balance(&mut self, address: Address, balance: U256) -> Result<(), StateError>;

    /// Sets the nonce.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), StateError>;

    /// Sets the code.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError>;

    /// Sets one storage slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn set_storage(&mut self, address: Address, key: Hash, value: Hash) -> Result<(), StateError>;

    /// Attaches privacy metadata to a contract.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn set_privacy_metadata(
        &mut self,
        address: Address,
        metadata: ContractPrivacyMetadata,
    ) -> Result<(), StateError>;
}

// =============================================================================
// EXECUTION ENGINE
// =============================================================================

/// Both state views available during execution.
pub struct ExecutionContext<'a> {
    /// State every node agrees on.
    pub public: &'a mut dyn StateDb,
    /// State visible to participants only.
    pub private: &'a mut dyn StateDb,
    /// Execute against the private view.
    pub is_private: bool,
    /// Current block.
    pub block: &'a BlockContext,
}

impl ExecutionContext<'_> {
    /// The view contract code and storage resolve against.
    pub fn state(&mut self) -> &mut dyn StateDb {
        if self.is_private {
            &mut *self.private
        } else {
            &mut *self.public
        }
    }
}

/// A resolved call handed to the engine.
#[derive(Clone, Debug)]
pub struct Call {
    /// Caller.
    pub from: Address,
    /// Callee, None for creation.
    pub to: Option<Address>,
    /// Caller nonce before this transaction.
    pub nonce: u64,
    /// Value transferred.
    pub value: U256,
    /// Gas available after intrinsic cost.
    pub gas: u64,
    /// Calldata or init code.
    pub input: Bytes,
}

/// What the engine reports back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Return data.
    pub return_data: Bytes,
    /// Gas used by execution, intrinsic cost excluded.
    pub gas_used: u64,
    /// Execution reverted or ran out of gas.
    pub reverted: bool,
    /// Logs emitted.
    pub logs: Vec<Log>,
    /// Contracts created.
    pub created_contracts: Vec<Address>,
    /// Contracts that existed before the call and were called into.
    pub affected_contracts: Vec<Address>,
}

/// The EVM seam.
pub trait MessageExecutor: Send + Sync {
    /// Runs `call` against `ctx`.
    ///
    /// # Errors
    ///
    /// Only fatal failures are errors; reverts are reported in the outcome.
    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        call: &Call,
    ) -> Result<ExecutionOutcome, VmError>;
}
