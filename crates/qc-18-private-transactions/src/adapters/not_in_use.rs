//! # Not-In-Use Manager
//!
//! Manager selected when the node runs without a payload exchange. Such a
//! node is a participant in nothing: `receive` answers "not found" (the zero
//! hash still resolves to an empty payload), so private transactions apply
//! as no-ops. Publishing and the remaining lookups fail with
//! `ManagerError::NotInUse`.

use crate::domain::entities::{ExtraMetadata, ReceivedPayload};
use crate::domain::value_objects::{Bytes, EncryptedPayloadHash};
use crate::errors::ManagerError;
use crate::ports::outbound::PrivateTransactionManager;
use async_trait::async_trait;

/// Manager for nodes without a payload exchange.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotInUseManager;

#[async_trait]
impl PrivateTransactionManager for NotInUseManager {
    async fn send(
        &self,
        _payload: &[u8],
        _from: &str,
        _to: &[String],
        _metadata: &ExtraMetadata,
    ) -> Result<EncryptedPayloadHash, ManagerError> {
        Err(ManagerError::NotInUse)
    }

    async fn send_signed(
        &self,
        _hash: &EncryptedPayloadHash,
        _to: &[String],
        _metadata: &ExtraMetadata,
    ) -> Result<Bytes, ManagerError> {
        Err(ManagerError::NotInUse)
    }

    async fn receive(
        &self,
        hash: &EncryptedPayloadHash,
    ) -> Result<Option<ReceivedPayload>, ManagerError> {
        if hash.is_zero() {
            return Ok(Some(ReceivedPayload::empty()));
        }
        Ok(None)
    }

    async fn receive_raw(
        &self,
        _hash: &EncryptedPayloadHash,
    ) -> Result<Option<ReceivedPayload>, ManagerError> {
        Err(ManagerError::NotInUse)
    }

    async fn is_sender(&self, _hash: &EncryptedPayloadHash) -> Result<bool, ManagerError> {
        Err(ManagerError::NotInUse)
    }

    fn name(&self) -> &'static str {
        "not-in-use"
    }
}
