//! # Scripted Manager
//!
//! `PrivateTransactionManager` whose answers are programmed per hash, with
//! call recording. Used to drive the state transition and the extension
//! handler through paths a real exchange rarely produces.

use crate::domain::entities::{ExtraMetadata, ReceivedPayload};
use crate::domain::value_objects::{Bytes, EncryptedPayloadHash};
use crate::errors::{ExchangeError, ManagerError};
use crate::ports::outbound::PrivateTransactionManager;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Programmed answer.
#[derive(Clone, Debug)]
pub enum MockAnswer<T> {
    /// Succeed with a value.
    Return(T),
    /// Fail as if the exchange were unreachable.
    Fail(String),
}

impl<T> MockAnswer<T> {
    fn into_result(self) -> Result<T, ManagerError> {
        match self {
            Self::Return(value) => Ok(value),
            Self::Fail(reason) => Err(ManagerError::Exchange(ExchangeError::Connection(reason))),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    receive: HashMap<EncryptedPayloadHash, MockAnswer<Option<ReceivedPayload>>>,
    is_sender: HashMap<EncryptedPayloadHash, MockAnswer<bool>>,
    receive_calls: Vec<EncryptedPayloadHash>,
    is_sender_calls: Vec<EncryptedPayloadHash>,
}

/// Scripted manager.
///
/// Unprogrammed `receive` answers `None`, unprogrammed `is_sender` answers
/// `false`. The zero hash resolves to an empty payload without being
/// recorded.
#[derive(Debug, Default)]
pub struct MockPrivateTransactionManager {
    state: Mutex<MockState>,
}

impl MockPrivateTransactionManager {
    /// Create a manager with no programmed answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs `receive(hash)` to return a payload.
    pub fn when_receive(&self, hash: EncryptedPayloadHash, payload: &[u8], metadata: Option<ExtraMetadata>) {
        self.state.lock().receive.insert(
            hash,
            MockAnswer::Return(Some(ReceivedPayload {
                payload: Bytes::from_slice(payload),
                metadata,
            })),
        );
    }

    /// Programs `receive(hash)` with an arbitrary answer.
    pub fn when_receive_answer(
        &self,
        hash: EncryptedPayloadHash,
        answer: MockAnswer<Option<ReceivedPayload>>,
    ) {
        self.state.lock().receive.insert(hash, answer);
    }

    /// Programs `is_sender(hash)`.
    pub fn when_is_sender(&self, hash: EncryptedPayloadHash, answer: MockAnswer<bool>) {
        self.state.lock().is_sender.insert(hash, answer);
    }

    /// Hashes passed to `receive`, in call order.
    #[must_use]
    pub fn receive_calls(&self) -> Vec<EncryptedPayloadHash> {
        self.state.lock().receive_calls.clone()
    }

    /// Hashes passed to `is_sender`, in call order.
    #[must_use]
    pub fn is_sender_calls(&self) -> Vec<EncryptedPayloadHash> {
        self.state.lock().is_sender_calls.clone()
    }
}

#[async_trait]
impl PrivateTransactionManager for MockPrivateTransactionManager {
    async fn send(
        &self,
        payload: &[u8],
        _from: &str,
        _to: &[String],
        metadata: &ExtraMetadata,
    ) -> Result<EncryptedPayloadHash, ManagerError> {
        let hash = EncryptedPayloadHash::from_bytes_padded(payload);
        self.when_receive(hash, payload, Some(metadata.clone()));
        Ok(hash)
    }

    async fn send_signed(
        &self,
        _hash: &EncryptedPayloadHash,
        _to: &[String],
        _metadata: &ExtraMetadata,
    ) -> Result<Bytes, ManagerError> {
        Err(ManagerError::Unsupported("send_signed"))
    }

    async fn receive(
        &self,
        hash: &EncryptedPayloadHash,
    ) -> Result<Option<ReceivedPayload>, ManagerError> {
        if hash.is_zero() {
            return Ok(Some(ReceivedPayload::empty()));
        }
        let mut state = self.state.lock();
        state.receive_calls.push(*hash);
        state
            .receive
            .get(hash)
            .cloned()
            .map_or(Ok(None), MockAnswer::into_result)
    }

    async fn receive_raw(
        &self,
        hash: &EncryptedPayloadHash,
    ) -> Result<Option<ReceivedPayload>, ManagerError> {
        self.receive(hash).await
    }

    async fn is_sender(&self, hash: &EncryptedPayloadHash) -> Result<bool, ManagerError> {
        let mut state = self.state.lock();
        state.is_sender_calls.push(*hash);
        state
            .is_sender
            .get(hash)
            .cloned()
            .map_or(Ok(false), MockAnswer::into_result)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
