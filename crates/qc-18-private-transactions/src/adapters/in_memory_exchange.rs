//! # In-Memory Payload Exchange
//!
//! In-process `PayloadExchangeClient` for tests and local development.
//! Payloads are content-addressed by SHA3-512, so the same bytes always map
//! to the same 64-byte hash.

use crate::domain::entities::ExtraMetadata;
use crate::domain::value_objects::{Bytes, EncryptedPayloadHash};
use crate::errors::ExchangeError;
use crate::ports::outbound::PayloadExchangeClient;
use async_trait::async_trait;
use parking_lot::RwLock;
use sha3::{Digest, Sha3_512};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Clone, Debug)]
struct StoredPayload {
    payload: Bytes,
    metadata: ExtraMetadata,
    /// Published by this node.
    own: bool,
}

/// Round-trip counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExchangeCalls {
    /// `send_payload` calls.
    pub sends: usize,
    /// `receive_payload` calls.
    pub receives: usize,
    /// `is_sender` calls.
    pub sender_checks: usize,
}

/// In-memory exchange.
#[derive(Debug, Default)]
pub struct InMemoryExchange {
    payloads: RwLock<HashMap<EncryptedPayloadHash, StoredPayload>>,
    sends: AtomicUsize,
    receives: AtomicUsize,
    sender_checks: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryExchange {
    /// Create an empty exchange.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Content hash of `payload`.
    #[must_use]
    pub fn hash_of(payload: &[u8]) -> EncryptedPayloadHash {
        let digest = Sha3_512::digest(payload);
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&digest);
        EncryptedPayloadHash::new(bytes)
    }

    /// Stores a payload published by another node.
    pub fn insert_foreign(&self, payload: &[u8], metadata: ExtraMetadata) -> EncryptedPayloadHash {
        self.store(payload, metadata, false)
    }

    /// Forgets a payload, as if this node were never a recipient.
    pub fn forget(&self, hash: &EncryptedPayloadHash) -> bool {
        self.payloads.write().remove(hash).is_some()
    }

    /// Makes every call fail with a connection error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Round trips served so far.
    #[must_use]
    pub fn calls(&self) -> ExchangeCalls {
        ExchangeCalls {
            sends: self.sends.load(Ordering::SeqCst),
            receives: self.receives.load(Ordering::SeqCst),
            sender_checks: self.sender_checks.load(Ordering::SeqCst),
        }
    }

    fn store(&self, payload: &[u8], metadata: ExtraMetadata, own: bool) -> EncryptedPayloadHash {
        let hash = Self::hash_of(payload);
        self.payloads.write().insert(
            hash,
            StoredPayload {
                payload: Bytes::from_slice(payload),
                metadata,
                own,
            },
        );
        hash
    }

    fn check_available(&self) -> Result<(), ExchangeError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ExchangeError::Connection(
                "in-memory exchange marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PayloadExchangeClient for InMemoryExchange {
    async fn send_payload(
        &self,
        payload: &[u8],
        _from: &str,
        _to: &[String],
        metadata: &ExtraMetadata,
    ) -> Result<EncryptedPayloadHash, ExchangeError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.store(payload, metadata.clone(), true))
    }

    async fn receive_payload(
        &self,
        hash: &EncryptedPayloadHash,
    ) -> Result<Option<(Bytes, ExtraMetadata)>, ExchangeError> {
        self.receives.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self
            .payloads
            .read()
            .get(hash)
            .map(|stored| (stored.payload.clone(), stored.metadata.clone())))
    }

    async fn is_sender(&self, hash: &EncryptedPayloadHash) -> Result<bool, ExchangeError> {
        self.sender_checks.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.payloads.read().get(hash).is_some_and(|stored| stored.own))
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
