//! # Caching Exchange Manager
//!
//! `PrivateTransactionManager` over a `PayloadExchangeClient` with a
//! time-expiring payload cache.
//!
//! - `send` populates the cache with what was just sent.
//! - `receive` short-circuits the zero hash, then serves from cache, then
//!   falls back to the exchange and caches what it gets.
//! - Entries older than the TTL are ignored on read and removed by a
//!   background sweeper; a request never waits on the sweep.

use crate::domain::entities::{ExtraMetadata, ReceivedPayload};
use crate::domain::value_objects::{Bytes, EncryptedPayloadHash};
use crate::errors::ManagerError;
use crate::ports::outbound::{PayloadExchangeClient, PrivateTransactionManager};
use async_trait::async_trait;
use dashmap::DashMap;
use quantum_telemetry::{
    metric_inc, metric_observe, PAYLOAD_CACHE_ENTRIES, PAYLOAD_CACHE_EVICTIONS,
    PAYLOAD_CACHE_HITS, PAYLOAD_CACHE_MISSES, PAYLOAD_SIZE_BYTES,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, instrument};

// =============================================================================
// PAYLOAD CACHE
// =============================================================================

/// A cached payload and the metadata it was sent or received with.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    /// Payload bytes.
    pub payload: Bytes,
    /// Metadata.
    pub metadata: ExtraMetadata,
    /// When the entry was stored.
    pub inserted_at: Instant,
}

/// Concurrent payload cache keyed by payload hash.
#[derive(Debug)]
pub struct PayloadCache {
    entries: DashMap<EncryptedPayloadHash, CacheEntry>,
    ttl: Duration,
}

impl PayloadCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Entry time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores or refreshes an entry.
    pub fn insert(&self, hash: EncryptedPayloadHash, payload: Bytes, metadata: ExtraMetadata) {
        self.entries.insert(
            hash,
            CacheEntry {
                payload,
                metadata,
                inserted_at: Instant::now(),
            },
        );
        PAYLOAD_CACHE_ENTRIES.set(self.entries.len() as f64);
    }

    /// Returns a live entry. An expired entry is dropped and reported as
    /// absent.
    #[must_use]
    pub fn get(&self, hash: &EncryptedPayloadHash) -> Option<CacheEntry> {
        let entry = self.entries.get(hash)?.value().clone();
        if entry.inserted_at.elapsed() > self.ttl {
            self.entries
                .remove_if(hash, |_, e| e.inserted_at == entry.inserted_at);
            return None;
        }
        Some(entry)
    }

    /// Removes every expired entry. Returns the number removed.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            if now.duration_since(entry.inserted_at) > self.ttl {
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            PAYLOAD_CACHE_EVICTIONS.inc_by(removed as f64);
        }
        PAYLOAD_CACHE_ENTRIES.set(self.entries.len() as f64);
        removed
    }

    /// Number of entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Background sweep loop. Runs until the task is aborted.
pub async fn cleanup_task(cache: Arc<PayloadCache>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let removed = cache.remove_expired();
        if removed > 0 {
            debug!(removed = removed, "Evicted expired payload cache entries");
        }
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Caching manager over a payload-exchange client.
pub struct CachingExchangeManager<C> {
    client: C,
    cache: Arc<PayloadCache>,
}

impl<C: PayloadExchangeClient> CachingExchangeManager<C> {
    /// Wraps `client` with a cache of the given TTL.
    #[must_use]
    pub fn new(client: C, ttl: Duration) -> Self {
        Self {
            client,
            cache: Arc::new(PayloadCache::new(ttl)),
        }
    }

    /// The wrapped client.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The cache, shared with the sweeper.
    #[must_use]
    pub fn cache(&self) -> &Arc<PayloadCache> {
        &self.cache
    }

    /// Spawns the background sweeper on the current tokio runtime.
    ///
    /// The caller owns the handle and aborts it on shutdown.
    #[must_use]
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(cleanup_task(Arc::clone(&self.cache), interval))
    }
}

#[async_trait]
impl<C: PayloadExchangeClient> PrivateTransactionManager for CachingExchangeManager<C> {
    #[instrument(skip(self, payload, metadata), fields(len = payload.len()))]
    async fn send(
        &self,
        payload: &[u8],
        from: &str,
        to: &[String],
        metadata: &ExtraMetadata,
    ) -> Result<EncryptedPayloadHash, ManagerError> {
        let hash = self.client.send_payload(payload, from, to, metadata).await?;
        metric_observe!(PAYLOAD_SIZE_BYTES, &["sent"], payload.len() as f64);
        self.cache
            .insert(hash, Bytes::from_slice(payload), metadata.clone());
        debug!(hash = %hash, "Payload sent and cached");
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

    #[instrument(skip(self, hash), fields(hash = %hash))]
    async fn receive(
        &self,
        hash: &EncryptedPayloadHash,
    ) -> Result<Option<ReceivedPayload>, ManagerError> {
        if hash.is_zero() {
            return Ok(Some(ReceivedPayload::empty()));
        }

        if let Some(entry) = self.cache.get(hash) {
            metric_inc!(PAYLOAD_CACHE_HITS);
            debug!("Payload cache hit");
            return Ok(Some(ReceivedPayload {
                payload: entry.payload,
                metadata: Some(entry.metadata),
            }));
        }

        metric_inc!(PAYLOAD_CACHE_MISSES);
        debug!("Payload cache miss");

        match self.client.receive_payload(hash).await? {
            Some((payload, metadata)) => {
                metric_observe!(PAYLOAD_SIZE_BYTES, &["received"], payload.len() as f64);
                self.cache.insert(*hash, payload.clone(), metadata.clone());
                Ok(Some(ReceivedPayload {
                    payload,
                    metadata: Some(metadata),
                }))
            }
            None => Ok(None),
        }
    }

    async fn receive_raw(
        &self,
        _hash: &EncryptedPayloadHash,
    ) -> Result<Option<ReceivedPayload>, ManagerError> {
        Err(ManagerError::Unsupported("receive_raw"))
    }

    async fn is_sender(&self, hash: &EncryptedPayloadHash) -> Result<bool, ManagerError> {
        Ok(self.client.is_sender(hash).await?)
    }

    fn name(&self) -> &'static str {
        "caching-exchange"
    }
}

// =============================================================================
// TESTS
// =============================================================================
