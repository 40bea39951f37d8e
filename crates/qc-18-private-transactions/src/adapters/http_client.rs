//! # HTTP Payload-Exchange Client
//!
//! JSON-over-HTTP client of the payload-exchange service.
//!
//! | Operation | Request | Response |
//! |-----------|---------|----------|
//! | send | `POST {url}/send` | `{"key": <b64 hash>}` |
//! | receive | `GET {url}/transaction/{url-safe b64 hash}` | payload + metadata, `404` if not a participant |
//! | is sender | `GET {url}/transaction/{url-safe b64 hash}/isSender` | `true` / `false` |
//!
//! Payloads and hashes travel as standard base64.

use crate::config::ExchangeConfig;
use crate::domain::entities::{ExtraMetadata, PrivacyFlag};
use crate::domain::value_objects::{Bytes, EncryptedPayloadHash, Hash};
use crate::errors::ExchangeError;
use crate::ports::outbound::PayloadExchangeClient;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use quantum_telemetry::{metric_inc, time_histogram, EXCHANGE_REQUESTS, EXCHANGE_REQUEST_DURATION};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

// =============================================================================
// WIRE TYPES
// =============================================================================

/// `POST /send` body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Base64 payload.
    pub payload: String,
    /// Sender public key.
    pub from: String,
    /// Recipient public keys.
    pub to: Vec<String>,
    /// Base64 affiliated-consortium hashes.
    #[serde(default)]
    pub affected_contract_transactions: Vec<String>,
    /// Base64 merkle root, empty if none.
    #[serde(default)]
    pub exec_hash: String,
    /// Privacy flag.
    #[serde(default)]
    pub privacy_flag: u64,
}

/// `POST /send` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    /// Base64 hash the payload was stored under.
    pub key: String,
}

/// `GET /transaction/{hash}` response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveResponse {
    /// Base64 payload.
    pub payload: String,
    /// Base64 affiliated-consortium hashes.
    #[serde(default)]
    pub affected_contract_transactions: Vec<String>,
    /// Base64 merkle root, empty if none.
    #[serde(default)]
    pub exec_hash: String,
    /// Privacy flag.
    #[serde(default)]
    pub privacy_flag: u64,
}

impl SendRequest {
    /// Builds the body for a send.
    #[must_use]
    pub fn new(payload: &[u8], from: &str, to: &[String], metadata: &ExtraMetadata) -> Self {
        Self {
            payload: BASE64.encode(payload),
            from: from.to_string(),
            to: to.to_vec(),
            affected_contract_transactions: metadata
                .ac_hashes
                .iter()
                .map(EncryptedPayloadHash::to_base64)
                .collect(),
            exec_hash: metadata
                .ac_merkle_root
                .map(|root| BASE64.encode(root.as_bytes()))
                .unwrap_or_default(),
            privacy_flag: metadata.privacy_flag.0,
        }
    }
}

impl ReceiveResponse {
    /// Decodes the payload and metadata.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeError::Decode` on bad base64 or a merkle root of the
    /// wrong length.
    pub fn decode(self) -> Result<(Bytes, ExtraMetadata), ExchangeError> {
        let payload = BASE64
            .decode(&self.payload)
            .map_err(|e| ExchangeError::Decode(format!("payload: {e}")))?;

        let ac_hashes = self
            .affected_contract_transactions
            .iter()
            .map(|h| EncryptedPayloadHash::from_base64(h))
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|e| ExchangeError::Decode(format!("affected contract hash: {e}")))?;

        let ac_merkle_root = if self.exec_hash.is_empty() {
            None
        } else {
            let raw = BASE64
                .decode(&self.exec_hash)
                .map_err(|e| ExchangeError::Decode(format!("exec hash: {e}")))?;
            Some(Hash::from_slice(&raw).ok_or_else(|| {
                ExchangeError::Decode(format!("exec hash is {} bytes", raw.len()))
            })?)
        };

        Ok((
            Bytes(payload),
            ExtraMetadata {
                ac_hashes,
                ac_merkle_root,
                privacy_flag: PrivacyFlag(self.privacy_flag),
            },
        ))
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client of the payload-exchange service.
#[derive(Debug, Clone)]
pub struct HttpExchangeClient {
    client: Client,
    base_url: String,
}

impl HttpExchangeClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeError::Http` if the TLS backend cannot be initialised.
    pub fn new(config: &ExchangeConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(ExchangeError::Http)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests go to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transaction_url(&self, hash: &EncryptedPayloadHash) -> String {
        format!("{}/transaction/{}", self.base_url, hash.to_url_safe())
    }

    fn map_send_error(&self, e: reqwest::Error) -> ExchangeError {
        if e.is_connect() {
            ExchangeError::Connection(format!("Cannot connect to {}", self.base_url))
        } else {
            ExchangeError::Http(e)
        }
    }

    async fn error_status(response: reqwest::Response) -> ExchangeError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ExchangeError::Status { status, body }
    }
}

#[async_trait]
impl PayloadExchangeClient for HttpExchangeClient {
    #[instrument(skip(self, payload, metadata), fields(len = payload.len()))]
    async fn send_payload(
        &self,
        payload: &[u8],
        from: &str,
        to: &[String],
        metadata: &ExtraMetadata,
    ) -> Result<EncryptedPayloadHash, ExchangeError> {
        let _timer = time_histogram!(EXCHANGE_REQUEST_DURATION);
        let request = SendRequest::new(payload, from, to, metadata);

        let result = async {
            let response = self
                .client
                .post(format!("{}/send", self.base_url))
                .json(&request)
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;

            if !response.status().is_success() {
                return Err(Self::error_status(response).await);
            }

            let body: SendResponse = response
                .json()
                .await
                .map_err(|e| ExchangeError::Decode(e.to_string()))?;
            EncryptedPayloadHash::from_base64(&body.key)
                .map_err(|e| ExchangeError::Decode(format!("key: {e}")))
        }
        .await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metric_inc!(EXCHANGE_REQUESTS, &["send", outcome]);
        result
    }

    #[instrument(skip(self, hash), fields(hash = %hash))]
    async fn receive_payload(
        &self,
        hash: &EncryptedPayloadHash,
    ) -> Result<Option<(Bytes, ExtraMetadata)>, ExchangeError> {
        let _timer = time_histogram!(EXCHANGE_REQUEST_DURATION);

        let result = async {
            let response = self
                .client
                .get(self.transaction_url(hash))
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;

            if response.status() == StatusCode::NOT_FOUND {
                debug!("Payload not held for this node");
                return Ok(None);
            }
            if !response.status().is_success() {
                return Err(Self::error_status(response).await);
            }

            let body: ReceiveResponse = response
                .json()
                .await
                .map_err(|e| ExchangeError::Decode(e.to_string()))?;
            body.decode().map(Some)
        }
        .await;

        let outcome = match &result {
            Ok(Some(_)) => "ok",
            Ok(None) => "not_found",
            Err(_) => "error",
        };
        metric_inc!(EXCHANGE_REQUESTS, &["receive", outcome]);
        result
    }

    #[instrument(skip(self, hash), fields(hash = %hash))]
    async fn is_sender(&self, hash: &EncryptedPayloadHash) -> Result<bool, ExchangeError> {
        let result = async {
            let response = self
                .client
                .get(format!("{}/isSender", self.transaction_url(hash)))
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;

            if !response.status().is_success() {
                return Err(Self::error_status(response).await);
            }

            let text = response.text().await.map_err(ExchangeError::Http)?;
            match text.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(ExchangeError::Decode(format!("isSender answered {other:?}"))),
            }
        }
        .await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metric_inc!(EXCHANGE_REQUESTS, &["is_sender", outcome]);
        result
    }

    fn name(&self) -> &'static str {
        "http-exchange"
    }
}

// =============================================================================
// TESTS
// =============================================================================
