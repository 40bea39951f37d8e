//! # State Extension Handler
//!
//! Post-execution hook that merges private state another party shared with
//! this node.
//!
//! An extension transaction is recognised structurally: exactly two logs,
//! the first a `StateShared` event. The node applies the shared accounts only
//! if it initiated the extension itself, which it proves by being the sender
//! of the payload named by the event's uuid.
//!
//! The two-log fingerprint is not bound to transaction intent. Any contract
//! able to emit a well-formed `StateShared` log followed by one more log
//! triggers the lookup; the uuid ownership check is what keeps a foreign
//! contract from writing into this node's private state.

use crate::domain::entities::{Log, SharedAccount};
use crate::domain::state_shared::{state_shared_topic, StateSharedEvent};
use crate::domain::value_objects::{decode_hex, Address, Bytes, EncryptedPayloadHash, Hash, U256};
use crate::errors::ExtensionError;
use crate::ports::inbound::StateExtensionHook;
use crate::ports::outbound::{PrivateTransactionManager, StateDb};
use crate::SUBSYSTEM;
use async_trait::async_trait;
use quantum_telemetry::{log_payload_event, metric_inc, STATE_EXTENSIONS};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Shared accounts keyed by hex address.
pub type SharedAccounts = BTreeMap<String, SharedAccount>;

/// Applies state extensions found in transaction logs.
pub struct StateExtensionHandler {
    manager: Arc<dyn PrivateTransactionManager>,
}

impl StateExtensionHandler {
    /// Create a handler resolving payloads through `manager`.
    pub fn new(manager: Arc<dyn PrivateTransactionManager>) -> Self {
        Self { manager }
    }

    /// The injected manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<dyn PrivateTransactionManager> {
        &self.manager
    }

    /// Fetches and decodes the shared accounts, provided `uuid` proves this
    /// node asked for them.
    pub async fn fetch_state_data(&self, hash: &str, uuid: &str) -> Option<SharedAccounts> {
        if !self.uuid_is_own(uuid).await {
            return None;
        }

        let Some(data) = self.fetch_data_from_manager(hash).await else {
            info!("No state shared with this node");
            return None;
        };

        match serde_json::from_slice::<SharedAccounts>(data.as_slice()) {
            Ok(accounts) => Some(accounts),
            Err(e) => {
                info!(error = %e, "Could not decode shared accounts");
                None
            }
        }
    }

    /// Resolves a base64 payload hash. Anything but a non-empty payload,
    /// errors included, is `None`.
    pub async fn fetch_data_from_manager(&self, hash: &str) -> Option<Bytes> {
        let hash = match EncryptedPayloadHash::from_base64(hash) {
            Ok(hash) => hash,
            Err(e) => {
                debug!(error = %e, "Shared payload hash is not base64");
                return None;
            }
        };

        match self.manager.receive(&hash).await {
            Ok(Some(received)) if !received.payload.is_empty() => Some(received.payload),
            Ok(_) => None,
            Err(e) => {
                log_payload_event!(warn, SUBSYSTEM, "Could not fetch shared state", hash, error = %e);
                None
            }
        }
    }

    /// Returns true if this node sent the payload `uuid` (hex) refers to.
    pub async fn uuid_is_own(&self, uuid: &str) -> bool {
        if uuid.is_empty() {
            info!("State shared without an accepted extension");
            return false;
        }

        let hash = match decode_hex(uuid) {
            Ok(bytes) => EncryptedPayloadHash::from_bytes_padded(&bytes),
            Err(e) => {
                warn!(error = %e, "Extension uuid is not hex");
                return false;
            }
        };

        match self.manager.is_sender(&hash).await {
            Ok(is_sender) => is_sender,
            Err(e) => {
                log_payload_event!(warn, SUBSYSTEM, "Could not determine if we are sender", hash, error = %e);
                false
            }
        }
    }
}

#[async_trait]
impl StateExtensionHook for StateExtensionHandler {
    #[instrument(skip_all, fields(logs = logs.len()))]
    async fn check_extension_and_set_private_state(
        &self,
        logs: &[Log],
        private_state: &mut dyn StateDb,
    ) {
        // A StateShared log followed by the completion log.
        let [shared, _] = logs else {
            return;
        };
        if shared.topics.first() != Some(&state_shared_topic()) {
            return;
        }

        let event = match StateSharedEvent::decode(shared.data.as_slice()) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Malformed StateShared log");
                metric_inc!(STATE_EXTENSIONS, &["ignored"]);
                return;
            }
        };

        let Some(accounts) = self.fetch_state_data(&event.payload_hash, &event.uuid).await else {
            metric_inc!(STATE_EXTENSIONS, &["ignored"]);
            return;
        };

        let snapshot = private_state.snapshot();
        match apply_shared_accounts(private_state, &accounts) {
            Ok(()) => {
                private_state.discard_snapshot(snapshot);
                info!(
                    to_extend = %event.to_extend,
                    accounts = accounts.len(),
                    "Applied shared private state"
                );
                metric_inc!(STATE_EXTENSIONS, &["applied"]);
            }
            Err(e) => {
                error!(error = %e, "Could not apply shared private state");
                if let Err(revert) = private_state.revert_to_snapshot(snapshot) {
                    error!(error = %revert, "Could not roll back partial extension");
                }
                metric_inc!(STATE_EXTENSIONS, &["reverted"]);
            }
        }
    }
}

/// Writes every shared account into `state`, stopping at the first failure.
///
/// The caller owns atomicity: snapshot before, revert on `Err`.
///
/// # Errors
///
/// Returns `ExtensionError::Merge` naming the account that could not be
/// parsed or written.
pub fn apply_shared_accounts(
    state: &mut dyn StateDb,
    accounts: &SharedAccounts,
) -> Result<(), ExtensionError> {
    for (key, account) in accounts {
        apply_account(state, key, account).map_err(|reason| ExtensionError::Merge {
            account: key.clone(),
            reason,
        })?;
    }
    Ok(())
}

fn apply_account(state: &mut dyn StateDb, key: &str, account: &SharedAccount) -> Result<(), String> {
    let address = Address::from_hex(key).map_err(|e| format!("address: {e}"))?;
    let dump = &account.state;

    let balance = U256::from_dec_str(&dump.balance)
        .map_err(|e| format!("balance {:?}: {e:?}", dump.balance))?;
    let code = decode_hex(&dump.code).map_err(|e| format!("code: {e}"))?;

    state.set_balance(address, balance).map_err(|e| e.to_string())?;
    state.set_nonce(address, dump.nonce).map_err(|e| e.to_string())?;
    state.set_code(address, Bytes(code)).map_err(|e| e.to_string())?;

    for (slot, value) in &dump.storage {
        let slot = Hash::from_hex(slot).map_err(|e| format!("storage key {slot}: {e}"))?;
        let value = Hash::from_hex(value).map_err(|e| format!("storage value {value}: {e}"))?;
        state.set_storage(address, slot, value).map_err(|e| e.to_string())?;
    }

    if let Some(metadata) = account.metadata {
        state
            .set_privacy_metadata(address, metadata)
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
