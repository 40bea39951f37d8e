//! Shared fixtures: a node holding both state stores and a wired runtime.

use qc_18_private_transactions::prelude::*;
use quantum_telemetry::{init_telemetry, TelemetryConfig};
use std::sync::{Arc, Once};
use std::time::Duration;

/// Transaction sender used across scenarios.
pub const SENDER: Address = Address::new([0xaa; 20]);

/// Payload-exchange identity of the sending node.
pub const ALICE_KEY: &str = "BULeR8JyUWhiuuCMU/HLA0Q5pzkYT+cHII3ZKBey3Bo=";

/// Payload-exchange identity of a recipient node.
pub const BOB_KEY: &str = "QfeDAys9MPDs2XHExtc84jKGHxZg/aj52DTh0vtA3Xc=";

static LOGGING: Once = Once::new();

/// Installs the subscriber once per test binary. Set `RUST_LOG` to see output.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let config = TelemetryConfig {
            log_level: "off".to_string(),
            ..TelemetryConfig::for_subsystem("18", "private-transactions")
        };
        let _ = init_telemetry(&config);
    });
}

/// One ledger node.
pub struct Node {
    pub runtime: PrivateTxRuntime<ScriptedVm>,
    pub public: InMemoryStateDb,
    pub private: InMemoryStateDb,
    pub block: BlockContext,
}

impl Node {
    /// Node around an already-built runtime.
    pub fn with_runtime(runtime: PrivateTxRuntime<ScriptedVm>) -> Self {
        init_test_logging();
        Self {
            runtime,
            public: InMemoryStateDb::new(),
            private: InMemoryStateDb::new(),
            block: BlockContext::default(),
        }
    }

    /// Node whose manager caches over its own in-memory exchange.
    pub fn in_memory() -> (Self, Arc<CachingExchangeManager<InMemoryExchange>>) {
        let manager = Arc::new(CachingExchangeManager::new(
            InMemoryExchange::new(),
            Duration::from_secs(300),
        ));
        let runtime = PrivateTxRuntime::with_manager(manager.clone(), ScriptedVm::new());
        (Self::with_runtime(runtime), manager)
    }

    /// Publishes a payload from Alice to Bob through the node's manager.
    pub async fn publish(&self, payload: &Bytes, metadata: &ExtraMetadata) -> EncryptedPayloadHash {
        self.runtime
            .manager()
            .send(payload.as_slice(), ALICE_KEY, &[BOB_KEY.to_string()], metadata)
            .await
            .expect("publish payload")
    }

    /// Private message referencing `hash`, using the sender's next nonce.
    pub fn private_message(
        &self,
        hash: &EncryptedPayloadHash,
        to: Option<Address>,
        flag: Option<PrivacyFlag>,
    ) -> Message {
        private_message(hash, to, self.public.nonce(&SENDER), flag)
    }

    /// Applies one message with an unbounded gas pool.
    pub async fn apply(&mut self, msg: &Message) -> Result<MessageOutcome, TransitionError> {
        let mut pool = GasPool::new(u64::MAX);
        self.runtime
            .transition()
            .apply_message(&mut self.public, &mut self.private, msg, &mut pool, &self.block)
            .await
    }

    /// Publishes then applies a private message, returning the outcome and
    /// the payload hash.
    pub async fn publish_and_apply(
        &mut self,
        payload: &Bytes,
        metadata: &ExtraMetadata,
        to: Option<Address>,
        flag: Option<PrivacyFlag>,
    ) -> (MessageOutcome, EncryptedPayloadHash) {
        let hash = self.publish(payload, metadata).await;
        let msg = self.private_message(&hash, to, flag);
        let outcome = self.apply(&msg).await.expect("apply message");
        (outcome, hash)
    }

    /// Runs the post-execution extension hook on the private state.
    pub async fn apply_extension(&mut self, logs: &[Log]) {
        self.runtime
            .extension()
            .check_extension_and_set_private_state(logs, &mut self.private)
            .await;
    }

    /// Slot 0 of a counter contract in private state.
    pub fn counter_value(&self, contract: &Address) -> U256 {
        self.private.storage(contract, &Hash::ZERO).to_u256()
    }
}

/// Private message whose on-chain data is the payload hash.
pub fn private_message(
    hash: &EncryptedPayloadHash,
    to: Option<Address>,
    nonce: u64,
    flag: Option<PrivacyFlag>,
) -> Message {
    Message {
        from: SENDER,
        to,
        nonce,
        gas_limit: 1_000_000,
        data: Bytes::from_slice(hash.as_bytes()),
        is_private: true,
        privacy_metadata: flag.map(|privacy_flag| TxPrivacyMetadata { privacy_flag }),
        ..Message::default()
    }
}

/// Metadata allowing calls into contracts created by `creations`.
pub fn affiliated(flag: PrivacyFlag, creations: &[EncryptedPayloadHash]) -> ExtraMetadata {
    let mut metadata = ExtraMetadata::with_flag(flag);
    metadata.ac_hashes.extend(creations.iter().copied());
    metadata
}

/// Snapshot of one private account in its shared wire form.
pub fn export_account(state: &InMemoryStateDb, address: &Address) -> SharedAccount {
    let account = state.account(address).unwrap_or_default();
    SharedAccount {
        state: SharedAccountState {
            balance: account.balance.to_string(),
            nonce: account.nonce,
            code: format!("0x{}", hex::encode(account.code.as_slice())),
            storage: account
                .storage
                .iter()
                .map(|(slot, value)| {
                    (
                        format!("0x{}", hex::encode(slot.as_bytes())),
                        format!("0x{}", hex::encode(value.as_bytes())),
                    )
                })
                .collect(),
        },
        metadata: account.privacy_metadata,
    }
}
