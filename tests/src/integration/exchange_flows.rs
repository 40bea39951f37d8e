//! # Exchange Flows
//!
//! The runtime built from configuration, talking JSON over HTTP to a fake
//! payload-exchange service.

#[cfg(test)]
mod tests {
    use crate::integration::support::{Node, SENDER};
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use qc_18_private_transactions::adapters::http_client::{
        ReceiveResponse, SendRequest, SendResponse,
    };
    use qc_18_private_transactions::adapters::scripted_vm::counter_init_code;
    use qc_18_private_transactions::prelude::*;
    use quantum_telemetry::EXCHANGE_REQUESTS;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeExchange {
        stored: Mutex<HashMap<String, ReceiveResponse>>,
        own: Mutex<HashSet<String>>,
        receives: AtomicUsize,
    }

    impl FakeExchange {
        fn store(&self, req: SendRequest, own: bool) -> EncryptedPayloadHash {
            let hash = InMemoryExchange::hash_of(req.payload.as_bytes());
            let key = hash.to_url_safe();
            if own {
                self.own.lock().insert(key.clone());
            }
            self.stored.lock().insert(
                key,
                ReceiveResponse {
                    payload: req.payload,
                    affected_contract_transactions: req.affected_contract_transactions,
                    exec_hash: req.exec_hash,
                    privacy_flag: req.privacy_flag,
                },
            );
            hash
        }

        /// A payload another node sent to this one.
        fn seed(&self, payload: &Bytes, metadata: &ExtraMetadata) -> EncryptedPayloadHash {
            self.store(SendRequest::new(payload.as_slice(), "other", &[], metadata), false)
        }

        fn receives(&self) -> usize {
            self.receives.load(Ordering::SeqCst)
        }
    }

    async fn send(
        State(svc): State<Arc<FakeExchange>>,
        Json(req): Json<SendRequest>,
    ) -> Json<SendResponse> {
        let hash = svc.store(req, true);
        Json(SendResponse {
            key: hash.to_base64(),
        })
    }

    async fn receive(
        State(svc): State<Arc<FakeExchange>>,
        Path(key): Path<String>,
    ) -> Result<Json<ReceiveResponse>, StatusCode> {
        svc.receives.fetch_add(1, Ordering::SeqCst);
        svc.stored
            .lock()
            .get(&key)
            .map(|r| {
                Json(ReceiveResponse {
                    payload: r.payload.clone(),
                    affected_contract_transactions: r.affected_contract_transactions.clone(),
                    exec_hash: r.exec_hash.clone(),
                    privacy_flag: r.privacy_flag,
                })
            })
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn is_sender(
        State(svc): State<Arc<FakeExchange>>,
        Path(key): Path<String>,
    ) -> &'static str {
        if svc.own.lock().contains(&key) {
            "true"
        } else {
            "false"
        }
    }

    async fn spawn_exchange() -> (String, Arc<FakeExchange>) {
        let svc = Arc::new(FakeExchange::default());
        let app = Router::new()
            .route("/send", post(send))
            .route("/transaction/:key", get(receive))
            .route("/transaction/:key/isSender", get(is_sender))
            .with_state(Arc::clone(&svc));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), svc)
    }

    fn config_for(url: &str) -> PrivateTxConfig {
        let mut config = PrivateTxConfig::default();
        config.exchange.enabled = true;
        config.exchange.url = url.to_string();
        config.exchange.request_timeout = Duration::from_secs(5);
        config.exchange.connect_timeout = Duration::from_secs(1);
        config
    }

    async fn node_for(url: &str) -> Node {
        let runtime = PrivateTxRuntime::from_config(&config_for(url), ScriptedVm::new()).unwrap();
        assert_eq!(runtime.manager().name(), "caching-exchange");
        assert!(runtime.sweeper_running());
        Node::with_runtime(runtime)
    }

    #[tokio::test]
    async fn test_own_payload_served_from_cache() {
        let (url, svc) = spawn_exchange().await;
        let mut node = node_for(&url).await;

        let (outcome, hash) = node
            .publish_and_apply(
                &counter_init_code(U256::from(42)),
                &ExtraMetadata::default(),
                None,
                None,
            )
            .await;

        assert!(!outcome.failed);
        assert_eq!(node.counter_value(&outcome.created_contracts[0]), U256::from(42));
        assert_eq!(svc.receives(), 0);
        assert!(node.runtime.manager().is_sender(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_foreign_payload_fetched_over_http_once() {
        let (url, svc) = spawn_exchange().await;
        let mut node = node_for(&url).await;
        let payload = counter_init_code(U256::from(9));
        let hash = svc.seed(&payload, &ExtraMetadata::with_flag(PrivacyFlag::PARTY_PROTECTION));

        let msg = node.private_message(&hash, None, Some(PrivacyFlag::PARTY_PROTECTION));
        let outcome = node.apply(&msg).await.unwrap();
        assert!(!outcome.failed);
        let counter = outcome.created_contracts[0];
        assert_eq!(
            node.private.privacy_metadata(&counter).map(|m| m.privacy_flag),
            Some(PrivacyFlag::PARTY_PROTECTION)
        );

        let again = node.runtime.manager().receive(&hash).await.unwrap().unwrap();
        assert_eq!(again.payload, payload);
        assert_eq!(svc.receives(), 1);
        assert!(!node.runtime.manager().is_sender(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_hash_is_not_participant() {
        let (url, svc) = spawn_exchange().await;
        let mut node = node_for(&url).await;
        let before = EXCHANGE_REQUESTS
            .with_label_values(&["receive", "not_found"])
            .get();

        let msg = node.private_message(&EncryptedPayloadHash::new([5; 64]), None, None);
        let outcome = node.apply(&msg).await.unwrap();

        assert!(!outcome.failed);
        assert!(node.private.is_empty());
        assert_eq!(node.public.nonce(&SENDER), 1);
        assert_eq!(svc.receives(), 1);
        assert!(
            EXCHANGE_REQUESTS
                .with_label_values(&["receive", "not_found"])
                .get()
                >= before + 1.0
        );
    }

    #[test]
    fn test_unreachable_exchange_is_fatal() {
        tokio_test::block_on(async {
            let mut node = Node::with_runtime(
                PrivateTxRuntime::from_config(&config_for("http://127.0.0.1:1"), ScriptedVm::new())
                    .unwrap(),
            );

            let msg = node.private_message(&EncryptedPayloadHash::new([5; 64]), None, None);
            let result = node.apply(&msg).await;

            assert!(matches!(
                result,
                Err(TransitionError::Manager(ManagerError::Exchange(
                    ExchangeError::Connection(_)
                )))
            ));
            assert_eq!(node.public.nonce(&SENDER), 0);
        });
    }

    #[tokio::test]
    async fn test_extension_uuid_checked_over_http() {
        let (url, svc) = spawn_exchange().await;
        let node = node_for(&url).await;

        let accepted = node
            .publish(&Bytes::from_slice(b"accept"), &ExtraMetadata::default())
            .await;
        let foreign = svc.seed(&Bytes::from_slice(b"other"), &ExtraMetadata::default());

        assert!(node.runtime.extension().uuid_is_own(&accepted.to_hex()).await);
        assert!(!node.runtime.extension().uuid_is_own(&foreign.to_hex()).await);
        assert!(!node.runtime.extension().uuid_is_own("").await);
    }
}
