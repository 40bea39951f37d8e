//! # Private Execution Flows
//!
//! Counter and forwarder contracts deployed and called through private
//! payloads, with the caching manager over an in-memory exchange.

#[cfg(test)]
mod tests {
    use crate::integration::support::{affiliated, Node, SENDER};
    use qc_18_private_transactions::adapters::scripted_vm::{
        counter_init_code, encode_get, encode_set, forwarder_init_code,
    };
    use qc_18_private_transactions::prelude::*;

    const PP: PrivacyFlag = PrivacyFlag::PARTY_PROTECTION;

    /// Deploys a counter under party protection, returning its address and
    /// creation hash.
    async fn deploy_protected_counter(node: &mut Node, initial: u64) -> (Address, EncryptedPayloadHash) {
        let (outcome, hash) = node
            .publish_and_apply(
                &counter_init_code(U256::from(initial)),
                &ExtraMetadata::with_flag(PP),
                None,
                Some(PP),
            )
            .await;
        assert!(!outcome.failed);
        assert_eq!(outcome.created_contracts.len(), 1);
        (outcome.created_contracts[0], hash)
    }

    #[tokio::test]
    async fn test_counter_lifecycle_with_matching_flag() {
        let (mut node, manager) = Node::in_memory();
        let (counter, creation) = deploy_protected_counter(&mut node, 42).await;

        assert_eq!(counter, compute_contract_address(SENDER, 0));
        assert_eq!(node.counter_value(&counter), U256::from(42));
        assert_eq!(
            node.private.privacy_metadata(&counter),
            Some(ContractPrivacyMetadata {
                creation_tx_hash: creation,
                privacy_flag: PP,
            })
        );

        let set = encode_set(U256::from(43));
        let call_metadata = affiliated(PP, &[creation]);
        let (outcome, set_hash) = node
            .publish_and_apply(&set, &call_metadata, Some(counter), Some(PP))
            .await;
        assert!(!outcome.failed);
        assert_eq!(node.counter_value(&counter), U256::from(43));

        // The sender never fetches its own payloads back.
        let received = node.runtime.manager().receive(&set_hash).await.unwrap().unwrap();
        assert_eq!(received.payload, set);
        assert_eq!(received.metadata, Some(call_metadata));
        assert_eq!(manager.client().calls().receives, 0);
        assert_eq!(node.public.nonce(&SENDER), 2);
    }

    #[tokio::test]
    async fn test_get_returns_counter_value() {
        let (mut node, _) = Node::in_memory();
        let (counter, creation) = deploy_protected_counter(&mut node, 7).await;

        let (outcome, _) = node
            .publish_and_apply(&encode_get(), &affiliated(PP, &[creation]), Some(counter), Some(PP))
            .await;
        assert!(!outcome.failed);
        assert_eq!(
            Hash::from_slice(outcome.return_data.as_slice()).map(|h| h.to_u256()),
            Some(U256::from(7))
        );
    }

    #[tokio::test]
    async fn test_unaffiliated_call_is_marked_failed() {
        let (mut node, _) = Node::in_memory();
        let (counter, _) = deploy_protected_counter(&mut node, 42).await;
        let before = node.private.dump();

        let (outcome, _) = node
            .publish_and_apply(
                &encode_set(U256::from(99)),
                &ExtraMetadata::with_flag(PP),
                Some(counter),
                Some(PP),
            )
            .await;

        assert!(outcome.failed);
        assert!(outcome.gas_used > intrinsic_gas(&[1u8; EncryptedPayloadHash::LEN], false));
        assert_eq!(node.private.dump(), before);
        assert_eq!(node.public.nonce(&SENDER), 2);
    }

    #[tokio::test]
    async fn test_declared_flag_not_attested_is_marked_failed() {
        let (mut node, _) = Node::in_memory();
        let (counter, creation) = deploy_protected_counter(&mut node, 42).await;

        let legacy = affiliated(PrivacyFlag::STANDARD_PRIVATE, &[creation]);
        let (outcome, _) = node
            .publish_and_apply(&encode_set(U256::from(1)), &legacy, Some(counter), Some(PP))
            .await;

        assert!(outcome.failed);
        assert_eq!(node.counter_value(&counter), U256::from(42));
    }

    #[tokio::test]
    async fn test_legacy_call_into_protected_contract_fails() {
        let (mut node, _) = Node::in_memory();
        let (counter, _) = deploy_protected_counter(&mut node, 42).await;

        let (outcome, _) = node
            .publish_and_apply(
                &encode_set(U256::from(1)),
                &ExtraMetadata::default(),
                Some(counter),
                None,
            )
            .await;

        assert!(outcome.failed);
        assert_eq!(node.counter_value(&counter), U256::from(42));
    }

    #[tokio::test]
    async fn test_party_protection_forwarder_into_legacy_contract_fails() {
        let (mut node, _) = Node::in_memory();

        // C1 predates privacy flags: no flag on the transaction or payload.
        let (outcome, _) = node
            .publish_and_apply(
                &counter_init_code(U256::from(42)),
                &ExtraMetadata::default(),
                None,
                None,
            )
            .await;
        assert!(!outcome.failed);
        let c1 = outcome.created_contracts[0];
        assert!(node.private.privacy_metadata(&c1).is_none());

        let (outcome, c2_hash) = node
            .publish_and_apply(&forwarder_init_code(c1), &ExtraMetadata::with_flag(PP), None, Some(PP))
            .await;
        assert!(!outcome.failed);
        let c2 = outcome.created_contracts[0];

        let (outcome, _) = node
            .publish_and_apply(
                &encode_set(U256::from(53)),
                &affiliated(PP, &[c2_hash]),
                Some(c2),
                Some(PP),
            )
            .await;

        assert!(outcome.failed);
        assert_eq!(node.counter_value(&c1), U256::from(42));
    }

    #[tokio::test]
    async fn test_legacy_forwarder_into_legacy_contract_succeeds() {
        let (mut node, _) = Node::in_memory();
        let legacy = ExtraMetadata::default();

        let (outcome, _) = node
            .publish_and_apply(&counter_init_code(U256::from(1)), &legacy, None, None)
            .await;
        let c1 = outcome.created_contracts[0];
        let (outcome, _) = node
            .publish_and_apply(&forwarder_init_code(c1), &legacy, None, None)
            .await;
        let c2 = outcome.created_contracts[0];

        let (outcome, _) = node
            .publish_and_apply(&encode_set(U256::from(5)), &legacy, Some(c2), None)
            .await;
        assert!(!outcome.failed);
        assert_eq!(node.counter_value(&c1), U256::from(5));
    }

    #[tokio::test]
    async fn test_non_participant_skips_execution() {
        let (mut alice, _) = Node::in_memory();
        let (mut carol, carol_manager) = Node::in_memory();

        let hash = alice
            .publish(&counter_init_code(U256::from(42)), &ExtraMetadata::with_flag(PP))
            .await;
        let msg = carol.private_message(&hash, None, Some(PP));
        let outcome = carol.apply(&msg).await.unwrap();

        assert!(!outcome.failed);
        assert!(outcome.created_contracts.is_empty());
        assert_eq!(outcome.gas_used, intrinsic_gas(msg.data.as_slice(), true));
        assert!(carol.private.is_empty());
        assert_eq!(carol.public.nonce(&SENDER), 1);

        // Not-found answers are not cached.
        let retry = carol.private_message(&hash, None, Some(PP));
        let _ = carol.apply(&retry).await.unwrap();
        assert_eq!(carol_manager.client().calls().receives, 2);
    }

    #[tokio::test]
    async fn test_zero_hash_never_reaches_exchange() {
        let (mut node, manager) = Node::in_memory();
        let msg = node.private_message(&EncryptedPayloadHash::ZERO, None, None);

        let outcome = node.apply(&msg).await.unwrap();
        assert!(!outcome.failed);
        assert!(node.private.is_empty());
        assert_eq!(manager.client().calls().receives, 0);
    }

    #[tokio::test]
    async fn test_foreign_payload_is_fetched_once() {
        let (mut node, manager) = Node::in_memory();
        let hash = manager
            .client()
            .insert_foreign(counter_init_code(U256::from(3)).as_slice(), ExtraMetadata::default());

        let msg = node.private_message(&hash, None, None);
        let outcome = node.apply(&msg).await.unwrap();
        assert!(!outcome.failed);
        assert_eq!(outcome.created_contracts.len(), 1);

        let again = node.runtime.manager().receive(&hash).await.unwrap().unwrap();
        assert_eq!(again.payload, counter_init_code(U256::from(3)));
        assert_eq!(manager.client().calls().receives, 1);
        assert!(!node.runtime.manager().is_sender(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_exchange_outage_aborts_message() {
        let (mut node, manager) = Node::in_memory();
        let hash = manager
            .client()
            .insert_foreign(counter_init_code(U256::one()).as_slice(), ExtraMetadata::default());
        manager.client().set_unavailable(true);

        let msg = node.private_message(&hash, None, None);
        let result = node.apply(&msg).await;

        assert!(matches!(
            result,
            Err(TransitionError::Manager(ManagerError::Exchange(ExchangeError::Connection(_))))
        ));
        assert_eq!(node.public.nonce(&SENDER), 0);
        assert!(node.private.is_empty());
    }

    #[tokio::test]
    async fn test_manager_rejects_signed_and_raw_variants() {
        let (node, _) = Node::in_memory();
        let manager = node.runtime.manager();
        let hash = EncryptedPayloadHash::new([1; 64]);

        assert!(matches!(
            manager.send_signed(&hash, &[], &ExtraMetadata::default()).await,
            Err(ManagerError::Unsupported("send_signed"))
        ));
        assert!(matches!(
            manager.receive_raw(&hash).await,
            Err(ManagerError::Unsupported("receive_raw"))
        ));
        assert_eq!(manager.name(), "caching-exchange");
    }
}
