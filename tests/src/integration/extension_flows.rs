//! # State Extension Flows
//!
//! Alice owns a protected counter and shares it with Bob. Bob accepts the
//! extension (publishing an acceptance payload), Alice's node exports the
//! account, and Bob's node merges it when the extension logs arrive.

#[cfg(test)]
mod tests {
    use crate::integration::support::{affiliated, export_account, Node};
    use qc_18_private_transactions::adapters::scripted_vm::{counter_init_code, encode_set};
    use qc_18_private_transactions::extension::SharedAccounts;
    use qc_18_private_transactions::prelude::*;

    const PP: PrivacyFlag = PrivacyFlag::PARTY_PROTECTION;
    const EXTENSION_CONTRACT: Address = Address::new([0xee; 20]);

    struct Extension {
        alice: Node,
        counter: Address,
        creation: EncryptedPayloadHash,
        shared: EncryptedPayloadHash,
    }

    /// Deploys Alice's counter and places its export in `bob`'s exchange as
    /// a foreign payload.
    async fn share_counter_with(bob: &Node, bob_exchange: &InMemoryExchange) -> Extension {
        let (mut alice, _) = Node::in_memory();
        let (outcome, creation) = alice
            .publish_and_apply(
                &counter_init_code(U256::from(42)),
                &ExtraMetadata::with_flag(PP),
                None,
                Some(PP),
            )
            .await;
        let counter = outcome.created_contracts[0];

        let mut accounts = SharedAccounts::new();
        accounts.insert(counter.to_hex(), export_account(&alice.private, &counter));
        let json = serde_json::to_vec(&accounts).unwrap();
        let shared = bob_exchange.insert_foreign(&json, ExtraMetadata::default());

        assert!(bob.private.is_empty());
        Extension {
            alice,
            counter,
            creation,
            shared,
        }
    }

    fn extension_logs(to_extend: Address, shared: &EncryptedPayloadHash, uuid: &str) -> Vec<Log> {
        vec![
            StateSharedEvent::new(to_extend, shared.to_base64(), uuid).to_log(EXTENSION_CONTRACT),
            Log::new(EXTENSION_CONTRACT, vec![Hash::new([0x11; 32])], Bytes::new()),
        ]
    }

    /// Bob publishes the acceptance payload whose hash becomes the uuid.
    async fn accept(bob: &Node) -> String {
        bob.publish(&Bytes::from_slice(b"accept extension"), &ExtraMetadata::default())
            .await
            .to_hex()
    }

    #[tokio::test]
    async fn test_accepted_extension_copies_account() {
        let (mut bob, bob_manager) = Node::in_memory();
        let ext = share_counter_with(&bob, bob_manager.client()).await;
        let uuid = accept(&bob).await;

        bob.apply_extension(&extension_logs(ext.counter, &ext.shared, &uuid))
            .await;

        assert_eq!(
            bob.private.account(&ext.counter),
            ext.alice.private.account(&ext.counter)
        );
        assert_eq!(bob.counter_value(&ext.counter), U256::from(42));
        assert_eq!(bob_manager.client().calls().sender_checks, 1);
    }

    #[tokio::test]
    async fn test_extended_contract_accepts_affiliated_calls() {
        let (mut bob, bob_manager) = Node::in_memory();
        let ext = share_counter_with(&bob, bob_manager.client()).await;
        let uuid = accept(&bob).await;
        bob.apply_extension(&extension_logs(ext.counter, &ext.shared, &uuid))
            .await;

        let (outcome, _) = bob
            .publish_and_apply(
                &encode_set(U256::from(7)),
                &affiliated(PP, &[ext.creation]),
                Some(ext.counter),
                Some(PP),
            )
            .await;

        assert!(!outcome.failed);
        assert_eq!(bob.counter_value(&ext.counter), U256::from(7));
    }

    #[tokio::test]
    async fn test_extension_accepted_elsewhere_is_ignored() {
        let (bob, bob_manager) = Node::in_memory();
        let (mut carol, carol_manager) = Node::in_memory();
        let ext = share_counter_with(&carol, carol_manager.client()).await;
        let uuid = accept(&bob).await;

        carol
            .apply_extension(&extension_logs(ext.counter, &ext.shared, &uuid))
            .await;

        assert!(carol.private.is_empty());
        assert_eq!(carol_manager.client().calls().receives, 0);
        assert_eq!(carol_manager.client().calls().sender_checks, 1);
        assert_eq!(bob_manager.client().calls().sender_checks, 0);
    }

    #[tokio::test]
    async fn test_extension_without_acceptance_is_ignored() {
        let (mut bob, bob_manager) = Node::in_memory();
        let ext = share_counter_with(&bob, bob_manager.client()).await;

        bob.apply_extension(&extension_logs(ext.counter, &ext.shared, ""))
            .await;

        assert!(bob.private.is_empty());
        assert_eq!(bob_manager.client().calls().sender_checks, 0);
    }

    #[tokio::test]
    async fn test_three_logs_are_not_an_extension() {
        let (mut bob, bob_manager) = Node::in_memory();
        let ext = share_counter_with(&bob, bob_manager.client()).await;
        let uuid = accept(&bob).await;

        let mut logs = extension_logs(ext.counter, &ext.shared, &uuid);
        logs.push(Log::new(EXTENSION_CONTRACT, vec![], Bytes::new()));
        bob.apply_extension(&logs).await;

        assert!(bob.private.is_empty());
        assert_eq!(bob_manager.client().calls().sender_checks, 0);
    }

    #[tokio::test]
    async fn test_corrupt_shared_state_is_ignored() {
        let (mut bob, bob_manager) = Node::in_memory();
        let uuid = accept(&bob).await;
        let corrupt = bob_manager
            .client()
            .insert_foreign(b"{\"0xaa\": not json", ExtraMetadata::default());

        bob.apply_extension(&extension_logs(Address::new([1; 20]), &corrupt, &uuid))
            .await;

        assert!(bob.private.is_empty());
        assert_eq!(bob_manager.client().calls().receives, 1);
    }

    #[tokio::test]
    async fn test_extension_merges_over_existing_state() {
        let (mut bob, bob_manager) = Node::in_memory();
        let ext = share_counter_with(&bob, bob_manager.client()).await;
        let uuid = accept(&bob).await;

        // Bob's stale copy of the slot is overwritten by the shared export.
        bob.private
            .set_storage(ext.counter, Hash::ZERO, Hash::from_u256(U256::from(1)))
            .unwrap();
        bob.apply_extension(&extension_logs(ext.counter, &ext.shared, &uuid))
            .await;

        assert_eq!(bob.counter_value(&ext.counter), U256::from(42));
        assert_eq!(
            bob.private.privacy_metadata(&ext.counter).map(|m| m.creation_tx_hash),
            Some(ext.creation)
        );
    }
}
