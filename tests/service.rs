#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use decentral_store::index::{MemoryIndex, MetadataIndex};
    use decentral_store::ledger::{ConfirmationPolicy, InMemoryLedger, TxHandle};
    use decentral_store::storage::{ContentStore, MemoryContentStore};
    use decentral_store::*;
    use tokio::time::Instant;

    const POLL_INTERVAL: Duration = Duration::from_millis(100);

    struct Harness {
        service: Arc<MetadataService>,
        ledger: Arc<InMemoryLedger>,
        index: Arc<MemoryIndex>,
    }

    /// Helper to wire a service over in-memory collaborators
    fn create_harness(ledger: InMemoryLedger) -> Harness {
        let ledger = Arc::new(ledger);
        let index = Arc::new(MemoryIndex::new());
        let service = MetadataService::new(
            Arc::new(MemoryContentStore::new()),
            index.clone(),
            ChainAnchor::new(ledger.clone(), POLL_INTERVAL),
        );
        Harness {
            service: Arc::new(service),
            ledger,
            index,
        }
    }

    fn ctx() -> AnchorContext {
        AnchorContext::with_timeout(Duration::from_secs(10))
    }

    async fn upload(harness: &Harness, data: &[u8]) -> FileRecord {
        harness
            .service
            .create(&ctx(), "a.txt", "alice", data)
            .await
            .expect("Failed to create file")
            .record()
            .clone()
    }

    /// Content store whose every operation fails like an unreachable backend
    struct FailingContentStore;

    #[async_trait]
    impl ContentStore for FailingContentStore {
        async fn put(&self, _data: &[u8]) -> Result<ContentAddress> {
            Err(StoreError::StorageFailure("backend unreachable".into()))
        }

        async fn get(&self, _address: &ContentAddress) -> Result<Vec<u8>> {
            Err(StoreError::StorageFailure("backend unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_create_and_read_roundtrip() {
        let harness = create_harness(InMemoryLedger::new());

        let outcome = harness
            .service
            .create(&ctx(), "a.txt", "alice", &b"0123456789"[..])
            .await
            .expect("Failed to create file");

        assert!(outcome.is_anchored());
        let record = outcome.record();
        assert_eq!(record.size, 10);
        assert_eq!(record.name, "a.txt");
        assert_eq!(record.content_address, ContentAddress::of(b"0123456789"));
        assert!(!record.deleted);
        assert_eq!(record.download_token.expose().len(), 43);
        assert_eq!(record.delete_token.expose().len(), 43);
        assert_ne!(record.download_token, record.delete_token);
        let reference = record.on_chain_ref.as_ref().expect("create should be anchored");
        assert_eq!(reference.kind, CommitmentKind::Create);

        let download = harness
            .service
            .read(&record.id, record.download_token.expose())
            .await
            .expect("Failed to read file");
        assert_eq!(download.data, b"0123456789");
        assert_eq!(download.name, "a.txt");
    }

    #[tokio::test]
    async fn test_tokens_are_not_interchangeable() {
        let harness = create_harness(InMemoryLedger::new());
        let record = upload(&harness, b"secret").await;

        let err = harness
            .service
            .read(&record.id, record.delete_token.expose())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = harness
            .service
            .delete(&ctx(), &record.id, record.download_token.expose())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = harness.service.read(&record.id, "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        // Nothing was anchored for the refused delete.
        assert_eq!(harness.ledger.submitted().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_then_read_is_not_found() {
        let harness = create_harness(InMemoryLedger::new());
        let record = upload(&harness, b"temporary").await;

        let reference = harness
            .service
            .delete(&ctx(), &record.id, record.delete_token.expose())
            .await
            .expect("Failed to delete file");
        assert_eq!(reference.kind, CommitmentKind::Delete);

        let err = harness
            .service
            .read(&record.id, record.download_token.expose())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = harness
            .service
            .delete(&ctx(), &record.id, record.delete_token.expose())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // The tombstone stays visible with its delete anchor.
        let view = harness.service.provenance(&record.id).await.expect("Failed to load provenance");
        assert!(view.deleted);
        assert_eq!(view.on_chain_ref, Some(reference));
    }

    #[tokio::test]
    async fn test_provenance_matches_anchored_commitment() {
        let harness = create_harness(InMemoryLedger::new());
        let record = upload(&harness, b"0123456789").await;

        let submitted = harness.ledger.submitted().await;
        assert_eq!(submitted.len(), 1);
        let payload = &submitted[0].1;
        assert!(Commitment::verify(&record, CommitmentKind::Create, payload));

        let view = harness.service.provenance(&record.id).await.expect("Failed to load provenance");
        assert_eq!(view.commitment_digest, Commitment::digest(payload));
        assert_eq!(view.on_chain_ref.map(|r| r.transaction_hash), Some(submitted[0].0 .0.clone()));

        let json = serde_json::to_string(&harness.service.list().await.expect("Failed to list")).unwrap();
        assert!(!json.contains(record.download_token.expose()));
        assert!(!json.contains(record.delete_token.expose()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_create_keeps_content_and_tokens() {
        let harness = create_harness(InMemoryLedger::with_policy(ConfirmationPolicy::Never));
        let start = Instant::now();

        let outcome = harness
            .service
            .create(&AnchorContext::with_timeout(Duration::from_secs(2)), "a.txt", "alice", &b"pending"[..])
            .await
            .expect("Failed to create file");

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(2) + POLL_INTERVAL);

        assert!(!outcome.is_anchored());
        assert_eq!(outcome.reason().map(StoreError::kind), Some(ErrorKind::AnchorTimeout));
        let record = outcome.record().clone();
        assert!(record.on_chain_ref.is_none());

        let download = harness
            .service
            .read(&record.id, record.download_token.expose())
            .await
            .expect("Unanchored file should stay readable");
        assert_eq!(download.data, b"pending");

        let err = harness
            .service
            .delete(
                &AnchorContext::with_timeout(Duration::from_secs(2)),
                &record.id,
                record.delete_token.expose(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AnchorTimeout);

        // An unconfirmed delete leaves the record live.
        let stored = harness.index.get(&record.id).await.unwrap().expect("record should exist");
        assert!(!stored.deleted);
    }

    #[tokio::test]
    async fn test_rejected_submission_is_reported() {
        let harness = create_harness(InMemoryLedger::new().rejecting("insufficient funds"));

        let outcome = harness
            .service
            .create(&ctx(), "a.txt", "alice", &b"data"[..])
            .await
            .expect("Failed to create file");
        assert_eq!(outcome.reason().map(StoreError::kind), Some(ErrorKind::AnchorRejected));

        let record = outcome.record();
        let err = harness
            .service
            .delete(&ctx(), &record.id, record.delete_token.expose())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AnchorRejected(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reanchor_recovers_unanchored_record() {
        let harness = create_harness(InMemoryLedger::with_policy(ConfirmationPolicy::Never));
        let outcome = harness
            .service
            .create(&AnchorContext::with_timeout(Duration::from_secs(1)), "a.txt", "alice", &b"later"[..])
            .await
            .expect("Failed to create file");
        let id = outcome.record().id;

        harness.ledger.set_policy(ConfirmationPolicy::Immediate).await;
        let reference = harness.service.reanchor(&ctx(), &id).await.expect("Failed to reanchor");
        assert_eq!(reference.kind, CommitmentKind::Create);

        // Already anchored: no second submission.
        let again = harness.service.reanchor(&ctx(), &id).await.expect("Failed to reanchor");
        assert_eq!(again, reference);
        assert_eq!(harness.ledger.submitted().await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_deletes_succeed_once() {
        let harness = create_harness(InMemoryLedger::new());
        let record = upload(&harness, b"contended").await;
        let token = record.delete_token.expose();

        let (ctx_a, ctx_b) = (ctx(), ctx());
        let (first, second) = tokio::join!(
            harness.service.delete(&ctx_a, &record.id, token),
            harness.service.delete(&ctx_b, &record.id, token),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let failure = results.iter().find_map(|r| r.as_ref().err()).expect("one delete should fail");
        assert_eq!(failure.kind(), ErrorKind::NotFound);

        let stored = harness.index.get(&record.id).await.unwrap().expect("tombstone should exist");
        assert!(stored.deleted);
    }

    /// Wait until the ledger has seen `count` submissions.
    async fn wait_for_submissions(ledger: &InMemoryLedger, count: usize) -> Vec<(TxHandle, Vec<u8>)> {
        loop {
            let submitted = ledger.submitted().await;
            if submitted.len() >= count {
                return submitted;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_create_confirmation_cannot_resurrect() {
        let harness = create_harness(InMemoryLedger::with_policy(ConfirmationPolicy::Manual));
        let outcome = harness
            .service
            .create(&AnchorContext::with_timeout(Duration::from_secs(1)), "a.txt", "alice", &b"raced"[..])
            .await
            .expect("Failed to create file");
        assert!(!outcome.is_anchored());
        let id = outcome.record().id;
        let token = outcome.record().delete_token.expose().to_string();

        let reanchor = tokio::spawn({
            let service = harness.service.clone();
            async move { service.reanchor(&ctx(), &id).await }
        });
        let delete = tokio::spawn({
            let service = harness.service.clone();
            async move { service.delete(&ctx(), &id, &token).await }
        });

        let submitted = wait_for_submissions(&harness.ledger, 3).await;
        let kind_of = |payload: &[u8]| Commitment::decode(payload).expect("Failed to decode commitment").kind;
        let (delete_tx, _) = submitted[1..]
            .iter()
            .find(|(_, payload)| kind_of(payload) == CommitmentKind::Delete)
            .expect("delete should be submitted");
        let (create_tx, _) = submitted[1..]
            .iter()
            .find(|(_, payload)| kind_of(payload) == CommitmentKind::Create)
            .expect("reanchor should be submitted");

        // The tombstone confirms first, the retried create after it.
        assert!(harness.ledger.release(delete_tx).await);
        let deleted = delete.await.unwrap().expect("Failed to delete file");
        assert_eq!(deleted.kind, CommitmentKind::Delete);

        assert!(harness.ledger.release(create_tx).await);
        let err = reanchor.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let stored = harness.index.get(&id).await.unwrap().expect("tombstone should exist");
        assert!(stored.deleted);
        assert_eq!(stored.on_chain_ref, Some(deleted));
    }

    #[tokio::test]
    async fn test_content_backend_failure_is_storage_failure() {
        let index = Arc::new(MemoryIndex::new());
        let service = MetadataService::new(
            Arc::new(FailingContentStore),
            index.clone(),
            ChainAnchor::new(Arc::new(InMemoryLedger::new()), POLL_INTERVAL),
        );

        let err = service
            .create(&ctx(), "a.txt", "alice", &b"data"[..])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert!(index.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let harness = create_harness(InMemoryLedger::new());
        let id = FileId::new();

        assert_eq!(harness.service.read(&id, "token").await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(harness.service.provenance(&id).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert!(harness.ledger.submitted().await.is_empty());
    }
}
