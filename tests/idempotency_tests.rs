use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use submission_engine::application::submission::{IdempotentSubmissionService, SubmissionPolicy};
use submission_engine::domain::payment::{DomesticPayment, VrpPayment};
use submission_engine::error::EngineError;
use submission_engine::infrastructure::in_memory::InMemorySubmissionStore;

mod common;

fn single_resource() -> (
    IdempotentSubmissionService<DomesticPayment>,
    InMemorySubmissionStore<DomesticPayment>,
) {
    let store = InMemorySubmissionStore::new();
    let service = IdempotentSubmissionService::new(
        Arc::new(store.clone()),
        SubmissionPolicy::SingleResourcePerConsent,
    );
    (service, store)
}

fn multi_resource() -> (
    IdempotentSubmissionService<VrpPayment>,
    InMemorySubmissionStore<VrpPayment>,
) {
    let store = InMemorySubmissionStore::new();
    let service =
        IdempotentSubmissionService::new(Arc::new(store.clone()), SubmissionPolicy::multi_resource());
    (service, store)
}

fn vrp(amount: rust_decimal::Decimal) -> VrpPayment {
    let payment = common::domestic_payment(amount, "VRP");
    VrpPayment {
        instruction_identification: payment.instruction_identification,
        end_to_end_identification: payment.end_to_end_identification,
        instructed_amount: payment.instructed_amount,
        creditor_account: payment.creditor_account,
        reference: payment.reference,
    }
}

#[tokio::test]
async fn test_idempotent_replay() {
    let (service, store) = single_resource();
    let payment = common::domestic_payment(dec!(100.00), "INV-1");

    let first = service
        .submit(common::request("PDC_1", "key-1", payment.clone()))
        .await
        .unwrap();
    for _ in 0..5 {
        let replay = service
            .submit(common::request("PDC_1", "key-1", payment.clone()))
            .await
            .unwrap();
        assert_eq!(replay, first);
    }

    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_key_reuse_conflict() {
    let (service, store) = single_resource();
    let payment = common::domestic_payment(dec!(100.00), "INV-1");

    service
        .submit(common::request("PDC_1", "key-A", payment.clone()))
        .await
        .unwrap();
    let second = service
        .submit(common::request("PDC_1", "key-B", payment))
        .await;

    assert!(matches!(
        second,
        Err(EngineError::SubmissionAlreadyExists { ref consent_id }) if consent_id == "PDC_1"
    ));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_payload_drift_conflict() {
    let (service, _) = single_resource();

    service
        .submit(common::request(
            "PDC_1",
            "key-A",
            common::domestic_payment(dec!(100.00), "INV-1"),
        ))
        .await
        .unwrap();
    let drifted = service
        .submit(common::request(
            "PDC_1",
            "key-A",
            common::domestic_payment(dec!(100.01), "INV-1"),
        ))
        .await;

    assert!(matches!(
        drifted,
        Err(EngineError::IdempotencyKeyBodyChanged { .. })
    ));
}

#[tokio::test]
async fn test_independent_consents_do_not_interfere() {
    let (service, store) = single_resource();
    let payment = common::domestic_payment(dec!(100.00), "INV-1");

    service
        .submit(common::request("PDC_1", "key-1", payment.clone()))
        .await
        .unwrap();
    service
        .submit(common::request("PDC_2", "key-1", payment))
        .await
        .unwrap();

    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_multi_resource_key_expiry_creates_new_submission() {
    let (service, store) = multi_resource();
    let expired = Utc::now() - Duration::minutes(5);

    let first = service
        .submit(common::request("DVRP_1", "key-1", vrp(dec!(10.00))).with_key_expiry(expired))
        .await
        .unwrap();
    let second = service
        .submit(common::request("DVRP_1", "key-1", vrp(dec!(10.00))))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert!(second.idempotency_key_expiry.unwrap() > Utc::now());
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_multi_resource_expired_key_allows_different_body() {
    let (service, _) = multi_resource();
    let expired = Utc::now() - Duration::minutes(5);

    service
        .submit(common::request("DVRP_1", "key-1", vrp(dec!(10.00))).with_key_expiry(expired))
        .await
        .unwrap();
    let reused = service
        .submit(common::request("DVRP_1", "key-1", vrp(dec!(99.00))))
        .await;

    assert!(reused.is_ok());
}

#[tokio::test]
async fn test_multi_resource_live_key_replays_and_conflicts() {
    let (service, store) = multi_resource();

    let first = service
        .submit(common::request("DVRP_1", "key-1", vrp(dec!(10.00))))
        .await
        .unwrap();
    let replay = service
        .submit(common::request("DVRP_1", "key-1", vrp(dec!(10.00))))
        .await
        .unwrap();
    assert_eq!(first, replay);

    let drifted = service
        .submit(common::request("DVRP_1", "key-1", vrp(dec!(11.00))))
        .await;
    assert!(matches!(
        drifted,
        Err(EngineError::IdempotencyKeyBodyChanged { .. })
    ));

    // A consent under this policy accepts many writes, one per key.
    service
        .submit(common::request("DVRP_1", "key-2", vrp(dec!(11.00))))
        .await
        .unwrap();
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_find_mirrors_submit_decisions() {
    let (service, store) = multi_resource();
    let request = common::request("DVRP_1", "key-1", vrp(dec!(10.00)));

    assert!(service.find(&request).await.unwrap().is_none());
    let created = service.submit(request.clone()).await.unwrap();
    assert_eq!(service.find(&request).await.unwrap(), Some(created));

    let drifted = common::request("DVRP_1", "key-1", vrp(dec!(12.00)));
    assert!(matches!(
        service.find(&drifted).await,
        Err(EngineError::IdempotencyKeyBodyChanged { .. })
    ));
    assert_eq!(store.len().await, 1);
}
