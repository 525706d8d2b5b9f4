use rust_decimal_macros::dec;
use std::sync::Arc;
use submission_engine::application::submission::{IdempotentSubmissionService, SubmissionPolicy};
use submission_engine::domain::payment::DomesticPayment;
use submission_engine::domain::ports::SubmissionStoreRef;
use submission_engine::infrastructure::in_memory::InMemorySubmissionStore;

mod common;

#[tokio::test]
async fn test_store_as_trait_object() {
    let store: SubmissionStoreRef<DomesticPayment> = Arc::new(InMemorySubmissionStore::new());
    let service = IdempotentSubmissionService::new(
        Arc::clone(&store),
        SubmissionPolicy::SingleResourcePerConsent,
    );

    // Verify Send + Sync by spawning tasks
    let handle = tokio::spawn(async move {
        service
            .submit(common::request(
                "PDC_1",
                "key-1",
                common::domestic_payment(dec!(100.00), "INV-1"),
            ))
            .await
            .unwrap()
    });
    let created = handle.await.unwrap();

    let reader = tokio::spawn(async move { store.find_by_id("PDC_1").await.unwrap().unwrap() });
    assert_eq!(reader.await.unwrap(), created);
}
