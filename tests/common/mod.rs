#![allow(dead_code)]

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use submission_engine::domain::payment::{Amount, CreditorAccount, DomesticPayment, InstructedAmount};
use submission_engine::domain::ports::SubmissionStore;
use submission_engine::domain::submission::{Submission, SubmissionRequest};
use submission_engine::domain::version::ApiVersion;
use submission_engine::error::StoreError;
use submission_engine::infrastructure::in_memory::InMemorySubmissionStore;
use tokio::sync::Barrier;

pub const API_VERSION: ApiVersion = ApiVersion::new(3, 1, 10);

pub fn domestic_payment(amount: Decimal, reference: &str) -> DomesticPayment {
    DomesticPayment {
        instruction_identification: "INSTR-1".into(),
        end_to_end_identification: "E2E-1".into(),
        instructed_amount: InstructedAmount {
            amount: Amount::new(amount).unwrap(),
            currency: "GBP".into(),
        },
        creditor_account: CreditorAccount {
            scheme_name: "UK.OBIE.SortCodeAccountNumber".into(),
            identification: "20000055555555".into(),
            name: Some("Ada Lovelace".into()),
        },
        reference: Some(reference.into()),
        requested_execution_date_time: None,
    }
}

pub fn request<P>(consent_id: &str, key: &str, payload: P) -> SubmissionRequest<P> {
    SubmissionRequest::new(consent_id, "client-1", key, payload, API_VERSION)
}

/// Writes an `UK.LBG.O.FPS.Batch.v10` file with random amounts and returns their sum.
pub fn generate_batch(path: &Path, rows: usize) -> Result<Decimal, Error> {
    let mut file = File::create(path)?;
    let mut rng = rand::thread_rng();
    let mut total = Decimal::ZERO;

    writeln!(file, "H,BATCH-{rows}")?;
    for i in 1..=rows {
        let amount = Decimal::new(rng.gen_range(1..=1_000_000), 2);
        total += amount;
        writeln!(file, "D,INSTR-{i},E2E-{i},{amount},GBP,Creditor {i},20000055555555,INV-{i}")?;
    }
    Ok(total)
}

/// Holds the first `parties` lookups until all of them have read, so every
/// party observes "no existing record" before anyone inserts.
pub struct BarrierStore<P> {
    pub inner: InMemorySubmissionStore<P>,
    barrier: Barrier,
    parties: usize,
    lookups: AtomicUsize,
}

impl<P> BarrierStore<P> {
    pub fn new(inner: InMemorySubmissionStore<P>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            parties,
            lookups: AtomicUsize::new(0),
        }
    }

    async fn rendezvous(&self) {
        if self.lookups.fetch_add(1, Ordering::SeqCst) < self.parties {
            self.barrier.wait().await;
        }
    }
}

#[async_trait]
impl<P> SubmissionStore<P> for BarrierStore<P>
where
    P: Clone + Send + Sync + 'static,
{
    async fn insert(&self, submission: Submission<P>) -> Result<(), StoreError> {
        self.inner.insert(submission).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Submission<P>>, StoreError> {
        let found = self.inner.find_by_id(id).await;
        self.rendezvous().await;
        found
    }

    async fn find_by_consent_client_key(
        &self,
        consent_id: &str,
        api_client_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<Submission<P>>, StoreError> {
        let found = self
            .inner
            .find_by_consent_client_key(consent_id, api_client_id, idempotency_key)
            .await;
        self.rendezvous().await;
        found
    }
}

/// A store whose reads hang and whose inserts fail, for failure-path tests.
pub struct UnhealthyStore {
    pub read_delay: Duration,
}

#[async_trait]
impl<P> SubmissionStore<P> for UnhealthyStore
where
    P: Send + Sync + 'static,
{
    async fn insert(&self, _submission: Submission<P>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<Submission<P>>, StoreError> {
        tokio::time::sleep(self.read_delay).await;
        Ok(None)
    }

    async fn find_by_consent_client_key(
        &self,
        _consent_id: &str,
        _api_client_id: &str,
        _idempotency_key: &str,
    ) -> Result<Option<Submission<P>>, StoreError> {
        tokio::time::sleep(self.read_delay).await;
        Ok(None)
    }
}

/// A store where every insert loses a race that no read can observe.
pub struct VanishingStore;

#[async_trait]
impl<P> SubmissionStore<P> for VanishingStore
where
    P: Send + Sync + 'static,
{
    async fn insert(&self, submission: Submission<P>) -> Result<(), StoreError> {
        Err(StoreError::UniqueKeyViolation(submission.id))
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<Submission<P>>, StoreError> {
        Ok(None)
    }

    async fn find_by_consent_client_key(
        &self,
        _consent_id: &str,
        _api_client_id: &str,
        _idempotency_key: &str,
    ) -> Result<Option<Submission<P>>, StoreError> {
        Ok(None)
    }
}
