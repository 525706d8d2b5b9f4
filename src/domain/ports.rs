use super::submission::Submission;
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence contract for submissions.
///
/// Implementations must enforce uniqueness on `id`, and on
/// (consent id, api client id, idempotency key) among records whose key is still
/// live. A losing insert reports [`StoreError::UniqueKeyViolation`].
#[async_trait]
pub trait SubmissionStore<P>: Send + Sync
where
    P: Send + Sync + 'static,
{
    async fn insert(&self, submission: Submission<P>) -> Result<(), StoreError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Submission<P>>, StoreError>;
    /// Returns the live submission for the triple if there is one, otherwise the
    /// most recently created expired one.
    async fn find_by_consent_client_key(
        &self,
        consent_id: &str,
        api_client_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<Submission<P>>, StoreError>;
}

pub type SubmissionStoreRef<P> = Arc<dyn SubmissionStore<P>>;
