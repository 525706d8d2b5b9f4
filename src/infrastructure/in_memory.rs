use crate::domain::ports::SubmissionStore;
use crate::domain::submission::Submission;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory submission store.
///
/// Both uniqueness checks and the insert happen under a single write lock, so
/// concurrent inserts for the same scope are serialized here exactly as a
/// document store's unique index would serialize them.
pub struct InMemorySubmissionStore<P> {
    submissions: Arc<RwLock<HashMap<String, Submission<P>>>>,
}

impl<P> InMemorySubmissionStore<P> {
    /// Creates a new, empty in-memory submission store.
    pub fn new() -> Self {
        Self {
            submissions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored submissions.
    pub async fn len(&self) -> usize {
        self.submissions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.submissions.read().await.is_empty()
    }
}

impl<P> Default for InMemorySubmissionStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for InMemorySubmissionStore<P> {
    fn clone(&self) -> Self {
        Self {
            submissions: Arc::clone(&self.submissions),
        }
    }
}

#[async_trait]
impl<P> SubmissionStore<P> for InMemorySubmissionStore<P>
where
    P: Clone + Send + Sync + 'static,
{
    async fn insert(&self, submission: Submission<P>) -> Result<(), StoreError> {
        let mut submissions = self.submissions.write().await;

        if submissions.contains_key(&submission.id) {
            return Err(StoreError::UniqueKeyViolation(format!(
                "id {}",
                submission.id
            )));
        }

        let now = Utc::now();
        let scope_taken = submissions.values().any(|existing| {
            existing.is_key_live(now)
                && existing.scope_matches(
                    &submission.consent_id,
                    &submission.api_client_id,
                    &submission.idempotency_key,
                )
        });
        if scope_taken {
            return Err(StoreError::UniqueKeyViolation(format!(
                "idempotency key {}",
                submission.idempotency_key
            )));
        }

        submissions.insert(submission.id.clone(), submission);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Submission<P>>, StoreError> {
        let submissions = self.submissions.read().await;
        Ok(submissions.get(id).cloned())
    }

    async fn find_by_consent_client_key(
        &self,
        consent_id: &str,
        api_client_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<Submission<P>>, StoreError> {
        let submissions = self.submissions.read().await;
        let now = Utc::now();
        Ok(submissions
            .values()
            .filter(|s| s.scope_matches(consent_id, api_client_id, idempotency_key))
            .max_by_key(|s| (s.is_key_live(now), s.created))
            .cloned())
    }
}
