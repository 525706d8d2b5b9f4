use crate::domain::fingerprint::Fingerprint;
use crate::domain::ports::SubmissionStoreRef;
use crate::domain::submission::{PaymentStatus, Submission, SubmissionRequest};
use crate::domain::version::{ApiVersion, ensure_access};
use crate::error::{EngineError, Result, StoreError};
use chrono::{Duration as KeyTtl, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default idempotency window for multi-resource submissions.
pub const DEFAULT_KEY_TTL_HOURS: i64 = 24;
/// Default budget for a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// How submissions are scoped to their consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPolicy {
    /// A consent yields exactly one terminal write; the submission id is the consent id.
    SingleResourcePerConsent,
    /// A consent authorizes repeated writes; each gets a generated id and is
    /// looked up by (consent, client, idempotency key) until its key expires.
    MultiResourcePerConsent { default_key_ttl: KeyTtl },
}

impl SubmissionPolicy {
    pub fn multi_resource() -> Self {
        Self::MultiResourcePerConsent {
            default_key_ttl: KeyTtl::hours(DEFAULT_KEY_TTL_HOURS),
        }
    }
}

/// Result of the insert step. Losing a race is an expected outcome, not an error.
enum InsertOutcome<P> {
    Inserted(Submission<P>),
    LostRace,
}

/// The write path that applies a client request at most once per idempotency key.
///
/// Correctness rests on the store's unique constraint: two concurrent first
/// submissions both try to insert, exactly one wins, and the loser re-reads the
/// winner's record and compares against it.
pub struct IdempotentSubmissionService<P> {
    store: SubmissionStoreRef<P>,
    policy: SubmissionPolicy,
    store_timeout: Duration,
}

impl<P> IdempotentSubmissionService<P>
where
    P: Fingerprint + Clone + Send + Sync + 'static,
{
    pub fn new(store: SubmissionStoreRef<P>, policy: SubmissionPolicy) -> Self {
        Self {
            store,
            policy,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn policy(&self) -> SubmissionPolicy {
        self.policy
    }

    /// Creates the submission, replays the stored one, or fails with a conflict.
    ///
    /// # Errors
    ///
    /// * `SubmissionAlreadyExists` - the consent already has a submission under another key.
    /// * `IdempotencyKeyBodyChanged` - the key was used before with a different payload.
    /// * `VersionConflict` - a replay requested through an older API revision.
    /// * `Store` - transient store failure, safe to retry.
    pub async fn submit(&self, request: SubmissionRequest<P>) -> Result<Submission<P>> {
        if let Some(existing) = self.lookup(&request).await? {
            return self.replay(existing, &request);
        }

        let submission = self.new_submission(&request);
        match self.insert(submission).await? {
            InsertOutcome::Inserted(created) => {
                info!(
                    id = %created.id,
                    consent_id = %created.consent_id,
                    "Submission created"
                );
                Ok(created)
            }
            InsertOutcome::LostRace => {
                warn!(
                    consent_id = %request.consent_id,
                    idempotency_key = %request.idempotency_key,
                    "Concurrent submission won the insert, re-reading"
                );
                match self.lookup(&request).await? {
                    Some(winner) => self.replay(winner, &request),
                    None => Err(EngineError::Store(StoreError::Unavailable(format!(
                        "submission for consent {} vanished after a unique key violation",
                        request.consent_id
                    )))),
                }
            }
        }
    }

    /// Read-only variant of [`submit`](Self::submit).
    ///
    /// Returns `None` only when nothing matches; a match that conflicts with the
    /// request fails exactly as `submit` would.
    pub async fn find(&self, request: &SubmissionRequest<P>) -> Result<Option<Submission<P>>> {
        match self.lookup(request).await? {
            Some(existing) => admit(existing, request).map(Some),
            None => Ok(None),
        }
    }

    /// Reads a submission by id through the version gate.
    pub async fn get(&self, id: &str, request_version: ApiVersion) -> Result<Submission<P>> {
        let submission = self
            .call(self.store.find_by_id(id))
            .await?
            .ok_or_else(|| EngineError::SubmissionNotFound(id.to_string()))?;
        ensure_access(request_version, &submission)?;
        Ok(submission)
    }

    async fn lookup(&self, request: &SubmissionRequest<P>) -> Result<Option<Submission<P>>> {
        match self.policy {
            // Ownership by api client is established before this layer is reached.
            SubmissionPolicy::SingleResourcePerConsent => {
                Ok(self.call(self.store.find_by_id(&request.consent_id)).await?)
            }
            SubmissionPolicy::MultiResourcePerConsent { .. } => {
                let found = self
                    .call(self.store.find_by_consent_client_key(
                        &request.consent_id,
                        &request.api_client_id,
                        &request.idempotency_key,
                    ))
                    .await?;
                let now = Utc::now();
                Ok(found.filter(|submission| {
                    let live = submission.is_key_live(now);
                    if !live {
                        debug!(
                            id = %submission.id,
                            "Idempotency key expired, treating as a new submission"
                        );
                    }
                    live
                }))
            }
        }
    }

    fn replay(
        &self,
        existing: Submission<P>,
        request: &SubmissionRequest<P>,
    ) -> Result<Submission<P>> {
        let existing = admit(existing, request)?;
        info!(id = %existing.id, "Idempotent replay, returning stored submission");
        Ok(existing)
    }

    async fn insert(&self, submission: Submission<P>) -> Result<InsertOutcome<P>> {
        match self.call(self.store.insert(submission.clone())).await {
            Ok(()) => Ok(InsertOutcome::Inserted(submission)),
            Err(StoreError::UniqueKeyViolation(_)) => Ok(InsertOutcome::LostRace),
            Err(e) => Err(e.into()),
        }
    }

    fn new_submission(&self, request: &SubmissionRequest<P>) -> Submission<P> {
        let now = Utc::now();
        let (id, idempotency_key_expiry) = match self.policy {
            SubmissionPolicy::SingleResourcePerConsent => (request.consent_id.clone(), None),
            SubmissionPolicy::MultiResourcePerConsent { default_key_ttl } => (
                Uuid::new_v4().to_string(),
                Some(
                    request
                        .idempotency_key_expiry
                        .unwrap_or(now + default_key_ttl),
                ),
            ),
        };

        Submission {
            id,
            consent_id: request.consent_id.clone(),
            api_client_id: request.api_client_id.clone(),
            idempotency_key: request.idempotency_key.clone(),
            idempotency_key_expiry,
            payload: request.payload.clone(),
            status: PaymentStatus::Pending,
            api_version: request.api_version,
            created: now,
            updated: now,
        }
    }

    async fn call<T>(
        &self,
        operation: impl Future<Output = std::result::Result<T, StoreError>>,
    ) -> std::result::Result<T, StoreError> {
        tokio::time::timeout(self.store_timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))?
    }
}

/// A located submission is returned only if it matches the request and the
/// request's revision may read it.
fn admit<P: Fingerprint>(
    existing: Submission<P>,
    request: &SubmissionRequest<P>,
) -> Result<Submission<P>> {
    let existing = compare(existing, request)?;
    ensure_access(request.api_version, &existing)?;
    Ok(existing)
}

/// The replay-or-conflict decision shared by both policies.
fn compare<P: Fingerprint>(
    existing: Submission<P>,
    request: &SubmissionRequest<P>,
) -> Result<Submission<P>> {
    if existing.idempotency_key != request.idempotency_key {
        debug!(id = %existing.id, "Consent already has a submission under another key");
        return Err(EngineError::SubmissionAlreadyExists {
            consent_id: request.consent_id.clone(),
        });
    }
    if !existing.payload.equal_payload(&request.payload) {
        debug!(id = %existing.id, "Idempotency key reused with a different body");
        return Err(EngineError::IdempotencyKeyBodyChanged {
            idempotency_key: request.idempotency_key.clone(),
        });
    }
    Ok(existing)
}
