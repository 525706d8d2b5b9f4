use super::version::{ApiVersion, Versioned};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a submitted payment.
///
/// New submissions always start as `Pending`. Only downstream settlement moves
/// them forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Rejected,
    AcceptedSettlementInProcess,
    AcceptedSettlementCompleted,
    AcceptedWithoutPosting,
    AcceptedCreditSettlementCompleted,
}

/// The persisted record of a write attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission<P> {
    /// The consent id under the single-resource policy, a generated
    /// transaction id under the multi-resource policy.
    pub id: String,
    pub consent_id: String,
    pub api_client_id: String,
    pub idempotency_key: String,
    /// Set only under the multi-resource policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key_expiry: Option<DateTime<Utc>>,
    pub payload: P,
    pub status: PaymentStatus,
    pub api_version: ApiVersion,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl<P> Submission<P> {
    /// Whether the idempotency key still reserves its scope at `now`.
    ///
    /// Keys without an expiry never lapse.
    pub fn is_key_live(&self, now: DateTime<Utc>) -> bool {
        self.idempotency_key_expiry.is_none_or(|expiry| expiry > now)
    }

    pub fn scope_matches(&self, consent_id: &str, api_client_id: &str, key: &str) -> bool {
        self.consent_id == consent_id
            && self.api_client_id == api_client_id
            && self.idempotency_key == key
    }
}

impl<P> Versioned for Submission<P> {
    fn api_version(&self) -> ApiVersion {
        self.api_version
    }
}

/// An inbound write as handed over by the routing layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest<P> {
    pub consent_id: String,
    pub api_client_id: String,
    pub idempotency_key: String,
    pub payload: P,
    pub api_version: ApiVersion,
    /// Explicit key expiry for multi-resource submissions. Ignored by the
    /// single-resource policy.
    pub idempotency_key_expiry: Option<DateTime<Utc>>,
}

impl<P> SubmissionRequest<P> {
    pub fn new(
        consent_id: impl Into<String>,
        api_client_id: impl Into<String>,
        idempotency_key: impl Into<String>,
        payload: P,
        api_version: ApiVersion,
    ) -> Self {
        Self {
            consent_id: consent_id.into(),
            api_client_id: api_client_id.into(),
            idempotency_key: idempotency_key.into(),
            payload,
            api_version,
            idempotency_key_expiry: None,
        }
    }

    pub fn with_key_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.idempotency_key_expiry = Some(expiry);
        self
    }
}
