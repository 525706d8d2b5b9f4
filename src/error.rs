use crate::domain::version::ApiVersion;
use thiserror::Error;

/// Failures raised by a submission store backend.
///
/// A uniqueness violation is the only variant the submission service recovers
/// from internally. Everything else is transient from the caller's point of view.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique key violation on {0}")]
    UniqueKeyViolation(String),
    #[error("store call timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("a submission already exists for consent {consent_id}")]
    SubmissionAlreadyExists { consent_id: String },
    #[error("idempotency key {idempotency_key} was reused with a different request body")]
    IdempotencyKeyBodyChanged { idempotency_key: String },
    #[error("submission {0} not found")]
    SubmissionNotFound(String),
    #[error("resource created under {resource} cannot be accessed through {request}")]
    VersionConflict {
        request: ApiVersion,
        resource: ApiVersion,
    },
    #[error("file type {0} is not supported")]
    FileTypeNotSupported(String),
    #[error("payment file is empty")]
    EmptyFile,
    #[error("invalid payment file content: {0}")]
    InvalidFileContent(String),
    #[error("content type {actual} does not match {expected} expected for file type {file_type}")]
    ContentTypeMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
    #[error("payment file does not match its consent: {0}")]
    FileReconciliation(String),
    #[error("invalid codec registry configuration: {0}")]
    RegistryConfiguration(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// True for transient store failures the caller may retry.
    ///
    /// Business rule violations are never retryable: resending the same request
    /// produces the same outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store(
                StoreError::Timeout(_) | StoreError::Unavailable(_) | StoreError::Backend(_)
            )
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
