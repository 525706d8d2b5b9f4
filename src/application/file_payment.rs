use super::submission::IdempotentSubmissionService;
use crate::domain::file::{FileConsentTotals, FilePayment};
use crate::domain::submission::{Submission, SubmissionRequest};
use crate::domain::version::ApiVersion;
use crate::error::{EngineError, Result};
use crate::interfaces::codec::registry::PaymentFileCodecRegistry;
use std::sync::Arc;
use tracing::info;

/// A raw bulk upload plus the scope it is submitted under.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_type: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub consent_id: String,
    pub api_client_id: String,
    pub idempotency_key: String,
    pub api_version: ApiVersion,
    /// Totals declared by the file consent, when the caller has them.
    pub expected: Option<FileConsentTotals>,
}

/// Parses bulk uploads and submits the result through the idempotent write path.
pub struct FileSubmissionService {
    registry: Arc<PaymentFileCodecRegistry>,
    submissions: IdempotentSubmissionService<FilePayment>,
}

impl FileSubmissionService {
    pub fn new(
        registry: Arc<PaymentFileCodecRegistry>,
        submissions: IdempotentSubmissionService<FilePayment>,
    ) -> Self {
        Self {
            registry,
            submissions,
        }
    }

    pub fn submissions(&self) -> &IdempotentSubmissionService<FilePayment> {
        &self.submissions
    }

    pub async fn submit_file(&self, upload: FileUpload) -> Result<Submission<FilePayment>> {
        let file_type = self.registry.find_file_type(&upload.file_type)?;
        if !file_type.accepts_content_type(&upload.content_type) {
            return Err(EngineError::ContentTypeMismatch {
                file_type: file_type.file_type,
                expected: file_type.content_type,
                actual: upload.content_type,
            });
        }

        let file = self
            .registry
            .process_file(&upload.file_type, &upload.content)?;
        let payload = FilePayment::from_file(file, &upload.content);
        if let Some(expected) = &upload.expected {
            payload.reconcile(expected)?;
        }

        info!(
            consent_id = %upload.consent_id,
            file_type = %payload.file_type,
            payments = payload.number_of_transactions,
            "Submitting payment file"
        );
        let request = SubmissionRequest::new(
            upload.consent_id,
            upload.api_client_id,
            upload.idempotency_key,
            payload,
            upload.api_version,
        );
        self.submissions.submit(request).await
    }
}
