use super::fingerprint::Fingerprint;
use super::payment::{Amount, ControlSum, CreditorAccount, InstructedAmount};
use super::submission::PaymentStatus;
use crate::error::EngineError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A bulk file format the registry can parse, keyed by its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFileType {
    pub file_type: String,
    pub content_type: String,
}

impl PaymentFileType {
    pub fn new(file_type: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            file_type: file_type.into(),
            content_type: content_type.into(),
        }
    }

    /// Compares media types case-insensitively, ignoring parameters such as `charset`.
    pub fn accepts_content_type(&self, content_type: &str) -> bool {
        media_type(&self.content_type).eq_ignore_ascii_case(media_type(content_type))
    }
}

fn media_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or_default()
}

/// One payment instruction inside a bulk file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilePaymentItem {
    pub instruction_identification: String,
    pub end_to_end_identification: String,
    pub instructed_amount: InstructedAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creditor_account: Option<CreditorAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creditor_reference: Option<String>,
    #[serde(default)]
    pub status: PaymentStatus,
}

impl FilePaymentItem {
    pub fn amount(&self) -> Amount {
        self.instructed_amount.amount
    }
}

/// Line items and control sum as produced by a format processor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedPayments {
    pub payments: Vec<FilePaymentItem>,
    pub control_sum: ControlSum,
}

impl ParsedPayments {
    /// Appends a line item, accumulating the control sum.
    pub fn push(&mut self, item: FilePaymentItem) {
        self.control_sum += item.amount();
        self.payments.push(item);
    }
}

/// The transient result of parsing a bulk upload.
///
/// `control_sum` is accumulated while parsing and never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFile {
    pub file_type: PaymentFileType,
    pub payments: Vec<FilePaymentItem>,
    pub control_sum: ControlSum,
}

impl PaymentFile {
    pub fn number_of_transactions(&self) -> usize {
        self.payments.len()
    }
}

/// Totals declared by the file consent before the upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileConsentTotals {
    pub number_of_transactions: usize,
    pub control_sum: ControlSum,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
}

/// The payload submitted for a bulk file payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilePayment {
    pub file_type: String,
    /// Base64 encoded SHA-256 of the raw upload.
    pub file_hash: String,
    pub number_of_transactions: usize,
    pub control_sum: ControlSum,
    pub payments: Vec<FilePaymentItem>,
}

/// Replays are byte-exact: `FileHash` stays in the fingerprint, so re-encoding
/// the same line items (line endings, trailing whitespace) is a different body.
impl Fingerprint for FilePayment {
    // Line-item status belongs to the registry and to settlement, not to the client.
    const VOLATILE_FIELDS: &'static [&'static str] = &["Status"];
}

impl FilePayment {
    pub fn from_file(file: PaymentFile, raw_content: &[u8]) -> Self {
        Self {
            file_type: file.file_type.file_type,
            file_hash: file_hash(raw_content),
            number_of_transactions: file.payments.len(),
            control_sum: file.control_sum,
            payments: file.payments,
        }
    }

    /// Checks the parsed file against what its consent declared.
    pub fn reconcile(&self, expected: &FileConsentTotals) -> Result<(), EngineError> {
        if self.number_of_transactions != expected.number_of_transactions {
            return Err(EngineError::FileReconciliation(format!(
                "file contains {} transactions, consent declared {}",
                self.number_of_transactions, expected.number_of_transactions
            )));
        }
        if self.control_sum != expected.control_sum {
            return Err(EngineError::FileReconciliation(format!(
                "file control sum {} does not match consent control sum {}",
                self.control_sum.value(),
                expected.control_sum.value()
            )));
        }
        if let Some(hash) = &expected.file_hash
            && *hash != self.file_hash
        {
            return Err(EngineError::FileReconciliation(
                "file hash does not match consent file hash".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn file_hash(raw_content: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(raw_content))
}
