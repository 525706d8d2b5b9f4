use super::{PaymentFileProcessor, default_processors};
use crate::domain::file::{PaymentFile, PaymentFileType};
use crate::domain::submission::PaymentStatus;
use crate::error::{EngineError, Result};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Dispatches bulk-file parsing to the processor registered for a file type.
///
/// Built once at startup and immutable afterwards, so it can be shared freely
/// across request tasks.
#[derive(Debug)]
pub struct PaymentFileCodecRegistry {
    processors: HashMap<String, PaymentFileProcessor>,
}

impl PaymentFileCodecRegistry {
    /// Builds a registry, failing on an empty list or on two processors that
    /// declare the same file type.
    pub fn new(processors: Vec<PaymentFileProcessor>) -> Result<Self> {
        if processors.is_empty() {
            return Err(EngineError::RegistryConfiguration(
                "at least one payment file processor is required".to_string(),
            ));
        }

        let mut registered = HashMap::with_capacity(processors.len());
        for processor in processors {
            let file_type = processor.file_type().file_type.clone();
            if registered.contains_key(&file_type) {
                return Err(EngineError::RegistryConfiguration(format!(
                    "more than one processor declares file type {file_type}"
                )));
            }
            registered.insert(file_type, processor);
        }

        info!(
            "Payment file codec registry initialized ({} file types)",
            registered.len()
        );
        Ok(Self {
            processors: registered,
        })
    }

    /// A registry with every built-in format.
    pub fn with_defaults() -> Result<Self> {
        Self::new(default_processors())
    }

    pub fn find_file_type(&self, file_type: &str) -> Result<PaymentFileType> {
        self.processor(file_type)
            .map(|processor| processor.file_type().clone())
    }

    /// Registered file types, sorted by identifier.
    pub fn file_types(&self) -> Vec<&PaymentFileType> {
        let mut types: Vec<_> = self
            .processors
            .values()
            .map(PaymentFileProcessor::file_type)
            .collect();
        types.sort_by(|a, b| a.file_type.cmp(&b.file_type));
        types
    }

    /// Parses `content` with the processor registered for `file_type`.
    ///
    /// Every failure is classified: `EmptyFile`, `FileTypeNotSupported`, or
    /// `InvalidFileContent`. A processor that panics is reported as invalid
    /// content as well.
    pub fn process_file(&self, file_type: &str, content: &[u8]) -> Result<PaymentFile> {
        if content.trim_ascii().is_empty() {
            return Err(EngineError::EmptyFile);
        }
        let processor = self.processor(file_type)?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor.parse(content)));
        let mut parsed = match outcome {
            Ok(Ok(parsed)) => parsed,
            Ok(Err(e)) => {
                debug!(file_type, "Payment file rejected: {}", e);
                return Err(EngineError::InvalidFileContent(e.to_string()));
            }
            Err(fault) => {
                let message = panic_message(fault.as_ref());
                warn!(file_type, "Payment file processor failed: {}", message);
                return Err(EngineError::InvalidFileContent(format!(
                    "processor failure: {message}"
                )));
            }
        };

        for payment in &mut parsed.payments {
            payment.status = PaymentStatus::Pending;
        }

        debug!(
            file_type,
            payments = parsed.payments.len(),
            "Payment file parsed"
        );
        Ok(PaymentFile {
            file_type: processor.file_type().clone(),
            payments: parsed.payments,
            control_sum: parsed.control_sum,
        })
    }

    fn processor(&self, file_type: &str) -> Result<&PaymentFileProcessor> {
        self.processors
            .get(file_type)
            .ok_or_else(|| EngineError::FileTypeNotSupported(file_type.to_string()))
    }
}

fn panic_message(fault: &(dyn Any + Send)) -> String {
    if let Some(message) = fault.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = fault.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
