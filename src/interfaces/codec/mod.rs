//! Bulk payment file codecs.
//!
//! A processor pairs a [`PaymentFileType`] with a parse function. The
//! [`registry::PaymentFileCodecRegistry`] maps file-type identifiers to
//! processors; supporting a new format means registering one more function.

pub mod fps_batch;
pub mod obie_json;
pub mod pain001;
pub mod registry;

use crate::domain::file::{ParsedPayments, PaymentFileType};
use crate::domain::payment::Amount;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// A structured parse failure reported by a format processor.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed content: {0}")]
    Syntax(String),
    #[error("missing required node: {0}")]
    MissingNode(String),
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ParseFn = Arc<dyn Fn(&[u8]) -> Result<ParsedPayments, ParseError> + Send + Sync>;

/// A file type together with the function that parses it.
#[derive(Clone)]
pub struct PaymentFileProcessor {
    file_type: PaymentFileType,
    parse: ParseFn,
}

impl PaymentFileProcessor {
    pub fn new<F>(file_type: PaymentFileType, parse: F) -> Self
    where
        F: Fn(&[u8]) -> Result<ParsedPayments, ParseError> + Send + Sync + 'static,
    {
        Self {
            file_type,
            parse: Arc::new(parse),
        }
    }

    pub fn file_type(&self) -> &PaymentFileType {
        &self.file_type
    }

    pub fn parse(&self, content: &[u8]) -> Result<ParsedPayments, ParseError> {
        (self.parse)(content)
    }
}

impl fmt::Debug for PaymentFileProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentFileProcessor")
            .field("file_type", &self.file_type)
            .finish_non_exhaustive()
    }
}

/// The processors shipped with the engine.
pub fn default_processors() -> Vec<PaymentFileProcessor> {
    vec![
        fps_batch::processor(),
        obie_json::processor(),
        pain001::processor(),
    ]
}

pub(crate) fn parse_amount(raw: &str) -> Result<Amount, ParseError> {
    let value = Decimal::from_str(raw.trim()).map_err(|_| ParseError::InvalidAmount(raw.into()))?;
    Amount::new(value).map_err(|_| ParseError::InvalidAmount(raw.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 25.50 ").unwrap().value(), dec!(25.50));
        assert!(matches!(
            parse_amount("0.00"),
            Err(ParseError::InvalidAmount(_))
        ));
        assert!(matches!(
            parse_amount("ten"),
            Err(ParseError::InvalidAmount(_))
        ));
    }
}
