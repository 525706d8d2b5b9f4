//! `UK.OBIE.PaymentInitiation.3.1`: the Open Banking JSON bulk document.

use super::{ParseError, PaymentFileProcessor};
use crate::domain::file::{FilePaymentItem, ParsedPayments, PaymentFileType};
use crate::domain::payment::{CreditorAccount, InstructedAmount};
use crate::domain::submission::PaymentStatus;
use serde::Deserialize;

pub const FILE_TYPE: &str = "UK.OBIE.PaymentInitiation.3.1";
pub const CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BulkDocument {
    data: BulkData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BulkData {
    #[serde(default)]
    domestic_payments: Vec<DomesticPaymentEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DomesticPaymentEntry {
    instruction_identification: String,
    end_to_end_identification: String,
    instructed_amount: InstructedAmount,
    #[serde(default)]
    creditor_account: Option<CreditorAccount>,
    #[serde(default)]
    remittance_information: Option<RemittanceInformation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RemittanceInformation {
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    unstructured: Option<String>,
}

pub fn processor() -> PaymentFileProcessor {
    PaymentFileProcessor::new(PaymentFileType::new(FILE_TYPE, CONTENT_TYPE), parse)
}

pub fn parse(content: &[u8]) -> Result<ParsedPayments, ParseError> {
    let document: BulkDocument = serde_json::from_slice(content)?;

    let mut parsed = ParsedPayments::default();
    for entry in document.data.domestic_payments {
        let creditor_reference = entry
            .remittance_information
            .and_then(|info| info.reference.or(info.unstructured));
        parsed.push(FilePaymentItem {
            instruction_identification: entry.instruction_identification,
            end_to_end_identification: entry.end_to_end_identification,
            instructed_amount: entry.instructed_amount,
            creditor_account: entry.creditor_account,
            creditor_reference,
            status: PaymentStatus::Pending,
        });
    }

    if parsed.payments.is_empty() {
        return Err(ParseError::MissingNode("Data.DomesticPayments".into()));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn entry(id: &str, amount: &str) -> serde_json::Value {
        json!({
            "InstructionIdentification": format!("INSTR-{id}"),
            "EndToEndIdentification": format!("E2E-{id}"),
            "InstructedAmount": {"Amount": amount, "Currency": "GBP"},
            "CreditorAccount": {
                "SchemeName": "UK.OBIE.SortCodeAccountNumber",
                "Identification": "20000055555555",
                "Name": "Ada Lovelace"
            },
            "RemittanceInformation": {"Reference": format!("INV-{id}")}
        })
    }

    #[test]
    fn test_parse_bulk_document() {
        let body = json!({"Data": {"DomesticPayments": [entry("1", "10.00"), entry("2", "25.50"), entry("3", "3.49")]}});
        let parsed = parse(body.to_string().as_bytes()).unwrap();

        assert_eq!(parsed.payments.len(), 3);
        assert_eq!(parsed.control_sum.value(), dec!(38.99));
        assert_eq!(
            parsed.payments[0].creditor_reference.as_deref(),
            Some("INV-1")
        );
    }

    #[test]
    fn test_empty_payment_list() {
        let body = json!({"Data": {"DomesticPayments": []}});
        assert!(matches!(
            parse(body.to_string().as_bytes()),
            Err(ParseError::MissingNode(_))
        ));
    }

    #[test]
    fn test_missing_required_field() {
        let body = json!({"Data": {"DomesticPayments": [{"InstructionIdentification": "INSTR-1"}]}});
        assert!(matches!(
            parse(body.to_string().as_bytes()),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn test_non_positive_amount() {
        let body = json!({"Data": {"DomesticPayments": [entry("1", "0.00")]}});
        assert!(parse(body.to_string().as_bytes()).is_err());
    }
}
