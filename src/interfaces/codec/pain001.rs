//! `UK.OBIE.pain.001.001.08`: ISO 20022 customer credit transfer initiation.
//!
//! Only the nodes the engine needs are mapped; everything else in the document
//! is ignored.

use super::{ParseError, PaymentFileProcessor, parse_amount};
use crate::domain::file::{FilePaymentItem, ParsedPayments, PaymentFileType};
use crate::domain::payment::{CreditorAccount, InstructedAmount};
use crate::domain::submission::PaymentStatus;
use serde::Deserialize;

pub const FILE_TYPE: &str = "UK.OBIE.pain.001.001.08";
pub const CONTENT_TYPE: &str = "text/xml";

const IBAN: &str = "UK.OBIE.IBAN";
const SORT_CODE_ACCOUNT_NUMBER: &str = "UK.OBIE.SortCodeAccountNumber";

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(rename = "CstmrCdtTrfInitn")]
    initiation: CustomerCreditTransferInitiation,
}

#[derive(Debug, Deserialize)]
struct CustomerCreditTransferInitiation {
    #[serde(rename = "GrpHdr")]
    group_header: GroupHeader,
    #[serde(rename = "PmtInf", default)]
    payment_information: Vec<PaymentInformation>,
}

#[derive(Debug, Deserialize)]
struct GroupHeader {
    #[serde(rename = "NbOfTxs")]
    number_of_transactions: String,
    #[serde(rename = "CtrlSum", default)]
    control_sum: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentInformation {
    #[serde(rename = "CdtTrfTxInf", default)]
    transactions: Vec<CreditTransferTransaction>,
}

#[derive(Debug, Deserialize)]
struct CreditTransferTransaction {
    #[serde(rename = "PmtId")]
    payment_id: PaymentIdentification,
    #[serde(rename = "Amt")]
    amount: AmountNode,
    #[serde(rename = "Cdtr", default)]
    creditor: Option<Party>,
    #[serde(rename = "CdtrAcct", default)]
    creditor_account: Option<Account>,
    #[serde(rename = "RmtInf", default)]
    remittance: Option<Remittance>,
}

#[derive(Debug, Deserialize)]
struct PaymentIdentification {
    #[serde(rename = "InstrId")]
    instruction_id: String,
    #[serde(rename = "EndToEndId")]
    end_to_end_id: String,
}

#[derive(Debug, Deserialize)]
struct AmountNode {
    #[serde(rename = "InstdAmt")]
    instructed: InstructedAmountNode,
}

#[derive(Debug, Deserialize)]
struct InstructedAmountNode {
    #[serde(rename = "@Ccy")]
    currency: String,
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Party {
    #[serde(rename = "Nm", default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(rename = "Id")]
    id: AccountId,
}

#[derive(Debug, Deserialize)]
struct AccountId {
    #[serde(rename = "IBAN", default)]
    iban: Option<String>,
    #[serde(rename = "Othr", default)]
    other: Option<OtherId>,
}

#[derive(Debug, Deserialize)]
struct OtherId {
    #[serde(rename = "Id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct Remittance {
    #[serde(rename = "Ustrd", default)]
    unstructured: Option<String>,
}

pub fn processor() -> PaymentFileProcessor {
    PaymentFileProcessor::new(PaymentFileType::new(FILE_TYPE, CONTENT_TYPE), parse)
}

pub fn parse(content: &[u8]) -> Result<ParsedPayments, ParseError> {
    let xml = std::str::from_utf8(content)
        .map_err(|e| ParseError::Syntax(format!("document is not UTF-8: {e}")))?;
    let document: Document = quick_xml::de::from_str(xml)?;
    let initiation = document.initiation;

    let mut parsed = ParsedPayments::default();
    for transaction in initiation
        .payment_information
        .into_iter()
        .flat_map(|info| info.transactions)
    {
        parsed.push(line_item(transaction)?);
    }

    if parsed.payments.is_empty() {
        return Err(ParseError::MissingNode("CdtTrfTxInf".into()));
    }

    let header = initiation.group_header;
    let declared_count: usize = header.number_of_transactions.trim().parse().map_err(|_| {
        ParseError::Syntax(format!(
            "NbOfTxs '{}' is not a number",
            header.number_of_transactions
        ))
    })?;
    if declared_count != parsed.payments.len() {
        return Err(ParseError::Syntax(format!(
            "NbOfTxs declares {} transactions, document contains {}",
            declared_count,
            parsed.payments.len()
        )));
    }
    if let Some(declared_sum) = header.control_sum {
        let declared_sum = parse_amount(&declared_sum)?;
        if declared_sum.value() != parsed.control_sum.value() {
            return Err(ParseError::Syntax(format!(
                "CtrlSum declares {}, transactions add up to {}",
                declared_sum.value(),
                parsed.control_sum.value()
            )));
        }
    }

    Ok(parsed)
}

fn line_item(transaction: CreditTransferTransaction) -> Result<FilePaymentItem, ParseError> {
    let amount = parse_amount(&transaction.amount.instructed.value)?;
    let name = transaction.creditor.and_then(|party| party.name);

    let creditor_account = match transaction.creditor_account {
        Some(Account {
            id: AccountId {
                iban: Some(iban), ..
            },
        }) => Some(CreditorAccount {
            scheme_name: IBAN.to_string(),
            identification: iban,
            name,
        }),
        Some(Account {
            id: AccountId {
                other: Some(other), ..
            },
        }) => Some(CreditorAccount {
            scheme_name: SORT_CODE_ACCOUNT_NUMBER.to_string(),
            identification: other.id,
            name,
        }),
        Some(_) => return Err(ParseError::MissingNode("CdtrAcct/Id".into())),
        None => None,
    };

    Ok(FilePaymentItem {
        instruction_identification: transaction.payment_id.instruction_id,
        end_to_end_identification: transaction.payment_id.end_to_end_id,
        instructed_amount: InstructedAmount {
            amount,
            currency: transaction.amount.instructed.currency,
        },
        creditor_account,
        creditor_reference: transaction.remittance.and_then(|r| r.unstructured),
        status: PaymentStatus::Pending,
    })
}
