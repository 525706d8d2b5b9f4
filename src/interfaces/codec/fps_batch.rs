//! `UK.LBG.O.FPS.Batch.v10`: a line-oriented positional batch.
//!
//! ```text
//! H,<batch reference>[,<debtor account>,<execution date>]
//! D,<instruction id>,<end-to-end id>,<amount>,<currency>[,<creditor name>,<creditor account>,<reference>]
//! ```
//!
//! The header must come first; every following record is a detail line.

use super::{ParseError, PaymentFileProcessor, parse_amount};
use crate::domain::file::{FilePaymentItem, ParsedPayments, PaymentFileType};
use crate::domain::payment::{CreditorAccount, InstructedAmount};
use crate::domain::submission::PaymentStatus;
use csv::StringRecord;

pub const FILE_TYPE: &str = "UK.LBG.O.FPS.Batch.v10";
pub const CONTENT_TYPE: &str = "text/plain";

const SORT_CODE_ACCOUNT_NUMBER: &str = "UK.OBIE.SortCodeAccountNumber";

pub fn processor() -> PaymentFileProcessor {
    PaymentFileProcessor::new(PaymentFileType::new(FILE_TYPE, CONTENT_TYPE), parse)
}

pub fn parse(content: &[u8]) -> Result<ParsedPayments, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content);

    let mut records = reader.records();
    match records.next().transpose()? {
        Some(header) if field(&header, 0) == Some("H") => {}
        Some(other) => {
            return Err(ParseError::Syntax(format!(
                "line {}: expected header record, found '{}'",
                line(&other),
                field(&other, 0).unwrap_or_default()
            )));
        }
        None => return Err(ParseError::MissingNode("header record".into())),
    }

    let mut parsed = ParsedPayments::default();
    for record in records {
        let record = record?;
        match field(&record, 0) {
            Some("D") => parsed.push(detail(&record)?),
            Some(other) => {
                return Err(ParseError::Syntax(format!(
                    "line {}: unexpected record type '{}'",
                    line(&record),
                    other
                )));
            }
            None if record.iter().all(str::is_empty) => continue,
            None => {
                return Err(ParseError::Syntax(format!(
                    "line {}: missing record type",
                    line(&record)
                )));
            }
        }
    }

    if parsed.payments.is_empty() {
        return Err(ParseError::MissingNode("detail records".into()));
    }
    Ok(parsed)
}

fn detail(record: &StringRecord) -> Result<FilePaymentItem, ParseError> {
    let required = |index: usize, name: &str| {
        field(record, index).ok_or_else(|| {
            ParseError::Syntax(format!("line {}: missing {}", line(record), name))
        })
    };

    let instruction_identification = required(1, "instruction id")?.to_string();
    let end_to_end_identification = required(2, "end-to-end id")?.to_string();
    let amount = parse_amount(required(3, "amount")?)?;
    let currency = required(4, "currency")?.to_string();

    let creditor_account = field(record, 6).map(|identification| CreditorAccount {
        scheme_name: SORT_CODE_ACCOUNT_NUMBER.to_string(),
        identification: identification.to_string(),
        name: field(record, 5).map(str::to_string),
    });

    Ok(FilePaymentItem {
        instruction_identification,
        end_to_end_identification,
        instructed_amount: InstructedAmount { amount, currency },
        creditor_account,
        creditor_reference: field(record, 7).map(str::to_string),
        status: PaymentStatus::Pending,
    })
}

/// A trimmed, non-empty field.
fn field(record: &StringRecord, index: usize) -> Option<&str> {
    record.get(index).filter(|value| !value.is_empty())
}

fn line(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}
