use super::fingerprint::Fingerprint;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Represents a positive monetary amount for a payment instruction.
///
/// Serialized as a decimal string, the way Open Banking carries amounts on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EngineError::Validation(format!(
                "Amount must be positive, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Running total of line-item amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Default, Serialize, Deserialize)]
pub struct ControlSum(pub Decimal);

impl ControlSum {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Add<Amount> for ControlSum {
    type Output = Self;
    fn add(self, rhs: Amount) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign<Amount> for ControlSum {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstructedAmount {
    pub amount: Amount,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreditorAccount {
    pub scheme_name: String,
    pub identification: String,
    pub name: Option<String>,
}

/// A single domestic payment, immediate or scheduled.
///
/// One consent yields at most one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomesticPayment {
    pub instruction_identification: String,
    pub end_to_end_identification: String,
    pub instructed_amount: InstructedAmount,
    pub creditor_account: CreditorAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_execution_date_time: Option<DateTime<Utc>>,
}

impl Fingerprint for DomesticPayment {}

/// A variable recurring payment. A single consent authorizes many of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VrpPayment {
    pub instruction_identification: String,
    pub end_to_end_identification: String,
    pub instructed_amount: InstructedAmount,
    pub creditor_account: CreditorAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Fingerprint for VrpPayment {}
