use crate::error::QueueError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A positive monetary amount entered by a parent.
///
/// The queue itself forwards payloads verbatim; this type is for callers that
/// validate input before handing it to [`crate::application::queue::OfflineQueue::save`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, QueueError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(QueueError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = QueueError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// A self-reported fee payment, as submitted to the transaction API.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub student_id: String,
    pub amount: Decimal,
    /// Free-form payment kind (tuition, canteen, ...).
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
}

impl PaymentPayload {
    pub fn new(student_id: impl Into<String>, amount: Amount, r#type: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            amount: amount.into(),
            r#type: r#type.into(),
            description: None,
            school_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_school(mut self, school_id: impl Into<String>) -> Self {
        self.school_id = Some(school_id.into());
        self
    }
}
