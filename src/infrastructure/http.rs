use crate::domain::payment::PaymentPayload;
use crate::domain::ports::{Delivery, RejectReason, SubmissionGateway};
use crate::error::{QueueError, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;

/// Path of the transaction creation endpoint, relative to the API base URL.
pub const CREATE_TRANSACTION_PATH: &str = "/api/transactions/create";

/// Request body, with the amount sent as a JSON number.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitPaymentRequest<'a> {
    student_id: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    r#type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    school_id: Option<&'a str>,
}

impl<'a> From<&'a PaymentPayload> for SubmitPaymentRequest<'a> {
    fn from(payload: &'a PaymentPayload) -> Self {
        Self {
            student_id: &payload.student_id,
            amount: payload.amount,
            r#type: &payload.r#type,
            description: payload.description.as_deref(),
            school_id: payload.school_id.as_deref(),
        }
    }
}

/// Submits payments to the school-fees transaction API over HTTP.
pub struct HttpGateway {
    client: Client,
    endpoint: String,
}

impl HttpGateway {
    /// Creates a gateway posting to `<base_url>/api/transactions/create`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .build()
            .map_err(|e| QueueError::InternalError(Box::new(e)))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}{}",
                base_url.trim_end_matches('/'),
                CREATE_TRANSACTION_PATH
            ),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SubmissionGateway for HttpGateway {
    async fn submit(&self, payload: &PaymentPayload) -> Result<Delivery> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SubmitPaymentRequest::from(payload))
            .send()
            .await;

        let delivery = match response {
            Ok(response) if response.status().is_success() => Delivery::Accepted,
            Ok(response) => Delivery::Rejected(RejectReason::Status(response.status().as_u16())),
            Err(e) if e.is_timeout() => Delivery::Rejected(RejectReason::Timeout),
            Err(e) => Delivery::Rejected(RejectReason::Network(e.to_string())),
        };
        Ok(delivery)
    }
}
