//! The two remote order operations and the classification of their outcomes.

use serde_json::Value;

use ordersync_core::ExternalOrderId;
use ordersync_orders::CanonicalPayload;

use super::transport::{ApiResponse, OrderTransport, TransportError};

pub const ORDERS_RESOURCE: &str = "orders";

pub const STATUS_CREATED: u16 = 201;
pub const STATUS_ACCEPTED: u16 = 202;
pub const STATUS_NOT_FOUND: u16 = 404;

/// Classified answer to a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub status_code: u16,
    pub external_id: Option<ExternalOrderId>,
    pub error: Option<String>,
}

impl SubmissionResult {
    pub fn from_response(response: &ApiResponse) -> Self {
        if response.status == STATUS_CREATED {
            Self {
                status_code: response.status,
                external_id: response.json().as_ref().and_then(external_id_of),
                error: None,
            }
        } else {
            Self {
                status_code: response.status,
                external_id: None,
                error: response.error_detail(),
            }
        }
    }

    pub fn is_created(&self) -> bool {
        self.status_code == STATUS_CREATED
    }
}

/// Outcome of a cancel call that reached the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// `202`: the cancellation was accepted.
    Cancelled,
    /// Any other non-404 code: the remote refused; not an error.
    NotAccepted(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("order submission failed with status {code}{}", detail_suffix(.detail))]
    SubmissionFailed { code: u16, detail: Option<String> },
    #[error("remote order not found: {0}")]
    OrderNotFound(ExternalOrderId),
    #[error("remote order id `{0}` cannot be used as a path segment")]
    InvalidOrderId(ExternalOrderId),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Client for the fulfillment API's order resource.
///
/// Exactly one request per call; retries are the caller's business.
#[derive(Debug, Clone)]
pub struct RemoteOrderClient<T> {
    transport: T,
}

impl<T: OrderTransport> RemoteOrderClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Create the order remotely. Only `201 Created` counts as success.
    pub async fn submit_order(&self, payload: &CanonicalPayload) -> Result<SubmissionResult, RemoteError> {
        let body = payload
            .to_json()
            .map_err(|e| TransportError::Encode(e.to_string()))?;

        let response = self.transport.post(ORDERS_RESOURCE, Some(&body)).await?;
        let result = SubmissionResult::from_response(&response);

        if !result.is_created() {
            return Err(RemoteError::SubmissionFailed {
                code: result.status_code,
                detail: result.error,
            });
        }

        if result.external_id.is_none() {
            tracing::warn!(
                reference = %payload.external_order_reference,
                "order created remotely but response carried no id"
            );
        }
        Ok(result)
    }

    /// Ask the remote service to cancel an order.
    ///
    /// `404` becomes [`RemoteError::OrderNotFound`]; every other code is an
    /// answer, not an error.
    pub async fn cancel_order(&self, external_id: &ExternalOrderId) -> Result<CancelOutcome, RemoteError> {
        let resource = format!("{}/{}/cancel", ORDERS_RESOURCE, path_segment(external_id)?);
        let response = self.transport.post(&resource, None).await?;

        tracing::debug!(%external_id, status = response.status, "cancelling order");

        match response.status {
            STATUS_ACCEPTED => Ok(CancelOutcome::Cancelled),
            STATUS_NOT_FOUND => Err(RemoteError::OrderNotFound(external_id.clone())),
            other => Ok(CancelOutcome::NotAccepted(other)),
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Percent-encode `id` as exactly one path segment.
///
/// Dot segments are refused outright: URL parsers resolve `.`/`..` (encoded or
/// not) against the preceding path.
fn path_segment(id: &ExternalOrderId) -> Result<String, RemoteError> {
    if matches!(id.as_str(), "." | "..") {
        return Err(RemoteError::InvalidOrderId(id.clone()));
    }
    Ok(urlencoding::encode(id.as_str()).into_owned())
}

fn external_id_of(body: &Value) -> Option<ExternalOrderId> {
    ["id", "orderId"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|v| ExternalOrderId::try_from(v).ok())
}
