//! HTTP transport seam for the fulfillment API.
//!
//! The client only needs "POST this JSON to that resource and tell me the status
//! code"; everything about connections, TLS, auth headers and timeouts lives
//! behind [`OrderTransport`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Header carrying the API access token.
pub const ACCESS_TOKEN_HEADER: &str = "X-SPOD-ACCESS-TOKEN";

const MAX_DETAIL_LEN: usize = 500;

/// Raw response of the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Human-readable error detail: the `message`/`error` field of a JSON body,
    /// otherwise the (truncated) raw body.
    pub fn error_detail(&self) -> Option<String> {
        if let Some(json) = self.json() {
            for key in ["message", "error", "detail"] {
                if let Some(msg) = json.get(key).and_then(Value::as_str) {
                    return Some(msg.to_string());
                }
            }
        }

        let trimmed = self.body.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.chars().take(MAX_DETAIL_LEN).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("failed to encode request: {0}")]
    Encode(String),
}

/// Sends requests to the fulfillment API.
///
/// Implementations enforce their own bounded timeout; callers never cancel an
/// in-flight request.
#[async_trait]
pub trait OrderTransport: Send + Sync {
    /// POST `body` (or an empty body) to `resource`, relative to the API root.
    async fn post(&self, resource: &str, body: Option<&Value>) -> Result<ApiResponse, TransportError>;
}

#[async_trait]
impl<T: OrderTransport + ?Sized> OrderTransport for Arc<T> {
    async fn post(&self, resource: &str, body: Option<&Value>) -> Result<ApiResponse, TransportError> {
        (**self).post(resource, body).await
    }
}

/// `reqwest`-based transport.
#[derive(Debug, Clone)]
pub struct HttpOrderTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpOrderTransport {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource.trim_start_matches('/'))
    }
}

#[async_trait]
impl OrderTransport for HttpOrderTransport {
    async fn post(&self, resource: &str, body: Option<&Value>) -> Result<ApiResponse, TransportError> {
        let url = self.url(resource);
        let mut req = self
            .client
            .post(&url)
            .header(ACCESS_TOKEN_HEADER, &self.token)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(body) = body {
            req = req.json(body);
        }

        tracing::debug!(%url, "posting to fulfillment API");
        let resp = req.send().await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(map_reqwest_error)?;

        Ok(ApiResponse { status, body })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_prefers_json_message() {
        let resp = ApiResponse::new(422, r#"{"message":"invalid zip code","code":17}"#);
        assert_eq!(resp.error_detail().as_deref(), Some("invalid zip code"));
    }

    #[test]
    fn error_detail_falls_back_to_raw_body() {
        assert_eq!(
            ApiResponse::new(502, "  Bad Gateway \n").error_detail().as_deref(),
            Some("Bad Gateway")
        );
        assert_eq!(ApiResponse::new(500, "").error_detail(), None);

        let long = "x".repeat(2 * MAX_DETAIL_LEN);
        assert_eq!(
            ApiResponse::new(500, long).error_detail().map(|d| d.len()),
            Some(MAX_DETAIL_LEN)
        );
    }

    #[test]
    fn urls_are_joined_with_a_single_slash() {
        let transport =
            HttpOrderTransport::new("https://api.example.com/v1/", "t", Duration::from_secs(5))
                .unwrap();
        assert_eq!(transport.url("orders"), "https://api.example.com/v1/orders");
        assert_eq!(
            transport.url("/orders/7/cancel"),
            "https://api.example.com/v1/orders/7/cancel"
        );
    }
}
