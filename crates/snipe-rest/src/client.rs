//! reqwest-backed exchange client.
//!
//! One `Client` is shared by every call of a run so the connection pool
//! (and the TLS session established by the warmup order) is reused by the
//! racing attempts.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};

use crate::api::{BoxFuture, ExchangeApi, SignedQuery};
use crate::error::{RestError, RestResult};
use crate::responses::{OrderBookResponse, OrderResponse, ServerTimeResponse};

/// Default local timeout for a single request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Endpoint layout of the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestConfig {
    pub base_url: String,
    pub server_time_path: String,
    pub order_book_path: String,
    pub order_path: String,
    /// Header carrying the API key on signed requests.
    pub api_key_header: String,
    /// Local per-request timeout. The exchange's own `recvWindow` is separate.
    pub request_timeout: Duration,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mexc.com".to_string(),
            server_time_path: "/api/v3/time".to_string(),
            order_book_path: "/api/v3/depth".to_string(),
            order_path: "/api/v3/order".to_string(),
            api_key_header: "X-MEXC-APIKEY".to_string(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RestConfig {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// HTTP client for the three endpoints the engine uses.
pub struct RestClient {
    client: Client,
    config: RestConfig,
    api_key: String,
}

impl RestClient {
    /// Create a new client.
    ///
    /// # Errors
    /// `RestError::HttpClient` if the underlying HTTP client cannot be built.
    pub fn new(config: RestConfig, api_key: impl Into<String>) -> RestResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| RestError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> RestResult<T> {
        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RestError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| RestError::Parse(format!("{url}: {e}")))
    }

    async fn post_order(&self, query: SignedQuery) -> RestResult<OrderResponse> {
        let url = self.config.url(&self.config.order_path);
        trace!(query = %query.to_query_string(), "POST order");

        let response = self
            .client
            .post(&url)
            .header(self.config.api_key_header.as_str(), self.api_key.as_str())
            .query(query.pairs())
            .send()
            .await?;

        parse_order_response(response).await
    }
}

/// Parse an order response body regardless of HTTP status.
///
/// Exchange rejections arrive as 4xx with a `{code, msg}` body; those are
/// returned as `Ok` for classification. Bodies that do not parse become
/// `Status` (non-success) or `Parse` (success).
async fn parse_order_response(response: Response) -> RestResult<OrderResponse> {
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<OrderResponse>(&body) {
        Ok(parsed) => {
            debug!(status = status.as_u16(), "Order response received");
            Ok(parsed)
        }
        Err(_) if !status.is_success() => Err(RestError::Status {
            status: status.as_u16(),
            body,
        }),
        Err(e) => Err(RestError::Parse(format!("order response: {e}: {body}"))),
    }
}

impl ExchangeApi for RestClient {
    fn server_time(&self) -> BoxFuture<'_, RestResult<i64>> {
        Box::pin(async move {
            let url = self.config.url(&self.config.server_time_path);
            let resp: ServerTimeResponse = self.get_json(url, &[]).await?;
            Ok(resp.server_time)
        })
    }

    fn order_book<'a>(
        &'a self,
        symbol: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, RestResult<OrderBookResponse>> {
        Box::pin(async move {
            let url = self.config.url(&self.config.order_book_path);
            self.get_json(
                url,
                &[("symbol", symbol.to_string()), ("limit", limit.to_string())],
            )
            .await
        })
    }

    fn place_order(&self, query: SignedQuery) -> BoxFuture<'_, RestResult<OrderResponse>> {
        Box::pin(self.post_order(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_endpoints() {
        let config = RestConfig::default();
        assert_eq!(config.url(&config.server_time_path), "https://api.mexc.com/api/v3/time");
        assert_eq!(config.api_key_header, "X-MEXC-APIKEY");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let config = RestConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..RestConfig::default()
        };
        assert_eq!(config.url("/api/v3/order"), "http://localhost:8080/api/v3/order");
    }

    #[test]
    fn test_client_builds() {
        let client = RestClient::new(RestConfig::default(), "key").unwrap();
        assert_eq!(client.config().order_path, "/api/v3/order");
    }
}
