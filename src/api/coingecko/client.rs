use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use tracing::{debug, info, warn};

use super::models::{ApiError, ErrorResponse, MarketCoin};
use crate::api::PriceSource;

/// CoinGecko API client used as the poller's price source
pub struct CoinGeckoClient {
    http_client: HttpClient,
    api_key: Option<String>,
    vs_currency: String,
    base_url: String,
}

impl CoinGeckoClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.coingecko.com/api/v3";

    /// Create a new client; `base_url` is usually `DEFAULT_BASE_URL`
    pub fn with_base_url(api_key: Option<String>, vs_currency: String, base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            vs_currency: vs_currency.to_lowercase(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn create_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(key) = &self.api_key {
            let key_value = HeaderValue::from_str(key)
                .map_err(|e| ApiError::RequestError(format!("Failed to create api key header: {}", e)))?;
            headers.insert("x-cg-demo-api-key", key_value);
        }

        Ok(headers)
    }

    async fn handle_error_response(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        let body_text = response.text().await.unwrap_or_default();

        let err = error_from_status(status, body_text, retry_after);
        warn!("CoinGecko request failed: {}", err);
        err
    }

    /// GET /ping
    ///
    /// Verifies the API is reachable and the key (if any) is accepted.
    pub async fn ping(&self) -> Result<(), ApiError> {
        info!("Checking CoinGecko API availability");
        let url = format!("{}/ping", self.base_url);

        let response = self.http_client
            .get(&url)
            .headers(self.create_headers()?)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        info!("CoinGecko API is reachable");
        Ok(())
    }

    /// GET /coins/markets?vs_currency={vs}&symbols={symbol}
    ///
    /// Returns the current price of the first market matching the symbol.
    pub async fn get_price(&self, symbol: &str) -> Result<f64, ApiError> {
        let url = format!("{}/coins/markets", self.base_url);
        let symbol_param = symbol.to_lowercase();

        let response = self.http_client
            .get(&url)
            .headers(self.create_headers()?)
            .query(&[("vs_currency", self.vs_currency.as_str()), ("symbols", symbol_param.as_str())])
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::RequestError(format!("Failed to read body: {}", e)))?;

        let price = parse_markets_response(symbol, &body)?;
        debug!("CoinGecko quoted {} at {} {}", symbol, price, self.vs_currency);
        Ok(price)
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch_price(&self, symbol: &str) -> Result<f64, ApiError> {
        self.get_price(symbol).await
    }
}

/// Map a non-success status and its body to an error
fn error_from_status(status: u16, body_text: String, retry_after: Option<u64>) -> ApiError {
    let message = serde_json::from_str::<ErrorResponse>(&body_text)
        .ok()
        .and_then(|e| e.message())
        .unwrap_or(body_text);

    match status {
        401 => ApiError::Unauthorized(message),
        403 => ApiError::Forbidden(message),
        404 => ApiError::NotFound(message),
        429 => ApiError::RateLimited { retry_after },
        500..=599 => ApiError::ServerError(status as i32, message),
        _ => ApiError::HttpError(status as i32, message),
    }
}

/// Pull the first quoted price out of a `/coins/markets` body
fn parse_markets_response(symbol: &str, body: &str) -> Result<f64, ApiError> {
    let coins: Vec<MarketCoin> = serde_json::from_str(body)
        .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))?;

    coins
        .first()
        .and_then(|c| c.current_price)
        .ok_or_else(|| ApiError::NotFound(format!("no market data for {}", symbol)))
}
