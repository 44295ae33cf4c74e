use serde::{Deserialize, Serialize};

/// One entry of the `/coins/markets` response; only the price is used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketCoin {
    pub id: Option<String>,
    pub symbol: Option<String>,
    pub current_price: Option<f64>,
}

/// Error body returned by CoinGecko on failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: Option<String>,
    pub status: Option<ErrorStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorStatus {
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

impl ErrorResponse {
    /// Best human-readable message in the body, if any
    pub fn message(&self) -> Option<String> {
        self.error.clone().or_else(|| {
            self.status
                .as_ref()
                .and_then(|s| s.error_message.clone())
        })
    }
}

/// Error type for price source operations
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// 401 Unauthorized
    Unauthorized(String),
    /// 403 Forbidden
    Forbidden(String),
    /// 404, or the symbol is unknown to the source
    NotFound(String),
    /// 429 Too Many Requests
    RateLimited { retry_after: Option<u64> },
    /// 5xx Server Error
    ServerError(i32, String),
    /// Other HTTP errors
    HttpError(i32, String),
    /// Network/request error
    RequestError(String),
    /// Deserialization error
    DeserializationError(String),
    /// The fetch took longer than the configured timeout
    Timeout(u64),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::RateLimited { retry_after } => match retry_after {
                Some(secs) => write!(f, "Rate Limited. Retry after {} s", secs),
                None => write!(f, "Rate Limited"),
            },
            ApiError::ServerError(code, msg) => write!(f, "Server Error ({}): {}", code, msg),
            ApiError::HttpError(code, msg) => write!(f, "HTTP Error ({}): {}", code, msg),
            ApiError::RequestError(msg) => write!(f, "Request Error: {}", msg),
            ApiError::DeserializationError(msg) => write!(f, "Deserialization Error: {}", msg),
            ApiError::Timeout(ms) => write!(f, "Timed out after {} ms", ms),
        }
    }
}

impl std::error::Error for ApiError {}
