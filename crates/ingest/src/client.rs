//! Market data provider boundary.
//!
//! [`MarketDataClient`] fetches one symbol's raw daily series. The only
//! production implementation talks to Alpha Vantage's `TIME_SERIES_DAILY`
//! endpoint; tests substitute in-process fakes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use pricevault_core::config::ProviderConfig;

use crate::error::FetchError;
use crate::normalize::SERIES_KEY;

/// Provider response body, kept as an ordered JSON object so the provider's
/// native key order survives until normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload(Map<String, Value>);

impl RawPayload {
    /// Wrap a JSON value. Returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RawPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Trait for market data providers.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Fetch the raw daily series for `symbol`.
    ///
    /// An empty series (market holiday, no data) is a successful fetch.
    async fn fetch(&self, symbol: &str) -> Result<RawPayload, FetchError>;
}

/// Alpha Vantage `TIME_SERIES_DAILY` client.
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
    output_size: String,
}

impl AlphaVantageClient {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key: config.api_key.clone().unwrap_or_default(),
            base_url: config.base_url.clone(),
            output_size: config.output_size.clone(),
        }
    }
}

#[async_trait]
impl MarketDataClient for AlphaVantageClient {
    async fn fetch(&self, symbol: &str) -> Result<RawPayload, FetchError> {
        debug!(
            symbol,
            url = %format!(
                "{}/query?function=TIME_SERIES_DAILY&symbol={symbol}&outputsize={}&apikey=***",
                self.base_url, self.output_size
            ),
            "requesting daily series"
        );

        // `without_url` keeps the api key out of error messages.
        let response = self
            .client
            .get(format!("{}/query", self.base_url))
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", self.output_size.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        interpret_response(status, &body)
    }
}

/// Classify a provider response into a payload or a fetch error.
///
/// Alpha Vantage answers throttled and invalid calls with HTTP 200 and a
/// single explanatory field, so the body is inspected as well as the status.
pub fn interpret_response(status: u16, body: &str) -> Result<RawPayload, FetchError> {
    if status == 429 {
        return Err(FetchError::RateLimited(format!("HTTP 429: {}", snippet(body))));
    }
    if !(200..300).contains(&status) {
        return Err(FetchError::Provider(format!("HTTP {status}: {}", snippet(body))));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Provider(format!("malformed JSON response: {e}")))?;
    let payload = RawPayload::from_value(value)
        .ok_or_else(|| FetchError::Provider("expected a JSON object response".into()))?;

    if payload.get(SERIES_KEY).is_some() {
        return Ok(payload);
    }
    if let Some(message) = payload.get("Error Message") {
        return Err(FetchError::Provider(text_of(message)));
    }
    if let Some(message) = payload.get("Note") {
        return Err(FetchError::RateLimited(text_of(message)));
    }
    // "Information" also carries premium-only notices, which retrying won't fix.
    if let Some(message) = payload.get("Information") {
        let text = text_of(message);
        return Err(if mentions_rate_limit(&text) {
            FetchError::RateLimited(text)
        } else {
            FetchError::Provider(text)
        });
    }

    Ok(payload)
}

fn mentions_rate_limit(text: &str) -> bool {
    let text = text.to_lowercase();
    ["rate limit", "call frequency", "requests per", "calls per"]
        .iter()
        .any(|needle| text.contains(needle))
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAILY: &str = r#"{
        "Meta Data": {"2. Symbol": "IBM"},
        "Time Series (Daily)": {
            "2024-03-15": {"1. open": "191.99", "2. high": "193.06", "3. low": "190.70", "4. close": "191.07", "5. volume": "8828184"}
        }
    }"#;

    #[test]
    fn accepts_series_response() {
        let payload = interpret_response(200, DAILY).unwrap();
        assert!(payload.get(SERIES_KEY).is_some());
    }

    #[test]
    fn empty_object_is_a_successful_fetch() {
        let payload = interpret_response(200, "{}").unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn http_429_is_rate_limit() {
        let err = interpret_response(429, "slow down").unwrap_err();
        assert!(matches!(err, FetchError::RateLimited(_)));
    }

    #[test]
    fn throttle_notice_is_rate_limit() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        assert!(matches!(
            interpret_response(200, body),
            Err(FetchError::RateLimited(msg)) if msg.contains("5 calls per minute")
        ));

        let body = r#"{"Information": "Our standard API rate limit is 25 requests per day."}"#;
        assert!(matches!(interpret_response(200, body), Err(FetchError::RateLimited(_))));
    }

    #[test]
    fn premium_information_notice_is_not_retryable() {
        let body = r#"{"Information": "Thank you for using Alpha Vantage! The outputsize=full parameter value is a premium feature for the TIME_SERIES_DAILY endpoint."}"#;
        assert!(matches!(
            interpret_response(200, body),
            Err(FetchError::Provider(msg)) if msg.contains("premium")
        ));
    }

    #[test]
    fn error_message_is_provider_error() {
        let body = r#"{"Error Message": "Invalid API call. Please retry or visit the documentation."}"#;
        assert!(matches!(
            interpret_response(200, body),
            Err(FetchError::Provider(msg)) if msg.starts_with("Invalid API call")
        ));
    }

    #[test]
    fn non_success_status_is_provider_error() {
        let err = interpret_response(503, "<html>maintenance</html>").unwrap_err();
        match err {
            FetchError::Provider(msg) => assert!(msg.contains("503")),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_envelope_is_provider_error() {
        assert!(matches!(interpret_response(200, "not json"), Err(FetchError::Provider(_))));
        assert!(matches!(interpret_response(200, "[1, 2]"), Err(FetchError::Provider(_))));
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        assert_eq!(snippet(&long).chars().count(), 200);
        assert_eq!(snippet("short"), "short");
    }
}
