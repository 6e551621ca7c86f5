use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::core::error::FetchError;
use crate::core::snapshot::RateSnapshot;
use crate::rate_client::RateClient;

/// Sentinel left in configs that were never filled in. Treated the same as
/// an absent key.
pub const API_KEY_PLACEHOLDER: &str = "EXCHANGE_RATE_API";

/// Client for the exchangerate-api.com v6 endpoint (and open-format
/// compatible mirrors). One GET per `fetch` call, no internal retries.
pub struct ExchangeRateApiClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct V6Response {
    result: String,
    base_code: String,
    conversion_rates: HashMap<String, f64>,
    time_last_update_utc: String,
}

#[derive(Debug, Deserialize)]
struct OpenResponse {
    base: String,
    rates: HashMap<String, f64>,
    timestamp: i64,
}

impl ExchangeRateApiClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
        }
    }

    /// The v6 API reports `time_last_update_utc` as RFC 1123
    /// ("Tue, 27 May 2025 00:00:01 +0000"); some mirrors emit RFC 3339.
    fn parse_observed_at(date_str: &str) -> Result<DateTime<Utc>, FetchError> {
        if let Ok(dt) = DateTime::parse_from_rfc2822(date_str) {
            return Ok(dt.with_timezone(&Utc));
        }
        DateTime::parse_from_rfc3339(date_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| FetchError::Decode(format!("bad update timestamp {date_str:?}: {e}")))
    }

    /// Normalizes either upstream shape into a [`RateSnapshot`]. The
    /// `result` field discriminates: present means the v6 schema, absent
    /// falls back to the open `{base, rates, timestamp}` schema.
    fn decode_snapshot(body: &str, now: DateTime<Utc>) -> Result<RateSnapshot, FetchError> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| FetchError::Decode(format!("response is not JSON: {e}")))?;

        if value.get("result").is_some() {
            let resp: V6Response = serde_json::from_value(value)
                .map_err(|e| FetchError::Decode(format!("bad v6 payload: {e}")))?;
            if resp.result != "success" {
                return Err(FetchError::Decode(format!(
                    "API reported result {:?}",
                    resp.result
                )));
            }
            Ok(RateSnapshot {
                base_currency: resp.base_code,
                rates: resp.conversion_rates,
                observed_at: Self::parse_observed_at(&resp.time_last_update_utc)?,
                fetched_at: now,
            })
        } else {
            let resp: OpenResponse = serde_json::from_value(value)
                .map_err(|e| FetchError::Decode(format!("bad open payload: {e}")))?;
            let observed_at = Utc
                .timestamp_opt(resp.timestamp, 0)
                .single()
                .ok_or_else(|| {
                    FetchError::Decode(format!("unix timestamp out of range: {}", resp.timestamp))
                })?;
            Ok(RateSnapshot {
                base_currency: resp.base,
                rates: resp.rates,
                observed_at,
                fetched_at: now,
            })
        }
    }
}

#[async_trait]
impl RateClient for ExchangeRateApiClient {
    #[instrument(name = "RateFetch", skip(self, now), fields(base = %base))]
    async fn fetch(&self, base: &str, now: DateTime<Utc>) -> Result<RateSnapshot, FetchError> {
        if self.api_key.is_empty() || self.api_key == API_KEY_PLACEHOLDER {
            return Err(FetchError::MissingCredential);
        }

        let url = format!("{}/{}/latest/{}", self.base_url, self.api_key, base);
        reqwest::Url::parse(&url)
            .map_err(|e| FetchError::InvalidEndpoint(format!("{}: {e}", self.base_url)))?;
        debug!("Requesting exchange rates from upstream");

        let client = reqwest::Client::builder()
            .user_agent("ryogae/0.1")
            .timeout(self.timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus(status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        match Self::decode_snapshot(&text, now) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                error!(error = %e, response = %text, "Failed to decode rates response");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = "test-key-123";

    const V6_JSON: &str = r#"{
        "result": "success",
        "base_code": "USD",
        "conversion_rates": {"BRL": 5.10, "JPY": 157.50, "EUR": 0.92},
        "time_last_update_utc": "Wed, 28 May 2025 00:00:01 +0000"
    }"#;

    const OPEN_JSON: &str = r#"{
        "base": "USD",
        "rates": {"BRL": 5.08, "JPY": 156.90},
        "timestamp": 1748390400
    }"#;

    async fn create_mock_server(base: &str, response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/{TEST_KEY}/latest/{base}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn client_for(server: &MockServer) -> ExchangeRateApiClient {
        ExchangeRateApiClient::new(&server.uri(), TEST_KEY, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_fetch_v6_schema() {
        let server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(V6_JSON)).await;
        let client = client_for(&server);
        let now = Utc::now();

        let snapshot = client.fetch("USD", now).await.unwrap();

        assert_eq!(snapshot.base_currency, "USD");
        assert_eq!(snapshot.rate("BRL"), Some(5.10));
        assert_eq!(snapshot.rate("JPY"), Some(157.50));
        assert_eq!(
            snapshot.observed_at,
            Utc.with_ymd_and_hms(2025, 5, 28, 0, 0, 1).unwrap()
        );
        assert_eq!(snapshot.fetched_at, now);
    }

    #[tokio::test]
    async fn test_fetch_open_schema() {
        let server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(OPEN_JSON)).await;
        let client = client_for(&server);

        let snapshot = client.fetch("USD", Utc::now()).await.unwrap();

        assert_eq!(snapshot.base_currency, "USD");
        assert_eq!(snapshot.rate("BRL"), Some(5.08));
        assert_eq!(snapshot.observed_at.timestamp(), 1748390400);
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_network_call() {
        let server = MockServer::start().await;
        // Any request reaching the server fails the expectation below.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(V6_JSON))
            .expect(0)
            .mount(&server)
            .await;

        for key in ["", API_KEY_PLACEHOLDER] {
            let client = ExchangeRateApiClient::new(&server.uri(), key, Duration::from_secs(5));
            let result = client.fetch("USD", Utc::now()).await;
            assert_eq!(result.unwrap_err(), FetchError::MissingCredential);
        }
    }

    #[tokio::test]
    async fn test_bad_status() {
        let server = create_mock_server("USD", ResponseTemplate::new(503)).await;
        let client = client_for(&server);

        let result = client.fetch("USD", Utc::now()).await;
        assert_eq!(result.unwrap_err(), FetchError::BadStatus(503));
    }

    #[tokio::test]
    async fn test_transport_error_on_unreachable_host() {
        // Port 1 on localhost refuses connections.
        let client =
            ExchangeRateApiClient::new("http://127.0.0.1:1", TEST_KEY, Duration::from_secs(1));
        let result = client.fetch("USD", Utc::now()).await;
        assert!(matches!(result.unwrap_err(), FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let client = ExchangeRateApiClient::new("not a url", TEST_KEY, Duration::from_secs(1));
        let result = client.fetch("USD", Utc::now()).await;
        assert!(matches!(result.unwrap_err(), FetchError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn test_api_reported_error_is_decode() {
        let body = r#"{"result": "error", "error-type": "invalid-key"}"#;
        let server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(body)).await;
        let client = client_for(&server);

        let result = client.fetch("USD", Utc::now()).await;
        assert!(matches!(result.unwrap_err(), FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode() {
        let server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_body_string("<html>oops</html>"),
        )
        .await;
        let client = client_for(&server);

        let result = client.fetch("USD", Utc::now()).await;
        assert!(matches!(result.unwrap_err(), FetchError::Decode(_)));
    }

    #[test]
    fn test_parse_observed_at_rfc3339_fallback() {
        let dt = ExchangeRateApiClient::parse_observed_at("2025-05-28T00:00:01+00:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 5, 28, 0, 0, 1).unwrap());
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let body = r#"{"base": "USD", "rates": {}}"#; // no timestamp
        let result = ExchangeRateApiClient::decode_snapshot(body, Utc::now());
        assert!(matches!(result.unwrap_err(), FetchError::Decode(_)));
    }
}
