use crate::core::{ConfigProvider, VerificationClient};
use crate::domain::model::{FetchOutcome, VehicleId};
use crate::utils::error::{Result, SyncError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;

const SUCCESS_CODE: &str = "200";

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    code: serde_json::Value,
    #[serde(default)]
    response: Option<Vec<serde_json::Value>>,
}

/// Client for the VAHAN verification endpoint. One POST per vehicle, no retries.
#[derive(Debug, Clone)]
pub struct VahanClient {
    client: Client,
    endpoint: String,
    request_field: String,
}

impl VahanClient {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in config.request_headers() {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                SyncError::InvalidConfigValueError {
                    field: "source.headers".to_string(),
                    value: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            let header_value =
                HeaderValue::from_str(&value).map_err(|e| SyncError::InvalidConfigValueError {
                    field: format!("source.headers.{}", name),
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint().to_string(),
            request_field: config.request_field().to_string(),
        })
    }
}

/// Classifies a 2xx response body.
pub fn classify_body(body: &str) -> FetchOutcome {
    let parsed: ServiceResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return FetchOutcome::TransportFailure {
                reason: format!("malformed response body: {}", e),
            }
        }
    };

    let code = match &parsed.code {
        serde_json::Value::String(code) => code.clone(),
        other => other.to_string(),
    };
    if code != SUCCESS_CODE {
        return FetchOutcome::NoData {
            reason: format!("service returned code {}", code),
        };
    }

    let entries = parsed.response.unwrap_or_default();
    let Some(first) = entries.first() else {
        return FetchOutcome::NoData {
            reason: "empty response array".to_string(),
        };
    };

    match first.get("response").and_then(|inner| inner.as_str()) {
        Some(payload) if !payload.trim().is_empty() => FetchOutcome::Payload(payload.to_string()),
        _ => FetchOutcome::NoData {
            reason: "response entry carries no payload".to_string(),
        },
    }
}

impl VerificationClient for VahanClient {
    async fn fetch_document_payload(&self, vehicle: &VehicleId) -> FetchOutcome {
        let mut body = serde_json::Map::new();
        body.insert(
            self.request_field.clone(),
            serde_json::Value::String(vehicle.to_string()),
        );

        tracing::debug!("Making API request to: {} for {}", self.endpoint, vehicle);
        let response = match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                return FetchOutcome::TransportFailure {
                    reason: e.to_string(),
                }
            }
        };

        let status = response.status();
        tracing::debug!("API response status: {}", status);
        if !status.is_success() {
            return FetchOutcome::TransportFailure {
                reason: format!("HTTP {}", status),
            };
        }

        match response.text().await {
            Ok(text) => {
                tracing::debug!("API response body: {}", text);
                classify_body(&text)
            }
            Err(e) => FetchOutcome::TransportFailure {
                reason: format!("failed to read response body: {}", e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    struct MockConfig {
        api_endpoint: String,
        headers: Vec<(String, String)>,
    }

    impl MockConfig {
        fn new(api_endpoint: String) -> Self {
            Self {
                api_endpoint,
                headers: vec![],
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn api_endpoint(&self) -> &str {
            &self.api_endpoint
        }

        fn request_field(&self) -> &str {
            "vehiclenumber"
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn request_headers(&self) -> Vec<(String, String)> {
            self.headers.clone()
        }

        fn inventory_path(&self) -> &str {
            "vehicles.json"
        }

        fn inventory_field(&self) -> &str {
            "vehicleNumber"
        }

        fn output_path(&self) -> &str {
            "test_output"
        }

        fn output_file(&self) -> &str {
            "vehicle_documents.json"
        }

        fn max_vehicles(&self) -> Option<usize> {
            None
        }
    }

    const XML: &str = "<VehicleDetails><rc_tax_upto>LTT</rc_tax_upto></VehicleDetails>";

    #[tokio::test]
    async fn test_success_returns_inner_payload() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/verify/vahan")
                .json_body(serde_json::json!({"vehiclenumber": "KA01AB1234"}));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "code": "200",
                    "response": [{"response": XML}]
                }));
        });

        let client = VahanClient::new(&MockConfig::new(server.url("/verify/vahan"))).unwrap();
        let outcome = client
            .fetch_document_payload(&VehicleId::from("KA01AB1234"))
            .await;

        api_mock.assert();
        assert_eq!(outcome, FetchOutcome::Payload(XML.to_string()));
    }

    #[tokio::test]
    async fn test_http_error_is_transport_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/verify/vahan");
            then.status(502).body("bad gateway");
        });

        let client = VahanClient::new(&MockConfig::new(server.url("/verify/vahan"))).unwrap();
        let outcome = client.fetch_document_payload(&VehicleId::from("X")).await;

        assert!(matches!(outcome, FetchOutcome::TransportFailure { .. }));
    }

    #[tokio::test]
    async fn test_application_error_code_is_no_data() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/verify/vahan");
            then.status(200)
                .json_body(serde_json::json!({"code": "404", "response": []}));
        });

        let client = VahanClient::new(&MockConfig::new(server.url("/verify/vahan"))).unwrap();
        let outcome = client.fetch_document_payload(&VehicleId::from("X")).await;

        assert!(matches!(outcome, FetchOutcome::NoData { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_failure() {
        let client =
            VahanClient::new(&MockConfig::new("http://127.0.0.1:1/verify".to_string())).unwrap();
        let outcome = client.fetch_document_payload(&VehicleId::from("X")).await;
        assert!(matches!(outcome, FetchOutcome::TransportFailure { .. }));
    }

    #[tokio::test]
    async fn test_configured_headers_are_sent() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/verify/vahan")
                .header("x-client", "fleet-sync");
            then.status(200)
                .json_body(serde_json::json!({"code": "200", "response": [{"response": XML}]}));
        });

        let mut config = MockConfig::new(server.url("/verify/vahan"));
        config.headers = vec![("X-Client".to_string(), "fleet-sync".to_string())];
        let client = VahanClient::new(&config).unwrap();
        let outcome = client.fetch_document_payload(&VehicleId::from("X")).await;

        api_mock.assert();
        assert!(matches!(outcome, FetchOutcome::Payload(_)));
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let mut config = MockConfig::new("http://localhost/verify".to_string());
        config.headers = vec![("bad header".to_string(), "v".to_string())];
        assert!(matches!(
            VahanClient::new(&config),
            Err(SyncError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_classify_body_variants() {
        assert!(matches!(
            classify_body("<html>"),
            FetchOutcome::TransportFailure { .. }
        ));
        assert!(matches!(
            classify_body(r#"{"response": []}"#),
            FetchOutcome::TransportFailure { .. }
        ));
        assert!(matches!(
            classify_body(r#"{"code": "200", "response": []}"#),
            FetchOutcome::NoData { .. }
        ));
        assert!(matches!(
            classify_body(r#"{"code": "200", "response": null}"#),
            FetchOutcome::NoData { .. }
        ));
        assert!(matches!(
            classify_body(r#"{"code": "200", "response": [{"response": ""}]}"#),
            FetchOutcome::NoData { .. }
        ));
        assert_eq!(
            classify_body(r#"{"code": 200, "response": [{"response": "<a/>"}]}"#),
            FetchOutcome::Payload("<a/>".to_string())
        );
    }
}
