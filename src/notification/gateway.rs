//! A client for sending SMS through the Africa's Talking messaging API.

use crate::config::SmsConfig;
use crate::core::{SmsGateway, SmsReceipt, SmsRecipient, SmsRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument};

/// Recipient status codes the API uses for accepted messages
/// (Processed, Sent, Queued).
const ACCEPTED_STATUS_CODES: std::ops::RangeInclusive<u16> = 100..=102;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("SMS gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMS gateway rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("SMS was not accepted for any recipient: {0}")]
    Undelivered(String),

    #[error("SMS gateway returned an unreadable response: {0}")]
    InvalidResponse(String),
}

/// Account credentials for the messaging API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
struct MessagingResponse {
    #[serde(rename = "SMSMessageData")]
    data: MessageData,
}

#[derive(Debug, Deserialize)]
struct MessageData {
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Recipients", default)]
    recipients: Vec<RecipientData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipientData {
    status_code: u16,
    number: String,
    status: String,
    cost: Option<String>,
    message_id: Option<String>,
}

/// Sends messages to the Africa's Talking `version1/messaging` endpoint.
pub struct AfricasTalkingClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
}

impl AfricasTalkingClient {
    /// Creates a new client for `endpoint` (e.g. `https://api.africastalking.com`).
    pub fn new(
        endpoint: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Builds a client from the SMS section of the configuration.
    ///
    /// Returns `Ok(None)` when credentials are missing, which disables SMS.
    pub fn from_config(config: &SmsConfig) -> Result<Option<Self>, GatewayError> {
        match config.credentials() {
            Some(credentials) => Ok(Some(Self::new(
                config.endpoint.clone(),
                credentials,
                Duration::from_secs(config.timeout_seconds),
            )?)),
            None => Ok(None),
        }
    }

    fn messaging_url(&self) -> String {
        format!("{}/version1/messaging", self.endpoint)
    }

    fn parse_receipt(body: &str) -> Result<SmsReceipt, GatewayError> {
        let response: MessagingResponse = serde_json::from_str(body)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let accepted = response
            .data
            .recipients
            .iter()
            .any(|r| ACCEPTED_STATUS_CODES.contains(&r.status_code));
        if !accepted {
            return Err(GatewayError::Undelivered(response.data.message));
        }

        Ok(SmsReceipt {
            summary: response.data.message,
            recipients: response
                .data
                .recipients
                .into_iter()
                .map(|r| SmsRecipient {
                    number: r.number,
                    status: r.status,
                    message_id: r.message_id,
                    cost: r.cost,
                })
                .collect(),
        })
    }
}

#[async_trait]
impl SmsGateway for AfricasTalkingClient {
    #[instrument(skip(self, request), fields(to = %request.to))]
    async fn send(&self, request: &SmsRequest) -> Result<SmsReceipt, GatewayError> {
        let form = [
            ("username", self.credentials.username.as_str()),
            ("to", request.to.as_str()),
            ("message", request.message.as_str()),
            ("from", request.from.as_str()),
        ];

        let response = self
            .http
            .post(self.messaging_url())
            .header("apiKey", &self.credentials.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request to SMS gateway failed");
                GatewayError::Http(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(status = %status, body = %body, "SMS gateway rejected the request");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let receipt = Self::parse_receipt(&body)?;
        info!(summary = %receipt.summary, "SMS accepted by gateway");
        Ok(receipt)
    }
}

#[cfg(test)]
mod gateway_tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SUCCESS_BODY: &str = r#"{
        "SMSMessageData": {
            "Message": "Sent to 1/1 Total Cost: RWF 20.0000",
            "Recipients": [{
                "statusCode": 101,
                "number": "+250788123456",
                "status": "Success",
                "cost": "RWF 20.0000",
                "messageId": "ATXid_1"
            }]
        }
    }"#;

    fn credentials() -> Credentials {
        Credentials {
            username: "sandbox".to_string(),
            api_key: "secret-key".to_string(),
        }
    }

    fn request() -> SmsRequest {
        SmsRequest {
            to: "+250788123456".to_string(),
            message: "Report #CR1: Status changed from submitted to assigned.".to_string(),
            from: "CRIME-RPT".to_string(),
        }
    }

    fn client(server: &MockServer, timeout: Duration) -> AfricasTalkingClient {
        AfricasTalkingClient::new(server.uri(), credentials(), timeout).unwrap()
    }

    #[tokio::test]
    async fn test_send_success() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/version1/messaging"))
            .and(header("apiKey", "secret-key"))
            .and(header("accept", "application/json"))
            .and(body_string_contains("username=sandbox"))
            .and(body_string_contains("to=%2B250788123456"))
            .and(body_string_contains("from=CRIME-RPT"))
            .respond_with(ResponseTemplate::new(201).set_body_string(SUCCESS_BODY))
            .expect(1)
            .mount(&server)
            .await;

        // Act
        let receipt = client(&server, Duration::from_secs(5))
            .send(&request())
            .await
            .unwrap();

        // Assert
        assert_eq!(receipt.summary, "Sent to 1/1 Total Cost: RWF 20.0000");
        assert_eq!(receipt.recipients.len(), 1);
        assert_eq!(receipt.recipients[0].message_id.as_deref(), Some("ATXid_1"));
    }

    #[tokio::test]
    async fn test_send_handles_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("The supplied authentication is invalid"))
            .mount(&server)
            .await;

        let result = client(&server, Duration::from_secs(5)).send(&request()).await;

        match result {
            Err(GatewayError::Rejected { status, body }) => {
                assert_eq!(status, 401);
                assert!(body.contains("authentication"));
            }
            other => panic!("expected a rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_reports_undelivered_recipients() {
        let server = MockServer::start().await;
        let body = r#"{"SMSMessageData":{"Message":"Sent to 0/1 Total Cost: 0","Recipients":[{"statusCode":403,"number":"+250788123456","status":"InvalidPhoneNumber","cost":"0","messageId":"None"}]}}"#;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_string(body))
            .mount(&server)
            .await;

        let result = client(&server, Duration::from_secs(5)).send(&request()).await;

        assert!(matches!(result, Err(GatewayError::Undelivered(msg)) if msg.contains("0/1")));
    }

    #[tokio::test]
    async fn test_send_rejects_garbage_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = client(&server, Duration::from_secs(5)).send(&request()).await;

        assert!(matches!(result, Err(GatewayError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_send_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_string(SUCCESS_BODY)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let result = client(&server, Duration::from_millis(200)).send(&request()).await;

        match result {
            Err(GatewayError::Http(e)) => assert!(e.is_timeout(), "expected timeout, got {}", e),
            other => panic!("expected an HTTP timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_from_config_without_credentials_is_disabled() {
        let config = SmsConfig::default();
        assert!(AfricasTalkingClient::from_config(&config).unwrap().is_none());
    }
}
