//! Resend email provider integration.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::{MailError, Message, MessageId, ProviderError, Result, Tag, Transport};

/// Production send endpoint.
pub const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Resend configuration.
#[derive(Debug, Clone)]
pub struct ResendConfig {
    /// API key.
    pub api_key: SecretString,
    /// API endpoint (defaults to production).
    pub endpoint: String,
    /// Timeout of one HTTP request.
    pub timeout: Duration,
}

impl ResendConfig {
    /// Create a new Resend configuration.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            endpoint: RESEND_ENDPOINT.to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Set a custom endpoint (for testing).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Resend transport.
pub struct ResendTransport {
    client: Client,
    config: ResendConfig,
}

impl ResendTransport {
    /// Create a new Resend transport.
    pub fn new(config: ResendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MailError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ResendConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for ResendTransport {
    async fn send(&self, message: &Message) -> std::result::Result<MessageId, ProviderError> {
        let payload = ResendPayload::from_message(message);

        debug!(
            to = %message.to().email(),
            subject = %message.subject(),
            "Sending email via Resend"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();

        if status.is_success() {
            let body = response.text().await.map_err(request_error)?;
            let parsed: ResendResponse = serde_json::from_str(&body).map_err(|e| {
                ProviderError::malformed(format!("unreadable success body: {e}"))
            })?;

            return match parsed.id {
                Some(id) if !id.trim().is_empty() => {
                    debug!(message_id = %id, "Email accepted by Resend");
                    Ok(MessageId::new(id))
                }
                _ => Err(ProviderError::malformed("success response without an id")),
            };
        }

        let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
            response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        } else {
            None
        };

        let body = response.text().await.unwrap_or_default();
        let mut error = ProviderError::http(status.as_u16(), describe_error(status, &body));
        if let Some(wait) = retry_after {
            error = error.with_retry_after(wait);
        }
        Err(error)
    }

    fn name(&self) -> &'static str {
        "resend"
    }
}

fn request_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(format!("request timed out: {err}"))
    } else {
        ProviderError::network(err.to_string())
    }
}

/// Text for a non-success response: the provider's `{name, message}` body
/// when present, else the raw body, else the reason phrase.
fn describe_error(status: StatusCode, body: &str) -> String {
    if let Ok(ResendErrorBody {
        name,
        message: Some(message),
    }) = serde_json::from_str::<ResendErrorBody>(body)
    {
        return match name {
            Some(name) => format!("{message} ({name})"),
            None => message,
        };
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    status.canonical_reason().unwrap_or("unknown status").to_string()
}

/// Resend API payload.
#[derive(Debug, Serialize)]
struct ResendPayload<'a> {
    from: String,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<String>,
    #[serde(skip_serializing_if = "no_tags")]
    tags: &'a [Tag],
}

impl<'a> ResendPayload<'a> {
    fn from_message(message: &'a Message) -> Self {
        Self {
            from: message.from().to_string(),
            to: vec![message.to().email()],
            subject: message.subject(),
            html: message.html(),
            text: message.text(),
            reply_to: message.reply_to().map(ToString::to_string),
            tags: message.tags(),
        }
    }
}

fn no_tags(tags: &&[Tag]) -> bool {
    tags.is_empty()
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    name: Option<String>,
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, MessageTemplate, ProviderErrorKind};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> Message {
        MessageTemplate::builder()
            .from(Address::parse("Launchpad <hello@launchpad.dev>").unwrap())
            .subject("We're live")
            .html("<h1>Live</h1>")
            .tag(Tag::new("campaign", "launch").unwrap())
            .build()
            .unwrap()
            .for_recipient(&Address::new("reader@example.com").unwrap())
    }

    fn transport(server: &MockServer) -> ResendTransport {
        let config = ResendConfig::new(SecretString::from("re_test_key".to_string()))
            .endpoint(format!("{}/emails", server.uri()))
            .timeout(Duration::from_millis(300));
        ResendTransport::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_send_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test_key"))
            .and(body_partial_json(json!({
                "from": "Launchpad <hello@launchpad.dev>",
                "to": ["reader@example.com"],
                "subject": "We're live",
                "tags": [{"name": "campaign", "value": "launch"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_123"})))
            .expect(1)
            .mount(&server)
            .await;

        let id = transport(&server).send(&message()).await.unwrap();
        assert_eq!(id.as_str(), "msg_123");
    }

    #[tokio::test]
    async fn test_success_without_id_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": ""})))
            .mount(&server)
            .await;

        let err = transport(&server).send(&message()).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_empty_success_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = transport(&server).send(&message()).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "2")
                    .set_body_json(json!({
                        "name": "rate_limit_exceeded",
                        "message": "Too many requests"
                    })),
            )
            .mount(&server)
            .await;

        let err = transport(&server).send(&message()).await.unwrap_err();
        assert_eq!(err.status, Some(429));
        assert_eq!(err.retry_after, Some(Duration::from_secs(2)));
        assert_eq!(
            err.to_string(),
            "http error 429: Too many requests (rate_limit_exceeded)"
        );
    }

    #[tokio::test]
    async fn test_validation_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "name": "validation_error",
                "message": "Invalid `to` field"
            })))
            .mount(&server)
            .await;

        let err = transport(&server).send(&message()).await.unwrap_err();
        assert_eq!(err.status, Some(422));
        assert!(err.retry_after.is_none());
        assert!(err.message.contains("Invalid `to` field"));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = transport(&server).send(&message()).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Timeout);
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_describe_error_fallbacks() {
        assert_eq!(describe_error(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
        assert_eq!(
            describe_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            "boom"
        );
    }
}
