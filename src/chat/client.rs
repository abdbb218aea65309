//! HTTP client for the assistant's `/chat` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use super::response::{ChatRequest, ChatResponse};

/// Errors raised by a [`ChatClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },
}

/// Anything that can answer a chat request.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Deliver one message and wait for the reply.
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;
}

/// [`ChatClient`] backed by `reqwest`.
///
/// # Example
///
/// ```rust,no_run
/// use tara_chat::chat::{ChatClient, ChatRequest, HttpChatClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpChatClient::new("http://localhost:5000")?;
/// let response = client
///     .send(&ChatRequest { message: "Hello".into(), session_id: "abc".into() })
///     .await?;
/// println!("{:?}", response.reply);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    endpoint: Url,
    http: reqwest::Client,
}

impl HttpChatClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, http)
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self, ClientError> {
        let endpoint = Url::parse(base_url.as_ref())?.join("/chat")?;
        Ok(Self { endpoint, http })
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn handle_response(response: reqwest::Response) -> Result<ChatResponse, ClientError> {
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;
        Self::handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            message: "Hello".into(),
            session_id: "session-1".into(),
        }
    }

    #[tokio::test]
    async fn test_posts_message_and_session_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(json!({ "message": "Hello", "session_id": "session-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "Hi!" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpChatClient::new(server.uri()).unwrap();
        let response = client.send(&request()).await.unwrap();
        assert_eq!(response.reply.as_deref(), Some("Hi!"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error_even_with_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "reply": "ignored" })))
            .mount(&server)
            .await;

        let client = HttpChatClient::new(server.uri()).unwrap();
        let err = client.send(&request()).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = HttpChatClient::new(server.uri()).unwrap();
        let err = client.send(&request()).await.unwrap_err();
        assert!(matches!(err, ClientError::Json(_)));
    }

    #[tokio::test]
    async fn test_wrong_shaped_json_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "reply": "Hi", "table": "Delhi", "meta": { "pdf_url": 1 } })),
            )
            .mount(&server)
            .await;

        let client = HttpChatClient::new(server.uri()).unwrap();
        let response = client.send(&request()).await.unwrap();
        assert_eq!(response.reply.as_deref(), Some("Hi"));
        assert!(response.table.is_none());
        assert!(response.meta.unwrap().pdf_url.is_none());
    }

    #[test]
    fn test_endpoint_is_chat_path() {
        let client = HttpChatClient::new("http://localhost:5000/widget/").unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:5000/chat");
    }
}
