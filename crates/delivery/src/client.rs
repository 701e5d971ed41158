//! HTTP client for the backend ingest endpoint.

use std::time::Duration;

use {
    reqwest::header::{CONTENT_TYPE, HeaderValue},
    serde::Serialize,
    tracing::trace,
    url::Url,
};

/// Client-wide timeout covering connect, send, and response.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// How much of an error response body is kept for diagnostics.
const MAX_ERROR_BODY: usize = 200;

/// Outcome classification for a failed delivery. All variants are
/// recoverable by design: the caller logs and moves on to the next event.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Connection refused, timeout, DNS failure, or another transport-level
    /// problem before an HTTP status was obtained.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status. The body is truncated
    /// for log hygiene.
    #[error("backend returned status {status}: {body}")]
    BackendRejected { status: u16, body: String },

    /// The payload could not be encoded as JSON.
    #[error("failed to encode payload: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Posts JSON payloads to a fixed backend endpoint.
///
/// Cheap to clone; clones share the underlying connection pool and are safe
/// for concurrent in-flight deliveries.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl DeliveryClient {
    /// Build a client for the given endpoint with the fixed request timeout.
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Serialize `payload` and POST it to the endpoint. One-shot: no retry,
    /// no backoff, no queuing. Any status below 300 is success; the response
    /// body of a success is discarded.
    pub async fn deliver<T: Serialize>(&self, payload: &T) -> Result<()> {
        let body = serde_json::to_vec(payload)?;
        trace!(endpoint = %self.endpoint, bytes = body.len(), "posting payload");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() < 300 {
            return Ok(());
        }

        // Keep a truncated body so operators can see what the backend said.
        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::BackendRejected {
            status: status.as_u16(),
            body: truncate_body(&body),
        })
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(MAX_ERROR_BODY).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, serde::Serialize};

    #[derive(Serialize)]
    struct Payload {
        id: &'static str,
        content: &'static str,
    }

    const PAYLOAD: Payload = Payload {
        id: "3EB0",
        content: "hi",
    };

    fn client(server: &mockito::ServerGuard) -> DeliveryClient {
        let endpoint = Url::parse(&format!("{}/ingest", server.url())).unwrap();
        DeliveryClient::new(endpoint).unwrap()
    }

    #[tokio::test]
    async fn delivers_json_with_content_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ingest")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::JsonString(
                r#"{"id":"3EB0","content":"hi"}"#.into(),
            ))
            .with_status(200)
            .with_body("ignored")
            .create_async()
            .await;

        client(&server).deliver(&PAYLOAD).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn accepts_any_status_below_300() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ingest")
            .with_status(204)
            .create_async()
            .await;

        assert!(client(&server).deliver(&PAYLOAD).await.is_ok());
    }

    #[tokio::test]
    async fn classifies_backend_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ingest")
            .with_status(422)
            .with_body("bad record")
            .create_async()
            .await;

        let err = client(&server).deliver(&PAYLOAD).await.unwrap_err();
        match err {
            DeliveryError::BackendRejected { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "bad record");
            },
            other => panic!("expected BackendRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn truncates_long_rejection_bodies() {
        let long_body = "x".repeat(450);
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ingest")
            .with_status(404)
            .with_body(&long_body)
            .create_async()
            .await;

        let err = client(&server).deliver(&PAYLOAD).await.unwrap_err();
        match err {
            DeliveryError::BackendRejected { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body.len(), 200 + 3);
                assert!(body.ends_with("..."));
                assert!(body.starts_with("xxx"));
            },
            other => panic!("expected BackendRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn classifies_transport_failure() {
        // Nothing listens on this port.
        let endpoint = Url::parse("http://127.0.0.1:9/ingest").unwrap();
        let client = DeliveryClient::new(endpoint).unwrap();

        let err = client.deliver(&PAYLOAD).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
    }

    #[test]
    fn short_bodies_kept_verbatim() {
        assert_eq!(truncate_body("short"), "short");
        let exactly = "y".repeat(200);
        assert_eq!(truncate_body(&exactly), exactly);
    }
}
