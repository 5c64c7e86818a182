use crate::payload::{encode_payload, ContentKind, InferenceRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use moderation_core::{
    ContentTypeMatching, ErrorMetadata, InferenceOutcome, LogLevel, UnknownContentPolicy,
};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    /// The endpoint could not be reached or did not answer in time.
    #[error("Inference endpoint unavailable: {0}")]
    Unavailable(String),
}

impl ErrorMetadata for InferenceError {
    fn error_code(&self) -> &'static str {
        "INFERENCE_UNAVAILABLE"
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Error
    }
}

/// Classifies content remotely.
///
/// A received response always yields an outcome, whatever its status. Only a
/// missing response is an error.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn classify(
        &self,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> Result<InferenceOutcome, InferenceError>;
}

pub struct HttpInferenceClient {
    http_client: reqwest::Client,
    endpoint_url: String,
    matching: ContentTypeMatching,
    unknown_policy: UnknownContentPolicy,
}

impl HttpInferenceClient {
    pub fn new(
        endpoint_url: impl Into<String>,
        timeout: Duration,
        matching: ContentTypeMatching,
        unknown_policy: UnknownContentPolicy,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for inference endpoint")?;

        Ok(Self {
            http_client,
            endpoint_url: endpoint_url.into(),
            matching,
            unknown_policy,
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn classify(
        &self,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> Result<InferenceOutcome, InferenceError> {
        let start = Instant::now();
        let kind = ContentKind::detect(content_type, self.matching);
        let request = InferenceRequest {
            input: encode_payload(&bytes, kind, self.unknown_policy),
        };
        drop(bytes);

        tracing::debug!(
            endpoint = %self.endpoint_url,
            content_kind = ?kind,
            payload_len = request.input.len(),
            "Submitting content for inference"
        );

        let response = self
            .http_client
            .post(&self.endpoint_url)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("request timed out: {}", e)
                } else {
                    e.to_string()
                };
                tracing::error!(
                    error = %reason,
                    endpoint = %self.endpoint_url,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Inference request failed"
                );
                InferenceError::Unavailable(reason)
            })?;

        let status = response.status().as_u16();
        let outcome = InferenceOutcome::from_status(status);

        tracing::info!(
            status = status,
            passed = outcome.passed,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Inference completed"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(url: String) -> HttpInferenceClient {
        HttpInferenceClient::new(
            url,
            Duration::from_secs(5),
            ContentTypeMatching::MimePrefix,
            UnknownContentPolicy::EmptyPayload,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn status_200_passes_regardless_of_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"label":"unsafe","score":0.99}"#)
            .create_async()
            .await;

        let outcome = client_for(server.url())
            .classify(Bytes::from_static(b"hello"), Some("text/plain"))
            .await
            .unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.raw_status, Some(200));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_200_fails() {
        let mut server = mockito::Server::new_async().await;
        for status in [500, 403, 204] {
            let mock = server
                .mock("POST", "/")
                .with_status(status)
                .with_body("ok")
                .create_async()
                .await;

            let outcome = client_for(server.url())
                .classify(Bytes::from_static(b"hello"), Some("text/plain"))
                .await
                .unwrap();

            assert!(!outcome.passed, "status {}", status);
            assert_eq!(outcome.raw_status, Some(status as u16));
            mock.remove_async().await;
        }
    }

    #[tokio::test]
    async fn text_is_sent_raw_in_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"input": "Test file content"})))
            .with_status(200)
            .create_async()
            .await;

        client_for(server.url())
            .classify(Bytes::from_static(b"Test file content"), Some("text"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn image_is_sent_base64() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::Json(json!({"input": "iVBORw=="})))
            .with_status(200)
            .create_async()
            .await;

        client_for(server.url())
            .classify(Bytes::from_static(&[0x89, 0x50, 0x4E, 0x47]), Some("image/png"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_type_sends_empty_input() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::Json(json!({"input": ""})))
            .with_status(200)
            .create_async()
            .await;

        let outcome = client_for(server.url())
            .classify(Bytes::from_static(b"%PDF-1.7"), None)
            .await
            .unwrap();

        assert!(outcome.passed);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn default_matching_sends_mime_types_as_unknown() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::Json(json!({"input": ""})))
            .with_status(200)
            .expect(2)
            .create_async()
            .await;
        let client = HttpInferenceClient::new(
            server.url(),
            Duration::from_secs(5),
            ContentTypeMatching::default(),
            UnknownContentPolicy::default(),
        )
        .unwrap();

        for content_type in ["text/plain", "image/png"] {
            client
                .classify(Bytes::from_static(b"abc"), Some(content_type))
                .await
                .unwrap();
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn silent_endpoint_times_out_as_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let mut open = Vec::new();
            loop {
                let (socket, _) = listener.accept().await.unwrap();
                open.push(socket);
            }
        });
        let client = HttpInferenceClient::new(
            format!("http://{}/invocations", addr),
            Duration::from_millis(200),
            ContentTypeMatching::Exact,
            UnknownContentPolicy::EmptyPayload,
        )
        .unwrap();

        let err = client
            .classify(Bytes::from_static(b"hello"), Some("text"))
            .await
            .unwrap_err();

        let InferenceError::Unavailable(reason) = &err;
        assert!(reason.contains("timed out"), "{}", reason);
        assert!(err.is_recoverable());
        hold.abort();
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let client = HttpInferenceClient::new(
            "http://127.0.0.1:1/invocations",
            Duration::from_secs(2),
            ContentTypeMatching::MimePrefix,
            UnknownContentPolicy::EmptyPayload,
        )
        .unwrap();

        let err = client
            .classify(Bytes::from_static(b"hello"), Some("text"))
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::Unavailable(_)));
        assert_eq!(err.error_code(), "INFERENCE_UNAVAILABLE");
        assert!(err.is_recoverable());
    }
}
