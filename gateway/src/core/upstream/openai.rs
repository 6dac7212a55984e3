//! OpenAI-compatible streaming chat completions client.
//!
//! # API Reference
//!
//! - Endpoint: `POST {base_url}/chat/completions`
//! - Auth: `Authorization: Bearer <key>`
//! - Response: `text/event-stream`, one `data: <json>` event per chunk,
//!   terminated by `data: [DONE]`

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::base::{ChatCompletionSource, EventStream, StreamEvent, UpstreamError, UpstreamResult};
use crate::config::UpstreamConfig;
use crate::core::chat::UpstreamRequest;

/// Upstream end-of-stream marker
const DONE_MARKER: &str = "[DONE]";

/// Streaming client for any provider exposing the OpenAI chat completions API
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl OpenAiCompatibleClient {
    /// Create a client from the upstream settings
    ///
    /// Only the connect phase is bounded by the HTTP client itself; the
    /// request and idle timeouts are enforced per call so long streams are
    /// never cut off by a total-request deadline.
    pub fn new(config: UpstreamConfig) -> UpstreamResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| UpstreamError::Connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }
}

#[async_trait]
impl ChatCompletionSource for OpenAiCompatibleClient {
    async fn open_stream(
        &self,
        request: UpstreamRequest,
        cancel: CancellationToken,
    ) -> UpstreamResult<EventStream> {
        let api_key = self.config.api_key.as_ref().ok_or_else(|| {
            UpstreamError::Authentication(
                "LLM API key not configured in server environment (YOUR_LLM_API_KEY)".to_string(),
            )
        })?;

        let url = self.config.completions_url();
        debug!(url = %url, model = ?request.model, "Opening upstream completion stream");

        let send = self
            .http
            .post(&url)
            .bearer_auth(api_key.expose())
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send();

        let request_timeout = self.config.request_timeout();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpstreamError::Cancelled),
            result = tokio::time::timeout(request_timeout, send) => match result {
                Err(_) => {
                    return Err(UpstreamError::Timeout(format!(
                        "no response from provider within {}s",
                        request_timeout.as_secs()
                    )));
                }
                Ok(Err(e)) => return Err(map_reqwest_error(e)),
                Ok(Ok(response)) => response,
            },
        };

        let status = response.status();
        if !status.is_success() {
            // A stalled error body is bounded like the headers
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UpstreamError::Cancelled),
                body = tokio::time::timeout(request_timeout, response.text()) => match body {
                    Ok(Ok(body)) => body,
                    _ => "Unknown error".to_string(),
                },
            };
            warn!(status = status.as_u16(), "Provider rejected completion request");
            return Err(match status.as_u16() {
                401 | 403 => UpstreamError::Authentication(body),
                code => UpstreamError::Rejected { status: code, body },
            });
        }

        Ok(sse_event_stream(
            response.bytes_stream(),
            self.config.idle_timeout(),
            cancel,
        ))
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

fn map_reqwest_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout(err.to_string())
    } else {
        UpstreamError::Connection(err.to_string())
    }
}

/// Decode a provider SSE body into [`StreamEvent`]s
///
/// Ends after the `[DONE]` marker or when the body closes. Any decode,
/// transport or idle-timeout failure is yielded once and ends the stream.
pub(crate) fn sse_event_stream<S>(
    body: S,
    idle_timeout: Duration,
    cancel: CancellationToken,
) -> EventStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let mut events = Box::pin(body.eventsource());

    Box::pin(async_stream::stream! {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = tokio::time::timeout(idle_timeout, events.next()) => Some(next),
            };
            let Some(next) = next else {
                yield Err(UpstreamError::Cancelled);
                break;
            };

            match next {
                Err(_) => {
                    yield Err(UpstreamError::Timeout(format!(
                        "no event from provider within {}s",
                        idle_timeout.as_secs()
                    )));
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    yield Err(UpstreamError::Stream(e.to_string()));
                    break;
                }
                Ok(Some(Ok(event))) => {
                    let data = event.data.trim();
                    if data == DONE_MARKER {
                        break;
                    }
                    if data.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Value>(data) {
                        Ok(payload) => yield Ok(StreamEvent::new(payload)),
                        Err(e) => {
                            yield Err(UpstreamError::InvalidEvent(e.to_string()));
                            break;
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> OpenAiCompatibleClient {
        OpenAiCompatibleClient::new(UpstreamConfig {
            api_key: api_key.map(ApiKey::new),
            base_url: format!("{}/v1", server.uri()),
            default_model: None,
            connect_timeout_seconds: 2,
            request_timeout_seconds: 5,
            idle_timeout_seconds: 5,
        })
        .unwrap()
    }

    fn request() -> UpstreamRequest {
        let chat = serde_json::from_value(json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();
        UpstreamRequest::passthrough(&chat, None)
    }

    fn sse_body(chunks: &[&str]) -> String {
        let mut body = String::new();
        for content in chunks {
            let chunk = json!({
                "id": "chatcmpl-1",
                "object": "chat.completion.chunk",
                "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
            });
            body.push_str(&format!("data: {chunk}\n\n"));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[tokio::test]
    async fn test_streams_events_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini", "stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&["Hel", "lo", "!"]), "text/event-stream"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sk-test"));
        let stream = client
            .open_stream(request(), CancellationToken::new())
            .await
            .unwrap();

        let events: Vec<_> = stream.collect().await;
        let contents: Vec<String> = events
            .into_iter()
            .map(|e| {
                e.unwrap().payload()["choices"][0]["delta"]["content"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(contents, vec!["Hel", "lo", "!"]);
    }

    #[tokio::test]
    async fn test_unauthorized_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sk-wrong"));
        let result = client.open_stream(request(), CancellationToken::new()).await;

        match result {
            Err(UpstreamError::Authentication(body)) => assert!(body.contains("invalid api key")),
            other => panic!("expected authentication error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sk-test"));
        let result = client.open_stream(request(), CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(UpstreamError::Rejected { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_stalled_error_body_is_bounded() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promises a longer body than it sends, then keeps the connection open
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = OpenAiCompatibleClient::new(UpstreamConfig {
            api_key: Some(ApiKey::new("sk-test")),
            base_url: format!("http://{addr}/v1"),
            default_model: None,
            connect_timeout_seconds: 2,
            request_timeout_seconds: 1,
            idle_timeout_seconds: 5,
        })
        .unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.open_stream(request(), CancellationToken::new()),
        )
        .await
        .expect("error body read was not bounded");

        match result {
            Err(UpstreamError::Rejected { status: 500, body }) => assert_eq!(body, "Unknown error"),
            other => panic!("expected rejection, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_calling_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let result = client.open_stream(request(), CancellationToken::new()).await;
        assert!(matches!(result, Err(UpstreamError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_open() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&["late"]), "text/event-stream")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sk-test"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client.open_stream(request(), cancel).await;
        assert!(matches!(result, Err(UpstreamError::Cancelled)));
    }

    #[tokio::test]
    async fn test_sse_stream_stops_on_invalid_json() {
        let body = futures::stream::iter(vec![
            Ok::<_, reqwest::Error>(Bytes::from_static(b"data: {\"id\":\"a\"}\n\n")),
            Ok(Bytes::from_static(b"data: not-json\n\n")),
            Ok(Bytes::from_static(b"data: {\"id\":\"b\"}\n\n")),
        ]);

        let events: Vec<_> = sse_event_stream(body, Duration::from_secs(1), CancellationToken::new())
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(events[1], Err(UpstreamError::InvalidEvent(_))));
    }

    #[tokio::test]
    async fn test_sse_stream_yields_cancelled() {
        let body = futures::stream::pending::<Result<Bytes, reqwest::Error>>();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let events: Vec<_> = sse_event_stream(body, Duration::from_secs(5), cancel)
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(UpstreamError::Cancelled)));
    }

    #[tokio::test]
    async fn test_sse_stream_idle_timeout() {
        let body = futures::stream::pending::<Result<Bytes, reqwest::Error>>();
        let events: Vec<_> =
            sse_event_stream(body, Duration::from_millis(20), CancellationToken::new())
                .collect()
                .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(UpstreamError::Timeout(_))));
    }
}
