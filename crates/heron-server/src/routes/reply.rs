use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use axum::{
    extract::State,
    http::{self, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{stream::StreamExt, Stream};
use heron::backend::invoker::{stream_completion, CompletionRequest, InvokeError};
use heron::backend::base::StreamResponse;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::protocol;
use crate::state::AppState;

/// Streamed response body carrying the encoded event records.
pub struct DataStreamResponse {
    rx: ReceiverStream<String>,
}

impl DataStreamResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for DataStreamResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for DataStreamResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        http::Response::builder()
            .header("Content-Type", "text/plain; charset=utf-8")
            .header("Cache-Control", "no-cache")
            .body(body)
            .unwrap()
    }
}

async fn handler(
    State(state): State<AppState>,
    Json(request): Json<CompletionRequest>,
) -> axum::response::Response {
    // The token follows the client connection: cancelled when the client
    // goes away or when the stream is fully relayed.
    let cancel = CancellationToken::new();

    match stream_completion(state.backend.as_ref(), &request, cancel.clone()).await {
        Ok(response) => relay(response, cancel).into_response(),
        Err(InvokeError::Convert(e)) => {
            tracing::warn!("rejected request: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
        Err(InvokeError::Backend(e)) => {
            tracing::error!("backend call failed to start: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Pump backend events through the encoder into the response body.
fn relay(response: StreamResponse, cancel: CancellationToken) -> DataStreamResponse {
    for warning in &response.warnings {
        tracing::warn!("backend warning: {:?}", warning);
    }

    let (tx, rx) = mpsc::channel(100);
    let body = ReceiverStream::new(rx);
    let mut stream = response.stream;

    tokio::spawn(async move {
        loop {
            match timeout(Duration::from_millis(500), stream.next()).await {
                Ok(Some(Ok(event))) => {
                    if tx.send(protocol::encode_event(&event)).await.is_err() {
                        // Client went away
                        break;
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::error!("backend stream failed: {}", e);
                    let _ = tx.send(protocol::encode_error(&e)).await;
                    break;
                }
                Ok(None) => {
                    break;
                }
                Err(_) => {
                    // Heartbeat, used to detect disconnected clients
                    if tx.is_closed() {
                        break;
                    }
                    continue;
                }
            }
        }

        // Stop the backend on every exit path
        cancel.cancel();
    });

    DataStreamResponse::new(body)
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/reply", post(handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use futures::stream;
    use heron::backend::base::{
        Backend, BackendError, CallOptions, FinishReason, RawResponse, StreamEvent, Usage,
    };
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Scripted backend for route tests.
    struct ScriptedBackend {
        events: Vec<Result<StreamEvent, String>>,
        fail_on_invoke: Option<String>,
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn invoke(&self, _options: CallOptions) -> Result<StreamResponse, BackendError> {
            if let Some(message) = &self.fail_on_invoke {
                return Err(BackendError::Api {
                    status: 500,
                    message: message.clone(),
                });
            }
            let events: Vec<_> = self
                .events
                .clone()
                .into_iter()
                .map(|event| event.map_err(BackendError::Stream))
                .collect();
            Ok(StreamResponse {
                stream: Box::pin(stream::iter(events)),
                warnings: Vec::new(),
                raw_response: RawResponse::default(),
            })
        }
    }

    fn app(backend: ScriptedBackend) -> Router {
        routes(AppState {
            backend: Arc::new(backend),
        })
    }

    fn request(body: serde_json::Value) -> http::Request<Body> {
        http::Request::builder()
            .method("POST")
            .uri("/reply")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_reply_streams_encoded_events() {
        let backend = ScriptedBackend {
            events: vec![
                Ok(StreamEvent::TextDelta {
                    text: "hi".to_string(),
                }),
                Ok(StreamEvent::ToolCall {
                    id: "1".to_string(),
                    name: "search".to_string(),
                    args: json!({"q": "x"}),
                }),
                Ok(StreamEvent::Finish {
                    reason: FinishReason::Stop,
                    usage: Usage::default(),
                }),
            ],
            fail_on_invoke: None,
        };

        let response = app(backend)
            .oneshot(request(json!({
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}]
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["Content-Type"],
            "text/plain; charset=utf-8"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(body.to_vec()).unwrap();
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "0:\"hi\"");
        assert!(lines[1].starts_with("9:"));
        assert!(lines[2].starts_with("d:"));
    }

    #[tokio::test]
    async fn test_reply_rejects_unknown_role() {
        let backend = ScriptedBackend {
            events: vec![],
            fail_on_invoke: None,
        };

        let response = app(backend)
            .oneshot(request(json!({
                "messages": [{"role": "moderator", "content": []}]
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "unknown role: moderator");
    }

    #[tokio::test]
    async fn test_reply_maps_backend_startup_failure() {
        let backend = ScriptedBackend {
            events: vec![],
            fail_on_invoke: Some("model overloaded".to_string()),
        };

        let response = app(backend)
            .oneshot(request(json!({
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}]
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_reply_ends_body_with_error_record() {
        let backend = ScriptedBackend {
            events: vec![
                Ok(StreamEvent::TextDelta {
                    text: "partial".to_string(),
                }),
                Err("connection reset".to_string()),
                // Never reached: the relay stops at the first stream error.
                Ok(StreamEvent::TextDelta {
                    text: "after".to_string(),
                }),
            ],
            fail_on_invoke: None,
        };

        let response = app(backend)
            .oneshot(request(json!({
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}]
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(body.to_vec()).unwrap();
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "0:\"partial\"");
        assert_eq!(
            lines[1],
            "3:\"malformed stream payload: connection reset\""
        );
    }
}
