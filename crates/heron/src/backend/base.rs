use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::tool::{ToolChoice, ToolDefinition};
use crate::prompt::message::PromptMessage;

/// Errors raised by a backend collaborator, before or during streaming.
/// The invoker propagates these unchanged; retries, if any, are the
/// backend's own business.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed stream payload: {0}")]
    Stream(String),

    #[error("call cancelled")]
    Cancelled,
}

/// How the prompt is encoded in the call descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Messages,
}

/// Generation mode. Both tool fields are omitted from the serialized
/// descriptor when absent so the backend falls back to its own defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mode {
    Regular {
        #[serde(skip_serializing_if = "Option::is_none")]
        tools: Option<Vec<ToolDefinition>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_choice: Option<ToolChoice>,
    },
}

/// The full descriptor for one backend call.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub input_format: InputFormat,
    pub mode: Mode,
    pub prompt: Vec<PromptMessage>,
    /// Forwarded verbatim; the backend is responsible for honoring it.
    pub cancel: CancellationToken,
}

/// Reason the backend stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
    Other,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool-calls",
            FinishReason::ContentFilter => "content-filter",
            FinishReason::Error => "error",
            FinishReason::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// A backend-native output event. These are forwarded to the encoder
/// untouched, in the order the backend produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    TextDelta { text: String },
    ToolCall { id: String, name: String, args: Value },
    Finish { reason: FinishReason, usage: Usage },
}

/// A non-fatal warning reported by the backend alongside its stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CallWarning {
    UnsupportedSetting { setting: String },
    Other { message: String },
}

/// Response metadata that is not part of the event stream.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub headers: Vec<(String, String)>,
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, BackendError>> + Send>>;

/// Everything a backend hands back for one streaming call.
pub struct StreamResponse {
    pub stream: EventStream,
    pub warnings: Vec<CallWarning>,
    pub raw_response: RawResponse,
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("stream", &"<stream>")
            .field("warnings", &self.warnings)
            .field("raw_response", &self.raw_response)
            .finish()
    }
}

/// Boundary contract for a generative-model backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Start one streaming generation call described by `options`.
    async fn invoke(&self, options: CallOptions) -> Result<StreamResponse, BackendError>;
}
