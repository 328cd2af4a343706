use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::base::{Backend, BackendError, CallOptions, InputFormat, Mode, StreamResponse};
use crate::errors::ConvertError;
use crate::models::message::ConversationMessage;
use crate::models::tool::{ToolChoice, ToolDefinition};
use crate::prompt::convert_prompt;

/// One inbound completion request, as accepted at the HTTP boundary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<ConversationMessage>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub tool_choice: Option<ToolChoice>,
}

/// Failure to start a completion. Conversion failures stay separable from
/// backend failures so the endpoint can answer 4xx before the backend is
/// ever reached.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Convert the conversation and start one streaming backend call.
///
/// The descriptor carries the tool list and tool-choice policy only when
/// the request supplied them. The returned stream, warnings, and raw
/// response come back from the backend untouched — no buffering, no
/// reordering, no filtering, no retries.
pub async fn stream_completion<B: Backend + ?Sized>(
    backend: &B,
    request: &CompletionRequest,
    cancel: CancellationToken,
) -> Result<StreamResponse, InvokeError> {
    let prompt = convert_prompt(request.system.as_deref(), &request.messages)?;

    let options = CallOptions {
        input_format: InputFormat::Messages,
        mode: Mode::Regular {
            tools: request.tools.clone(),
            tool_choice: request.tool_choice.clone(),
        },
        prompt,
        cancel,
    };

    debug!(messages = request.messages.len(), "invoking backend");
    Ok(backend.invoke(options).await?)
}
