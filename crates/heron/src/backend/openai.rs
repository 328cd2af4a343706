use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::base::{
    Backend, BackendError, CallOptions, FinishReason, Mode, RawResponse, StreamEvent,
    StreamResponse, Usage,
};
use crate::models::tool::ToolChoice;
use crate::prompt::message::{PromptAssistantPart, PromptMessage, PromptToolPart, PromptUserPart};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct OpenAiBackendConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

/// Backend for OpenAI-compatible chat completion hosts, in streaming mode.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiBackendConfig,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiBackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes cap on one call
            .build()?;

        Ok(Self { client, config })
    }

    fn build_payload(&self, options: &CallOptions) -> Value {
        let mut payload = json!({
            "model": self.config.model,
            "messages": prompt_to_messages(&options.prompt),
            "stream": true,
        });
        let map = payload.as_object_mut().unwrap();

        let Mode::Regular { tools, tool_choice } = &options.mode;
        if let Some(tools) = tools {
            map.insert("tools".to_string(), json!(tools));
        }
        if let Some(choice) = tool_choice {
            map.insert("tool_choice".to_string(), tool_choice_to_value(choice));
        }
        if let Some(temp) = self.config.temperature {
            map.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            map.insert("max_tokens".to_string(), json!(tokens));
        }
        payload
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    async fn invoke(&self, options: CallOptions) -> Result<StreamResponse, BackendError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );
        let payload = self.build_payload(&options);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await?;
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();

        Ok(StreamResponse {
            stream: Box::pin(event_stream(response, options.cancel.clone())),
            warnings: Vec::new(),
            raw_response: RawResponse { headers },
        })
    }
}

/// Decode the SSE body into stream events, honoring the cancellation token.
fn event_stream(
    response: reqwest::Response,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<StreamEvent, BackendError>> {
    async_stream::try_stream! {
        let mut body = response.bytes_stream();
        let mut buf = String::new();
        let mut calls = ToolCallAccumulator::default();

        'read: loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(BackendError::Cancelled),
                chunk = body.next() => Ok(chunk),
            }?;
            let Some(chunk) = chunk else { break };
            buf.push_str(&String::from_utf8_lossy(&chunk?));

            while let Some(pos) = buf.find('\n') {
                let line: String = buf.drain(..=pos).collect();
                let line = line.trim();
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    break 'read;
                }
                let value: Value = serde_json::from_str(data)
                    .map_err(|e| BackendError::Stream(format!("bad stream chunk: {e}")))?;
                for event in decode_chunk(&value, &mut calls)? {
                    yield event;
                }
            }
        }
    }
}

/// Map one parsed chunk to zero or more events. Tool-call argument
/// fragments accumulate until the chunk that carries a finish reason.
fn decode_chunk(
    value: &Value,
    calls: &mut ToolCallAccumulator,
) -> Result<Vec<StreamEvent>, BackendError> {
    let mut events = Vec::new();
    let Some(choice) = value.get("choices").and_then(|c| c.get(0)) else {
        // keep-alive or usage-only chunk
        return Ok(events);
    };

    if let Some(delta) = choice.get("delta") {
        if let Some(text) = delta.get("content").and_then(|v| v.as_str()) {
            if !text.is_empty() {
                events.push(StreamEvent::TextDelta {
                    text: text.to_string(),
                });
            }
        }
        if let Some(deltas) = delta.get("tool_calls").and_then(|v| v.as_array()) {
            for delta in deltas {
                calls.absorb(delta);
            }
        }
    }

    if let Some(reason) = choice.get("finish_reason").and_then(|v| v.as_str()) {
        events.extend(calls.flush()?);
        events.push(StreamEvent::Finish {
            reason: parse_finish_reason(reason),
            usage: parse_usage(value),
        });
    }

    Ok(events)
}

/// Re-assembles tool calls whose arguments arrive fragmented across chunks.
#[derive(Default)]
struct ToolCallAccumulator {
    calls: Vec<PartialToolCall>,
}

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn absorb(&mut self, delta: &Value) {
        let index = delta
            .get("index")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or_else(|| self.calls.len().saturating_sub(1));
        while self.calls.len() <= index {
            self.calls.push(PartialToolCall::default());
        }
        let call = &mut self.calls[index];
        if let Some(id) = delta.get("id").and_then(|v| v.as_str()) {
            call.id = id.to_string();
        }
        if let Some(function) = delta.get("function") {
            if let Some(name) = function.get("name").and_then(|v| v.as_str()) {
                call.name = name.to_string();
            }
            if let Some(arguments) = function.get("arguments").and_then(|v| v.as_str()) {
                call.arguments.push_str(arguments);
            }
        }
    }

    fn flush(&mut self) -> Result<Vec<StreamEvent>, BackendError> {
        std::mem::take(&mut self.calls)
            .into_iter()
            .map(|call| {
                let args = if call.arguments.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&call.arguments).map_err(|e| {
                        BackendError::Stream(format!(
                            "could not parse arguments for tool call {}: {}",
                            call.id, e
                        ))
                    })?
                };
                Ok(StreamEvent::ToolCall {
                    id: call.id,
                    name: call.name,
                    args,
                })
            })
            .collect()
    }
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        other => {
            warn!(reason = other, "unrecognized finish reason");
            FinishReason::Other
        }
    }
}

fn parse_usage(data: &Value) -> Usage {
    let Some(usage) = data.get("usage").filter(|v| !v.is_null()) else {
        return Usage::default();
    };

    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);
    let output_tokens = usage
        .get("completion_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);
    let total_tokens = usage
        .get("total_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

    Usage::new(input_tokens, output_tokens, total_tokens)
}

/// Convert the normalized prompt to the chat completions message array.
/// Each `tool` prompt turn expands into one wire message per result, kept
/// in order right after the assistant message that issued the calls.
fn prompt_to_messages(prompt: &[PromptMessage]) -> Vec<Value> {
    let mut messages = Vec::new();

    for message in prompt {
        match message {
            PromptMessage::System { content } => {
                messages.push(json!({"role": "system", "content": content}));
            }
            PromptMessage::User { content } => {
                let parts: Vec<Value> = content
                    .iter()
                    .map(|part| match part {
                        PromptUserPart::Text { text } => json!({"type": "text", "text": text}),
                        PromptUserPart::Image { url } => {
                            json!({"type": "image_url", "image_url": {"url": url.as_str()}})
                        }
                    })
                    .collect();
                messages.push(json!({"role": "user", "content": parts}));
            }
            PromptMessage::Assistant { content } => {
                let mut converted = json!({"role": "assistant"});
                let map = converted.as_object_mut().unwrap();
                let mut text = String::new();
                let mut tool_calls = Vec::new();
                for part in content {
                    match part {
                        PromptAssistantPart::Text { text: t } => text.push_str(t),
                        PromptAssistantPart::ToolCall { id, name, args } => {
                            tool_calls.push(json!({
                                "id": id,
                                "type": "function",
                                "function": {"name": name, "arguments": args.to_string()},
                            }));
                        }
                    }
                }
                if !text.is_empty() {
                    map.insert("content".to_string(), json!(text));
                }
                if !tool_calls.is_empty() {
                    map.insert("tool_calls".to_string(), json!(tool_calls));
                }
                messages.push(converted);
            }
            PromptMessage::Tool { content } => {
                for part in content {
                    let PromptToolPart::ToolResult { id, result, .. } = part;
                    let content = match result {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    messages.push(json!({"role": "tool", "tool_call_id": id, "content": content}));
                }
            }
        }
    }

    messages
}

fn tool_choice_to_value(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Required => json!("required"),
        ToolChoice::None => json!("none"),
        ToolChoice::Tool { name } => json!({"type": "function", "function": {"name": name}}),
    }
}
