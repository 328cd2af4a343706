use tracing::warn;
use url::Url;

use super::message::{PromptMessage, PromptUserPart};
use super::splitter::TurnSplitter;
use crate::errors::{ConvertError, ConvertResult};
use crate::models::content::MessagePart;
use crate::models::message::ConversationMessage;

/// Convert an optional system preamble plus a conversation into the
/// backend prompt shape.
///
/// Each conversation message expands to zero or more prompt messages,
/// concatenated in input order. Conversion is pure and happens entirely
/// before the backend call, so every error here is pre-stream.
pub fn convert_prompt(
    system: Option<&str>,
    messages: &[ConversationMessage],
) -> ConvertResult<Vec<PromptMessage>> {
    let mut prompt = Vec::with_capacity(messages.len() + 1);

    if let Some(system) = system {
        prompt.push(PromptMessage::system(system));
    }

    for message in messages {
        match message.role.as_str() {
            "system" => prompt.push(convert_system(message)?),
            "user" => prompt.push(convert_user(message)?),
            "assistant" => prompt.extend(convert_assistant(message)?),
            other => return Err(ConvertError::UnknownRole(other.to_string())),
        }
    }

    Ok(prompt)
}

fn convert_system(message: &ConversationMessage) -> ConvertResult<PromptMessage> {
    let text = message
        .content
        .first()
        .and_then(MessagePart::as_text)
        .ok_or_else(|| ConvertError::MalformedContent {
            reason: "system message has no text content".to_string(),
        })?;
    if message.content.len() > 1 {
        warn!(
            parts = message.content.len(),
            "system message has extra content parts, using the first"
        );
    }
    Ok(PromptMessage::system(text))
}

fn convert_user(message: &ConversationMessage) -> ConvertResult<PromptMessage> {
    let mut content = Vec::with_capacity(message.content.len());
    for part in &message.content {
        match part {
            MessagePart::Text(text) => content.push(PromptUserPart::Text {
                text: text.text.clone(),
            }),
            MessagePart::Image(image) => {
                let url = Url::parse(&image.image).map_err(|e| ConvertError::MalformedContent {
                    reason: format!("invalid image reference '{}': {}", image.image, e),
                })?;
                content.push(PromptUserPart::Image { url });
            }
            other => return Err(unexpected_part("user", other)),
        }
    }
    Ok(PromptMessage::User { content })
}

fn convert_assistant(message: &ConversationMessage) -> ConvertResult<Vec<PromptMessage>> {
    let mut splitter = TurnSplitter::new();
    for part in &message.content {
        match part {
            MessagePart::Text(text) => splitter.push_text(text.text.clone()),
            MessagePart::ToolCall(call) => splitter.push_tool_call(call),
            other => return Err(unexpected_part("assistant", other)),
        }
    }
    Ok(splitter.finish())
}

fn unexpected_part(role: &str, part: &MessagePart) -> ConvertError {
    ConvertError::UnknownContentType {
        role: role.to_string(),
        kind: part.kind().to_string(),
    }
}
