use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// A part of a `user` prompt message. Image references arrive as strings
/// and leave here as parsed locators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PromptUserPart {
    Text { text: String },
    Image { url: Url },
}

/// A part of an `assistant` prompt message. Tool calls never carry results
/// here; results live in the `tool` message that follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PromptAssistantPart {
    Text { text: String },
    ToolCall { id: String, name: String, args: Value },
}

/// One completed call inside a `tool` prompt message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PromptToolPart {
    ToolResult {
        id: String,
        name: String,
        result: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
/// The backend-facing normalized turn shape.
///
/// A `tool` message, when present, immediately follows the `assistant`
/// message containing the calls it resolves.
pub enum PromptMessage {
    System { content: String },
    User { content: Vec<PromptUserPart> },
    Assistant { content: Vec<PromptAssistantPart> },
    Tool { content: Vec<PromptToolPart> },
}

impl PromptMessage {
    pub fn system<S: Into<String>>(content: S) -> Self {
        PromptMessage::System {
            content: content.into(),
        }
    }
}

impl PromptAssistantPart {
    pub fn text<S: Into<String>>(text: S) -> Self {
        PromptAssistantPart::Text { text: text.into() }
    }
}
