use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::MessagePart;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One client-supplied conversation turn.
///
/// The role is carried verbatim from the wire; the prompt converter owns the
/// dispatch and fails fast on anything it does not recognize.
pub struct ConversationMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessagePart>,
}

impl ConversationMessage {
    pub fn new<S: Into<String>>(role: S) -> Self {
        ConversationMessage {
            role: role.into(),
            content: Vec::new(),
        }
    }

    /// Create a new system message
    pub fn system() -> Self {
        Self::new("system")
    }

    /// Create a new user message
    pub fn user() -> Self {
        Self::new("user")
    }

    /// Create a new assistant message
    pub fn assistant() -> Self {
        Self::new("assistant")
    }

    /// Add any MessagePart to the message
    pub fn with_part(mut self, part: MessagePart) -> Self {
        self.content.push(part);
        self
    }

    /// Add a text part to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_part(MessagePart::text(text))
    }

    /// Add an unresolved image reference to the message
    pub fn with_image<S: Into<String>>(self, image: S) -> Self {
        self.with_part(MessagePart::image(image))
    }

    /// Add a pending tool call to the message
    pub fn with_tool_call<S: Into<String>, T: Into<String>>(
        self,
        id: S,
        name: T,
        args: Value,
    ) -> Self {
        self.with_part(MessagePart::tool_call(id, name, args))
    }

    /// Add a tool call whose result is already known
    pub fn with_completed_tool_call<S: Into<String>, T: Into<String>>(
        self,
        id: S,
        name: T,
        args: Value,
        result: Value,
    ) -> Self {
        self.with_part(MessagePart::completed_tool_call(id, name, args, result))
    }
}
