use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

/// An image reference as the client supplies it: a URI string that has not
/// been resolved yet. Resolution happens during prompt conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePart {
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPart {
    pub id: String,
    pub name: String,
    pub args: Value,
    /// The value produced by executing the call; absent while pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
/// Content passed inside a conversation message
pub enum MessagePart {
    Text(TextPart),
    Image(ImagePart),
    ToolCall(ToolCallPart),
}

impl MessagePart {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessagePart::Text(TextPart { text: text.into() })
    }

    pub fn image<S: Into<String>>(image: S) -> Self {
        MessagePart::Image(ImagePart {
            image: image.into(),
        })
    }

    pub fn tool_call<S: Into<String>, T: Into<String>>(id: S, name: T, args: Value) -> Self {
        MessagePart::ToolCall(ToolCallPart {
            id: id.into(),
            name: name.into(),
            args,
            result: None,
        })
    }

    pub fn completed_tool_call<S: Into<String>, T: Into<String>>(
        id: S,
        name: T,
        args: Value,
        result: Value,
    ) -> Self {
        MessagePart::ToolCall(ToolCallPart {
            id: id.into(),
            name: name.into(),
            args,
            result: Some(result),
        })
    }

    /// Get the text if this is a Text variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessagePart::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCallPart> {
        match self {
            MessagePart::ToolCall(call) => Some(call),
            _ => None,
        }
    }

    /// The wire tag of this part, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            MessagePart::Text(_) => "text",
            MessagePart::Image(_) => "image",
            MessagePart::ToolCall(_) => "tool-call",
        }
    }
}
