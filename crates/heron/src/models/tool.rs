use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool definition supplied by the client.
///
/// Opaque to this crate: the payload is forwarded to the backend exactly as
/// received, unparsed and unvalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolDefinition(pub Value);

/// Tool selection policy forwarded to the backend when the client asks for
/// one. When absent, the descriptor omits the field entirely and the
/// backend applies its own default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Let the model decide whether to call tools
    Auto,
    /// Require the model to call at least one tool
    Required,
    /// Prevent the model from calling any tools
    None,
    /// Force the model to call a specific tool
    #[serde(rename = "tool")]
    Tool { name: String },
}

impl ToolChoice {
    pub fn tool(name: impl Into<String>) -> Self {
        Self::Tool { name: name.into() }
    }
}
