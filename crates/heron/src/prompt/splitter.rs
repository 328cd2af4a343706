use super::message::{PromptAssistantPart, PromptMessage, PromptToolPart};
use crate::models::content::ToolCallPart;

/// Splits one client assistant message into the backend's assistant/tool
/// alternation.
///
/// Once a completed result has been collected, any further text belongs to
/// a new assistant turn: the backend allows only one `tool` turn after an
/// `assistant` turn, so text cannot extend a pair whose tool turn is
/// already populated. Tool calls never rotate the pair; a call issued
/// before an earlier call's result is known stays in the same assistant
/// turn.
#[derive(Debug, Default)]
pub struct TurnSplitter {
    finished: Vec<PromptMessage>,
    assistant: Vec<PromptAssistantPart>,
    results: Vec<PromptToolPart>,
}

impl TurnSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb a text part. Text arriving after a completed result closes
    /// the current pair and opens a new one.
    pub fn push_text<S: Into<String>>(&mut self, text: S) {
        if !self.results.is_empty() {
            self.rotate();
        }
        self.assistant.push(PromptAssistantPart::text(text));
    }

    /// Absorb a tool call. The call itself always joins the current
    /// assistant turn; a result, if present, joins the current tool turn.
    pub fn push_tool_call(&mut self, call: &ToolCallPart) {
        self.assistant.push(PromptAssistantPart::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            args: call.args.clone(),
        });
        if let Some(result) = &call.result {
            self.results.push(PromptToolPart::ToolResult {
                id: call.id.clone(),
                name: call.name.clone(),
                result: result.clone(),
            });
        }
    }

    fn rotate(&mut self) {
        let assistant = std::mem::take(&mut self.assistant);
        let results = std::mem::take(&mut self.results);
        self.finished.push(PromptMessage::Assistant { content: assistant });
        self.finished.push(PromptMessage::Tool { content: results });
    }

    /// Consume the splitter, yielding the prompt messages in order. Calls
    /// still waiting on results leave a trailing assistant-only turn.
    pub fn finish(mut self) -> Vec<PromptMessage> {
        if self.results.is_empty() {
            self.finished.push(PromptMessage::Assistant {
                content: self.assistant,
            });
        } else {
            self.rotate();
        }
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::MessagePart;
    use serde_json::json;

    fn completed(id: &str) -> ToolCallPart {
        match MessagePart::completed_tool_call(id, "search", json!({"q": id}), json!("42")) {
            MessagePart::ToolCall(call) => call,
            _ => unreachable!(),
        }
    }

    fn pending(id: &str) -> ToolCallPart {
        match MessagePart::tool_call(id, "search", json!({"q": id})) {
            MessagePart::ToolCall(call) => call,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_text_after_result_rotates() {
        // [call A (with result), text "x", call B (with result)] splits into
        // exactly two pairs, with the text and B in the second.
        let mut splitter = TurnSplitter::new();
        splitter.push_tool_call(&completed("a"));
        splitter.push_text("x");
        splitter.push_tool_call(&completed("b"));
        let messages = splitter.finish();

        assert_eq!(messages.len(), 4);
        match &messages[0] {
            PromptMessage::Assistant { content } => {
                assert_eq!(content.len(), 1);
                assert!(matches!(&content[0], PromptAssistantPart::ToolCall { id, .. } if id == "a"));
            }
            other => panic!("expected assistant turn, got {:?}", other),
        }
        match &messages[1] {
            PromptMessage::Tool { content } => {
                assert_eq!(content.len(), 1);
                let PromptToolPart::ToolResult { id, .. } = &content[0];
                assert_eq!(id, "a");
            }
            other => panic!("expected tool turn, got {:?}", other),
        }
        match &messages[2] {
            PromptMessage::Assistant { content } => {
                assert_eq!(content.len(), 2);
                assert!(matches!(&content[0], PromptAssistantPart::Text { text } if text == "x"));
                assert!(matches!(&content[1], PromptAssistantPart::ToolCall { id, .. } if id == "b"));
            }
            other => panic!("expected assistant turn, got {:?}", other),
        }
        match &messages[3] {
            PromptMessage::Tool { content } => {
                let PromptToolPart::ToolResult { id, .. } = &content[0];
                assert_eq!(id, "b");
            }
            other => panic!("expected tool turn, got {:?}", other),
        }
    }

    #[test]
    fn test_pending_calls_stay_in_one_turn() {
        let mut splitter = TurnSplitter::new();
        splitter.push_tool_call(&pending("a"));
        splitter.push_tool_call(&pending("b"));
        let messages = splitter.finish();

        assert_eq!(messages.len(), 1);
        match &messages[0] {
            PromptMessage::Assistant { content } => {
                assert_eq!(content.len(), 2);
            }
            other => panic!("expected assistant turn, got {:?}", other),
        }
    }

    #[test]
    fn test_text_only_emits_single_turn() {
        let mut splitter = TurnSplitter::new();
        splitter.push_text("hello");
        splitter.push_text("world");
        let messages = splitter.finish();

        assert_eq!(
            messages,
            vec![PromptMessage::Assistant {
                content: vec![
                    PromptAssistantPart::text("hello"),
                    PromptAssistantPart::text("world"),
                ],
            }]
        );
    }

    #[test]
    fn test_call_after_text_does_not_rotate() {
        // A call right after text in the same segment joins that segment,
        // even though the call completes.
        let mut splitter = TurnSplitter::new();
        splitter.push_text("x");
        splitter.push_tool_call(&completed("a"));
        let messages = splitter.finish();

        assert_eq!(messages.len(), 2);
        match &messages[0] {
            PromptMessage::Assistant { content } => assert_eq!(content.len(), 2),
            other => panic!("expected assistant turn, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_message_emits_empty_turn() {
        let messages = TurnSplitter::new().finish();
        assert_eq!(
            messages,
            vec![PromptMessage::Assistant { content: vec![] }]
        );
    }

    #[test]
    fn test_mixed_pending_and_completed_calls() {
        // A pending call between two completed ones stays in the assistant
        // turn; only completed calls produce result entries.
        let mut splitter = TurnSplitter::new();
        splitter.push_tool_call(&completed("a"));
        splitter.push_tool_call(&pending("b"));
        splitter.push_tool_call(&completed("c"));
        let messages = splitter.finish();

        assert_eq!(messages.len(), 2);
        match &messages[0] {
            PromptMessage::Assistant { content } => assert_eq!(content.len(), 3),
            other => panic!("expected assistant turn, got {:?}", other),
        }
        match &messages[1] {
            PromptMessage::Tool { content } => {
                assert_eq!(content.len(), 2);
                let PromptToolPart::ToolResult { id, .. } = &content[0];
                assert_eq!(id, "a");
                let PromptToolPart::ToolResult { id, .. } = &content[1];
                assert_eq!(id, "c");
            }
            other => panic!("expected tool turn, got {:?}", other),
        }
    }
}
