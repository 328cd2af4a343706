//! Wire encoding of backend events.
//!
//! Each event maps to exactly one line-oriented record, in event order:
//! `0:` text delta, `9:` tool call, `3:` error, `d:` finish. The encoding
//! is a pure per-event transform; it never buffers or reorders.

use heron::backend::base::{BackendError, FinishReason, StreamEvent, Usage};
use serde_json::{json, Value};

pub fn encode_event(event: &StreamEvent) -> String {
    match event {
        StreamEvent::TextDelta { text } => format_text(text),
        StreamEvent::ToolCall { id, name, args } => format_tool_call(id, name, args),
        StreamEvent::Finish { reason, usage } => format_finish(*reason, usage),
    }
}

pub fn encode_error(err: &BackendError) -> String {
    format!(
        "3:{}\n",
        serde_json::to_string(&err.to_string()).unwrap_or_default()
    )
}

fn format_text(text: &str) -> String {
    let encoded_text = serde_json::to_string(text).unwrap_or_default();
    format!("0:{}\n", encoded_text)
}

fn format_tool_call(id: &str, name: &str, args: &Value) -> String {
    let tool_call = json!({
        "toolCallId": id,
        "toolName": name,
        "args": args
    });
    format!("9:{}\n", tool_call)
}

fn format_finish(reason: FinishReason, usage: &Usage) -> String {
    let finish = json!({
        "finishReason": reason.as_str(),
        "usage": {
            "promptTokens": usage.input_tokens.unwrap_or(0),
            "completionTokens": usage.output_tokens.unwrap_or(0)
        }
    });
    format!("d:{}\n", finish)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_record() {
        let event = StreamEvent::TextDelta {
            text: "hello\nworld".to_string(),
        };
        assert_eq!(encode_event(&event), "0:\"hello\\nworld\"\n");
    }

    #[test]
    fn test_tool_call_record() {
        let event = StreamEvent::ToolCall {
            id: "call_1".to_string(),
            name: "search".to_string(),
            args: json!({"q": "x"}),
        };
        let record = encode_event(&event);
        assert!(record.starts_with("9:"));
        assert!(record.ends_with('\n'));
        let payload: Value = serde_json::from_str(&record[2..record.len() - 1]).unwrap();
        assert_eq!(
            payload,
            json!({"toolCallId": "call_1", "toolName": "search", "args": {"q": "x"}})
        );
    }

    #[test]
    fn test_finish_record() {
        let event = StreamEvent::Finish {
            reason: FinishReason::Stop,
            usage: Usage::new(Some(5), Some(2), Some(7)),
        };
        let record = encode_event(&event);
        let payload: Value = serde_json::from_str(&record[2..record.len() - 1]).unwrap();
        assert_eq!(
            payload,
            json!({"finishReason": "stop", "usage": {"promptTokens": 5, "completionTokens": 2}})
        );
    }

    #[test]
    fn test_error_record() {
        let record = encode_error(&BackendError::Stream("boom".to_string()));
        assert_eq!(record, "3:\"malformed stream payload: boom\"\n");
    }
}
