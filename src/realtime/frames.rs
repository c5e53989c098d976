use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// `message` is a raw backend record; it goes through `normalize` like REST payloads.
    NewMessage { message: Value },
    Typing { sender_id: i64, is_typing: bool },
    MessageRead {
        message_ids: Vec<i64>,
        #[serde(default)]
        reader_id: Option<i64>,
    },
}

/// Frames the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Typing { receiver_id: i64, is_typing: bool },
    MarkRead { message_ids: Vec<i64> },
}

pub fn parse_inbound(text: &str) -> Option<InboundFrame> {
    match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => Some(frame),
        Err(err) => {
            log::warn!("[Realtime] ignoring frame ({err}): {text}");
            None
        }
    }
}
