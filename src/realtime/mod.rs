mod backoff;
mod channel;
mod frames;

pub use backoff::Backoff;
pub use channel::{socket_url, RealtimeChannel, RealtimeEvent};
pub use frames::{parse_inbound, InboundFrame, OutboundFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting { attempt: u32 },
    Connected,
}

impl ConnectionState {
    pub fn label(&self) -> String {
        match self {
            ConnectionState::Disconnected => "offline".to_string(),
            ConnectionState::Connecting { attempt: 0 } => "connecting".to_string(),
            ConnectionState::Connecting { attempt } => format!("reconnecting (attempt {attempt})"),
            ConnectionState::Connected => "online".to_string(),
        }
    }
}
