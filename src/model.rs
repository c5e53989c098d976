use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Freelancer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Freelancer => "freelancer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" => Some(Role::Client),
            "freelancer" => Some(Role::Freelancer),
            _ => None,
        }
    }
}

/// A user record as returned by `/users/me`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub peer_id: i64,
    pub peer_name: String,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: u32,
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Shown locally, request still in flight.
    Pending,
    Sent,
    /// The send request failed; the entry stays until retried or discarded.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    File,
}

/// An attachment already stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAttachment {
    pub name: String,
    pub url: Option<String>,
    pub kind: AttachmentKind,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Option<i64>,
    pub client_id: Option<Uuid>,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub attachments: Vec<MessageAttachment>,
    pub status: DeliveryStatus,
    pub is_own_message: bool,
}

impl Message {
    /// The peer on the other side of this message, seen from `me`.
    pub fn peer_of(&self, me: i64) -> i64 {
        if self.sender_id == me {
            self.receiver_id
        } else {
            self.sender_id
        }
    }

    pub fn preview(&self) -> String {
        if !self.content.trim().is_empty() {
            return self.content.clone();
        }
        match self.attachments.len() {
            0 => String::new(),
            1 => format!("[{}]", self.attachments[0].name),
            n => format!("[{n} attachments]"),
        }
    }

    pub fn local_time(&self) -> String {
        self.created_at
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string()
    }
}

/// A file picked in the composer but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAttachment {
    pub local_id: Uuid,
    pub kind: AttachmentKind,
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub content_type: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender_id: i64, receiver_id: i64) -> Message {
        Message {
            id: Some(1),
            client_id: None,
            sender_id,
            receiver_id,
            content: String::new(),
            created_at: Utc::now(),
            is_read: false,
            attachments: vec![MessageAttachment {
                name: "brief.pdf".to_string(),
                url: None,
                kind: AttachmentKind::File,
                size: Some(10),
            }],
            status: DeliveryStatus::Sent,
            is_own_message: false,
        }
    }

    #[test]
    fn peer_is_the_other_party() {
        let msg = message(3, 7);
        assert_eq!(msg.peer_of(3), 7);
        assert_eq!(msg.peer_of(7), 3);
    }

    #[test]
    fn preview_falls_back_to_attachment_name() {
        assert_eq!(message(1, 2).preview(), "[brief.pdf]");
    }

    #[test]
    fn roles_parse_loosely() {
        assert_eq!(Role::parse(" Freelancer"), Some(Role::Freelancer));
        assert_eq!(Role::parse("admin"), None);
    }
}
