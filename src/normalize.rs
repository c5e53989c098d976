//! Maps backend JSON into canonical records at the fetch boundary.
//!
//! The backend is not consistent about field names across endpoints, so each
//! canonical field lists the aliases it accepts. Nothing past this module
//! looks at raw JSON.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::{
    error::{ClientError, Result},
    model::{AttachmentKind, DeliveryStatus, Message, MessageAttachment, Role, Thread, UserProfile},
};

fn first<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find(|v| !v.is_null())
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Negative counts read as zero; counts past `u32::MAX` saturate.
fn count(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

fn int_field(value: &Value, keys: &[&str]) -> Option<i64> {
    first(value, keys).and_then(as_int)
}

fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    first(value, keys)
        .and_then(as_text)
        .filter(|s| !s.trim().is_empty())
}

fn bool_field(value: &Value, keys: &[&str]) -> bool {
    match first(value, keys) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        Some(Value::String(s)) => matches!(s.as_str(), "true" | "1"),
        _ => false,
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Naive timestamps from the backend are UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn time_field(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    text_field(value, keys).and_then(|raw| parse_timestamp(&raw))
}

/// Accepts a bare array or an object wrapping one under any of `keys`.
fn list<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    if let Some(items) = value.as_array() {
        return items;
    }
    first(value, keys)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn access_token(value: &Value) -> Result<String> {
    text_field(value, &["access_token", "token"])
        .ok_or_else(|| ClientError::Decode("login response has no access_token".to_string()))
}

pub fn user(value: &Value) -> Result<UserProfile> {
    let id = int_field(value, &["id", "user_id"])
        .ok_or_else(|| ClientError::Decode("user record has no id".to_string()))?;
    let display_name = text_field(value, &["full_name", "name", "username", "email"])
        .unwrap_or_else(|| format!("User {id}"));
    let role = text_field(value, &["role", "user_type"])
        .and_then(|raw| Role::parse(&raw))
        .ok_or_else(|| ClientError::Decode(format!("user {id} has no known role")))?;
    Ok(UserProfile {
        id,
        display_name,
        role,
    })
}

pub fn thread(value: &Value) -> Option<Thread> {
    let peer = first(value, &["peer", "other_user", "participant"]).filter(|v| v.is_object());
    let peer_id = peer
        .and_then(|p| int_field(p, &["id", "user_id"]))
        .or_else(|| int_field(value, &["peer_id", "other_user_id", "user_id"]))?;
    let peer_name = peer
        .and_then(|p| text_field(p, &["full_name", "name", "username"]))
        .or_else(|| text_field(value, &["peer_name", "other_user_name", "full_name", "name"]))
        .unwrap_or_else(|| format!("User {peer_id}"));
    let (last_message, nested_at) = match first(value, &["last_message", "latest_message"]) {
        Some(inner @ Value::Object(_)) => (
            text_field(inner, &["content", "body", "text"]).unwrap_or_default(),
            time_field(inner, &["created_at", "timestamp", "sent_at"]),
        ),
        Some(other) => (as_text(other).unwrap_or_default(), None),
        None => (String::new(), None),
    };
    let last_message_at = time_field(
        value,
        &["last_message_at", "last_message_time", "updated_at", "timestamp"],
    )
    .or(nested_at);
    let unread_count = count(int_field(value, &["unread_count", "unread"]).unwrap_or(0));
    let job_title = text_field(value, &["job_title", "job_name"]).or_else(|| {
        first(value, &["job"])
            .filter(|job| job.is_object())
            .and_then(|job| text_field(job, &["title", "name"]))
    });
    Some(Thread {
        peer_id,
        peer_name,
        last_message,
        last_message_at,
        unread_count,
        job_title,
    })
}

pub fn threads(value: &Value) -> Vec<Thread> {
    list(value, &["threads", "conversations", "items"])
        .iter()
        .filter_map(|item| {
            let parsed = thread(item);
            if parsed.is_none() {
                log::warn!("[Api] dropping thread without a peer id: {item}");
            }
            parsed
        })
        .collect()
}

fn attachment(value: &Value) -> Option<MessageAttachment> {
    let name = text_field(value, &["name", "filename", "file_name"])?;
    let content_type = text_field(value, &["content_type", "mime_type"]).unwrap_or_default();
    let kind = match text_field(value, &["kind", "type"]).as_deref() {
        Some("image") => AttachmentKind::Image,
        Some(_) => AttachmentKind::File,
        None if content_type.starts_with("image/") => AttachmentKind::Image,
        None => AttachmentKind::File,
    };
    Some(MessageAttachment {
        name,
        url: text_field(value, &["url", "file_url", "path"]),
        kind,
        size: int_field(value, &["size", "file_size"]).map(|s| s.max(0) as u64),
    })
}

/// `me` decides `is_own_message`.
pub fn message(value: &Value, me: i64) -> Option<Message> {
    let id = int_field(value, &["id", "message_id"])?;
    let sender_id = int_field(value, &["sender_id", "from_user_id", "sender"])?;
    let receiver_id = int_field(value, &["receiver_id", "to_user_id", "recipient_id"])?;
    let attachments = first(value, &["attachments", "files"])
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(attachment).collect())
        .unwrap_or_default();
    Some(Message {
        id: Some(id),
        client_id: text_field(value, &["client_id"]).and_then(|raw| raw.parse().ok()),
        sender_id,
        receiver_id,
        content: text_field(value, &["content", "body", "text"]).unwrap_or_default(),
        created_at: time_field(value, &["created_at", "timestamp", "sent_at"])
            .unwrap_or_else(Utc::now),
        is_read: bool_field(value, &["is_read", "read"]),
        attachments,
        status: DeliveryStatus::Sent,
        is_own_message: sender_id == me,
    })
}

/// Display name of a message's sender, when the payload carries one.
pub fn sender_name(value: &Value) -> Option<String> {
    text_field(value, &["sender_name", "from_user_name"]).or_else(|| {
        first(value, &["sender"])
            .filter(|sender| sender.is_object())
            .and_then(|sender| text_field(sender, &["full_name", "name", "username"]))
    })
}

pub fn messages(value: &Value, me: i64) -> Vec<Message> {
    list(value, &["messages", "items", "results"])
        .iter()
        .filter_map(|item| {
            let parsed = message(item, me);
            if parsed.is_none() {
                log::warn!("[Api] dropping message without ids: {item}");
            }
            parsed
        })
        .collect()
}

pub fn unread_count(value: &Value) -> u32 {
    count(
        as_int(value)
            .or_else(|| int_field(value, &["unread_count", "count", "total"]))
            .unwrap_or(0),
    )
}

/// Pulls a readable message out of an error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| match first(&value, &["detail", "error", "message"]) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}
