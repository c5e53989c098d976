use std::time::Instant;

use crate::config::TOAST_TTL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Message,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub title: String,
    pub body: String,
    pub created_at: Instant,
}

/// Transient toasts. Every push is its own toast; nothing is coalesced.
#[derive(Debug, Default)]
pub struct Notifications {
    toasts: Vec<Toast>,
    next_id: u64,
}

impl Notifications {
    pub fn push(
        &mut self,
        kind: ToastKind,
        title: impl Into<String>,
        body: impl Into<String>,
        now: Instant,
    ) -> u64 {
        self.next_id += 1;
        let toast = Toast {
            id: self.next_id,
            kind,
            title: title.into(),
            body: body.into(),
            created_at: now,
        };
        if kind == ToastKind::Error {
            log::warn!("[Notify] {}: {}", toast.title, toast.body);
        }
        self.toasts.push(toast);
        self.next_id
    }

    pub fn expire(&mut self, now: Instant) {
        self.toasts
            .retain(|toast| now.saturating_duration_since(toast.created_at) < TOAST_TTL);
    }

    pub fn dismiss(&mut self, id: u64) {
        self.toasts.retain(|toast| toast.id != id);
    }

    pub fn visible(&self) -> &[Toast] {
        &self.toasts
    }
}
