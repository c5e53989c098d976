use std::collections::HashSet;

use uuid::Uuid;

use crate::model::{DeliveryStatus, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
}

/// Transcript of the active conversation.
///
/// Every selection bumps `generation`; history results tagged with an older
/// generation belong to a conversation that is no longer open and are dropped.
#[derive(Debug)]
pub struct Conversation {
    peer_id: Option<i64>,
    phase: Phase,
    generation: u64,
    messages: Vec<Message>,
    page: u32,
    has_more: bool,
    loading_older: bool,
}

impl Default for Conversation {
    fn default() -> Self {
        Self {
            peer_id: None,
            phase: Phase::Idle,
            generation: 0,
            messages: Vec::new(),
            page: 0,
            has_more: false,
            loading_older: false,
        }
    }
}

impl Conversation {
    pub fn peer_id(&self) -> Option<i64> {
        self.peer_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading_older(&self) -> bool {
        self.loading_older
    }

    /// Whether the transcript still holds the local entry `client_id`.
    pub fn holds(&self, client_id: Uuid) -> bool {
        self.messages.iter().any(|m| m.client_id == Some(client_id))
    }

    pub fn is_open_with(&self, peer_id: i64) -> bool {
        self.peer_id == Some(peer_id)
    }

    /// Opens `peer_id` and returns the generation its history request must carry.
    /// Reopening the same peer keeps pending and failed sends; the page-1 merge re-attaches them.
    pub fn open(&mut self, peer_id: i64) -> u64 {
        self.generation += 1;
        if self.peer_id == Some(peer_id) {
            self.messages
                .retain(|m| m.client_id.is_some() && m.status != DeliveryStatus::Sent);
        } else {
            self.messages.clear();
        }
        self.peer_id = Some(peer_id);
        self.phase = Phase::Loading;
        self.page = 0;
        self.has_more = false;
        self.loading_older = false;
        self.generation
    }

    pub fn close(&mut self) {
        self.generation += 1;
        self.peer_id = None;
        self.phase = Phase::Idle;
        self.messages.clear();
        self.page = 0;
        self.has_more = false;
        self.loading_older = false;
    }

    /// Applies a history page. Returns false when the result is stale.
    pub fn apply_history(
        &mut self,
        generation: u64,
        page: u32,
        history: Vec<Message>,
        limit: u32,
    ) -> bool {
        if generation != self.generation || self.peer_id.is_none() {
            log::debug!(
                "[Messenger] dropping stale history (generation {generation}, current {})",
                self.generation
            );
            return false;
        }
        self.has_more = history.len() as u32 >= limit;
        self.page = self.page.max(page);
        self.phase = Phase::Ready;

        if page <= 1 {
            // Keep whatever arrived locally while the page was in flight.
            let ids: HashSet<i64> = history.iter().filter_map(|m| m.id).collect();
            let extras: Vec<Message> = std::mem::take(&mut self.messages)
                .into_iter()
                .filter(|m| m.id.map_or(true, |id| !ids.contains(&id)))
                .collect();
            self.messages = history;
            self.messages.extend(extras);
        } else {
            self.loading_older = false;
            let known: HashSet<i64> = self.messages.iter().filter_map(|m| m.id).collect();
            let mut older: Vec<Message> = history
                .into_iter()
                .filter(|m| m.id.map_or(true, |id| !known.contains(&id)))
                .collect();
            older.append(&mut self.messages);
            self.messages = older;
        }
        true
    }

    /// Marks a failed history request. Returns false when it was stale.
    pub fn history_failed(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.loading_older = false;
        if self.peer_id.is_some() {
            self.phase = Phase::Ready;
        }
        true
    }

    /// The next older page to fetch, as `(generation, page)`.
    pub fn begin_older(&mut self) -> Option<(u64, u32)> {
        if self.phase != Phase::Ready || !self.has_more || self.loading_older {
            return None;
        }
        self.loading_older = true;
        Some((self.generation, self.page + 1))
    }

    /// Appends a confirmed message in arrival order. Returns false for duplicates.
    pub fn append(&mut self, message: Message) -> bool {
        if let Some(client_id) = message.client_id {
            if self.confirm(client_id, message.clone()) {
                return true;
            }
        }
        if let Some(id) = message.id {
            if self.messages.iter().any(|m| m.id == Some(id)) {
                return false;
            }
        }
        self.messages.push(message);
        true
    }

    pub fn push_optimistic(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replaces the optimistic entry `client_id` with the server's record in place.
    pub fn confirm(&mut self, client_id: Uuid, server: Message) -> bool {
        let Some(index) = self
            .messages
            .iter()
            .position(|m| m.client_id == Some(client_id))
        else {
            return false;
        };
        // A realtime echo may have landed before the acknowledgement.
        if let Some(id) = server.id {
            if let Some(dup) = self
                .messages
                .iter()
                .position(|m| m.id == Some(id) && m.client_id != Some(client_id))
            {
                self.messages.remove(dup);
                return self.confirm(client_id, server);
            }
        }
        let entry = &mut self.messages[index];
        entry.id = server.id;
        entry.created_at = server.created_at;
        entry.is_read = entry.is_read || server.is_read;
        if !server.attachments.is_empty() {
            entry.attachments = server.attachments;
        }
        entry.status = DeliveryStatus::Sent;
        true
    }

    pub fn fail(&mut self, client_id: Uuid) -> bool {
        self.set_status(client_id, DeliveryStatus::Failed)
    }

    /// Puts a failed entry back to pending and returns it for resubmission.
    pub fn retry(&mut self, client_id: Uuid) -> Option<&Message> {
        let entry = self
            .messages
            .iter_mut()
            .find(|m| m.client_id == Some(client_id) && m.status == DeliveryStatus::Failed)?;
        entry.status = DeliveryStatus::Pending;
        Some(&*entry)
    }

    pub fn discard(&mut self, client_id: Uuid) -> bool {
        let before = self.messages.len();
        self.messages
            .retain(|m| !(m.client_id == Some(client_id) && m.status != DeliveryStatus::Sent));
        self.messages.len() != before
    }

    fn set_status(&mut self, client_id: Uuid, status: DeliveryStatus) -> bool {
        match self
            .messages
            .iter_mut()
            .find(|m| m.client_id == Some(client_id))
        {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    /// Flips read flags for `ids`. Returns how many changed.
    pub fn mark_read(&mut self, ids: &[i64]) -> usize {
        let mut changed = 0;
        for message in self.messages.iter_mut() {
            if let Some(id) = message.id {
                if !message.is_read && ids.contains(&id) {
                    message.is_read = true;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Ids of received messages that are still unread.
    pub fn unread_incoming(&self) -> Vec<i64> {
        self.messages
            .iter()
            .filter(|m| !m.is_own_message && !m.is_read)
            .filter_map(|m| m.id)
            .collect()
    }
}
