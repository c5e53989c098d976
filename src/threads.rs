use crate::model::{Message, Thread};

/// Conversation summaries in server order, plus the active selection and search text.
#[derive(Debug, Default)]
pub struct ThreadList {
    threads: Vec<Thread>,
    active: Option<i64>,
    query: String,
}

impl ThreadList {
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn active(&self) -> Option<i64> {
        self.active
    }

    pub fn get(&self, peer_id: i64) -> Option<&Thread> {
        self.threads.iter().find(|t| t.peer_id == peer_id)
    }

    /// Replaces the list with a fresh fetch. The open thread stays read.
    pub fn replace(&mut self, mut threads: Vec<Thread>) {
        let mut seen = std::collections::HashSet::new();
        threads.retain(|t| seen.insert(t.peer_id));
        if let Some(active) = self.active {
            for thread in threads.iter_mut().filter(|t| t.peer_id == active) {
                thread.unread_count = 0;
            }
        }
        self.threads = threads;
    }

    /// Makes `peer_id` active and zeroes its counter. Returns how many unread were cleared.
    pub fn select(&mut self, peer_id: i64) -> u32 {
        self.active = Some(peer_id);
        match self.threads.iter_mut().find(|t| t.peer_id == peer_id) {
            Some(thread) => std::mem::take(&mut thread.unread_count),
            None => 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Threads whose peer name or job title contains the query, ignoring case.
    pub fn filtered(&self) -> Vec<&Thread> {
        let needle = self.query.trim().to_lowercase();
        if needle.is_empty() {
            return self.threads.iter().collect();
        }
        self.threads
            .iter()
            .filter(|t| {
                t.peer_name.to_lowercase().contains(&needle)
                    || t
                        .job_title
                        .as_deref()
                        .is_some_and(|job| job.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Updates the summary for a sent or received message and moves it to the top.
    /// Creates the thread when the peer is new. Returns the peer id.
    pub fn record(&mut self, message: &Message, me: i64, peer_name: Option<&str>) -> i64 {
        let peer_id = message.peer_of(me);
        let index = match self.threads.iter().position(|t| t.peer_id == peer_id) {
            Some(index) => index,
            None => {
                self.threads.push(Thread {
                    peer_id,
                    peer_name: peer_name
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("User {peer_id}")),
                    last_message: String::new(),
                    last_message_at: None,
                    unread_count: 0,
                    job_title: None,
                });
                self.threads.len() - 1
            }
        };
        let mut thread = self.threads.remove(index);
        thread.last_message = message.preview();
        thread.last_message_at = Some(message.created_at);
        if !message.is_own_message && self.active != Some(peer_id) {
            thread.unread_count = thread.unread_count.saturating_add(1);
        }
        self.threads.insert(0, thread);
        peer_id
    }

    pub fn total_unread(&self) -> u32 {
        self.threads.iter().map(|t| t.unread_count).sum()
    }

    pub fn clear(&mut self) {
        self.threads.clear();
        self.active = None;
        self.query.clear();
    }
}
