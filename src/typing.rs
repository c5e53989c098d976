use std::{collections::HashMap, time::Instant};

use crate::config::TYPING_WINDOW;

/// Peer typing flags. Each `typing=true` re-arms a 3 second expiry; `typing=false` clears it.
#[derive(Debug, Default)]
pub struct TypingIndicator {
    last_seen: HashMap<i64, Instant>,
}

impl TypingIndicator {
    pub fn observe(&mut self, peer_id: i64, is_typing: bool, now: Instant) {
        if is_typing {
            self.last_seen.insert(peer_id, now);
        } else {
            self.last_seen.remove(&peer_id);
        }
    }

    pub fn is_typing(&self, peer_id: i64, now: Instant) -> bool {
        self.last_seen
            .get(&peer_id)
            .is_some_and(|seen| now.saturating_duration_since(*seen) < TYPING_WINDOW)
    }

    pub fn clear(&mut self, peer_id: i64) {
        self.last_seen.remove(&peer_id);
    }

    /// Drops expired flags.
    pub fn sweep(&mut self, now: Instant) {
        self.last_seen
            .retain(|_, seen| now.saturating_duration_since(*seen) < TYPING_WINDOW);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn expires_after_three_seconds() {
        let start = Instant::now();
        let mut typing = TypingIndicator::default();
        typing.observe(7, true, start);
        assert!(typing.is_typing(7, start + Duration::from_millis(2999)));
        assert!(!typing.is_typing(7, start + Duration::from_millis(3000)));
    }

    #[test]
    fn new_events_rearm_the_window() {
        let start = Instant::now();
        let mut typing = TypingIndicator::default();
        typing.observe(7, true, start);
        typing.observe(7, true, start + Duration::from_secs(2));
        assert!(typing.is_typing(7, start + Duration::from_secs(4)));
        typing.observe(7, false, start + Duration::from_secs(4));
        assert!(!typing.is_typing(7, start + Duration::from_secs(4)));
    }

    #[test]
    fn sweep_forgets_stale_peers() {
        let start = Instant::now();
        let mut typing = TypingIndicator::default();
        typing.observe(1, true, start);
        typing.observe(2, true, start + Duration::from_secs(2));
        typing.sweep(start + Duration::from_secs(4));
        assert_eq!(typing.last_seen.len(), 1);
        assert!(typing.is_typing(2, start + Duration::from_secs(4)));
    }
}
