//! Transient cooldown list that keeps recently posted content from being reselected

use std::collections::HashMap;
use time::{Duration, OffsetDateTime};

/// Cooldown applied after a successful post
pub const DEFAULT_COOLDOWN: Duration = Duration::hours(6);

/// In-memory map from content key to cooldown expiry.
///
/// Lives for the lifetime of the process and is never persisted. A key whose
/// expiry lies in the future is blocked; expired or absent keys are eligible.
#[derive(Debug, Clone)]
pub struct BlockList {
    cooldown: Duration,
    entries: HashMap<String, OffsetDateTime>,
}

impl BlockList {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            entries: HashMap::new(),
        }
    }

    pub fn is_blocked(&self, key: &str, now: OffsetDateTime) -> bool {
        self.entries.get(key).is_some_and(|until| *until > now)
    }

    pub fn blocked_until(&self, key: &str) -> Option<OffsetDateTime> {
        self.entries.get(key).copied()
    }

    /// Block `key` until `now + cooldown`, returning the expiry.
    ///
    /// Saturates at the latest representable time.
    pub fn block(&mut self, key: &str, now: OffsetDateTime) -> OffsetDateTime {
        let until = now.saturating_add(self.cooldown);
        self.entries.insert(key.to_string(), until);
        until
    }

    /// Drop entries whose cooldown has passed
    pub fn prune_expired(&mut self, now: OffsetDateTime) {
        self.entries.retain(|_, until| *until > now);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BlockList {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
