//! Last-activity tracking for the `seen` command.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};

use crate::base::types::PresenceRecord;

/// In-memory map of nick to the last thing they said.
///
/// Nicks are case-folded for lookup; the record keeps the spelling last used.
///
/// This is trivially cloneable; clones share the same map. Nothing is persisted.
#[derive(Clone, Default)]
pub struct PresenceTracker {
    records: Arc<RwLock<HashMap<String, PresenceRecord>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record for `nickname`.
    pub fn touch(&self, nickname: &str, message: &str, now: DateTime<Utc>) {
        let record = PresenceRecord {
            nickname: nickname.to_string(),
            last_message: message.to_string(),
            last_seen_at: now,
        };

        // A poisoned lock still holds whole records, so keep going.
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert(fold(nickname), record);
    }

    /// Get the latest record for `nickname`, if it has been seen since start.
    pub fn lookup(&self, nickname: &str) -> Option<PresenceRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(&fold(nickname)).cloned()
    }
}

fn fold(nickname: &str) -> String {
    nickname.to_lowercase()
}
