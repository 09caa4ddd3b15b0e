//! Who holds operator status in the bot's channel.

use std::{
    collections::HashSet,
    sync::{Arc, RwLock},
};

/// Case-folded set of channel operators, fed by NAMES and MODE events.
#[derive(Clone, Default)]
pub struct OperatorRoster {
    operators: Arc<RwLock<HashSet<String>>>,
}

impl OperatorRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_operator(&self, nick: &str) -> bool {
        self.read().contains(&nick.to_lowercase())
    }

    pub fn set(&self, nick: &str, operator: bool) {
        let mut operators = self.write();

        if operator {
            operators.insert(nick.to_lowercase());
        } else {
            operators.remove(&nick.to_lowercase());
        }
    }

    /// Carry operator status over a nick change.
    pub fn rename(&self, old: &str, new: &str) {
        let mut operators = self.write();

        if operators.remove(&old.to_lowercase()) {
            operators.insert(new.to_lowercase());
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashSet<String>> {
        self.operators.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashSet<String>> {
        self.operators.write().unwrap_or_else(|e| e.into_inner())
    }
}
