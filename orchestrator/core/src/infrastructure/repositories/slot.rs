// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Single Slot Store
//!
//! Holds only the most recent text artifact, prefixed with a timestamp header.
//! Each write replaces the previous content wholesale.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::HEADER_TIME_FORMAT;
use crate::domain::storage::PersistenceMedium;

pub struct SingleSlotStore {
    medium: Arc<dyn PersistenceMedium>,
    slot: String,
}

impl SingleSlotStore {
    pub fn new(medium: Arc<dyn PersistenceMedium>, slot: impl Into<String>) -> Self {
        Self {
            medium,
            slot: slot.into(),
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn write(&self, text: &str) -> bool {
        self.write_at(text, Utc::now())
    }

    /// Write with an explicit header timestamp.
    pub fn write_at(&self, text: &str, timestamp: DateTime<Utc>) -> bool {
        let contents = format!("[{}]\n{}\n\n", timestamp.format(HEADER_TIME_FORMAT), text);
        match self.medium.write(&self.slot, &contents) {
            Ok(()) => true,
            Err(e) => {
                warn!(slot = %self.slot, "Failed to write slot: {}", e);
                false
            }
        }
    }

    /// Stored content including its header. `None` when absent, empty or unreadable.
    pub fn read(&self) -> Option<String> {
        match self.medium.read(&self.slot) {
            Ok(Some(contents)) if !contents.is_empty() => Some(contents),
            Ok(_) => None,
            Err(e) => {
                warn!(slot = %self.slot, "Failed to read slot: {}", e);
                None
            }
        }
    }

    /// Empty the slot. `false` when the slot never existed or the write failed.
    pub fn clear(&self) -> bool {
        if !self.medium.exists(&self.slot) {
            return false;
        }
        match self.medium.write(&self.slot, "") {
            Ok(()) => true,
            Err(e) => {
                warn!(slot = %self.slot, "Failed to clear slot: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryMedium;
    use chrono::TimeZone;

    fn store() -> (InMemoryMedium, SingleSlotStore) {
        let medium = InMemoryMedium::new();
        let store = SingleSlotStore::new(Arc::new(medium.clone()), "llm_responses.txt");
        (medium, store)
    }

    #[test]
    fn test_second_write_replaces_first() {
        let (_, store) = store();
        assert!(store.write("A"));
        assert!(store.write("B"));

        let content = store.read().unwrap();
        assert!(content.contains("\nB\n"));
        assert!(!content.contains('A'));
    }

    #[test]
    fn test_header_format() {
        let (_, store) = store();
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        store.write_at("Likely an airport terminal.", ts);
        assert_eq!(
            store.read().as_deref(),
            Some("[2026-01-02 03:04:05]\nLikely an airport terminal.\n\n")
        );
    }

    #[test]
    fn test_clear_then_read_is_absent() {
        let (medium, store) = store();
        assert!(!store.clear());
        assert!(store.read().is_none());

        store.write("something");
        assert!(store.clear());
        assert!(store.read().is_none());
        assert!(medium.exists("llm_responses.txt"));
    }
}
