// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Bounded History Store
//!
//! Insertion-ordered log with FIFO eviction. Every append is a
//! read-modify-write of the whole array; nothing is appended on disk.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::HEADER_TIME_FORMAT;
use crate::domain::motion::{format_labels, MotionDetectionRecord};
use crate::domain::storage::{PersistenceMedium, StorageError};

/// Rendering used when the motion history holds nothing.
pub const NO_MOTION_HISTORY: &str = "No motion detections recorded";

/// Result of reading the whole history.
///
/// A missing, empty or unparseable slot is `NoData`, never an empty `Records`.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryRead<T> {
    NoData,
    Records(Vec<T>),
}

impl<T> HistoryRead<T> {
    pub fn records(&self) -> &[T] {
        match self {
            HistoryRead::NoData => &[],
            HistoryRead::Records(records) => records,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, HistoryRead::NoData)
    }
}

pub struct BoundedHistoryStore<T> {
    medium: Arc<dyn PersistenceMedium>,
    slot: String,
    capacity: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T> BoundedHistoryStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(medium: Arc<dyn PersistenceMedium>, slot: impl Into<String>, capacity: usize) -> Self {
        Self {
            medium,
            slot: slot.into(),
            capacity: capacity.max(1),
            _record: PhantomData,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Append a record, evicting the oldest entries beyond capacity.
    pub fn append(&self, record: T) -> bool {
        let mut records = self.load().unwrap_or_default();
        records.push(record);
        while records.len() > self.capacity {
            records.remove(0);
        }

        match self.persist(&records) {
            Ok(()) => true,
            Err(e) => {
                warn!(slot = %self.slot, "Failed to persist history: {}", e);
                false
            }
        }
    }

    pub fn read_all(&self) -> HistoryRead<T> {
        match self.load() {
            Some(records) if !records.is_empty() => HistoryRead::Records(records),
            _ => HistoryRead::NoData,
        }
    }

    /// Reset to an empty array. `false` when the slot never existed or the write failed.
    pub fn clear(&self) -> bool {
        if !self.medium.exists(&self.slot) {
            return false;
        }
        match self.medium.write(&self.slot, "[]") {
            Ok(()) => true,
            Err(e) => {
                warn!(slot = %self.slot, "Failed to clear history: {}", e);
                false
            }
        }
    }

    fn persist(&self, records: &[T]) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.medium.write(&self.slot, &json)
    }

    fn load(&self) -> Option<Vec<T>> {
        let contents = match self.medium.read(&self.slot) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                warn!(slot = %self.slot, "Failed to read history: {}", e);
                return None;
            }
        };
        if contents.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&contents) {
            Ok(records) => Some(records),
            Err(e) => {
                warn!(slot = %self.slot, "Discarding unparseable history: {}", e);
                None
            }
        }
    }
}

/// Human-readable rendering of the motion history, oldest first.
pub fn format_motion_history(read: &HistoryRead<MotionDetectionRecord>) -> String {
    match read {
        HistoryRead::NoData => NO_MOTION_HISTORY.to_string(),
        HistoryRead::Records(records) => {
            let mut out = String::new();
            for record in records {
                out.push_str(&format!(
                    "[{}]\nDetected motions: {}\n\n",
                    record.timestamp.format(HEADER_TIME_FORMAT),
                    format_labels(&record.labels)
                ));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::motion::MotionLabel;
    use crate::infrastructure::storage::InMemoryMedium;
    use chrono::{TimeZone, Utc};

    const SLOT: &str = "motion_detections.json";

    fn store(medium: &InMemoryMedium) -> BoundedHistoryStore<MotionDetectionRecord> {
        BoundedHistoryStore::new(Arc::new(medium.clone()), SLOT, 10)
    }

    fn record(second: u32) -> MotionDetectionRecord {
        MotionDetectionRecord::at(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, second).unwrap(),
            vec![MotionLabel::Walking],
        )
    }

    #[derive(Debug, serde::Deserialize)]
    struct Opaque;

    impl Serialize for Opaque {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("opaque record"))
        }
    }

    #[test]
    fn test_unserializable_record_is_not_written() {
        let medium = InMemoryMedium::new();
        let store = BoundedHistoryStore::<Opaque>::new(Arc::new(medium.clone()), SLOT, 10);

        assert!(matches!(
            store.persist(&[Opaque]),
            Err(StorageError::Serialization(reason)) if reason.contains("opaque record")
        ));
        assert!(!store.append(Opaque));
        assert!(!medium.exists(SLOT));
    }

    #[test]
    fn test_eleventh_append_evicts_first() {
        let medium = InMemoryMedium::new();
        let store = store(&medium);
        for i in 0..11 {
            assert!(store.append(record(i)));
        }

        let read = store.read_all();
        let records = read.records();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0], record(1));
        assert_eq!(records[9], record(10));
        assert!(!records.contains(&record(0)));
    }

    #[test]
    fn test_missing_and_empty_slots_read_as_no_data() {
        let medium = InMemoryMedium::new();
        let store = store(&medium);
        assert!(store.read_all().is_no_data());

        medium.insert_raw(SLOT, "");
        assert!(store.read_all().is_no_data());

        medium.insert_raw(SLOT, "[]");
        assert!(store.read_all().is_no_data());
    }

    #[test]
    fn test_corrupt_slot_is_overwritten_on_append() {
        let medium = InMemoryMedium::new();
        medium.insert_raw(SLOT, "{not json");
        let store = store(&medium);

        assert!(store.read_all().is_no_data());
        assert!(store.append(record(5)));
        assert_eq!(store.read_all().records(), &[record(5)]);
    }

    #[test]
    fn test_clear_requires_existing_slot() {
        let medium = InMemoryMedium::new();
        let store = store(&medium);
        assert!(!store.clear());

        store.append(record(1));
        assert!(store.clear());
        assert_eq!(medium.slots.lock().get(SLOT).map(String::as_str), Some("[]"));
        assert!(store.read_all().is_no_data());
    }

    struct ReadOnlyMedium;

    impl PersistenceMedium for ReadOnlyMedium {
        fn read(&self, _name: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn write(&self, _name: &str, _contents: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only".into()))
        }

        fn exists(&self, _name: &str) -> bool {
            true
        }
    }

    #[test]
    fn test_write_failure_degrades_to_false() {
        let store: BoundedHistoryStore<MotionDetectionRecord> =
            BoundedHistoryStore::new(Arc::new(ReadOnlyMedium), SLOT, 10);
        assert!(!store.append(record(1)));
        assert!(!store.clear());
    }

    #[test]
    fn test_motion_history_text() {
        assert_eq!(format_motion_history(&HistoryRead::NoData), NO_MOTION_HISTORY);

        let rendered = format_motion_history(&HistoryRead::Records(vec![MotionDetectionRecord::at(
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 5, 9).unwrap(),
            vec![MotionLabel::LimitedMotion, MotionLabel::EscalatorElevator],
        )]));
        assert_eq!(
            rendered,
            "[2026-03-01 08:05:09]\nDetected motions: limited motion, escalator/elevator\n\n"
        );
    }
}
