// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Persistence Medium Trait - Anti-Corruption Layer for device storage
//!
//! A file-like byte store addressable by a stable name, supporting whole-content
//! read and write. Both the bounded history and the single-slot stores are built
//! on top of it; neither appends on disk, every write is a full rewrite.
//!
//! There is no concurrent-writer protocol: last writer wins.

use thiserror::Error;

pub trait PersistenceMedium: Send + Sync {
    /// Read the whole slot. `Ok(None)` when the slot does not exist.
    fn read(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Replace the whole slot.
    fn write(&self, name: &str, contents: &str) -> Result<(), StorageError>;

    fn exists(&self, name: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid slot name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Slot names must be a single path component.
pub fn validate_slot_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
