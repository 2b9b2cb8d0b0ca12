// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Local Filesystem Persistence Medium
//!
//! One file per slot under a base directory. Writes go to a sibling temp file
//! that is renamed over the slot, so a reader never observes half a rewrite.
//!
//! **Limitations:**
//! - No locking between processes (last writer wins)
//! - Slot names are flat; no subdirectories

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::storage::{validate_slot_name, PersistenceMedium, StorageError};

pub struct LocalFileMedium {
    /// Directory holding every slot (e.g., "~/.local/share/contextfuse")
    base_path: PathBuf,
}

impl LocalFileMedium {
    /// Create the medium, creating and probing the base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::IoError(format!(
                "Failed to create base directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let probe = base_path.join(".contextfuse-write-test");
        std::fs::write(&probe, b"probe").map_err(|e| {
            StorageError::Unavailable(format!(
                "Base directory {} is not writable: {}",
                base_path.display(),
                e
            ))
        })?;
        std::fs::remove_file(&probe)
            .map_err(|e| StorageError::IoError(format!("Failed to cleanup probe file: {}", e)))?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_slot_name(name)?;
        Ok(self.base_path.join(name))
    }
}

impl PersistenceMedium for LocalFileMedium {
    fn read(&self, name: &str) -> Result<Option<String>, StorageError> {
        let path = self.resolve(name)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write(&self, name: &str, contents: &str) -> Result<(), StorageError> {
        let path = self.resolve(name)?;
        let tmp = self.base_path.join(format!(".{}.tmp", name));

        std::fs::write(&tmp, contents).map_err(|e| {
            StorageError::IoError(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            StorageError::IoError(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        tracing::debug!(slot = name, bytes = contents.len(), "Slot rewritten");
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }
}
