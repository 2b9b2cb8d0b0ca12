// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Storage Infrastructure Module
//!
//! Concrete implementations of the `PersistenceMedium` trait.

pub mod local;

pub use local::LocalFileMedium;

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::storage::{PersistenceMedium, StorageError};

/// Storage backend configuration
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// Files under a base directory
    Local { base_path: PathBuf },

    /// Process-local map for tests and dry runs
    Memory,
}

/// Factory function to create a persistence medium from configuration
pub fn create_medium(backend: StorageBackend) -> Result<Arc<dyn PersistenceMedium>, StorageError> {
    match backend {
        StorageBackend::Local { base_path } => Ok(Arc::new(LocalFileMedium::new(base_path)?)),
        StorageBackend::Memory => Ok(Arc::new(InMemoryMedium::new())),
    }
}

pub use memory::InMemoryMedium;

mod memory {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Map-backed medium. Clones share the same slots.
    #[derive(Clone, Default)]
    pub struct InMemoryMedium {
        pub slots: Arc<Mutex<HashMap<String, String>>>,
    }

    impl InMemoryMedium {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a slot directly, bypassing name validation.
        pub fn insert_raw(&self, name: &str, contents: &str) {
            self.slots.lock().insert(name.to_string(), contents.to_string());
        }
    }

    impl PersistenceMedium for InMemoryMedium {
        fn read(&self, name: &str) -> Result<Option<String>, StorageError> {
            crate::domain::storage::validate_slot_name(name)?;
            Ok(self.slots.lock().get(name).cloned())
        }

        fn write(&self, name: &str, contents: &str) -> Result<(), StorageError> {
            crate::domain::storage::validate_slot_name(name)?;
            self.slots.lock().insert(name.to_string(), contents.to_string());
            Ok(())
        }

        fn exists(&self, name: &str) -> bool {
            self.slots.lock().contains_key(name)
        }
    }
}
