// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Memory probe backed by procfs.
//!
//! heap used = VmData, heap max = VmPeak, native heap = RssAnon, RSS = VmRSS
//! (all from `/proc/self/status`), PSS from `/proc/self/smaps_rollup`.
//! Missing files or fields read as zero.

use std::path::PathBuf;

use crate::domain::telemetry::{MemoryProbe, MemorySnapshot};

pub struct ProcMemoryProbe {
    proc_dir: PathBuf,
}

impl ProcMemoryProbe {
    pub fn new() -> Self {
        Self::with_proc_dir("/proc/self")
    }

    pub fn with_proc_dir(proc_dir: impl Into<PathBuf>) -> Self {
        Self {
            proc_dir: proc_dir.into(),
        }
    }

    fn read(&self, file: &str) -> String {
        std::fs::read_to_string(self.proc_dir.join(file)).unwrap_or_default()
    }
}

impl Default for ProcMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcMemoryProbe {
    fn snapshot(&self) -> MemorySnapshot {
        let status = self.read("status");
        let rollup = self.read("smaps_rollup");
        MemorySnapshot {
            heap_used_mb: kb_field(&status, "VmData") / 1024,
            heap_max_mb: kb_field(&status, "VmPeak") / 1024,
            native_heap_mb: kb_field(&status, "RssAnon") / 1024,
            pss_mb: kb_field(&rollup, "Pss") / 1024,
            rss_mb: kb_field(&status, "VmRSS") / 1024,
        }
    }
}

/// Value of a `Key:   123 kB` line, in kB.
fn kb_field(contents: &str, key: &str) -> i64 {
    contents
        .lines()
        .find_map(|line| {
            let (name, rest) = line.split_once(':')?;
            if name.trim() != key {
                return None;
            }
            rest.split_whitespace().next()?.parse::<i64>().ok()
        })
        .unwrap_or(0)
}
