// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Wireless Scanner
//!
//! Collaborator interface for nearby access point discovery.

use async_trait::async_trait;

/// Scans for nearby wireless networks.
///
/// Implementations return an empty list on permission denial or scan
/// failure instead of an error.
#[async_trait]
pub trait WirelessScanner: Send + Sync {
    async fn scan(&self) -> Vec<String>;
}

/// Drop empty SSIDs and duplicates, keeping first-seen order.
pub fn normalize_ssids<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = Vec::<String>::new();
    for ssid in raw {
        let ssid = ssid.as_ref().trim();
        if ssid.is_empty() || seen.iter().any(|s| s == ssid) {
            continue;
        }
        seen.push(ssid.to_string());
    }
    seen
}
