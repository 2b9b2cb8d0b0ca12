// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Wireless scanner implementations.
//!
//! Every scanner degrades to an empty list on failure; the location phase
//! treats "nothing visible" and "cannot scan" the same way.

pub mod nmcli;

pub use nmcli::NmcliScanner;

use async_trait::async_trait;

use crate::domain::wireless::{normalize_ssids, WirelessScanner};

/// Reports a fixed list of networks.
#[derive(Debug, Clone, Default)]
pub struct StaticScanner {
    networks: Vec<String>,
}

impl StaticScanner {
    pub fn new(networks: Vec<String>) -> Self {
        Self { networks }
    }
}

#[async_trait]
impl WirelessScanner for StaticScanner {
    async fn scan(&self) -> Vec<String> {
        normalize_ssids(&self.networks)
    }
}
