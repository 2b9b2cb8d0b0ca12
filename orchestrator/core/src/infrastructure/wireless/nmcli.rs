// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! NetworkManager scanner (`nmcli -t -f SSID dev wifi list`).

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::wireless::{normalize_ssids, WirelessScanner};

pub struct NmcliScanner {
    program: String,
    timeout: Duration,
}

impl NmcliScanner {
    pub fn new() -> Self {
        Self {
            program: "nmcli".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for NmcliScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WirelessScanner for NmcliScanner {
    async fn scan(&self) -> Vec<String> {
        let output = Command::new(&self.program)
            .args(["-t", "-f", "SSID", "dev", "wifi", "list"])
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("Wireless scan failed to start: {}", e);
                return Vec::new();
            }
            Err(_) => {
                warn!("Wireless scan timed out after {:?}", self.timeout);
                return Vec::new();
            }
        };

        if !output.status.success() {
            warn!(
                "Wireless scan exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Vec::new();
        }

        let ssids = parse_terse(&String::from_utf8_lossy(&output.stdout));
        debug!(count = ssids.len(), "Wireless scan complete");
        ssids
    }
}

/// Parse terse output, one SSID per line with `\:` and `\\` escapes.
fn parse_terse(stdout: &str) -> Vec<String> {
    normalize_ssids(stdout.lines().map(|line| {
        let mut ssid = String::with_capacity(line.len());
        let mut chars = line.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    ssid.push(next);
                }
            } else {
                ssid.push(c);
            }
        }
        ssid
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_terse_output() {
        let stdout = "HomeNet\n\nCafe\\: Guest\nHomeNet\n--\n";
        assert_eq!(
            parse_terse(stdout),
            vec!["HomeNet".to_string(), "Cafe: Guest".to_string(), "--".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_yields_empty_list() {
        let scanner =
            NmcliScanner::with_program("/nonexistent/contextfuse-nmcli", Duration::from_secs(1));
        assert!(scanner.scan().await.is_empty());
    }
}
