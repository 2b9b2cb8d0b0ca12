// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

// Pipeline Configuration Types
//
// Defines the configuration schema for a contextfuse device, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Storage locations for the bounded history and single-slot artifacts
// - Motion window and history capacity
// - On-device engine and remote backend selection (closed set of backends)
// - Fusion latch timeout
// - Sensor replay, wireless scanner and logging settings
//
// The phase graph itself is fixed and is not configurable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "contextfuse/v1";
pub const KIND: &str = "PipelineConfig";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfigManifest {
    /// API version (must be "contextfuse/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "PipelineConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: PipelineConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable device name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfigSpec {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub motion: MotionConfig,

    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub fusion: FusionConfig,

    #[serde(default)]
    pub on_device: OnDeviceConfig,

    #[serde(default = "default_remote_backend")]
    pub remote: BackendConfig,

    #[serde(default)]
    pub sensors: SensorConfig,

    #[serde(default)]
    pub wireless: WirelessConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding every slot. Default: platform data dir + "/contextfuse"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_motion_file")]
    pub motion_file: String,

    #[serde(default = "default_location_file")]
    pub location_file: String,

    #[serde(default = "default_fusion_file")]
    pub fusion_file: String,

    /// Prefix of the timestamped report artifact
    #[serde(default = "default_report_prefix")]
    pub report_prefix: String,
}

impl StorageConfig {
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .map(|d| d.join("contextfuse"))
            .unwrap_or_else(|| PathBuf::from("./.contextfuse"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Length of the MOTION sensor window
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// Capacity of the bounded motion history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationBackend {
    #[default]
    OnDevice,
    Remote,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Which backend interprets the scanned networks
    #[serde(default)]
    pub backend: LocationBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Upper bound on the wait for the nested motion-location pass
    #[serde(default = "default_latch_timeout")]
    pub latch_timeout_seconds: u64,

    /// Characters kept from the end of each context text in the fusion prompt
    #[serde(default = "default_prompt_tail")]
    pub prompt_tail_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnDeviceConfig {
    /// Model weights path handed to the engine on first use
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Token limit fixed at engine initialization
    #[serde(default = "default_on_device_max_tokens")]
    pub max_tokens: u32,

    /// Local runtime serving the engine
    #[serde(default = "default_engine_backend")]
    pub engine: BackendConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendType {
    Ollama,
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
    Anthropic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Chat,
    Generate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(rename = "type")]
    pub backend_type: BackendType,

    pub endpoint: String,

    /// API key (supports "env:VAR_NAME" for environment variables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub model: String,

    /// Ollama endpoint flavour; ignored by other backends
    #[serde(default)]
    pub mode: ChatMode,

    /// Bounded call timeout
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Recorded readings replayed as the sensor feed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    #[default]
    Nmcli,
    Static,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WirelessConfig {
    #[serde(default)]
    pub scanner: ScannerKind,

    /// Networks reported by the static scanner
    #[serde(default)]
    pub networks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_motion_file() -> String {
    "motion_detections.json".to_string()
}

fn default_location_file() -> String {
    "llm_responses.txt".to_string()
}

fn default_fusion_file() -> String {
    "fusion_result.txt".to_string()
}

fn default_report_prefix() -> String {
    "analysis_report".to_string()
}

fn default_window_seconds() -> u64 {
    10
}

fn default_history_capacity() -> usize {
    10
}

fn default_latch_timeout() -> u64 {
    180
}

fn default_prompt_tail() -> usize {
    200
}

fn default_model_path() -> String {
    "/data/local/tmp/llm/gemma2-2b-gpu.bin".to_string()
}

fn default_on_device_max_tokens() -> u32 {
    6000
}

fn default_backend_timeout() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_engine_backend() -> BackendConfig {
    BackendConfig {
        backend_type: BackendType::Ollama,
        endpoint: "http://localhost:11434".to_string(),
        api_key: None,
        model: "gemma2:2b".to_string(),
        mode: ChatMode::Generate,
        timeout_seconds: default_backend_timeout(),
        max_tokens: None,
        temperature: None,
    }
}

fn default_remote_backend() -> BackendConfig {
    BackendConfig {
        mode: ChatMode::Chat,
        ..default_engine_backend()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            motion_file: default_motion_file(),
            location_file: default_location_file(),
            fusion_file: default_fusion_file(),
            report_prefix: default_report_prefix(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            history_capacity: default_history_capacity(),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            latch_timeout_seconds: default_latch_timeout(),
            prompt_tail_chars: default_prompt_tail(),
        }
    }
}

impl Default for OnDeviceConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            max_tokens: default_on_device_max_tokens(),
            engine: default_engine_backend(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        default_remote_backend()
    }
}

impl Default for PipelineConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "contextfuse-device".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: PipelineConfigSpec {
                remote: default_remote_backend(),
                ..PipelineConfigSpec::default()
            },
        }
    }
}

impl PipelineConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CONTEXTFUSE_CONFIG_PATH environment variable
    /// 2. ./contextfuse-config.yaml (working directory)
    /// 3. ~/.contextfuse/config.yaml (user home)
    /// 4. /etc/contextfuse/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CONTEXTFUSE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./contextfuse-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".contextfuse").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/contextfuse/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("CONTEXTFUSE_DATA_DIR") {
            tracing::info!("Environment override: CONTEXTFUSE_DATA_DIR={}", dir);
            self.spec.storage.data_dir = Some(PathBuf::from(dir));
        }

        if let Ok(endpoint) = std::env::var("CONTEXTFUSE_REMOTE_ENDPOINT") {
            tracing::info!("Environment override: CONTEXTFUSE_REMOTE_ENDPOINT={}", endpoint);
            self.spec.remote.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("CONTEXTFUSE_REMOTE_MODEL") {
            tracing::info!("Environment override: CONTEXTFUSE_REMOTE_MODEL={}", model);
            self.spec.remote.model = model;
        }

        if let Ok(level) = std::env::var("CONTEXTFUSE_LOG_LEVEL") {
            let observability = self.spec.observability.get_or_insert(ObservabilityConfig {
                logging: None,
            });
            let logging = observability.logging.get_or_insert(LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            });
            logging.level = level;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let spec = &self.spec;
        if spec.motion.window_seconds == 0 {
            anyhow::bail!("spec.motion.window_seconds must be greater than zero");
        }
        if spec.motion.history_capacity == 0 {
            anyhow::bail!("spec.motion.history_capacity must be greater than zero");
        }
        if spec.fusion.latch_timeout_seconds == 0 {
            anyhow::bail!("spec.fusion.latch_timeout_seconds must be greater than zero");
        }
        if spec.fusion.prompt_tail_chars == 0 {
            anyhow::bail!("spec.fusion.prompt_tail_chars must be greater than zero");
        }
        if spec.on_device.model_path.is_empty() {
            anyhow::bail!("spec.on_device.model_path cannot be empty");
        }

        for (section, backend) in [("on_device.engine", &spec.on_device.engine), ("remote", &spec.remote)] {
            if backend.endpoint.is_empty() {
                anyhow::bail!("spec.{}.endpoint cannot be empty", section);
            }
            if backend.model.is_empty() {
                anyhow::bail!("spec.{}.model cannot be empty", section);
            }
            if backend.timeout_seconds == 0 {
                anyhow::bail!("spec.{}.timeout_seconds must be greater than zero", section);
            }
        }

        for name in [
            &spec.storage.motion_file,
            &spec.storage.location_file,
            &spec.storage.fusion_file,
        ] {
            crate::domain::storage::validate_slot_name(name)
                .map_err(|e| anyhow::anyhow!("spec.storage: {}", e))?;
        }

        if spec.wireless.scanner == ScannerKind::Static && spec.wireless.networks.is_empty() {
            tracing::warn!("Static wireless scanner configured without networks");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = PipelineConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert_eq!(manifest.spec.motion.window_seconds, 10);
        assert_eq!(manifest.spec.motion.history_capacity, 10);
        assert_eq!(manifest.spec.on_device.max_tokens, 6000);
        assert_eq!(manifest.spec.remote.mode, ChatMode::Chat);
        assert_eq!(manifest.spec.on_device.engine.mode, ChatMode::Generate);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_minimal_yaml_fills_defaults() {
        let yaml = r#"
apiVersion: contextfuse/v1
kind: PipelineConfig
metadata:
  name: pixel-lab
spec:
  location:
    backend: remote
  remote:
    type: openai
    endpoint: https://api.openai.com/v1
    api_key: env:OPENAI_API_KEY
    model: gpt-4o-mini
  wireless:
    scanner: static
    networks: ["Airport_Free_WiFi", "Gate-B12"]
"#;
        let manifest = PipelineConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.location.backend, LocationBackend::Remote);
        assert_eq!(manifest.spec.remote.backend_type, BackendType::OpenAI);
        assert_eq!(manifest.spec.remote.timeout_seconds, 300);
        assert_eq!(manifest.spec.fusion.prompt_tail_chars, 200);
        assert_eq!(manifest.spec.storage.motion_file, "motion_detections.json");
        assert_eq!(manifest.spec.wireless.networks.len(), 2);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut manifest = PipelineConfigManifest::default();
        manifest.spec.storage.data_dir = Some(PathBuf::from("/var/lib/contextfuse"));
        manifest.spec.remote.backend_type = BackendType::Anthropic;

        let yaml = serde_yaml::to_string(&manifest).unwrap();
        let parsed = PipelineConfigManifest::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.spec.remote.backend_type, BackendType::Anthropic);
        assert_eq!(
            parsed.spec.storage.resolve_data_dir(),
            PathBuf::from("/var/lib/contextfuse")
        );
    }

    #[test]
    fn test_validation() {
        let mut manifest = PipelineConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.motion.window_seconds = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.motion.window_seconds = 10;

        manifest.spec.remote.timeout_seconds = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.remote.timeout_seconds = 60;

        manifest.spec.storage.fusion_file = "../escape.txt".to_string();
        assert!(manifest.validate().is_err());
    }
}
