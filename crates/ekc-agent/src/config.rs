use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ekc_core::handlers::KeyAgreementStrategy;
use ekc_core::protocol::{UnknownCommandPolicy, KEY_AGREEMENT_TAG, SCALAR_LEN};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),
    #[error("config parse error: {0}")]
    ParseError(String),
    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Address the command listener binds to
    pub listen_addr: String,
    /// Directory holding the persisted key records
    pub keystore_dir: PathBuf,

    // Service loop settings
    pub read_timeout_ms: u64,
    pub max_frame_len: usize,

    // Protocol policy settings
    pub unknown_command: String, // "sign" or "reject"
    pub key_agreement: String,   // "derived" or "raw-seed"

    // Logging
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:4511".to_string(),
            keystore_dir: PathBuf::from("/var/lib/ekc/keys"),
            read_timeout_ms: 500,
            max_frame_len: 1024,
            unknown_command: "sign".to_string(),
            key_agreement: "derived".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AgentConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(e.to_string()))?;

        let config: AgentConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn load_from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("EKC_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(dir) = std::env::var("EKC_KEYSTORE_DIR") {
            config.keystore_dir = PathBuf::from(dir);
        }
        if let Ok(policy) = std::env::var("EKC_UNKNOWN_COMMAND") {
            config.unknown_command = policy;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = level;
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "read_timeout_ms must be at least 1".to_string(),
            ));
        }
        // The smallest complete command is the key-agreement tag plus its scalar.
        let min_frame = KEY_AGREEMENT_TAG.len() + SCALAR_LEN;
        if self.max_frame_len < min_frame {
            return Err(ConfigError::ValidationError(format!(
                "max_frame_len must be at least {min_frame}"
            )));
        }
        if !matches!(self.unknown_command.as_str(), "sign" | "reject") {
            return Err(ConfigError::ValidationError(
                "unknown_command must be \"sign\" or \"reject\"".to_string(),
            ));
        }
        if !matches!(self.key_agreement.as_str(), "derived" | "raw-seed") {
            return Err(ConfigError::ValidationError(
                "key_agreement must be \"derived\" or \"raw-seed\"".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured unknown-command policy. `validate` must have passed.
    pub fn unknown_command_policy(&self) -> UnknownCommandPolicy {
        match self.unknown_command.as_str() {
            "reject" => UnknownCommandPolicy::Reject,
            _ => UnknownCommandPolicy::SignFallback,
        }
    }

    /// The configured key-agreement strategy. `validate` must have passed.
    pub fn key_agreement_strategy(&self) -> KeyAgreementStrategy {
        match self.key_agreement.as_str() {
            "raw-seed" => KeyAgreementStrategy::RawSeed,
            _ => KeyAgreementStrategy::DerivedScalar,
        }
    }
}
