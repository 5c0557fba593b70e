use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Smallest number of inputs a stack filter accepts
pub const MIN_INPUTS: usize = 2;

/// Largest number of inputs a stack filter accepts
pub const MAX_INPUTS: usize = 64;

/// Options of the stack filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Number of input ports
    pub inputs: usize,

    /// End the output as soon as any input ends
    pub shortest: bool,

    /// Upper bound on a single accelerator job (milliseconds)
    pub hw_timeout_ms: u64,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            inputs: MIN_INPUTS,
            shortest: false,
            hw_timeout_ms: 1000,
        }
    }
}

impl StackConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: StackConfig = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(MIN_INPUTS..=MAX_INPUTS).contains(&self.inputs) {
            return Err(ConfigError::InvalidValue {
                key: "inputs".to_string(),
                value: self.inputs.to_string(),
            }
            .into());
        }

        if self.hw_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "hw_timeout_ms".to_string(),
                value: self.hw_timeout_ms.to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Accelerator wait bound as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.hw_timeout_ms)
    }
}
