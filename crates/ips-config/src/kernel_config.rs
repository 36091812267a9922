//! Kernel configuration
//!
//! Everything has a default, so an empty YAML document yields the stock setup:
//!
//! ```yaml
//! identity_pool:
//!   first: 10000
//!   last: 59999
//!   seed: 42        # optional, makes identity assignment reproducible
//! kernel:
//!   version: "5.2"
//!   platform: Stubs
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Top-level kernel configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub identity_pool: IdentityPoolConfig,
    pub kernel: KernelInfo,
}

/// Range and shuffling of object identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityPoolConfig {
    /// First identity handed out (inclusive)
    pub first: u32,
    /// Last identity handed out (inclusive)
    pub last: u32,
    /// Seed for the pool shuffle; entropy when absent
    pub seed: Option<u64>,
}

impl Default for IdentityPoolConfig {
    fn default() -> Self {
        Self {
            first: 10000,
            last: 59999,
            seed: None,
        }
    }
}

/// Static information reported by the kernel info accessors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelInfo {
    pub version: String,
    pub revision: String,
    /// Build date as unix timestamp
    pub date: i64,
    pub platform: String,
    pub system_language: String,
    pub kernel_dir: PathBuf,
    pub log_dir: PathBuf,
    pub licensee: String,
    pub limit_demo: i64,
    pub limit_server: String,
    pub limit_variables: i64,
    pub limit_webfront: i64,
}

impl Default for KernelInfo {
    fn default() -> Self {
        let kernel_dir = std::env::temp_dir();
        Self {
            version: "5.2".to_string(),
            revision: "0".to_string(),
            date: 0,
            platform: "Stubs".to_string(),
            system_language: "de_DE".to_string(),
            log_dir: kernel_dir.join("logs"),
            kernel_dir,
            licensee: "max@mustermann.de".to_string(),
            limit_demo: 0,
            limit_server: String::new(),
            limit_variables: 0,
            limit_webfront: 0,
        }
    }
}

impl KernelConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: KernelConfig = if yaml.trim().is_empty() {
            KernelConfig::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::ParseYaml { source })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        let pool = &self.identity_pool;
        if pool.first == 0 {
            return Err(ConfigError::InvalidValue {
                key: "identity_pool.first".to_string(),
                reason: "identity 0 is reserved for the root object".to_string(),
            });
        }
        if pool.first > pool.last {
            return Err(ConfigError::InvalidValue {
                key: "identity_pool.last".to_string(),
                reason: format!("{} is below first identity {}", pool.last, pool.first),
            });
        }
        Ok(())
    }
}
