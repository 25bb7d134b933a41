//! Process configuration.
//!
//! Precedence (highest first): environment variables, TOML file, defaults.
//! The modulus has no default; a process without one refuses to start.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuditError, Result};
use crate::params::ModulusParams;

pub const ENV_MODULUS: &str = "PDP_MODULUS_HEX";
pub const ENV_GENERATOR: &str = "PDP_GENERATOR_HEX";
pub const ENV_SAMPLE_SIZE: &str = "PDP_SAMPLE_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Hex-encoded composite modulus `N`.
    #[serde(default)]
    pub modulus_hex: Option<String>,
    /// Hex-encoded generator `g`.
    #[serde(default = "AuditConfig::default_generator")]
    pub generator_hex: String,
    /// Blocks challenged per audit round.
    #[serde(default = "AuditConfig::default_sample_size")]
    pub sample_size: usize,
}

impl AuditConfig {
    /// Configuration from environment variables only.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| AuditError::InvalidParameter {
            key: "config_file".to_string(),
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| AuditError::InvalidParameter {
            key: "config_file".to_string(),
            reason: format!("failed to parse TOML: {e}"),
        })
    }

    /// Defaults, then `path` if it exists, then the environment.
    pub fn load_layered(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            debug!(path = %path.display(), "loading configuration file");
            Self::from_toml_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var(ENV_MODULUS) {
            self.modulus_hex = Some(val);
        }
        if let Ok(val) = std::env::var(ENV_GENERATOR) {
            self.generator_hex = val;
        }
        if let Ok(val) = std::env::var(ENV_SAMPLE_SIZE) {
            self.sample_size = val.trim().parse().map_err(|e| AuditError::InvalidParameter {
                key: ENV_SAMPLE_SIZE.to_string(),
                reason: format!("{val:?}: {e}"),
            })?;
        }
        Ok(())
    }

    /// Validate and build the public parameters.
    pub fn params(&self) -> Result<ModulusParams> {
        let modulus = self.modulus_hex.as_deref().ok_or_else(|| {
            AuditError::InvalidModulus(format!(
                "no modulus configured (set modulus_hex or {ENV_MODULUS})"
            ))
        })?;
        ModulusParams::from_hex(modulus, &self.generator_hex)
    }

    fn default_generator() -> String {
        "05".to_string()
    }

    fn default_sample_size() -> usize {
        460
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            modulus_hex: None,
            generator_hex: Self::default_generator(),
            sample_size: Self::default_sample_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::params::testing::MODULUS_512;

    #[test]
    fn missing_modulus_is_fatal() {
        let err = AuditConfig::default().params().unwrap_err();
        assert!(err.is_startup_fatal());
    }

    #[test]
    fn toml_fills_defaults() {
        let config = AuditConfig::from_toml_str(&format!("modulus_hex = \"{MODULUS_512}\"\n")).unwrap();
        assert_eq!(config.generator_hex, "05");
        assert_eq!(config.sample_size, 460);
        assert!(config.params().is_ok());
    }

    #[test]
    fn reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "modulus_hex = \"{MODULUS_512}\"").unwrap();
        writeln!(file, "generator_hex = \"07\"").unwrap();
        writeln!(file, "sample_size = 12").unwrap();

        let config = AuditConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.sample_size, 12);
        assert_eq!(config.params().unwrap().generator(), &num_bigint::BigUint::from(7u32));
    }

    #[test]
    fn rejects_garbage_toml() {
        assert!(AuditConfig::from_toml_str("sample_size = \"many\"").is_err());
        assert!(AuditConfig::from_toml_file("/nonexistent/pdp.toml").is_err());
    }
}
