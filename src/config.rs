use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "ecg-interpret";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming an interpreter config file.
pub const CONFIG_ENV_VAR: &str = "ECG_INTERPRET_CONFIG";

/// Per-user config file, consulted when `ECG_INTERPRET_CONFIG` is unset.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.json"))
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "ecg_interpret=info,warn"
}

/// How much advisory material the report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Definitive findings only.
    #[default]
    Standard,
    /// Also low-confidence advisories such as possible LVH under an LBBB.
    Detailed,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file load failed ({0}): {1}")]
    Load(String, String),

    #[error("Config file parse failed ({0}): {1}")]
    Parse(String, String),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Tunables of the interpretation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    pub verbosity: Verbosity,
    /// How far apart (bpm) the rate methods may land and still agree.
    pub rate_agreement_tolerance_bpm: f64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Standard,
            rate_agreement_tolerance_bpm: 10.0,
        }
    }
}

impl InterpreterConfig {
    /// Load a config from a JSON file. Absent keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(path.display().to_string(), e.to_string()))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))?;
        config.validated()
    }

    /// Load from the file named by `ECG_INTERPRET_CONFIG`, else the per-user
    /// config file when one exists, else defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            tracing::debug!(path = %path, "Loading interpreter config");
            return Self::load(Path::new(&path));
        }
        match user_config_path().filter(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading user interpreter config");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if !self.rate_agreement_tolerance_bpm.is_finite() || self.rate_agreement_tolerance_bpm < 0.0
        {
            return Err(ConfigError::Invalid {
                field: "rate_agreement_tolerance_bpm".into(),
                reason: format!("must be non-negative, got {}", self.rate_agreement_tolerance_bpm),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn app_name_is_ecg_interpret() {
        assert_eq!(APP_NAME, "ecg-interpret");
    }

    #[test]
    fn user_config_lives_under_app_dir() {
        if let Some(path) = user_config_path() {
            assert!(path.ends_with("ecg-interpret/config.json"));
        }
    }

    #[test]
    fn defaults() {
        let config = InterpreterConfig::default();
        assert_eq!(config.verbosity, Verbosity::Standard);
        assert!((config.rate_agreement_tolerance_bpm - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"verbosity": "detailed"}}"#).unwrap();
        let config = InterpreterConfig::load(file.path()).unwrap();
        assert_eq!(config.verbosity, Verbosity::Detailed);
        assert!((config.rate_agreement_tolerance_bpm - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = InterpreterConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Load(..)));
    }

    #[test]
    fn load_malformed_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = InterpreterConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
    }

    #[test]
    fn negative_tolerance_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"rate_agreement_tolerance_bpm": -1}}"#).unwrap();
        let err = InterpreterConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn verbosity_serializes() {
        let json = serde_json::to_string(&Verbosity::Detailed).unwrap();
        assert_eq!(json, "\"detailed\"");
    }
}
