//! StoreConfig - ModelStore の設定
//!
//! ```toml
//! models_dir = "./models"
//! max_models_to_keep = 2
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::domain::MAX_MODELS_TO_KEEP;

/// 既定の保存先（backend 上の論理ディレクトリ）
pub const DEFAULT_MODELS_DIR: &str = "./models";

/// ConfigError は設定の読み込み・検証エラー
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub models_dir: String,
    pub max_models_to_keep: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            models_dir: DEFAULT_MODELS_DIR.to_string(),
            max_models_to_keep: MAX_MODELS_TO_KEEP,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("models_dir must not be empty".into()));
        }
        if self.max_models_to_keep == 0 {
            return Err(ConfigError::Invalid(
                "max_models_to_keep must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
