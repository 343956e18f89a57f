use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("configuration not initialized")]
    NotInitialized,

    #[error("configuration invalid: {reason}")]
    Invalid { reason: String },

    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    JsonParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    TomlParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config file '{0}' must contain a table at the top level")]
    NotATable(PathBuf),

    #[error("config value '{key}' has an unexpected type: {source}")]
    TypeMismatch {
        key: String,
        source: serde_json::Error,
    },
}
