use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use super::validate::ValidationError;
use super::warning::Warning;

/// A file-backed loading stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Toml,
    DotEnv,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Toml => f.write_str("toml"),
            Stage::DotEnv => f.write_str("dotenv"),
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{0} file is required but no path was configured")]
    RequiredPathEmpty(Stage),

    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),

    #[error("failed to snapshot config before merging: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("command-line option '{0}' requires a value")]
    MissingArgValue(String),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("rejected in strict mode: {0}")]
    Rejected(Warning),
}
