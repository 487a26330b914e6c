use std::path::PathBuf;

use thiserror::Error;

/// The term configuration could not be loaded. Fatal to a matching run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read term configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed term configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid term configuration: {0}")]
    Validation(String),
}
