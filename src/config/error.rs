//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors. Always fatal: a build aborts before Discover.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file parsing error in `{}`", .0.display())]
    Toml(PathBuf, #[source] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),

    #[error("content directory `{}` does not exist", .0.display())]
    MissingContent(PathBuf),
}
