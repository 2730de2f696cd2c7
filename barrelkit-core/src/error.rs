//! Error types and result aliases.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A source file that could not be read as module syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.path.display(),
            self.line,
            self.column,
            self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// A configuration value that was rejected and replaced by its default.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("'dir' must be a string or an array of strings, using {fallback:?}")]
    InvalidDir { fallback: Vec<String> },

    #[error("'ignored' must be a valid regular expression ({reason}), ignoring it")]
    InvalidIgnored { reason: String },

    #[error("'{key}' has an invalid value ({reason}), using the default")]
    InvalidValue { key: String, reason: String },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Configuration is not valid TOML ({0}), using defaults")]
    Syntax(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error at {path}: {source}")]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "Export collision in {dir}: '{name}' from {file} is already taken even after prefixing with the file name"
    )]
    CollisionOverflow {
        dir: PathBuf,
        file: PathBuf,
        name: String,
    },

    #[error("Watcher error: {0}")]
    Watcher(String),
}

impl Error {
    pub(crate) fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoAt {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
