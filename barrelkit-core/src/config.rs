//! Configuration loaded from `barrelkit.toml`.
//!
//! Every recognized key has a default. Values of the wrong shape never abort
//! loading: they are replaced by the default and reported as
//! [`ConfigError`] warnings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::error::{ConfigError, Error, Result};
use crate::path_utils;
use crate::writer::RenderOptions;

pub const CONFIG_FILE_NAME: &str = "barrelkit.toml";

const DEFAULT_DIR: &str = "src";
const DEFAULT_EXTENSION: &str = "js";
const DEFAULT_DEBOUNCE_MS: u64 = 100;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directories to collect and watch.
    pub dir: Vec<PathBuf>,
    /// Paths matching this pattern are not watched.
    pub ignored: Option<Regex>,
    /// Source file extensions, without the dot.
    pub extensions: Vec<String>,
    /// Extension of the generated `index` file.
    pub index_extension: String,
    pub debounce_ms: u64,
    /// Use the polling watch backend instead of native notifications.
    pub poll: bool,
    pub poll_interval_ms: u64,
    pub keep_empty_default_slot: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: vec![PathBuf::from(DEFAULT_DIR)],
            ignored: None,
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            index_extension: DEFAULT_EXTENSION.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            keep_empty_default_slot: false,
        }
    }
}

/// A configuration together with the problems found while reading it.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: Config,
    pub warnings: Vec<ConfigError>,
}

/// Shape of the file before validation; every value is accepted as-is.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    dir: Option<toml::Value>,
    ignored: Option<toml::Value>,
    extensions: Option<toml::Value>,
    index_extension: Option<toml::Value>,
    debounce_ms: Option<toml::Value>,
    poll: Option<toml::Value>,
    poll_interval_ms: Option<toml::Value>,
    keep_empty_default_slot: Option<toml::Value>,
    #[serde(flatten)]
    unknown: toml::Table,
}

impl Config {
    /// Loads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<LoadedConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::from_toml_str(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LoadedConfig::default()),
            Err(e) => Err(Error::io_at(path, e)),
        }
    }

    pub fn from_toml_str(content: &str) -> LoadedConfig {
        let raw: RawConfig = match toml::from_str(content) {
            Ok(raw) => raw,
            Err(e) => {
                let warning = ConfigError::Syntax(e.message().to_string());
                warn!("{}", warning);
                return LoadedConfig {
                    config: Config::default(),
                    warnings: vec![warning],
                };
            }
        };
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> LoadedConfig {
        let mut config = Config::default();
        let mut warnings = Vec::new();

        if let Some(value) = raw.dir {
            match parse_dirs(&value) {
                Some(dirs) => config.dir = dirs,
                None => warnings.push(ConfigError::InvalidDir {
                    fallback: vec![DEFAULT_DIR.to_string()],
                }),
            }
        }

        if let Some(value) = raw.ignored {
            match value.as_str() {
                Some(pattern) => match Regex::new(pattern) {
                    Ok(regex) => config.ignored = Some(regex),
                    Err(e) => warnings.push(ConfigError::InvalidIgnored {
                        reason: e.to_string(),
                    }),
                },
                None => warnings.push(ConfigError::InvalidIgnored {
                    reason: format!("expected a string, found {}", value.type_str()),
                }),
            }
        }

        if let Some(value) = raw.extensions {
            match parse_extensions(&value) {
                Some(extensions) => config.extensions = extensions,
                None => warnings.push(invalid_value(
                    "extensions",
                    "expected a non-empty array of extensions",
                )),
            }
        }

        if let Some(value) = raw.index_extension {
            match value.as_str().map(normalize_extension) {
                Some(ext) if !ext.is_empty() => config.index_extension = ext,
                _ => warnings.push(invalid_value(
                    "index_extension",
                    "expected a non-empty string",
                )),
            }
        }

        if let Some(value) = raw.debounce_ms {
            match value.as_integer().and_then(|ms| u64::try_from(ms).ok()) {
                Some(ms) => config.debounce_ms = ms,
                None => warnings.push(invalid_value(
                    "debounce_ms",
                    "expected a non-negative integer",
                )),
            }
        }

        if let Some(value) = raw.poll {
            match value.as_bool() {
                Some(poll) => config.poll = poll,
                None => warnings.push(invalid_value("poll", "expected a boolean")),
            }
        }

        if let Some(value) = raw.poll_interval_ms {
            match value.as_integer().and_then(|ms| u64::try_from(ms).ok()) {
                Some(ms) if ms > 0 => config.poll_interval_ms = ms,
                _ => warnings.push(invalid_value(
                    "poll_interval_ms",
                    "expected a positive integer",
                )),
            }
        }

        if let Some(value) = raw.keep_empty_default_slot {
            match value.as_bool() {
                Some(keep) => config.keep_empty_default_slot = keep,
                None => warnings.push(invalid_value(
                    "keep_empty_default_slot",
                    "expected a boolean",
                )),
            }
        }

        let mut unknown: Vec<&String> = raw.unknown.keys().collect();
        unknown.sort();
        warnings.extend(unknown.into_iter().map(|k| ConfigError::UnknownKey(k.clone())));

        for warning in &warnings {
            warn!("{}", warning);
        }

        LoadedConfig { config, warnings }
    }

    /// Root directories made absolute.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.dir.iter().map(|d| path_utils::absolutize(d)).collect()
    }

    /// Whether `path` is a source file that feeds an aggregate.
    pub fn is_source(&self, path: &Path) -> bool {
        path_utils::has_extension(path, &self.extensions) && !path_utils::is_aggregate(path)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            keep_empty_default_slot: self.keep_empty_default_slot,
        }
    }
}

fn invalid_value(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Accepts `"src"`, `"src,lib"` or `["src", "lib"]`.
fn parse_dirs(value: &toml::Value) -> Option<Vec<PathBuf>> {
    let dirs: Vec<PathBuf> = match value {
        toml::Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .collect(),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::trim).filter(|d| !d.is_empty()))
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .map(PathBuf::from)
            .collect(),
        _ => return None,
    };
    (!dirs.is_empty()).then_some(dirs)
}

fn parse_extensions(value: &toml::Value) -> Option<Vec<String>> {
    let extensions = value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(normalize_extension).filter(|e| !e.is_empty()))
        .collect::<Option<Vec<_>>>()?;
    (!extensions.is_empty()).then_some(extensions)
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_string()
}
