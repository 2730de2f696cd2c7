//! Command implementations for the CLI.

mod check;
mod collect;
mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use barrelkit_core::{CollectSummary, Config, ConfigError, CONFIG_FILE_NAME};
use regex::Regex;
use tracing::warn;

use crate::formatting::{print_error, print_success, print_summary_box, print_warning};

pub use check::cmd_check;
pub use collect::cmd_collect;
pub use watch::cmd_watch;

/// Settings given on the command line, applied over the configuration file.
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub dirs: Vec<PathBuf>,
    pub ignored: Option<String>,
}

fn load_config(overrides: &ConfigOverrides, report: bool) -> Result<Config> {
    let path = overrides
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    let loaded = Config::load(&path)
        .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
    if report {
        for warning in &loaded.warnings {
            print_warning(&warning.to_string());
        }
    }

    let mut config = loaded.config;
    for warning in apply_overrides(&mut config, overrides) {
        if report {
            print_warning(&warning.to_string());
        } else {
            warn!("{}", warning);
        }
    }

    Ok(config)
}

/// Applies command-line settings over `config`. A bad `--ignored` pattern
/// is reported and the configured pattern is kept.
fn apply_overrides(config: &mut Config, overrides: &ConfigOverrides) -> Vec<ConfigError> {
    let mut warnings = Vec::new();
    if !overrides.dirs.is_empty() {
        config.dir = overrides.dirs.clone();
    }
    if let Some(pattern) = &overrides.ignored {
        match Regex::new(pattern) {
            Ok(regex) => config.ignored = Some(regex),
            Err(e) => warnings.push(ConfigError::InvalidIgnored {
                reason: e.to_string(),
            }),
        }
    }
    warnings
}

fn print_collect_summary(summary: &CollectSummary, elapsed_secs: f64) {
    for written in &summary.written {
        print_success(&format!(
            "{} ({} statements)",
            written.path.display(),
            written.statements
        ));
    }
    for failure in &summary.failures {
        print_error(&failure.message);
    }
    if summary.written.is_empty() && summary.failures.is_empty() {
        print_warning("No exporting files found");
    }
    println!();

    print_summary_box(
        "Collect Summary",
        &[
            ("Files", &summary.files_scanned.to_string()),
            ("Directories", &summary.directories.to_string()),
            ("Written", &summary.written.len().to_string()),
            ("Failures", &summary.failures.len().to_string()),
            ("Time", &crate::formatting::format_duration(elapsed_secs)),
        ],
    );
    println!();
}
