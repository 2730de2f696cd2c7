//! Shared path utilities for source and aggregate files.

use std::path::{Path, PathBuf};

/// Stem shared by every aggregate file, whatever its extension.
pub const AGGREGATE_STEM: &str = "index";

/// Returns the file name without its extension.
pub fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Whether `path` names an aggregate (`index.*`) file.
///
/// Aggregates are generated output and never feed back into regeneration.
pub fn is_aggregate(path: &Path) -> bool {
    file_stem(path).as_deref() == Some(AGGREGATE_STEM)
}

/// Whether the extension of `path` is one of `extensions` (without the dot).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed == ext))
}

/// Path of the aggregate file for `dir`.
pub fn aggregate_path(dir: &Path, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", AGGREGATE_STEM, extension))
}

/// Directory that owns `file_path`'s cache entry.
pub fn owning_dir(file_path: &Path) -> PathBuf {
    file_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Makes `path` absolute against the current working directory.
///
/// The path does not have to exist, so this never touches the filesystem
/// beyond reading the working directory.
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
