//! Discovery of source files under the configured roots.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::path_utils;

/// The source files of one directory, sorted by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDirectory {
    pub dir: PathBuf,
    /// Empty when the directory only holds an aggregate.
    pub files: Vec<PathBuf>,
    /// An aggregate with the configured extension already exists.
    pub has_aggregate: bool,
}

#[derive(Default)]
struct Group {
    files: Vec<PathBuf>,
    has_aggregate: bool,
}

/// Walks every root recursively and groups source files by directory.
///
/// Aggregates, files with other extensions, and paths matching the
/// `ignored` pattern are skipped. Missing roots are reported and skipped.
pub struct Scanner<'a> {
    config: &'a Config,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn scan(&self) -> Vec<SourceDirectory> {
        let mut grouped: IndexMap<PathBuf, Group> = IndexMap::new();

        for root in self.config.roots() {
            if !root.is_dir() {
                warn!("Skipping {}: not a directory", root.display());
                continue;
            }

            let walker = WalkDir::new(&root)
                .follow_links(false)
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !self.is_ignored(entry.path()));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        debug!("Skipping unreadable entry: {}", e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.into_path();
                if self.config.is_source(&path) {
                    grouped
                        .entry(path_utils::owning_dir(&path))
                        .or_default()
                        .files
                        .push(path);
                } else if self.is_aggregate(&path) {
                    grouped
                        .entry(path_utils::owning_dir(&path))
                        .or_default()
                        .has_aggregate = true;
                }
            }
        }

        let mut dirs: Vec<SourceDirectory> = grouped
            .into_iter()
            .map(|(dir, group)| {
                let mut files = group.files;
                files.sort();
                // Overlapping roots visit the same file twice.
                files.dedup();
                SourceDirectory {
                    dir,
                    files,
                    has_aggregate: group.has_aggregate,
                }
            })
            .collect();
        dirs.sort_by(|a, b| a.dir.cmp(&b.dir));
        dirs
    }

    fn is_aggregate(&self, path: &Path) -> bool {
        path_utils::is_aggregate(path)
            && path_utils::has_extension(path, std::slice::from_ref(&self.config.index_extension))
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.config
            .ignored
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(&path.to_string_lossy()))
    }
}
