//! Reacting to file events and keeping aggregates current.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{DirectoryCache, ExportRecord};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extractor::{self, ExportSet};
use crate::path_utils;
use crate::resolver;
use crate::scanner::Scanner;
use crate::watcher::{FileEvent, FileEventKind};
use crate::writer::{self, AggregateSink, FsSink};

/// Where a directory is in its update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirState {
    #[default]
    Idle,
    Recomputing,
    Writing,
}

/// What handling one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a source file, or the orchestrator is closed.
    Ignored,
    /// The directory's exports are the same as before; nothing was written.
    Unchanged { dir: PathBuf },
    Written(WrittenAggregate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenAggregate {
    pub path: PathBuf,
    /// Number of re-export lines, one per exporting file.
    pub statements: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Parse,
    Io,
    Collision,
}

/// A file or directory that `collect` could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectFailure {
    pub kind: FailureKind,
    pub path: PathBuf,
    pub message: String,
}

impl CollectFailure {
    fn from_error(path: &Path, error: &Error) -> Self {
        let kind = match error {
            Error::Parse(_) => FailureKind::Parse,
            Error::CollisionOverflow { .. } => FailureKind::Collision,
            _ => FailureKind::Io,
        };
        Self {
            kind,
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectSummary {
    pub files_scanned: usize,
    pub directories: usize,
    pub written: Vec<WrittenAggregate>,
    pub failures: Vec<CollectFailure>,
}

impl CollectSummary {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    pub events: u64,
    pub ignored: u64,
    pub unchanged: u64,
    pub writes: u64,
    pub errors: u64,
}

/// Owns the directory cache and drives extraction, resolution and writing.
///
/// Events are handled one at a time, each to completion.
pub struct Orchestrator<S: AggregateSink = FsSink> {
    config: Config,
    cache: DirectoryCache,
    states: FxHashMap<PathBuf, DirState>,
    /// Directories whose aggregate on disk may not match the cache.
    stale: FxHashSet<PathBuf>,
    sink: S,
    stats: OrchestratorStats,
    closed: bool,
}

impl Orchestrator<FsSink> {
    pub fn new(config: Config) -> Self {
        Self::with_sink(config, FsSink)
    }
}

impl<S: AggregateSink> Orchestrator<S> {
    pub fn with_sink(config: Config, sink: S) -> Self {
        Self {
            config,
            cache: DirectoryCache::new(),
            states: FxHashMap::default(),
            stale: FxHashSet::default(),
            sink,
            stats: OrchestratorStats::default(),
            closed: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &DirectoryCache {
        &self.cache
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn stats(&self) -> OrchestratorStats {
        self.stats
    }

    pub fn state(&self, dir: &Path) -> DirState {
        self.states.get(dir).copied().unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Applies one file event.
    ///
    /// A parse failure leaves both the cache and the aggregate untouched.
    pub fn handle_event(&mut self, event: &FileEvent) -> Result<Outcome> {
        self.stats.events += 1;
        let path = path_utils::absolutize(&event.path);

        if self.closed || !self.config.is_source(&path) {
            self.stats.ignored += 1;
            return Ok(Outcome::Ignored);
        }

        let dir = path_utils::owning_dir(&path);
        debug!("{:?} {}", event.kind, path.display());

        let result = self.apply(&dir, &path, event.kind);
        self.set_state(&dir, DirState::Idle);

        match &result {
            Ok(Outcome::Unchanged { .. }) => self.stats.unchanged += 1,
            Ok(_) => {}
            Err(_) => self.stats.errors += 1,
        }
        result
    }

    fn apply(&mut self, dir: &Path, path: &Path, kind: FileEventKind) -> Result<Outcome> {
        self.set_state(dir, DirState::Recomputing);
        let before = self.cache.snapshot(dir);

        match kind {
            FileEventKind::Unlink => {
                self.cache.remove(dir, path);
            }
            FileEventKind::Add | FileEventKind::Change => match extractor::extract(path) {
                Ok(exports) => self.store(dir, path, exports),
                // Deleted before the debounced event was handled.
                Err(Error::IoAt { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    self.cache.remove(dir, path);
                }
                Err(e) => return Err(e),
            },
        }

        if self.cache.snapshot(dir) == before && !self.stale.contains(dir) {
            debug!("Exports of {} unchanged", dir.display());
            return Ok(Outcome::Unchanged {
                dir: dir.to_path_buf(),
            });
        }

        self.write_dir(dir).map(Outcome::Written)
    }

    fn store(&mut self, dir: &Path, path: &Path, exports: ExportSet) {
        if exports.is_empty() {
            self.cache.remove(dir, path);
        } else {
            self.cache.upsert(dir, ExportRecord::new(path, exports));
        }
    }

    /// Resolves and writes the aggregate for `dir` from the cache as it is.
    ///
    /// On failure the directory is marked stale so the next event writes it
    /// even when its exports did not change.
    fn write_dir(&mut self, dir: &Path) -> Result<WrittenAggregate> {
        self.stale.insert(dir.to_path_buf());
        let resolved = resolver::resolve(dir, self.cache.records(dir))?;

        self.set_state(dir, DirState::Writing);
        let path = writer::write(
            &mut self.sink,
            dir,
            &self.config.index_extension,
            &resolved,
            self.config.render_options(),
        )?;
        self.stale.remove(dir);
        self.stats.writes += 1;

        info!("Wrote {} ({} statements)", path.display(), resolved.len());
        Ok(WrittenAggregate {
            path,
            statements: resolved.len(),
        })
    }

    fn set_state(&mut self, dir: &Path, state: DirState) {
        if state == DirState::Idle {
            self.states.remove(dir);
        } else {
            self.states.insert(dir.to_path_buf(), state);
        }
    }

    /// Rebuilds the cache of every directory under the configured roots and
    /// writes each one that has at least one exporting file.
    ///
    /// Unlike event handling this always writes. A directory with no
    /// exporting file left is written empty when it already has an aggregate
    /// or had cached exports, the same as when its last exporting file goes
    /// away during watching. A file that fails to parse keeps its previous
    /// record and holds back its directory's write; the other directories
    /// proceed.
    pub fn collect(&mut self) -> CollectSummary {
        let mut summary = CollectSummary::default();
        if self.closed {
            return summary;
        }

        let directories = Scanner::new(&self.config).scan();
        summary.directories = directories.len();
        let mut scanned: FxHashSet<PathBuf> = FxHashSet::default();

        for source_dir in directories {
            let dir = source_dir.dir;
            scanned.insert(dir.clone());
            self.set_state(&dir, DirState::Recomputing);

            let extracted: Vec<(PathBuf, Result<ExportSet>)> = source_dir
                .files
                .into_par_iter()
                .map(|file| {
                    let exports = extractor::extract(&file);
                    (file, exports)
                })
                .collect();
            summary.files_scanned += extracted.len();

            let mut records = Vec::with_capacity(extracted.len());
            let mut failed = false;
            for (file, exports) in extracted {
                match exports {
                    Ok(exports) if exports.is_empty() => {}
                    Ok(exports) => records.push(ExportRecord::new(file, exports)),
                    Err(e) => {
                        warn!("{}", e);
                        summary.failures.push(CollectFailure::from_error(&file, &e));
                        failed = true;
                        if let Some(previous) = self.cache.get(&dir, &file) {
                            records.push(previous.clone());
                        }
                    }
                }
            }

            let before = self.cache.snapshot(&dir);
            self.cache.clear(&dir);
            for record in records {
                self.cache.upsert(&dir, record);
            }

            if failed {
                warn!("Not writing {}: some files failed", dir.display());
                if self.cache.snapshot(&dir) != before {
                    self.stale.insert(dir.clone());
                }
            } else if !self.cache.is_empty(&dir) || !before.is_empty() || source_dir.has_aggregate
            {
                self.collect_write(&dir, &mut summary);
            }
            self.set_state(&dir, DirState::Idle);
        }

        // Cached directories that no longer hold any source file or aggregate.
        let vanished: Vec<PathBuf> = self
            .cache
            .directories()
            .into_iter()
            .filter(|dir| !scanned.contains(*dir) && !self.cache.is_empty(dir))
            .map(Path::to_path_buf)
            .collect();
        for dir in vanished {
            self.cache.clear(&dir);
            if dir.is_dir() {
                self.collect_write(&dir, &mut summary);
            } else {
                self.stale.remove(&dir);
            }
            self.set_state(&dir, DirState::Idle);
        }

        self.stats.errors += summary.failures.len() as u64;
        summary
    }

    fn collect_write(&mut self, dir: &Path, summary: &mut CollectSummary) {
        match self.write_dir(dir) {
            Ok(written) => summary.written.push(written),
            Err(e) => {
                warn!("{}", e);
                summary.failures.push(CollectFailure::from_error(dir, &e));
            }
        }
    }

    /// Stops reacting to events. Later events and collects are ignored.
    pub fn close(&mut self) {
        self.closed = true;
        self.states.clear();
    }
}
