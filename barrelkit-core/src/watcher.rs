//! File watching for incremental regeneration.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::Config as NotifyConfig;
use notify::{Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use regex::Regex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileEventKind {
    Add,
    Change,
    Unlink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub path: PathBuf,
}

impl FileEvent {
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn add(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Add, path)
    }

    pub fn change(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Change, path)
    }

    pub fn unlink(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Unlink, path)
    }
}

pub struct WatcherConfig {
    pub roots: Vec<PathBuf>,
    pub ignored: Option<Regex>,
    /// Poll at this interval instead of using native notifications.
    pub poll_interval: Option<Duration>,
}

impl From<&Config> for WatcherConfig {
    fn from(config: &Config) -> Self {
        Self {
            roots: config.roots(),
            ignored: config.ignored.clone(),
            poll_interval: config.poll.then(|| config.poll_interval()),
        }
    }
}

pub struct FileWatcher {
    watcher: Box<dyn Watcher>,
    receiver: Receiver<notify::Result<Event>>,
    config: WatcherConfig,
    watched: Vec<PathBuf>,
}

impl FileWatcher {
    pub fn new(config: WatcherConfig) -> Result<Self> {
        let (tx, rx) = std::sync::mpsc::channel::<notify::Result<Event>>();

        let watcher: Box<dyn Watcher> = match config.poll_interval {
            Some(interval) => Box::new(
                PollWatcher::new(
                    move |res: notify::Result<Event>| {
                        // The receiver is gone once the session closes.
                        let _ = tx.send(res);
                    },
                    NotifyConfig::default().with_poll_interval(interval),
                )
                .map_err(|e| Error::Watcher(format!("Failed to create poll watcher: {}", e)))?,
            ),
            None => Box::new(
                RecommendedWatcher::new(
                    move |res: notify::Result<Event>| {
                        let _ = tx.send(res);
                    },
                    NotifyConfig::default(),
                )
                .map_err(|e| Error::Watcher(format!("Failed to create watcher: {}", e)))?,
            ),
        };

        let mut file_watcher = Self {
            watcher,
            receiver: rx,
            config,
            watched: Vec::new(),
        };

        file_watcher.watch_roots()?;

        Ok(file_watcher)
    }

    fn watch_roots(&mut self) -> Result<()> {
        for root in &self.config.roots {
            if !root.is_dir() {
                warn!("Not watching {}: not a directory", root.display());
                continue;
            }
            self.watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| {
                    Error::Watcher(format!("Failed to watch {}: {}", root.display(), e))
                })?;
            self.watched.push(root.clone());
        }

        if self.watched.is_empty() {
            return Err(Error::Watcher(
                "None of the configured directories exist".to_string(),
            ));
        }
        Ok(())
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Returns the events already queued without blocking.
    pub fn next_events(&mut self) -> Result<Vec<FileEvent>> {
        match self.receiver.try_recv() {
            Ok(res) => self.translate_result(res),
            Err(TryRecvError::Empty) => Ok(Vec::new()),
            Err(TryRecvError::Disconnected) => Err(Error::Watcher(
                "Watcher channel disconnected".to_string(),
            )),
        }
    }

    /// Waits up to `timeout` for the next batch of events.
    pub fn wait_events(&mut self, timeout: Duration) -> Result<Vec<FileEvent>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(res) => self.translate_result(res),
            Err(RecvTimeoutError::Timeout) => Ok(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Watcher(
                "Watcher channel disconnected".to_string(),
            )),
        }
    }

    /// Backend errors for single events are logged and dropped; only a
    /// disconnected channel is fatal.
    fn translate_result(&self, res: notify::Result<Event>) -> Result<Vec<FileEvent>> {
        match res {
            Ok(event) => Ok(self.translate(&event)),
            Err(e) => {
                warn!("Watcher error: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Maps a notify event to add/change/unlink events, dropping ignored paths.
    pub fn translate(&self, event: &Event) -> Vec<FileEvent> {
        translate_event(event)
            .into_iter()
            .filter(|e| !self.is_ignored(&e.path))
            .collect()
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.config
            .ignored
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(&path.to_string_lossy()))
    }

    /// Stops watching every root. Events already queued are discarded.
    pub fn close(mut self) {
        for root in std::mem::take(&mut self.watched) {
            if let Err(e) = self.watcher.unwatch(&root) {
                debug!("Failed to unwatch {}: {}", root.display(), e);
            }
        }
    }
}

fn translate_event(event: &Event) -> Vec<FileEvent> {
    let each = |kind: FileEventKind| -> Vec<FileEvent> {
        event
            .paths
            .iter()
            .map(|p| FileEvent::new(kind, p.clone()))
            .collect()
    };

    match &event.kind {
        EventKind::Create(_) => each(FileEventKind::Add),
        EventKind::Remove(_) => each(FileEventKind::Unlink),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(FileEventKind::Unlink),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(FileEventKind::Add),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut events = Vec::new();
            if let Some(from) = event.paths.first() {
                events.push(FileEvent::unlink(from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                events.push(FileEvent::add(to.clone()));
            }
            events
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                if p.exists() {
                    FileEvent::add(p.clone())
                } else {
                    FileEvent::unlink(p.clone())
                }
            })
            .collect(),
        EventKind::Modify(_) => each(FileEventKind::Change),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
