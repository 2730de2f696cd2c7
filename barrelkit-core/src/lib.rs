//! Core library for keeping per-directory barrel files in sync.

pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod extractor;
pub mod lexer;
pub mod lifecycle;
pub mod orchestrator;
pub mod path_utils;
pub mod resolver;
pub mod scanner;
pub mod watcher;
pub mod writer;

pub use cache::{DirectoryCache, DirectorySnapshot, ExportRecord};
pub use config::{Config, LoadedConfig, CONFIG_FILE_NAME};
pub use debounce::Debouncer;
pub use error::{ConfigError, Error, ParseError, Result};
pub use extractor::{extract, extract_source, ExportSet};
pub use lifecycle::{BuildSession, EventResult};
pub use orchestrator::{
    CollectFailure, CollectSummary, DirState, FailureKind, Orchestrator, OrchestratorStats,
    Outcome, WrittenAggregate,
};
pub use resolver::{resolve, ResolvedName, ResolvedRecord};
pub use scanner::{Scanner, SourceDirectory};
pub use watcher::{FileEvent, FileEventKind, FileWatcher, WatcherConfig};
pub use writer::{render, AggregateSink, FsSink, RenderOptions};
