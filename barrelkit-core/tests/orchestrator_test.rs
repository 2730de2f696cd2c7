use std::fs;
use std::path::{Path, PathBuf};

use barrelkit_core::orchestrator::{DirState, FailureKind, Orchestrator, Outcome};
use barrelkit_core::watcher::FileEvent;
use barrelkit_core::writer::AggregateSink;
use barrelkit_core::{Config, Error, Result};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingSink {
    writes: Vec<(PathBuf, String)>,
}

impl AggregateSink for RecordingSink {
    fn write(&mut self, path: &Path, content: &str) -> Result<()> {
        self.writes.push((path.to_path_buf(), content.to_string()));
        Ok(())
    }
}

fn config_for(root: &Path) -> Config {
    Config {
        dir: vec![root.to_path_buf()],
        ..Config::default()
    }
}

fn write_source(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Fails the first `failures` writes, then records like `RecordingSink`.
struct FlakySink {
    failures: usize,
    writes: Vec<(PathBuf, String)>,
}

impl AggregateSink for FlakySink {
    fn write(&mut self, path: &Path, content: &str) -> Result<()> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.writes.push((path.to_path_buf(), content.to_string()));
        Ok(())
    }
}

fn recording(root: &Path) -> Orchestrator<RecordingSink> {
    Orchestrator::with_sink(config_for(root), RecordingSink::default())
}

#[test]
fn test_collect_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    write_source(src, "a.js", "export const one = 1;\nexport default one;\n");
    write_source(src, "b.js", "export function b() {}\n");
    write_source(&src.join("nested"), "c.js", "export class C {}\n");

    let mut orchestrator = Orchestrator::new(config_for(src));
    let first = orchestrator.collect();
    let root_index = fs::read_to_string(src.join("index.js")).unwrap();
    let nested_index = fs::read_to_string(src.join("nested").join("index.js")).unwrap();

    let second = orchestrator.collect();

    assert_eq!(first.written.len(), 2);
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(src.join("index.js")).unwrap(), root_index);
    assert_eq!(
        fs::read_to_string(src.join("nested").join("index.js")).unwrap(),
        nested_index
    );
    assert_eq!(
        root_index,
        "export { a, one } from './a'\nexport { b } from './b'\n\n"
    );
    assert_eq!(nested_index, "export { C } from './c'\n\n");
}

#[test]
fn test_collect_skips_directories_without_exports() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    write_source(src, "side-effect.js", "console.log('hi');\n");

    let mut orchestrator = recording(src);
    let summary = orchestrator.collect();

    assert_eq!(summary.files_scanned, 1);
    assert!(summary.written.is_empty());
    assert!(orchestrator.sink().writes.is_empty());
}

#[test]
fn test_unchanged_exports_skip_write() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let a = write_source(src, "a.js", "export const a = 1;\n");

    let mut orchestrator = recording(src);
    orchestrator.collect();
    assert_eq!(orchestrator.sink().writes.len(), 1);

    fs::write(&a, "// reformatted\nexport const a = 2;\n").unwrap();
    let outcome = orchestrator.handle_event(&FileEvent::change(&a)).unwrap();

    assert_eq!(
        outcome,
        Outcome::Unchanged {
            dir: src.to_path_buf()
        }
    );
    assert_eq!(orchestrator.sink().writes.len(), 1);
    assert_eq!(orchestrator.stats().unchanged, 1);
}

#[test]
fn test_collision_follows_insertion_order() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let b = write_source(src, "b.js", "export const x = 1;\n");
    let a = write_source(src, "a.js", "export const x = 2;\n");

    let mut orchestrator = recording(src);
    orchestrator.handle_event(&FileEvent::add(&b)).unwrap();
    orchestrator.handle_event(&FileEvent::add(&a)).unwrap();

    let (_, content) = orchestrator.sink().writes.last().unwrap();
    assert_eq!(
        content,
        "export { x } from './b'\nexport { x as aX } from './a'\n\n"
    );
}

#[test]
fn test_collision_in_collect_uses_path_order() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    write_source(src, "b.js", "export const x = 1;\n");
    write_source(src, "a.js", "export const x = 2;\n");

    let mut orchestrator = Orchestrator::new(config_for(src));
    orchestrator.collect();

    assert_eq!(
        fs::read_to_string(src.join("index.js")).unwrap(),
        "export { x } from './a'\nexport { x as bX } from './b'\n\n"
    );
}

#[test]
fn test_collision_overflow_prevents_write() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let a = write_source(src, "a.js", "export const x = 1, bX = 2;\n");
    let b = write_source(src, "b.js", "export const x = 3;\n");

    let mut orchestrator = recording(src);
    orchestrator.handle_event(&FileEvent::add(&a)).unwrap();
    let result = orchestrator.handle_event(&FileEvent::add(&b));

    assert!(matches!(result, Err(Error::CollisionOverflow { .. })));
    assert_eq!(orchestrator.sink().writes.len(), 1);
    assert_eq!(orchestrator.state(src), DirState::Idle);
}

#[test]
fn test_deleting_sole_exporter_writes_empty_aggregate() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let a = write_source(src, "a.js", "export const a = 1;\n");

    let mut orchestrator = Orchestrator::new(config_for(src));
    orchestrator.collect();

    fs::remove_file(&a).unwrap();
    let outcome = orchestrator.handle_event(&FileEvent::unlink(&a)).unwrap();

    match outcome {
        Outcome::Written(written) => assert_eq!(written.statements, 0),
        other => panic!("expected a write, got {:?}", other),
    }
    assert!(orchestrator.cache().is_empty(src));
    assert_eq!(fs::read_to_string(src.join("index.js")).unwrap(), "\n");
}

#[test]
fn test_change_for_vanished_file_counts_as_removal() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let a = write_source(src, "a.js", "export const a = 1;\n");
    write_source(src, "b.js", "export const b = 1;\n");

    let mut orchestrator = recording(src);
    orchestrator.collect();

    fs::remove_file(&a).unwrap();
    orchestrator.handle_event(&FileEvent::change(&a)).unwrap();

    let (_, content) = orchestrator.sink().writes.last().unwrap();
    assert_eq!(content, "export { b } from './b'\n\n");
}

#[test]
fn test_file_losing_all_exports_is_dropped() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let a = write_source(src, "a.js", "export const a = 1;\n");

    let mut orchestrator = recording(src);
    orchestrator.collect();

    fs::write(&a, "const a = 1;\n").unwrap();
    orchestrator.handle_event(&FileEvent::change(&a)).unwrap();

    assert!(orchestrator.cache().get(src, &a).is_none());
    assert_eq!(orchestrator.sink().writes.last().unwrap().1, "\n");
}

#[test]
fn test_default_export_uses_file_stem() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let path = write_source(src, "userApi.js", "export default { get() {} };\n");

    let mut orchestrator = recording(src);
    orchestrator.handle_event(&FileEvent::add(&path)).unwrap();

    assert_eq!(
        orchestrator.sink().writes[0],
        (
            src.join("index.js"),
            "export { userApi } from './userApi'\n\n".to_string()
        )
    );
}

#[test]
fn test_end_to_end_with_empty_default_slot() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let foo = write_source(src, "foo.js", "export const bar = 1;\n");
    let baz = write_source(src, "baz.js", "export default function() {}\n");

    let config = Config {
        keep_empty_default_slot: true,
        ..config_for(src)
    };
    let mut orchestrator = Orchestrator::new(config);
    orchestrator.handle_event(&FileEvent::add(&foo)).unwrap();
    orchestrator.handle_event(&FileEvent::add(&baz)).unwrap();

    assert_eq!(
        fs::read_to_string(src.join("index.js")).unwrap(),
        "export { , bar } from './foo'\nexport { baz } from './baz'\n\n"
    );
}

#[test]
fn test_end_to_end_normalized() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let foo = write_source(src, "foo.js", "export const bar = 1;\n");
    let baz = write_source(src, "baz.js", "export default function() {}\n");

    let mut orchestrator = Orchestrator::new(config_for(src));
    orchestrator.handle_event(&FileEvent::add(&foo)).unwrap();
    orchestrator.handle_event(&FileEvent::add(&baz)).unwrap();

    assert_eq!(
        fs::read_to_string(src.join("index.js")).unwrap(),
        "export { bar } from './foo'\nexport { baz } from './baz'\n\n"
    );
}

#[test]
fn test_parse_error_leaves_cache_and_disk_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let a = write_source(src, "a.js", "export const a = 1;\n");

    let mut orchestrator = Orchestrator::new(config_for(src));
    orchestrator.collect();
    let before = fs::read_to_string(src.join("index.js")).unwrap();

    fs::write(&a, "export const a = {;\n").unwrap();
    let result = orchestrator.handle_event(&FileEvent::change(&a));

    assert!(matches!(result, Err(Error::Parse(_))));
    assert!(orchestrator.cache().get(src, &a).is_some());
    assert_eq!(fs::read_to_string(src.join("index.js")).unwrap(), before);
    assert_eq!(orchestrator.stats().errors, 1);
}

#[test]
fn test_collect_parse_error_keeps_previous_record() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    write_source(src, "a.js", "export const a = 1;\n");
    let b = write_source(src, "b.js", "export const b = 1;\n");
    let other = temp_dir.path().join("other");
    write_source(&other, "c.js", "export const c = 1;\n");

    let mut orchestrator = recording(src);
    orchestrator.collect();
    assert_eq!(orchestrator.sink().writes.len(), 2);

    fs::write(&b, "export * from './a';\n").unwrap();
    let summary = orchestrator.collect();

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, FailureKind::Parse);
    assert_eq!(summary.failures[0].path, b);
    // Only the healthy directory was written again.
    assert_eq!(summary.written.len(), 1);
    assert_eq!(summary.written[0].path, other.join("index.js"));
    assert!(orchestrator.cache().get(src, &b).is_some());
}

#[test]
fn test_collect_forgets_files_removed_between_runs() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let a = write_source(src, "a.js", "export const a = 1;\n");
    write_source(src, "b.js", "export const b = 1;\n");

    let mut orchestrator = Orchestrator::new(config_for(src));
    orchestrator.collect();
    fs::remove_file(&a).unwrap();
    orchestrator.collect();

    assert_eq!(
        fs::read_to_string(src.join("index.js")).unwrap(),
        "export { b } from './b'\n\n"
    );
}

#[test]
fn test_non_source_and_aggregate_events_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let css = write_source(src, "style.css", "body {}\n");
    let index = write_source(src, "index.js", "export { a } from './a'\n");

    let mut orchestrator = recording(src);

    assert_eq!(
        orchestrator.handle_event(&FileEvent::change(&css)).unwrap(),
        Outcome::Ignored
    );
    assert_eq!(
        orchestrator.handle_event(&FileEvent::change(&index)).unwrap(),
        Outcome::Ignored
    );
    assert!(orchestrator.sink().writes.is_empty());
    assert_eq!(orchestrator.stats().ignored, 2);
}

#[test]
fn test_directories_do_not_share_names() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let first = write_source(&src.join("a"), "x.js", "export const x = 1;\n");
    let second = write_source(&src.join("b"), "y.js", "export const x = 2;\n");

    let mut orchestrator = Orchestrator::new(config_for(src));
    orchestrator.handle_event(&FileEvent::add(&first)).unwrap();
    orchestrator.handle_event(&FileEvent::add(&second)).unwrap();

    assert_eq!(
        fs::read_to_string(src.join("b").join("index.js")).unwrap(),
        "export { x } from './y'\n\n"
    );
}

#[test]
fn test_custom_extensions() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    write_source(src, "a.mjs", "export const a = 1;\n");
    write_source(src, "b.js", "export const b = 1;\n");

    let config = Config {
        extensions: vec!["mjs".to_string()],
        index_extension: "mjs".to_string(),
        ..config_for(src)
    };
    let mut orchestrator = Orchestrator::new(config);
    orchestrator.collect();

    assert_eq!(
        fs::read_to_string(src.join("index.mjs")).unwrap(),
        "export { a } from './a'\n\n"
    );
    assert!(!src.join("index.js").exists());
}

#[test]
fn test_closed_orchestrator_ignores_events() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let a = write_source(src, "a.js", "export const a = 1;\n");

    let mut orchestrator = recording(src);
    orchestrator.close();

    assert!(orchestrator.is_closed());
    assert_eq!(
        orchestrator.handle_event(&FileEvent::add(&a)).unwrap(),
        Outcome::Ignored
    );
    assert!(orchestrator.collect().written.is_empty());
}

#[test]
fn test_collect_empties_aggregate_after_exports_disappear() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let a = write_source(src, "a.js", "export const a = 1;\n");

    let mut orchestrator = Orchestrator::new(config_for(src));
    orchestrator.collect();
    assert_eq!(
        fs::read_to_string(src.join("index.js")).unwrap(),
        "export { a } from './a'\n\n"
    );

    fs::write(&a, "const a = 1;\n").unwrap();
    let summary = orchestrator.collect();

    assert_eq!(summary.written.len(), 1);
    assert_eq!(summary.written[0].statements, 0);
    assert_eq!(fs::read_to_string(src.join("index.js")).unwrap(), "\n");
}

#[test]
fn test_fresh_collect_empties_stale_aggregates() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    write_source(src, "a.js", "const a = 1;\n");
    write_source(src, "index.js", "export { a } from './a'\n\n");
    write_source(&src.join("gone"), "index.js", "export { b } from './b'\n\n");

    let summary = Orchestrator::new(config_for(src)).collect();

    assert_eq!(summary.written.len(), 2);
    assert_eq!(fs::read_to_string(src.join("index.js")).unwrap(), "\n");
    assert_eq!(
        fs::read_to_string(src.join("gone").join("index.js")).unwrap(),
        "\n"
    );
}

#[test]
fn test_collect_empties_directory_whose_sources_were_deleted() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let lib = src.join("lib");
    let a = write_source(&lib, "a.js", "export const a = 1;\n");

    let mut orchestrator = recording(src);
    orchestrator.collect();
    fs::remove_file(&a).unwrap();
    let summary = orchestrator.collect();

    assert_eq!(summary.written.len(), 1);
    assert_eq!(
        orchestrator.sink().writes.last().unwrap(),
        &(lib.join("index.js"), "\n".to_string())
    );
    assert!(orchestrator.cache().is_empty(&lib));
}

#[test]
fn test_failed_write_is_retried_on_next_event() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let a = write_source(src, "a.js", "export const a = 1;\n");

    let sink = FlakySink {
        failures: 1,
        writes: Vec::new(),
    };
    let mut orchestrator = Orchestrator::with_sink(config_for(src), sink);

    assert!(orchestrator.handle_event(&FileEvent::add(&a)).is_err());
    assert!(orchestrator.sink().writes.is_empty());

    let outcome = orchestrator.handle_event(&FileEvent::change(&a)).unwrap();

    assert!(matches!(outcome, Outcome::Written(_)));
    assert_eq!(
        orchestrator.sink().writes,
        vec![(src.join("index.js"), "export { a } from './a'\n\n".to_string())]
    );

    // Written now, so the same content is a no-op again.
    let outcome = orchestrator.handle_event(&FileEvent::change(&a)).unwrap();
    assert!(matches!(outcome, Outcome::Unchanged { .. }));
}

#[test]
fn test_reordering_named_exports_keeps_written_order() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path();
    let a = write_source(src, "a.js", "export const x = 1;\nexport const y = 2;\n");

    let mut orchestrator = recording(src);
    orchestrator.collect();

    fs::write(&a, "export const y = 2;\nexport const x = 1;\n").unwrap();
    let outcome = orchestrator.handle_event(&FileEvent::change(&a)).unwrap();

    assert!(matches!(outcome, Outcome::Unchanged { .. }));
    assert_eq!(orchestrator.sink().writes.len(), 1);
    assert_eq!(orchestrator.sink().writes[0].1, "export { x, y } from './a'\n\n");
}
