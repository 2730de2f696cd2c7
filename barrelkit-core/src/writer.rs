//! Rendering and persisting aggregate files.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::path_utils;
use crate::resolver::ResolvedRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit `export { , a }` for files without a default export instead of
    /// dropping the empty slot.
    pub keep_empty_default_slot: bool,
}

/// Renders one re-export line per record, followed by a blank line.
pub fn render(records: &[ResolvedRecord], options: RenderOptions) -> String {
    let mut out = String::new();

    for record in records {
        let mut specifiers: Vec<String> = Vec::with_capacity(record.named.len() + 1);
        match &record.default_alias {
            Some(alias) => specifiers.push(alias.clone()),
            None if options.keep_empty_default_slot => specifiers.push(String::new()),
            None => {}
        }
        for name in &record.named {
            if name.is_renamed() {
                specifiers.push(format!("{} as {}", name.local, name.exported));
            } else {
                specifiers.push(name.exported.clone());
            }
        }

        out.push_str(&format!(
            "export {{ {} }} from './{}'\n",
            specifiers.join(", "),
            record.file_stem
        ));
    }

    out.push('\n');
    out
}

/// Destination for rendered aggregates.
pub trait AggregateSink {
    fn write(&mut self, path: &Path, content: &str) -> Result<()>;
}

/// Renders `records` and hands the result to `sink` as the aggregate of
/// `dir`. Returns the aggregate's path.
///
/// Always writes; deciding whether a write is needed is up to the caller.
pub fn write<S: AggregateSink + ?Sized>(
    sink: &mut S,
    dir: &Path,
    extension: &str,
    records: &[ResolvedRecord],
    options: RenderOptions,
) -> Result<PathBuf> {
    let path = path_utils::aggregate_path(dir, extension);
    sink.write(&path, &render(records, options))?;
    Ok(path)
}

/// Writes aggregates to disk, replacing the target atomically.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSink;

impl AggregateSink for FsSink {
    fn write(&mut self, path: &Path, content: &str) -> Result<()> {
        write_atomic(path, content)
    }
}

/// Writes `content` to a temporary file next to `path` and renames it into
/// place, so readers see either the old file or the new one.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::io_at(dir, e))?;
    // Temp files are created owner-only; keep what the target had.
    if let Some(permissions) = target_permissions(path) {
        temp.as_file()
            .set_permissions(permissions)
            .map_err(|e| Error::io_at(temp.path(), e))?;
    }
    temp.write_all(content.as_bytes())
        .map_err(|e| Error::io_at(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::io_at(temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| Error::io_at(path, e.error))?;
    Ok(())
}

#[cfg(unix)]
fn target_permissions(path: &Path) -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(_) => Some(std::fs::Permissions::from_mode(0o644)),
    }
}

#[cfg(not(unix))]
fn target_permissions(path: &Path) -> Option<std::fs::Permissions> {
    std::fs::metadata(path).ok().map(|m| m.permissions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedName;

    fn record(stem: &str, default: bool, named: &[(&str, &str)]) -> ResolvedRecord {
        ResolvedRecord {
            file_stem: stem.to_string(),
            default_alias: default.then(|| stem.to_string()),
            named: named
                .iter()
                .map(|(local, exported)| ResolvedName {
                    local: local.to_string(),
                    exported: exported.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_render_default_only() {
        let out = render(&[record("userApi", true, &[])], RenderOptions::default());
        assert_eq!(out, "export { userApi } from './userApi'\n\n");
    }

    #[test]
    fn test_render_normalizes_empty_default_slot() {
        let records = [record("foo", false, &[("bar", "bar")]), record("baz", true, &[])];
        assert_eq!(
            render(&records, RenderOptions::default()),
            "export { bar } from './foo'\nexport { baz } from './baz'\n\n"
        );
    }

    #[test]
    fn test_render_keeps_empty_default_slot_when_asked() {
        let records = [record("foo", false, &[("bar", "bar")]), record("baz", true, &[])];
        let options = RenderOptions {
            keep_empty_default_slot: true,
        };
        assert_eq!(
            render(&records, options),
            "export { , bar } from './foo'\nexport { baz } from './baz'\n\n"
        );
    }

    #[test]
    fn test_render_renamed_export() {
        let out = render(
            &[record("b", true, &[("x", "bX"), ("y", "y")])],
            RenderOptions::default(),
        );
        assert_eq!(out, "export { b, x as bX, y } from './b'\n\n");
    }

    #[test]
    fn test_render_empty_directory() {
        assert_eq!(render(&[], RenderOptions::default()), "\n");
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.js");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, "new\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_write_atomic_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("index.js");
        assert!(write_atomic(&path, "x").is_err());
    }
}
