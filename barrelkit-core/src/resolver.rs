//! Collision resolution for named exports within one directory.

use std::path::Path;

use rustc_hash::FxHashSet;

use crate::cache::ExportRecord;
use crate::error::{Error, Result};

/// A named export and the name the aggregate publishes it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub local: String,
    pub exported: String,
}

impl ResolvedName {
    pub fn is_renamed(&self) -> bool {
        self.local != self.exported
    }
}

/// One file's line of the aggregate, with every name final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub file_stem: String,
    /// The alias of the default export; the file stem when present.
    pub default_alias: Option<String>,
    pub named: Vec<ResolvedName>,
}

/// Assigns a unique exported name to every named export of `records`.
///
/// Records are visited in the given order and the first file to export an
/// identifier keeps it. Later files exporting the same identifier publish
/// it as `camel_case("<stem> <identifier>")`. Default aliases are not part
/// of the collision universe.
///
/// Fails with [`Error::CollisionOverflow`] when a prefixed name is itself
/// already taken.
pub fn resolve<'a, I>(dir: &Path, records: I) -> Result<Vec<ResolvedRecord>>
where
    I: IntoIterator<Item = &'a ExportRecord>,
{
    let mut claimed: FxHashSet<String> = FxHashSet::default();
    let mut resolved = Vec::new();

    for record in records {
        let mut named = Vec::with_capacity(record.exports.named_len());

        for local in record.exports.named() {
            let exported = if claimed.contains(local) {
                let prefixed = camel_case(&format!("{} {}", record.file_stem, local));
                if claimed.contains(&prefixed) {
                    return Err(Error::CollisionOverflow {
                        dir: dir.to_path_buf(),
                        file: record.file_path.clone(),
                        name: prefixed,
                    });
                }
                prefixed
            } else {
                local.to_string()
            };

            claimed.insert(exported.clone());
            named.push(ResolvedName {
                local: local.to_string(),
                exported,
            });
        }

        resolved.push(ResolvedRecord {
            file_stem: record.file_stem.clone(),
            default_alias: record
                .exports
                .has_default()
                .then(|| record.file_stem.clone()),
            named,
        });
    }

    Ok(resolved)
}

/// Converts `input` to camelCase.
///
/// Words are split on anything that is not alphanumeric, on lower-to-upper
/// transitions, and before the last capital of an acronym followed by a
/// lowercase letter (`HTTPClient` is `HTTP` + `Client`).
pub fn camel_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, word) in split_words(input).into_iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

fn split_words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if !current.is_empty() && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_numeric()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}
