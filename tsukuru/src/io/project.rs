//! Project file discovery and loading.
//!
//! Everything returned here is root-relative with `/` separators, matching the
//! strings the model sees in the request tool.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::core::path_filter::PathFilter;
use crate::core::types::FileContent;

/// Enumerate every eligible file under `root`, sorted.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn eligible_paths(root: &Path, filter: &PathFilter) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            match relative(root, entry.path()) {
                Some(rel) => !filter.prunes_dir(&rel),
                None => false,
            }
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = relative(root, entry.path()) else {
            continue;
        };
        if filter.skips_file(&rel) {
            continue;
        }
        paths.push(rel);
    }
    paths.sort();
    debug!(count = paths.len(), "enumerated eligible paths");
    Ok(paths)
}

fn relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

/// Resolve configured initial file names to eligible paths.
///
/// A name that is itself in `universe` wins; otherwise the first universe
/// entry ending in `/<name>` is used. Names with no match are dropped, so
/// nothing outside the eligible universe is ever disclosed.
pub fn resolve_initial_files(names: &[String], universe: &[String]) -> Vec<String> {
    let mut resolved: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim().trim_start_matches("./");
        if name.is_empty() {
            continue;
        }
        let suffix = format!("/{name}");
        let found = universe
            .iter()
            .find(|path| path.as_str() == name)
            .or_else(|| universe.iter().find(|path| path.ends_with(&suffix)))
            .cloned();
        match found {
            Some(path) if !resolved.contains(&path) => resolved.push(path),
            Some(_) => {}
            None => debug!(file = name, "initial file not found"),
        }
    }
    resolved
}

/// Load the given root-relative paths, skipping files that are gone.
///
/// Bodies longer than `max_bytes` are cut with a `[truncated N bytes]` marker.
#[instrument(skip_all, fields(count = paths.len()))]
pub fn load_contents(root: &Path, paths: &[String], max_bytes: usize) -> Result<Vec<FileContent>> {
    let mut contents = Vec::with_capacity(paths.len());
    for path in paths {
        let full = root.join(path);
        if !full.is_file() {
            warn!(path = %path, "skipping missing file");
            continue;
        }
        let bytes = fs::read(&full).with_context(|| format!("read {}", full.display()))?;
        let body = truncate_body(String::from_utf8_lossy(&bytes).into_owned(), max_bytes);
        contents.push(FileContent {
            path: path.clone(),
            body,
        });
    }
    Ok(contents)
}

fn truncate_body(mut body: String, max_bytes: usize) -> String {
    if body.len() <= max_bytes {
        return body;
    }
    let mut cut = max_bytes;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    let dropped = body.len() - cut;
    body.truncate(cut);
    body.push_str(&format!("\n[truncated {dropped} bytes]"));
    body
}

/// Read the optional project rules file.
pub fn read_rules(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read rules {}", path.display()))?;
    let trimmed = contents.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}
