//! Writing the generated artifact to disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::core::tools::{check_spec_path, is_plain_relative_path};
use crate::core::types::Artifact;

/// Where an artifact lands, relative to the project root.
///
/// README output defaults to `README.md` unless `readme_path` is given; RSpec
/// output goes wherever the model asked.
pub fn target_path(artifact: &Artifact, readme_path: Option<&str>) -> String {
    match artifact {
        Artifact::Readme { .. } => readme_path.unwrap_or("README.md").to_string(),
        Artifact::Rspec { path, .. } => path.clone(),
    }
}

/// Check a user-supplied README destination before any chat round runs.
pub fn check_readme_output(rel_path: &str) -> Result<()> {
    if !is_plain_relative_path(rel_path) {
        bail!(
            "--output must be a relative path inside the project without hidden components: {rel_path:?}"
        );
    }
    Ok(())
}

/// Write `artifact` under `root` once, via temp file + rename.
///
/// Returns the absolute path written.
pub fn write_artifact(root: &Path, rel_path: &str, artifact: &Artifact) -> Result<PathBuf> {
    match artifact {
        Artifact::Readme { .. } => check_readme_output(rel_path)?,
        Artifact::Rspec { .. } => check_spec_path(rel_path)?,
    }
    let path = root.join(rel_path);
    ensure_inside_root(root, &path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    if path.exists() {
        warn!(path = %path.display(), "overwriting existing file");
    }

    let mut body = artifact.body().to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    let tmp_path = path.with_extension("tsukuru.tmp");
    fs::write(&tmp_path, body).with_context(|| format!("write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &path).with_context(|| format!("replace {}", path.display()))?;
    info!(path = %path.display(), kind = artifact.kind().as_str(), "artifact written");
    Ok(path)
}

/// Fail if the nearest existing ancestor of `path` resolves outside `root`.
fn ensure_inside_root(root: &Path, path: &Path) -> Result<()> {
    let root = root
        .canonicalize()
        .with_context(|| format!("resolve {}", root.display()))?;
    let Some(existing) = path.ancestors().skip(1).find(|dir| dir.exists()) else {
        bail!("no existing parent for {}", path.display());
    };
    let resolved = existing
        .canonicalize()
        .with_context(|| format!("resolve {}", existing.display()))?;
    if !resolved.starts_with(&root) {
        bail!(
            "refusing to write {}: {} resolves outside the project root",
            path.display(),
            existing.display()
        );
    }
    Ok(())
}
