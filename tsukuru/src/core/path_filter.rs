//! Eligibility rules for project paths.
//!
//! Pure matching over root-relative paths (`/` separated). Walking the disk is
//! left to `io::project`; this module only answers "prune?" and "skip?".

use anyhow::{Context, Result};
use regex::Regex;

/// Directories never shown to the model. Each entry also matches siblings
/// sharing the prefix (`log` prunes `logs/`).
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "log",
    "tmp",
    "storage",
    "bin",
    "db/migrate",
    "public/assets",
    "public/uploads",
    "coverage",
    "copilot",
];

/// Basename globs never shown to the model.
pub const DEFAULT_IGNORED_PATTERNS: &[&str] = &["*.png", "*.jpg", ".keep", "*.log", "*.lock"];

/// Compiled ignore rules.
#[derive(Debug, Clone)]
pub struct PathFilter {
    dirs: Vec<Regex>,
    patterns: Vec<Regex>,
}

impl PathFilter {
    /// Build a filter from the defaults plus extra entries.
    pub fn new(extra_dirs: &[String], extra_patterns: &[String]) -> Result<Self> {
        let dirs = DEFAULT_IGNORED_DIRS
            .iter()
            .copied()
            .chain(extra_dirs.iter().map(String::as_str))
            .map(|dir| compile_dir(dir.trim_matches('/')))
            .collect::<Result<Vec<_>>>()?;
        let patterns = DEFAULT_IGNORED_PATTERNS
            .iter()
            .copied()
            .chain(extra_patterns.iter().map(String::as_str))
            .map(compile_glob)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { dirs, patterns })
    }

    /// Whether a directory (root-relative) and everything below it is skipped.
    pub fn prunes_dir(&self, rel_dir: &str) -> bool {
        if basename(rel_dir).starts_with('.') {
            return true;
        }
        self.dirs.iter().any(|re| re.is_match(rel_dir))
    }

    /// Whether a regular file (root-relative) is excluded by name.
    pub fn skips_file(&self, rel_path: &str) -> bool {
        let name = basename(rel_path);
        name.starts_with('.') || self.patterns.iter().any(|re| re.is_match(name))
    }

    /// Full eligibility check for a file path, including its ancestors.
    pub fn is_eligible(&self, rel_path: &str) -> bool {
        if rel_path.is_empty() || rel_path.starts_with('/') {
            return false;
        }
        let segments: Vec<&str> = rel_path.split('/').collect();
        if segments.iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
            return false;
        }
        for end in 1..segments.len() {
            if self.prunes_dir(&segments[..end].join("/")) {
                return false;
            }
        }
        !self.skips_file(rel_path)
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn compile_dir(dir: &str) -> Result<Regex> {
    let pattern = format!("^{}[^/]*$", glob_body(dir));
    Regex::new(&pattern).with_context(|| format!("compile ignored dir {dir:?}"))
}

fn compile_glob(glob: &str) -> Result<Regex> {
    let pattern = format!("^{}$", glob_body(glob));
    Regex::new(&pattern).with_context(|| format!("compile ignored pattern {glob:?}"))
}

/// Translate `*` and `?` into segment-local regex, escaping everything else.
fn glob_body(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    for ch in glob.chars() {
        match ch {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> PathFilter {
        PathFilter::new(&[], &[]).expect("filter")
    }

    #[test]
    fn prunes_ignored_and_hidden_dirs() {
        let filter = filter();
        assert!(filter.prunes_dir("node_modules"));
        assert!(filter.prunes_dir("logs"));
        assert!(filter.prunes_dir("db/migrate"));
        assert!(filter.prunes_dir(".git"));
        assert!(filter.prunes_dir("app/.cache"));
        assert!(!filter.prunes_dir("app"));
        assert!(!filter.prunes_dir("db"));
        assert!(!filter.prunes_dir("app/models"));
    }

    #[test]
    fn skips_ignored_basenames_and_dotfiles() {
        let filter = filter();
        assert!(filter.skips_file("app/assets/images/logo.png"));
        assert!(filter.skips_file("app/assets/images/.keep"));
        assert!(filter.skips_file("Gemfile.lock"));
        assert!(filter.skips_file(".rubocop.yml"));
        assert!(!filter.skips_file("Gemfile"));
        assert!(!filter.skips_file("app/models/user.rb"));
    }

    #[test]
    fn eligibility_checks_every_ancestor() {
        let filter = filter();
        assert!(filter.is_eligible("app/models/user.rb"));
        assert!(filter.is_eligible("db/schema.rb"));
        assert!(!filter.is_eligible("db/migrate/20240101_create_users.rb"));
        assert!(!filter.is_eligible("node_modules/pkg/index.js"));
        assert!(!filter.is_eligible("config/.secret/key.rb"));
        assert!(!filter.is_eligible("../outside.rb"));
        assert!(!filter.is_eligible("/etc/passwd"));
        assert!(!filter.is_eligible("app//user.rb"));
    }

    #[test]
    fn extra_rules_extend_defaults() {
        let filter = PathFilter::new(&["vendor/".to_string()], &["*.svg".to_string()])
            .expect("filter");
        assert!(filter.prunes_dir("vendor"));
        assert!(filter.skips_file("app/assets/icon.svg"));
        assert!(filter.prunes_dir("node_modules"));
    }
}
