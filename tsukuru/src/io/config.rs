//! Generator configuration stored under `.tsukuru/config.toml`.
//!
//! The file is optional. Environment variables override it, and CLI flags
//! override both; see [`resolve_settings`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::GeneratorKind;

/// Bearer token for the chat endpoint.
pub const ENV_ACCESS_TOKEN: &str = "TSUKURU_OPEN_AI_ACCESS_TOKEN";
/// Token variable read when [`ENV_ACCESS_TOKEN`] is unset.
pub const ENV_ACCESS_TOKEN_FALLBACK: &str = "OPENAI_ACCESS_TOKEN";
pub const ENV_MODEL: &str = "TSUKURU_OPEN_AI_MODEL";
pub const ENV_BASE_URL: &str = "TSUKURU_OPEN_AI_BASE_URL";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Upper bound accepted for `max_rounds`.
pub const MAX_ROUNDS_LIMIT: u32 = 10;

/// All canonical tsukuru paths for a project root.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub config_path: PathBuf,
    pub rules_path: PathBuf,
    pub env_path: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_path: root.join(".tsukuru").join("config.toml"),
            rules_path: root.join(".tsukururules"),
            env_path: root.join(".env"),
        }
    }
}

/// Generator configuration (TOML).
///
/// Missing fields fall back to defaults, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TsukuruConfig {
    /// Chat model identifier.
    pub model: String,

    /// Full URL of the chat completions endpoint.
    pub api_url: String,

    /// Maximum number of file-request rounds per session.
    pub max_rounds: u32,

    /// Offer only the finish tool once `max_rounds` is reached.
    pub force_finish_at_cap: bool,

    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    /// Truncate disclosed file bodies beyond this many bytes.
    pub max_file_bytes: usize,

    pub files: FilesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilesConfig {
    /// Extra directory prefixes to hide from the model.
    pub ignored_dirs: Vec<String>,
    /// Extra basename globs to hide from the model.
    pub ignored_patterns: Vec<String>,
    /// Files disclosed before the first README round.
    pub readme_initial: Vec<String>,
    /// Files disclosed before the first RSpec round.
    pub rspec_initial: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: Vec::new(),
            ignored_patterns: Vec::new(),
            readme_initial: owned(GeneratorKind::Readme.default_initial_files()),
            rspec_initial: owned(GeneratorKind::Rspec.default_initial_files()),
        }
    }
}

impl FilesConfig {
    pub fn initial_files(&self, kind: GeneratorKind) -> &[String] {
        match kind {
            GeneratorKind::Readme => &self.readme_initial,
            GeneratorKind::Rspec => &self.rspec_initial,
        }
    }
}

impl Default for TsukuruConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            max_rounds: 3,
            force_finish_at_cap: true,
            request_timeout_secs: 120,
            max_file_bytes: 100_000,
            files: FilesConfig::default(),
        }
    }
}

impl TsukuruConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(anyhow!("api_url must be an http(s) URL"));
        }
        validate_rounds(self.max_rounds)?;
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.max_file_bytes == 0 {
            return Err(anyhow!("max_file_bytes must be > 0"));
        }
        Ok(())
    }
}

fn validate_rounds(max_rounds: u32) -> Result<()> {
    if max_rounds == 0 || max_rounds > MAX_ROUNDS_LIMIT {
        return Err(anyhow!(
            "max_rounds must be between 1 and {MAX_ROUNDS_LIMIT}"
        ));
    }
    Ok(())
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `TsukuruConfig::default()`.
pub fn load_config(path: &Path) -> Result<TsukuruConfig> {
    if !path.exists() {
        let cfg = TsukuruConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: TsukuruConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &TsukuruConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub max_rounds: Option<u32>,
}

/// Fully resolved runtime settings for one invocation.
#[derive(Clone)]
pub struct Settings {
    pub model: String,
    pub api_url: String,
    pub api_key: Option<String>,
    pub max_rounds: u32,
    pub force_finish_at_cap: bool,
    pub request_timeout: Duration,
    pub max_file_bytes: usize,
    pub files: FilesConfig,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_rounds", &self.max_rounds)
            .field("force_finish_at_cap", &self.force_finish_at_cap)
            .field("request_timeout", &self.request_timeout)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("files", &self.files)
            .finish()
    }
}

/// Layer CLI overrides over environment over file config.
///
/// `env` looks up a variable; blank values count as unset.
pub fn resolve_settings<F>(cfg: TsukuruConfig, env: F, overrides: &Overrides) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let model = overrides
        .model
        .clone()
        .or_else(|| lookup(ENV_MODEL))
        .unwrap_or(cfg.model);
    if model.trim().is_empty() {
        return Err(anyhow!("model must be non-empty"));
    }
    let api_url = lookup(ENV_BASE_URL).unwrap_or(cfg.api_url);
    let api_key = lookup(ENV_ACCESS_TOKEN).or_else(|| lookup(ENV_ACCESS_TOKEN_FALLBACK));
    let max_rounds = overrides.max_rounds.unwrap_or(cfg.max_rounds);
    validate_rounds(max_rounds)?;

    Ok(Settings {
        model,
        api_url,
        api_key,
        max_rounds,
        force_finish_at_cap: cfg.force_finish_at_cap,
        request_timeout: Duration::from_secs(cfg.request_timeout_secs),
        max_file_bytes: cfg.max_file_bytes,
        files: cfg.files,
    })
}
