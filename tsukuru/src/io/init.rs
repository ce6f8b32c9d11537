//! Scaffolding for `tsukuru init`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use super::config::{ProjectPaths, TsukuruConfig, write_config};

/// Options for `init_project`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing tsukuru-owned files.
    pub force: bool,
}

/// Write `.tsukuru/config.toml` with defaults and a `.tsukururules` placeholder.
///
/// Fails if the config already exists unless `options.force` is set. An
/// existing rules file is never overwritten.
pub fn init_project(root: &Path, options: &InitOptions) -> Result<ProjectPaths> {
    let paths = ProjectPaths::new(root);
    if paths.config_path.exists() && !options.force {
        return Err(anyhow!(
            "tsukuru init: {} already exists (use --force to overwrite)",
            paths.config_path.display()
        ));
    }
    write_config(&paths.config_path, &TsukuruConfig::default())?;
    if !paths.rules_path.exists() {
        fs::write(&paths.rules_path, RULES_PLACEHOLDER)
            .with_context(|| format!("write file {}", paths.rules_path.display()))?;
    }
    Ok(paths)
}

const RULES_PLACEHOLDER: &str = "";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::load_config;

    #[test]
    fn init_writes_default_config_and_rules() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_project(temp.path(), &InitOptions { force: false }).expect("init");

        assert!(paths.config_path.is_file());
        assert!(paths.rules_path.is_file());
        assert_eq!(
            load_config(&paths.config_path).expect("load"),
            TsukuruConfig::default()
        );
    }

    #[test]
    fn init_without_force_refuses_existing_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_project(temp.path(), &InitOptions { force: false }).expect("init");
        let err = init_project(temp.path(), &InitOptions { force: false }).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn init_with_force_keeps_custom_rules() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_project(temp.path(), &InitOptions { force: false }).expect("init");
        fs::write(&paths.rules_path, "Use FactoryBot.").expect("write rules");
        fs::write(&paths.config_path, "max_rounds = 5\n").expect("write config");

        init_project(temp.path(), &InitOptions { force: true }).expect("re-init");

        assert_eq!(
            fs::read_to_string(&paths.rules_path).expect("read"),
            "Use FactoryBot."
        );
        assert_eq!(load_config(&paths.config_path).expect("load").max_rounds, 3);
    }
}
