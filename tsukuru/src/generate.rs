//! Orchestration for `tsukuru readme` and `tsukuru rspec`.
//!
//! Reads the instruction, discovers project files, runs the retrieval session
//! and writes the artifact exactly once on success.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::instrument;

use crate::core::path_filter::PathFilter;
use crate::core::types::GeneratorKind;
use crate::io::chat::ChatClient;
use crate::io::config::{ProjectPaths, Settings};
use crate::io::instruction::{banner, read_instruction};
use crate::io::output::{check_readme_output, target_path, write_artifact};
use crate::io::project::{eligible_paths, read_rules, resolve_initial_files};
use crate::session::{SessionConfig, SessionEvent, SessionRequest, run_session};

/// Per-command options that are not part of [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// README destination relative to the root (defaults to `README.md`).
    pub readme_output: Option<String>,
}

/// Summary of a finished generator command.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub written: PathBuf,
    pub rounds_used: u32,
    pub disclosed: Vec<String>,
}

/// Run one generator end to end against `root`.
#[instrument(skip_all, fields(kind = kind.as_str(), root = %root.display()))]
pub fn run_generator<C, R, W>(
    root: &Path,
    kind: GeneratorKind,
    settings: &Settings,
    options: &GenerateOptions,
    client: &C,
    input: R,
    out: &mut W,
) -> Result<GenerateOutcome>
where
    C: ChatClient,
    R: BufRead,
    W: Write,
{
    if let Some(rel) = options.readme_output.as_deref() {
        check_readme_output(rel)?;
    }
    let paths = ProjectPaths::new(root);
    writeln!(out, "{}", banner(kind)).context("write banner")?;
    let instruction = read_instruction(kind, input, out)?;

    let filter = PathFilter::new(&settings.files.ignored_dirs, &settings.files.ignored_patterns)?;
    let universe = eligible_paths(root, &filter)?;
    let initial = resolve_initial_files(settings.files.initial_files(kind), &universe);
    let rules = read_rules(&paths.rules_path)?;

    writeln!(out, "Generating...").context("write progress")?;
    writeln!(out, "Reading files:").context("write progress")?;
    let mut report_err: Option<std::io::Error> = None;
    let outcome = run_session(
        root,
        client,
        &SessionRequest {
            kind,
            instruction: &instruction,
            initial_paths: &initial,
            universe: &universe,
            rules: rules.as_deref(),
        },
        &SessionConfig {
            model: settings.model.clone(),
            max_rounds: settings.max_rounds,
            force_finish_at_cap: settings.force_finish_at_cap,
            max_file_bytes: settings.max_file_bytes,
        },
        |event| {
            if report_err.is_some() {
                return;
            }
            if let Err(err) = report_event(out, event) {
                report_err = Some(err);
            }
        },
    )?;
    if let Some(err) = report_err {
        return Err(err).context("write progress");
    }

    let rel = target_path(&outcome.artifact, options.readme_output.as_deref());
    let written = write_artifact(root, &rel, &outcome.artifact)?;
    writeln!(out, "{rel} generated").context("write result")?;

    Ok(GenerateOutcome {
        written,
        rounds_used: outcome.rounds_used,
        disclosed: outcome.disclosed,
    })
}

fn report_event<W: Write>(out: &mut W, event: &SessionEvent) -> std::io::Result<()> {
    match event {
        SessionEvent::Disclosed { paths } => {
            for path in paths {
                writeln!(out, "- {path}")?;
            }
        }
        SessionEvent::Ignored { paths } => {
            for path in paths {
                writeln!(out, "  (not available: {path})")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tools::ProtocolViolation;
    use crate::io::config::{Overrides, TsukuruConfig, resolve_settings};
    use crate::test_support::{
        ScriptedChatClient, TestProject, finish_readme, finish_rspec, request_files,
    };
    use std::fs;
    use std::io::Cursor;

    fn settings(max_rounds: u32) -> Settings {
        let overrides = Overrides {
            model: Some("test-model".to_string()),
            max_rounds: Some(max_rounds),
        };
        resolve_settings(TsukuruConfig::default(), |_| None, &overrides).expect("settings")
    }

    #[test]
    fn readme_written_once_with_model_content() {
        let project = TestProject::rails().expect("project");
        let client = ScriptedChatClient::new(vec![
            request_files(&["config/routes.rb"]),
            request_files(&["app/models/book.rb"]),
            finish_readme("# Bookshelf\n\nRuns on PostgreSQL."),
        ]);
        let mut out = Vec::new();

        let outcome = run_generator(
            project.root(),
            GeneratorKind::Readme,
            &settings(3),
            &GenerateOptions::default(),
            &client,
            Cursor::new("Mention PostgreSQL\n\n"),
            &mut out,
        )
        .expect("generate");

        assert_eq!(outcome.written, project.root().join("README.md"));
        assert_eq!(outcome.rounds_used, 2);
        assert_eq!(
            fs::read_to_string(&outcome.written).expect("read"),
            "# Bookshelf\n\nRuns on PostgreSQL.\n"
        );
        let out = String::from_utf8(out).expect("utf8");
        assert!(out.contains("- config/routes.rb"));
        assert!(out.contains("README.md generated"));
        assert!(client.requests()[0].user.contains("Mention PostgreSQL"));
    }

    #[test]
    fn rspec_lands_at_model_chosen_path_with_rules() {
        let project = TestProject::rails().expect("project");
        project.write(".tsukururules", "Use FactoryBot.").expect("write");
        let client = ScriptedChatClient::new(vec![finish_rspec(
            "spec/system/books_spec.rb",
            "RSpec.describe 'Books', type: :system do\nend",
        )]);
        let mut out = Vec::new();

        let outcome = run_generator(
            project.root(),
            GeneratorKind::Rspec,
            &settings(3),
            &GenerateOptions::default(),
            &client,
            Cursor::new("\nAdmin manages books\n\n"),
            &mut out,
        )
        .expect("generate");

        assert_eq!(
            outcome.written,
            project.root().join("spec/system/books_spec.rb")
        );
        assert_eq!(
            outcome.disclosed,
            vec!["Gemfile", "config/routes.rb", "config/locales/ja.yml"]
        );
        let request = &client.requests()[0];
        assert!(request.system.contains("Use FactoryBot."));
        assert!(request.user.contains("Admin manages books"));
    }

    #[test]
    fn bad_readme_output_fails_before_any_chat_round() {
        let project = TestProject::rails().expect("project");
        let client = ScriptedChatClient::new(vec![finish_readme("# App")]);
        let mut out = Vec::new();

        let err = run_generator(
            project.root(),
            GeneratorKind::Readme,
            &settings(3),
            &GenerateOptions {
                readme_output: Some("/tmp/README.md".to_string()),
            },
            &client,
            Cursor::new("Mention PostgreSQL\n\n"),
            &mut out,
        )
        .unwrap_err();

        assert!(err.downcast_ref::<ProtocolViolation>().is_none());
        assert!(err.to_string().contains("/tmp/README.md"));
        assert!(client.requests().is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn rspec_aimed_at_project_files_writes_nothing() {
        let project = TestProject::rails().expect("project");
        project.write(".git/config", "[core]\n").expect("write");
        let gemfile = fs::read_to_string(project.root().join("Gemfile")).expect("read");

        for target in ["Gemfile", ".git/config", ".tsukuru/config.toml", "spec/../Gemfile"] {
            let client = ScriptedChatClient::new(vec![finish_rspec(target, "PWNED")]);
            let mut out = Vec::new();

            let err = run_generator(
                project.root(),
                GeneratorKind::Rspec,
                &settings(3),
                &GenerateOptions::default(),
                &client,
                Cursor::new("Admin manages books\n"),
                &mut out,
            )
            .unwrap_err();

            assert_eq!(
                err.downcast_ref::<ProtocolViolation>(),
                Some(&ProtocolViolation::UnsafeTargetPath {
                    path: target.to_string()
                })
            );
        }
        assert_eq!(
            fs::read_to_string(project.root().join("Gemfile")).expect("read"),
            gemfile
        );
        assert_eq!(
            fs::read_to_string(project.root().join(".git/config")).expect("read"),
            "[core]\n"
        );
        assert!(!project.root().join(".tsukuru/config.toml").exists());
    }

    #[test]
    fn protocol_violation_writes_nothing() {
        let project = TestProject::rails().expect("project");
        let client = ScriptedChatClient::new(vec![
            request_files(&["config/routes.rb"]),
            request_files(&["app/models/book.rb"]),
        ]);
        let mut out = Vec::new();

        let err = run_generator(
            project.root(),
            GeneratorKind::Readme,
            &settings(1),
            &GenerateOptions::default(),
            &client,
            Cursor::new("\n"),
            &mut out,
        )
        .unwrap_err();

        assert!(err.downcast_ref::<ProtocolViolation>().is_some());
        assert!(!project.root().join("README.md").exists());
    }
}
