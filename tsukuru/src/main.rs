//! LLM-driven README and RSpec generator for Rails projects.
//!
//! `tsukuru readme` and `tsukuru rspec` read an instruction from the terminal,
//! let the model pull in project files over a few bounded rounds, and write
//! the generated file once.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tsukuru::core::path_filter::PathFilter;
use tsukuru::core::tools::ProtocolViolation;
use tsukuru::core::types::GeneratorKind;
use tsukuru::exit_codes;
use tsukuru::generate::{GenerateOptions, run_generator};
use tsukuru::io::chat::OpenAiClient;
use tsukuru::io::config::{
    MAX_ROUNDS_LIMIT, Overrides, ProjectPaths, Settings, load_config, resolve_settings,
};
use tsukuru::io::init::{InitOptions, init_project};
use tsukuru::io::project::eligible_paths;
use tsukuru::logging;

#[derive(Parser)]
#[command(
    name = "tsukuru",
    version,
    about = "Generate a README or RSpec tests for a Rails project with an LLM"
)]
struct Cli {
    /// Project root (defaults to the current directory).
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate README.md from the project's files.
    Readme {
        /// Write somewhere other than README.md (relative to the root).
        #[arg(short, long)]
        output: Option<String>,
        #[command(flatten)]
        llm: LlmArgs,
    },
    /// Generate an RSpec test file at a path chosen by the model.
    Rspec {
        #[command(flatten)]
        llm: LlmArgs,
    },
    /// Print every project path the model may request.
    Files,
    /// Create `.tsukuru/config.toml` and `.tsukururules`.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct LlmArgs {
    /// Chat model (overrides TSUKURU_OPEN_AI_MODEL and the config file).
    #[arg(long)]
    model: Option<String>,
    /// Maximum file-request rounds before the model must finish.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_ROUNDS_LIMIT as i64))]
    max_rounds: Option<u32>,
}

impl From<LlmArgs> for Overrides {
    fn from(args: LlmArgs) -> Self {
        Overrides {
            model: args.model,
            max_rounds: args.max_rounds,
        }
    }
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        let code = if err.downcast_ref::<ProtocolViolation>().is_some() {
            exit_codes::PROTOCOL
        } else {
            exit_codes::INVALID
        };
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let root = cli.root;
    match cli.command {
        Command::Readme { output, llm } => cmd_generate(
            &root,
            GeneratorKind::Readme,
            llm.into(),
            GenerateOptions {
                readme_output: output,
            },
        ),
        Command::Rspec { llm } => cmd_generate(
            &root,
            GeneratorKind::Rspec,
            llm.into(),
            GenerateOptions::default(),
        ),
        Command::Files => cmd_files(&root),
        Command::Init { force } => cmd_init(&root, force),
    }
}

fn cmd_generate(
    root: &Path,
    kind: GeneratorKind,
    overrides: Overrides,
    options: GenerateOptions,
) -> Result<()> {
    let settings = load_settings(root, &overrides)?;
    debug!(?settings, "resolved settings");
    let client = OpenAiClient::new(
        settings.api_url.clone(),
        settings.api_key.clone(),
        settings.request_timeout,
    )?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_generator(
        root,
        kind,
        &settings,
        &options,
        &client,
        stdin.lock(),
        &mut stdout,
    )?;
    Ok(())
}

fn cmd_files(root: &Path) -> Result<()> {
    let cfg = load_config(&ProjectPaths::new(root).config_path)?;
    let filter = PathFilter::new(&cfg.files.ignored_dirs, &cfg.files.ignored_patterns)?;
    for path in eligible_paths(root, &filter)? {
        println!("{path}");
    }
    Ok(())
}

fn cmd_init(root: &Path, force: bool) -> Result<()> {
    let paths = init_project(root, &InitOptions { force })?;
    println!("wrote {}", paths.config_path.display());
    Ok(())
}

/// Config file, then `.env` and process environment, then CLI flags.
fn load_settings(root: &Path, overrides: &Overrides) -> Result<Settings> {
    let paths = ProjectPaths::new(root);
    if paths.env_path.is_file() {
        dotenvy::from_path(&paths.env_path)
            .with_context(|| format!("load {}", paths.env_path.display()))?;
    }
    let cfg = load_config(&paths.config_path)?;
    resolve_settings(cfg, |key| std::env::var(key).ok(), overrides)
}
