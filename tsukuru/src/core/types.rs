//! Shared deterministic types for generator sessions.
//!
//! These types define the contract between the retrieval loop, the chat
//! backend and the output writer. They carry no I/O and are cheap to clone.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which artifact a session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Readme,
    Rspec,
}

impl GeneratorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GeneratorKind::Readme => "readme",
            GeneratorKind::Rspec => "rspec",
        }
    }

    /// Name of the tool that emits the final artifact.
    pub fn finish_tool(self) -> &'static str {
        match self {
            GeneratorKind::Readme => "generate_readme",
            GeneratorKind::Rspec => "generate_rspec",
        }
    }

    /// Conventional files disclosed before the first round.
    ///
    /// Entries are either root-relative paths or bare file names resolved by
    /// suffix match against the eligible universe.
    pub fn default_initial_files(self) -> &'static [&'static str] {
        match self {
            GeneratorKind::Readme => &[
                "README.md",
                "Gemfile",
                "config/application.rb",
                "config/database.yml",
                "config/database.yml.sample",
                "config/environments/production.rb",
                "config/environments/staging.rb",
                "config/environments/development.rb",
                "config/environments/test.rb",
                "app/models/user.rb",
                "app/models/admin.rb",
                "app/models/administrator.rb",
            ],
            GeneratorKind::Rspec => &["Gemfile", "package.json", "routes.rb", "ja.yml"],
        }
    }
}

/// A project file loaded for disclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    /// Root-relative path with `/` separators.
    pub path: String,
    pub body: String,
}

/// The final generated artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Readme { content: String },
    Rspec { path: String, code: String },
}

impl Artifact {
    pub fn kind(&self) -> GeneratorKind {
        match self {
            Artifact::Readme { .. } => GeneratorKind::Readme,
            Artifact::Rspec { .. } => GeneratorKind::Rspec,
        }
    }

    /// Text that ends up on disk.
    pub fn body(&self) -> &str {
        match self {
            Artifact::Readme { content } => content,
            Artifact::Rspec { code, .. } => code,
        }
    }
}

/// What the model decided to do in one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Disclose more project files before generating.
    RequestFiles { paths: Vec<String> },
    /// Emit the final artifact.
    Finish(Artifact),
}

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the function arguments.
    pub parameters: Value,
}

/// How strongly the model is steered toward tool use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    /// Any offered tool, but some tool must be called.
    Required,
    /// Exactly this tool must be called.
    Function(String),
}

/// A tool invocation returned by the model. `arguments` is the raw JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}
