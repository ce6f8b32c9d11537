//! Tool schemas offered to the model and decoding of its replies.
//!
//! The model answers every round with tool calls. Decoding turns those calls
//! into exactly one [`Action`] or a [`ProtocolViolation`]; nothing here is
//! repaired or retried.

use std::fmt;
use std::path::{Component, Path};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::types::{Action, Artifact, GeneratorKind, ToolCall, ToolSpec};

/// Name of the tool that asks for more project files.
pub const REQUEST_TOOL: &str = "contents";

/// A reply the session cannot act on. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// The reply carried no tool call at all.
    NoToolCall,
    /// The reply named a tool that was never offered.
    UnknownAction { name: String },
    /// The arguments of a known tool did not decode.
    MalformedArguments { tool: String, reason: String },
    /// More files were requested after the round cap was reached.
    RoundCapExceeded { cap: u32 },
    /// The generated file would land outside the project root.
    UnsafeTargetPath { path: String },
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolViolation::NoToolCall => write!(f, "model reply carried no tool call"),
            ProtocolViolation::UnknownAction { name } => {
                write!(f, "model called unknown tool {name:?}")
            }
            ProtocolViolation::MalformedArguments { tool, reason } => {
                write!(f, "malformed arguments for {tool}: {reason}")
            }
            ProtocolViolation::RoundCapExceeded { cap } => {
                write!(f, "model requested more files after {cap} round(s)")
            }
            ProtocolViolation::UnsafeTargetPath { path } => {
                write!(f, "refusing to write outside the project root: {path:?}")
            }
        }
    }
}

impl std::error::Error for ProtocolViolation {}

#[derive(Debug, Deserialize)]
struct ContentsArgs {
    file_paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReadmeArgs {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RspecArgs {
    path: String,
    code: String,
}

/// Build the tool list for one round.
///
/// The request tool is offered only when `offer_request` is set and there is
/// something left to enumerate.
pub fn tool_specs(kind: GeneratorKind, remaining: &[&str], offer_request: bool) -> Vec<ToolSpec> {
    let mut tools = Vec::with_capacity(2);
    if offer_request && !remaining.is_empty() {
        tools.push(request_tool(kind, remaining));
    }
    tools.push(finish_tool(kind));
    tools
}

fn request_tool(kind: GeneratorKind, remaining: &[&str]) -> ToolSpec {
    let purpose = match kind {
        GeneratorKind::Readme => "write an accurate README",
        GeneratorKind::Rspec => "write accurate RSpec tests",
    };
    ToolSpec {
        name: REQUEST_TOOL.to_string(),
        description: format!(
            "Fetch the contents of project files you need to {purpose}. \
             Ask for everything you need at once."
        ),
        parameters: json!({
            "type": "object",
            "properties": {
                "file_paths": {
                    "type": "array",
                    "description": "Paths relative to the project root. Several may be given.",
                    "items": { "type": "string", "enum": remaining },
                },
            },
            "required": ["file_paths"],
        }),
    }
}

fn finish_tool(kind: GeneratorKind) -> ToolSpec {
    match kind {
        GeneratorKind::Readme => ToolSpec {
            name: kind.finish_tool().to_string(),
            description: "Write the README file. Pass the full README as Markdown.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "README content in Markdown.",
                    },
                },
                "required": ["content"],
            }),
        },
        GeneratorKind::Rspec => ToolSpec {
            name: kind.finish_tool().to_string(),
            description: "Write the RSpec test file.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Spec file path relative to the project root. Must live under spec/ and end in _spec.rb, e.g. spec/system/books_spec.rb.",
                    },
                    "code": {
                        "type": "string",
                        "description": "Complete Ruby source of the spec file.",
                    },
                },
                "required": ["path", "code"],
            }),
        },
    }
}

/// Decode the tool calls of one reply into a single action.
///
/// Request calls are merged. A finish call anywhere in the reply wins.
pub fn decode_action(kind: GeneratorKind, calls: &[ToolCall]) -> Result<Action, ProtocolViolation> {
    if calls.is_empty() {
        return Err(ProtocolViolation::NoToolCall);
    }
    if let Some(unknown) = calls
        .iter()
        .find(|call| call.name != REQUEST_TOOL && call.name != kind.finish_tool())
    {
        return Err(ProtocolViolation::UnknownAction {
            name: unknown.name.clone(),
        });
    }

    if let Some(finish) = calls.iter().find(|call| call.name == kind.finish_tool()) {
        return decode_finish(kind, finish).map(Action::Finish);
    }

    let mut paths = Vec::new();
    for call in calls {
        let args: ContentsArgs = parse_args(call)?;
        paths.extend(args.file_paths);
    }
    Ok(Action::RequestFiles { paths })
}

fn decode_finish(kind: GeneratorKind, call: &ToolCall) -> Result<Artifact, ProtocolViolation> {
    match kind {
        GeneratorKind::Readme => {
            let args: ReadmeArgs = parse_args(call)?;
            Ok(Artifact::Readme {
                content: args.content,
            })
        }
        GeneratorKind::Rspec => {
            let args: RspecArgs = parse_args(call)?;
            let path = args.path.trim().to_string();
            check_spec_path(&path)?;
            Ok(Artifact::Rspec {
                path,
                code: args.code,
            })
        }
    }
}

fn parse_args<T: DeserializeOwned>(call: &ToolCall) -> Result<T, ProtocolViolation> {
    serde_json::from_str(&call.arguments).map_err(|err| ProtocolViolation::MalformedArguments {
        tool: call.name.clone(),
        reason: err.to_string(),
    })
}

/// True for a non-empty relative path of normal, non-hidden components.
pub fn is_plain_relative_path(path: &str) -> bool {
    if path.is_empty() || path.contains('\\') {
        return false;
    }
    Path::new(path).components().all(|c| match c {
        Component::Normal(part) => !part.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Accept only `spec/**/*_spec.rb` targets for generated RSpec files.
pub fn check_spec_path(path: &str) -> Result<(), ProtocolViolation> {
    if is_plain_relative_path(path) && path.starts_with("spec/") && path.ends_with("_spec.rb") {
        return Ok(());
    }
    Err(ProtocolViolation::UnsafeTargetPath {
        path: path.to_string(),
    })
}
