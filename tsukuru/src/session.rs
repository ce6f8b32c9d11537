//! The bounded tool-call retrieval loop.
//!
//! Each round sends every disclosed file plus the instruction to the chat
//! backend. The model either asks for more files from the eligible universe or
//! emits the artifact. File requests are honored at most `max_rounds` times;
//! any reply that cannot be acted on ends the session with a
//! [`ProtocolViolation`](crate::core::tools::ProtocolViolation).

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::disclosed::DisclosedFileSet;
use crate::core::rounds::RoundCounter;
use crate::core::tools::{REQUEST_TOOL, decode_action, tool_specs};
use crate::core::types::{Action, Artifact, FileContent, GeneratorKind, ToolChoice};
use crate::io::chat::{ChatClient, ChatRequest};
use crate::io::project::load_contents;
use crate::io::prompt::{PromptEngine, PromptInputs};

/// Knobs for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    /// Maximum number of honored file-request rounds.
    pub max_rounds: u32,
    /// Withhold the request tool once `max_rounds` is reached.
    pub force_finish_at_cap: bool,
    pub max_file_bytes: usize,
}

/// Inputs that describe what to generate.
#[derive(Debug, Clone)]
pub struct SessionRequest<'a> {
    pub kind: GeneratorKind,
    pub instruction: &'a str,
    /// Paths disclosed before the first round.
    pub initial_paths: &'a [String],
    /// Every path the model may ask for.
    pub universe: &'a [String],
    pub rules: Option<&'a str>,
}

/// Progress notifications for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Newly disclosed paths (initial set or a honored request).
    Disclosed { paths: Vec<String> },
    /// Requested paths outside the eligible universe, dropped unread.
    Ignored { paths: Vec<String> },
}

/// Result of a successful session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub artifact: Artifact,
    /// Honored file-request rounds.
    pub rounds_used: u32,
    /// Chat round-trips made, including the final one.
    pub chat_calls: u32,
    pub disclosed: Vec<String>,
}

/// Run the retrieval loop until the model emits an artifact.
///
/// Nothing is written here; the caller persists the returned artifact.
#[instrument(skip_all, fields(kind = request.kind.as_str(), max_rounds = config.max_rounds))]
pub fn run_session<C: ChatClient, F: FnMut(&SessionEvent)>(
    root: &Path,
    client: &C,
    request: &SessionRequest<'_>,
    config: &SessionConfig,
    mut on_event: F,
) -> Result<SessionOutcome> {
    let engine = PromptEngine::new()?;
    let universe: HashSet<&str> = request.universe.iter().map(String::as_str).collect();
    let mut disclosed = DisclosedFileSet::new();
    let mut counter = RoundCounter::new(config.max_rounds);
    let mut chat_calls = 0u32;

    let initial = disclosed.disclose(request.initial_paths.iter().cloned());
    let mut files: Vec<FileContent> = load_contents(root, &initial, config.max_file_bytes)?;
    on_event(&SessionEvent::Disclosed { paths: initial });

    loop {
        let remaining = disclosed.remaining(request.universe);
        let offer_request = !(config.force_finish_at_cap && counter.exhausted());
        let tools = tool_specs(request.kind, &remaining, offer_request);
        let can_request = tools.iter().any(|tool| tool.name == REQUEST_TOOL);
        let tool_choice = if can_request {
            ToolChoice::Required
        } else {
            ToolChoice::Function(request.kind.finish_tool().to_string())
        };

        let prompt = engine.render(&PromptInputs {
            kind: request.kind,
            instruction: request.instruction,
            files: &files,
            rules: request.rules,
            final_round: !can_request,
        })?;

        chat_calls += 1;
        debug!(
            round = chat_calls,
            rounds_used = counter.used(),
            cap = counter.cap(),
            disclosed = disclosed.len(),
            remaining = remaining.len(),
            can_request,
            "starting round"
        );
        let calls = client
            .chat(&ChatRequest {
                model: config.model.clone(),
                system: prompt.system,
                user: prompt.user,
                tools,
                tool_choice,
            })
            .with_context(|| format!("chat round {chat_calls}"))?;

        match decode_action(request.kind, &calls)? {
            Action::Finish(artifact) => {
                info!(
                    rounds_used = counter.used(),
                    chat_calls, "model emitted artifact"
                );
                return Ok(SessionOutcome {
                    artifact,
                    rounds_used: counter.used(),
                    chat_calls,
                    disclosed: disclosed.paths().to_vec(),
                });
            }
            Action::RequestFiles { paths } => {
                counter.record_request()?;
                let (eligible, ignored): (Vec<String>, Vec<String>) = paths
                    .into_iter()
                    .partition(|path| universe.contains(path.as_str()));
                if !ignored.is_empty() {
                    warn!(?ignored, "ignoring paths outside the eligible universe");
                    on_event(&SessionEvent::Ignored { paths: ignored });
                }
                let added = disclosed.disclose(eligible);
                debug!(
                    added = added.len(),
                    rounds_used = counter.used(),
                    "honored file request"
                );
                files.extend(load_contents(root, &added, config.max_file_bytes)?);
                on_event(&SessionEvent::Disclosed { paths: added });
            }
        }
    }
}
