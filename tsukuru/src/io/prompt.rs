//! Prompt rendering for the system/user message pair of each round.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::types::{FileContent, GeneratorKind};

const README_SYSTEM_TEMPLATE: &str = include_str!("prompts/readme_system.md");
const README_USER_TEMPLATE: &str = include_str!("prompts/readme_user.md");
const RSPEC_SYSTEM_TEMPLATE: &str = include_str!("prompts/rspec_system.md");
const RSPEC_USER_TEMPLATE: &str = include_str!("prompts/rspec_user.md");

/// Everything one round's messages are rendered from.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub kind: GeneratorKind,
    /// Free-form instruction typed by the user. May be empty.
    pub instruction: &'a str,
    /// Contents of every disclosed file, in disclosure order.
    pub files: &'a [FileContent],
    /// Project rules from `.tsukururules`.
    pub rules: Option<&'a str>,
    /// Set when the model may no longer request files.
    pub final_round: bool,
}

/// Rendered messages for one chat round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("readme_system", README_SYSTEM_TEMPLATE)
            .context("load readme system template")?;
        env.add_template("readme_user", README_USER_TEMPLATE)
            .context("load readme user template")?;
        env.add_template("rspec_system", RSPEC_SYSTEM_TEMPLATE)
            .context("load rspec system template")?;
        env.add_template("rspec_user", RSPEC_USER_TEMPLATE)
            .context("load rspec user template")?;
        Ok(Self { env })
    }

    pub fn render(&self, input: &PromptInputs<'_>) -> Result<RenderedPrompt> {
        let prefix = input.kind.as_str();
        let instruction = input.instruction.trim();
        let rules = input.rules.map(str::trim).filter(|s| !s.is_empty());

        let system = self
            .env
            .get_template(&format!("{prefix}_system"))?
            .render(context! {
                files => input.files,
                rules => rules,
                final_round => input.final_round,
            })
            .with_context(|| format!("render {prefix} system prompt"))?;
        let user = self
            .env
            .get_template(&format!("{prefix}_user"))?
            .render(context! {
                instruction => (!instruction.is_empty()).then_some(instruction),
            })
            .with_context(|| format!("render {prefix} user prompt"))?;

        Ok(RenderedPrompt { system, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<FileContent> {
        vec![
            FileContent {
                path: "Gemfile".to_string(),
                body: "gem 'rails'".to_string(),
            },
            FileContent {
                path: "config/routes.rb".to_string(),
                body: "resources :books".to_string(),
            },
        ]
    }

    #[test]
    fn files_render_as_fenced_blocks_in_order() {
        let engine = PromptEngine::new().expect("engine");
        let files = files();
        let prompt = engine
            .render(&PromptInputs {
                kind: GeneratorKind::Readme,
                instruction: "Mention Docker",
                files: &files,
                rules: None,
                final_round: false,
            })
            .expect("render");

        let gemfile = prompt.system.find("```Gemfile\ngem 'rails'\n```").expect("gemfile block");
        let routes = prompt
            .system
            .find("```config/routes.rb\nresources :books\n```")
            .expect("routes block");
        assert!(gemfile < routes);
        assert!(prompt.system.contains("<contract>"));
        assert!(!prompt.system.contains("<rules>"));
        assert!(!prompt.system.contains("<final>"));
        assert!(prompt.user.contains("<instruction>\nMention Docker\n</instruction>"));
    }

    #[test]
    fn empty_instruction_omits_instruction_block() {
        let engine = PromptEngine::new().expect("engine");
        let prompt = engine
            .render(&PromptInputs {
                kind: GeneratorKind::Readme,
                instruction: "  \n",
                files: &[],
                rules: None,
                final_round: false,
            })
            .expect("render");

        assert!(prompt.user.contains("Write the README."));
        assert!(!prompt.user.contains("<instruction>"));
        assert!(prompt.system.contains("(no files disclosed yet)"));
    }

    #[test]
    fn rspec_prompt_includes_rules_and_final_notice() {
        let engine = PromptEngine::new().expect("engine");
        let files = files();
        let prompt = engine
            .render(&PromptInputs {
                kind: GeneratorKind::Rspec,
                instruction: "Admin manages books",
                files: &files,
                rules: Some("Use FactoryBot."),
                final_round: true,
            })
            .expect("render");

        assert!(prompt.system.contains("RSpec and Capybara"));
        assert!(prompt.system.contains("<rules>"));
        assert!(prompt.system.contains("Use FactoryBot."));
        assert!(prompt.system.contains("Call `generate_rspec` now."));
        assert!(prompt.user.contains("Admin manages books"));
    }
}
