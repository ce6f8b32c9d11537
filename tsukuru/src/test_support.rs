//! Test-only helpers: a fixture Rails project and a scripted chat backend.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow};
use serde_json::json;
use tempfile::TempDir;

use crate::core::path_filter::PathFilter;
use crate::core::tools::REQUEST_TOOL;
use crate::core::types::ToolCall;
use crate::io::chat::{ChatClient, ChatRequest};
use crate::io::project::eligible_paths;

/// A throwaway project root with a minimal Rails layout.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn empty() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn rails() -> Result<Self> {
        let project = Self::empty()?;
        project.write("Gemfile", "source 'https://rubygems.org'\ngem 'rails', '~> 7.1'\n")?;
        project.write(
            "config/application.rb",
            "module Bookshelf\n  class Application < Rails::Application\n  end\nend\n",
        )?;
        project.write("config/routes.rb", "Rails.application.routes.draw do\n  resources :books\nend\n")?;
        project.write("config/locales/ja.yml", "ja:\n  books: 本\n")?;
        project.write("config/database.yml", "production:\n  adapter: postgresql\n")?;
        project.write("app/models/user.rb", "class User < ApplicationRecord\nend\n")?;
        project.write("app/models/book.rb", "class Book < ApplicationRecord\nend\n")?;
        project.write("db/schema.rb", "ActiveRecord::Schema[7.1].define do\nend\n")?;
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` at a root-relative path, creating parents.
    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Eligible paths under the default ignore rules.
    pub fn universe(&self) -> Result<Vec<String>> {
        eligible_paths(self.root(), &PathFilter::new(&[], &[])?)
    }
}

/// Chat backend that replays canned replies and records every request.
pub struct ScriptedChatClient {
    replies: RefCell<VecDeque<Vec<ToolCall>>>,
    requests: RefCell<Vec<ChatRequest>>,
}

impl ScriptedChatClient {
    pub fn new(replies: Vec<Vec<ToolCall>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }
}

impl ChatClient for ScriptedChatClient {
    fn chat(&self, request: &ChatRequest) -> Result<Vec<ToolCall>> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted chat client has no replies left"))
    }
}

/// A reply asking for `paths`.
pub fn request_files(paths: &[&str]) -> Vec<ToolCall> {
    vec![ToolCall::new(
        REQUEST_TOOL,
        json!({ "file_paths": paths }).to_string(),
    )]
}

/// A reply emitting README content.
pub fn finish_readme(content: &str) -> Vec<ToolCall> {
    vec![ToolCall::new(
        "generate_readme",
        json!({ "content": content }).to_string(),
    )]
}

/// A reply emitting an RSpec file.
pub fn finish_rspec(path: &str, code: &str) -> Vec<ToolCall> {
    vec![ToolCall::new(
        "generate_rspec",
        json!({ "path": path, "code": code }).to_string(),
    )]
}
