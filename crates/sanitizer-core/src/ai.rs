//! Local LLM assistant (Ollama chat API)
//!
//! Every call is fallible. Callers decide what to show when the service is
//! unreachable; nothing here substitutes canned text for a failed request.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AiConfig;
use crate::error::SanitizerError;
use crate::git::{BranchMetadata, CommitSummary};
use crate::types::{StaleReason, UpstreamStatus};

/// Longest diff excerpt sent to the model, in characters
pub const MAX_DIFF_CHARS: usize = 4000;

const EXPLAIN_TOKENS: u32 = 150;
const COMMIT_TOKENS: u32 = 50;
const REVIEW_TOKENS: u32 = 300;
const HISTORY_TOKENS: u32 = 200;

const EXPLAIN_SYSTEM: &str = "You are a senior software engineer. \
    Explain Git branches conservatively. \
    Never recommend deletion unless the branch is merged and inactive. \
    Format your response using Markdown bullet points. \
    Highlight key details like dates or status in **bold**.";

const COMMIT_SYSTEM: &str = "You write semantic git commit messages. \
    Use the Conventional Commits format (e.g. feat: ..., fix: ..., docs: ...). \
    Keep the subject line under 72 characters. \
    Reply with the commit message only.";

const REVIEW_SYSTEM: &str = "You are a senior code reviewer. \
    Identify potential bugs, security issues and improvements in the changes. \
    Be constructive and concise. Format your response using Markdown.";

const HISTORY_SYSTEM: &str = "You are a project manager. \
    Summarize recent development activity from the commit history. \
    Highlight key achievements and changes. Format your response using Markdown.";

/// Everything the assistant is told about a stale branch
#[derive(Debug, Clone)]
pub struct BranchContext<'a> {
    pub name: &'a str,
    pub metadata: &'a BranchMetadata,
    pub upstream_status: UpstreamStatus,
    pub merged_into_base: bool,
    pub reason: StaleReason,
}

/// Natural-language helpers backed by a language model
pub trait Assistant {
    fn explain_branch(&self, branch: &BranchContext<'_>) -> Result<String, SanitizerError>;
    fn commit_message(&self, diff: &str) -> Result<String, SanitizerError>;
    fn code_review(&self, diff: &str) -> Result<String, SanitizerError>;
    fn summarize_history(&self, commits: &[CommitSummary]) -> Result<String, SanitizerError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    num_ctx: u32,
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Blocking client for an Ollama `/api/chat` endpoint
pub struct OllamaClient {
    http: reqwest::blocking::Client,
    config: AiConfig,
}

impl OllamaClient {
    pub fn new(config: &AiConfig) -> Result<Self, SanitizerError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SanitizerError::AiService(e.to_string()))?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    fn chat(&self, system: &str, user: &str, num_predict: u32) -> Result<String, SanitizerError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream: false,
            options: ChatOptions {
                num_ctx: self.config.num_ctx,
                temperature: self.config.temperature,
                num_predict,
            },
        };

        debug!(endpoint = %self.config.endpoint, model = %self.config.model, "ai request");
        let body = self
            .http
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| SanitizerError::AiService(e.to_string()))?;

        parse_chat_response(&body)
    }
}

impl Assistant for OllamaClient {
    fn explain_branch(&self, branch: &BranchContext<'_>) -> Result<String, SanitizerError> {
        self.chat(EXPLAIN_SYSTEM, &explain_prompt(branch), EXPLAIN_TOKENS)
    }

    fn commit_message(&self, diff: &str) -> Result<String, SanitizerError> {
        let raw = self.chat(COMMIT_SYSTEM, &commit_prompt(diff), COMMIT_TOKENS)?;
        Ok(raw.trim_matches('"').to_string())
    }

    fn code_review(&self, diff: &str) -> Result<String, SanitizerError> {
        self.chat(REVIEW_SYSTEM, &review_prompt(diff), REVIEW_TOKENS)
    }

    fn summarize_history(&self, commits: &[CommitSummary]) -> Result<String, SanitizerError> {
        self.chat(HISTORY_SYSTEM, &history_prompt(commits), HISTORY_TOKENS)
    }
}

/// Extract the assistant message from a non-streaming chat response
fn parse_chat_response(body: &str) -> Result<String, SanitizerError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| SanitizerError::AiResponse(e.to_string()))?;
    let content = response.message.content.trim();
    if content.is_empty() {
        return Err(SanitizerError::AiResponse("empty message".to_string()));
    }
    Ok(content.to_string())
}

/// First `MAX_DIFF_CHARS` characters of `diff`
pub fn truncate_diff(diff: &str) -> &str {
    match diff.char_indices().nth(MAX_DIFF_CHARS) {
        Some((end, _)) => &diff[..end],
        None => diff,
    }
}

fn explain_prompt(branch: &BranchContext<'_>) -> String {
    format!(
        "Branch name: {}\n\
         Last commit message: {}\n\
         Last commit date: {}\n\
         Commit count: {}\n\
         Merged: {}\n\
         Upstream status: {}\n\
         Flagged because: {}\n\n\
         Explain why this branch is considered stale.",
        branch.name,
        branch.metadata.last_commit_message,
        branch.metadata.last_commit_date,
        branch.metadata.commit_count,
        branch.merged_into_base,
        branch.upstream_status,
        branch.reason,
    )
}

fn commit_prompt(diff: &str) -> String {
    format!(
        "Generate a commit message for the following changes:\n\n{}",
        truncate_diff(diff)
    )
}

fn review_prompt(diff: &str) -> String {
    format!("Review the following changes:\n\n{}", truncate_diff(diff))
}

fn history_prompt(commits: &[CommitSummary]) -> String {
    let lines: Vec<String> = commits
        .iter()
        .map(|c| format!("- {} ({}): {}", c.hash, c.author, c.message))
        .collect();
    format!(
        "Summarize the following commit history:\n\n{}",
        lines.join("\n")
    )
}
