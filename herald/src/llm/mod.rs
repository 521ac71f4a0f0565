//! Language model queries.
//!
//! [`LlmClient`] is the single `ask` call a backend must provide. The
//! transcript-based helpers in [`LlmClientExt`] are built on top of it and
//! available to every client.

mod anthropic;

pub use anthropic::{AnthropicClient, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while querying a language model.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("api returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

/// Per-request overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskOptions {
    /// Model name; the client default when `None`.
    pub model: Option<String>,
    /// Completion budget; the client default when `None`.
    pub max_tokens: Option<u32>,
    /// System prompt.
    pub system: Option<String>,
}

impl AskOptions {
    /// Options with only a token budget.
    pub fn max_tokens(max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..Self::default()
        }
    }
}

/// A language model answering one prompt at a time.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends `prompt` and returns the text of the answer.
    async fn ask(&self, prompt: &str, options: AskOptions) -> Result<String, LlmError>;
}

/// One line of a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// Rendered date of the message.
    pub date: String,
    /// Message text.
    pub text: String,
}

/// Renders entries as `N. [date] text` lines, numbered from 1.
pub fn format_transcript(entries: &[TranscriptEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| format!("{}. [{}] {}", idx + 1, entry.date, entry.text))
        .collect::<Vec<_>>()
        .join("\n")
}

const SAME_CONTEXT_MAX_TOKENS: u32 = 5;
const SUMMARY_MAX_TOKENS: u32 = 150;

fn same_context_prompt(transcript: &str) -> String {
    format!(
        "Given the following list of messages, answer ONLY true or false. \
         Be VERY STRICT: if even one message is out of topic/context, return false.\n\n\
         Messages:\n{transcript}\n\n\
         Are all messages in the same context? Answer ONLY true or false."
    )
}

fn summary_prompt(transcript: &str) -> String {
    format!(
        "Summarize the following messages in a concise way, focusing ONLY on the \
         main idea or topic that most messages share. If some messages are out of \
         topic, ignore them.\n\n\
         Messages:\n{transcript}\n\n\
         Summary:"
    )
}

/// Transcript helpers available on every [`LlmClient`].
#[async_trait]
pub trait LlmClientExt: LlmClient {
    /// Asks whether every entry belongs to one topic.
    ///
    /// Anything but a case-insensitive `true` answer counts as `false`.
    async fn are_messages_in_same_context(
        &self,
        entries: &[TranscriptEntry],
    ) -> Result<bool, LlmError> {
        let prompt = same_context_prompt(&format_transcript(entries));
        let answer = self
            .ask(&prompt, AskOptions::max_tokens(SAME_CONTEXT_MAX_TOKENS))
            .await?;
        Ok(answer.trim().eq_ignore_ascii_case("true"))
    }

    /// Summarizes the topic most entries share.
    async fn summarize_messages(&self, entries: &[TranscriptEntry]) -> Result<String, LlmError> {
        let prompt = summary_prompt(&format_transcript(entries));
        self.ask(&prompt, AskOptions::max_tokens(SUMMARY_MAX_TOKENS))
            .await
    }
}

impl<T: LlmClient + ?Sized> LlmClientExt for T {}
