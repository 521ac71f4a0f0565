//! Context summarization over stored messages.
//!
//! [`ContextSummarizer`] reads the newest messages of a collection in
//! batches and grows a window backwards in time for as long as the language
//! model confirms the whole window is one conversation. The largest
//! confirmed window is then summarized.
//!
//! - a batch that breaks the context is dropped and the previous window is
//!   summarized
//! - if the very first batch is already mixed, it is summarized alone
//! - the window never grows past [`SummaryPolicy::max_messages`]
//! - an empty collection has no summary

use crate::{
    event::MessageData,
    llm::{LlmClient, LlmClientExt, LlmError, TranscriptEntry},
    store::{Document, FindOptions, Sort, Store, StoreError, from_document},
};
use chrono::{DateTime, SecondsFormat};
use herald_std::Logger;
use std::sync::Arc;
use thiserror::Error;

/// Field messages are ordered by.
const TIMESTAMP_FIELD: &str = "timestamp";

/// Errors raised while summarizing.
#[derive(Error, Debug)]
pub enum SummaryError {
    /// Reading messages failed.
    #[error("reading messages failed: {0}")]
    Store(#[from] StoreError),

    /// Querying the language model failed.
    #[error("language model failed: {0}")]
    Llm(#[from] LlmError),
}

/// Paging limits for [`ContextSummarizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryPolicy {
    /// Messages fetched per step.
    pub batch_size: usize,
    /// Hard cap on the summarized window.
    pub max_messages: usize,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_messages: 90,
        }
    }
}

/// Summarizes the latest conversation found in a message collection.
pub struct ContextSummarizer {
    store: Arc<dyn Store>,
    llm: Arc<dyn LlmClient>,
    collection: String,
    filter: Document,
    policy: SummaryPolicy,
    logger: Logger,
}

impl ContextSummarizer {
    /// Creates a summarizer over every message in `collection`.
    pub fn new(
        store: Arc<dyn Store>,
        llm: Arc<dyn LlmClient>,
        collection: impl Into<String>,
        logger: Logger,
    ) -> Self {
        Self {
            store,
            llm,
            collection: collection.into(),
            filter: Document::new(),
            policy: SummaryPolicy::default(),
            logger,
        }
    }

    /// Set the paging limits.
    pub fn with_policy(mut self, policy: SummaryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Only consider messages matching `filter`.
    pub fn with_filter(mut self, filter: Document) -> Self {
        self.filter = filter;
        self
    }

    /// Summarizes the latest coherent window; `None` when there are no
    /// messages.
    pub async fn summarize(&self) -> Result<Option<String>, SummaryError> {
        let window = self.latest_context().await?;
        if window.is_empty() {
            self.logger.debug("No messages to summarize.");
            return Ok(None);
        }

        self.logger.debug(format_args!(
            "Summarizing {} messages from {}.",
            window.len(),
            self.collection
        ));
        let summary = self.llm.summarize_messages(&transcript(&window)).await?;
        Ok(Some(summary))
    }

    /// Oldest-first window of the latest messages sharing one context.
    async fn latest_context(&self) -> Result<Vec<MessageData>, SummaryError> {
        let batch_size = self.policy.batch_size.clamp(1, self.policy.max_messages.max(1));
        let mut window: Vec<MessageData> = Vec::new();
        let mut skip = 0;

        loop {
            let mut batch = self.fetch(skip, batch_size).await?;
            if batch.is_empty() {
                break;
            }
            let fetched = batch.len();
            batch.reverse();

            let mut candidate = batch;
            candidate.extend(window.iter().cloned());
            if !window.is_empty() && candidate.len() > self.policy.max_messages {
                break;
            }

            let coherent = self
                .llm
                .are_messages_in_same_context(&transcript(&candidate))
                .await?;
            if !coherent {
                if window.is_empty() {
                    window = candidate;
                }
                break;
            }

            window = candidate;
            skip += fetched;
            if fetched < batch_size {
                break;
            }
        }
        Ok(window)
    }

    /// Newest-first page of messages.
    async fn fetch(&self, skip: usize, limit: usize) -> Result<Vec<MessageData>, SummaryError> {
        let options = FindOptions {
            skip,
            limit,
            sort: Some(Sort::descending(TIMESTAMP_FIELD)),
        };
        self.store
            .get_many(&self.collection, &self.filter, options)
            .await?
            .into_iter()
            .map(|doc| from_document(doc).map_err(SummaryError::from))
            .collect()
    }
}

fn transcript(messages: &[MessageData]) -> Vec<TranscriptEntry> {
    messages
        .iter()
        .map(|msg| TranscriptEntry {
            date: render_timestamp(msg.timestamp),
            text: msg.body.clone(),
        })
        .collect()
}

/// Unix seconds as an RFC 3339 UTC date with milliseconds.
fn render_timestamp(seconds: i64) -> String {
    DateTime::from_timestamp(seconds, 0).map_or_else(
        || seconds.to_string(),
        |date| date.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}
