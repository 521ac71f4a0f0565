//! # herald
//!
//! Enriches the event stream of a messaging client: every message posted to
//! one tracked group is persisted to a document store, lifecycle events are
//! logged, and the stored conversation can be summarized by a language model.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald::{
//!     AnthropicClient, ContextSummarizer, EnricherSettings, EventEnricher, HeraldConfig,
//!     MongoStore,
//! };
//! use std::sync::Arc;
//!
//! let config = HeraldConfig::from_env()?;
//! let logger = herald::install_logger(&config)?;
//! let store = Arc::new(MongoStore::from_config(&config).await?);
//!
//! let enricher = EventEnricher::new(
//!     client,
//!     store.clone(),
//!     chats,
//!     EnricherSettings::from(&config),
//!     logger.clone(),
//! );
//! let client = enricher.enrich_and_return()?;
//!
//! let summary = ContextSummarizer::new(
//!     store,
//!     Arc::new(AnthropicClient::from(&config)),
//!     &config.collection,
//!     logger.clone(),
//! )
//! .summarize()
//! .await?;
//! ```
//!
//! Handler composition lives in [`herald_std`]; the contracts in
//! [`herald_core`].

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use herald_core;
pub use herald_std;

pub mod config;
pub mod enricher;
pub mod event;
pub mod llm;
pub mod store;
pub mod summary;

pub use self::config::{ConfigError, HeraldConfig};
pub use enricher::{EnricherSettings, EventEnricher};
pub use event::{ChatDirectory, ChatInfo, ClientEvent, EventKind, IncomingMessage, MessageData};
pub use herald_core::{HandlerError, RegistrationError};
pub use llm::{AnthropicClient, LlmClient, LlmClientExt, LlmError};
pub use store::{MemoryStore, MongoStore, Store, StoreError};
pub use summary::{ContextSummarizer, SummaryError, SummaryPolicy};

use herald_std::{
    Logger,
    logger::{self, TryInitError},
};
use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum HeraldError {
    /// Loading configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Attaching handlers failed.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A handler failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A language model query failed.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Summarizing failed.
    #[error(transparent)]
    Summary(#[from] SummaryError),

    /// A log subscriber was already installed.
    #[error("installing the log subscriber failed: {0}")]
    Logging(#[from] TryInitError),
}

/// Creates the process-wide logger from `config` and installs it as the
/// `tracing` subscriber.
///
/// The first call decides the level and file sink.
pub fn install_logger(config: &HeraldConfig) -> Result<&'static Logger, HeraldError> {
    let logger = logger::global(config.log_level, config.log_file.clone());
    logger.install()?;
    Ok(logger)
}
