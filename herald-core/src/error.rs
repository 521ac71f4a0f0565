//! Error types for Herald.
//!
//! - [`HandlerError`] - a failure inside a gated handler, tagged with its stage
//! - [`RegistrationError`] - attaching a handler to an event source failed

use std::{fmt, sync::Arc};
use thiserror::Error;

/// A boxed error type for collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A shared, cloneable error.
///
/// Handler errors are handed to the error sink and then returned to the
/// caller; both see the same underlying allocation.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The stage of a gated handler that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Gate evaluation.
    Predicate,
    /// Shaping the event into message data.
    Transform,
    /// The success callback, typically persistence.
    Delivery,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Predicate => "predicate",
            Stage::Transform => "transform",
            Stage::Delivery => "delivery",
        })
    }
}

/// A failure raised while a gated handler processed one event.
#[derive(Error, Debug, Clone)]
pub enum HandlerError {
    /// The predicate failed.
    #[error("predicate failed: {0}")]
    Predicate(#[source] SharedError),

    /// The transform failed.
    #[error("transform failed: {0}")]
    Transform(#[source] SharedError),

    /// The success callback failed.
    #[error("delivery failed: {0}")]
    Delivery(#[source] SharedError),
}

impl HandlerError {
    /// Wraps an error raised by the predicate.
    pub fn predicate(err: BoxError) -> Self {
        HandlerError::Predicate(Arc::from(err))
    }

    /// Wraps an error raised by the transform.
    pub fn transform(err: BoxError) -> Self {
        HandlerError::Transform(Arc::from(err))
    }

    /// Wraps an error raised by the success callback.
    pub fn delivery(err: BoxError) -> Self {
        HandlerError::Delivery(Arc::from(err))
    }

    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            HandlerError::Predicate(_) => Stage::Predicate,
            HandlerError::Transform(_) => Stage::Transform,
            HandlerError::Delivery(_) => Stage::Delivery,
        }
    }

    /// The error raised by the collaborator.
    pub fn inner(&self) -> &SharedError {
        match self {
            HandlerError::Predicate(err)
            | HandlerError::Transform(err)
            | HandlerError::Delivery(err) => err,
        }
    }
}

/// Errors that can occur while attaching handlers to an event source.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Handlers were already registered for this process.
    #[error("handlers are already registered")]
    AlreadyRegistered,

    /// The event source no longer accepts handlers.
    #[error("event source is closed")]
    Closed,

    /// The event source rejected the handler.
    #[error("event source rejected handler for {kind}: {source}")]
    Rejected {
        /// The event kind being registered.
        kind: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },
}
