//! # herald-core
//!
//! Core traits for the Herald gated event handler framework.
//!
//! This crate has minimal dependencies and is meant to be imported by event
//! source adapters and collaborators that don't need `herald-std`.
//!
//! # Building Blocks
//!
//! - [`Callback`] - a collaborator function tagged as synchronous or
//!   suspending, so normalizing its calling convention is a total match
//! - [`EventHandler`] - receives one event and settles it as
//!   [`Outcome::Skipped`], [`Outcome::Delivered`] or a [`HandlerError`]
//! - [`EventSource`] - the external producer that accepts handlers per kind
//!
//! # Error Types
//!
//! - [`HandlerError`] - predicate, transform or delivery failures
//! - [`RegistrationError`] - attaching handlers to a source failed

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod callback;
mod error;
mod handler;
mod message;
mod source;

// Re-exports
pub use callback::{Callback, SuspendingFn, SyncFn};
pub use error::{BoxError, HandlerError, RegistrationError, SharedError, Stage};
pub use handler::{DynEventHandler, EventHandler, Outcome, SharedHandler};
pub use message::{Event, Message};
pub use source::EventSource;
