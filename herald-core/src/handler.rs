//! # Gated Handlers
//!
//! An [`EventHandler`] receives one event occurrence and settles it with
//! exactly one terminal outcome: skipped by its gate, delivered, or failed.
//!
//! This trait uses native `async fn` for static dispatch. Event sources keep
//! handlers of different concrete types side by side through
//! [`DynEventHandler`] and [`SharedHandler`].

use crate::{error::HandlerError, message::Message};
use futures::future::BoxFuture;
use std::{future::Future, sync::Arc};

/// The successful outcome of a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The gate denied the event; nothing else ran.
    Skipped,
    /// The event was transformed and the success callback ran.
    Delivered,
}

/// A handler bound to a single event occurrence.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `EventHandler<{E}>`",
    label = "missing `EventHandler` implementation",
    note = "Handlers must implement `handle` for the specific event type `{E}`."
)]
pub trait EventHandler<E: Message>: Send + Sync + 'static {
    /// Processes one event.
    fn handle(&self, event: E) -> impl Future<Output = Result<Outcome, HandlerError>> + Send;
}

/// Dynamic object-safe version of [`EventHandler`].
pub trait DynEventHandler<E: Message>: Send + Sync + 'static {
    /// Processes one event (dynamic dispatch version).
    fn handle_dyn(&self, event: E) -> BoxFuture<'_, Result<Outcome, HandlerError>>;
}

// Any type implementing EventHandler implements DynEventHandler automatically.
impl<E: Message, T: EventHandler<E>> DynEventHandler<E> for T {
    fn handle_dyn(&self, event: E) -> BoxFuture<'_, Result<Outcome, HandlerError>> {
        Box::pin(self.handle(event))
    }
}

/// A type-erased handler shared between an event source and its dispatch loop.
pub type SharedHandler<E> = Arc<dyn DynEventHandler<E>>;

impl<E: Message> EventHandler<E> for SharedHandler<E> {
    async fn handle(&self, event: E) -> Result<Outcome, HandlerError> {
        (**self).handle_dyn(event).await
    }
}
