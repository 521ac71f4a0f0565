//! In-process event source.
//!
//! [`LocalEventSource`] keeps handlers per event kind and dispatches emitted
//! events to them sequentially, in registration order. A failing handler is
//! logged and dispatch continues with the next one.

use crate::logger::Logger;
use herald_core::{
    DynEventHandler, Event, EventSource, HandlerError, Outcome, RegistrationError, SharedHandler,
};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

/// An event source driven by [`LocalEventSource::emit`].
pub struct LocalEventSource<E: Event> {
    handlers: RwLock<HashMap<E::Kind, Vec<SharedHandler<E>>>>,
    closed: AtomicBool,
    logger: Logger,
}

impl<E: Event> fmt::Debug for LocalEventSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("LocalEventSource")
            .field("kinds", &handlers.keys().collect::<Vec<_>>())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<E: Event> LocalEventSource<E> {
    /// Creates an open source with no handlers.
    pub fn new(logger: Logger) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            logger,
        }
    }

    /// Dispatches `event` to every handler registered for its kind.
    ///
    /// Returns one result per handler, in registration order. Events of a
    /// kind nobody listens to yield an empty vector.
    pub async fn emit(&self, event: E) -> Vec<Result<Outcome, HandlerError>> {
        let kind = event.kind();
        let handlers = {
            let map = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            map.get(&kind).cloned().unwrap_or_default()
        };

        let mut results = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let result = DynEventHandler::handle_dyn(&*handler, event.clone()).await;
            if let Err(err) = &result {
                self.logger
                    .warn(format_args!("handler for {kind:?} failed: {err}"));
            }
            results.push(result);
        }
        results
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Rejects further registrations.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl<E: Event> EventSource<E> for LocalEventSource<E> {
    fn on(&self, kind: E::Kind, handler: SharedHandler<E>) -> Result<(), RegistrationError> {
        if self.is_closed() {
            return Err(RegistrationError::Closed);
        }
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(handler);
        Ok(())
    }
}
