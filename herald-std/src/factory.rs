//! Handler factory.
//!
//! Creates [`HandlerBuilder`]s, optionally instrumenting the predicate, the
//! success callback and the error sink.
//!
//! An instrumented callback absorbs its own failures. For the predicate that
//! means a failing gate reads as "no match": the event is skipped, nothing
//! reaches `on_error`, and the failure only shows up in the log. An
//! uninstrumented failing gate instead goes through `on_error` and back to
//! the caller.

use crate::{builder::HandlerBuilder, instrument::Instrument, logger::Logger};
use herald_core::{Callback, HandlerError, Message};

/// Creates gated handlers sharing one logger.
#[derive(Debug, Clone)]
pub struct HandlerFactory {
    logger: Logger,
}

impl HandlerFactory {
    /// Creates a factory whose handlers and instruments log to `logger`.
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// The logger handed to created handlers.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Creates a handler passing matching events to `on_match` unchanged.
    #[track_caller]
    pub fn create<E>(
        &self,
        instrument: bool,
        predicate: Callback<E, bool>,
        on_match: Callback<E, ()>,
        on_error: Callback<HandlerError, ()>,
    ) -> HandlerBuilder<E, E>
    where
        E: Message + Clone,
    {
        self.create_with_transform(instrument, predicate, Callback::identity(), on_match, on_error)
    }

    /// Creates a handler shaping matching events with `transform`.
    ///
    /// The transform is never instrumented; its failures always propagate.
    #[track_caller]
    pub fn create_with_transform<E, D>(
        &self,
        instrument: bool,
        predicate: Callback<E, bool>,
        transform: Callback<E, D>,
        on_match: Callback<D, ()>,
        on_error: Callback<HandlerError, ()>,
    ) -> HandlerBuilder<E, D>
    where
        E: Message + Clone,
        D: Message,
    {
        if !instrument {
            return HandlerBuilder::with_transform(
                predicate,
                transform,
                on_match,
                on_error,
                self.logger.clone(),
            );
        }

        let predicate = Instrument::new("predicate", self.logger.clone())
            .wrap(predicate)
            .map(|matched| matched.unwrap_or(false));
        let on_match = Instrument::new("on_match", self.logger.clone())
            .wrap(on_match)
            .map(|_| ());
        let on_error = Instrument::new("on_error", self.logger.clone())
            .wrap(on_error)
            .map(|_| ());

        HandlerBuilder::with_transform(predicate, transform, on_match, on_error, self.logger.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        logger::LogLevel,
        testing::{CapturedLogs, Recorder, failing, failing_suspending},
    };
    use herald_core::{Outcome, Stage};

    fn factory() -> HandlerFactory {
        HandlerFactory::new(Logger::new(LogLevel::Error))
    }

    #[tokio::test]
    async fn test_uninstrumented_failing_gate_propagates() {
        let matches = Recorder::<u8>::new();
        let errors = Recorder::new();
        let handler = factory().create(false, failing("boom"), matches.callback(), errors.callback());

        let err = handler.handle(1).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Predicate);
        assert_eq!(err.inner().to_string(), "boom");
        assert_eq!(errors.count(), 1);
        assert_eq!(matches.count(), 0);
    }

    #[tokio::test]
    async fn test_instrumented_failing_gate_is_no_match() {
        let matches = Recorder::<u8>::new();
        let errors = Recorder::new();
        let handler = factory().create(
            true,
            failing_suspending("boom"),
            matches.callback(),
            errors.callback(),
        );

        let outcome = handler.handle(1).await.unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(errors.count(), 0);
        assert_eq!(matches.count(), 0);
    }

    #[tokio::test]
    async fn test_instrumented_gate_keeps_verdicts() {
        let matches = Recorder::new();
        let handler = factory().create(
            true,
            Callback::sync(|n: u8| Ok(n > 1)),
            matches.callback(),
            Recorder::new().callback(),
        );

        assert_eq!(handler.handle(1).await.unwrap(), Outcome::Skipped);
        assert_eq!(handler.handle(2).await.unwrap(), Outcome::Delivered);
        assert_eq!(matches.values(), vec![2]);
    }

    #[tokio::test]
    async fn test_instrumented_delivery_failure_is_absorbed() {
        let errors = Recorder::new();
        let handler = factory().create(
            true,
            Callback::sync(|_: u8| Ok(true)),
            failing("store down"),
            errors.callback(),
        );

        assert_eq!(handler.handle(1).await.unwrap(), Outcome::Delivered);
        assert_eq!(errors.count(), 0);
    }

    #[tokio::test]
    async fn test_instrumented_gate_failure_is_logged() {
        let logs = CapturedLogs::new();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        let handler = factory().create(
            true,
            failing("boom"),
            Recorder::<u8>::new().callback(),
            Recorder::new().callback(),
        );
        handler.handle(1).await.unwrap();

        let out = logs.contents();
        assert!(out.contains("[predicate#"));
        assert!(out.contains("An error occurred: boom"));
    }
}
