//! Gated handler builder.
//!
//! A [`HandlerBuilder`] composes four collaborators into one
//! [`EventHandler`]:
//!
//! 1. `predicate` decides whether the event is processed at all
//! 2. `transform` shapes the event into message data (identity by default)
//! 3. `on_match` acts on the message data, typically persisting it
//! 4. `on_error` is told about any failure in steps 1 to 3
//!
//! A failure is handed to `on_error` and then returned to the caller
//! unchanged. Nothing is retried at this layer.

use crate::logger::Logger;
use herald_core::{Callback, EventHandler, HandlerError, Message, Outcome, SuspendingFn};
use std::{fmt, sync::Arc};

/// A gated handler bound to one event occurrence at a time.
pub struct HandlerBuilder<E, D = E> {
    predicate: Arc<SuspendingFn<E, bool>>,
    transform: Callback<E, D>,
    on_match: Callback<D, ()>,
    on_error: Callback<HandlerError, ()>,
    logger: Logger,
}

impl<E, D> fmt::Debug for HandlerBuilder<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBuilder")
            .field("transform", &self.transform)
            .field("on_match", &self.on_match)
            .field("on_error", &self.on_error)
            .finish_non_exhaustive()
    }
}

impl<E: Message + Clone> HandlerBuilder<E, E> {
    /// Creates a handler that passes matching events to `on_match` unchanged.
    pub fn new(
        predicate: Callback<E, bool>,
        on_match: Callback<E, ()>,
        on_error: Callback<HandlerError, ()>,
        logger: Logger,
    ) -> Self {
        Self::with_transform(predicate, Callback::identity(), on_match, on_error, logger)
    }
}

impl<E, D> HandlerBuilder<E, D>
where
    E: Message + Clone,
    D: Message,
{
    /// Creates a handler that shapes matching events with `transform`.
    ///
    /// The predicate is normalized into its suspending form here, once.
    pub fn with_transform(
        predicate: Callback<E, bool>,
        transform: Callback<E, D>,
        on_match: Callback<D, ()>,
        on_error: Callback<HandlerError, ()>,
        logger: Logger,
    ) -> Self {
        Self {
            predicate: predicate.into_suspending(),
            transform,
            on_match,
            on_error,
            logger,
        }
    }

    /// Runs the gate, the transform and the success callback for `event`.
    ///
    /// Returns [`Outcome::Skipped`] when the gate denies the event. On
    /// failure `on_error` runs first, then the same error is returned.
    pub async fn handle(&self, event: E) -> Result<Outcome, HandlerError> {
        match self.run(event).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.logger
                    .error(format_args!("{} stage failed: {}", err.stage(), err.inner()));
                if let Err(sink_err) = self.on_error.call(err.clone()).await {
                    self.logger
                        .error(format_args!("error callback failed: {sink_err}"));
                }
                Err(err)
            }
        }
    }

    async fn run(&self, event: E) -> Result<Outcome, HandlerError> {
        let matched = (self.predicate)(event.clone())
            .await
            .map_err(HandlerError::predicate)?;
        if !matched {
            return Ok(Outcome::Skipped);
        }

        let data = self
            .transform
            .call(event)
            .await
            .map_err(HandlerError::transform)?;

        self.on_match
            .call(data)
            .await
            .map_err(HandlerError::delivery)?;

        Ok(Outcome::Delivered)
    }
}

impl<E, D> EventHandler<E> for HandlerBuilder<E, D>
where
    E: Message + Clone,
    D: Message,
{
    async fn handle(&self, event: E) -> Result<Outcome, HandlerError> {
        HandlerBuilder::handle(self, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        logger::LogLevel,
        testing::{Recorder, failing, failing_suspending},
    };
    use herald_core::{BoxError, Stage};

    fn quiet() -> Logger {
        Logger::new(LogLevel::Error)
    }

    fn is_even() -> Callback<i32, bool> {
        Callback::sync(|n: i32| Ok(n % 2 == 0))
    }

    #[tokio::test]
    async fn test_denied_event_touches_nothing() {
        let matches = Recorder::new();
        let errors = Recorder::new();
        let handler =
            HandlerBuilder::new(is_even(), matches.callback(), errors.callback(), quiet());

        let outcome = handler.handle(3).await.unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(matches.count(), 0);
        assert_eq!(errors.count(), 0);
    }

    #[tokio::test]
    async fn test_matching_event_is_delivered_once() {
        let matches = Recorder::new();
        let errors = Recorder::new();
        let handler =
            HandlerBuilder::new(is_even(), matches.callback(), errors.callback(), quiet());

        let outcome = handler.handle(4).await.unwrap();

        assert_eq!(outcome, Outcome::Delivered);
        assert_eq!(matches.values(), vec![4]);
        assert_eq!(errors.count(), 0);
    }

    #[tokio::test]
    async fn test_suspending_predicate() {
        let matches = Recorder::new();
        let predicate = Callback::suspending(|n: i32| async move { Ok::<_, BoxError>(n > 10) });
        let handler = HandlerBuilder::new(
            predicate,
            matches.suspending_callback(),
            Recorder::new().callback(),
            quiet(),
        );

        assert_eq!(handler.handle(5).await.unwrap(), Outcome::Skipped);
        assert_eq!(handler.handle(50).await.unwrap(), Outcome::Delivered);
        assert_eq!(matches.values(), vec![50]);
    }

    #[tokio::test]
    async fn test_transform_shapes_message_data() {
        let matches = Recorder::new();
        let handler = HandlerBuilder::with_transform(
            is_even(),
            Callback::sync(|n: i32| Ok(format!("n={n}"))),
            matches.callback(),
            Recorder::new().callback(),
            quiet(),
        );

        handler.handle(8).await.unwrap();
        assert_eq!(matches.values(), vec!["n=8".to_string()]);
    }

    #[tokio::test]
    async fn test_predicate_failure_reaches_sink_then_caller() {
        let matches = Recorder::<i32>::new();
        let errors = Recorder::new();
        let handler = HandlerBuilder::new(
            failing("boom"),
            matches.callback(),
            errors.callback(),
            quiet(),
        );

        let err = handler.handle(1).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Predicate);
        assert_eq!(err.inner().to_string(), "boom");
        assert_eq!(matches.count(), 0);

        let seen = errors.values();
        assert_eq!(seen.len(), 1);
        assert!(Arc::ptr_eq(seen[0].inner(), err.inner()));
    }

    #[tokio::test]
    async fn test_transform_failure_skips_delivery() {
        let matches = Recorder::<String>::new();
        let errors = Recorder::new();
        let handler = HandlerBuilder::with_transform(
            is_even(),
            failing("bad shape"),
            matches.callback(),
            errors.callback(),
            quiet(),
        );

        let err = handler.handle(2).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Transform);
        assert_eq!(matches.count(), 0);
        assert_eq!(errors.count(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_not_retried() {
        let errors = Recorder::new();
        let handler = HandlerBuilder::new(
            is_even(),
            failing_suspending("store down"),
            errors.callback(),
            quiet(),
        );

        let err = handler.handle(2).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Delivery);
        assert_eq!(err.to_string(), "delivery failed: store down");
        assert_eq!(errors.count(), 1);
    }

    #[tokio::test]
    async fn test_failing_sink_keeps_original_error() {
        let handler = HandlerBuilder::new(
            failing("boom"),
            Recorder::<i32>::new().callback(),
            failing("sink broke"),
            quiet(),
        );

        let err = handler.handle(1).await.unwrap_err();
        assert_eq!(err.inner().to_string(), "boom");
    }

    #[tokio::test]
    async fn test_usable_as_dyn_handler() {
        use herald_core::{DynEventHandler, SharedHandler};

        let matches = Recorder::new();
        let handler: SharedHandler<i32> = Arc::new(HandlerBuilder::new(
            is_even(),
            matches.callback(),
            Recorder::new().callback(),
            quiet(),
        ));

        assert_eq!(handler.handle_dyn(6).await.unwrap(), Outcome::Delivered);
        assert_eq!(matches.count(), 1);
    }
}
