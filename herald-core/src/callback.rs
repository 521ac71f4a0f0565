//! # Callbacks
//!
//! Every collaborator function plugged into a handler (predicate, transform,
//! success callback, error sink) is a [`Callback`]. The caller declares up
//! front whether the function completes immediately ([`Callback::Sync`]) or
//! has to be awaited ([`Callback::Suspending`]), so turning either into a
//! uniformly awaitable form is a total match rather than a runtime guess.

use crate::error::BoxError;
use futures::future::BoxFuture;
use std::{fmt, future::Future, sync::Arc};

/// A function that completes immediately.
pub type SyncFn<In, Out> = dyn Fn(In) -> Result<Out, BoxError> + Send + Sync;

/// A function whose result must be awaited.
pub type SuspendingFn<In, Out> =
    dyn Fn(In) -> BoxFuture<'static, Result<Out, BoxError>> + Send + Sync;

/// A collaborator function tagged with its calling convention.
pub enum Callback<In, Out> {
    /// Completes immediately.
    Sync(Arc<SyncFn<In, Out>>),
    /// Returns a computation that must be awaited.
    Suspending(Arc<SuspendingFn<In, Out>>),
}

impl<In, Out> Clone for Callback<In, Out> {
    fn clone(&self) -> Self {
        match self {
            Callback::Sync(f) => Callback::Sync(Arc::clone(f)),
            Callback::Suspending(f) => Callback::Suspending(Arc::clone(f)),
        }
    }
}

impl<In, Out> fmt::Debug for Callback<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Sync(_) => f.write_str("Callback::Sync"),
            Callback::Suspending(_) => f.write_str("Callback::Suspending"),
        }
    }
}

impl<In, Out> Callback<In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    /// Creates a callback from a function that completes immediately.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(In) -> Result<Out, BoxError> + Send + Sync + 'static,
    {
        Callback::Sync(Arc::new(f))
    }

    /// Creates a callback from a function returning a future.
    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, BoxError>> + Send + 'static,
    {
        Callback::Suspending(Arc::new(
            move |input: In| -> BoxFuture<'static, Result<Out, BoxError>> { Box::pin(f(input)) },
        ))
    }

    /// Returns `true` if this callback must be awaited.
    pub fn is_suspending(&self) -> bool {
        matches!(self, Callback::Suspending(_))
    }

    /// Invokes the callback, awaiting it if it suspends.
    pub async fn call(&self, input: In) -> Result<Out, BoxError> {
        match self {
            Callback::Sync(f) => f(input),
            Callback::Suspending(f) => f(input).await,
        }
    }

    /// Normalizes the callback into its suspending form.
    ///
    /// A suspending callback is returned as is. A synchronous one is run
    /// eagerly on invocation and its result handed back through a ready
    /// future, so the outcome is the same as calling it directly.
    pub fn into_suspending(self) -> Arc<SuspendingFn<In, Out>> {
        match self {
            Callback::Suspending(f) => f,
            Callback::Sync(f) => Arc::new(
                move |input: In| -> BoxFuture<'static, Result<Out, BoxError>> {
                    let result = f(input);
                    Box::pin(async move { result })
                },
            ),
        }
    }

    /// Maps the successful output, keeping the calling convention.
    pub fn map<O, F>(self, mapper: F) -> Callback<In, O>
    where
        O: Send + 'static,
        F: Fn(Out) -> O + Send + Sync + 'static,
    {
        match self {
            Callback::Sync(f) => {
                Callback::Sync(Arc::new(move |input: In| f(input).map(&mapper)))
            }
            Callback::Suspending(f) => {
                let mapper = Arc::new(mapper);
                Callback::Suspending(Arc::new(
                    move |input: In| -> BoxFuture<'static, Result<O, BoxError>> {
                        let pending = f(input);
                        let mapper = Arc::clone(&mapper);
                        Box::pin(async move { pending.await.map(|out| mapper(out)) })
                    },
                ))
            }
        }
    }
}

impl<T: Send + 'static> Callback<T, T> {
    /// A synchronous callback returning its input.
    pub fn identity() -> Self {
        Self::sync(|input: T| Ok(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn even() -> Callback<i32, bool> {
        Callback::sync(|n: i32| Ok(n % 2 == 0))
    }

    fn even_async() -> Callback<i32, bool> {
        Callback::suspending(|n: i32| async move { Ok::<_, BoxError>(n % 2 == 0) })
    }

    #[tokio::test]
    async fn test_normalized_sync_matches_direct_call() {
        let callback = even();
        let Callback::Sync(direct) = callback.clone() else {
            panic!("expected a sync callback");
        };
        let normalized = callback.into_suspending();

        for n in -3..=3 {
            assert_eq!(normalized(n).await.unwrap(), direct(n).unwrap());
        }
    }

    #[tokio::test]
    async fn test_normalized_suspending_matches_direct_call() {
        let callback = even_async();
        let Callback::Suspending(direct) = callback.clone() else {
            panic!("expected a suspending callback");
        };
        let normalized = callback.into_suspending();

        for n in -3..=3 {
            assert_eq!(normalized(n).await.unwrap(), direct(n).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_normalization_keeps_errors() {
        let failing: Callback<(), bool> = Callback::sync(|_| Err("boom".into()));
        let normalized = failing.into_suspending();

        let err = normalized(()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_map_keeps_calling_convention() {
        let sync = even().map(|b| !b);
        let suspending = even_async().map(|b| !b);

        assert!(!sync.is_suspending());
        assert!(suspending.is_suspending());
        assert!(sync.call(3).await.unwrap());
        assert!(suspending.call(3).await.unwrap());
    }

    #[tokio::test]
    async fn test_identity() {
        let identity = Callback::<String, String>::identity();
        assert_eq!(identity.call("hello".to_string()).await.unwrap(), "hello");
    }
}
