//! Testing utilities for Herald.
//!
//! # Features
//!
//! - [`Recorder`]: records every value passed to the callbacks it hands out
//! - [`failing`] / [`failing_suspending`]: callbacks that always fail
//! - [`CapturedLogs`]: an in-memory writer for asserting on log output

use herald_core::{BoxError, Callback};
use std::{
    io,
    sync::{Arc, Mutex},
};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

// ============================================================================
// Recorder
// ============================================================================

/// Records the inputs of the callbacks it creates.
///
/// # Example
///
/// ```rust,ignore
/// let matches = Recorder::<MessageData>::new();
/// let builder = HandlerBuilder::new(predicate, matches.callback(), sink, logger);
///
/// builder.handle(event).await?;
/// assert_eq!(matches.count(), 1);
/// ```
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A synchronous callback that records its input.
    pub fn callback(&self) -> Callback<T, ()> {
        let values = Arc::clone(&self.values);
        Callback::sync(move |value| {
            values.lock().unwrap().push(value);
            Ok(())
        })
    }

    /// A suspending callback that records its input.
    pub fn suspending_callback(&self) -> Callback<T, ()> {
        let values = Arc::clone(&self.values);
        Callback::suspending(move |value| {
            let values = Arc::clone(&values);
            async move {
                values.lock().unwrap().push(value);
                Ok::<_, BoxError>(())
            }
        })
    }

    /// Get a clone of the recorded values.
    pub fn values(&self) -> Vec<T> {
        self.values.lock().unwrap().clone()
    }

    /// Get the number of recorded values.
    pub fn count(&self) -> usize {
        self.values.lock().unwrap().len()
    }
}

impl<T: Clone + Send + 'static> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

// ============================================================================
// Failing callbacks
// ============================================================================

/// A synchronous callback that always fails with `message`.
pub fn failing<In, Out>(message: &'static str) -> Callback<In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    Callback::sync(move |_| Err(message.into()))
}

/// A suspending callback that always fails with `message`.
pub fn failing_suspending<In, Out>(message: &'static str) -> Callback<In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    Callback::suspending(move |_| async move { Err::<Out, BoxError>(message.into()) })
}

// ============================================================================
// Captured logs
// ============================================================================

/// An in-memory log writer.
///
/// # Example
///
/// ```rust,ignore
/// let logs = CapturedLogs::new();
/// let _guard = tracing::subscriber::set_default(logs.subscriber());
///
/// logger.error("boom");
/// assert!(logs.contents().contains("boom"));
/// ```
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Create an empty capture buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A subscriber writing every event, uncolored, into this buffer.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static + use<> {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(Level::TRACE)
            .finish()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    /// Written lines, in order.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

/// Writer handed out by [`CapturedLogs`].
pub struct CapturedWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}
