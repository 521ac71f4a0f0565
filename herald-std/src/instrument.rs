//! Instrumentation wrapper.
//!
//! [`Instrument::wrap`] turns a `Callback<In, Out>` into a
//! `Callback<In, Option<Out>>` that logs entry, success and failure. A failure
//! is logged and absorbed: the wrapped callback resolves to `None` instead of
//! an error. Call sites that need to react to failures decide what `None`
//! means for them (a wrapped predicate treats it as "no match").
//!
//! Each invocation gets a fresh correlation id so the entry line can be
//! paired with its outcome line. In verbose mode the lines also carry the
//! location where the instrumented callable was created.

use crate::logger::Logger;
use futures::future::BoxFuture;
use herald_core::{BoxError, Callback};
use std::{
    fmt,
    panic::Location,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Logical name used when none is given.
pub const ANONYMOUS: &str = "anonymous";

const UNKNOWN: &str = "unknown";

/// A resolved source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    file_name: String,
    path: String,
}

impl CallSite {
    /// Resolves a location from its source path.
    ///
    /// Returns `None` when the path has no usable file name.
    pub fn resolve(file: &str, line: u32, column: u32) -> Option<Self> {
        let file_name = Path::new(file).file_name()?.to_str()?.to_owned();
        Some(Self {
            file_name,
            path: format!("{file}:{line}:{column}"),
        })
    }

    /// The file name without directories.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The full path with line and column.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Per-invocation record correlating the entry line with the outcome line.
#[derive(Debug, Clone)]
pub struct InstrumentationContext {
    name: Arc<str>,
    call_id: u64,
    verbose: bool,
    site: Option<CallSite>,
}

impl InstrumentationContext {
    fn begin(name: &Arc<str>, origin: &Location<'_>, logger: &Logger) -> Self {
        let verbose = logger.is_debug_enabled();
        let site = if verbose {
            CallSite::resolve(origin.file(), origin.line(), origin.column())
        } else {
            None
        };
        Self {
            name: Arc::clone(name),
            call_id: NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed),
            verbose,
            site,
        }
    }

    /// The wrapped function's logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The correlation id of this invocation.
    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    /// The resolved location; `None` outside verbose mode or when unresolved.
    pub fn site(&self) -> Option<&CallSite> {
        self.site.as_ref()
    }

    fn location(&self) -> LocationSuffix<'_> {
        LocationSuffix(self)
    }
}

impl fmt::Display for InstrumentationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}#{}]", self.name, self.call_id)
    }
}

/// Renders the location suffix: empty outside verbose mode.
struct LocationSuffix<'a>(&'a InstrumentationContext);

impl fmt::Display for LocationSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.0.verbose {
            return Ok(());
        }
        let (file_name, path) = self
            .0
            .site
            .as_ref()
            .map_or((UNKNOWN, UNKNOWN), |site| (site.file_name(), site.path()));
        write!(f, " [File: {file_name}] [Path: {path}]")
    }
}

/// Wraps callbacks with entry, success and failure logging.
#[derive(Clone)]
pub struct Instrument {
    name: Arc<str>,
    origin: &'static Location<'static>,
    logger: Logger,
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrument")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .finish()
    }
}

impl Instrument {
    /// Creates an instrument named `name`, recording the caller's location.
    ///
    /// An empty name falls back to [`ANONYMOUS`].
    #[track_caller]
    pub fn new(name: &str, logger: Logger) -> Self {
        let name = if name.is_empty() { ANONYMOUS } else { name };
        Self {
            name: Arc::from(name),
            origin: Location::caller(),
            logger,
        }
    }

    /// The logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn begin(&self) -> InstrumentationContext {
        let ctx = InstrumentationContext::begin(&self.name, self.origin, &self.logger);
        self.logger
            .debug(format_args!("{ctx} Entering function.{}", ctx.location()));
        ctx
    }

    fn finish<Out>(
        logger: &Logger,
        ctx: &InstrumentationContext,
        result: Result<Out, BoxError>,
    ) -> Option<Out> {
        match result {
            Ok(out) => {
                logger.debug(format_args!(
                    "{ctx} Function executed successfully.{}",
                    ctx.location()
                ));
                Some(out)
            }
            Err(err) => {
                logger.error(format_args!(
                    "{ctx} An error occurred:{} {err}",
                    ctx.location()
                ));
                None
            }
        }
    }

    /// Wraps `callback`, keeping its calling convention.
    ///
    /// The wrapped callback never fails: a failure is logged and surfaces as
    /// `Ok(None)`.
    pub fn wrap<In, Out>(&self, callback: Callback<In, Out>) -> Callback<In, Option<Out>>
    where
        In: Send + 'static,
        Out: Send + 'static,
    {
        let this = self.clone();
        match callback {
            Callback::Sync(f) => Callback::Sync(Arc::new(
                move |input: In| -> Result<Option<Out>, BoxError> {
                    let ctx = this.begin();
                    Ok(Self::finish(&this.logger, &ctx, f(input)))
                },
            )),
            Callback::Suspending(f) => Callback::Suspending(Arc::new(
                move |input: In| -> BoxFuture<'static, Result<Option<Out>, BoxError>> {
                    let ctx = this.begin();
                    let pending = f(input);
                    let logger = this.logger.clone();
                    Box::pin(async move {
                        Ok::<_, BoxError>(Self::finish(&logger, &ctx, pending.await))
                    })
                },
            )),
        }
    }
}

/// Wraps `callback` under `name`, recording the caller's location.
#[track_caller]
pub fn instrument<In, Out>(
    callback: Callback<In, Out>,
    name: &str,
    logger: &Logger,
) -> Callback<In, Option<Out>>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    Instrument::new(name, logger.clone()).wrap(callback)
}
