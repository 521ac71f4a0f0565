//! # herald-std
//!
//! Standard implementations for the Herald gated event handler framework.
//!
//! This crate provides:
//! - **Logging**: [`Logger`], a leveled handle over `tracing` with an
//!   optional file sink
//! - **Instrumentation**: [`Instrument`], entry/success/failure logging
//!   around any [`Callback`](herald_core::Callback)
//! - **Handlers**: [`HandlerBuilder`] and [`HandlerFactory`]
//! - **Sources**: [`LocalEventSource`], an in-process event source
//! - **Testing**: recorders and log capture in [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use herald_core;

// Modules
pub mod builder;
pub mod emitter;
pub mod factory;
pub mod instrument;
pub mod logger;
pub mod testing;

pub use builder::HandlerBuilder;
pub use emitter::LocalEventSource;
pub use factory::HandlerFactory;
pub use instrument::{Instrument, InstrumentationContext, instrument};
pub use logger::{LogLevel, Logger};
