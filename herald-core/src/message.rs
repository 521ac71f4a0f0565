//! Message and event marker traits.

use std::{fmt::Debug, hash::Hash};

/// A marker trait for payloads that travel through handlers.
///
/// Messages must be `Send + Sync + 'static` to be safe for async use.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Message",
    label = "must be `Send + Sync + 'static`",
    note = "All payloads in Herald must be thread-safe and static."
)]
pub trait Message: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Message for T {}

/// An event delivered by an external event source.
///
/// Every event carries a discriminant ([`Event::Kind`]) that the source uses
/// to pick the handlers registered for it. Handlers receive their own clone;
/// the source keeps ownership of the original.
pub trait Event: Message + Clone {
    /// The discriminant type used to register handlers.
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Returns the discriminant of this event.
    fn kind(&self) -> Self::Kind;
}
