//! Event source contract.

use crate::{error::RegistrationError, handler::SharedHandler, message::Event};

/// An external producer of events that accepts handlers per event kind.
///
/// Handlers registered for one kind observe events of that kind in the order
/// the source delivers them. A source is expected to tolerate a handler
/// returning an error without stopping delivery to other handlers.
pub trait EventSource<E: Event>: Send + Sync {
    /// Registers `handler` for every future event of `kind`.
    fn on(&self, kind: E::Kind, handler: SharedHandler<E>) -> Result<(), RegistrationError>;
}
