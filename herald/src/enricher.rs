//! Event enrichment.
//!
//! [`EventEnricher`] attaches one gated handler per event kind to the
//! messaging client:
//!
//! - `ready`: no gate, logs that the client is connected
//! - `disconnected`: no gate, logs the reason
//! - `qr`: no gate, draws the pairing code as a terminal QR code
//! - `message_create`: gated on the conversation being the tracked group;
//!   matching messages are persisted to the configured collection
//!
//! Registration happens once. A second call to
//! [`enrich_and_return`](EventEnricher::enrich_and_return) is rejected.

use crate::{
    config::HeraldConfig,
    event::{ChatDirectory, ClientEvent, EventKind, MessageData},
    store::{Store, to_document},
};
use herald_core::{BoxError, Callback, EventSource, HandlerError, RegistrationError, SharedHandler};
use herald_std::{HandlerFactory, Logger};
use qrcode::{QrCode, render::unicode::Dense1x2, types::QrError};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// What the enricher tracks and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnricherSettings {
    /// Collection receiving tracked messages.
    pub collection: String,
    /// Display name of the tracked group.
    pub group_name: String,
    /// Whether handler callbacks are instrumented.
    pub instrument: bool,
}

impl From<&HeraldConfig> for EnricherSettings {
    fn from(config: &HeraldConfig) -> Self {
        Self {
            collection: config.collection.clone(),
            group_name: config.group_name.clone(),
            instrument: config.instrument,
        }
    }
}

/// Registers the domain handlers against an event source.
pub struct EventEnricher<S> {
    source: Arc<S>,
    store: Arc<dyn Store>,
    chats: Arc<dyn ChatDirectory>,
    settings: EnricherSettings,
    factory: HandlerFactory,
    logger: Logger,
    registered: AtomicBool,
}

impl<S> fmt::Debug for EventEnricher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEnricher")
            .field("settings", &self.settings)
            .field("registered", &self.registered.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<S: EventSource<ClientEvent>> EventEnricher<S> {
    /// Creates an enricher; nothing is registered until
    /// [`enrich_and_return`](Self::enrich_and_return).
    pub fn new(
        source: Arc<S>,
        store: Arc<dyn Store>,
        chats: Arc<dyn ChatDirectory>,
        settings: EnricherSettings,
        logger: Logger,
    ) -> Self {
        Self {
            source,
            store,
            chats,
            settings,
            factory: HandlerFactory::new(logger.clone()),
            logger,
            registered: AtomicBool::new(false),
        }
    }

    /// The tracked settings.
    pub fn settings(&self) -> &EnricherSettings {
        &self.settings
    }

    /// Registers every handler and hands the source back.
    ///
    /// Errors are logged before being returned. The enricher does not retry:
    /// after a failed or successful attempt, further calls fail with
    /// [`RegistrationError::AlreadyRegistered`].
    pub fn enrich_and_return(&self) -> Result<Arc<S>, RegistrationError> {
        if self.registered.swap(true, Ordering::AcqRel) {
            let err = RegistrationError::AlreadyRegistered;
            self.logger.error(format_args!("Error enriching client: {err}"));
            return Err(err);
        }

        match self.register_all() {
            Ok(()) => {
                self.logger.debug("Client handlers registered.");
                Ok(Arc::clone(&self.source))
            }
            Err(err) => {
                self.logger.error(format_args!("Error enriching client: {err}"));
                Err(err)
            }
        }
    }

    fn register_all(&self) -> Result<(), RegistrationError> {
        for kind in EventKind::ALL {
            let handler = match kind {
                EventKind::Ready => self.lifecycle_handler(kind, |logger, _| {
                    logger.info("Client is ready!");
                }),
                EventKind::Disconnected => self.lifecycle_handler(kind, |logger, event| {
                    if let ClientEvent::Disconnected { reason } = event {
                        logger.warn(format_args!("Client disconnected: {reason}"));
                    }
                }),
                EventKind::Qr => self.lifecycle_handler(kind, |logger, event| {
                    if let ClientEvent::Qr { code } = event {
                        match render_pairing_code(&code) {
                            Ok(drawing) => logger.info(format_args!(
                                "Scan the pairing code: {code}\n{drawing}"
                            )),
                            Err(err) => {
                                logger.warn(format_args!("Cannot draw pairing code: {err}"));
                                logger.info(format_args!("Scan the pairing code: {code}"));
                            }
                        }
                    }
                }),
                EventKind::MessageCreate => self.message_handler(),
            };
            self.source.on(kind, handler)?;
        }
        Ok(())
    }

    /// An ungated handler running `on_event` for every event of `kind`.
    fn lifecycle_handler<F>(&self, kind: EventKind, on_event: F) -> SharedHandler<ClientEvent>
    where
        F: Fn(&Logger, ClientEvent) + Send + Sync + 'static,
    {
        let logger = self.logger.clone();
        let on_match = Callback::sync(move |event: ClientEvent| {
            on_event(&logger, event);
            Ok(())
        });

        Arc::new(self.factory.create(
            self.settings.instrument,
            Callback::sync(|_: ClientEvent| Ok(true)),
            on_match,
            self.error_sink(kind),
        ))
    }

    fn message_handler(&self) -> SharedHandler<ClientEvent> {
        Arc::new(self.factory.create_with_transform(
            self.settings.instrument,
            self.in_tracked_group(),
            Callback::sync(MessageData::from_event),
            self.persist(),
            self.error_sink(EventKind::MessageCreate),
        ))
    }

    /// Matches messages whose conversation is the tracked group.
    fn in_tracked_group(&self) -> Callback<ClientEvent, bool> {
        let chats = Arc::clone(&self.chats);
        let group_name: Arc<str> = Arc::from(self.settings.group_name.as_str());
        Callback::suspending(move |event: ClientEvent| {
            let chats = Arc::clone(&chats);
            let group_name = Arc::clone(&group_name);
            async move {
                let Some(msg) = event.message() else {
                    return Ok::<_, BoxError>(false);
                };
                let chat = chats.chat(&msg.chat_id).await?;
                Ok::<_, BoxError>(chat.is_group && chat.name == *group_name)
            }
        })
    }

    /// Stores message data in the configured collection.
    fn persist(&self) -> Callback<MessageData, ()> {
        let store = Arc::clone(&self.store);
        let collection: Arc<str> = Arc::from(self.settings.collection.as_str());
        let logger = self.logger.clone();
        Callback::suspending(move |data: MessageData| {
            let store = Arc::clone(&store);
            let collection = Arc::clone(&collection);
            let logger = logger.clone();
            async move {
                let doc = to_document(&data)?;
                store.create_one(&collection, doc).await?;
                logger.debug(format_args!("Stored message {} in {collection}", data.id));
                Ok::<_, BoxError>(())
            }
        })
    }

    /// The handler already logged the failure at error level.
    fn error_sink(&self, kind: EventKind) -> Callback<HandlerError, ()> {
        let logger = self.logger.clone();
        Callback::sync(move |err: HandlerError| {
            logger.debug(format_args!("Error handling {kind} event: {err}"));
            Ok(())
        })
    }
}

/// Draws `code` as a compact QR code, two modules per character cell, light
/// on dark.
fn render_pairing_code(code: &str) -> Result<String, QrError> {
    let qr = QrCode::new(code.as_bytes())?;
    Ok(qr
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .build())
}
