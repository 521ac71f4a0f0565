mod common;

use common::{COLLECTION, GROUP_CHAT, OTHER_CHAT, harness, message};
use herald::{
    ClientEvent, EventKind, MessageData, RegistrationError, Store,
    herald_core::{EventSource, Outcome, SharedHandler, Stage},
    herald_std::{LocalEventSource, LogLevel, Logger, testing::CapturedLogs},
    store::{Document, FindOptions, from_document},
};
use std::sync::{Arc, atomic::Ordering};

#[tokio::test]
async fn test_tracked_group_message_is_persisted() {
    let h = harness(false);
    h.enricher.enrich_and_return().unwrap();

    let results = h.source.emit(message(GROUP_CHAT, "hello")).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_ref().unwrap(), &Outcome::Delivered);
    assert_eq!(h.store.create_count(), 1);

    let stored = h
        .store
        .inner
        .get_many(COLLECTION, &Document::new(), FindOptions::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    let data: MessageData = from_document(stored[0].clone()).unwrap();
    assert_eq!(data.body, "hello");
    assert_eq!(data.chat_id, GROUP_CHAT);
}

#[tokio::test]
async fn test_other_conversation_is_ignored() {
    let h = harness(false);
    h.enricher.enrich_and_return().unwrap();

    let results = h.source.emit(message(OTHER_CHAT, "hello")).await;

    assert_eq!(results[0].as_ref().unwrap(), &Outcome::Skipped);
    assert_eq!(h.chats.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.create_count(), 0);
}

#[tokio::test]
async fn test_unknown_conversation_fails_at_predicate() {
    let h = harness(false);
    h.enricher.enrich_and_return().unwrap();

    let results = h.source.emit(message("stranger@g.us", "hi")).await;

    let err = results[0].as_ref().unwrap_err();
    assert_eq!(err.stage(), Stage::Predicate);
    assert_eq!(h.store.create_count(), 0);
}

#[tokio::test]
async fn test_failed_chat_lookup_skips_when_instrumented() {
    let h = harness(true);
    h.enricher.enrich_and_return().unwrap();
    h.chats.fail.store(true, Ordering::SeqCst);

    let results = h.source.emit(message(GROUP_CHAT, "hello")).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_ref().unwrap(), &Outcome::Skipped);
    assert_eq!(h.chats.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.create_count(), 0);
}

#[tokio::test]
async fn test_failed_chat_lookup_is_a_predicate_error() {
    let h = harness(false);
    h.enricher.enrich_and_return().unwrap();
    h.chats.fail.store(true, Ordering::SeqCst);

    let results = h.source.emit(message(GROUP_CHAT, "hello")).await;

    let err = results[0].as_ref().unwrap_err();
    assert_eq!(err.stage(), Stage::Predicate);
    assert_eq!(err.inner().to_string(), "boom");
    assert_eq!(h.store.create_count(), 0);
}

#[tokio::test]
async fn test_registration_covers_every_kind_once() {
    let h = harness(false);
    let source = h.enricher.enrich_and_return().unwrap();

    assert!(Arc::ptr_eq(&source, &h.source));
    for kind in EventKind::ALL {
        assert_eq!(h.source.handler_count(kind), 1, "{kind}");
    }

    let err = h.enricher.enrich_and_return().unwrap_err();
    assert!(matches!(err, RegistrationError::AlreadyRegistered));
    assert_eq!(h.source.handler_count(EventKind::MessageCreate), 1);
}

#[tokio::test]
async fn test_closed_source_error_is_returned() {
    let h = harness(false);
    h.source.close();

    let logs = CapturedLogs::new();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let err = h.enricher.enrich_and_return().unwrap_err();

    assert!(matches!(err, RegistrationError::Closed));
    assert!(logs.contents().contains("Error enriching client: event source is closed"));
}

#[tokio::test]
async fn test_lifecycle_events_are_logged() {
    let logs = CapturedLogs::new();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let logger = Logger::new(LogLevel::Info);
    let source = Arc::new(LocalEventSource::new(logger.clone()));
    let enricher = herald::EventEnricher::new(
        Arc::clone(&source),
        Arc::new(common::CountingStore::new()),
        Arc::new(common::StaticChats::new()),
        herald::EnricherSettings {
            collection: COLLECTION.into(),
            group_name: common::GROUP.into(),
            instrument: false,
        },
        logger,
    );
    enricher.enrich_and_return().unwrap();

    source.emit(ClientEvent::Qr { code: "2@abc".into() }).await;
    source.emit(ClientEvent::Ready).await;
    source
        .emit(ClientEvent::Disconnected {
            reason: "LOGOUT".into(),
        })
        .await;

    let out = logs.contents();
    assert!(out.contains("Scan the pairing code: 2@abc"));
    assert!(out.contains('\u{2588}'));
    assert!(out.contains("Client is ready!"));
    assert!(out.contains("Client disconnected: LOGOUT"));
}

#[tokio::test]
async fn test_store_failure_reaches_caller() {
    let h = harness(false);
    h.enricher.enrich_and_return().unwrap();
    h.store.fail.store(true, Ordering::SeqCst);

    let results = h.source.emit(message(GROUP_CHAT, "hello")).await;

    let err = results[0].as_ref().unwrap_err();
    assert_eq!(err.stage(), Stage::Delivery);
    assert_eq!(err.to_string(), "delivery failed: store backend failed: store down");
    assert_eq!(h.store.create_count(), 1);
}

#[tokio::test]
async fn test_delivery_failure_is_logged_once_at_error() {
    let logs = CapturedLogs::new();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let logger = Logger::new(LogLevel::Debug);
    let source = Arc::new(LocalEventSource::new(logger.clone()));
    let store = Arc::new(common::CountingStore::new());
    store.fail.store(true, Ordering::SeqCst);
    let enricher = herald::EventEnricher::new(
        Arc::clone(&source),
        store,
        Arc::new(common::StaticChats::new()),
        herald::EnricherSettings {
            collection: COLLECTION.into(),
            group_name: common::GROUP.into(),
            instrument: false,
        },
        logger,
    );
    enricher.enrich_and_return().unwrap();

    source.emit(message(GROUP_CHAT, "hello")).await;

    let lines = logs.lines();
    let errors: Vec<_> = lines.iter().filter(|line| line.contains("ERROR")).collect();
    assert_eq!(errors.len(), 1, "{lines:#?}");
    assert!(errors[0].contains("delivery stage failed: store backend failed: store down"));

    let sink = lines
        .iter()
        .find(|line| line.contains("Error handling message_create event"))
        .unwrap();
    assert!(sink.contains("DEBUG"));
}

#[tokio::test]
async fn test_instrumented_store_failure_is_absorbed() {
    let h = harness(true);
    h.enricher.enrich_and_return().unwrap();
    h.store.fail.store(true, Ordering::SeqCst);

    let results = h.source.emit(message(GROUP_CHAT, "hello")).await;

    assert_eq!(results[0].as_ref().unwrap(), &Outcome::Delivered);
    assert_eq!(h.store.create_count(), 1);
}

/// A source that rejects one kind.
#[derive(Debug)]
struct Picky;

impl EventSource<ClientEvent> for Picky {
    fn on(
        &self,
        kind: EventKind,
        _handler: SharedHandler<ClientEvent>,
    ) -> Result<(), RegistrationError> {
        if kind == EventKind::Qr {
            return Err(RegistrationError::Rejected {
                kind: kind.to_string(),
                source: "pairing disabled".into(),
            });
        }
        Ok(())
    }
}

#[test]
fn test_rejected_registration_is_returned() {
    let enricher = herald::EventEnricher::new(
        Arc::new(Picky),
        Arc::new(common::CountingStore::new()),
        Arc::new(common::StaticChats::new()),
        herald::EnricherSettings {
            collection: COLLECTION.into(),
            group_name: common::GROUP.into(),
            instrument: false,
        },
        Logger::default(),
    );

    let err = enricher.enrich_and_return().unwrap_err();
    assert_eq!(
        err.to_string(),
        "event source rejected handler for qr: pairing disabled"
    );
}
