#![allow(dead_code)]

use async_trait::async_trait;
use herald::{
    ChatDirectory, ChatInfo, ClientEvent, EnricherSettings, EventEnricher, IncomingMessage,
    MemoryStore, Store, StoreError,
    herald_core::BoxError,
    herald_std::{LocalEventSource, LogLevel, Logger},
    llm::{AskOptions, LlmClient, LlmError},
    store::{DeleteAck, Document, FindOptions, InsertAck, UpdateAck, UpdateOptions},
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

pub const GROUP: &str = "Family";
pub const GROUP_CHAT: &str = "family@g.us";
pub const OTHER_CHAT: &str = "friend@c.us";
pub const COLLECTION: &str = "messages";

// ============================================================================
// Events
// ============================================================================

pub fn message(chat_id: &str, body: &str) -> ClientEvent {
    message_at(chat_id, body, 1_700_000_000)
}

pub fn message_at(chat_id: &str, body: &str, timestamp: i64) -> ClientEvent {
    ClientEvent::MessageCreate(IncomingMessage {
        id: format!("{chat_id}/{timestamp}"),
        chat_id: chat_id.to_string(),
        from: "alice@c.us".into(),
        to: "me@c.us".into(),
        author: Some("alice@c.us".into()),
        body: body.to_string(),
        timestamp,
        message_type: "chat".into(),
        from_me: false,
        has_media: false,
    })
}

// ============================================================================
// Chats
// ============================================================================

/// A fixed chat directory: one tracked group and one direct conversation.
pub struct StaticChats {
    chats: HashMap<String, ChatInfo>,
    pub lookups: AtomicUsize,
    pub fail: AtomicBool,
}

impl StaticChats {
    pub fn new() -> Self {
        let chats = [
            ChatInfo {
                id: GROUP_CHAT.into(),
                name: GROUP.into(),
                is_group: true,
            },
            ChatInfo {
                id: OTHER_CHAT.into(),
                name: GROUP.into(),
                is_group: false,
            },
        ];
        Self {
            chats: chats.into_iter().map(|c| (c.id.clone(), c)).collect(),
            lookups: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ChatDirectory for StaticChats {
    async fn chat(&self, chat_id: &str) -> Result<ChatInfo, BoxError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err("boom".into());
        }
        self.chats
            .get(chat_id)
            .cloned()
            .ok_or_else(|| format!("unknown chat {chat_id}").into())
    }
}

// ============================================================================
// Store
// ============================================================================

/// A memory store counting inserts, optionally failing them.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub creates: AtomicUsize,
    pub fail: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn create_one(&self, collection: &str, doc: Document) -> Result<InsertAck, StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store down".into()));
        }
        self.inner.create_one(collection, doc).await
    }

    async fn create_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<InsertAck, StoreError> {
        self.inner.create_many(collection, docs).await
    }

    async fn get_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, StoreError> {
        self.inner.get_one(collection, filter).await
    }

    async fn get_many(
        &self,
        collection: &str,
        filter: &Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.get_many(collection, filter, options).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateAck, StoreError> {
        self.inner.update_one(collection, filter, update, options).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateAck, StoreError> {
        self.inner.update_many(collection, filter, update, options).await
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<DeleteAck, StoreError> {
        self.inner.delete_one(collection, filter).await
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<DeleteAck, StoreError> {
        self.inner.delete_many(collection, filter).await
    }
}

// ============================================================================
// Language model
// ============================================================================

/// Answers prompts from a script and records them.
#[derive(Default)]
pub struct ScriptedLlm {
    answers: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            prompts: Mutex::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn ask(&self, prompt: &str, _options: AskOptions) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Backend("script exhausted".into()))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub type Source = LocalEventSource<ClientEvent>;

pub struct Harness {
    pub source: Arc<Source>,
    pub store: Arc<CountingStore>,
    pub chats: Arc<StaticChats>,
    pub enricher: EventEnricher<Source>,
}

/// An enricher wired to an in-process source; handlers are not registered yet.
pub fn harness(instrument: bool) -> Harness {
    let logger = Logger::new(LogLevel::Error);
    let source = Arc::new(LocalEventSource::new(logger.clone()));
    let store = Arc::new(CountingStore::new());
    let chats = Arc::new(StaticChats::new());
    let enricher = EventEnricher::new(
        Arc::clone(&source),
        store.clone(),
        chats.clone(),
        EnricherSettings {
            collection: COLLECTION.into(),
            group_name: GROUP.into(),
            instrument,
        },
        logger,
    );
    Harness {
        source,
        store,
        chats,
        enricher,
    }
}
