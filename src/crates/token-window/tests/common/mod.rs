//! Shared test doubles for window integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once};
use token_window::{
    ChatHistoryStore, CountError, HistoryError, Message, TokenCounter, TokenCounts,
};

/// Counter charging each message one token per character of content.
///
/// `total` adds a fixed list overhead so it never equals the plain sum when
/// the overhead is non-zero. Every call records the length of the list it was
/// asked about.
#[derive(Default)]
pub struct ScriptedCounter {
    overhead: usize,
    fail: AtomicBool,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overhead(overhead: usize) -> Self {
        Self {
            overhead,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        let counter = Self::default();
        counter.fail.store(true, Ordering::SeqCst);
        counter
    }

    /// List lengths of every call so far
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenCounter for ScriptedCounter {
    async fn count(&self, messages: &[Message]) -> Result<TokenCounts, CountError> {
        self.calls.lock().unwrap().push(messages.len());
        if self.fail.load(Ordering::SeqCst) {
            return Err(CountError::Backend("model endpoint unreachable".into()));
        }

        let per_message: Vec<usize> = messages.iter().map(|m| m.content.chars().count()).collect();
        let total = per_message.iter().sum::<usize>() + self.overhead;
        Ok(TokenCounts::new(total, per_message))
    }
}

/// Counter that returns one count too few
pub struct ShortCounter;

#[async_trait]
impl TokenCounter for ShortCounter {
    async fn count(&self, messages: &[Message]) -> Result<TokenCounts, CountError> {
        let per_message = vec![1; messages.len().saturating_sub(1)];
        Ok(TokenCounts::new(per_message.len(), per_message))
    }
}

/// Store whose reads always fail
pub struct FailingStore;

#[async_trait]
impl ChatHistoryStore for FailingStore {
    async fn get_messages(&self) -> Result<Vec<Message>, HistoryError> {
        Err(HistoryError::Storage("redis connection refused".into()))
    }

    async fn add_message(&self, _message: Message) -> Result<(), HistoryError> {
        Err(HistoryError::Storage("redis connection refused".into()))
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        Err(HistoryError::Storage("redis connection refused".into()))
    }
}

/// Message costing `tokens` under [`ScriptedCounter`]
pub fn msg(tokens: usize) -> Message {
    Message::human("x".repeat(tokens))
}

/// Human/AI alternating history with the given costs, tagged by index
pub fn history(costs: &[usize]) -> Vec<Message> {
    costs
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let message = if i % 2 == 0 {
                Message::human("x".repeat(c))
            } else {
                Message::ai("x".repeat(c))
            };
            message.with_id(format!("m{}", i))
        })
        .collect()
}

/// Ids of the given messages
pub fn ids(messages: &[Message]) -> Vec<String> {
    messages.iter().filter_map(|m| m.id.clone()).collect()
}

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
