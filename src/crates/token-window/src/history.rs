//! Chat history storage
//!
//! The window owns no messages. Every call reads the complete, ordered
//! conversation from a [`ChatHistoryStore`], which is the single source of
//! truth. Appends must keep insertion order; the window relies on it to treat
//! the front of the list as the oldest message.
//!
//! [`InMemoryChatHistory`] is the reference backend: an
//! `Arc<RwLock<Vec<Message>>>` that is cheap to clone and share between a
//! window and the code that records new turns. Contents are lost when the
//! process exits.
//!
//! ```rust
//! use token_window::{ChatHistoryStore, InMemoryChatHistory, Message};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let history = InMemoryChatHistory::new();
//! history.add_message(Message::human("hi")).await?;
//! history.add_message(Message::ai("hello")).await?;
//!
//! assert_eq!(history.get_messages().await?.len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::error::HistoryError;
use crate::messages::Message;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Result type for history store operations
pub type HistoryResult<T> = std::result::Result<T, HistoryError>;

/// Ordered, append-only message storage for one conversation
#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    /// Return the full conversation, oldest first
    async fn get_messages(&self) -> HistoryResult<Vec<Message>>;

    /// Append a message at the end of the conversation
    async fn add_message(&self, message: Message) -> HistoryResult<()>;

    /// Append several messages, keeping their relative order
    async fn add_messages(&self, messages: Vec<Message>) -> HistoryResult<()> {
        for message in messages {
            self.add_message(message).await?;
        }
        Ok(())
    }

    /// Remove every message
    async fn clear(&self) -> HistoryResult<()>;
}

#[async_trait]
impl<T: ChatHistoryStore + ?Sized> ChatHistoryStore for Arc<T> {
    async fn get_messages(&self) -> HistoryResult<Vec<Message>> {
        (**self).get_messages().await
    }

    async fn add_message(&self, message: Message) -> HistoryResult<()> {
        (**self).add_message(message).await
    }

    async fn add_messages(&self, messages: Vec<Message>) -> HistoryResult<()> {
        (**self).add_messages(messages).await
    }

    async fn clear(&self) -> HistoryResult<()> {
        (**self).clear().await
    }
}

/// In-memory chat history backed by a shared vector
#[derive(Debug, Clone, Default)]
pub struct InMemoryChatHistory {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl InMemoryChatHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history pre-populated with messages
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: Arc::new(RwLock::new(messages)),
        }
    }

    /// Number of stored messages
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Whether the history is empty
    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl ChatHistoryStore for InMemoryChatHistory {
    async fn get_messages(&self) -> HistoryResult<Vec<Message>> {
        Ok(self.messages.read().await.clone())
    }

    async fn add_message(&self, message: Message) -> HistoryResult<()> {
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn add_messages(&self, messages: Vec<Message>) -> HistoryResult<()> {
        self.messages.write().await.extend(messages);
        Ok(())
    }

    async fn clear(&self) -> HistoryResult<()> {
        self.messages.write().await.clear();
        Ok(())
    }
}
