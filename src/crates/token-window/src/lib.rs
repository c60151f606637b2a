//! # token-window - Token-Bounded Conversation Memory
//!
//! **A rolling chat window whose token cost never exceeds a budget.** The
//! window reads the whole conversation from a chat history store on every
//! call, counts it with a model-aware token counter, evicts the oldest
//! messages as needed, and returns the survivors either as structured
//! messages or as a role-labelled transcript.
//!
//! ## Core Concepts
//!
//! ### 1. Collaborators
//!
//! The window owns no storage and does no tokenization. It talks to two
//! capabilities:
//!
//! - [`ChatHistoryStore`] - ordered message storage ([`InMemoryChatHistory`]
//!   is the reference backend)
//! - [`TokenCounter`] - aggregate and per-message counts for a list
//!   ([`TiktokenCounter`] for OpenAI models, [`ApproximateCounter`] offline)
//!
//! Counting is **not additive**: chat framing adds list-level tokens, so every
//! candidate list is counted on its own.
//!
//! ### 2. Eviction Policies
//!
//! | Policy | Considers pending input | Counter calls |
//! |--------|-------------------------|---------------|
//! | [`TrimPolicy::Retrospective`] | no | one per candidate list |
//! | [`TrimPolicy::Prospective`] | yes | one |
//!
//! Both only ever drop a prefix of the history. See [`policy`] for the exact
//! rules.
//!
//! ### 3. Output
//!
//! [`WindowOutput::Messages`] when `return_messages` is set, otherwise
//! [`WindowOutput::Transcript`] rendered by [`get_buffer_string`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use token_window::{
//!     ChatHistoryStore, InMemoryChatHistory, Message, MessageWindow, TiktokenCounter,
//!     TrimPolicy, WindowConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let history = InMemoryChatHistory::new();
//!     history.add_message(Message::human("What is Rust?")).await?;
//!     history.add_message(Message::ai("A systems programming language.")).await?;
//!
//!     let window = MessageWindow::new(
//!         history.clone(),
//!         TiktokenCounter::for_model("gpt-4")?,
//!         WindowConfig::default()
//!             .with_budget(4000)
//!             .with_policy(TrimPolicy::Prospective),
//!     )?;
//!
//!     let output = window.load_trimmed(Some("Is it memory safe?")).await?;
//!     println!("{:?}", output);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`window`] - [`MessageWindow`], [`WindowOutput`], memory variables
//! - [`policy`] - [`TrimPolicy`], [`EvictionStrategy`], [`Retrospective`], [`Prospective`]
//! - [`token_counter`] - [`TokenCounter`], [`TokenCounts`], bundled counters
//! - [`history`] - [`ChatHistoryStore`], [`InMemoryChatHistory`]
//! - [`messages`] - [`Message`], [`MessageRole`], transcript rendering
//! - [`config`] - [`WindowConfig`], [`ConfigSource`]
//! - [`error`] - [`MemoryError`] and collaborator errors

pub mod config;
pub mod error;
pub mod history;
pub mod messages;
pub mod policy;
pub mod token_counter;
pub mod window;

// Re-export main types
pub use config::{ConfigSource, WindowConfig};
pub use error::{CountError, HistoryError, MemoryError, Result};
pub use history::{ChatHistoryStore, InMemoryChatHistory};
pub use messages::{get_buffer_string, Message, MessageRole};
pub use policy::{EvictionStrategy, Prospective, Retrospective, TrimPolicy};
pub use token_counter::{
    ApproximateCounter, CountingMethod, TiktokenCounter, TokenCounter, TokenCounts,
};
pub use window::{MemoryVariables, MessageWindow, WindowOutput};
