//! Token counting for chat message lists
//!
//! Chat models charge framing tokens on top of message text: a few tokens per
//! message for role separators and a fixed priming cost for the reply. Those
//! list-level tokens make counting non-additive, so a [`TokenCounter`] always
//! answers for a concrete list and returns both the aggregate and the
//! per-message breakdown:
//!
//! - [`TokenCounts::total`] - cost of sending the whole list
//! - [`TokenCounts::per_message`] - cost attributed to each entry, positionally
//!
//! `total` is generally *not* `per_message.iter().sum()`. Callers that need
//! the cost of a different list must ask again.
//!
//! Two counters ship with the crate:
//!
//! - [`TiktokenCounter`] - exact BPE counts for OpenAI chat models
//! - [`ApproximateCounter`] - character-ratio estimate, no tokenizer needed

use crate::error::CountError;
use crate::messages::{Message, MessageRole};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Tokens every chat completion reply is primed with
pub const REPLY_PRIMING_TOKENS: usize = 3;

/// Token counts for one list of messages
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenCounts {
    /// Aggregate cost of the whole list, including list-level overhead
    pub total: usize,
    /// Cost of each message, aligned with the input list
    pub per_message: Vec<usize>,
}

impl TokenCounts {
    /// Create token counts
    pub fn new(total: usize, per_message: Vec<usize>) -> Self {
        Self { total, per_message }
    }

    /// Check that the breakdown covers exactly `expected` messages
    pub fn ensure_len(self, expected: usize) -> Result<Self, CountError> {
        if self.per_message.len() != expected {
            return Err(CountError::LengthMismatch {
                expected,
                got: self.per_message.len(),
            });
        }
        Ok(self)
    }
}

/// Counts tokens for an ordered list of messages
#[async_trait]
pub trait TokenCounter: Send + Sync {
    /// Count `messages` as one request would be charged
    async fn count(&self, messages: &[Message]) -> Result<TokenCounts, CountError>;
}

#[async_trait]
impl<T: TokenCounter + ?Sized> TokenCounter for Arc<T> {
    async fn count(&self, messages: &[Message]) -> Result<TokenCounts, CountError> {
        (**self).count(messages).await
    }
}

/// Role name as seen by the chat completion API
fn api_role(role: &MessageRole) -> &str {
    match role {
        MessageRole::Human => "user",
        MessageRole::Ai => "assistant",
        MessageRole::System => "system",
        MessageRole::Custom(label) => label,
    }
}

/// Exact token counter for OpenAI chat models using `tiktoken-rs`
///
/// Per message: `tokens_per_message + tokens(role) + tokens(content)`, plus
/// `tokens_per_name + tokens(name)` when the message is named. The total adds
/// [`REPLY_PRIMING_TOKENS`].
#[derive(Clone)]
pub struct TiktokenCounter {
    model: String,
    bpe: Arc<tiktoken_rs::CoreBPE>,
    tokens_per_message: i64,
    tokens_per_name: i64,
}

impl TiktokenCounter {
    /// Create a counter for a specific model name
    pub fn for_model(model: impl Into<String>) -> Result<Self, CountError> {
        let model = model.into();
        let bpe = tiktoken_rs::get_bpe_from_model(&model).map_err(|e| CountError::Tokenizer {
            model: model.clone(),
            reason: e.to_string(),
        })?;

        // gpt-3.5-turbo-0301 framed messages differently from later models
        let (tokens_per_message, tokens_per_name) = if model == "gpt-3.5-turbo-0301" {
            (4, -1)
        } else {
            (3, 1)
        };

        Ok(Self {
            model,
            bpe: Arc::new(bpe),
            tokens_per_message,
            tokens_per_name,
        })
    }

    /// Model this counter was built for
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Count tokens in raw text
    pub fn count_text(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Count the tokens attributed to a single message
    pub fn count_message(&self, message: &Message) -> usize {
        let mut tokens = self.tokens_per_message
            + self.count_text(api_role(&message.role)) as i64
            + self.count_text(&message.content) as i64;

        if let Some(name) = &message.name {
            tokens += self.tokens_per_name + self.count_text(name) as i64;
        }

        tokens.max(0) as usize
    }
}

impl fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("model", &self.model)
            .field("tokens_per_message", &self.tokens_per_message)
            .field("tokens_per_name", &self.tokens_per_name)
            .finish()
    }
}

#[async_trait]
impl TokenCounter for TiktokenCounter {
    async fn count(&self, messages: &[Message]) -> Result<TokenCounts, CountError> {
        let per_message: Vec<usize> = messages.iter().map(|m| self.count_message(m)).collect();
        let total = per_message.iter().sum::<usize>() + REPLY_PRIMING_TOKENS;
        Ok(TokenCounts::new(total, per_message))
    }
}

/// Token counting method for [`ApproximateCounter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountingMethod {
    /// Character-based approximation (fast, less accurate)
    Approximation,
    /// Word and punctuation heuristic resembling BPE splits
    BpeSimulation,
}

/// Estimating token counter that needs no tokenizer data
#[derive(Debug, Clone)]
pub struct ApproximateCounter {
    model: String,
    tokens_per_char: f32,
    method: CountingMethod,
}

impl ApproximateCounter {
    /// Role token plus message framing
    const MESSAGE_OVERHEAD: usize = 4;

    /// Create an estimator tuned for a model family
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        let tokens_per_char = Self::tokens_per_char(&model);

        Self {
            model,
            tokens_per_char,
            method: CountingMethod::Approximation,
        }
    }

    /// Use a specific counting method
    pub fn with_method(mut self, method: CountingMethod) -> Self {
        self.method = method;
        self
    }

    /// Model this estimator was tuned for
    pub fn model(&self) -> &str {
        &self.model
    }

    fn tokens_per_char(model: &str) -> f32 {
        if model.contains("gpt") || model.contains("openai") {
            0.25
        } else if model.contains("claude") || model.contains("anthropic") {
            0.27
        } else if model.contains("llama") {
            0.23
        } else {
            0.25
        }
    }

    /// Estimate tokens in raw text
    pub fn count_text(&self, text: &str) -> usize {
        match self.method {
            CountingMethod::Approximation => {
                (text.chars().count() as f32 * self.tokens_per_char).ceil() as usize
            }
            CountingMethod::BpeSimulation => {
                let words = text.split_whitespace().count();
                let punct = text.chars().filter(|c| c.is_ascii_punctuation()).count();
                ((words + punct / 2) as f32 * 1.3).ceil() as usize
            }
        }
    }

    /// Estimate the tokens attributed to a single message
    pub fn count_message(&self, message: &Message) -> usize {
        let name = message.name.as_deref().map_or(0, |n| self.count_text(n));
        Self::MESSAGE_OVERHEAD + self.count_text(&message.content) + name
    }
}

impl Default for ApproximateCounter {
    fn default() -> Self {
        Self::new("gpt-4")
    }
}

#[async_trait]
impl TokenCounter for ApproximateCounter {
    async fn count(&self, messages: &[Message]) -> Result<TokenCounts, CountError> {
        let per_message: Vec<usize> = messages.iter().map(|m| self.count_message(m)).collect();
        let total = per_message.iter().sum::<usize>() + REPLY_PRIMING_TOKENS;
        Ok(TokenCounts::new(total, per_message))
    }
}
