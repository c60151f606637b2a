//! Token-bounded message window
//!
//! [`MessageWindow`] keeps no messages of its own. Each call reads the full
//! conversation from its [`ChatHistoryStore`], asks its [`TokenCounter`] what
//! the candidate lists cost, drops the oldest messages until the configured
//! budget is respected, and hands back either the survivors or their
//! transcript.
//!
//! Trimming works on a private copy of the history. The store is never
//! written while trimming, so a failing counter leaves nothing half-evicted:
//! the caller gets the whole result or an error.
//!
//! ```rust
//! use token_window::{
//!     ApproximateCounter, ChatHistoryStore, InMemoryChatHistory, Message, MessageWindow,
//!     WindowConfig, WindowOutput,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let history = InMemoryChatHistory::new();
//! history.add_message(Message::human("hi")).await?;
//! history.add_message(Message::ai("hello")).await?;
//!
//! let window = MessageWindow::new(
//!     history.clone(),
//!     ApproximateCounter::default(),
//!     WindowConfig::default(),
//! )?;
//!
//! match window.load_trimmed(None).await? {
//!     WindowOutput::Transcript(text) => assert_eq!(text, "Human: hi\nAI: hello"),
//!     WindowOutput::Messages(_) => unreachable!(),
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::WindowConfig;
use crate::error::{MemoryError, Result};
use crate::history::ChatHistoryStore;
use crate::messages::{get_buffer_string, Message};
use crate::policy::{EvictionStrategy, Prospective, Retrospective, TrimPolicy};
use crate::token_counter::TokenCounter;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Memory variables exchanged with a chain: variable name to value
pub type MemoryVariables = HashMap<String, Value>;

/// Result of loading the window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowOutput {
    /// Surviving messages, oldest first
    Messages(Vec<Message>),
    /// Role-labelled transcript of the surviving messages
    Transcript(String),
}

impl WindowOutput {
    /// The messages, if this output is structured
    pub fn messages(&self) -> Option<&[Message]> {
        match self {
            WindowOutput::Messages(messages) => Some(messages),
            WindowOutput::Transcript(_) => None,
        }
    }

    /// The transcript, if this output is rendered
    pub fn transcript(&self) -> Option<&str> {
        match self {
            WindowOutput::Messages(_) => None,
            WindowOutput::Transcript(text) => Some(text),
        }
    }

    /// Convert into a JSON value: an array of messages or a string
    pub fn into_value(self) -> Result<Value> {
        match self {
            WindowOutput::Messages(messages) => Ok(serde_json::to_value(messages)?),
            WindowOutput::Transcript(text) => Ok(Value::String(text)),
        }
    }
}

/// Rolling chat window bounded by a token budget
pub struct MessageWindow {
    history: Arc<dyn ChatHistoryStore>,
    counter: Arc<dyn TokenCounter>,
    config: WindowConfig,
}

impl MessageWindow {
    /// Create a window over `history`, validating `config`
    pub fn new(
        history: impl ChatHistoryStore + 'static,
        counter: impl TokenCounter + 'static,
        config: WindowConfig,
    ) -> Result<Self> {
        Self::from_shared(Arc::new(history), Arc::new(counter), config)
    }

    /// Create a window from already shared collaborators
    pub fn from_shared(
        history: Arc<dyn ChatHistoryStore>,
        counter: Arc<dyn TokenCounter>,
        config: WindowConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            history,
            counter,
            config,
        })
    }

    /// Window configuration
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Underlying chat history store
    pub fn history(&self) -> &Arc<dyn ChatHistoryStore> {
        &self.history
    }

    /// Load the window using the configured policy.
    ///
    /// `pending_input` is the next human turn. The prospective policy
    /// requires it; the retrospective policy ignores it. Output follows
    /// `return_messages`.
    #[tracing::instrument(
        skip_all,
        fields(policy = %self.config.policy, budget = self.config.budget)
    )]
    pub async fn load_trimmed(&self, pending_input: Option<&str>) -> Result<WindowOutput> {
        let messages = match self.config.policy {
            TrimPolicy::Retrospective => {
                if pending_input.is_some() {
                    tracing::trace!("pending input ignored by retrospective policy");
                }
                self.trim_retrospective().await?
            }
            TrimPolicy::Prospective => {
                let pending = pending_input.ok_or_else(|| {
                    MemoryError::config("prospective policy requires a pending input")
                })?;
                self.trim_prospective(pending).await?
            }
        };

        Ok(self.render(messages))
    }

    /// Fit the stored history to the budget as it stands
    #[tracing::instrument(skip_all, fields(budget = self.config.budget))]
    pub async fn trim_retrospective(&self) -> Result<Vec<Message>> {
        self.trim_with(&Retrospective, None).await
    }

    /// Fit the stored history to the budget, leaving room for `pending_input`.
    ///
    /// The pending input only influences eviction; it is neither stored nor
    /// returned.
    #[tracing::instrument(skip_all, fields(budget = self.config.budget))]
    pub async fn trim_prospective(&self, pending_input: &str) -> Result<Vec<Message>> {
        let pending = Message::human(pending_input);
        self.trim_with(&Prospective, Some(&pending)).await
    }

    async fn trim_with(
        &self,
        strategy: &dyn EvictionStrategy,
        pending: Option<&Message>,
    ) -> Result<Vec<Message>> {
        let history = self.history.get_messages().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to read chat history");
            MemoryError::HistoryUnavailable(e)
        })?;
        let history_len = history.len();

        let trimmed = strategy
            .trim(history, pending, self.config.budget, self.counter.as_ref())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, strategy = strategy.name(), "trimming failed");
                e
            })?;

        tracing::debug!(
            strategy = strategy.name(),
            history_len,
            evicted = history_len - trimmed.len(),
            budget = self.config.budget,
            "trimmed message window"
        );
        Ok(trimmed)
    }

    /// Shape messages according to `return_messages`
    pub fn render(&self, messages: Vec<Message>) -> WindowOutput {
        if self.config.return_messages {
            WindowOutput::Messages(messages)
        } else {
            WindowOutput::Transcript(get_buffer_string(
                &messages,
                &self.config.human_label,
                &self.config.ai_label,
            ))
        }
    }

    /// Memory variables this window publishes
    pub fn memory_keys(&self) -> Vec<String> {
        vec![self.config.memory_key.clone()]
    }

    /// Load the window as memory variables.
    ///
    /// Returns a single entry under `memory_key`. Under the prospective
    /// policy the pending input is taken from `values` (see
    /// [`save_context`](Self::save_context) for key resolution).
    #[tracing::instrument(skip_all, fields(memory_key = %self.config.memory_key))]
    pub async fn load_memory_variables(&self, values: &MemoryVariables) -> Result<MemoryVariables> {
        let pending = match self.config.policy {
            TrimPolicy::Retrospective => None,
            TrimPolicy::Prospective => Some(resolve_value(
                values,
                self.config.input_key.as_deref(),
                "input",
            )?),
        };

        let output = self.load_trimmed(pending.as_deref()).await?;

        let mut variables = MemoryVariables::new();
        variables.insert(self.config.memory_key.clone(), output.into_value()?);
        Ok(variables)
    }

    /// Record one exchange: the human input followed by the AI output.
    ///
    /// Each side is read from `input_key` / `output_key` when configured,
    /// otherwise from the only entry of its map.
    #[tracing::instrument(skip_all)]
    pub async fn save_context(&self, inputs: &MemoryVariables, outputs: &MemoryVariables) -> Result<()> {
        let input = resolve_value(inputs, self.config.input_key.as_deref(), "input")?;
        let output = resolve_value(outputs, self.config.output_key.as_deref(), "output")?;

        self.history
            .add_messages(vec![Message::human(input), Message::ai(output)])
            .await?;
        Ok(())
    }

    /// Remove the whole conversation from the store
    pub async fn clear(&self) -> Result<()> {
        self.history.clear().await?;
        Ok(())
    }
}

impl fmt::Debug for MessageWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageWindow")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Pick one value from a variable map as text
fn resolve_value(values: &MemoryVariables, key: Option<&str>, side: &str) -> Result<String> {
    let value = match key {
        Some(key) => values
            .get(key)
            .ok_or_else(|| MemoryError::config(format!("{} key '{}' not found", side, key)))?,
        None => {
            let mut entries = values.values();
            match (entries.next(), entries.next()) {
                (Some(value), None) => value,
                (None, _) => {
                    return Err(MemoryError::config(format!("no {} values provided", side)))
                }
                (Some(_), Some(_)) => {
                    return Err(MemoryError::config(format!(
                        "{} values have {} keys; set {}_key to choose one",
                        side,
                        values.len(),
                        side
                    )))
                }
            }
        }
    };

    Ok(match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryChatHistory;
    use crate::token_counter::ApproximateCounter;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> MemoryVariables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_resolve_value_single_key() {
        let values = vars(&[("question", json!("why?"))]);
        assert_eq!(resolve_value(&values, None, "input").unwrap(), "why?");
    }

    #[test]
    fn test_resolve_value_explicit_key_and_non_string() {
        let values = vars(&[("a", json!(1)), ("b", json!({"x": true}))]);
        assert_eq!(resolve_value(&values, Some("a"), "input").unwrap(), "1");
        assert_eq!(resolve_value(&values, Some("b"), "input").unwrap(), r#"{"x":true}"#);
        assert!(resolve_value(&values, Some("c"), "input").is_err());
    }

    #[test]
    fn test_resolve_value_ambiguous() {
        let values = vars(&[("a", json!("1")), ("b", json!("2"))]);
        let err = resolve_value(&values, None, "output").unwrap_err();
        assert!(err.to_string().contains("output_key"));
        assert!(resolve_value(&MemoryVariables::new(), None, "input").is_err());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = MessageWindow::new(
            InMemoryChatHistory::new(),
            ApproximateCounter::default(),
            WindowConfig::default().with_budget(0),
        )
        .unwrap_err();
        assert!(matches!(err, MemoryError::Configuration(_)));
    }

    #[test]
    fn test_window_output_accessors() {
        let output = WindowOutput::Transcript("Human: hi".into());
        assert_eq!(output.transcript(), Some("Human: hi"));
        assert!(output.messages().is_none());
        assert_eq!(output.into_value().unwrap(), json!("Human: hi"));
    }

    #[tokio::test]
    async fn test_structured_output() {
        let history = InMemoryChatHistory::with_messages(vec![Message::human("hi").with_id("m1")]);
        let window = MessageWindow::new(
            history,
            ApproximateCounter::default(),
            WindowConfig::default().with_return_messages(true),
        )
        .unwrap();

        let output = window.load_trimmed(None).await.unwrap();
        let messages = output.messages().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_memory_keys() {
        let window = MessageWindow::new(
            InMemoryChatHistory::new(),
            ApproximateCounter::default(),
            WindowConfig::default().with_memory_key("chat_history"),
        )
        .unwrap();
        assert_eq!(window.memory_keys(), vec!["chat_history".to_string()]);
    }
}
