//! Window configuration
//!
//! [`WindowConfig`] is the only state a window carries between calls. It can
//! be built in code, deserialized from TOML/YAML/JSON, or read from
//! environment variables through [`ConfigSource`].
//!
//! ```rust
//! use token_window::{TrimPolicy, WindowConfig};
//!
//! let config = WindowConfig::default()
//!     .with_budget(2000)
//!     .with_labels("User", "Assistant")
//!     .with_policy(TrimPolicy::Prospective);
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Environment variables
//!
//! With prefix `"MEMORY_"` the recognized variables are `MEMORY_BUDGET`,
//! `MEMORY_HUMAN_LABEL`, `MEMORY_AI_LABEL`, `MEMORY_RETURN_MESSAGES`,
//! `MEMORY_MEMORY_KEY`, `MEMORY_INPUT_KEY`, `MEMORY_OUTPUT_KEY` and
//! `MEMORY_POLICY`. Unset variables keep their defaults.

use crate::error::{MemoryError, Result};
use crate::policy::TrimPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Default token budget
pub const DEFAULT_BUDGET: usize = 12000;
/// Default transcript label for human messages
pub const DEFAULT_HUMAN_LABEL: &str = "Human";
/// Default transcript label for AI messages
pub const DEFAULT_AI_LABEL: &str = "AI";
/// Default key the window is published under in memory variables
pub const DEFAULT_MEMORY_KEY: &str = "history";

/// Trait for configuration structures that support validation, environment
/// loading, and merging
pub trait ConfigSource: Default + Clone {
    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Load configuration from environment variables named `{prefix}{FIELD}`
    fn from_env(prefix: &str) -> Result<Self>;

    /// Merge another configuration into this one; values set in `other` win.
    ///
    /// A field counts as set when it differs from its default. An overlay
    /// therefore cannot put a field back to its default value: merging an
    /// overlay with `budget = 12000` into a config with `budget = 100` keeps
    /// 100. Set such fields directly instead.
    fn merge(&mut self, other: Self) -> &mut Self;

    /// Defaults overlaid with the environment, validated
    fn from_env_with_defaults(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        config.merge(Self::from_env(prefix)?);
        config.validate()?;
        Ok(config)
    }
}

/// Static configuration of a token-bounded message window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Maximum aggregate token count of the window
    pub budget: usize,
    /// Transcript label for human messages
    pub human_label: String,
    /// Transcript label for AI messages
    pub ai_label: String,
    /// Return structured messages instead of a transcript
    pub return_messages: bool,
    /// Key the window is published under in memory variables
    pub memory_key: String,
    /// Input variable holding the human turn
    pub input_key: Option<String>,
    /// Output variable holding the AI turn
    pub output_key: Option<String>,
    /// Eviction strategy
    pub policy: TrimPolicy,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            human_label: DEFAULT_HUMAN_LABEL.to_string(),
            ai_label: DEFAULT_AI_LABEL.to_string(),
            return_messages: false,
            memory_key: DEFAULT_MEMORY_KEY.to_string(),
            input_key: None,
            output_key: None,
            policy: TrimPolicy::default(),
        }
    }
}

impl WindowConfig {
    /// Set the token budget
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Set the human and AI transcript labels
    pub fn with_labels(mut self, human: impl Into<String>, ai: impl Into<String>) -> Self {
        self.human_label = human.into();
        self.ai_label = ai.into();
        self
    }

    /// Return structured messages instead of a transcript
    pub fn with_return_messages(mut self, return_messages: bool) -> Self {
        self.return_messages = return_messages;
        self
    }

    /// Set the memory variable key
    pub fn with_memory_key(mut self, key: impl Into<String>) -> Self {
        self.memory_key = key.into();
        self
    }

    /// Set the input variable key
    pub fn with_input_key(mut self, key: impl Into<String>) -> Self {
        self.input_key = Some(key.into());
        self
    }

    /// Set the output variable key
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    /// Set the eviction policy
    pub fn with_policy(mut self, policy: TrimPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check that the configuration can drive a window
    pub fn validate(&self) -> Result<()> {
        if self.budget == 0 {
            return Err(MemoryError::config("budget must be a positive token count"));
        }
        if self.memory_key.is_empty() {
            return Err(MemoryError::config("memory_key must not be empty"));
        }
        Ok(())
    }

    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| MemoryError::config(format!("invalid TOML config: {}", e)))
    }

    /// Parse a YAML document
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| MemoryError::config(format!("invalid YAML config: {}", e)))
    }

    /// Parse a JSON document
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| MemoryError::config(format!("invalid JSON config: {}", e)))
    }

    /// Load and validate a config file; the format follows the extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MemoryError::config(format!("reading config at {}: {}", path.display(), e))
        })?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Self::from_toml_str(&text)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text)?,
            Some("json") => Self::from_json_str(&text)?,
            _ => {
                return Err(MemoryError::config(format!(
                    "unsupported config format: {}",
                    path.display()
                )))
            }
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), budget = config.budget, "loaded window config");
        Ok(config)
    }
}

impl ConfigSource for WindowConfig {
    fn validate(&self) -> Result<()> {
        WindowConfig::validate(self)
    }

    fn from_env(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        let key = |field: &str| format!("{}{}", prefix, field);

        if let Some(budget) = get_env_parse(&key("BUDGET"))? {
            config.budget = budget;
        }
        if let Some(label) = get_env(&key("HUMAN_LABEL"))? {
            config.human_label = label;
        }
        if let Some(label) = get_env(&key("AI_LABEL"))? {
            config.ai_label = label;
        }
        if let Some(flag) = get_env_bool(&key("RETURN_MESSAGES"))? {
            config.return_messages = flag;
        }
        if let Some(memory_key) = get_env(&key("MEMORY_KEY"))? {
            config.memory_key = memory_key;
        }
        config.input_key = get_env(&key("INPUT_KEY"))?;
        config.output_key = get_env(&key("OUTPUT_KEY"))?;
        if let Some(policy) = get_env_parse::<TrimPolicy>(&key("POLICY"))? {
            config.policy = policy;
        }

        Ok(config)
    }

    fn merge(&mut self, other: Self) -> &mut Self {
        let defaults = Self::default();

        if other.budget != defaults.budget {
            self.budget = other.budget;
        }
        if other.human_label != defaults.human_label {
            self.human_label = other.human_label;
        }
        if other.ai_label != defaults.ai_label {
            self.ai_label = other.ai_label;
        }
        if other.return_messages != defaults.return_messages {
            self.return_messages = other.return_messages;
        }
        if other.memory_key != defaults.memory_key {
            self.memory_key = other.memory_key;
        }
        if other.input_key.is_some() {
            self.input_key = other.input_key;
        }
        if other.output_key.is_some() {
            self.output_key = other.output_key;
        }
        if other.policy != defaults.policy {
            self.policy = other.policy;
        }
        self
    }
}

fn get_env(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(MemoryError::config(format!(
            "Environment variable {} contains invalid UTF-8",
            key
        ))),
    }
}

fn get_env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env(key)? {
        Some(val) => {
            let parsed = val.trim().parse::<T>().map_err(|e| {
                MemoryError::config(format!("Failed to parse environment variable {}: {}", key, e))
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_bool(key: &str) -> Result<Option<bool>> {
    match get_env(key)? {
        Some(val) => match val.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(MemoryError::config(format!(
                "Environment variable {} is not a valid boolean: {}",
                key, val
            ))),
        },
        None => Ok(None),
    }
}
