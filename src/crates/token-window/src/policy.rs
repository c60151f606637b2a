//! Eviction strategies
//!
//! Both strategies answer the same question, "how many of the oldest messages
//! must go?", and never touch anything but the front of the history:
//!
//! - [`Retrospective`] drops the oldest message until the *current* history
//!   fits, recounting the remaining list after every drop.
//! - [`Prospective`] counts the history plus a pending (not yet stored) human
//!   input once, then scans suffix sums from the front.
//!
//! [`TrimPolicy`] selects one of them from configuration.

use crate::error::{MemoryError, Result};
use crate::messages::Message;
use crate::token_counter::TokenCounter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which eviction strategy a window uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimPolicy {
    /// Fit the stored history as it is
    #[default]
    Retrospective,
    /// Leave room for a pending input
    Prospective,
}

impl TrimPolicy {
    /// Strategy implementing this policy
    pub fn strategy(self) -> &'static dyn EvictionStrategy {
        match self {
            TrimPolicy::Retrospective => &Retrospective,
            TrimPolicy::Prospective => &Prospective,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrimPolicy::Retrospective => "retrospective",
            TrimPolicy::Prospective => "prospective",
        }
    }
}

impl fmt::Display for TrimPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrimPolicy {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retrospective" => Ok(TrimPolicy::Retrospective),
            "prospective" => Ok(TrimPolicy::Prospective),
            other => Err(MemoryError::config(format!("unknown trim policy '{}'", other))),
        }
    }
}

/// Decides how many messages to evict from the front of a history
#[async_trait]
pub trait EvictionStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Number of leading messages of `history` to evict
    async fn evict_count(
        &self,
        history: &[Message],
        pending: Option<&Message>,
        budget: usize,
        counter: &dyn TokenCounter,
    ) -> Result<usize>;

    /// Evict the leading messages chosen by [`evict_count`](Self::evict_count)
    async fn trim(
        &self,
        mut history: Vec<Message>,
        pending: Option<&Message>,
        budget: usize,
        counter: &dyn TokenCounter,
    ) -> Result<Vec<Message>> {
        let evicted = self.evict_count(&history, pending, budget, counter).await?;
        history.drain(..evicted);
        Ok(history)
    }
}

/// Drop the oldest message until the remaining history fits the budget.
///
/// Every candidate list is counted with a fresh call because list-level
/// framing makes counts non-additive. The loop ends when the total fits or
/// the list is empty, so a single oversized message is evicted too.
#[derive(Debug, Clone, Copy, Default)]
pub struct Retrospective;

#[async_trait]
impl EvictionStrategy for Retrospective {
    fn name(&self) -> &'static str {
        "retrospective"
    }

    async fn evict_count(
        &self,
        history: &[Message],
        _pending: Option<&Message>,
        budget: usize,
        counter: &dyn TokenCounter,
    ) -> Result<usize> {
        let mut start = 0;

        while start < history.len() {
            let counts = counter.count(&history[start..]).await?;
            if counts.total <= budget {
                break;
            }
            tracing::trace!(index = start, total = counts.total, budget, "evicting oldest message");
            start += 1;
        }

        Ok(start)
    }
}

/// Evict by suffix sums over history plus the pending input.
///
/// The per-message counts come from one counter call over the extended list
/// (history followed by the pending input). Index `i` walks the original
/// history positions from 0 while `i` is below the length of the history
/// *after* the evictions made so far, so each eviction shortens the scan from
/// both ends. At each step the suffix `counts[i..]`, pending input included,
/// is compared to the budget: above it evicts the current front message,
/// otherwise the scan stops.
///
/// The shrinking bound can end the scan while the survivors plus the pending
/// input still exceed the budget. That is the established behavior and is
/// kept as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prospective;

#[async_trait]
impl EvictionStrategy for Prospective {
    fn name(&self) -> &'static str {
        "prospective"
    }

    async fn evict_count(
        &self,
        history: &[Message],
        pending: Option<&Message>,
        budget: usize,
        counter: &dyn TokenCounter,
    ) -> Result<usize> {
        let pending = pending.ok_or_else(|| {
            MemoryError::config("prospective trimming requires a pending input")
        })?;

        let mut extended = Vec::with_capacity(history.len() + 1);
        extended.extend_from_slice(history);
        extended.push(pending.clone());

        let counts = counter.count(&extended).await?.ensure_len(extended.len())?;

        let mut remaining = history.len();
        let mut index = 0;
        while index < remaining {
            let suffix: usize = counts.per_message[index..].iter().sum();
            if suffix <= budget {
                break;
            }
            tracing::trace!(index, suffix, budget, "evicting oldest message");
            remaining -= 1;
            index += 1;
        }

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CountError;
    use crate::token_counter::TokenCounts;

    /// Counter that charges each message its content length in tokens
    struct LengthCounter {
        overhead: usize,
    }

    #[async_trait]
    impl TokenCounter for LengthCounter {
        async fn count(&self, messages: &[Message]) -> std::result::Result<TokenCounts, CountError> {
            let per_message: Vec<usize> = messages.iter().map(|m| m.content.len()).collect();
            let total = per_message.iter().sum::<usize>() + self.overhead;
            Ok(TokenCounts::new(total, per_message))
        }
    }

    fn history(costs: &[usize]) -> Vec<Message> {
        costs.iter().map(|&c| Message::human("x".repeat(c))).collect()
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("Prospective".parse::<TrimPolicy>().unwrap(), TrimPolicy::Prospective);
        assert_eq!(" retrospective ".parse::<TrimPolicy>().unwrap(), TrimPolicy::Retrospective);
        assert!("newest".parse::<TrimPolicy>().is_err());
        assert_eq!(TrimPolicy::default().to_string(), "retrospective");
    }

    #[test]
    fn test_policy_selects_strategy() {
        assert_eq!(TrimPolicy::Retrospective.strategy().name(), "retrospective");
        assert_eq!(TrimPolicy::Prospective.strategy().name(), "prospective");
    }

    #[tokio::test]
    async fn test_retrospective_simple_overflow() {
        let counter = LengthCounter { overhead: 0 };
        let evicted = Retrospective
            .evict_count(&history(&[3, 3, 3]), None, 5, &counter)
            .await
            .unwrap();
        assert_eq!(evicted, 2);
    }

    #[tokio::test]
    async fn test_retrospective_uses_list_overhead() {
        // Sums alone would fit after one eviction; the overhead forces two
        let counter = LengthCounter { overhead: 2 };
        let evicted = Retrospective
            .evict_count(&history(&[3, 3, 3]), None, 6, &counter)
            .await
            .unwrap();
        assert_eq!(evicted, 2);
    }

    #[tokio::test]
    async fn test_retrospective_can_empty_the_window() {
        let counter = LengthCounter { overhead: 0 };
        let trimmed = Retrospective
            .trim(history(&[2, 50]), None, 10, &counter)
            .await
            .unwrap();
        assert!(trimmed.is_empty());
    }

    #[tokio::test]
    async fn test_prospective_requires_pending() {
        let counter = LengthCounter { overhead: 0 };
        let err = Prospective
            .evict_count(&history(&[1]), None, 10, &counter)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_prospective_stop_early() {
        let counter = LengthCounter { overhead: 0 };
        let pending = Message::human("x".repeat(10));
        let trimmed = Prospective
            .trim(history(&[2, 2]), Some(&pending), 12, &counter)
            .await
            .unwrap();
        assert_eq!(trimmed.len(), 1);
    }

    #[tokio::test]
    async fn test_prospective_shrinking_bound_stops_scan() {
        // A plain suffix sweep would evict all four; the bound meets the index at two
        let counter = LengthCounter { overhead: 0 };
        let pending = Message::human("x".repeat(5));
        let evicted = Prospective
            .evict_count(&history(&[5, 5, 5, 5]), Some(&pending), 5, &counter)
            .await
            .unwrap();
        assert_eq!(evicted, 2);
    }

    #[tokio::test]
    async fn test_prospective_bound_excludes_pending_position() {
        // Suffix 15 at index 1 is over budget, but one history message is left
        let counter = LengthCounter { overhead: 0 };
        let pending = Message::human("x".repeat(10));
        let evicted = Prospective
            .evict_count(&history(&[2, 5]), Some(&pending), 12, &counter)
            .await
            .unwrap();
        assert_eq!(evicted, 1);
    }

    #[tokio::test]
    async fn test_prospective_never_counts_past_history() {
        let counter = LengthCounter { overhead: 0 };
        let pending = Message::human("x".repeat(100));
        let evicted = Prospective
            .evict_count(&[], Some(&pending), 10, &counter)
            .await
            .unwrap();
        assert_eq!(evicted, 0);
    }
}
