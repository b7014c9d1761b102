//! Conversation transcript owned by a session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One question/answer pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exchange {
    /// User question
    pub question: String,
    /// Final answer
    pub answer: String,
    /// When the answer was recorded
    pub at: DateTime<Utc>,
}

impl Exchange {
    /// Create an exchange stamped now
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            at: Utc::now(),
        }
    }
}

/// Ordered question/answer history for one session
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    exchanges: Vec<Exchange>,
}

impl Transcript {
    /// Empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an exchange
    pub fn push(&mut self, exchange: Exchange) {
        self.exchanges.push(exchange);
    }

    /// Drop all exchanges
    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// Size of the JSON encoding in bytes
    pub fn serialized_size(&self) -> usize {
        serde_json::to_vec(&self.exchanges)
            .map(|bytes| bytes.len())
            .unwrap_or(0)
    }

    /// Render as `Human:`/`AI:` lines for prompts
    pub fn render(&self) -> String {
        self.exchanges
            .iter()
            .map(|e| format!("Human: {}\nAI: {}", e.question, e.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_order() {
        let mut transcript = Transcript::new();
        transcript.push(Exchange::new("first?", "one"));
        transcript.push(Exchange::new("second?", "two"));

        let questions: Vec<&str> = transcript
            .exchanges()
            .iter()
            .map(|e| e.question.as_str())
            .collect();
        assert_eq!(questions, vec!["first?", "second?"]);
        assert_eq!(transcript.render(), "Human: first?\nAI: one\nHuman: second?\nAI: two");
    }

    #[test]
    fn test_serialized_size_grows() {
        let mut transcript = Transcript::new();
        let empty = transcript.serialized_size();
        transcript.push(Exchange::new("q", "a".repeat(100)));
        assert!(transcript.serialized_size() > empty + 100);
    }
}
