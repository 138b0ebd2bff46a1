//! Transcript and usage types shared across the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// One message in the chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    /// Create an assistant message stamped now.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }

    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Whether synthesized audio can be requested for this message.
    /// Only assistant replies are speakable.
    pub fn is_speakable(&self) -> bool {
        self.sender == Sender::Assistant
    }
}

/// Token accounting reported by the API for one exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    /// Accumulate counters reported across streamed fragments.
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// The aggregated result of one streamed chat exchange.
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// Fragments concatenated in arrival order.
    pub text: String,
    /// Usage counters summed across fragments.
    pub usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let user = Message::user("hello");
        assert_eq!(user.sender, Sender::User);
        assert!(!user.is_speakable());

        let reply = Message::assistant("hi");
        assert_eq!(reply.sender, Sender::Assistant);
        assert!(reply.is_speakable());
        assert_ne!(user.id, reply.id);
    }

    #[test]
    fn test_token_usage_add() {
        let mut usage = TokenUsage::default();
        usage.add(TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        });
        usage.add(TokenUsage {
            input_tokens: 0,
            output_tokens: 7,
        });
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 12);
    }

    #[test]
    fn test_sender_serde() {
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::from_str::<Sender>("\"assistant\"").unwrap(),
            Sender::Assistant
        );
    }
}
