//! Conversation messages and the text generator seam.
//!
//! Hosted backends live outside this crate; they implement [`TextGenerator`] and keep
//! their own token counters, which the interview and summary pipelines snapshot and reset.

mod dry_run;
mod scripted;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use dry_run::DryRunRespondent;
pub use scripted::ScriptedGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One block of a multi-part reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Shapes a backend may return message content in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "value", rename_all = "snake_case")]
pub enum MessageContent {
    Text(String),
    /// Content keyed by a role label, e.g. `{"assistant": "..."}`.
    KeyedText(BTreeMap<String, String>),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Flattens any content shape into plain text for parsing.
    pub fn to_plain_text(&self, role: Role) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::KeyedText(entries) => match entries.get(role.label()) {
                Some(text) => text.clone(),
                None => entries.values().cloned().collect::<Vec<_>>().join("\n"),
            },
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| block.text.as_deref())
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn text(&self) -> String {
        self.content.to_plain_text(self.role)
    }
}

/// Token counters for one model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, input_tokens: u64, output_tokens: u64) {
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
        self.total_tokens += input_tokens + output_tokens;
    }
}

/// Usage accumulated per model name.
pub type UsageByModel = BTreeMap<String, TokenUsage>;

pub fn total_tokens(usage: &UsageByModel) -> u64 {
    usage.values().map(|entry| entry.total_tokens).sum()
}

/// A generative text model. Calls are blocking and atomic; timeouts are the backend's concern.
pub trait TextGenerator {
    fn model_name(&self) -> &str;

    fn invoke(&mut self, messages: &[ChatMessage]) -> Result<ChatMessage, GenerationError>;

    /// Counters accumulated since construction or the last reset.
    fn usage(&self) -> UsageByModel;

    fn reset_usage(&mut self);

    /// Settings worth recording next to results. Secrets must not be included.
    fn configuration(&self) -> BTreeMap<String, serde_json::Value> {
        let mut configuration = BTreeMap::new();
        configuration.insert(
            "model".to_string(),
            serde_json::Value::String(self.model_name().to_string()),
        );
        configuration
    }
}

/// Backend failures. These abort the current run.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generator backend unavailable: {0}")]
    Backend(String),
    #[error("generator quota exhausted: {0}")]
    Quota(String),
    #[error("generator timed out after {0} seconds")]
    Timeout(u64),
    #[error("scripted generator has no reply left for call {call}")]
    ScriptExhausted { call: usize },
}

/// Named message history of one sub-conversation or summarization call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub name: String,
    pub messages: Vec<ChatMessage>,
}

/// Generator settings, usage and transcripts recorded with a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub configuration: BTreeMap<String, serde_json::Value>,
    pub usage: UsageByModel,
    pub transcripts: Vec<Transcript>,
}

impl ModelSnapshot {
    pub fn capture(generator: &dyn TextGenerator, transcripts: Vec<Transcript>) -> Self {
        Self {
            configuration: generator.configuration(),
            usage: generator.usage(),
            transcripts,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        total_tokens(&self.usage)
    }
}

/// Rough token estimate for generators that cannot report real counts.
pub(crate) fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_text_prefers_role_entry() {
        let mut entries = BTreeMap::new();
        entries.insert("assistant".to_string(), "a: 1".to_string());
        entries.insert("metadata".to_string(), "ignored".to_string());
        let content = MessageContent::KeyedText(entries);
        assert_eq!(content.to_plain_text(Role::Assistant), "a: 1");

        let mut entries = BTreeMap::new();
        entries.insert("x".to_string(), "first".to_string());
        entries.insert("y".to_string(), "second".to_string());
        let content = MessageContent::KeyedText(entries);
        assert_eq!(content.to_plain_text(Role::Assistant), "first\nsecond");
    }

    #[test]
    fn blocks_join_non_empty_text() {
        let content = MessageContent::Blocks(vec![
            ContentBlock {
                kind: "text".to_string(),
                text: Some("a: 1".to_string()),
            },
            ContentBlock {
                kind: "reasoning".to_string(),
                text: None,
            },
            ContentBlock {
                kind: "text".to_string(),
                text: Some("b: 2".to_string()),
            },
        ]);
        assert_eq!(content.to_plain_text(Role::Assistant), "a: 1\nb: 2");
    }

    #[test]
    fn usage_accumulates_totals() {
        let mut usage = TokenUsage::default();
        usage.add(10, 4);
        usage.add(1, 1);
        assert_eq!(usage.total_tokens, 16);

        let mut by_model = UsageByModel::new();
        by_model.insert("m".to_string(), usage);
        assert_eq!(total_tokens(&by_model), 16);
    }
}
