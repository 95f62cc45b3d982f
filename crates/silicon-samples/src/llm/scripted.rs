use std::collections::VecDeque;

use super::{
    estimate_tokens, ChatMessage, GenerationError, MessageContent, Role, TextGenerator,
    UsageByModel,
};

/// Replays canned replies in order. Used for transcript replays and tests.
#[derive(Debug, Clone)]
pub struct ScriptedGenerator {
    model: String,
    replies: VecDeque<MessageContent>,
    calls: usize,
    received: Vec<Vec<ChatMessage>>,
    usage: UsageByModel,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_contents(
            replies
                .into_iter()
                .map(|reply| MessageContent::Text(reply.into())),
        )
    }

    pub fn with_contents<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = MessageContent>,
    {
        Self {
            model: "scripted".to_string(),
            replies: replies.into_iter().collect(),
            calls: 0,
            received: Vec::new(),
            usage: UsageByModel::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn remaining(&self) -> usize {
        self.replies.len()
    }

    /// Message histories passed to each call, in call order.
    pub fn received(&self) -> &[Vec<ChatMessage>] {
        &self.received
    }
}

impl TextGenerator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn invoke(&mut self, messages: &[ChatMessage]) -> Result<ChatMessage, GenerationError> {
        self.calls += 1;
        self.received.push(messages.to_vec());

        let content = self
            .replies
            .pop_front()
            .ok_or(GenerationError::ScriptExhausted { call: self.calls })?;

        let reply = ChatMessage {
            role: Role::Assistant,
            content,
        };
        let input: u64 = messages
            .iter()
            .map(|message| estimate_tokens(&message.text()))
            .sum();
        self.usage
            .entry(self.model.clone())
            .or_default()
            .add(input, estimate_tokens(&reply.text()));

        Ok(reply)
    }

    fn usage(&self) -> UsageByModel {
        self.usage.clone()
    }

    fn reset_usage(&mut self) {
        self.usage.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_in_order_then_fails() {
        let mut generator = ScriptedGenerator::new(["first", "second"]);
        let history = vec![ChatMessage::user("hello")];

        assert_eq!(generator.invoke(&history).expect("reply").text(), "first");
        assert_eq!(generator.invoke(&history).expect("reply").text(), "second");
        let error = generator.invoke(&history).expect_err("script exhausted");
        assert!(matches!(error, GenerationError::ScriptExhausted { call: 3 }));
        assert_eq!(generator.received().len(), 3);
    }

    #[test]
    fn usage_can_be_reset() {
        let mut generator = ScriptedGenerator::new(["reply"]).with_model("replay");
        generator
            .invoke(&[ChatMessage::user("some prompt text")])
            .expect("reply");
        let usage = generator.usage();
        assert!(usage["replay"].total_tokens > 0);

        generator.reset_usage();
        assert!(generator.usage().is_empty());
    }
}
