use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use super::{estimate_tokens, ChatMessage, GenerationError, Role, TextGenerator, UsageByModel};
use crate::prompts::{OPTIONS_HEADING, STATEMENTS_HEADING};

/// Offline respondent that answers every listed statement with a random listed option.
///
/// Useful for walking a questionnaire's branching without a model backend.
#[derive(Debug)]
pub struct DryRunRespondent {
    rng: StdRng,
    usage: UsageByModel,
}

impl DryRunRespondent {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            usage: UsageByModel::new(),
        }
    }
}

struct QuestionSheet {
    keys: Vec<String>,
    options: Vec<String>,
}

fn section<'a>(text: &'a str, heading: &str) -> Vec<&'a str> {
    text.lines()
        .skip_while(|line| line.trim() != heading)
        .skip(1)
        .take_while(|line| !line.trim().is_empty())
        .collect()
}

fn read_sheet(message: &ChatMessage) -> Option<QuestionSheet> {
    let text = message.text();
    let keys: Vec<String> = section(&text, STATEMENTS_HEADING)
        .into_iter()
        .filter_map(|line| line.split_once(": ").map(|(key, _)| key.trim().to_string()))
        .collect();
    let options: Vec<String> = section(&text, OPTIONS_HEADING)
        .into_iter()
        .map(|line| match line.split_once(" (") {
            Some((id, _)) => id.trim().to_string(),
            None => line.trim().to_string(),
        })
        .collect();

    if keys.is_empty() || options.is_empty() {
        None
    } else {
        Some(QuestionSheet { keys, options })
    }
}

impl TextGenerator for DryRunRespondent {
    fn model_name(&self) -> &str {
        "dry-run"
    }

    fn invoke(&mut self, messages: &[ChatMessage]) -> Result<ChatMessage, GenerationError> {
        let sheet = messages
            .iter()
            .rev()
            .filter(|message| message.role == Role::User)
            .find_map(read_sheet)
            .ok_or_else(|| {
                GenerationError::Backend("no question sheet in conversation".to_string())
            })?;

        let mut lines = Vec::with_capacity(sheet.keys.len());
        for key in &sheet.keys {
            if let Some(option) = sheet.options.choose(&mut self.rng) {
                lines.push(format!("{key}: {option}"));
            }
        }
        let reply = ChatMessage::assistant(lines.join("\n"));

        let input: u64 = messages
            .iter()
            .map(|message| estimate_tokens(&message.text()))
            .sum();
        self.usage
            .entry(self.model_name().to_string())
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
