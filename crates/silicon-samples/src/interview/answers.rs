use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One recorded choice for a topic combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub topic_key: String,
    pub topic_name: Option<String>,
    pub option_id: String,
}

impl AnswerEntry {
    pub fn new(
        topic_key: impl Into<String>,
        topic_name: Option<String>,
        option_id: impl Into<String>,
    ) -> Self {
        Self {
            topic_key: topic_key.into(),
            topic_name,
            option_id: option_id.into(),
        }
    }
}

/// All entries recorded for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub entries: Vec<AnswerEntry>,
}

impl Answer {
    pub fn new(question_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            entries: Vec::new(),
        }
    }

    /// Adds an entry, replacing any earlier entry for the same key.
    pub fn record(&mut self, entry: AnswerEntry) {
        self.entries.retain(|existing| existing.topic_key != entry.topic_key);
        self.entries.push(entry);
    }

    pub fn keys(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .map(|entry| entry.topic_key.as_str())
            .collect()
    }

    pub fn has_option(&self, option_id: &str) -> bool {
        self.entries.iter().any(|entry| entry.option_id == option_id)
    }

    /// Topic keys answered with `option_id`, or every answered key when `None`.
    pub fn keys_with_option(&self, option_id: Option<&str>) -> BTreeSet<&str> {
        self.entries
            .iter()
            .filter(|entry| option_id.map_or(true, |wanted| entry.option_id == wanted))
            .map(|entry| entry.topic_key.as_str())
            .collect()
    }
}

/// Answers accumulated during one interview, keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerStore {
    answers: BTreeMap<String, Answer>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, question_id: &str, entry: AnswerEntry) {
        self.answers
            .entry(question_id.to_string())
            .or_insert_with(|| Answer::new(question_id))
            .record(entry);
    }

    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    pub fn recorded_keys(&self, question_id: &str) -> BTreeSet<&str> {
        self.get(question_id).map(Answer::keys).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Answer)> {
        self.answers.iter()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }
}
