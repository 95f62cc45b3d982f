use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answers::AnswerStore;
use super::keys::key_parts;
use crate::documents::DocumentSummary;
use crate::llm::ModelSnapshot;
use crate::persona::Persona;
use crate::prompts::PromptSet;
use crate::questionnaire::Question;
use crate::storage::StorageError;

/// Everything recorded for one simulated respondent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewResult {
    /// 1-based position within a sample batch.
    pub repetition: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub documents: Vec<DocumentSummary>,
    pub questions: Vec<Question>,
    pub answers: AnswerStore,
    pub prompts: PromptSet,
    #[serde(default)]
    pub persona: Option<Persona>,
    pub model: ModelSnapshot,
}

#[derive(Debug, Serialize)]
struct AnswerRow<'a> {
    question_id: &'a str,
    question_text: &'a str,
    topic_key: &'a str,
    parent_question_id: &'a str,
    parent_topic_id: &'a str,
    parent_topic_text: &'a str,
    topic_id: &'a str,
    topic_text: &'a str,
    option_id: &'a str,
    option_text: &'a str,
}

impl InterviewResult {
    fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions
            .iter()
            .find(|question| question.id == question_id)
    }

    /// Flattens answers into one `;`-separated row per answered key, in questionnaire
    /// order. Composite keys are split into parent question, parent topic and own topic,
    /// each resolved to its declared text.
    pub fn write_answers_csv<W: Write>(&self, writer: W) -> Result<(), StorageError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_writer(writer);

        for question in &self.questions {
            let Some(answer) = self.answers.get(&question.id) else {
                continue;
            };
            for entry in &answer.entries {
                let (parent_question_id, parent_topic_id, topic_id) =
                    match key_parts(&entry.topic_key).as_slice() {
                        [parent, parent_topic, topic] => (*parent, *parent_topic, *topic),
                        [parent, parent_topic] => (*parent, *parent_topic, ""),
                        _ if entry.topic_key == question.id => ("", "", ""),
                        _ => ("", "", entry.topic_key.as_str()),
                    };
                let parent_topic_text = self
                    .question(parent_question_id)
                    .and_then(|parent| parent.topic_text(parent_topic_id))
                    .unwrap_or("");

                csv_writer.serialize(AnswerRow {
                    question_id: &question.id,
                    question_text: &question.text,
                    topic_key: &entry.topic_key,
                    parent_question_id,
                    parent_topic_id,
                    parent_topic_text,
                    topic_id,
                    topic_text: question.topic_text(topic_id).unwrap_or(""),
                    option_id: &entry.option_id,
                    option_text: question.option_text(&entry.option_id).unwrap_or(""),
                })?;
            }
        }
        csv_writer.flush().map_err(|source| StorageError::Io {
            path: "<answers csv>".into(),
            source,
        })?;
        Ok(())
    }
}
