//! Parsed questionnaire definitions.
//!
//! A [`QuestionCatalog`] is built once from an XML source and shared read-only by every
//! simulated respondent. Follow-up questions reference a parent question and may restrict
//! themselves to the parent topics answered with a particular option.

mod normalizer;
mod parser;
pub mod template;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Reserved separator inside composite topic keys.
pub const KEY_SEPARATOR: &str = "::";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub text: String,
}

/// Dependency of a follow-up question on an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentLink {
    pub question_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_option: Option<String>,
    /// Maximum number of parent topics the follow-up repeats for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_limit: Option<usize>,
    #[serde(default)]
    pub randomize_topics: bool,
}

impl ParentLink {
    pub fn samples_topics(&self) -> bool {
        self.topic_limit.is_some() || self.randomize_topics
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    /// Template text; `{{thema}}` and `{{thema_prev}}` are filled per topic combination.
    pub text: String,
    pub options: Vec<AnswerOption>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentLink>,
}

impl Question {
    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_ref().map(|link| link.question_id.as_str())
    }

    pub fn required_option(&self) -> Option<&str> {
        self.parent
            .as_ref()
            .and_then(|link| link.required_option.as_deref())
    }

    pub fn has_topics(&self) -> bool {
        !self.topics.is_empty()
    }

    pub fn topic_text(&self, topic_id: &str) -> Option<&str> {
        self.topics
            .iter()
            .find(|topic| topic.id == topic_id)
            .map(|topic| topic.text.as_str())
    }

    pub fn option_text(&self, option_id: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.id == option_id)
            .map(|option| option.text.as_str())
    }
}

/// Immutable, validated set of questions in declaration order.
#[derive(Debug, Clone)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
    index: HashMap<String, usize>,
}

impl QuestionCatalog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_xml(&xml)?;
        info!(path = %path.display(), questions = catalog.len(), "questionnaire loaded");
        Ok(catalog)
    }

    pub fn from_xml(xml: &str) -> Result<Self, CatalogError> {
        let questions = parser::parse_questions(xml)?;
        Self::build(questions)
    }

    /// Validates cross-question constraints and indexes the questions.
    pub fn build(questions: Vec<Question>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(questions.len());
        for (position, question) in questions.iter().enumerate() {
            if index.insert(question.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateQuestion(question.id.clone()));
            }
        }

        for question in &questions {
            let Some(parent_id) = question.parent_id() else {
                continue;
            };
            if parent_id == question.id {
                return Err(CatalogError::SelfReference(question.id.clone()));
            }
            if !index.contains_key(parent_id) {
                return Err(CatalogError::UnknownParent {
                    question: question.id.clone(),
                    parent: parent_id.to_string(),
                });
            }
        }

        Ok(Self { questions, index })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, question_id: &str) -> Option<&Question> {
        self.index
            .get(question_id)
            .map(|position| &self.questions[*position])
    }

    pub fn parent_of(&self, question: &Question) -> Option<&Question> {
        question.parent_id().and_then(|parent_id| self.get(parent_id))
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Raised when a questionnaire source cannot be turned into a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read questionnaire {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed questionnaire XML: {0}")]
    Malformed(String),
    #[error("<Question> without a usable id attribute")]
    MissingId,
    #[error("duplicate question id '{0}'")]
    DuplicateQuestion(String),
    #[error("question '{question}': id '{id}' contains the reserved separator")]
    ReservedSeparator { question: String, id: String },
    #[error("question '{question}': parent-topic-limit must be a whole number >= 1, got '{value}'")]
    InvalidTopicLimit { question: String, value: String },
    #[error("question '{question}': {attribute} must be true/false, 1/0 or yes/no, got '{value}'")]
    InvalidFlag {
        question: String,
        attribute: &'static str,
        value: String,
    },
    #[error("question '{0}': parent topic sampling is configured without a parent question")]
    SamplingWithoutParent(String),
    #[error("question '{0}': <Text> is missing or empty")]
    MissingText(String),
    #[error("question '{0}': no <Option> inside <Options>")]
    MissingOptions(String),
    #[error("question '{0}': option without id or text")]
    InvalidOption(String),
    #[error("question '{question}': option id '{option}' must not contain ':'")]
    ReservedOptionId { question: String, option: String },
    #[error("question '{question}': duplicate option id '{option}'")]
    DuplicateOption { question: String, option: String },
    #[error("question '{0}': topic without id or text")]
    InvalidTopic(String),
    #[error("question '{question}': duplicate topic id '{topic}'")]
    DuplicateTopic { question: String, topic: String },
    #[error("question '{question}' depends on unknown question '{parent}'")]
    UnknownParent { question: String, parent: String },
    #[error("question '{0}' lists itself as its parent")]
    SelfReference(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, parent: Option<&str>) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {id}"),
            options: vec![AnswerOption {
                id: "1".to_string(),
                text: "yes".to_string(),
            }],
            topics: Vec::new(),
            parent: parent.map(|parent| ParentLink {
                question_id: parent.to_string(),
                required_option: None,
                topic_limit: None,
                randomize_topics: false,
            }),
        }
    }

    #[test]
    fn build_accepts_forward_parent_references() {
        let catalog = QuestionCatalog::build(vec![question("B", Some("A")), question("A", None)])
            .expect("forward reference resolves");
        let child = catalog.get("B").expect("child indexed");
        assert_eq!(catalog.parent_of(child).map(|q| q.id.as_str()), Some("A"));
        assert_eq!(catalog.questions()[0].id, "B");
    }

    #[test]
    fn build_rejects_unknown_parent() {
        let error = QuestionCatalog::build(vec![question("B", Some("typo"))])
            .expect_err("unknown parent rejected");
        assert!(matches!(
            error,
            CatalogError::UnknownParent { ref question, ref parent } if question == "B" && parent == "typo"
        ));
    }

    #[test]
    fn build_rejects_duplicates_and_self_reference() {
        let error = QuestionCatalog::build(vec![question("A", None), question("A", None)])
            .expect_err("duplicate rejected");
        assert!(matches!(error, CatalogError::DuplicateQuestion(ref id) if id == "A"));

        let error = QuestionCatalog::build(vec![question("A", Some("A"))])
            .expect_err("self reference rejected");
        assert!(matches!(error, CatalogError::SelfReference(_)));
    }
}
