//! Prompt templates for briefings, questions, corrections and summaries.
//!
//! Templates use `{name}` placeholders filled from the active persona: `{index}`, `{persona}`
//! for all attributes, or any single attribute name. Names without a value stay verbatim.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::DocumentSummary;
use crate::interview::reply::{ReplyCheck, ReplyError};
use crate::interview::scheduler::{ThemeContext, WorkUnit};
use crate::persona::Persona;
use crate::questionnaire::template::render_prompt;

pub const BRIEFING_PERSONA_DOCUMENTS: &str = "briefing_with_persona_with_documents";
pub const BRIEFING_PERSONA: &str = "briefing_with_persona_without_documents";
pub const BRIEFING_DOCUMENTS: &str = "briefing_without_persona_with_documents";
pub const BRIEFING_PLAIN: &str = "briefing_without_persona_without_documents";
pub const TEXT_SUMMARY_WITH_NUMBERS: &str = "summarize_text_with_numbers";
pub const TEXT_SUMMARY_WITHOUT_NUMBERS: &str = "summarize_text_without_numbers";
pub const TABLE_SUMMARY_WITH_NUMBERS: &str = "summarize_tables_with_numbers";
pub const TABLE_SUMMARY_WITHOUT_NUMBERS: &str = "summarize_tables_without_numbers";

pub const TEMPLATE_NAMES: [&str; 8] = [
    BRIEFING_PERSONA_DOCUMENTS,
    BRIEFING_PERSONA,
    BRIEFING_DOCUMENTS,
    BRIEFING_PLAIN,
    TEXT_SUMMARY_WITH_NUMBERS,
    TEXT_SUMMARY_WITHOUT_NUMBERS,
    TABLE_SUMMARY_WITH_NUMBERS,
    TABLE_SUMMARY_WITHOUT_NUMBERS,
];

pub const QUESTION_PREFIX: &str = "Question:";
pub const STATEMENTS_HEADING: &str = "Statements:";
pub const OPTIONS_HEADING: &str = "Options:";
const TEXTS_HEADING: &str = "Texts:";
const TABLES_HEADING: &str = "Tables:";

const ANSWER_RULES: &str = "Answer every statement on its own line as `number: option`, \
using only the listed statement numbers and option ids. Do not add explanations.";

fn default_template(name: &str) -> String {
    let text = match name {
        BRIEFING_PERSONA_DOCUMENTS => {
            "You take part in a survey as the following person. Answer as this person would.\n\
             {persona}\n\
             Base your answers on the background material below."
        }
        BRIEFING_PERSONA => {
            "You take part in a survey as the following person. Answer as this person would.\n\
             {persona}"
        }
        BRIEFING_DOCUMENTS => {
            "You take part in a survey as a typical respondent. \
             Base your answers on the background material below."
        }
        BRIEFING_PLAIN => "You take part in a survey as a typical respondent.",
        TEXT_SUMMARY_WITH_NUMBERS => {
            "Summarize the following text for survey respondents. Keep all figures and numbers."
        }
        TEXT_SUMMARY_WITHOUT_NUMBERS => {
            "Summarize the following text for survey respondents. Leave out figures and numbers."
        }
        TABLE_SUMMARY_WITH_NUMBERS => {
            "Describe the key findings of the following table. Keep all figures and numbers."
        }
        TABLE_SUMMARY_WITHOUT_NUMBERS => {
            "Describe the key findings of the following table without quoting figures."
        }
        _ => "",
    };
    match name {
        BRIEFING_PERSONA_DOCUMENTS | BRIEFING_PERSONA | BRIEFING_DOCUMENTS | BRIEFING_PLAIN => {
            format!("{text}\n{ANSWER_RULES}")
        }
        _ => text.to_string(),
    }
}

/// Named prompt templates with built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptSet {
    templates: BTreeMap<String, String>,
}

impl Default for PromptSet {
    fn default() -> Self {
        let templates = TEMPLATE_NAMES
            .iter()
            .map(|name| (name.to_string(), default_template(name)))
            .collect();
        Self { templates }
    }
}

impl PromptSet {
    /// Defaults overridden by `<name>.txt` files found in `dir`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, PromptError> {
        let dir = dir.as_ref();
        let mut prompts = Self::default();
        for name in TEMPLATE_NAMES {
            let path = dir.join(format!("{name}.txt"));
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path)
                .map_err(|source| PromptError::Io { path: path.clone(), source })?;
            debug!(template = name, path = %path.display(), "prompt override loaded");
            prompts.set(name, text.trim_end());
        }
        Ok(prompts)
    }

    pub fn get(&self, name: &str) -> &str {
        self.templates.get(name).map(String::as_str).unwrap_or_default()
    }

    pub fn set(&mut self, name: &str, template: impl Into<String>) {
        self.templates.insert(name.to_string(), template.into());
    }

    /// System message opening a sub-conversation.
    pub fn briefing(&self, persona: Option<&Persona>, documents: &[DocumentSummary]) -> String {
        let name = match (persona.is_some(), documents.is_empty()) {
            (true, false) => BRIEFING_PERSONA_DOCUMENTS,
            (true, true) => BRIEFING_PERSONA,
            (false, false) => BRIEFING_DOCUMENTS,
            (false, true) => BRIEFING_PLAIN,
        };

        let template = self.get(name);
        let intro = match persona {
            Some(persona) => {
                let index = persona.index.to_string();
                let description = persona.describe();
                render_prompt(template, |key| match key {
                    "index" => Some(index.as_str()),
                    "persona" => Some(description.as_str()),
                    _ => persona.get(key),
                })
            }
            None => template.to_string(),
        };

        let mut parts = vec![intro];
        let texts: Vec<&str> = documents
            .iter()
            .map(|document| document.summarized_text.as_str())
            .filter(|text| !text.trim().is_empty())
            .collect();
        if !texts.is_empty() {
            parts.push(format!("\n{TEXTS_HEADING}"));
            parts.extend(texts.into_iter().map(|text| format!("\n{text}")));
        }

        let tables: Vec<&str> = documents
            .iter()
            .flat_map(|document| document.briefing_tables())
            .map(String::as_str)
            .collect();
        if !tables.is_empty() {
            parts.push(format!("\n{TABLES_HEADING}"));
            parts.extend(tables.into_iter().map(|table| format!("\n{table}")));
        }

        parts.join("\n")
    }

    pub fn summary_template(&self, tables: bool, with_numbers: bool) -> &str {
        let name = match (tables, with_numbers) {
            (false, true) => TEXT_SUMMARY_WITH_NUMBERS,
            (false, false) => TEXT_SUMMARY_WITHOUT_NUMBERS,
            (true, true) => TABLE_SUMMARY_WITH_NUMBERS,
            (true, false) => TABLE_SUMMARY_WITHOUT_NUMBERS,
        };
        self.get(name)
    }
}

/// User message asking every context of the unit that shares `context`'s rendered text.
pub fn question_message(unit: &WorkUnit, context: &ThemeContext) -> String {
    let mut lines = vec![format!("{QUESTION_PREFIX} {}", context.rendered_text)];

    lines.push(format!("\n{STATEMENTS_HEADING}"));
    for member in unit.batch_for(context) {
        let label = member.topic_name().unwrap_or(&member.rendered_text);
        lines.push(format!("{}: {label}", member.key));
    }

    lines.push(format!("\n{OPTIONS_HEADING}"));
    for option in unit.options() {
        lines.push(format!("{} ({})", option.id, option.text));
    }

    lines.join("\n")
}

fn joined(keys: &std::collections::BTreeSet<String>) -> String {
    keys.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Corrective user message after a reply that broke the key/value contract.
pub fn correction_message(check: &ReplyCheck) -> String {
    [
        "Your answer is not valid. Please answer again and follow the rules.\n".to_string(),
        format!("Stored before your answer: {}", joined(&check.stored_before)),
        format!("Valid numbers in your answer: {}", joined(&check.valid_keys)),
        format!("Unknown numbers in your answer: {}", joined(&check.invalid_keys)),
        format!("Numbers with an invalid option: {}", joined(&check.invalid_value_keys)),
        format!("Stored after your answer: {}", joined(&check.stored_after)),
        format!("Numbers still missing: {}", joined(&check.missing_keys)),
    ]
    .join("\n")
}

/// Corrective user message after a reply that could not be parsed at all.
pub fn unreadable_reply_message(error: &ReplyError) -> String {
    format!("Your answer could not be read ({error}). {ANSWER_RULES}")
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("failed to read prompt template {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
