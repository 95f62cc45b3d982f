//! Background documents and their prepared summaries.
//!
//! Extraction of PDF and web sources is left to external [`DocumentLoader`] implementations;
//! delimited tables and plain text files are handled here.

mod loader;
mod summarizer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::ModelSnapshot;
use crate::prompts::PromptSet;

pub use loader::{render_table, DelimitedTableLoader, LoaderRegistry, PlainTextLoader};
pub use summarizer::{DocumentSummarizer, SummaryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "CSV")]
    DelimitedTable,
    #[serde(rename = "TXT")]
    PlainText,
}

impl DocumentKind {
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Url => "URL",
            DocumentKind::DelimitedTable => "CSV",
            DocumentKind::PlainText => "TXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    pub id: String,
    pub kind: DocumentKind,
    pub name: String,
    /// File path or URL handed to the loader.
    pub location: String,
}

/// Which preparation stages run for a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarySelection {
    pub summarize_text: bool,
    pub text_with_numbers: bool,
    pub extract_tables: bool,
    pub summarize_tables: bool,
    pub tables_with_numbers: bool,
}

impl SummarySelection {
    pub fn needs_preparation(&self) -> bool {
        self.summarize_text || self.extract_tables
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSelection {
    pub document: SourceDocument,
    pub selection: SummarySelection,
}

/// Prepared background material for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub document: SourceDocument,
    pub selection: SummarySelection,
    pub created_at: DateTime<Utc>,
    pub extracted_text: String,
    pub summarized_text: String,
    pub extracted_tables: Vec<String>,
    pub summarized_tables: Vec<String>,
    pub prompts: PromptSet,
    pub model: ModelSnapshot,
}

impl DocumentSummary {
    /// Tables shown in a briefing: the summaries when present, else the extracted tables.
    pub fn briefing_tables(&self) -> &[String] {
        if self.summarized_tables.is_empty() {
            &self.extracted_tables
        } else {
            &self.summarized_tables
        }
    }
}

/// Format-specific extraction of text and tables.
pub trait DocumentLoader {
    fn extract_text(&self, location: &str) -> Result<String, ExtractionError>;

    /// Tables rendered as text. Positive `row_limit` keeps the first rows, negative the last.
    fn extract_tables(
        &self,
        location: &str,
        row_limit: Option<i64>,
    ) -> Result<Vec<String>, ExtractionError>;
}

/// Failures while reading a document. Logged and treated as empty content.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        source: std::io::Error,
    },
    #[error("invalid table in {location}: {source}")]
    Table {
        location: String,
        source: csv::Error,
    },
    #[error("no loader registered for {} documents", .0.label())]
    Unsupported(DocumentKind),
    #[error("document backend failed: {0}")]
    Backend(String),
}
