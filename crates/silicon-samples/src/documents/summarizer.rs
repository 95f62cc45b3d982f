use chrono::Utc;
use tracing::{debug, info, warn};

use super::{DocumentSelection, DocumentSummary, ExtractionError, LoaderRegistry};
use crate::config::DocumentConfig;
use crate::llm::{ChatMessage, GenerationError, ModelSnapshot, TextGenerator, Transcript};
use crate::prompts::PromptSet;

/// Linear per-document preparation: extract text, summarize text, extract tables,
/// summarize tables. Model output is recorded verbatim without validation.
#[derive(Debug)]
pub struct DocumentSummarizer {
    prompts: PromptSet,
    loaders: LoaderRegistry,
    table_row_limit: Option<i64>,
}

impl DocumentSummarizer {
    pub fn new(prompts: PromptSet, loaders: LoaderRegistry) -> Self {
        Self::with_config(prompts, loaders, &DocumentConfig::default())
    }

    pub fn with_config(prompts: PromptSet, loaders: LoaderRegistry, config: &DocumentConfig) -> Self {
        Self {
            prompts,
            loaders,
            table_row_limit: config.table_row_limit,
        }
    }

    /// Prepares every selected document in order. Usage counters are reset per document.
    pub fn run(
        &self,
        selections: &[DocumentSelection],
        generator: &mut dyn TextGenerator,
    ) -> Result<Vec<DocumentSummary>, SummaryError> {
        let mut summaries = Vec::with_capacity(selections.len());
        for (position, selection) in selections.iter().enumerate() {
            info!(
                document = %selection.document.name,
                position = position + 1,
                total = selections.len(),
                "preparing document"
            );
            summaries.push(self.summarize(selection, generator)?);
        }
        Ok(summaries)
    }

    pub fn summarize(
        &self,
        selection: &DocumentSelection,
        generator: &mut dyn TextGenerator,
    ) -> Result<DocumentSummary, SummaryError> {
        generator.reset_usage();
        let created_at = Utc::now();
        let document = &selection.document;
        let choice = selection.selection;
        let mut transcripts = Vec::new();

        if !choice.needs_preparation() {
            debug!(document = %document.name, "nothing selected for preparation");
        }

        let extracted_text = if choice.summarize_text {
            self.load(selection, |loader| loader.extract_text(&document.location))
                .unwrap_or_default()
        } else {
            String::new()
        };

        let mut summarized_text = String::new();
        if choice.summarize_text && !extracted_text.is_empty() {
            let template = self.prompts.summary_template(false, choice.text_with_numbers);
            let (summary, transcript) =
                single_turn(generator, "text_summary", template, &extracted_text)?;
            summarized_text = summary;
            transcripts.push(transcript);
        }

        let mut extracted_tables = Vec::new();
        let mut summarized_tables = Vec::new();
        if choice.extract_tables {
            extracted_tables = self
                .load(selection, |loader| {
                    loader.extract_tables(&document.location, self.table_row_limit)
                })
                .unwrap_or_default();

            if choice.summarize_tables {
                let template = self.prompts.summary_template(true, choice.tables_with_numbers);
                for (position, table) in extracted_tables.iter().enumerate() {
                    let name = format!("table_summary_{}", position + 1);
                    let (summary, transcript) = single_turn(generator, &name, template, table)?;
                    summarized_tables.push(summary);
                    transcripts.push(transcript);
                }
            }
        }

        Ok(DocumentSummary {
            document: document.clone(),
            selection: choice,
            created_at,
            extracted_text,
            summarized_text,
            extracted_tables,
            summarized_tables,
            prompts: self.prompts.clone(),
            model: ModelSnapshot::capture(generator, transcripts),
        })
    }

    /// Runs an extraction step; failures are logged and yield `None`.
    fn load<T, F>(&self, selection: &DocumentSelection, extract: F) -> Option<T>
    where
        F: FnOnce(&dyn super::DocumentLoader) -> Result<T, ExtractionError>,
    {
        let result = self
            .loaders
            .get(selection.document.kind)
            .and_then(extract);
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(document = %selection.document.name, error = %err, "document extraction failed");
                None
            }
        }
    }
}

fn single_turn(
    generator: &mut dyn TextGenerator,
    name: &str,
    instruction: &str,
    content: &str,
) -> Result<(String, Transcript), GenerationError> {
    let mut messages = vec![ChatMessage::system(instruction), ChatMessage::user(content)];
    let reply = generator.invoke(&messages)?;
    let text = reply.text();
    messages.push(reply);
    Ok((
        text,
        Transcript {
            name: name.to_string(),
            messages,
        },
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
}
