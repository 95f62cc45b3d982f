use tracing::info;

use super::orchestrator::{InterviewError, InterviewOrchestrator};
use super::state::InterviewState;
use crate::documents::DocumentSummary;
use crate::llm::TextGenerator;
use crate::persona::PersonaTable;
use crate::questionnaire::QuestionCatalog;
use crate::storage::{ResultSink, StorageError};

/// Repeats the interview over one catalog, one persisted result per repetition.
#[derive(Debug)]
pub struct SampleBatch<'a> {
    catalog: &'a QuestionCatalog,
    orchestrator: &'a InterviewOrchestrator,
    documents: &'a [DocumentSummary],
    personas: Option<&'a PersonaTable>,
    repetitions: usize,
}

impl<'a> SampleBatch<'a> {
    pub fn new(
        catalog: &'a QuestionCatalog,
        orchestrator: &'a InterviewOrchestrator,
        repetitions: usize,
    ) -> Self {
        Self {
            catalog,
            orchestrator,
            documents: &[],
            personas: None,
            repetitions,
        }
    }

    pub fn with_documents(mut self, documents: &'a [DocumentSummary]) -> Self {
        self.documents = documents;
        self
    }

    /// Cycles through the table, one persona per repetition.
    pub fn with_personas(mut self, personas: &'a PersonaTable) -> Self {
        self.personas = Some(personas);
        self
    }

    /// Runs every repetition and returns the sink location of each result, in order.
    pub fn run(
        &self,
        state: &mut InterviewState,
        generator: &mut dyn TextGenerator,
        sink: &dyn ResultSink,
    ) -> Result<Vec<String>, BatchError> {
        let mut locations = Vec::with_capacity(self.repetitions);
        for repetition in 0..self.repetitions {
            let persona = self
                .personas
                .and_then(|table| table.for_repetition(repetition))
                .cloned();
            info!(
                repetition = repetition + 1,
                of = self.repetitions,
                persona = persona.as_ref().map(|persona| persona.index),
                "sample started"
            );

            let orchestrator = self.orchestrator.clone().with_persona(persona);
            state.reset();
            let mut result = orchestrator.run(self.catalog, state, self.documents, generator)?;
            result.repetition = repetition + 1;
            locations.push(sink.persist(&result)?);
        }
        Ok(locations)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Interview(#[from] InterviewError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
