use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::answers::{AnswerEntry, AnswerStore};

/// Identifies one sampled parent-topic subset within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SamplingKey {
    pub question_id: String,
    pub parent_id: String,
    pub required_option: String,
    pub limit: Option<usize>,
    pub randomize: bool,
}

/// Per-respondent interview progress.
///
/// Owns the recorded answers and the parent-topic samples drawn so far. Sampling is
/// drawn once per run and reused on every later poll until [`InterviewState::reset`].
#[derive(Debug, Clone)]
pub struct InterviewState {
    answers: AnswerStore,
    samples: HashMap<SamplingKey, Vec<String>>,
    rng: StdRng,
}

impl InterviewState {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic sampling, for reproducible runs and tests.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            answers: AnswerStore::new(),
            samples: HashMap::new(),
            rng,
        }
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    pub(crate) fn record(&mut self, question_id: &str, entry: AnswerEntry) {
        self.answers.record(question_id, entry);
    }

    pub(crate) fn sample(&self, key: &SamplingKey) -> Option<&Vec<String>> {
        self.samples.get(key)
    }

    pub(crate) fn store_sample(&mut self, key: SamplingKey, topics: Vec<String>) {
        self.samples.insert(key, topics);
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Clears answers and samples so the catalog can be reused for the next respondent.
    pub fn reset(&mut self) {
        self.answers.clear();
        self.samples.clear();
    }
}

impl Default for InterviewState {
    fn default() -> Self {
        Self::new()
    }
}
