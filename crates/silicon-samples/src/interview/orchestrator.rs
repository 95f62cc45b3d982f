use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::answers::AnswerEntry;
use super::reply::{parse_reply, ReplyBatch};
use super::result::InterviewResult;
use super::scheduler::{QuestionScheduler, SchedulerError, ThemeContext, WorkUnit};
use super::state::InterviewState;
use crate::config::InterviewConfig;
use crate::documents::DocumentSummary;
use crate::llm::{ChatMessage, GenerationError, ModelSnapshot, TextGenerator, Transcript};
use crate::persona::Persona;
use crate::prompts::{correction_message, question_message, unreadable_reply_message, PromptSet};
use crate::questionnaire::QuestionCatalog;

/// Cooperative stop signal shared with whoever drives the run.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Open sub-conversation: one briefing followed by question, reply and correction turns.
#[derive(Debug)]
struct Conversation {
    key: String,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    fn open(key: String, briefing: String) -> Self {
        Self {
            key,
            messages: vec![ChatMessage::system(briefing)],
        }
    }

    fn into_transcript(self) -> Transcript {
        Transcript {
            name: format!("conversation-{}", self.key),
            messages: self.messages,
        }
    }
}

/// Drives one simulated respondent through a questionnaire.
///
/// Each batch of contexts is asked until the reply covers every required key with an
/// allowed option, or until `max_attempts` model calls have been spent.
#[derive(Debug, Clone)]
pub struct InterviewOrchestrator {
    prompts: PromptSet,
    persona: Option<Persona>,
    max_attempts: usize,
    cancellation: CancellationFlag,
}

impl InterviewOrchestrator {
    pub fn new(prompts: PromptSet) -> Self {
        Self::with_config(prompts, &InterviewConfig::default())
    }

    pub fn with_config(prompts: PromptSet, config: &InterviewConfig) -> Self {
        Self {
            prompts,
            persona: None,
            max_attempts: config.max_reply_attempts.max(1),
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn with_persona(mut self, persona: Option<Persona>) -> Self {
        self.persona = persona;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Interviews until the scheduler has nothing left, then resets `state` for the next
    /// respondent. On error the state keeps what was committed so far.
    pub fn run(
        &self,
        catalog: &QuestionCatalog,
        state: &mut InterviewState,
        documents: &[DocumentSummary],
        generator: &mut dyn TextGenerator,
    ) -> Result<InterviewResult, InterviewError> {
        generator.reset_usage();
        let started_at = Utc::now();
        let scheduler = QuestionScheduler::new(catalog);
        let mut open: Option<Conversation> = None;
        let mut transcripts = Vec::new();

        info!(
            questions = catalog.len(),
            persona = self.persona.as_ref().map(|persona| persona.index),
            documents = documents.len(),
            "interview started"
        );

        while let Some(unit) = scheduler.next_unit(state) {
            let mut committed: HashSet<String> = HashSet::new();

            for context in &unit.contexts {
                self.check_cancelled()?;
                if committed.contains(&context.key) {
                    continue;
                }

                let context_key = context.context_key(unit.question_id());
                let mut conversation = match open.take() {
                    Some(conversation) if conversation.key == context_key => conversation,
                    previous => {
                        if let Some(previous) = previous {
                            transcripts.push(previous.into_transcript());
                        }
                        debug!(context = %context_key, "conversation opened");
                        Conversation::open(
                            context_key.clone(),
                            self.prompts.briefing(self.persona.as_ref(), documents),
                        )
                    }
                };

                let accepted = self.ask(&unit, context, &mut conversation, generator)?;
                for (key, option_id) in accepted {
                    let topic_name = unit
                        .contexts
                        .iter()
                        .find(|candidate| candidate.key == key)
                        .and_then(ThemeContext::topic_name)
                        .map(str::to_string);
                    scheduler.record_answer(
                        state,
                        unit.question_id(),
                        AnswerEntry::new(key.clone(), topic_name, option_id),
                    )?;
                    committed.insert(key);
                }
                info!(question = unit.question_id(), context = %context_key, "answers committed");
                open = Some(conversation);
            }
        }

        if let Some(conversation) = open.take() {
            transcripts.push(conversation.into_transcript());
        }

        let result = InterviewResult {
            repetition: 1,
            started_at,
            finished_at: Utc::now(),
            documents: documents.to_vec(),
            questions: catalog.questions().to_vec(),
            answers: state.answers().clone(),
            prompts: self.prompts.clone(),
            persona: self.persona.clone(),
            model: ModelSnapshot::capture(generator, transcripts),
        };
        info!(
            answered = result.answers.len(),
            tokens = result.model.total_tokens(),
            "interview finished"
        );

        scheduler.reset(state);
        Ok(result)
    }

    /// Asks the batch of contexts sharing `context`'s rendered text and returns the
    /// accepted `key -> option` pairs.
    fn ask(
        &self,
        unit: &WorkUnit,
        context: &ThemeContext,
        conversation: &mut Conversation,
        generator: &mut dyn TextGenerator,
    ) -> Result<BTreeMap<String, String>, InterviewError> {
        let members = unit.batch_for(context);
        let mut batch = ReplyBatch::new(
            members.iter().map(|member| member.key.clone()),
            unit.options().iter().map(|option| option.id.clone()),
        );
        conversation
            .messages
            .push(ChatMessage::user(question_message(unit, context)));

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                self.check_cancelled()?;
            }

            let reply = generator.invoke(&conversation.messages)?;
            let text = reply.text();
            conversation.messages.push(reply);

            let correction = match parse_reply(&text) {
                Ok(parsed) => {
                    let check = batch.merge(&parsed);
                    if check.is_complete() {
                        return Ok(batch.into_accepted());
                    }
                    warn!(
                        question = unit.question_id(),
                        attempt,
                        missing = check.missing_keys.len(),
                        invalid_keys = check.invalid_keys.len(),
                        invalid_values = check.invalid_value_keys.len(),
                        "reply incomplete, asking again"
                    );
                    correction_message(&check)
                }
                Err(err) => {
                    warn!(question = unit.question_id(), attempt, error = %err, "reply unreadable, asking again");
                    unreadable_reply_message(&err)
                }
            };

            if attempt < self.max_attempts {
                conversation.messages.push(ChatMessage::user(correction));
            }
        }

        Err(InterviewError::AttemptsExhausted {
            question_id: unit.question_id().to_string(),
            context_key: conversation.key.clone(),
            attempts: self.max_attempts,
            missing: batch.missing_keys(),
        })
    }

    fn check_cancelled(&self) -> Result<(), InterviewError> {
        if self.cancellation.is_cancelled() {
            return Err(InterviewError::Cancelled);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InterviewError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(
        "question '{question_id}' ({context_key}) still incomplete after {attempts} replies; missing: {}",
        .missing.join(", ")
    )]
    AttemptsExhausted {
        question_id: String,
        context_key: String,
        attempts: usize,
        missing: Vec<String>,
    },
    #[error("interview cancelled")]
    Cancelled,
}
