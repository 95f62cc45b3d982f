use serde::{Deserialize, Serialize};
use tracing::debug;

use super::answers::AnswerEntry;
use super::keys::{compose_key, context_key};
use super::resolver::DependencyResolver;
use super::state::InterviewState;
use crate::questionnaire::template::render_topic_text;
use crate::questionnaire::{AnswerOption, Question, QuestionCatalog};

/// One concrete prompt unit of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeContext {
    /// Composite answer key.
    pub key: String,
    pub parent_question_id: Option<String>,
    pub parent_topic_id: Option<String>,
    pub parent_topic_text: Option<String>,
    pub topic_id: Option<String>,
    pub topic_text: Option<String>,
    pub rendered_text: String,
}

impl ThemeContext {
    /// Key of the sub-conversation this context belongs to.
    pub fn context_key(&self, question_id: &str) -> String {
        context_key(question_id, self.parent_topic_id.as_deref())
    }

    /// Name stored alongside the answer: the own topic, else the parent topic.
    pub fn topic_name(&self) -> Option<&str> {
        self.topic_text
            .as_deref()
            .or(self.parent_topic_text.as_deref())
    }
}

/// A question's outstanding contexts, handed to the orchestrator in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub question: Question,
    pub contexts: Vec<ThemeContext>,
}

impl WorkUnit {
    pub fn question_id(&self) -> &str {
        &self.question.id
    }

    pub fn options(&self) -> &[AnswerOption] {
        &self.question.options
    }

    /// Contexts asked together with `context` because they share its rendered text.
    pub fn batch_for<'u>(&'u self, context: &ThemeContext) -> Vec<&'u ThemeContext> {
        self.contexts
            .iter()
            .filter(|candidate| candidate.rendered_text == context.rendered_text)
            .collect()
    }
}

/// Decides which question is due next.
///
/// Stateless across calls: every call re-derives the next unit from the catalog and the
/// answers recorded in the [`InterviewState`].
#[derive(Debug, Clone, Copy)]
pub struct QuestionScheduler<'a> {
    catalog: &'a QuestionCatalog,
    resolver: DependencyResolver<'a>,
}

impl<'a> QuestionScheduler<'a> {
    pub fn new(catalog: &'a QuestionCatalog) -> Self {
        Self {
            catalog,
            resolver: DependencyResolver::new(catalog),
        }
    }

    pub fn resolver(&self) -> &DependencyResolver<'a> {
        &self.resolver
    }

    /// Next question with outstanding contexts, in declaration order.
    pub fn next_unit(&self, state: &mut InterviewState) -> Option<WorkUnit> {
        for question in self.catalog.questions() {
            if !self.resolver.may_be_asked(question, state.answers()) {
                debug!(question = %question.id, "question not yet unlocked");
                continue;
            }
            if self.resolver.is_fully_answered(question, state) {
                continue;
            }

            let unit = self.build_work_unit(question, state);
            if unit.contexts.is_empty() {
                debug!(question = %question.id, "question has no outstanding contexts");
                continue;
            }
            debug!(question = %question.id, contexts = unit.contexts.len(), "unit scheduled");
            return Some(unit);
        }
        None
    }

    pub fn build_work_unit(&self, question: &Question, state: &mut InterviewState) -> WorkUnit {
        let recorded: Vec<String> = state
            .answers()
            .recorded_keys(&question.id)
            .into_iter()
            .map(str::to_string)
            .collect();
        let is_open = |key: &str| !recorded.iter().any(|done| done == key);
        let mut contexts = Vec::new();

        if let Some(parent) = self.resolver.topic_parent(question) {
            for parent_topic in self.resolver.resolve_parent_topics(question, parent, state) {
                let parent_text = parent
                    .topic_text(&parent_topic)
                    .unwrap_or(&parent_topic)
                    .to_string();

                if question.has_topics() {
                    for topic in &question.topics {
                        let key = compose_key(&parent.id, &parent_topic, Some(&topic.id));
                        if !is_open(&key) {
                            continue;
                        }
                        contexts.push(ThemeContext {
                            key,
                            parent_question_id: Some(parent.id.clone()),
                            parent_topic_id: Some(parent_topic.clone()),
                            parent_topic_text: Some(parent_text.clone()),
                            topic_id: Some(topic.id.clone()),
                            topic_text: Some(topic.text.clone()),
                            rendered_text: render_topic_text(
                                &question.text,
                                Some(&topic.text),
                                Some(&parent_text),
                            ),
                        });
                    }
                } else {
                    let key = compose_key(&parent.id, &parent_topic, None);
                    if is_open(&key) {
                        contexts.push(ThemeContext {
                            key,
                            parent_question_id: Some(parent.id.clone()),
                            parent_topic_id: Some(parent_topic.clone()),
                            rendered_text: render_topic_text(&question.text, None, Some(&parent_text)),
                            parent_topic_text: Some(parent_text),
                            topic_id: None,
                            topic_text: None,
                        });
                    }
                }
            }
        } else if question.has_topics() {
            for topic in question.topics.iter().filter(|topic| is_open(&topic.id)) {
                contexts.push(ThemeContext {
                    key: topic.id.clone(),
                    parent_question_id: None,
                    parent_topic_id: None,
                    parent_topic_text: None,
                    topic_id: Some(topic.id.clone()),
                    topic_text: Some(topic.text.clone()),
                    rendered_text: render_topic_text(&question.text, Some(&topic.text), None),
                });
            }
        } else if recorded.is_empty() {
            contexts.push(ThemeContext {
                key: question.id.clone(),
                parent_question_id: None,
                parent_topic_id: None,
                parent_topic_text: None,
                topic_id: None,
                topic_text: None,
                rendered_text: render_topic_text(&question.text, None, None),
            });
        }

        WorkUnit {
            question: question.clone(),
            contexts,
        }
    }

    /// Records one answer after checking the question and option exist.
    pub fn record_answer(
        &self,
        state: &mut InterviewState,
        question_id: &str,
        entry: AnswerEntry,
    ) -> Result<(), SchedulerError> {
        let question = self
            .catalog
            .get(question_id)
            .ok_or_else(|| SchedulerError::UnknownQuestion(question_id.to_string()))?;
        if question.option_text(&entry.option_id).is_none() {
            return Err(SchedulerError::UnknownOption {
                question: question_id.to_string(),
                option: entry.option_id,
            });
        }
        state.record(question_id, entry);
        Ok(())
    }

    pub fn reset(&self, state: &mut InterviewState) {
        state.reset();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("question '{0}' is not part of the catalog")]
    UnknownQuestion(String),
    #[error("question '{question}' has no option '{option}'")]
    UnknownOption { question: String, option: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"
        <Questions>
          <Question id="Q1">
            <Text>Do you shop online?</Text>
            <Options><Option id="1">yes</Option><Option id="2">no</Option></Options>
          </Question>
          <Question id="Q2">
            <Text>How important is {{thema}}?</Text>
            <Options><Option id="1">very</Option><Option id="2">not</Option></Options>
            <Topics><Topic id="price">price</Topic><Topic id="speed">speed</Topic></Topics>
          </Question>
        </Questions>"#;

    #[test]
    fn walks_questions_in_declaration_order() {
        let catalog = QuestionCatalog::from_xml(XML).expect("catalog parses");
        let scheduler = QuestionScheduler::new(&catalog);
        let mut state = InterviewState::seeded(0);

        let unit = scheduler.next_unit(&mut state).expect("first unit");
        assert_eq!(unit.question_id(), "Q1");
        assert_eq!(unit.contexts.len(), 1);
        assert_eq!(unit.contexts[0].key, "Q1");
        assert_eq!(unit.contexts[0].rendered_text, "Do you shop online?");

        scheduler
            .record_answer(&mut state, "Q1", AnswerEntry::new("Q1", None, "1"))
            .expect("answer recorded");
        let unit = scheduler.next_unit(&mut state).expect("second unit");
        assert_eq!(unit.question_id(), "Q2");
        let texts: Vec<_> = unit.contexts.iter().map(|c| c.rendered_text.as_str()).collect();
        assert_eq!(texts, vec!["How important is price?", "How important is speed?"]);

        scheduler
            .record_answer(&mut state, "Q2", AnswerEntry::new("price", None, "1"))
            .expect("answer recorded");
        let unit = scheduler.next_unit(&mut state).expect("remaining topic");
        assert_eq!(unit.contexts.len(), 1);
        assert_eq!(unit.contexts[0].key, "speed");

        scheduler
            .record_answer(&mut state, "Q2", AnswerEntry::new("speed", None, "2"))
            .expect("answer recorded");
        assert!(scheduler.next_unit(&mut state).is_none());
    }

    #[test]
    fn record_answer_rejects_unknown_ids() {
        let catalog = QuestionCatalog::from_xml(XML).expect("catalog parses");
        let scheduler = QuestionScheduler::new(&catalog);
        let mut state = InterviewState::seeded(0);

        let error = scheduler
            .record_answer(&mut state, "Q9", AnswerEntry::new("Q9", None, "1"))
            .expect_err("unknown question");
        assert!(matches!(error, SchedulerError::UnknownQuestion(_)));

        let error = scheduler
            .record_answer(&mut state, "Q1", AnswerEntry::new("Q1", None, "7"))
            .expect_err("unknown option");
        assert!(matches!(error, SchedulerError::UnknownOption { .. }));
        assert!(state.answers().is_empty());
    }

    #[test]
    fn batches_contexts_sharing_rendered_text() {
        let catalog = QuestionCatalog::from_xml(
            r#"<Questions>
                 <Question id="Q">
                   <Text>Rate these statements.</Text>
                   <Options><Option id="1">agree</Option></Options>
                   <Topics><Topic id="a">A</Topic><Topic id="b">B</Topic></Topics>
                 </Question>
               </Questions>"#,
        )
        .expect("catalog parses");
        let scheduler = QuestionScheduler::new(&catalog);
        let mut state = InterviewState::seeded(0);
        let unit = scheduler.next_unit(&mut state).expect("unit");
        assert_eq!(unit.batch_for(&unit.contexts[0]).len(), 2);
    }
}
