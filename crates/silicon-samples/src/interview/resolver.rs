use rand::seq::SliceRandom;
use tracing::debug;

use super::answers::{Answer, AnswerStore};
use super::keys::compose_key;
use super::state::{InterviewState, SamplingKey};
use crate::questionnaire::{Question, QuestionCatalog};

/// Dependency rules between follow-up questions and their parents.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'a> {
    catalog: &'a QuestionCatalog,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(catalog: &'a QuestionCatalog) -> Self {
        Self { catalog }
    }

    /// Parent whose topics the question repeats over, if any.
    pub fn topic_parent(&self, question: &Question) -> Option<&'a Question> {
        self.catalog
            .parent_of(question)
            .filter(|parent| parent.has_topics())
    }

    pub fn may_be_asked(&self, question: &Question, answers: &AnswerStore) -> bool {
        let (Some(parent_id), Some(required)) = (question.parent_id(), question.required_option())
        else {
            return true;
        };

        answers
            .get(parent_id)
            .is_some_and(|answer| answer.has_option(required))
    }

    pub fn is_fully_answered(&self, question: &Question, state: &mut InterviewState) -> bool {
        if let Some(parent) = self.topic_parent(question) {
            if state.answers().get(&parent.id).is_none() {
                return false;
            }
            let parent_topics = self.resolve_parent_topics(question, parent, state);
            if parent_topics.is_empty() {
                return true;
            }

            let recorded = state.answers().recorded_keys(&question.id);
            return if question.has_topics() {
                parent_topics.iter().all(|parent_topic| {
                    question.topics.iter().all(|topic| {
                        let key = compose_key(&parent.id, parent_topic, Some(&topic.id));
                        recorded.contains(key.as_str())
                    })
                })
            } else {
                parent_topics.iter().all(|parent_topic| {
                    recorded.contains(compose_key(&parent.id, parent_topic, None).as_str())
                })
            };
        }

        let recorded = state.answers().recorded_keys(&question.id);
        if question.has_topics() {
            question
                .topics
                .iter()
                .all(|topic| recorded.contains(topic.id.as_str()))
        } else {
            !recorded.is_empty()
        }
    }

    /// Parent topics a follow-up repeats for, after filtering, sampling and limiting.
    ///
    /// Sampled subsets are cached in the state, so repeated calls within one run agree.
    pub fn resolve_parent_topics(
        &self,
        question: &Question,
        parent: &Question,
        state: &mut InterviewState,
    ) -> Vec<String> {
        let Some(link) = question.parent.as_ref() else {
            return Vec::new();
        };
        let required = question.required_option();
        let relevant = relevant_parent_topics(parent, state.answers().get(&parent.id), required);
        if relevant.is_empty() || !link.samples_topics() {
            return relevant;
        }

        let key = SamplingKey {
            question_id: question.id.clone(),
            parent_id: parent.id.clone(),
            required_option: required.unwrap_or_default().to_string(),
            limit: link.topic_limit,
            randomize: link.randomize_topics,
        };
        if let Some(cached) = state.sample(&key) {
            return cached.clone();
        }

        let mut sampled = relevant;
        if link.randomize_topics {
            sampled.shuffle(state.rng());
        }
        if let Some(limit) = link.topic_limit {
            sampled.truncate(limit);
        }
        debug!(question = %question.id, parent = %parent.id, topics = ?sampled, "parent topics sampled");
        state.store_sample(key, sampled.clone());
        sampled
    }
}

/// Parent topic ids answered (with `required_option` when given), in the parent's declared order.
pub fn relevant_parent_topics(
    parent: &Question,
    parent_answer: Option<&Answer>,
    required_option: Option<&str>,
) -> Vec<String> {
    let Some(answer) = parent_answer else {
        return Vec::new();
    };
    let answered = answer.keys_with_option(required_option);

    parent
        .topics
        .iter()
        .filter(|topic| answered.contains(topic.id.as_str()))
        .map(|topic| topic.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::answers::AnswerEntry;
    use crate::questionnaire::{AnswerOption, ParentLink, Topic};

    fn topics(ids: &[&str]) -> Vec<Topic> {
        ids.iter()
            .map(|id| Topic {
                id: id.to_string(),
                text: format!("topic {id}"),
            })
            .collect()
    }

    fn options(ids: &[&str]) -> Vec<AnswerOption> {
        ids.iter()
            .map(|id| AnswerOption {
                id: id.to_string(),
                text: id.to_string(),
            })
            .collect()
    }

    fn catalog(limit: Option<usize>, randomize: bool) -> QuestionCatalog {
        QuestionCatalog::build(vec![
            Question {
                id: "P".into(),
                text: "Which of these do you know?".into(),
                options: options(&["yes", "no"]),
                topics: topics(&["A", "B", "C", "D"]),
                parent: None,
            },
            Question {
                id: "C".into(),
                text: "How do you like {{thema_prev}}?".into(),
                options: options(&["1", "2"]),
                topics: Vec::new(),
                parent: Some(ParentLink {
                    question_id: "P".into(),
                    required_option: Some("yes".into()),
                    topic_limit: limit,
                    randomize_topics: randomize,
                }),
            },
        ])
        .expect("catalog builds")
    }

    #[test]
    fn relevant_topics_follow_parent_order_and_option() {
        let catalog = catalog(None, false);
        let parent = catalog.get("P").expect("parent");
        let mut answer = Answer::new("P");
        answer.record(AnswerEntry::new("C", None, "yes"));
        answer.record(AnswerEntry::new("A", None, "yes"));
        answer.record(AnswerEntry::new("B", None, "no"));
        answer.record(AnswerEntry::new("unknown", None, "yes"));

        assert_eq!(
            relevant_parent_topics(parent, Some(&answer), Some("yes")),
            vec!["A", "C"]
        );
        assert_eq!(
            relevant_parent_topics(parent, Some(&answer), None),
            vec!["A", "B", "C"]
        );
        assert!(relevant_parent_topics(parent, None, None).is_empty());
    }

    #[test]
    fn limit_without_randomize_keeps_declared_prefix() {
        let catalog = catalog(Some(2), false);
        let resolver = DependencyResolver::new(&catalog);
        let mut state = InterviewState::seeded(3);
        for topic in ["D", "C", "B"] {
            state.record("P", AnswerEntry::new(topic, None, "yes"));
        }
        let child = catalog.get("C").expect("child");
        let parent = catalog.get("P").expect("parent");

        assert_eq!(
            resolver.resolve_parent_topics(child, parent, &mut state),
            vec!["B", "C"]
        );
    }

    #[test]
    fn may_be_asked_waits_for_required_option() {
        let catalog = catalog(None, false);
        let resolver = DependencyResolver::new(&catalog);
        let child = catalog.get("C").expect("child");
        let mut answers = AnswerStore::new();
        assert!(!resolver.may_be_asked(child, &answers));

        answers.record("P", AnswerEntry::new("A", None, "no"));
        assert!(!resolver.may_be_asked(child, &answers));

        answers.record("P", AnswerEntry::new("B", None, "yes"));
        assert!(resolver.may_be_asked(child, &answers));
    }

    #[test]
    fn follow_up_with_no_relevant_topics_counts_as_answered() {
        let catalog = catalog(None, false);
        let resolver = DependencyResolver::new(&catalog);
        let child = catalog.get("C").expect("child");
        let mut state = InterviewState::seeded(1);
        assert!(!resolver.is_fully_answered(child, &mut state));

        state.record("P", AnswerEntry::new("A", None, "no"));
        assert!(resolver.is_fully_answered(child, &mut state));
    }
}
