use std::collections::HashSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::normalizer::{clean_attribute, clean_text, parse_flag};
use super::{AnswerOption, CatalogError, ParentLink, Question, Topic, KEY_SEPARATOR};

// Each name is accepted in English and in the German spelling of older study files.
const ROOT: &[&str] = &["Questions", "Fragen"];
const QUESTION: &[&str] = &["Question", "Frage"];
const TEXT: &[&str] = &["Text"];
const OPTIONS: &[&str] = &["Options", "Antwortoptionen"];
const OPTION: &[&str] = &["Option"];
const TOPICS: &[&str] = &["Topics", "Themen"];
const TOPIC: &[&str] = &["Topic", "Thema"];
const ID_ATTR: &[&str] = &["id"];
const PARENT_ATTR: &[&str] = &["parent", "uebergeordnete_frage"];
const PARENT_OPTION_ATTR: &[&str] = &["parent-option", "uebergeordnete_antwortoption"];
const TOPIC_LIMIT_ATTR: &[&str] = &["parent-topic-limit", "uebergeordnete_themen_limit"];
const RANDOMIZE_ATTR: &[&str] = &["randomize-parent-topics", "uebergeordnete_themen_zufaellig"];

/// Minimal element tree; `text` holds all descendant text in document order.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn is(&self, names: &[&str]) -> bool {
        names.contains(&self.name.as_str())
    }

    fn attribute(&self, names: &[&str]) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| names.contains(&key.as_str()))
            .map(|(_, value)| value.as_str())
    }

    fn child(&self, names: &[&str]) -> Option<&Element> {
        self.children.iter().find(|child| child.is(names))
    }

    fn children_named<'a>(&'a self, names: &'a [&'a str]) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.is(names))
    }
}

fn malformed<E: std::fmt::Display>(err: E) -> CatalogError {
    CatalogError::Malformed(err.to_string())
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, CatalogError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(malformed)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(malformed)?.into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        ..Element::default()
    })
}

fn close_element(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), CatalogError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.text.push_str(&element.text);
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(CatalogError::Malformed(
            "more than one root element".to_string(),
        )),
    }
}

fn read_tree(xml: &str) -> Result<Element, CatalogError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => stack.push(open_element(&start)?),
            Event::Empty(start) => {
                let element = open_element(&start)?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| CatalogError::Malformed("unbalanced end tag".to_string()))?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape().map_err(malformed)?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CatalogError::Malformed(
            "document ended inside an open element".to_string(),
        ));
    }

    root.ok_or_else(|| CatalogError::Malformed("document has no root element".to_string()))
}

pub(crate) fn parse_questions(xml: &str) -> Result<Vec<Question>, CatalogError> {
    let root = read_tree(xml)?;
    if !root.is(ROOT) {
        return Err(CatalogError::Malformed(format!(
            "root element must be <{}>, found <{}>",
            ROOT[0], root.name
        )));
    }

    let mut seen = HashSet::new();
    let mut questions = Vec::new();
    for element in root.children_named(QUESTION) {
        let question = parse_question(element, &mut seen)?;
        questions.push(question);
    }

    Ok(questions)
}

fn parse_question(element: &Element, seen: &mut HashSet<String>) -> Result<Question, CatalogError> {
    let id = clean_attribute(element.attribute(ID_ATTR)).ok_or(CatalogError::MissingId)?;
    debug!(question = %id, "parsing question");

    if !seen.insert(id.clone()) {
        return Err(CatalogError::DuplicateQuestion(id));
    }
    reject_separator(&id, &id)?;

    let parent = parse_parent_link(element, &id)?;

    let text = element
        .child(TEXT)
        .and_then(|text| clean_text(&text.text))
        .ok_or_else(|| CatalogError::MissingText(id.clone()))?;

    let options = parse_options(element, &id)?;
    let topics = parse_topics(element, &id)?;

    Ok(Question {
        id,
        text,
        options,
        topics,
        parent,
    })
}

fn parse_parent_link(element: &Element, id: &str) -> Result<Option<ParentLink>, CatalogError> {
    let parent = clean_attribute(element.attribute(PARENT_ATTR));
    let required_option = clean_attribute(element.attribute(PARENT_OPTION_ATTR));

    let topic_limit = match clean_attribute(element.attribute(TOPIC_LIMIT_ATTR)) {
        Some(raw) => {
            let limit = raw
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit >= 1)
                .ok_or_else(|| CatalogError::InvalidTopicLimit {
                    question: id.to_string(),
                    value: raw.clone(),
                })?;
            Some(limit)
        }
        None => None,
    };

    let randomize_topics = match clean_attribute(element.attribute(RANDOMIZE_ATTR)) {
        Some(raw) => parse_flag(&raw).ok_or_else(|| CatalogError::InvalidFlag {
            question: id.to_string(),
            attribute: RANDOMIZE_ATTR[0],
            value: raw.clone(),
        })?,
        None => false,
    };

    match parent {
        Some(question_id) => Ok(Some(ParentLink {
            question_id,
            required_option,
            topic_limit,
            randomize_topics,
        })),
        None if topic_limit.is_some() || randomize_topics => {
            Err(CatalogError::SamplingWithoutParent(id.to_string()))
        }
        None => Ok(None),
    }
}

fn parse_options(element: &Element, id: &str) -> Result<Vec<AnswerOption>, CatalogError> {
    let container = element
        .child(OPTIONS)
        .ok_or_else(|| CatalogError::MissingOptions(id.to_string()))?;

    let mut options: Vec<AnswerOption> = Vec::new();
    for option in container.children_named(OPTION) {
        let option_id = clean_attribute(option.attribute(ID_ATTR));
        let option_text = clean_text(&option.text);
        let (Some(option_id), Some(option_text)) = (option_id, option_text) else {
            return Err(CatalogError::InvalidOption(id.to_string()));
        };

        if option_id.contains(':') {
            return Err(CatalogError::ReservedOptionId {
                question: id.to_string(),
                option: option_id,
            });
        }
        if options.iter().any(|existing| existing.id == option_id) {
            return Err(CatalogError::DuplicateOption {
                question: id.to_string(),
                option: option_id,
            });
        }

        options.push(AnswerOption {
            id: option_id,
            text: option_text,
        });
    }

    if options.is_empty() {
        return Err(CatalogError::MissingOptions(id.to_string()));
    }

    Ok(options)
}

fn parse_topics(element: &Element, id: &str) -> Result<Vec<Topic>, CatalogError> {
    let Some(container) = element.child(TOPICS) else {
        return Ok(Vec::new());
    };

    let mut topics: Vec<Topic> = Vec::new();
    for topic in container.children_named(TOPIC) {
        let topic_id = clean_attribute(topic.attribute(ID_ATTR));
        let topic_text = clean_text(&topic.text);
        let (Some(topic_id), Some(topic_text)) = (topic_id, topic_text) else {
            return Err(CatalogError::InvalidTopic(id.to_string()));
        };

        reject_separator(id, &topic_id)?;
        if topics.iter().any(|existing| existing.id == topic_id) {
            return Err(CatalogError::DuplicateTopic {
                question: id.to_string(),
                topic: topic_id,
            });
        }

        topics.push(Topic {
            id: topic_id,
            text: topic_text,
        });
    }

    Ok(topics)
}

fn reject_separator(question: &str, id: &str) -> Result<(), CatalogError> {
    if id.contains(KEY_SEPARATOR) {
        return Err(CatalogError::ReservedSeparator {
            question: question.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}
