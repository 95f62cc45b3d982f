use crate::questionnaire::KEY_SEPARATOR;

/// Answer key for a follow-up repeated per parent topic, optionally per own topic.
pub fn compose_key(parent_question: &str, parent_topic: &str, child_topic: Option<&str>) -> String {
    match child_topic {
        Some(child) => format!("{parent_question}{KEY_SEPARATOR}{parent_topic}{KEY_SEPARATOR}{child}"),
        None => format!("{parent_question}{KEY_SEPARATOR}{parent_topic}"),
    }
}

/// Conversation boundary: one sub-conversation per question and parent topic.
pub fn context_key(question_id: &str, parent_topic: Option<&str>) -> String {
    match parent_topic {
        Some(topic) => format!("{question_id}-{topic}"),
        None => question_id.to_string(),
    }
}

/// Splits a composite key into its `::`-delimited parts.
pub fn key_parts(key: &str) -> Vec<&str> {
    key.split(KEY_SEPARATOR).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_two_and_three_part_keys() {
        assert_eq!(compose_key("P", "t1", None), "P::t1");
        assert_eq!(compose_key("P", "t1", Some("x")), "P::t1::x");
        assert_eq!(key_parts("P::t1::x"), vec!["P", "t1", "x"]);
        assert_eq!(key_parts("x"), vec!["x"]);
    }

    #[test]
    fn context_key_is_coarser_than_answer_key() {
        assert_eq!(context_key("C", Some("t1")), "C-t1");
        assert_eq!(context_key("C", None), "C");
    }
}
