use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Placeholder replaced by the child topic text in question templates.
pub const TOPIC_PLACEHOLDER: &str = "thema";
/// Placeholder replaced by the parent topic text in question templates.
pub const PARENT_TOPIC_PLACEHOLDER: &str = "thema_prev";

fn double_brace() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder pattern"))
}

fn single_brace() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid placeholder pattern"))
}

/// Renders `{{name}}` placeholders in question text. Unknown names stay verbatim.
pub fn render_question<'a, F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    substitute(double_brace(), template, lookup)
}

/// Renders `{name}` placeholders in prompt templates. Unknown names stay verbatim.
pub fn render_prompt<'a, F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    substitute(single_brace(), template, lookup)
}

/// Question text for one topic combination.
pub fn render_topic_text(template: &str, topic: Option<&str>, parent_topic: Option<&str>) -> String {
    render_question(template, |name| match name {
        TOPIC_PLACEHOLDER => topic,
        PARENT_TOPIC_PLACEHOLDER => parent_topic,
        _ => None,
    })
}

fn substitute<'a, F>(pattern: &Regex, template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    pattern
        .replace_all(template, |caps: &Captures<'_>| match lookup(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_topic_and_parent_topic() {
        let text = render_topic_text(
            "How do you rate {{thema}} at {{thema_prev}}?",
            Some("the price"),
            Some("the bakery"),
        );
        assert_eq!(text, "How do you rate the price at the bakery?");
    }

    #[test]
    fn unknown_or_missing_placeholders_stay_verbatim() {
        let text = render_topic_text("{{thema}} and {{region}}", None, Some("ignored"));
        assert_eq!(text, "{{thema}} and {{region}}");
    }

    #[test]
    fn prompt_placeholders_use_single_braces() {
        let text = render_prompt("You are {age} years old from {region}.", |name| {
            (name == "age").then_some("34")
        });
        assert_eq!(text, "You are 34 years old from {region}.");
    }
}
