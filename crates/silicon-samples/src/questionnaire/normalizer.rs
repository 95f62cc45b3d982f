/// Strips invisible markers and collapses whitespace runs; blank input becomes `None`.
pub(crate) fn clean_text(value: &str) -> Option<String> {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Attribute values keep inner spacing but lose surrounding whitespace.
pub(crate) fn clean_attribute(value: Option<&str>) -> Option<String> {
    value
        .map(|raw| raw.replace(['\u{feff}', '\u{200b}'], ""))
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "ja" => Some(true),
        "false" | "0" | "no" | "nein" => Some(false),
        _ => None,
    }
}
