use std::collections::{BTreeMap, BTreeSet};

/// Reply that does not follow the `key: value` line contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    #[error("line without ':' separator: {0}")]
    MissingSeparator(String),
    #[error("line with empty key or value: {0}")]
    EmptyPart(String),
}

/// Parses `key: value` lines. Blank lines and `#` comments are skipped; each line splits on
/// its last colon so keys may contain `::`.
pub fn parse_reply(reply: &str) -> Result<BTreeMap<String, String>, ReplyError> {
    let mut pairs = BTreeMap::new();
    for raw in reply.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .rsplit_once(':')
            .ok_or_else(|| ReplyError::MissingSeparator(raw.to_string()))?;
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            return Err(ReplyError::EmptyPart(raw.to_string()));
        }
        pairs.insert(key.to_string(), value.to_string());
    }
    Ok(pairs)
}

/// Outcome of checking one parsed reply against a batch's key/value contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyCheck {
    pub stored_before: BTreeSet<String>,
    pub valid_keys: BTreeSet<String>,
    pub invalid_keys: BTreeSet<String>,
    pub invalid_value_keys: BTreeSet<String>,
    pub stored_after: BTreeSet<String>,
    pub missing_keys: BTreeSet<String>,
}

impl ReplyCheck {
    pub fn is_complete(&self) -> bool {
        self.invalid_keys.is_empty()
            && self.invalid_value_keys.is_empty()
            && self.missing_keys.is_empty()
    }
}

/// Running answers for one batch of contexts asked together.
#[derive(Debug, Clone)]
pub struct ReplyBatch {
    required_keys: BTreeSet<String>,
    allowed_values: BTreeSet<String>,
    accepted: BTreeMap<String, String>,
}

impl ReplyBatch {
    pub fn new<K, V>(required_keys: K, allowed_values: V) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            required_keys: required_keys.into_iter().map(Into::into).collect(),
            allowed_values: allowed_values.into_iter().map(Into::into).collect(),
            accepted: BTreeMap::new(),
        }
    }

    /// Merges the valid entries of `parsed`; later values overwrite earlier ones.
    pub fn merge(&mut self, parsed: &BTreeMap<String, String>) -> ReplyCheck {
        let stored_before: BTreeSet<String> = self.accepted.keys().cloned().collect();
        let mut check = ReplyCheck {
            stored_before,
            ..ReplyCheck::default()
        };

        for (key, value) in parsed {
            if !self.required_keys.contains(key) {
                check.invalid_keys.insert(key.clone());
                continue;
            }
            check.valid_keys.insert(key.clone());
            if self.allowed_values.contains(value) {
                self.accepted.insert(key.clone(), value.clone());
            } else {
                check.invalid_value_keys.insert(key.clone());
            }
        }

        check.stored_after = self
            .accepted
            .keys()
            .filter(|key| self.required_keys.contains(*key))
            .cloned()
            .collect();
        check.missing_keys = self
            .required_keys
            .difference(&check.stored_after)
            .cloned()
            .collect();
        check
    }

    pub fn missing_keys(&self) -> Vec<String> {
        self.required_keys
            .iter()
            .filter(|key| !self.accepted.contains_key(*key))
            .cloned()
            .collect()
    }

    pub fn accepted(&self) -> &BTreeMap<String, String> {
        &self.accepted
    }

    pub fn into_accepted(self) -> BTreeMap<String, String> {
        self.accepted
    }
}
