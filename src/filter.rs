//! Search filter construction
//!
//! MLflow search endpoints take a SQL-like filter string. User input ends up
//! inside quoted literals, so quotes in values and backticks in tag keys are
//! doubled before interpolation.

use std::collections::HashMap;

use crate::codec::TAG_IS_PROMPT;

/// Escape a value for use inside a single-quoted filter literal.
pub fn escape_value(s: &str) -> String {
    s.replace('\'', "''")
}

/// Escape a tag key for use inside a backtick-quoted identifier.
pub fn escape_key(s: &str) -> String {
    s.replace('`', "``")
}

/// Conjunction of filter conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only registered models marked as prompts.
    pub fn prompts() -> Self {
        Self::new().tag_equals(TAG_IS_PROMPT, "true")
    }

    pub fn name_equals(mut self, name: &str) -> Self {
        self.conditions.push(format!("name='{}'", escape_value(name)));
        self
    }

    /// SQL `LIKE` match: `%` matches any run of characters, `_` a single one.
    pub fn name_like(mut self, pattern: &str) -> Self {
        self.conditions.push(format!("name LIKE '{}'", escape_value(pattern)));
        self
    }

    pub fn tag_equals(mut self, key: &str, value: &str) -> Self {
        self.conditions.push(format!(
            "tags.`{}` = '{}'",
            escape_key(key),
            escape_value(value)
        ));
        self
    }

    /// Add one condition per tag, in key order so the filter is deterministic.
    pub fn tags_equal(mut self, tags: &HashMap<String, String>) -> Self {
        let mut sorted: Vec<_> = tags.iter().collect();
        sorted.sort();
        for (key, value) in sorted {
            self = self.tag_equals(key, value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn build(&self) -> String {
        self.conditions.join(" AND ")
    }
}
