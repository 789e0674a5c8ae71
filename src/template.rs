//! Template processing and variable substitution
//!
//! Prompt templates use `{{name}}` placeholders, where `name` is made of word
//! characters. Substitution is single-pass: a substituted value is never
//! scanned again, so values containing `{{...}}` come through verbatim.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::prompt::{ChatMessage, PromptContent, PromptType, PromptVersion};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// One or more placeholders had no value. Lists every missing name once,
    /// in order of first appearance.
    #[error("mlflow: missing variables: {}", .names.join(", "))]
    MissingVariables { names: Vec<String> },

    #[error("mlflow: message {index}: {source}")]
    Message {
        index: usize,
        #[source]
        source: Box<TemplateError>,
    },

    #[error("mlflow: cannot format {found} prompt as {expected}")]
    TypeMismatch {
        expected: PromptType,
        found: PromptType,
    },
}

impl TemplateError {
    /// Missing variable names, looking through per-message wrappers.
    pub fn missing_variables(&self) -> &[String] {
        match self {
            TemplateError::MissingVariables { names } => names,
            TemplateError::Message { source, .. } => source.missing_variables(),
            TemplateError::TypeMismatch { .. } => &[],
        }
    }
}

/// Replace every `{{name}}` placeholder in `text` with its value from `vars`.
///
/// # Errors
///
/// Returns [`TemplateError::MissingVariables`] naming every placeholder that
/// has no entry in `vars`. Nothing is returned on failure, not even a
/// partially substituted string.
pub fn substitute(text: &str, vars: &HashMap<String, String>) -> Result<String, TemplateError> {
    let mut missing: Vec<String> = Vec::new();

    let result = PLACEHOLDER.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        match vars.get(name) {
            Some(value) => value.clone(),
            None => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        return Err(TemplateError::MissingVariables { names: missing });
    }

    Ok(result.into_owned())
}

/// Unique placeholder names in `text`, in order of first appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn substitute_messages(
    messages: &[ChatMessage],
    vars: &HashMap<String, String>,
) -> Result<Vec<ChatMessage>, TemplateError> {
    messages
        .iter()
        .enumerate()
        .map(|(index, msg)| {
            let content = substitute(&msg.content, vars).map_err(|e| TemplateError::Message {
                index,
                source: Box::new(e),
            })?;
            Ok(ChatMessage {
                role: msg.role.clone(),
                content,
            })
        })
        .collect()
}

impl PromptVersion {
    /// Format a text prompt into its final string.
    pub fn format_as_text(&self, vars: &HashMap<String, String>) -> Result<String, TemplateError> {
        match &self.content {
            PromptContent::Text(template) => substitute(template, vars),
            PromptContent::Chat(_) => Err(TemplateError::TypeMismatch {
                expected: PromptType::Text,
                found: PromptType::Chat,
            }),
        }
    }

    /// Format a chat prompt into its final messages, preserving roles and order.
    pub fn format_as_messages(
        &self,
        vars: &HashMap<String, String>,
    ) -> Result<Vec<ChatMessage>, TemplateError> {
        match &self.content {
            PromptContent::Chat(messages) => substitute_messages(messages, vars),
            PromptContent::Text(_) => Err(TemplateError::TypeMismatch {
                expected: PromptType::Chat,
                found: PromptType::Text,
            }),
        }
    }

    /// Return a copy of this version with every placeholder substituted.
    pub fn format(&self, vars: &HashMap<String, String>) -> Result<PromptVersion, TemplateError> {
        let content = match &self.content {
            PromptContent::Text(template) => PromptContent::Text(substitute(template, vars)?),
            PromptContent::Chat(messages) => {
                PromptContent::Chat(substitute_messages(messages, vars)?)
            }
        };
        let mut formatted = self.clone();
        formatted.content = content;
        Ok(formatted)
    }

    /// Placeholder names used anywhere in the content, in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        match &self.content {
            PromptContent::Text(template) => placeholders(template),
            PromptContent::Chat(messages) => {
                let mut names: Vec<String> = Vec::new();
                for msg in messages {
                    for name in placeholders(&msg.content) {
                        if !names.contains(&name) {
                            names.push(name);
                        }
                    }
                }
                names
            }
        }
    }
}

/// Load template variables from a `name=value` file
///
/// Blank lines and lines starting with `#` are skipped. Values may be wrapped
/// in matching single or double quotes, which are stripped.
pub fn load_variables_file(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read variables file: {}", path.display()))?;

    let mut vars = HashMap::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').with_context(|| {
            format!(
                "{}:{}: expected name=value, got {:?}",
                path.display(),
                lineno + 1,
                line
            )
        })?;
        let key = key.trim();
        let value = value.trim();

        let value = if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            &value[1..value.len() - 1]
        } else {
            value
        };

        vars.insert(key.to_string(), value.to_string());
    }

    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_all_occurrences() {
        let result = substitute(
            "Hi {{name}}, {{name}} again. Id {{id}}.",
            &vars(&[("name", "Ann"), ("id", "7")]),
        )
        .unwrap();
        assert_eq!(result, "Hi Ann, Ann again. Id 7.");
        assert!(placeholders(&result).is_empty());
    }

    #[test]
    fn test_missing_variables_are_collected() {
        let err = substitute(
            "Hi {{name}}, id {{id}}, {{id}} and {{zone}}",
            &vars(&[("name", "A")]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingVariables {
                names: vec!["id".to_string(), "zone".to_string()]
            }
        );
        assert_eq!(err.to_string(), "mlflow: missing variables: id, zone");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let result = substitute(
            "{{a}} {{b}}",
            &vars(&[("a", "{{b}}"), ("b", "{{a}}")]),
        )
        .unwrap();
        assert_eq!(result, "{{b}} {{a}}");
    }

    #[test]
    fn test_non_word_braces_are_left_alone() {
        let result = substitute("{{ spaced }} {single} {{ok}}", &vars(&[("ok", "yes")])).unwrap();
        assert_eq!(result, "{{ spaced }} {single} yes");
    }

    #[test]
    fn test_placeholders_unique_in_order() {
        assert_eq!(
            placeholders("{{b}} {{a}} {{b}} {{c_1}}"),
            vec!["b".to_string(), "a".to_string(), "c_1".to_string()]
        );
    }

    #[test]
    fn test_format_as_text() {
        let pv = PromptVersion::text("p", "Hi {{name}}");
        assert_eq!(pv.format_as_text(&vars(&[("name", "Bo")])).unwrap(), "Hi Bo");

        let err = PromptVersion::text("p", "Hi {{name}}, id {{id}}")
            .format_as_text(&vars(&[("name", "A")]))
            .unwrap_err();
        assert_eq!(err.missing_variables(), &["id".to_string()]);
    }

    #[test]
    fn test_format_as_messages() {
        let pv = PromptVersion::chat(
            "p",
            vec![
                ChatMessage::system("You are {{persona}}"),
                ChatMessage::user("Tell me about {{topic}}"),
            ],
        );
        let messages = pv
            .format_as_messages(&vars(&[("persona", "a pirate"), ("topic", "rum")]))
            .unwrap();
        assert_eq!(
            messages,
            vec![
                ChatMessage::system("You are a pirate"),
                ChatMessage::user("Tell me about rum"),
            ]
        );

        let err = pv.format_as_messages(&vars(&[("persona", "x")])).unwrap_err();
        match &err {
            TemplateError::Message { index, .. } => assert_eq!(*index, 1),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.missing_variables(), &["topic".to_string()]);
        assert_eq!(err.to_string(), "mlflow: message 1: mlflow: missing variables: topic");
    }

    #[test]
    fn test_type_guard() {
        let text = PromptVersion::text("p", "Hi");
        let chat = PromptVersion::chat("p", vec![ChatMessage::user("Hi")]);
        let empty = HashMap::new();

        assert_eq!(
            text.format_as_messages(&empty).unwrap_err(),
            TemplateError::TypeMismatch {
                expected: PromptType::Chat,
                found: PromptType::Text
            }
        );
        assert_eq!(
            chat.format_as_text(&empty).unwrap_err(),
            TemplateError::TypeMismatch {
                expected: PromptType::Text,
                found: PromptType::Chat
            }
        );
    }

    #[test]
    fn test_format_returns_new_version() {
        let pv = PromptVersion::text("p", "Hi {{name}}").with_tag("k", "v");
        let formatted = pv.format(&vars(&[("name", "Cy")])).unwrap();
        assert_eq!(formatted.template(), Some("Hi Cy"));
        assert_eq!(formatted.tags, pv.tags);
        assert_eq!(pv.template(), Some("Hi {{name}}"));
    }

    #[test]
    fn test_variables_across_messages() {
        let pv = PromptVersion::chat(
            "p",
            vec![
                ChatMessage::system("{{a}} {{b}}"),
                ChatMessage::user("{{b}} {{c}}"),
            ],
        );
        assert_eq!(
            pv.variables(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_load_variables_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vars.conf");
        std::fs::write(
            &path,
            "# greeting vars\nname = \"Jo Doe\"\n\nid=42\nquote='x'\nempty=\n",
        )
        .unwrap();

        let loaded = load_variables_file(&path).unwrap();
        assert_eq!(loaded.get("name").unwrap(), "Jo Doe");
        assert_eq!(loaded.get("id").unwrap(), "42");
        assert_eq!(loaded.get("quote").unwrap(), "x");
        assert_eq!(loaded.get("empty").unwrap(), "");
    }

    #[test]
    fn test_load_variables_file_rejects_bad_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vars.conf");
        std::fs::write(&path, "name=ok\njust a line\n").unwrap();

        let err = load_variables_file(&path).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }
}
