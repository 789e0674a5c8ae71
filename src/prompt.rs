//! Prompt domain types
//!
//! A [`PromptVersion`] is a snapshot of one registered version, holding either
//! a flat text template or a list of chat messages. Values are plain owned
//! data: `clone()` is a deep copy, and the `with_*` modifiers return a new
//! value instead of touching the original.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single message in a chat prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Which of the two content shapes a prompt holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    Text,
    Chat,
}

impl PromptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptType::Text => "text",
            PromptType::Chat => "chat",
        }
    }
}

impl std::fmt::Display for PromptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template content of a prompt version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum PromptContent {
    /// Flat text template, may contain `{{variable}}` placeholders
    Text(String),
    /// Ordered chat messages, placeholders allowed in each `content`
    Chat(Vec<ChatMessage>),
}

impl PromptContent {
    pub fn prompt_type(&self) -> PromptType {
        match self {
            PromptContent::Text(_) => PromptType::Text,
            PromptContent::Chat(_) => PromptType::Chat,
        }
    }
}

impl Default for PromptContent {
    fn default() -> Self {
        PromptContent::Text(String::new())
    }
}

/// Optional model configuration stored alongside a prompt version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra_params: serde_json::Map<String, serde_json::Value>,
}

/// A prompt version loaded from the registry.
///
/// Snapshot of server state at load time. Local modifications do not reach
/// the registry until a new version is registered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptVersion {
    pub name: String,
    /// Server-assigned version number, `0` if never registered
    pub version: u32,
    pub content: PromptContent,
    pub commit_message: String,
    /// User-defined tags; reserved registry keys are never present
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_config: Option<PromptModelConfig>,
    /// Aliases currently pointing at this version
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PromptVersion {
    /// An unregistered text prompt.
    pub fn text(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: PromptContent::Text(template.into()),
            ..Self::default()
        }
    }

    /// An unregistered chat prompt.
    pub fn chat(name: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            name: name.into(),
            content: PromptContent::Chat(messages),
            ..Self::default()
        }
    }

    pub fn prompt_type(&self) -> PromptType {
        self.content.prompt_type()
    }

    pub fn is_chat(&self) -> bool {
        matches!(self.content, PromptContent::Chat(_))
    }

    /// The text template, or `None` for chat prompts.
    pub fn template(&self) -> Option<&str> {
        match &self.content {
            PromptContent::Text(template) => Some(template),
            PromptContent::Chat(_) => None,
        }
    }

    /// The chat messages, or `None` for text prompts.
    pub fn messages(&self) -> Option<&[ChatMessage]> {
        match &self.content {
            PromptContent::Chat(messages) => Some(messages),
            PromptContent::Text(_) => None,
        }
    }

    pub fn with_template(&self, template: impl Into<String>) -> Self {
        let mut clone = self.clone();
        clone.content = PromptContent::Text(template.into());
        clone
    }

    pub fn with_messages(&self, messages: Vec<ChatMessage>) -> Self {
        let mut clone = self.clone();
        clone.content = PromptContent::Chat(messages);
        clone
    }

    pub fn with_commit_message(&self, msg: impl Into<String>) -> Self {
        let mut clone = self.clone();
        clone.commit_message = msg.into();
        clone
    }

    pub fn with_tag(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut clone = self.clone();
        clone.tags.insert(key.into(), value.into());
        clone
    }

    pub fn without_tag(&self, key: &str) -> Self {
        let mut clone = self.clone();
        clone.tags.remove(key);
        clone
    }

    pub fn with_model_config(&self, config: PromptModelConfig) -> Self {
        let mut clone = self.clone();
        clone.model_config = Some(config);
        clone
    }
}

/// Version metadata returned by listing operations. Carries no content;
/// load the version to get its template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptVersionSummary {
    pub name: String,
    pub version: u32,
    pub commit_message: String,
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Prompt metadata from a listing or lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    /// Highest version number, `0` if the prompt has no versions
    pub latest_version: u32,
    pub tags: HashMap<String, String>,
    /// Alias name to target version
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, u32>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptList {
    pub prompts: Vec<Prompt>,
    /// Token for the next page, `None` on the last page
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptVersionList {
    /// Newest first
    pub versions: Vec<PromptVersionSummary>,
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_version() -> PromptVersion {
        let mut extra = serde_json::Map::new();
        extra.insert("seed".to_string(), json!(42));

        PromptVersion {
            name: "greeting".to_string(),
            version: 3,
            content: PromptContent::Chat(vec![
                ChatMessage::system("You are {{persona}}."),
                ChatMessage::user("Hi {{name}}"),
            ]),
            commit_message: "tweak tone".to_string(),
            tags: HashMap::from([("team".to_string(), "ml".to_string())]),
            model_config: Some(PromptModelConfig {
                provider: Some("openai".to_string()),
                model_name: Some("gpt-4o".to_string()),
                temperature: Some(0.2),
                stop_sequences: vec!["END".to_string()],
                extra_params: extra,
                ..PromptModelConfig::default()
            }),
            aliases: vec!["production".to_string()],
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_clone_is_independent() {
        let original = sample_version();
        let mut clone = original.clone();
        assert_eq!(clone, original);

        clone.tags.insert("team".to_string(), "infra".to_string());
        if let PromptContent::Chat(messages) = &mut clone.content {
            messages[0].content = "changed".to_string();
            messages.push(ChatMessage::assistant("extra"));
        }
        let config = clone.model_config.as_mut().unwrap();
        config.stop_sequences.push("STOP".to_string());
        config.extra_params.insert("seed".to_string(), json!(7));
        clone.aliases.clear();

        assert_eq!(original, sample_version());
    }

    #[test]
    fn test_with_modifiers_leave_original_untouched() {
        let original = sample_version();

        let text = original.with_template("Hello {{name}}");
        assert_eq!(text.template(), Some("Hello {{name}}"));
        assert!(original.is_chat());

        let tagged = original.with_tag("env", "prod").without_tag("team");
        assert_eq!(tagged.tags.get("env").map(String::as_str), Some("prod"));
        assert!(!tagged.tags.contains_key("team"));
        assert_eq!(original.tags.len(), 1);

        let committed = original.with_commit_message("new message");
        assert_eq!(committed.commit_message, "new message");
        assert_eq!(original.commit_message, "tweak tone");
    }

    #[test]
    fn test_content_accessors() {
        let text = PromptVersion::text("p", "Hi");
        assert_eq!(text.prompt_type(), PromptType::Text);
        assert_eq!(text.template(), Some("Hi"));
        assert!(text.messages().is_none());

        let chat = PromptVersion::chat("p", vec![ChatMessage::user("Hi")]);
        assert_eq!(chat.prompt_type(), PromptType::Chat);
        assert!(chat.template().is_none());
        assert_eq!(chat.messages().map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_model_config_omits_empty_fields() {
        let config = PromptModelConfig {
            model_name: Some("gpt-4o".to_string()),
            max_tokens: Some(256),
            ..PromptModelConfig::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value, json!({"model_name": "gpt-4o", "max_tokens": 256}));
    }
}
