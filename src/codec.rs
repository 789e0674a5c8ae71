//! Mapping between tagged registry records and prompt domain types
//!
//! OSS MLflow has no first-class prompt storage: a prompt is a registered
//! model carrying the `mlflow.prompt.is_prompt` tag, and each prompt version
//! is a model version whose template, type and model configuration live in
//! reserved tags. This module is the only place that knows those keys.
//!
//! Decoding never fails on malformed optional metadata. A chat payload or
//! model configuration that does not parse is logged and dropped so the rest
//! of the record stays loadable.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeZone, Utc};
use tracing::warn;

use crate::error::{RegistryError, Result};
use crate::prompt::{
    ChatMessage, Prompt, PromptContent, PromptModelConfig, PromptType, PromptVersion,
    PromptVersionSummary,
};
use crate::wire::{ModelVersion, RegisteredModel, Tag};

pub const TAG_PROMPT_TEXT: &str = "mlflow.prompt.text";
pub const TAG_IS_PROMPT: &str = "mlflow.prompt.is_prompt";
pub const TAG_PROMPT_TYPE: &str = "_mlflow_prompt_type";
pub const TAG_DESCRIPTION: &str = "mlflow.prompt.description";
pub const TAG_MODEL_CONFIG: &str = "_mlflow_prompt_model_config";
pub const ALIAS_TAG_PREFIX: &str = "mlflow.prompt.alias.";

/// Server-maintained alias that always resolves to the highest version.
pub const ALIAS_LATEST: &str = "latest";

const RESERVED_KEYS: [&str; 5] = [
    TAG_PROMPT_TEXT,
    TAG_IS_PROMPT,
    TAG_PROMPT_TYPE,
    TAG_DESCRIPTION,
    TAG_MODEL_CONFIG,
];

/// Whether `key` is used for internal bookkeeping and hidden from users.
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key) || key.starts_with(ALIAS_TAG_PREFIX)
}

pub fn alias_tag_key(alias: &str) -> String {
    format!("{}{}", ALIAS_TAG_PREFIX, alias)
}

pub fn parse_version(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

fn millis_to_time(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis
        .filter(|ms| *ms > 0)
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

fn require_name(name: &str, what: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RegistryError::MalformedRecord(format!("{} without a name", what)));
    }
    Ok(())
}

fn user_tags(tags: &[Tag]) -> HashMap<String, String> {
    tags.iter()
        .filter(|tag| !is_reserved_key(&tag.key))
        .map(|tag| (tag.key.clone(), tag.value.clone()))
        .collect()
}

fn tag_value<'a>(tags: &'a [Tag], key: &str) -> Option<&'a str> {
    tags.iter().find(|tag| tag.key == key).map(|tag| tag.value.as_str())
}

/// Commit message, preferring a non-empty description tag over the record field.
fn commit_message(mv: &ModelVersion) -> String {
    tag_value(&mv.tags, TAG_DESCRIPTION)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| mv.description.clone())
        .unwrap_or_default()
}

/// Aliases attached to a version record, sorted and deduplicated.
fn version_aliases(mv: &ModelVersion, version: u32) -> Vec<String> {
    let mut aliases: Vec<String> = mv
        .aliases
        .iter()
        .filter(|alias| !alias.is_empty())
        .cloned()
        .collect();

    for tag in &mv.tags {
        if let Some(alias) = tag.key.strip_prefix(ALIAS_TAG_PREFIX) {
            if !alias.is_empty() && parse_version(&tag.value) == Some(version) {
                aliases.push(alias.to_string());
            }
        }
    }

    aliases.sort();
    aliases.dedup();
    aliases
}

fn decode_content(mv: &ModelVersion) -> PromptContent {
    let payload = tag_value(&mv.tags, TAG_PROMPT_TEXT).unwrap_or_default();

    match tag_value(&mv.tags, TAG_PROMPT_TYPE) {
        Some(kind) if kind == PromptType::Chat.as_str() => {
            if payload.is_empty() {
                return PromptContent::Chat(Vec::new());
            }
            match serde_json::from_str::<Vec<ChatMessage>>(payload) {
                Ok(messages) => PromptContent::Chat(messages),
                Err(e) => {
                    warn!(
                        prompt = %mv.name,
                        version = %mv.version,
                        error = %e,
                        "Discarding malformed chat messages"
                    );
                    PromptContent::Chat(Vec::new())
                }
            }
        }
        // Untyped records predate chat prompts and are always text.
        _ => PromptContent::Text(payload.to_string()),
    }
}

fn decode_model_config(mv: &ModelVersion) -> Option<PromptModelConfig> {
    let raw = tag_value(&mv.tags, TAG_MODEL_CONFIG).filter(|raw| !raw.is_empty())?;

    match serde_json::from_str(raw) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(
                prompt = %mv.name,
                version = %mv.version,
                error = %e,
                "Discarding malformed model config"
            );
            None
        }
    }
}

/// Decode a full prompt version, including its content.
pub fn decode_version(mv: &ModelVersion) -> Result<PromptVersion> {
    require_name(&mv.name, "model version")?;
    let version = parse_version(&mv.version).unwrap_or(0);

    Ok(PromptVersion {
        name: mv.name.clone(),
        version,
        content: decode_content(mv),
        commit_message: commit_message(mv),
        tags: user_tags(&mv.tags),
        model_config: decode_model_config(mv),
        aliases: version_aliases(mv, version),
        created_at: millis_to_time(mv.creation_timestamp),
        updated_at: millis_to_time(mv.last_updated_timestamp),
    })
}

/// Decode version metadata only. The content payloads are never parsed.
pub fn decode_version_summary(mv: &ModelVersion) -> Result<PromptVersionSummary> {
    require_name(&mv.name, "model version")?;
    let version = parse_version(&mv.version).unwrap_or(0);

    Ok(PromptVersionSummary {
        name: mv.name.clone(),
        version,
        commit_message: commit_message(mv),
        tags: user_tags(&mv.tags),
        aliases: version_aliases(mv, version),
        created_at: millis_to_time(mv.creation_timestamp),
        updated_at: millis_to_time(mv.last_updated_timestamp),
    })
}

/// Decode a prompt summary from its registered model record.
pub fn decode_prompt(rm: &RegisteredModel) -> Result<Prompt> {
    require_name(&rm.name, "registered model")?;

    let mut aliases: BTreeMap<String, u32> = rm
        .aliases
        .iter()
        .filter_map(|a| parse_version(&a.version).map(|v| (a.alias.clone(), v)))
        .collect();
    for tag in &rm.tags {
        if let Some(alias) = tag.key.strip_prefix(ALIAS_TAG_PREFIX) {
            if let Some(version) = parse_version(&tag.value).filter(|_| !alias.is_empty()) {
                aliases.insert(alias.to_string(), version);
            }
        }
    }

    let description = tag_value(&rm.tags, TAG_DESCRIPTION)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| rm.description.clone())
        .unwrap_or_default();

    let latest_version = rm
        .latest_versions
        .iter()
        .filter_map(|mv| parse_version(&mv.version))
        .max()
        .unwrap_or(0);

    Ok(Prompt {
        name: rm.name.clone(),
        description,
        latest_version,
        tags: user_tags(&rm.tags),
        aliases,
        created_at: millis_to_time(rm.creation_timestamp),
    })
}

/// Reject user tags that would shadow reserved keys.
pub fn validate_user_tag_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(RegistryError::invalid("tag key is required"));
    }
    if is_reserved_key(key) {
        return Err(RegistryError::invalid(format!("tag key {:?} is reserved", key)));
    }
    Ok(())
}

/// Build the tag list written with a new prompt version.
///
/// Reserved tags come first, then user tags in key order.
pub fn encode_version_tags(
    content: &PromptContent,
    model_config: Option<&PromptModelConfig>,
    tags: &HashMap<String, String>,
) -> Result<Vec<Tag>> {
    let payload = match content {
        PromptContent::Text(template) => template.clone(),
        PromptContent::Chat(messages) => {
            serde_json::to_string(messages).map_err(|source| RegistryError::Encode {
                what: "chat messages",
                source,
            })?
        }
    };

    let mut encoded = vec![
        Tag::new(TAG_PROMPT_TEXT, payload),
        Tag::new(TAG_PROMPT_TYPE, content.prompt_type().as_str()),
        Tag::new(TAG_IS_PROMPT, "true"),
    ];

    if let Some(config) = model_config {
        let json = serde_json::to_string(config).map_err(|source| RegistryError::Encode {
            what: "model config",
            source,
        })?;
        encoded.push(Tag::new(TAG_MODEL_CONFIG, json));
    }

    let mut user: Vec<(&String, &String)> = tags.iter().collect();
    user.sort();
    for (key, value) in user {
        validate_user_tag_key(key)?;
        encoded.push(Tag::new(key.clone(), value.clone()));
    }

    Ok(encoded)
}

/// Tags written on the registered model when a prompt is first created.
pub fn encode_prompt_tags() -> Vec<Tag> {
    vec![Tag::new(TAG_IS_PROMPT, "true")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::RegisteredModelAlias;
    use serde_json::json;

    fn record(version: &str, tags: Vec<Tag>) -> ModelVersion {
        ModelVersion {
            name: "greeting".to_string(),
            version: version.to_string(),
            description: Some("from field".to_string()),
            creation_timestamp: Some(1_700_000_000_000),
            last_updated_timestamp: Some(1_700_000_100_000),
            tags,
            ..ModelVersion::default()
        }
    }

    #[test]
    fn test_decode_text_version() {
        let mv = record(
            "2",
            vec![
                Tag::new(TAG_IS_PROMPT, "true"),
                Tag::new(TAG_PROMPT_TEXT, "Hello, {{name}}!"),
                Tag::new("team", "ml"),
            ],
        );

        let pv = decode_version(&mv).unwrap();
        assert_eq!(pv.name, "greeting");
        assert_eq!(pv.version, 2);
        assert_eq!(pv.template(), Some("Hello, {{name}}!"));
        assert_eq!(pv.commit_message, "from field");
        assert_eq!(pv.tags, HashMap::from([("team".to_string(), "ml".to_string())]));
        assert_eq!(pv.created_at.unwrap().timestamp_millis(), 1_700_000_000_000);
        assert!(pv.model_config.is_none());
    }

    #[test]
    fn test_decode_chat_version() {
        let mv = record(
            "1",
            vec![
                Tag::new(TAG_PROMPT_TYPE, "chat"),
                Tag::new(
                    TAG_PROMPT_TEXT,
                    r#"[{"role":"system","content":"Be {{tone}}"},{"role":"user","content":"{{q}}"}]"#,
                ),
            ],
        );

        let pv = decode_version(&mv).unwrap();
        assert_eq!(
            pv.messages().unwrap(),
            &[ChatMessage::system("Be {{tone}}"), ChatMessage::user("{{q}}")]
        );
    }

    #[test]
    fn test_malformed_optional_metadata_is_dropped() {
        let mv = record(
            "1",
            vec![
                Tag::new(TAG_PROMPT_TYPE, "chat"),
                Tag::new(TAG_PROMPT_TEXT, "[not json"),
                Tag::new(TAG_MODEL_CONFIG, "{broken"),
                Tag::new("owner", "alice"),
            ],
        );

        let pv = decode_version(&mv).unwrap();
        assert_eq!(pv.messages(), Some(&[][..]));
        assert!(pv.model_config.is_none());
        assert_eq!(pv.tags.get("owner").map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_description_tag_wins() {
        let mv = record("1", vec![Tag::new(TAG_DESCRIPTION, "from tag")]);
        assert_eq!(decode_version(&mv).unwrap().commit_message, "from tag");

        let mv = record("1", vec![Tag::new(TAG_DESCRIPTION, "")]);
        assert_eq!(decode_version(&mv).unwrap().commit_message, "from field");
    }

    #[test]
    fn test_reserved_tags_are_hidden() {
        let mv = record(
            "4",
            vec![
                Tag::new(TAG_IS_PROMPT, "true"),
                Tag::new(TAG_PROMPT_TYPE, "text"),
                Tag::new(TAG_PROMPT_TEXT, "t"),
                Tag::new(TAG_DESCRIPTION, "d"),
                Tag::new(TAG_MODEL_CONFIG, "{}"),
                Tag::new("mlflow.prompt.alias.prod", "4"),
                Tag::new("a", "1"),
                Tag::new("b", "2"),
            ],
        );

        let expected = HashMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        assert_eq!(decode_version(&mv).unwrap().tags, expected);
        assert_eq!(decode_version_summary(&mv).unwrap().tags, expected);
    }

    #[test]
    fn test_version_aliases_merge_field_and_tags() {
        let mut mv = record(
            "3",
            vec![
                Tag::new("mlflow.prompt.alias.prod", "3"),
                Tag::new("mlflow.prompt.alias.old", "1"),
            ],
        );
        mv.aliases = vec!["staging".to_string(), "prod".to_string()];

        let pv = decode_version(&mv).unwrap();
        assert_eq!(pv.aliases, vec!["prod".to_string(), "staging".to_string()]);
    }

    #[test]
    fn test_summary_has_no_content_and_tolerates_bad_json() {
        let mv = record(
            "7",
            vec![
                Tag::new(TAG_PROMPT_TYPE, "chat"),
                Tag::new(TAG_PROMPT_TEXT, "garbage"),
                Tag::new(TAG_DESCRIPTION, "summary msg"),
            ],
        );
        let summary = decode_version_summary(&mv).unwrap();
        assert_eq!(summary.version, 7);
        assert_eq!(summary.commit_message, "summary msg");
        assert!(summary.tags.is_empty());
    }

    #[test]
    fn test_unnamed_record_is_rejected() {
        let mv = ModelVersion::default();
        assert!(matches!(
            decode_version(&mv),
            Err(RegistryError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_decode_prompt() {
        let rm = RegisteredModel {
            name: "greeting".to_string(),
            description: Some("Greets people".to_string()),
            creation_timestamp: Some(1_700_000_000_000),
            latest_versions: vec![record("5", vec![])],
            tags: vec![
                Tag::new(TAG_IS_PROMPT, "true"),
                Tag::new("mlflow.prompt.alias.prod", "2"),
                Tag::new("team", "ml"),
            ],
            aliases: vec![RegisteredModelAlias {
                alias: "staging".to_string(),
                version: "4".to_string(),
            }],
            ..RegisteredModel::default()
        };

        let prompt = decode_prompt(&rm).unwrap();
        assert_eq!(prompt.latest_version, 5);
        assert_eq!(prompt.description, "Greets people");
        assert_eq!(prompt.tags.len(), 1);
        assert_eq!(prompt.aliases.get("prod"), Some(&2));
        assert_eq!(prompt.aliases.get("staging"), Some(&4));
    }

    #[test]
    fn test_round_trip() {
        let mut extra = serde_json::Map::new();
        extra.insert("response_format".to_string(), json!({"type": "json"}));
        let config = PromptModelConfig {
            provider: Some("anthropic".to_string()),
            model_name: Some("claude".to_string()),
            temperature: Some(0.7),
            max_tokens: Some(1024),
            top_k: Some(40),
            stop_sequences: vec!["\n\n".to_string()],
            extra_params: extra,
            ..PromptModelConfig::default()
        };
        let tags = HashMap::from([
            ("team".to_string(), "ml".to_string()),
            ("env".to_string(), "dev".to_string()),
        ]);

        let contents = [
            PromptContent::Text("Hi {{name}}".to_string()),
            PromptContent::Chat(vec![
                ChatMessage::system("Be brief"),
                ChatMessage::user("Summarize {{doc}}"),
            ]),
        ];

        for content in contents {
            let encoded = encode_version_tags(&content, Some(&config), &tags).unwrap();
            let decoded = decode_version(&record("1", encoded)).unwrap();

            assert_eq!(decoded.content, content);
            assert_eq!(decoded.tags, tags);
            assert_eq!(decoded.model_config.as_ref(), Some(&config));
        }
    }

    #[test]
    fn test_encode_order_and_markers() {
        let tags = HashMap::from([
            ("z".to_string(), "1".to_string()),
            ("a".to_string(), "2".to_string()),
        ]);
        let encoded =
            encode_version_tags(&PromptContent::Text("T".to_string()), None, &tags).unwrap();
        let keys: Vec<&str> = encoded.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![TAG_PROMPT_TEXT, TAG_PROMPT_TYPE, TAG_IS_PROMPT, "a", "z"]
        );
        assert_eq!(encoded[1].value, "text");
    }

    #[test]
    fn test_encode_rejects_reserved_user_tags() {
        for key in [TAG_PROMPT_TEXT, "mlflow.prompt.alias.prod", ""] {
            let tags = HashMap::from([(key.to_string(), "x".to_string())]);
            let err = encode_version_tags(&PromptContent::Text("T".to_string()), None, &tags)
                .unwrap_err();
            assert!(err.is_invalid_argument(), "key {:?}", key);
        }
    }
}
