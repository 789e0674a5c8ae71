//! JSON shapes of the MLflow Model Registry REST API
//!
//! Prompts are stored as registered models and prompt versions as model
//! versions. Only the fields this crate reads or writes are modelled; unknown
//! fields are ignored on input.

use serde::{Deserialize, Deserializer, Serialize};

// Protobuf JSON may render int64 as either a number or a string.
fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::custom("timestamp out of range")),
        Some(Value::String(s)) => s.parse().map(Some).map_err(Error::custom),
        Some(_) => Err(Error::custom("expected number or string for timestamp")),
    }
}

pub mod paths {
    pub const CREATE_REGISTERED_MODEL: &str = "/api/2.0/mlflow/registered-models/create";
    pub const GET_REGISTERED_MODEL: &str = "/api/2.0/mlflow/registered-models/get";
    pub const SEARCH_REGISTERED_MODELS: &str = "/api/2.0/mlflow/registered-models/search";
    pub const SET_REGISTERED_MODEL_TAG: &str = "/api/2.0/mlflow/registered-models/set-tag";
    pub const DELETE_REGISTERED_MODEL_TAG: &str = "/api/2.0/mlflow/registered-models/delete-tag";
    pub const DELETE_REGISTERED_MODEL: &str = "/api/2.0/mlflow/registered-models/delete";
    pub const GET_MODEL_VERSION_BY_ALIAS: &str = "/api/2.0/mlflow/registered-models/alias";
    pub const CREATE_MODEL_VERSION: &str = "/api/2.0/mlflow/model-versions/create";
    pub const GET_MODEL_VERSION: &str = "/api/2.0/mlflow/model-versions/get";
    pub const SEARCH_MODEL_VERSIONS: &str = "/api/2.0/mlflow/model-versions/search";
    pub const SET_MODEL_VERSION_TAG: &str = "/api/2.0/mlflow/model-versions/set-tag";
    pub const DELETE_MODEL_VERSION_TAG: &str = "/api/2.0/mlflow/model-versions/delete-tag";
    pub const DELETE_MODEL_VERSION: &str = "/api/2.0/mlflow/model-versions/delete";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredModelAlias {
    pub alias: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_timestamp: Option<i64>,
    #[serde(
        default,
        deserialize_with = "deserialize_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisteredModel {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_timestamp: Option<i64>,
    #[serde(
        default,
        deserialize_with = "deserialize_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub latest_versions: Vec<ModelVersion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<RegisteredModelAlias>,
}

// Request bodies

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRegisteredModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateModelVersion {
    pub name: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetRegisteredModelTag {
    pub name: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteRegisteredModelTag {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteRegisteredModel {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetModelVersionTag {
    pub name: String,
    pub version: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteModelVersionTag {
    pub name: String,
    pub version: String,
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteModelVersion {
    pub name: String,
    pub version: String,
}

// Response bodies

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegisteredModelResponse {
    #[serde(default)]
    pub registered_model: Option<RegisteredModel>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModelVersionResponse {
    #[serde(default)]
    pub model_version: Option<ModelVersion>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchRegisteredModelsResponse {
    #[serde(default)]
    pub registered_models: Vec<RegisteredModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchModelVersionsResponse {
    #[serde(default)]
    pub model_versions: Vec<ModelVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Body of an MLflow error response.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_version_accepts_string_timestamps() {
        let mv: ModelVersion = serde_json::from_str(
            r#"{"name":"p","version":"3","creation_timestamp":"1700000000000","last_updated_timestamp":1700000100000}"#,
        )
        .unwrap();
        assert_eq!(mv.creation_timestamp, Some(1_700_000_000_000));
        assert_eq!(mv.last_updated_timestamp, Some(1_700_000_100_000));
        assert!(mv.tags.is_empty());
    }

    #[test]
    fn test_missing_fields_default() {
        let resp: SearchModelVersionsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.model_versions.is_empty());
        assert!(resp.next_page_token.is_none());

        let resp: ModelVersionResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.model_version.is_none());
    }
}
