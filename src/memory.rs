//! In-process registry backend
//!
//! [`InMemoryRegistry`] answers the same endpoints as an MLflow tracking
//! server, with the behaviors the client depends on: creation conflicts,
//! version numbers that are never reused, the server-maintained `latest`
//! alias, alias tags, the search filter grammar and page tokens.
//!
//! Two switches reproduce backend differences. [`with_search_lag`] makes
//! version search come back empty, as an OSS server does when its search
//! index misses versions. [`AliasDeletePolicy::Reject`] refuses to delete a
//! version that an alias still targets.
//!
//! [`with_search_lag`]: InMemoryRegistry::with_search_lag

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::codec::{alias_tag_key, parse_version, ALIAS_LATEST, ALIAS_TAG_PREFIX};
use crate::context::CallContext;
use crate::error::{codes, ApiError, Result};
use crate::transport::{Method, Transport};
use crate::wire::{
    paths, ModelVersion, ModelVersionResponse, RegisteredModel, RegisteredModelAlias,
    RegisteredModelResponse, SearchModelVersionsResponse, SearchRegisteredModelsResponse, Tag,
};

/// Error code returned when a version delete is blocked by an alias.
pub const ALIAS_EXISTS: &str = "ALIAS_EXISTS";

const DEFAULT_MAX_RESULTS: usize = 100;
const MAX_RESULTS_LIMIT: usize = 1000;

/// What happens to aliases when the version they target is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AliasDeletePolicy {
    /// Remove the aliases along with the version (MLflow OSS)
    #[default]
    Detach,
    /// Refuse the delete with `409 ALIAS_EXISTS`
    Reject,
}

/// Response body or API error, as a tracking server would answer
pub type Reply = std::result::Result<Value, ApiError>;

fn not_found(message: impl Into<String>) -> ApiError {
    ApiError::new(404, Some(codes::RESOURCE_DOES_NOT_EXIST), message)
}

fn invalid(message: impl Into<String>) -> ApiError {
    ApiError::new(400, Some(codes::INVALID_PARAMETER_VALUE), message)
}

fn reply<T: Serialize>(body: &T) -> Reply {
    serde_json::to_value(body)
        .map_err(|e| ApiError::new(500, Some("INTERNAL_ERROR"), e.to_string()))
}

fn empty() -> Reply {
    Ok(Value::Object(serde_json::Map::new()))
}

// Filter grammar

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Name,
    Tag(String),
}

#[derive(Debug)]
enum Token {
    Field(Field),
    Op(String),
    Str(String),
    And,
}

#[derive(Debug)]
enum Matcher {
    Eq(String),
    NotEq(String),
    Pattern(Regex),
}

#[derive(Debug)]
struct Condition {
    field: Field,
    matcher: Matcher,
}

impl Condition {
    fn new(field: Field, op: &str, value: String) -> std::result::Result<Self, ApiError> {
        let matcher = match op {
            "=" => Matcher::Eq(value),
            "!=" => Matcher::NotEq(value),
            "LIKE" => Matcher::Pattern(like_regex(&value, false)?),
            "ILIKE" => Matcher::Pattern(like_regex(&value, true)?),
            other => return Err(invalid(format!("unsupported comparator {:?}", other))),
        };
        Ok(Self { field, matcher })
    }

    fn matches(&self, name: &str, tags: &BTreeMap<String, String>) -> bool {
        let actual = match &self.field {
            Field::Name => Some(name),
            Field::Tag(key) => tags.get(key).map(String::as_str),
        };
        let Some(actual) = actual else {
            return false;
        };
        match &self.matcher {
            Matcher::Eq(expected) => actual == expected,
            Matcher::NotEq(expected) => actual != expected,
            Matcher::Pattern(re) => re.is_match(actual),
        }
    }
}

fn like_regex(pattern: &str, case_insensitive: bool) -> std::result::Result<Regex, ApiError> {
    let mut re = String::from(if case_insensitive { "(?is)^" } else { "(?s)^" });
    for c in pattern.chars() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| invalid(format!("invalid LIKE pattern: {}", e)))
}

/// Read a quoted run starting at `start`, where a doubled quote is a literal.
/// Returns the unescaped text and the index just past the closing quote.
fn read_quoted(
    chars: &[char],
    start: usize,
    quote: char,
) -> std::result::Result<(String, usize), ApiError> {
    let mut out = String::new();
    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => return Err(invalid("unterminated quoted string in filter")),
            Some(&c) if c == quote => {
                if chars.get(i + 1) == Some(&quote) {
                    out.push(quote);
                    i += 2;
                } else {
                    return Ok((out, i + 1));
                }
            }
            Some(&c) => {
                out.push(c);
                i += 1;
            }
        }
    }
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, ApiError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '\'' || c == '"' {
            let (value, next) = read_quoted(&chars, i, c)?;
            tokens.push(Token::Str(value));
            i = next;
        } else if c == '=' {
            tokens.push(Token::Op("=".to_string()));
            i += 1;
        } else if c == '!' && chars.get(i + 1) == Some(&'=') {
            tokens.push(Token::Op("!=".to_string()));
            i += 2;
        } else if c.is_alphanumeric() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let upper = word.to_ascii_uppercase();

            let token = if upper == "AND" {
                Token::And
            } else if upper == "LIKE" || upper == "ILIKE" {
                Token::Op(upper)
            } else if word == "name" {
                Token::Field(Field::Name)
            } else if word == "tags." && chars.get(i) == Some(&'`') {
                let (key, next) = read_quoted(&chars, i, '`')?;
                i = next;
                Token::Field(Field::Tag(key))
            } else if let Some(key) = word.strip_prefix("tags.").filter(|k| !k.is_empty()) {
                Token::Field(Field::Tag(key.to_string()))
            } else {
                return Err(invalid(format!("unsupported filter attribute {:?}", word)));
            };
            tokens.push(token);
        } else {
            return Err(invalid(format!("unexpected character {:?} in filter", c)));
        }
    }

    Ok(tokens)
}

fn parse_filter(input: &str) -> std::result::Result<Vec<Condition>, ApiError> {
    let mut tokens = tokenize(input)?.into_iter();
    let mut conditions = Vec::new();

    loop {
        match (tokens.next(), tokens.next(), tokens.next()) {
            (None, None, None) if conditions.is_empty() => return Ok(conditions),
            (Some(Token::Field(field)), Some(Token::Op(op)), Some(Token::Str(value))) => {
                conditions.push(Condition::new(field, &op, value)?)
            }
            _ => return Err(invalid(format!("malformed filter {:?}", input))),
        }
        match tokens.next() {
            None => return Ok(conditions),
            Some(Token::And) => {}
            Some(_) => return Err(invalid(format!("malformed filter {:?}", input))),
        }
    }
}

fn matches_all(conditions: &[Condition], name: &str, tags: &BTreeMap<String, String>) -> bool {
    conditions.iter().all(|c| c.matches(name, tags))
}

// Ordering

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Int(i64),
    Text(String),
}

#[derive(Debug)]
struct OrderBy {
    field: String,
    descending: bool,
}

fn parse_order_by(
    clauses: &[String],
    allowed: &[&str],
    default: OrderBy,
) -> std::result::Result<Vec<OrderBy>, ApiError> {
    if clauses.is_empty() {
        return Ok(vec![default]);
    }

    clauses
        .iter()
        .map(|clause| {
            let mut parts = clause.split_whitespace();
            let field = parts.next().unwrap_or_default().to_string();
            if !allowed.contains(&field.as_str()) {
                return Err(invalid(format!("invalid order_by field {:?}", field)));
            }
            let descending = match parts.next().map(|d| d.to_ascii_uppercase()) {
                None => false,
                Some(d) if d == "ASC" => false,
                Some(d) if d == "DESC" => true,
                Some(d) => return Err(invalid(format!("invalid order_by direction {:?}", d))),
            };
            Ok(OrderBy { field, descending })
        })
        .collect()
}

fn compare_by<T, F>(order: &[OrderBy], a: &T, b: &T, key: F) -> Ordering
where
    F: Fn(&T, &str) -> SortValue,
{
    for clause in order {
        let ord = key(a, &clause.field).cmp(&key(b, &clause.field));
        let ord = if clause.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

// Request parameters, accepting both JSON values and query-string text

struct Params<'a>(&'a Value);

impl<'a> Params<'a> {
    fn get(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn required(&self, key: &str) -> std::result::Result<String, ApiError> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| invalid(format!("Missing value for required parameter '{}'.", key)))
    }

    fn version(&self) -> std::result::Result<u32, ApiError> {
        let raw = self.required("version")?;
        parse_version(&raw)
            .filter(|v| *v > 0)
            .ok_or_else(|| invalid(format!("Model version must be a positive integer, got {:?}", raw)))
    }

    fn max_results(&self) -> std::result::Result<usize, ApiError> {
        match self.get("max_results") {
            None => Ok(DEFAULT_MAX_RESULTS),
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=MAX_RESULTS_LIMIT).contains(n))
                .ok_or_else(|| {
                    invalid(format!(
                        "max_results must be between 1 and {}, got {:?}",
                        MAX_RESULTS_LIMIT, raw
                    ))
                }),
        }
    }

    fn offset(&self) -> std::result::Result<usize, ApiError> {
        match self.get("page_token").filter(|t| !t.is_empty()) {
            None => Ok(0),
            Some(token) => token
                .parse()
                .map_err(|_| invalid(format!("invalid page token {:?}", token))),
        }
    }

    fn strings(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    fn tags(&self) -> std::result::Result<Vec<Tag>, ApiError> {
        match self.0.get("tags") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| invalid(format!("invalid tags: {}", e))),
        }
    }
}

fn page<T>(items: Vec<T>, offset: usize, max: usize) -> (Vec<T>, Option<String>) {
    let total = items.len();
    let end = offset.saturating_add(max);
    let next = (end < total).then(|| end.to_string());
    (items.into_iter().skip(offset).take(max).collect(), next)
}

// Registry state

#[derive(Debug)]
struct VersionRecord {
    description: Option<String>,
    source: Option<String>,
    created: i64,
    updated: i64,
    tags: BTreeMap<String, String>,
}

#[derive(Debug)]
struct ModelRecord {
    description: Option<String>,
    created: i64,
    updated: i64,
    tags: BTreeMap<String, String>,
    versions: BTreeMap<u32, VersionRecord>,
    /// Highest number ever assigned; survives deletes so numbers aren't reused
    last_version: u32,
}

impl ModelRecord {
    fn alias_targets(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.tags.iter().filter_map(|(key, value)| {
            let alias = key.strip_prefix(ALIAS_TAG_PREFIX)?;
            (!alias.is_empty())
                .then(|| parse_version(value))
                .flatten()
                .map(|version| (alias, version))
        })
    }

    fn version_view(&self, name: &str, version: u32, record: &VersionRecord) -> ModelVersion {
        ModelVersion {
            name: name.to_string(),
            version: version.to_string(),
            description: record.description.clone(),
            creation_timestamp: Some(record.created),
            last_updated_timestamp: Some(record.updated),
            source: record.source.clone(),
            tags: record.tags.iter().map(|(k, v)| Tag::new(k, v)).collect(),
            aliases: self
                .alias_targets()
                .filter(|(_, target)| *target == version)
                .map(|(alias, _)| alias.to_string())
                .collect(),
        }
    }

    fn view(&self, name: &str) -> RegisteredModel {
        RegisteredModel {
            name: name.to_string(),
            description: self.description.clone(),
            creation_timestamp: Some(self.created),
            last_updated_timestamp: Some(self.updated),
            latest_versions: self
                .versions
                .iter()
                .next_back()
                .map(|(version, record)| self.version_view(name, *version, record))
                .into_iter()
                .collect(),
            tags: self.tags.iter().map(|(k, v)| Tag::new(k, v)).collect(),
            aliases: self
                .alias_targets()
                .map(|(alias, version)| RegisteredModelAlias {
                    alias: alias.to_string(),
                    version: version.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    models: BTreeMap<String, ModelRecord>,
    clock: i64,
    requests: Vec<(Method, String)>,
}

impl State {
    /// Strictly increasing wall-clock milliseconds.
    fn now(&mut self) -> i64 {
        self.clock = Utc::now().timestamp_millis().max(self.clock + 1);
        self.clock
    }

    fn model(&self, name: &str) -> std::result::Result<&ModelRecord, ApiError> {
        self.models
            .get(name)
            .ok_or_else(|| not_found(format!("Registered Model with name={} not found", name)))
    }

    fn model_mut(&mut self, name: &str) -> std::result::Result<&mut ModelRecord, ApiError> {
        self.models
            .get_mut(name)
            .ok_or_else(|| not_found(format!("Registered Model with name={} not found", name)))
    }

    fn create_model(&mut self, params: &Params) -> Reply {
        let name = params.required("name")?;
        if self.models.contains_key(&name) {
            return Err(ApiError::new(
                400,
                Some(codes::RESOURCE_ALREADY_EXISTS),
                format!("Registered Model (name={}) already exists.", name),
            ));
        }
        let tags = params.tags()?;
        let now = self.now();
        let record = ModelRecord {
            description: params.get("description"),
            created: now,
            updated: now,
            tags: tags.into_iter().map(|t| (t.key, t.value)).collect(),
            versions: BTreeMap::new(),
            last_version: 0,
        };
        let view = record.view(&name);
        self.models.insert(name, record);
        reply(&RegisteredModelResponse {
            registered_model: Some(view),
        })
    }

    fn get_model(&self, params: &Params) -> Reply {
        let name = params.required("name")?;
        let view = self.model(&name)?.view(&name);
        reply(&RegisteredModelResponse {
            registered_model: Some(view),
        })
    }

    fn search_models(&self, params: &Params) -> Reply {
        let conditions = parse_filter(&params.get("filter").unwrap_or_default())?;
        let order = parse_order_by(
            &params.strings("order_by"),
            &["name", "creation_timestamp", "last_updated_timestamp"],
            OrderBy {
                field: "name".to_string(),
                descending: false,
            },
        )?;
        let max = params.max_results()?;
        let offset = params.offset()?;

        let mut matched: Vec<(&String, &ModelRecord)> = self
            .models
            .iter()
            .filter(|(name, record)| matches_all(&conditions, name, &record.tags))
            .collect();
        matched.sort_by(|a, b| {
            compare_by(&order, a, b, |(name, record), field| match field {
                "creation_timestamp" => SortValue::Int(record.created),
                "last_updated_timestamp" => SortValue::Int(record.updated),
                _ => SortValue::Text(name.to_string()),
            })
        });

        let views: Vec<RegisteredModel> = matched
            .into_iter()
            .map(|(name, record)| record.view(name))
            .collect();
        let (registered_models, next_page_token) = page(views, offset, max);
        reply(&SearchRegisteredModelsResponse {
            registered_models,
            next_page_token,
        })
    }

    fn set_model_tag(&mut self, params: &Params) -> Reply {
        let name = params.required("name")?;
        let key = params.required("key")?;
        let value = params.get("value").unwrap_or_default();
        let now = self.now();
        let record = self.model_mut(&name)?;
        record.tags.insert(key, value);
        record.updated = now;
        empty()
    }

    fn delete_model_tag(&mut self, params: &Params) -> Reply {
        let name = params.required("name")?;
        let key = params.required("key")?;
        let now = self.now();
        let record = self.model_mut(&name)?;
        if record.tags.remove(&key).is_none() {
            return Err(not_found(format!(
                "No tag with name: {} in registered model {}",
                key, name
            )));
        }
        record.updated = now;
        empty()
    }

    fn delete_model(&mut self, params: &Params) -> Reply {
        let name = params.required("name")?;
        self.models
            .remove(&name)
            .ok_or_else(|| not_found(format!("Registered Model with name={} not found", name)))?;
        empty()
    }

    fn get_by_alias(&self, params: &Params) -> Reply {
        let name = params.required("name")?;
        let alias = params.required("alias")?;
        let record = self.model(&name)?;

        let target = if alias == ALIAS_LATEST {
            record.versions.keys().next_back().copied()
        } else {
            record
                .tags
                .get(&alias_tag_key(&alias))
                .and_then(|value| parse_version(value))
        };
        let (version, version_record) = target
            .and_then(|v| record.versions.get(&v).map(|r| (v, r)))
            .ok_or_else(|| {
                not_found(format!(
                    "Registered model alias {} not found for model {}.",
                    alias, name
                ))
            })?;

        reply(&ModelVersionResponse {
            model_version: Some(record.version_view(&name, version, version_record)),
        })
    }

    fn create_version(&mut self, params: &Params) -> Reply {
        let name = params.required("name")?;
        let tags = params.tags()?;
        let now = self.now();
        let record = self.model_mut(&name)?;

        record.last_version += 1;
        let version = record.last_version;
        let version_record = VersionRecord {
            description: params.get("description"),
            source: params.get("source"),
            created: now,
            updated: now,
            tags: tags.into_iter().map(|t| (t.key, t.value)).collect(),
        };
        let view = record.version_view(&name, version, &version_record);
        record.versions.insert(version, version_record);
        record.updated = now;

        reply(&ModelVersionResponse {
            model_version: Some(view),
        })
    }

    fn get_version(&self, params: &Params) -> Reply {
        let name = params.required("name")?;
        let version = params.version()?;
        let record = self.model(&name)?;
        let version_record = record.versions.get(&version).ok_or_else(|| {
            not_found(format!(
                "Model Version (name={}, version={}) not found",
                name, version
            ))
        })?;
        reply(&ModelVersionResponse {
            model_version: Some(record.version_view(&name, version, version_record)),
        })
    }

    fn search_versions(&self, params: &Params, search_lag: bool) -> Reply {
        let conditions = parse_filter(&params.get("filter").unwrap_or_default())?;
        let order = parse_order_by(
            &params.strings("order_by"),
            &["version_number", "creation_timestamp", "last_updated_timestamp"],
            OrderBy {
                field: "version_number".to_string(),
                descending: true,
            },
        )?;
        let max = params.max_results()?;
        let offset = params.offset()?;

        if search_lag {
            return reply(&SearchModelVersionsResponse::default());
        }

        let mut matched: Vec<ModelVersion> = Vec::new();
        for (name, record) in &self.models {
            for (version, version_record) in &record.versions {
                if matches_all(&conditions, name, &version_record.tags) {
                    matched.push(record.version_view(name, *version, version_record));
                }
            }
        }
        matched.sort_by(|a, b| {
            compare_by(&order, a, b, |mv: &ModelVersion, field| match field {
                "creation_timestamp" => SortValue::Int(mv.creation_timestamp.unwrap_or_default()),
                "last_updated_timestamp" => {
                    SortValue::Int(mv.last_updated_timestamp.unwrap_or_default())
                }
                _ => SortValue::Int(parse_version(&mv.version).map(i64::from).unwrap_or_default()),
            })
        });

        let (model_versions, next_page_token) = page(matched, offset, max);
        reply(&SearchModelVersionsResponse {
            model_versions,
            next_page_token,
        })
    }

    fn set_version_tag(&mut self, params: &Params) -> Reply {
        let name = params.required("name")?;
        let version = params.version()?;
        let key = params.required("key")?;
        let value = params.get("value").unwrap_or_default();
        let now = self.now();
        let version_record = self
            .model_mut(&name)?
            .versions
            .get_mut(&version)
            .ok_or_else(|| {
                not_found(format!(
                    "Model Version (name={}, version={}) not found",
                    name, version
                ))
            })?;
        version_record.tags.insert(key, value);
        version_record.updated = now;
        empty()
    }

    fn delete_version_tag(&mut self, params: &Params) -> Reply {
        let name = params.required("name")?;
        let version = params.version()?;
        let key = params.required("key")?;
        let now = self.now();
        let version_record = self
            .model_mut(&name)?
            .versions
            .get_mut(&version)
            .ok_or_else(|| {
                not_found(format!(
                    "Model Version (name={}, version={}) not found",
                    name, version
                ))
            })?;
        if version_record.tags.remove(&key).is_none() {
            return Err(not_found(format!(
                "No tag with name: {} in model version {} of {}",
                key, version, name
            )));
        }
        version_record.updated = now;
        empty()
    }

    fn delete_version(&mut self, params: &Params, policy: AliasDeletePolicy) -> Reply {
        let name = params.required("name")?;
        let version = params.version()?;
        let now = self.now();
        let record = self.model_mut(&name)?;

        if !record.versions.contains_key(&version) {
            return Err(not_found(format!(
                "Model Version (name={}, version={}) not found",
                name, version
            )));
        }

        let aliases: Vec<String> = record
            .alias_targets()
            .filter(|(_, target)| *target == version)
            .map(|(alias, _)| alias.to_string())
            .collect();

        if !aliases.is_empty() {
            match policy {
                AliasDeletePolicy::Reject => {
                    return Err(ApiError::new(
                        409,
                        Some(ALIAS_EXISTS),
                        format!(
                            "Model Version (name={}, version={}) is referenced by alias(es): {}",
                            name,
                            version,
                            aliases.join(", ")
                        ),
                    ))
                }
                AliasDeletePolicy::Detach => {
                    for alias in &aliases {
                        record.tags.remove(&alias_tag_key(alias));
                    }
                }
            }
        }

        record.versions.remove(&version);
        record.updated = now;
        empty()
    }
}

/// Thread-safe in-memory MLflow registry.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    state: Arc<Mutex<State>>,
    search_lag: bool,
    alias_delete_policy: AliasDeletePolicy,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `model-versions/search` return no results.
    pub fn with_search_lag(mut self, lag: bool) -> Self {
        self.search_lag = lag;
        self
    }

    pub fn with_alias_delete_policy(mut self, policy: AliasDeletePolicy) -> Self {
        self.alias_delete_policy = policy;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer one request as a tracking server would.
    pub fn handle(&self, method: Method, path: &str, payload: &Value) -> Reply {
        let mut state = self.lock();
        state.requests.push((method, path.to_string()));
        let params = Params(payload);

        match (method, path) {
            (Method::Post, paths::CREATE_REGISTERED_MODEL) => state.create_model(&params),
            (Method::Get, paths::GET_REGISTERED_MODEL) => state.get_model(&params),
            (Method::Get, paths::SEARCH_REGISTERED_MODELS) => state.search_models(&params),
            (Method::Post, paths::SET_REGISTERED_MODEL_TAG) => state.set_model_tag(&params),
            (Method::Delete, paths::DELETE_REGISTERED_MODEL_TAG) => state.delete_model_tag(&params),
            (Method::Delete, paths::DELETE_REGISTERED_MODEL) => state.delete_model(&params),
            (Method::Get, paths::GET_MODEL_VERSION_BY_ALIAS) => state.get_by_alias(&params),
            (Method::Post, paths::CREATE_MODEL_VERSION) => state.create_version(&params),
            (Method::Get, paths::GET_MODEL_VERSION) => state.get_version(&params),
            (Method::Get, paths::SEARCH_MODEL_VERSIONS) => {
                state.search_versions(&params, self.search_lag)
            }
            (Method::Post, paths::SET_MODEL_VERSION_TAG) => state.set_version_tag(&params),
            (Method::Delete, paths::DELETE_MODEL_VERSION_TAG) => state.delete_version_tag(&params),
            (Method::Delete, paths::DELETE_MODEL_VERSION) => {
                state.delete_version(&params, self.alias_delete_policy)
            }
            _ => Err(ApiError::new(
                404,
                Some("ENDPOINT_NOT_FOUND"),
                format!("No handler for {} {}", method, path),
            )),
        }
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Number of requests received for `path`.
    pub fn count_requests(&self, path: &str) -> usize {
        self.lock().requests.iter().filter(|(_, p)| p == path).count()
    }

    /// Existing version numbers of a model, ascending.
    pub fn version_numbers(&self, name: &str) -> Vec<u32> {
        self.lock()
            .models
            .get(name)
            .map(|record| record.versions.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for InMemoryRegistry {
    async fn call(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        payload: Value,
    ) -> Result<Value> {
        ctx.check()?;
        Ok(self.handle(method, path, &payload)?)
    }
}
