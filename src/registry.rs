//! Prompt registry client
//!
//! [`RegistryClient`] is the public entry point. It validates arguments,
//! encodes prompts into registry records and back, and delegates the actual
//! requests to a [`Transport`]. Every operation takes a [`CallContext`] so a
//! caller can cancel it or bound it with a deadline.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::codec::{
    alias_tag_key, decode_prompt, decode_version, encode_prompt_tags, encode_version_tags,
    validate_user_tag_key, ALIAS_LATEST, TAG_IS_PROMPT,
};
use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::enumerator::{self, validate_max_results, ListVersionsOptions, DEFAULT_MAX_RESULTS};
use crate::error::{codes, ApiError, RegistryError, Result};
use crate::filter::Filter;
use crate::prompt::{
    ChatMessage, Prompt, PromptContent, PromptList, PromptModelConfig, PromptVersion,
    PromptVersionList,
};
use crate::resolver::{self, LoadOptions};
use crate::transport::{request, HttpTransport, Method, Transport};
use crate::wire::{
    paths, CreateModelVersion, CreateRegisteredModel, DeleteModelVersion, DeleteModelVersionTag,
    DeleteRegisteredModel, DeleteRegisteredModelTag, ModelVersionResponse,
    RegisteredModelResponse, SearchRegisteredModelsResponse, SetModelVersionTag,
    SetRegisteredModelTag,
};

/// Options for registering a new prompt version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterOptions {
    pub commit_message: Option<String>,
    pub tags: HashMap<String, String>,
    pub model_config: Option<PromptModelConfig>,
}

impl RegisterOptions {
    pub fn with_commit_message(mut self, msg: impl Into<String>) -> Self {
        self.commit_message = Some(msg.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_model_config(mut self, config: PromptModelConfig) -> Self {
        self.model_config = Some(config);
        self
    }
}

/// Options for listing prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPromptsOptions {
    pub max_results: u32,
    pub page_token: Option<String>,
    /// SQL `LIKE` pattern on the prompt name
    pub name_filter: Option<String>,
    pub tag_filter: HashMap<String, String>,
    pub order_by: Vec<String>,
}

impl Default for ListPromptsOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            page_token: None,
            name_filter: None,
            tag_filter: HashMap::new(),
            order_by: Vec::new(),
        }
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(RegistryError::invalid(format!("{} is required", what)));
    }
    Ok(())
}

fn require_version(version: u32) -> Result<()> {
    if version == 0 {
        return Err(RegistryError::invalid("version must be positive"));
    }
    Ok(())
}

/// Client for a tag-based MLflow prompt registry.
///
/// Cheap to clone; clones share the underlying transport.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    transport: Arc<dyn Transport>,
}

impl RegistryClient {
    /// Client talking HTTP to the server named in `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }

    /// Client configured from `MLFLOW_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(&ClientConfig::from_env()?)
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<()> {
        let _: Value = request(self.transport(), ctx, method, path, body).await?;
        Ok(())
    }

    /// Load one version of a prompt, the latest unless `opts` says otherwise.
    pub async fn load_prompt(
        &self,
        ctx: &CallContext,
        name: &str,
        opts: &LoadOptions,
    ) -> Result<PromptVersion> {
        require(name, "prompt name")?;
        let selector = opts.selector();
        let mv = resolver::fetch(self.transport(), ctx, name, &selector).await?;
        let version = decode_version(&mv)?;
        debug!(prompt = name, version = version.version, selector = %selector, "Loaded prompt");
        Ok(version)
    }

    /// Register a new text version, creating the prompt if needed.
    pub async fn register_prompt(
        &self,
        ctx: &CallContext,
        name: &str,
        template: &str,
        opts: RegisterOptions,
    ) -> Result<PromptVersion> {
        self.register(ctx, name, PromptContent::Text(template.to_string()), opts)
            .await
    }

    /// Register a new chat version, creating the prompt if needed.
    pub async fn register_chat_prompt(
        &self,
        ctx: &CallContext,
        name: &str,
        messages: Vec<ChatMessage>,
        opts: RegisterOptions,
    ) -> Result<PromptVersion> {
        self.register(ctx, name, PromptContent::Chat(messages), opts)
            .await
    }

    /// Register a new version with the given content.
    ///
    /// The prompt is created first; an existing prompt is not an error. The
    /// new version number is assigned by the server.
    pub async fn register(
        &self,
        ctx: &CallContext,
        name: &str,
        content: PromptContent,
        opts: RegisterOptions,
    ) -> Result<PromptVersion> {
        require(name, "prompt name")?;
        match &content {
            PromptContent::Text(template) if template.is_empty() => {
                return Err(RegistryError::invalid("template is required"));
            }
            PromptContent::Chat(messages) if messages.is_empty() => {
                return Err(RegistryError::invalid("at least one chat message is required"));
            }
            _ => {}
        }
        let tags = encode_version_tags(&content, opts.model_config.as_ref(), &opts.tags)?;

        let create = CreateRegisteredModel {
            name: name.to_string(),
            tags: encode_prompt_tags(),
            description: None,
        };
        match request::<_, RegisteredModelResponse>(
            self.transport(),
            ctx,
            Method::Post,
            paths::CREATE_REGISTERED_MODEL,
            &create,
        )
        .await
        {
            Ok(_) => debug!(prompt = name, "Created prompt"),
            Err(err) if err.is_already_exists() => {}
            Err(err) => return Err(err),
        }

        let body = CreateModelVersion {
            name: name.to_string(),
            source: format!("mlflow-artifacts:/{}", name),
            description: opts.commit_message.filter(|m| !m.is_empty()),
            tags,
        };
        let resp: ModelVersionResponse = request(
            self.transport(),
            ctx,
            Method::Post,
            paths::CREATE_MODEL_VERSION,
            &body,
        )
        .await?;
        let mv = resp.model_version.ok_or_else(|| {
            RegistryError::MalformedRecord(format!("no model version in response for {}", name))
        })?;

        let version = decode_version(&mv)?;
        info!(prompt = name, version = version.version, "Registered prompt version");
        Ok(version)
    }

    /// List prompts, one page at a time.
    pub async fn list_prompts(
        &self,
        ctx: &CallContext,
        opts: &ListPromptsOptions,
    ) -> Result<PromptList> {
        validate_max_results(opts.max_results)?;

        let mut filter = Filter::prompts();
        if let Some(pattern) = opts.name_filter.as_deref().filter(|p| !p.is_empty()) {
            filter = filter.name_like(pattern);
        }
        let filter = filter.tags_equal(&opts.tag_filter);

        let mut query = json!({
            "filter": filter.build(),
            "max_results": opts.max_results,
        });
        if !opts.order_by.is_empty() {
            query["order_by"] = json!(opts.order_by);
        }
        if let Some(token) = opts.page_token.as_deref().filter(|t| !t.is_empty()) {
            query["page_token"] = json!(token);
        }

        let resp: SearchRegisteredModelsResponse = request(
            self.transport(),
            ctx,
            Method::Get,
            paths::SEARCH_REGISTERED_MODELS,
            &query,
        )
        .await?;

        let prompts = resp
            .registered_models
            .iter()
            .map(decode_prompt)
            .collect::<Result<Vec<_>>>()?;
        Ok(PromptList {
            prompts,
            next_page_token: resp.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    /// Prompt metadata, including its aliases and latest version number.
    ///
    /// A registered model that is not marked as a prompt is reported as not found.
    pub async fn get_prompt(&self, ctx: &CallContext, name: &str) -> Result<Prompt> {
        require(name, "prompt name")?;
        let resp: RegisteredModelResponse = request(
            self.transport(),
            ctx,
            Method::Get,
            paths::GET_REGISTERED_MODEL,
            &json!({ "name": name }),
        )
        .await?;
        let rm = resp.registered_model.ok_or_else(|| {
            RegistryError::MalformedRecord(format!("no registered model in response for {}", name))
        })?;

        let is_prompt = rm
            .tags
            .iter()
            .any(|tag| tag.key == TAG_IS_PROMPT && tag.value == "true");
        if !is_prompt {
            return Err(ApiError::new(
                404,
                Some(codes::RESOURCE_DOES_NOT_EXIST),
                format!("{} is a registered model, not a prompt", name),
            )
            .into());
        }
        decode_prompt(&rm)
    }

    /// List version metadata, newest first. Content is not included.
    pub async fn list_prompt_versions(
        &self,
        ctx: &CallContext,
        name: &str,
        opts: &ListVersionsOptions,
    ) -> Result<PromptVersionList> {
        enumerator::list_versions(self.transport(), ctx, name, opts).await
    }

    /// Point `alias` at `version`, replacing any previous target.
    pub async fn set_prompt_alias(
        &self,
        ctx: &CallContext,
        name: &str,
        alias: &str,
        version: u32,
    ) -> Result<()> {
        require(name, "prompt name")?;
        require(alias, "alias")?;
        require_version(version)?;
        if alias == ALIAS_LATEST {
            return Err(RegistryError::invalid(
                "alias \"latest\" is maintained by the server",
            ));
        }

        let body = SetRegisteredModelTag {
            name: name.to_string(),
            key: alias_tag_key(alias),
            value: version.to_string(),
        };
        self.send(ctx, Method::Post, paths::SET_REGISTERED_MODEL_TAG, &body)
            .await?;
        info!(prompt = name, alias, version, "Set prompt alias");
        Ok(())
    }

    pub async fn delete_prompt_alias(&self, ctx: &CallContext, name: &str, alias: &str) -> Result<()> {
        require(name, "prompt name")?;
        require(alias, "alias")?;

        let body = DeleteRegisteredModelTag {
            name: name.to_string(),
            key: alias_tag_key(alias),
        };
        self.send(ctx, Method::Delete, paths::DELETE_REGISTERED_MODEL_TAG, &body)
            .await?;
        info!(prompt = name, alias, "Deleted prompt alias");
        Ok(())
    }

    /// Set a tag on the prompt itself. Reserved keys are rejected.
    pub async fn set_prompt_tag(
        &self,
        ctx: &CallContext,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        require(name, "prompt name")?;
        validate_user_tag_key(key)?;

        let body = SetRegisteredModelTag {
            name: name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        };
        self.send(ctx, Method::Post, paths::SET_REGISTERED_MODEL_TAG, &body)
            .await
    }

    pub async fn set_prompt_version_tag(
        &self,
        ctx: &CallContext,
        name: &str,
        version: u32,
        key: &str,
        value: &str,
    ) -> Result<()> {
        require(name, "prompt name")?;
        require_version(version)?;
        validate_user_tag_key(key)?;

        let body = SetModelVersionTag {
            name: name.to_string(),
            version: version.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        };
        self.send(ctx, Method::Post, paths::SET_MODEL_VERSION_TAG, &body)
            .await
    }

    pub async fn delete_prompt_tag(&self, ctx: &CallContext, name: &str, key: &str) -> Result<()> {
        require(name, "prompt name")?;
        validate_user_tag_key(key)?;

        let body = DeleteRegisteredModelTag {
            name: name.to_string(),
            key: key.to_string(),
        };
        self.send(ctx, Method::Delete, paths::DELETE_REGISTERED_MODEL_TAG, &body)
            .await
    }

    pub async fn delete_prompt_version_tag(
        &self,
        ctx: &CallContext,
        name: &str,
        version: u32,
        key: &str,
    ) -> Result<()> {
        require(name, "prompt name")?;
        require_version(version)?;
        validate_user_tag_key(key)?;

        let body = DeleteModelVersionTag {
            name: name.to_string(),
            version: version.to_string(),
            key: key.to_string(),
        };
        self.send(ctx, Method::Delete, paths::DELETE_MODEL_VERSION_TAG, &body)
            .await
    }

    /// Delete one version.
    ///
    /// Backends that protect aliased versions fail with
    /// [`ErrorKind::AliasConflict`](crate::error::ErrorKind::AliasConflict);
    /// MLflow OSS removes the aliases instead.
    pub async fn delete_prompt_version(
        &self,
        ctx: &CallContext,
        name: &str,
        version: u32,
    ) -> Result<()> {
        require(name, "prompt name")?;
        require_version(version)?;

        let body = DeleteModelVersion {
            name: name.to_string(),
            version: version.to_string(),
        };
        self.send(ctx, Method::Delete, paths::DELETE_MODEL_VERSION, &body)
            .await?;
        info!(prompt = name, version, "Deleted prompt version");
        Ok(())
    }

    /// Delete a prompt. On MLflow OSS its versions and aliases go with it.
    pub async fn delete_prompt(&self, ctx: &CallContext, name: &str) -> Result<()> {
        require(name, "prompt name")?;

        let body = DeleteRegisteredModel {
            name: name.to_string(),
        };
        self.send(ctx, Method::Delete, paths::DELETE_REGISTERED_MODEL, &body)
            .await?;
        info!(prompt = name, "Deleted prompt");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancelToken;
    use crate::error::ErrorKind;
    use crate::memory::{AliasDeletePolicy, InMemoryRegistry};

    fn client() -> (InMemoryRegistry, RegistryClient) {
        let reg = InMemoryRegistry::new();
        (reg.clone(), RegistryClient::with_transport(reg))
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_register_then_load() {
        let (_, client) = client();
        let ctx = CallContext::background();

        let registered = client
            .register_prompt(
                &ctx,
                "greeting",
                "Hello, {{name}}!",
                RegisterOptions::default()
                    .with_commit_message("first")
                    .with_tag("team", "ml"),
            )
            .await
            .unwrap();
        assert_eq!(registered.version, 1);

        let loaded = client
            .load_prompt(&ctx, "greeting", &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.template(), Some("Hello, {{name}}!"));
        assert_eq!(loaded.commit_message, "first");
        assert_eq!(loaded.tags, vars(&[("team", "ml")]));
        assert_eq!(
            loaded.format_as_text(&vars(&[("name", "World")])).unwrap(),
            "Hello, World!"
        );
    }

    #[tokio::test]
    async fn test_second_register_bumps_version() {
        let (_, client) = client();
        let ctx = CallContext::background();

        client
            .register_prompt(&ctx, "p", "one", RegisterOptions::default())
            .await
            .unwrap();
        let second = client
            .register_prompt(&ctx, "p", "two", RegisterOptions::default())
            .await
            .unwrap();
        assert_eq!(second.version, 2);

        let first = client
            .load_prompt(&ctx, "p", &LoadOptions::version(1))
            .await
            .unwrap();
        assert_eq!(first.template(), Some("one"));
        let latest = client
            .load_prompt(&ctx, "p", &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(latest.template(), Some("two"));
    }

    #[tokio::test]
    async fn test_chat_prompt_with_model_config() {
        let (_, client) = client();
        let ctx = CallContext::background();
        let config = PromptModelConfig {
            model_name: Some("gpt-4o".to_string()),
            temperature: Some(0.1),
            ..PromptModelConfig::default()
        };

        client
            .register_chat_prompt(
                &ctx,
                "assistant",
                vec![
                    ChatMessage::system("You are {{persona}}"),
                    ChatMessage::user("{{question}}"),
                ],
                RegisterOptions::default().with_model_config(config.clone()),
            )
            .await
            .unwrap();

        let loaded = client
            .load_prompt(&ctx, "assistant", &LoadOptions::default())
            .await
            .unwrap();
        assert!(loaded.is_chat());
        assert_eq!(loaded.model_config, Some(config));

        let messages = loaded
            .format_as_messages(&vars(&[("persona", "terse"), ("question", "why?")]))
            .unwrap();
        assert_eq!(messages[0].content, "You are terse");
        assert_eq!(messages[1].role, "user");
    }

    #[tokio::test]
    async fn test_alias_resolution() {
        let (_, client) = client();
        let ctx = CallContext::background();
        for template in ["v1", "v2", "v3"] {
            client
                .register_prompt(&ctx, "p", template, RegisterOptions::default())
                .await
                .unwrap();
        }
        client.set_prompt_alias(&ctx, "p", "production", 2).await.unwrap();

        let prod = client
            .load_prompt(&ctx, "p", &LoadOptions::alias("production"))
            .await
            .unwrap();
        assert_eq!(prod.version, 2);
        assert_eq!(prod.aliases, vec!["production".to_string()]);

        let prompt = client.get_prompt(&ctx, "p").await.unwrap();
        assert_eq!(prompt.latest_version, 3);
        assert_eq!(prompt.aliases.get("production"), Some(&2));

        client.delete_prompt_alias(&ctx, "p", "production").await.unwrap();
        let err = client
            .load_prompt(&ctx, "p", &LoadOptions::alias("production"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_latest_alias_cannot_be_set() {
        let (reg, client) = client();
        let err = client
            .set_prompt_alias(&CallContext::background(), "p", "latest", 1)
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(reg.request_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_variable_reports_all_names() {
        let (_, client) = client();
        let ctx = CallContext::background();
        client
            .register_prompt(&ctx, "p", "Hi {{name}}, id {{id}}", RegisterOptions::default())
            .await
            .unwrap();

        let loaded = client
            .load_prompt(&ctx, "p", &LoadOptions::default())
            .await
            .unwrap();
        let err = RegistryError::from(loaded.format_as_text(&vars(&[("name", "A")])).unwrap_err());
        assert_eq!(err.kind(), ErrorKind::MissingVariable);
        assert!(err.to_string().contains("id"));
    }

    #[tokio::test]
    async fn test_list_versions_survives_search_lag() {
        let reg = InMemoryRegistry::new().with_search_lag(true);
        let client = RegistryClient::with_transport(reg);
        let ctx = CallContext::background();
        for i in 1..=5 {
            client
                .register_prompt(&ctx, "p", &format!("v{}", i), RegisterOptions::default())
                .await
                .unwrap();
        }

        let list = client
            .list_prompt_versions(&ctx, "p", &ListVersionsOptions::default())
            .await
            .unwrap();
        let numbers: Vec<u32> = list.versions.iter().map(|v| v.version).collect();
        assert_eq!(numbers, vec![5, 4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_list_prompts_filters() {
        let (reg, client) = client();
        let ctx = CallContext::background();
        for name in ["greet-a", "greet-b", "summary"] {
            client
                .register_prompt(&ctx, name, "t", RegisterOptions::default())
                .await
                .unwrap();
        }
        client.set_prompt_tag(&ctx, "summary", "team", "ml").await.unwrap();
        reg.handle(
            Method::Post,
            paths::CREATE_REGISTERED_MODEL,
            &json!({"name": "plain-model"}),
        )
        .unwrap();

        let all = client
            .list_prompts(&ctx, &ListPromptsOptions::default())
            .await
            .unwrap();
        assert_eq!(all.prompts.len(), 3);

        let greet = client
            .list_prompts(
                &ctx,
                &ListPromptsOptions {
                    name_filter: Some("greet%".to_string()),
                    ..ListPromptsOptions::default()
                },
            )
            .await
            .unwrap();
        let names: Vec<&str> = greet.prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["greet-a", "greet-b"]);

        let tagged = client
            .list_prompts(
                &ctx,
                &ListPromptsOptions {
                    tag_filter: vars(&[("team", "ml")]),
                    ..ListPromptsOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(tagged.prompts.len(), 1);
        assert_eq!(tagged.prompts[0].name, "summary");
        assert_eq!(tagged.prompts[0].latest_version, 1);

        let paged = client
            .list_prompts(
                &ctx,
                &ListPromptsOptions {
                    max_results: 2,
                    ..ListPromptsOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(paged.prompts.len(), 2);
        let rest = client
            .list_prompts(
                &ctx,
                &ListPromptsOptions {
                    max_results: 2,
                    page_token: paged.next_page_token.clone(),
                    ..ListPromptsOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(rest.prompts.len(), 1);
        assert!(rest.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_get_prompt_ignores_plain_models() {
        let (reg, client) = client();
        reg.handle(
            Method::Post,
            paths::CREATE_REGISTERED_MODEL,
            &json!({"name": "classifier"}),
        )
        .unwrap();

        let err = client
            .get_prompt(&CallContext::background(), "classifier")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_alias_conflict_on_protected_backend() {
        let reg = InMemoryRegistry::new().with_alias_delete_policy(AliasDeletePolicy::Reject);
        let client = RegistryClient::with_transport(reg);
        let ctx = CallContext::background();
        client
            .register_prompt(&ctx, "p", "t", RegisterOptions::default())
            .await
            .unwrap();
        client.set_prompt_alias(&ctx, "p", "production", 1).await.unwrap();

        let err = client.delete_prompt_version(&ctx, "p", 1).await.unwrap_err();
        assert!(err.is_alias_conflict());
        assert!(!err.is_already_exists());

        client.delete_prompt_alias(&ctx, "p", "production").await.unwrap();
        client.delete_prompt_version(&ctx, "p", 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_version_tags_and_deletes() {
        let (reg, client) = client();
        let ctx = CallContext::background();
        client
            .register_prompt(&ctx, "p", "t", RegisterOptions::default())
            .await
            .unwrap();
        client
            .register_prompt(&ctx, "p", "t2", RegisterOptions::default())
            .await
            .unwrap();

        client.set_prompt_version_tag(&ctx, "p", 1, "reviewed", "yes").await.unwrap();
        let v1 = client.load_prompt(&ctx, "p", &LoadOptions::version(1)).await.unwrap();
        assert_eq!(v1.tags.get("reviewed").map(String::as_str), Some("yes"));

        client.delete_prompt_version_tag(&ctx, "p", 1, "reviewed").await.unwrap();
        let v1 = client.load_prompt(&ctx, "p", &LoadOptions::version(1)).await.unwrap();
        assert!(v1.tags.is_empty());

        client.delete_prompt_version(&ctx, "p", 2).await.unwrap();
        assert_eq!(reg.version_numbers("p"), vec![1]);

        client.delete_prompt(&ctx, "p").await.unwrap();
        let err = client.get_prompt(&ctx, "p").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_validation_happens_before_requests() {
        let (reg, client) = client();
        let ctx = CallContext::background();

        let results = [
            client
                .register_prompt(&ctx, "", "t", RegisterOptions::default())
                .await
                .map(|_| ()),
            client
                .register_prompt(&ctx, "p", "", RegisterOptions::default())
                .await
                .map(|_| ()),
            client
                .register_chat_prompt(&ctx, "p", vec![], RegisterOptions::default())
                .await
                .map(|_| ()),
            client
                .register_prompt(
                    &ctx,
                    "p",
                    "t",
                    RegisterOptions::default().with_tag("mlflow.prompt.text", "x"),
                )
                .await
                .map(|_| ()),
            client.set_prompt_alias(&ctx, "p", "", 1).await,
            client.set_prompt_alias(&ctx, "p", "prod", 0).await,
            client.set_prompt_tag(&ctx, "p", "mlflow.prompt.alias.prod", "1").await,
            client.delete_prompt_version(&ctx, "p", 0).await,
            client.delete_prompt(&ctx, "").await,
        ];

        for result in results {
            assert!(result.unwrap_err().is_invalid_argument());
        }
        assert_eq!(reg.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_context_aborts_calls() {
        let (reg, client) = client();
        let token = CancelToken::new();
        let ctx = CallContext::with_cancel(token.clone());
        token.cancel();

        let err = client
            .register_prompt(&ctx, "p", "t", RegisterOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(reg.request_count(), 0);
    }
}
