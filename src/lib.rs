//! mlflow-prompts - Typed client for the MLflow Prompt Registry
//!
//! Prompts are stored on an MLflow tracking server as registered models and
//! model versions carrying reserved tags. This crate hides that encoding
//! behind typed operations: register text and chat prompts, load them by
//! version or alias, list and tag them, and render their templates.
//!
//! # Quick Start
//!
//! ```no_run
//! use mlflow_prompts::{CallContext, LoadOptions, RegisterOptions, RegistryClient};
//! use std::collections::HashMap;
//!
//! # async fn demo() -> mlflow_prompts::Result<()> {
//! let client = RegistryClient::from_env()?;
//! let ctx = CallContext::background();
//!
//! let opts = RegisterOptions::default().with_commit_message("first draft");
//! client.register_prompt(&ctx, "greeting", "Hello {{name}}", opts).await?;
//! client.set_prompt_alias(&ctx, "greeting", "production", 1).await?;
//!
//! let prompt = client
//!     .load_prompt(&ctx, "greeting", &LoadOptions::alias("production"))
//!     .await?;
//! let vars = HashMap::from([("name".to_string(), "Ada".to_string())]);
//! assert_eq!(prompt.format_as_text(&vars)?, "Hello Ada");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`registry`]: the [`RegistryClient`] and its operation options
//! - [`prompt`]: domain types for prompts and versions
//! - [`template`]: `{{variable}}` substitution
//! - [`transport`]: the request seam and its HTTP implementation
//! - [`memory`]: an in-memory registry for tests and local servers
//! - [`config`]: client configuration from files and the environment

pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod context;
pub mod enumerator;
pub mod error;
pub mod error_help;
pub mod filter;
pub mod logging;
pub mod memory;
pub mod prompt;
pub mod registry;
pub mod resolver;
pub mod signals;
pub mod template;
pub mod transport;
pub mod wire;

pub use config::ClientConfig;
pub use context::{CallContext, CancelToken};
pub use enumerator::ListVersionsOptions;
pub use error::{ApiError, ErrorKind, RegistryError, Result};
pub use filter::Filter;
pub use logging::{init_logging, log_command_execution, LogConfig};
pub use memory::{AliasDeletePolicy, InMemoryRegistry};
pub use prompt::{
    ChatMessage, Prompt, PromptContent, PromptList, PromptModelConfig, PromptType, PromptVersion,
    PromptVersionList, PromptVersionSummary,
};
pub use registry::{ListPromptsOptions, RegisterOptions, RegistryClient};
pub use resolver::{LoadOptions, VersionSelector};
pub use template::TemplateError;
pub use transport::{HttpTransport, Method, Transport};
