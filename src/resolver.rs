//! Resolving a version selector to a single model version

use std::fmt;

use serde_json::json;

use crate::codec::ALIAS_LATEST;
use crate::context::CallContext;
use crate::error::{RegistryError, Result};
use crate::transport::{request, Method, Transport};
use crate::wire::{paths, ModelVersion, ModelVersionResponse};

/// Which version of a prompt to load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionSelector {
    /// The highest version, through the server-maintained `latest` alias
    #[default]
    Latest,
    Number(u32),
    Alias(String),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::Latest => f.write_str(ALIAS_LATEST),
            VersionSelector::Number(version) => write!(f, "version {}", version),
            VersionSelector::Alias(alias) => write!(f, "alias {}", alias),
        }
    }
}

/// Options for loading a prompt version.
///
/// With neither field set the latest version is loaded. An alias takes
/// precedence over a version number when both are given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub version: Option<u32>,
    pub alias: Option<String>,
}

impl LoadOptions {
    pub fn version(version: u32) -> Self {
        Self {
            version: Some(version),
            alias: None,
        }
    }

    pub fn alias(alias: impl Into<String>) -> Self {
        Self {
            version: None,
            alias: Some(alias.into()),
        }
    }

    pub fn selector(&self) -> VersionSelector {
        match (&self.alias, self.version) {
            (Some(alias), _) if alias == ALIAS_LATEST => VersionSelector::Latest,
            (Some(alias), _) => VersionSelector::Alias(alias.clone()),
            (None, Some(version)) => VersionSelector::Number(version),
            (None, None) => VersionSelector::Latest,
        }
    }
}

fn unwrap_version(resp: ModelVersionResponse, name: &str) -> Result<ModelVersion> {
    resp.model_version.ok_or_else(|| {
        RegistryError::MalformedRecord(format!("no model version in response for {}", name))
    })
}

/// Fetch the model version record a selector points at.
///
/// Issues exactly one request. A selector that names nothing (no versions,
/// unknown alias, unknown number) surfaces the server's NotFound unchanged.
pub async fn fetch(
    transport: &dyn Transport,
    ctx: &CallContext,
    name: &str,
    selector: &VersionSelector,
) -> Result<ModelVersion> {
    if name.is_empty() {
        return Err(RegistryError::invalid("prompt name is required"));
    }

    let resp: ModelVersionResponse = match selector {
        VersionSelector::Number(0) => {
            return Err(RegistryError::invalid("version must be positive"));
        }
        VersionSelector::Number(version) => {
            request(
                transport,
                ctx,
                Method::Get,
                paths::GET_MODEL_VERSION,
                &json!({"name": name, "version": version.to_string()}),
            )
            .await?
        }
        VersionSelector::Alias(alias) if alias.is_empty() => {
            return Err(RegistryError::invalid("alias is required"));
        }
        VersionSelector::Alias(alias) => {
            request(
                transport,
                ctx,
                Method::Get,
                paths::GET_MODEL_VERSION_BY_ALIAS,
                &json!({"name": name, "alias": alias}),
            )
            .await?
        }
        VersionSelector::Latest => {
            request(
                transport,
                ctx,
                Method::Get,
                paths::GET_MODEL_VERSION_BY_ALIAS,
                &json!({"name": name, "alias": ALIAS_LATEST}),
            )
            .await?
        }
    };

    unwrap_version(resp, name)
}
