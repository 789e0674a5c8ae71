//! Listing the versions of a prompt
//!
//! Version search on MLflow OSS can permanently miss versions that were
//! created in quick succession, and then answers with an empty page even
//! though the versions exist. A non-empty search result is trusted as is.
//! An empty first page is verified by resolving `latest`. If that finds a
//! version, the list is rebuilt by fetching each version number directly,
//! in the requested `version_number` order.

use std::collections::HashMap;

use serde_json::json;
use tracing::{debug, warn};

use crate::codec::{decode_version_summary, parse_version};
use crate::context::CallContext;
use crate::error::{RegistryError, Result};
use crate::filter::Filter;
use crate::prompt::{PromptVersionList, PromptVersionSummary};
use crate::resolver::{self, VersionSelector};
use crate::transport::{request, Method, Transport};
use crate::wire::{paths, SearchModelVersionsResponse};

pub const DEFAULT_MAX_RESULTS: u32 = 100;
pub const MAX_RESULTS_LIMIT: u32 = 1000;
const DEFAULT_ORDER_BY: &str = "version_number DESC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListVersionsOptions {
    /// Page size, `1..=1000`
    pub max_results: u32,
    pub page_token: Option<String>,
    /// Only versions carrying every one of these tags
    pub tag_filter: HashMap<String, String>,
    /// Defaults to `version_number DESC`
    pub order_by: Vec<String>,
}

impl Default for ListVersionsOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            page_token: None,
            tag_filter: HashMap::new(),
            order_by: Vec::new(),
        }
    }
}

impl ListVersionsOptions {
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tag_filter.insert(key.into(), value.into());
        self
    }
}

pub(crate) fn validate_max_results(max_results: u32) -> Result<()> {
    if !(1..=MAX_RESULTS_LIMIT).contains(&max_results) {
        return Err(RegistryError::invalid(format!(
            "max_results must be between 1 and {}, got {}",
            MAX_RESULTS_LIMIT, max_results
        )));
    }
    Ok(())
}

/// Walk direction for the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkOrder {
    Ascending,
    Descending,
}

/// Only the leading clause decides the order: version numbers are unique,
/// so later clauses never break a tie.
fn walk_order(order_by: &[String]) -> Result<WalkOrder> {
    let Some(first) = order_by.first() else {
        return Ok(WalkOrder::Descending);
    };
    let mut parts = first.split_whitespace();
    let field = parts.next().unwrap_or_default();
    let direction = parts.next();
    if field != "version_number" || parts.next().is_some() {
        return Err(RegistryError::invalid(format!(
            "cannot list versions by {:?} without version search; only version_number is supported",
            first
        )));
    }
    match direction {
        None => Ok(WalkOrder::Ascending),
        Some(d) if d.eq_ignore_ascii_case("ASC") => Ok(WalkOrder::Ascending),
        Some(d) if d.eq_ignore_ascii_case("DESC") => Ok(WalkOrder::Descending),
        Some(d) => Err(RegistryError::invalid(format!(
            "invalid sort direction {:?} in {:?}",
            d, first
        ))),
    }
}

fn has_tags(summary: &PromptVersionSummary, wanted: &HashMap<String, String>) -> bool {
    wanted
        .iter()
        .all(|(key, value)| summary.tags.get(key) == Some(value))
}

/// List the versions of one prompt, newest first unless `order_by` says otherwise.
pub async fn list_versions(
    transport: &dyn Transport,
    ctx: &CallContext,
    name: &str,
    opts: &ListVersionsOptions,
) -> Result<PromptVersionList> {
    if name.is_empty() {
        return Err(RegistryError::invalid("prompt name is required"));
    }
    validate_max_results(opts.max_results)?;

    let filter = Filter::new().name_equals(name).tags_equal(&opts.tag_filter);
    let order_by = if opts.order_by.is_empty() {
        vec![DEFAULT_ORDER_BY.to_string()]
    } else {
        opts.order_by.clone()
    };
    let page_token = opts.page_token.as_deref().filter(|t| !t.is_empty());

    let mut query = json!({
        "filter": filter.build(),
        "max_results": opts.max_results,
        "order_by": order_by,
    });
    if let Some(token) = page_token {
        query["page_token"] = json!(token);
    }

    let resp: SearchModelVersionsResponse = request(
        transport,
        ctx,
        Method::Get,
        paths::SEARCH_MODEL_VERSIONS,
        &query,
    )
    .await?;

    if !resp.model_versions.is_empty() {
        let versions = resp
            .model_versions
            .iter()
            .map(decode_version_summary)
            .collect::<Result<Vec<_>>>()?;
        return Ok(PromptVersionList {
            versions,
            next_page_token: resp.next_page_token.filter(|t| !t.is_empty()),
        });
    }

    // An empty page after the first one just means we ran off the end.
    if page_token.is_some() {
        return Ok(PromptVersionList::default());
    }

    // With a tag filter an empty page usually means nothing matched. Only a
    // search that misses the prompt's versions altogether needs the walk.
    if !opts.tag_filter.is_empty() && has_searchable_versions(transport, ctx, name).await? {
        return Ok(PromptVersionList::default());
    }

    walk_from_latest(transport, ctx, name, opts).await
}

/// Whether an unfiltered version search finds anything for `name`.
async fn has_searchable_versions(
    transport: &dyn Transport,
    ctx: &CallContext,
    name: &str,
) -> Result<bool> {
    let query = json!({
        "filter": Filter::new().name_equals(name).build(),
        "max_results": 1,
    });
    let resp: SearchModelVersionsResponse = request(
        transport,
        ctx,
        Method::Get,
        paths::SEARCH_MODEL_VERSIONS,
        &query,
    )
    .await?;
    Ok(!resp.model_versions.is_empty())
}

async fn walk_from_latest(
    transport: &dyn Transport,
    ctx: &CallContext,
    name: &str,
    opts: &ListVersionsOptions,
) -> Result<PromptVersionList> {
    let order = walk_order(&opts.order_by)?;

    let latest = match resolver::fetch(transport, ctx, name, &VersionSelector::Latest).await {
        Ok(mv) => mv,
        Err(err) if err.is_not_found() => return Ok(PromptVersionList::default()),
        Err(err) => return Err(err),
    };
    let Some(latest_version) = parse_version(&latest.version).filter(|v| *v > 0) else {
        return Ok(PromptVersionList::default());
    };

    warn!(
        prompt = name,
        latest_version,
        "Version search was empty but latest resolved, fetching versions individually"
    );

    let limit = opts.max_results as usize;
    let mut versions = Vec::new();
    let mut latest = Some(latest);

    let numbers: Box<dyn Iterator<Item = u32>> = match order {
        WalkOrder::Descending => Box::new((1..=latest_version).rev()),
        WalkOrder::Ascending => Box::new(1..=latest_version),
    };

    for version in numbers {
        if versions.len() >= limit {
            break;
        }

        let known = if version == latest_version {
            latest.take()
        } else {
            None
        };
        let mv = match known {
            Some(mv) => mv,
            None => {
                ctx.check()?;
                match resolver::fetch(transport, ctx, name, &VersionSelector::Number(version))
                    .await
                {
                    Ok(mv) => mv,
                    Err(err) if err.is_not_found() => {
                        debug!(prompt = name, version, "Skipping deleted version");
                        continue;
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        let summary = decode_version_summary(&mv)?;
        if has_tags(&summary, &opts.tag_filter) {
            versions.push(summary);
        }
    }

    Ok(PromptVersionList {
        versions,
        next_page_token: None,
    })
}
