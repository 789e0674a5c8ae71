use anyhow::{Context, Result};
use colored::*;
use std::io::Write;

use super::common::{
    collect_variables, print_messages, print_version, read_chat_file, read_model_config,
    tags_map, write_json,
};
use crate::cli::VersionArgs;
use crate::context::CallContext;
use crate::enumerator::ListVersionsOptions;
use crate::error::RegistryError;
use crate::prompt::PromptContent;
use crate::registry::{ListPromptsOptions, RegisterOptions, RegistryClient};

pub async fn handle_load(
    client: &RegistryClient,
    ctx: &CallContext,
    out: &mut dyn Write,
    name: &str,
    select: &VersionArgs,
    json: bool,
) -> Result<()> {
    let version = client.load_prompt(ctx, name, &select.load_options()).await?;
    if json {
        write_json(out, &version)
    } else {
        print_version(out, &version)
    }
}

pub struct RegisterArgs<'a> {
    pub template: Option<&'a str>,
    pub file: Option<&'a str>,
    pub chat: Option<&'a str>,
    pub message: Option<&'a str>,
    pub tags: &'a [(String, String)],
    pub model_config: Option<&'a str>,
    pub json: bool,
}

pub async fn handle_register(
    client: &RegistryClient,
    ctx: &CallContext,
    out: &mut dyn Write,
    name: &str,
    args: RegisterArgs<'_>,
) -> Result<()> {
    let content = match (args.template, args.file, args.chat) {
        (Some(template), _, _) => PromptContent::Text(template.to_string()),
        (None, Some(path), _) => PromptContent::Text(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template file {}", path))?,
        ),
        (None, None, Some(path)) => PromptContent::Chat(read_chat_file(path)?),
        (None, None, None) => anyhow::bail!("one of --template, --file or --chat is required"),
    };

    let mut opts = RegisterOptions {
        tags: tags_map(args.tags),
        ..Default::default()
    };
    if let Some(message) = args.message {
        opts = opts.with_commit_message(message);
    }
    if let Some(path) = args.model_config {
        opts = opts.with_model_config(read_model_config(path)?);
    }

    let version = client
        .register(ctx, name, content, opts)
        .await
        .with_context(|| format!("Failed to register {}", name))?;

    if args.json {
        return write_json(out, &version);
    }
    writeln!(
        out,
        "{} Registered {} version {}",
        "✓".green(),
        name.bold(),
        version.version.to_string().cyan()
    )?;
    Ok(())
}

pub struct ListArgs<'a> {
    pub name_filter: Option<&'a str>,
    pub tags: &'a [(String, String)],
    pub max: u32,
    pub page_token: Option<&'a str>,
    pub json: bool,
}

pub async fn handle_list(
    client: &RegistryClient,
    ctx: &CallContext,
    out: &mut dyn Write,
    args: ListArgs<'_>,
) -> Result<()> {
    let opts = ListPromptsOptions {
        max_results: args.max,
        page_token: args.page_token.map(str::to_string),
        name_filter: args.name_filter.map(str::to_string),
        tag_filter: tags_map(args.tags),
        order_by: Vec::new(),
    };
    let page = client.list_prompts(ctx, &opts).await?;

    if args.json {
        return write_json(out, &page);
    }
    if page.prompts.is_empty() {
        writeln!(
            out,
            "No prompts found. Create one with: {}",
            "promptctl register <name> --template <text>".bold()
        )?;
        return Ok(());
    }
    for prompt in &page.prompts {
        writeln!(
            out,
            "{:<30} v{:<5} {}",
            prompt.name.bold(),
            prompt.latest_version,
            prompt.description
        )?;
    }
    if let Some(token) = &page.next_page_token {
        writeln!(out, "\nMore results: --page-token {}", token.cyan())?;
    }
    Ok(())
}

pub async fn handle_info(
    client: &RegistryClient,
    ctx: &CallContext,
    out: &mut dyn Write,
    name: &str,
    json: bool,
) -> Result<()> {
    let prompt = client.get_prompt(ctx, name).await?;
    if json {
        return write_json(out, &prompt);
    }

    writeln!(out, "{}", prompt.name.bold())?;
    if !prompt.description.is_empty() {
        writeln!(out, "  {}", prompt.description)?;
    }
    writeln!(out, "  latest version: {}", prompt.latest_version)?;
    if let Some(created) = prompt.created_at {
        writeln!(out, "  created: {}", created.format("%Y-%m-%d %H:%M:%S UTC"))?;
    }
    for (alias, version) in &prompt.aliases {
        writeln!(out, "  alias {} -> v{}", alias.green(), version)?;
    }
    let mut tags: Vec<_> = prompt.tags.iter().collect();
    tags.sort();
    for (key, value) in tags {
        writeln!(out, "  tag {}={}", key, value)?;
    }
    Ok(())
}

pub struct VersionsArgs<'a> {
    pub max: u32,
    pub page_token: Option<&'a str>,
    pub tags: &'a [(String, String)],
    pub json: bool,
}

pub async fn handle_versions(
    client: &RegistryClient,
    ctx: &CallContext,
    out: &mut dyn Write,
    name: &str,
    args: VersionsArgs<'_>,
) -> Result<()> {
    let mut opts = ListVersionsOptions::default().with_max_results(args.max);
    if let Some(token) = args.page_token {
        opts = opts.with_page_token(token);
    }
    for (key, value) in args.tags {
        opts = opts.with_tag(key.as_str(), value.as_str());
    }
    let page = client.list_prompt_versions(ctx, name, &opts).await?;

    if args.json {
        return write_json(out, &page);
    }
    if page.versions.is_empty() {
        writeln!(out, "{} has no versions", name.bold())?;
        return Ok(());
    }
    for version in &page.versions {
        let aliases = if version.aliases.is_empty() {
            String::new()
        } else {
            format!(" [{}]", version.aliases.join(", ")).green().to_string()
        };
        writeln!(
            out,
            "{}{} {}",
            format!("v{:<5}", version.version).cyan(),
            aliases,
            version.commit_message
        )?;
    }
    if let Some(token) = &page.next_page_token {
        writeln!(out, "\nMore results: --page-token {}", token.cyan())?;
    }
    Ok(())
}

pub struct FormatArgs<'a> {
    pub select: &'a VersionArgs,
    pub vars: &'a [(String, String)],
    pub vars_file: Option<&'a str>,
    pub json: bool,
}

pub async fn handle_format(
    client: &RegistryClient,
    ctx: &CallContext,
    out: &mut dyn Write,
    name: &str,
    args: FormatArgs<'_>,
) -> Result<()> {
    let vars = collect_variables(args.vars_file, args.vars)?;
    let version = client
        .load_prompt(ctx, name, &args.select.load_options())
        .await?;

    if version.is_chat() {
        let messages = version
            .format_as_messages(&vars)
            .map_err(RegistryError::from)?;
        if args.json {
            write_json(out, &messages)
        } else {
            print_messages(out, &messages)
        }
    } else {
        let text = version.format_as_text(&vars).map_err(RegistryError::from)?;
        if args.json {
            write_json(out, &text)
        } else {
            writeln!(out, "{}", text)?;
            Ok(())
        }
    }
}

pub async fn handle_delete(
    client: &RegistryClient,
    ctx: &CallContext,
    out: &mut dyn Write,
    name: &str,
    version: Option<u32>,
) -> Result<()> {
    match version {
        Some(version) => {
            client.delete_prompt_version(ctx, name, version).await?;
            writeln!(out, "{} Deleted {} version {}", "✓".green(), name.bold(), version)?;
        }
        None => {
            client.delete_prompt(ctx, name).await?;
            writeln!(out, "{} Deleted {}", "✓".green(), name.bold())?;
        }
    }
    Ok(())
}
