use anyhow::Result;
use colored::*;
use std::io::Write;

use crate::cli::{AliasCommands, TagCommands};
use crate::context::CallContext;
use crate::registry::RegistryClient;

pub async fn handle_alias(
    client: &RegistryClient,
    ctx: &CallContext,
    out: &mut dyn Write,
    command: &AliasCommands,
) -> Result<()> {
    match command {
        AliasCommands::Set {
            name,
            alias,
            version,
        } => {
            client.set_prompt_alias(ctx, name, alias, *version).await?;
            writeln!(
                out,
                "{} {}@{} -> v{}",
                "✓".green(),
                name.bold(),
                alias.green(),
                version
            )?;
        }
        AliasCommands::Delete { name, alias } => {
            client.delete_prompt_alias(ctx, name, alias).await?;
            writeln!(out, "{} Removed alias {} from {}", "✓".green(), alias, name.bold())?;
        }
    }
    Ok(())
}

pub async fn handle_tag(
    client: &RegistryClient,
    ctx: &CallContext,
    out: &mut dyn Write,
    command: &TagCommands,
) -> Result<()> {
    match command {
        TagCommands::Set {
            name,
            key,
            value,
            version: Some(version),
        } => {
            client
                .set_prompt_version_tag(ctx, name, *version, key, value)
                .await?;
            writeln!(out, "{} {} v{}: {}={}", "✓".green(), name.bold(), version, key, value)?;
        }
        TagCommands::Set {
            name,
            key,
            value,
            version: None,
        } => {
            client.set_prompt_tag(ctx, name, key, value).await?;
            writeln!(out, "{} {}: {}={}", "✓".green(), name.bold(), key, value)?;
        }
        TagCommands::Delete {
            name,
            key,
            version: Some(version),
        } => {
            client
                .delete_prompt_version_tag(ctx, name, *version, key)
                .await?;
            writeln!(out, "{} Removed tag {} from {} v{}", "✓".green(), key, name.bold(), version)?;
        }
        TagCommands::Delete {
            name,
            key,
            version: None,
        } => {
            client.delete_prompt_tag(ctx, name, key).await?;
            writeln!(out, "{} Removed tag {} from {}", "✓".green(), key, name.bold())?;
        }
    }
    Ok(())
}
