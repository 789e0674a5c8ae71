//! Handlers for `promptctl` subcommands
//!
//! Each handler writes its output to `out` and returns registry failures as
//! `anyhow` errors wrapping [`RegistryError`](crate::error::RegistryError).

pub mod common;
pub mod metadata;
pub mod prompts;

use anyhow::Result;
use std::io::Write;

use crate::cli::Commands;
use crate::context::CallContext;
use crate::registry::RegistryClient;

pub use common::known_prompt_names;
pub use metadata::{handle_alias, handle_tag};
pub use prompts::{
    handle_delete, handle_format, handle_info, handle_list, handle_load, handle_register,
    handle_versions, FormatArgs, ListArgs, RegisterArgs, VersionsArgs,
};

/// Run one parsed command against the registry.
pub async fn run(
    client: &RegistryClient,
    ctx: &CallContext,
    out: &mut dyn Write,
    command: &Commands,
) -> Result<()> {
    match command {
        Commands::Load { name, select, json } => {
            handle_load(client, ctx, out, name, select, *json).await
        }
        Commands::Register {
            name,
            template,
            file,
            chat,
            message,
            tags,
            model_config,
            json,
        } => {
            let args = RegisterArgs {
                template: template.as_deref(),
                file: file.as_deref(),
                chat: chat.as_deref(),
                message: message.as_deref(),
                tags,
                model_config: model_config.as_deref(),
                json: *json,
            };
            handle_register(client, ctx, out, name, args).await
        }
        Commands::List {
            name_filter,
            tags,
            max,
            page_token,
            json,
        } => {
            let args = ListArgs {
                name_filter: name_filter.as_deref(),
                tags,
                max: *max,
                page_token: page_token.as_deref(),
                json: *json,
            };
            handle_list(client, ctx, out, args).await
        }
        Commands::Info { name, json } => handle_info(client, ctx, out, name, *json).await,
        Commands::Versions {
            name,
            max,
            page_token,
            tags,
            json,
        } => {
            let args = VersionsArgs {
                max: *max,
                page_token: page_token.as_deref(),
                tags,
                json: *json,
            };
            handle_versions(client, ctx, out, name, args).await
        }
        Commands::Format {
            name,
            select,
            vars,
            vars_file,
            json,
        } => {
            let args = FormatArgs {
                select,
                vars,
                vars_file: vars_file.as_deref(),
                json: *json,
            };
            handle_format(client, ctx, out, name, args).await
        }
        Commands::Alias(command) => handle_alias(client, ctx, out, command).await,
        Commands::Tag(command) => handle_tag(client, ctx, out, command).await,
        Commands::Delete { name, version } => {
            handle_delete(client, ctx, out, name, *version).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::memory::InMemoryRegistry;
    use clap::Parser;

    async fn run_args(client: &RegistryClient, args: &[&str]) -> Result<String> {
        let cli = Cli::try_parse_from(args.iter().copied())?;
        let mut out: Vec<u8> = Vec::new();
        run(client, &CallContext::background(), &mut out, &cli.command).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn test_cli_workflow() {
        colored::control::set_override(false);
        let client = RegistryClient::with_transport(InMemoryRegistry::new());

        run_args(&client, &["promptctl", "register", "greeting", "-t", "Hello {{name}}"])
            .await
            .unwrap();
        run_args(&client, &["promptctl", "register", "greeting", "-t", "Hi {{name}}!"])
            .await
            .unwrap();
        run_args(&client, &["promptctl", "alias", "set", "greeting", "production", "1"])
            .await
            .unwrap();

        let rendered = run_args(
            &client,
            &["promptctl", "format", "greeting", "--alias", "production", "--var", "name=Ada"],
        )
        .await
        .unwrap();
        assert_eq!(rendered, "Hello Ada\n");

        let latest = run_args(&client, &["promptctl", "format", "greeting", "--var", "name=Ada"])
            .await
            .unwrap();
        assert_eq!(latest, "Hi Ada!\n");

        let info = run_args(&client, &["promptctl", "info", "greeting"]).await.unwrap();
        assert!(info.contains("latest version: 2"));
        assert!(info.contains("alias production -> v1"));
    }
}
