use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use crate::cli::VersionArgs;
use crate::context::CallContext;
use crate::prompt::{ChatMessage, PromptContent, PromptModelConfig, PromptVersion};
use crate::registry::{ListPromptsOptions, RegistryClient};
use crate::resolver::LoadOptions;

/// Page size used when collecting names for suggestions
const SUGGESTION_PAGE_SIZE: u32 = 1000;

impl VersionArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            version: self.version,
            alias: self.alias.clone(),
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("Failed to encode JSON output")?;
    writeln!(out)?;
    Ok(())
}

pub fn tags_map(pairs: &[(String, String)]) -> HashMap<String, String> {
    pairs.iter().cloned().collect()
}

/// Merge a variables file with `--var` pairs; pairs win.
pub fn collect_variables(
    vars_file: Option<&str>,
    pairs: &[(String, String)],
) -> Result<HashMap<String, String>> {
    let mut vars = match vars_file {
        Some(path) => crate::template::load_variables_file(Path::new(path))?,
        None => HashMap::new(),
    };
    vars.extend(pairs.iter().cloned());
    Ok(vars)
}

pub fn read_chat_file(path: &str) -> Result<Vec<ChatMessage>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chat file {}", path))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} must be a JSON array of {{role, content}} objects", path))
}

pub fn read_model_config(path: &str) -> Result<PromptModelConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model config {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid model config in {}", path))
}

pub fn print_messages(out: &mut dyn Write, messages: &[ChatMessage]) -> Result<()> {
    for msg in messages {
        writeln!(out, "{}: {}", msg.role.bold(), msg.content)?;
    }
    Ok(())
}

/// Human-readable view of one version
pub fn print_version(out: &mut dyn Write, version: &PromptVersion) -> Result<()> {
    writeln!(
        out,
        "{} {} ({})",
        version.name.bold(),
        format!("v{}", version.version).cyan(),
        version.prompt_type()
    )?;
    if !version.aliases.is_empty() {
        writeln!(out, "  aliases: {}", version.aliases.join(", ").green())?;
    }
    if !version.commit_message.is_empty() {
        writeln!(out, "  message: {}", version.commit_message)?;
    }
    let mut tags: Vec<_> = version.tags.iter().collect();
    tags.sort();
    for (key, value) in tags {
        writeln!(out, "  tag {}={}", key, value)?;
    }
    writeln!(out)?;

    match &version.content {
        PromptContent::Text(template) => writeln!(out, "{}", template)?,
        PromptContent::Chat(messages) => print_messages(out, messages)?,
    }
    Ok(())
}

/// Prompt names to offer as "did you mean" candidates.
///
/// Best effort: any failure yields an empty list.
pub async fn known_prompt_names(client: &RegistryClient, ctx: &CallContext) -> Vec<String> {
    let opts = ListPromptsOptions {
        max_results: SUGGESTION_PAGE_SIZE,
        ..Default::default()
    };
    match client.list_prompts(ctx, &opts).await {
        Ok(page) => page.prompts.into_iter().map(|p| p.name).collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn test_collect_variables_pairs_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "name=File").unwrap();
        writeln!(file, "place=Paris").unwrap();

        let pairs = vec![("name".to_string(), "Ada".to_string())];
        let vars = collect_variables(file.path().to_str(), &pairs).unwrap();
        assert_eq!(vars["name"], "Ada");
        assert_eq!(vars["place"], "Paris");
    }

    #[test]
    fn test_read_chat_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"role":"system","content":"Be brief"}},{{"role":"user","content":"Hi {{{{name}}}}"}}]"#
        )
        .unwrap();

        let messages = read_chat_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "Hi {{name}}");
    }

    #[test]
    fn test_print_version_text() {
        colored::control::set_override(false);
        let version = PromptVersion::text("greeting", "Hello {{name}}")
            .with_commit_message("first")
            .with_tag("team", "core");
        let mut out: Vec<u8> = Vec::new();
        print_version(&mut out, &version).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("greeting v0 (text)"));
        assert!(text.contains("message: first"));
        assert!(text.contains("tag team=core"));
        assert!(text.ends_with("Hello {{name}}\n"));
    }
}
