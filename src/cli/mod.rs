//! Command-line interface definitions and parsing
//!
//! Defines the `promptctl` command tree using Clap.

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "promptctl")]
#[command(version)]
#[command(about = "Manage prompts in an MLflow Prompt Registry")]
#[command(after_help = "ENVIRONMENT:
  MLFLOW_TRACKING_URI              Tracking server address (required)
  MLFLOW_TRACKING_TOKEN            Bearer token
  MLFLOW_INSECURE_SKIP_TLS_VERIFY  Allow plain http and skip TLS verification
  MLFLOW_PROMPTS_LOG_LEVEL         Enable logging on stderr, e.g. debug

EXAMPLES:
  promptctl register greeting --template \"Hello {{name}}\" -m \"first draft\"
  promptctl alias set greeting production 1
  promptctl format greeting --alias production --var name=Ada
  promptctl list --name-filter 'greet%'")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Which version a command reads. `--alias` and `--version` are exclusive;
/// with neither the latest version is used.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionArgs {
    /// Version number
    #[arg(long = "version", short = 'v', conflicts_with = "alias")]
    pub version: Option<u32>,
    /// Alias name, e.g. production
    #[arg(long, short = 'a')]
    pub alias: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a prompt version
    #[command(alias = "show")]
    Load {
        name: String,
        #[command(flatten)]
        select: VersionArgs,
        /// Print the version as JSON
        #[arg(long)]
        json: bool,
    },
    /// Register a new prompt version
    #[command(alias = "new")]
    Register {
        name: String,
        /// Text template
        #[arg(long, short = 't', conflicts_with_all = ["file", "chat"], required_unless_present_any = ["file", "chat"])]
        template: Option<String>,
        /// Read the text template from a file
        #[arg(long, short = 'f', conflicts_with = "chat")]
        file: Option<String>,
        /// Read chat messages from a JSON file of {role, content} objects
        #[arg(long)]
        chat: Option<String>,
        /// Commit message
        #[arg(long = "message", short = 'm')]
        message: Option<String>,
        /// Version tag as key=value (repeatable)
        #[arg(long = "tag", value_parser = parse_key_value)]
        tags: Vec<(String, String)>,
        /// Model configuration JSON file
        #[arg(long = "model-config")]
        model_config: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List prompts
    #[command(alias = "ls")]
    List {
        /// SQL LIKE pattern on the name, e.g. 'greet%'
        #[arg(long = "name-filter")]
        name_filter: Option<String>,
        /// Only prompts with this tag as key=value (repeatable)
        #[arg(long = "tag", value_parser = parse_key_value)]
        tags: Vec<(String, String)>,
        #[arg(long = "max", default_value_t = 100)]
        max: u32,
        #[arg(long = "page-token")]
        page_token: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show prompt metadata and aliases
    Info {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// List versions of a prompt, newest first
    Versions {
        name: String,
        #[arg(long = "max", default_value_t = 100)]
        max: u32,
        #[arg(long = "page-token")]
        page_token: Option<String>,
        /// Only versions with this tag as key=value (repeatable)
        #[arg(long = "tag", value_parser = parse_key_value)]
        tags: Vec<(String, String)>,
        #[arg(long)]
        json: bool,
    },
    /// Render a prompt version with variables
    #[command(alias = "render")]
    Format {
        name: String,
        #[command(flatten)]
        select: VersionArgs,
        /// Template variable as name=value (repeatable)
        #[arg(long = "var", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
        /// File of name=value lines
        #[arg(long = "vars-file")]
        vars_file: Option<String>,
        /// Print chat output as JSON messages
        #[arg(long)]
        json: bool,
    },
    /// Manage aliases
    #[command(subcommand)]
    Alias(AliasCommands),
    /// Manage tags on prompts and versions
    #[command(subcommand)]
    Tag(TagCommands),
    /// Delete a prompt, or a single version of it
    #[command(alias = "rm")]
    Delete {
        name: String,
        /// Delete only this version
        #[arg(long = "version", short = 'v')]
        version: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AliasCommands {
    /// Point an alias at a version
    Set {
        name: String,
        alias: String,
        version: u32,
    },
    /// Remove an alias
    Delete { name: String, alias: String },
}

#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Set a tag on a prompt, or on a version with --version
    Set {
        name: String,
        key: String,
        value: String,
        #[arg(long = "version", short = 'v')]
        version: Option<u32>,
    },
    /// Delete a tag from a prompt, or from a version with --version
    Delete {
        name: String,
        key: String,
        #[arg(long = "version", short = 'v')]
        version: Option<u32>,
    },
}

impl Commands {
    /// Command name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Load { .. } => "load",
            Commands::Register { .. } => "register",
            Commands::List { .. } => "list",
            Commands::Info { .. } => "info",
            Commands::Versions { .. } => "versions",
            Commands::Format { .. } => "format",
            Commands::Alias(AliasCommands::Set { .. }) => "alias set",
            Commands::Alias(AliasCommands::Delete { .. }) => "alias delete",
            Commands::Tag(TagCommands::Set { .. }) => "tag set",
            Commands::Tag(TagCommands::Delete { .. }) => "tag delete",
            Commands::Delete { .. } => "delete",
        }
    }

    /// Prompt the command operates on, if any
    pub fn prompt_name(&self) -> Option<&str> {
        match self {
            Commands::Load { name, .. }
            | Commands::Register { name, .. }
            | Commands::Info { name, .. }
            | Commands::Versions { name, .. }
            | Commands::Format { name, .. }
            | Commands::Delete { name, .. }
            | Commands::Alias(AliasCommands::Set { name, .. })
            | Commands::Alias(AliasCommands::Delete { name, .. })
            | Commands::Tag(TagCommands::Set { name, .. })
            | Commands::Tag(TagCommands::Delete { name, .. }) => Some(name),
            Commands::List { .. } => None,
        }
    }
}

/// Parse `key=value`. The value may contain further `=` signs.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
