//! Client configuration
//!
//! Settings come from an optional TOML file overlaid by `MLFLOW_*`
//! environment variables. Environment always wins over the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

pub const ENV_TRACKING_URI: &str = "MLFLOW_TRACKING_URI";
pub const ENV_TRACKING_TOKEN: &str = "MLFLOW_TRACKING_TOKEN";
pub const ENV_INSECURE: &str = "MLFLOW_INSECURE_SKIP_TLS_VERIFY";
pub const ENV_TIMEOUT: &str = "MLFLOW_HTTP_REQUEST_TIMEOUT";
pub const ENV_WORKSPACE: &str = "MLFLOW_WORKSPACE";
pub const ENV_CONFIG_PATH: &str = "MLFLOW_PROMPTS_CONFIG";

pub const WORKSPACE_HEADER: &str = "X-MLFLOW-WORKSPACE";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Connection settings for a tracking server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the tracking server, e.g. `https://mlflow.example.com`
    pub tracking_uri: String,
    /// Bearer token sent as `Authorization: Bearer <token>`
    pub token: Option<String>,
    /// Allow plain `http` and skip TLS certificate verification
    pub insecure: bool,
    pub timeout: Duration,
    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tracking_uri: String::new(),
            token: None,
            insecure: false,
            timeout: DEFAULT_TIMEOUT,
            headers: BTreeMap::new(),
            user_agent: default_user_agent(),
        }
    }
}

/// On-disk layout of the config file. Every field is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct FileConfig {
    tracking_uri: Option<String>,
    token: Option<String>,
    insecure: Option<bool>,
    timeout_secs: Option<u64>,
    workspace: Option<String>,
    headers: BTreeMap<String, String>,
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

impl ClientConfig {
    pub fn new(tracking_uri: impl Into<String>) -> Self {
        Self {
            tracking_uri: tracking_uri.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Configuration file overlaid by environment variables.
    ///
    /// A missing file is not an error. The file location is
    /// `$MLFLOW_PROMPTS_CONFIG`, falling back to
    /// `~/.config/mlflow-prompts/config.toml`.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        dirs::config_dir().map(|dir| dir.join("mlflow-prompts").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            RegistryError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| RegistryError::Config(format!("{}: {}", path.display(), e)))
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let file: FileConfig = toml::from_str(content)?;

        let mut config = Self {
            headers: file.headers,
            ..Self::default()
        };
        if let Some(uri) = file.tracking_uri {
            config.tracking_uri = uri;
        }
        config.token = file.token.filter(|t| !t.is_empty());
        if let Some(insecure) = file.insecure {
            config.insecure = insecure;
        }
        if let Some(secs) = file.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(workspace) = file.workspace.filter(|w| !w.is_empty()) {
            config.headers.insert(WORKSPACE_HEADER.to_string(), workspace);
        }
        Ok(config)
    }

    /// Overlay values found through `lookup`, keyed by environment variable name.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(uri) = get(ENV_TRACKING_URI) {
            self.tracking_uri = uri;
        }
        if let Some(token) = get(ENV_TRACKING_TOKEN) {
            self.token = Some(token);
        }
        if let Some(insecure) = get(ENV_INSECURE) {
            self.insecure = parse_bool(&insecure);
        }
        if let Some(timeout) = get(ENV_TIMEOUT) {
            let secs: u64 = timeout.trim().parse().map_err(|_| {
                RegistryError::Config(format!("{} must be a number of seconds", ENV_TIMEOUT))
            })?;
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(workspace) = get(ENV_WORKSPACE) {
            self.headers.insert(WORKSPACE_HEADER.to_string(), workspace);
        }
        Ok(())
    }

    /// Check the configuration and normalize the tracking URI.
    ///
    /// A URI without a scheme gets `https://`. Plain `http` is refused unless
    /// `insecure` is set. A trailing slash is removed.
    pub fn validate(mut self) -> Result<Self> {
        let uri = self.tracking_uri.trim().trim_end_matches('/');
        if uri.is_empty() {
            return Err(RegistryError::Config(format!(
                "tracking URI is required (set {})",
                ENV_TRACKING_URI
            )));
        }

        let uri = if uri.contains("://") {
            uri.to_string()
        } else {
            format!("https://{}", uri)
        };

        let scheme = uri.split("://").next().unwrap_or_default().to_ascii_lowercase();
        match scheme.as_str() {
            "https" => {}
            "http" if self.insecure => {}
            "http" => {
                return Err(RegistryError::Config(format!(
                    "refusing plain http tracking URI {} (set {}=true to allow)",
                    uri, ENV_INSECURE
                )))
            }
            other => {
                return Err(RegistryError::Config(format!(
                    "unsupported URI scheme {:?}",
                    other
                )))
            }
        }

        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }
        self.tracking_uri = uri;
        Ok(self)
    }
}
