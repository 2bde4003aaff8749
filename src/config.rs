//! Configuration types.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::error::ConfigError;

/// Azure OpenAI API version used when `AZURE_OPENAI_API_VERSION` is unset.
pub const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Directory `read <file>` commands resolve against.
pub const DEFAULT_KNOWLEDGE_DIR: &str = "knowledge";

/// Google OAuth client secrets downloaded from the cloud console.
pub const DEFAULT_GOOGLE_CREDENTIALS: &str = "credentials.json";

/// Where the calendar OAuth token is cached between runs.
pub const DEFAULT_GOOGLE_TOKEN: &str = "token.json";

/// Credentials and paths loaded once at startup.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Azure OpenAI resource endpoint, e.g. `https://my-res.openai.azure.com`.
    pub endpoint: String,
    pub api_key: SecretString,
    /// Deployment name of the chat model.
    pub deployment: String,
    pub api_version: String,
    /// Notion integration token. `None` disables the task database tool.
    pub notion_api_key: Option<SecretString>,
    /// Root of the Obsidian vault. `None` disables the vault tool.
    pub vault_path: Option<PathBuf>,
    pub knowledge_dir: PathBuf,
    pub google_credentials_path: PathBuf,
    pub google_token_path: PathBuf,
    /// Whether the browser consent flow may run when no usable token exists.
    pub google_interactive_auth: bool,
}

impl AssistantConfig {
    /// Build config from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first when present;
    /// variables already set in the environment win.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            tracing::warn!(error = %e, "Failed to load .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint = get("AZURE_OPENAI_ENDPOINT");
        let api_key = get("AZURE_OPENAI_KEY");
        let deployment = get("AZURE_OPENAI_DEPLOYMENT_NAME");

        let (Some(endpoint), Some(api_key), Some(deployment)) = (endpoint, api_key, deployment)
        else {
            return Err(ConfigError::MissingRequired {
                key: "AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_KEY, AZURE_OPENAI_DEPLOYMENT_NAME"
                    .to_string(),
                hint: "Azure OpenAI credentials not found in the environment or .env file."
                    .to_string(),
            });
        };

        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "AZURE_OPENAI_ENDPOINT".to_string(),
                message: format!("expected an http(s) URL, got '{}'", endpoint),
            });
        }

        let notion_api_key = get("NOTION_API_KEY").map(SecretString::from);
        if notion_api_key.is_none() {
            tracing::warn!("NOTION_API_KEY not found. Notion features will be disabled.");
        }

        let google_interactive_auth = match get("JARVIS_GOOGLE_INTERACTIVE") {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "JARVIS_GOOGLE_INTERACTIVE".to_string(),
                message: format!("expected true or false, got '{}'", raw),
            })?,
        };

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: SecretString::from(api_key),
            deployment,
            api_version: get("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            notion_api_key,
            vault_path: get("OBSIDIAN_VAULT_PATH").map(|raw| expand_vault_path(&raw)),
            knowledge_dir: get("JARVIS_KNOWLEDGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_KNOWLEDGE_DIR)),
            google_credentials_path: get("JARVIS_GOOGLE_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GOOGLE_CREDENTIALS)),
            google_token_path: get("JARVIS_GOOGLE_TOKEN")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GOOGLE_TOKEN)),
            google_interactive_auth,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Strip surrounding quotes and expand a leading `~` to `$HOME`.
pub fn expand_vault_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim().trim_matches(|c| c == '\'' || c == '"');
    if let Some(rest) = trimmed.strip_prefix('~')
        && (rest.is_empty() || rest.starts_with('/'))
        && let Ok(home) = std::env::var("HOME")
    {
        return Path::new(&home).join(rest.trim_start_matches('/'));
    }
    PathBuf::from(trimmed)
}
