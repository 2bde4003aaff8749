//! Error types for Jarvis.

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Failures inside a tool adapter. These never leave the adapter: they are
/// rendered into a `ToolOutput::ExternalError` at the adapter boundary.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    Api {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Google OAuth errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Client secrets file {path} could not be read: {reason}")]
    ClientSecrets { path: String, reason: String },

    #[error("Token store error: {0}")]
    Store(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
