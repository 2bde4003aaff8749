//! The `Tool` trait and its result type.

use std::fmt;

use async_trait::async_trait;

/// What an adapter hands back to the assistant.
///
/// Adapters never fail past their boundary; every outcome is one of these
/// variants. The assistant currently injects all of them into the prompt the
/// same way, so a diagnostic reads to the model like regular context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    /// Real context gathered from the source.
    Context(String),
    /// The source is not configured; the text says what is missing.
    Unconfigured(String),
    /// The lookup worked but found nothing (or the named item does not exist).
    NotFound(String),
    /// The external call failed.
    ExternalError(String),
}

impl ToolOutput {
    pub fn text(&self) -> &str {
        match self {
            Self::Context(text)
            | Self::Unconfigured(text)
            | Self::NotFound(text)
            | Self::ExternalError(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Context(text)
            | Self::Unconfigured(text)
            | Self::NotFound(text)
            | Self::ExternalError(text) => text,
        }
    }

    pub fn is_context(&self) -> bool {
        matches!(self, Self::Context(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Context(_) => "context",
            Self::Unconfigured(_) => "unconfigured",
            Self::NotFound(_) => "not_found",
            Self::ExternalError(_) => "external_error",
        }
    }
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// One external lookup driven by the raw command text.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn execute(&self, command: &str) -> ToolOutput;
}
