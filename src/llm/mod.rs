//! LLM integration for Jarvis.
//!
//! The assistant talks to a single Azure OpenAI chat deployment through
//! rig-core. The `RigAdapter` bridges rig's `CompletionModel` trait to our
//! `LlmProvider` trait, so tests can swap in a scripted model.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::{ExposeSecret, SecretString};

use crate::config::AssistantConfig;
use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: SecretString,
    pub deployment: String,
    pub api_version: String,
}

impl From<&AssistantConfig> for LlmConfig {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            deployment: config.deployment.clone(),
            api_version: config.api_version.clone(),
        }
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::azure;

    if config.deployment.is_empty() {
        return Err(LlmError::RequestFailed {
            provider: "azure-openai".to_string(),
            reason: "deployment name is empty".to_string(),
        });
    }
    if config.api_key.expose_secret().is_empty() {
        return Err(LlmError::AuthFailed {
            provider: "azure-openai".to_string(),
        });
    }

    let client: azure::Client = azure::Client::builder()
        .api_key(azure::AzureOpenAIAuth::ApiKey(
            config.api_key.expose_secret().to_string(),
        ))
        .azure_endpoint(config.endpoint.clone())
        .api_version(&config.api_version)
        .build()
        .map_err(|e| LlmError::RequestFailed {
            provider: "azure-openai".to_string(),
            reason: format!("Failed to create Azure OpenAI client: {}", e),
        })?;

    let model = client.completion_model(&config.deployment);
    tracing::info!(
        "Using Azure OpenAI (endpoint: {}, deployment: {})",
        config.endpoint,
        config.deployment
    );
    Ok(Arc::new(RigAdapter::new(model, &config.deployment)))
}
