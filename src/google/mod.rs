//! Google Calendar access: OAuth tokens and the REST client.

pub mod calendar;
pub mod oauth;
pub mod token;

use std::sync::Arc;

pub use calendar::GoogleCalendarClient;
pub use oauth::GoogleAuth;
pub use token::{FileTokenStore, MemoryTokenStore, OAuthToken, TokenStore};

use crate::config::AssistantConfig;
use crate::error::ToolError;

/// Build a calendar client whose token lives in the configured token file.
pub fn calendar_client(config: &AssistantConfig) -> Result<GoogleCalendarClient, ToolError> {
    let store = Arc::new(FileTokenStore::new(config.google_token_path.clone()));
    let auth = GoogleAuth::new(store, config.google_credentials_path.clone())
        .with_interactive(config.google_interactive_auth);
    GoogleCalendarClient::new(Arc::new(auth))
}
