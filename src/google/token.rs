//! OAuth token model and persistence.
//!
//! The file store does no locking. Two processes refreshing at the same time
//! can race on the file; the last writer wins.

use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::AuthError;

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// A cached Google OAuth credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Body of a successful token-endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

impl OAuthToken {
    /// Build a token from an endpoint response. Refresh responses usually omit
    /// the refresh token, so the previous one is carried over.
    pub fn from_response(
        resp: TokenResponse,
        issued_at: DateTime<Utc>,
        previous_refresh_token: Option<String>,
    ) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token.or(previous_refresh_token),
            expires_at: resp
                .expires_in
                .map(|secs| issued_at + Duration::seconds(secs)),
            scope: resp.scope,
            token_type: resp.token_type.unwrap_or_else(default_token_type),
        }
    }

    /// Usable at `now`: non-empty and not within the skew of its expiry.
    /// A token without an expiry is trusted.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && self
                .expires_at
                .is_none_or(|exp| exp - Duration::seconds(EXPIRY_SKEW_SECS) > now)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Where the calendar token lives between runs.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<OAuthToken>, AuthError>;

    async fn save(&self, token: &OAuthToken) -> Result<(), AuthError>;
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<OAuthToken>, AuthError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Io(e)),
        };
        match serde_json::from_str(&raw) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable token file; re-authorization required"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, token: &OAuthToken) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(token)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path).await?;

        // `mode` only applies on create; tighten a file written by an older run.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await?;
        }

        file.write_all(json.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(path = %self.path.display(), "Saved OAuth token");
        Ok(())
    }
}

/// In-memory store, for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<OAuthToken>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<OAuthToken>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    pub fn current(&self) -> Option<OAuthToken> {
        self.token.lock().ok().and_then(|t| t.clone())
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<OAuthToken>, AuthError> {
        self.token
            .lock()
            .map(|t| t.clone())
            .map_err(|e| AuthError::Store(e.to_string()))
    }

    async fn save(&self, token: &OAuthToken) -> Result<(), AuthError> {
        let mut slot = self
            .token
            .lock()
            .map_err(|e| AuthError::Store(e.to_string()))?;
        *slot = Some(token.clone());
        Ok(())
    }
}
