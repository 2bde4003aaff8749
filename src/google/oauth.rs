//! Google OAuth for the installed-app flow.
//!
//! `GoogleAuth::access_token` returns a usable bearer token: the cached one if
//! still valid, a refreshed one if a refresh token exists, otherwise one
//! obtained by sending the user through the consent page and catching the
//! redirect with a one-route axum server on a loopback port. New tokens are
//! written back to the store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use chrono::Utc;
use reqwest::Url;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::google::token::{OAuthToken, TokenResponse, TokenStore};

/// Read-only calendar access.
pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// How long the redirect server may take to drain connections once the code
/// has arrived.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// OAuth client registration, as downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse a client secrets document (`installed` or `web` section).
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let file: ClientSecretsFile = serde_json::from_str(raw)?;
        file.installed
            .or(file.web)
            .ok_or_else(|| AuthError::AuthorizationFailed(
                "client secrets have neither an 'installed' nor a 'web' section".to_string(),
            ))
    }

    pub async fn from_file(path: &Path) -> Result<Self, AuthError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthError::ClientSecrets {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::parse(&raw)
    }
}

/// Build the consent-page URL.
pub fn build_auth_url(
    secrets: &ClientSecrets,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
) -> Result<Url, AuthError> {
    let scope = scopes.join(" ");
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )
    .map_err(|e| AuthError::AuthorizationFailed(format!("invalid auth_uri: {}", e)))
}

/// What arrived on the loopback redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Code { code: String, state: Option<String> },
    Denied(String),
    /// A request to `/` without a code or an error.
    Ignored,
}

/// Interpret the query string of the redirect, e.g. `code=...&state=...`.
pub fn parse_callback(query: &str) -> Callback {
    let Ok(url) = Url::parse(&format!("http://127.0.0.1/?{}", query)) else {
        return Callback::Ignored;
    };
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    if let Some(error) = params.get("error") {
        return Callback::Denied(error.clone());
    }
    match params.get("code") {
        Some(code) => Callback::Code {
            code: code.clone(),
            state: params.get("state").cloned(),
        },
        None => Callback::Ignored,
    }
}

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    result: mpsc::Sender<Result<String, AuthError>>,
}

/// GET /?code=...&state=...
async fn handle_callback(
    State(state): State<CallbackState>,
    RawQuery(query): RawQuery,
) -> (StatusCode, &'static str) {
    let (outcome, reply) = match parse_callback(query.as_deref().unwrap_or_default()) {
        Callback::Code { code, state: got } if got.as_deref() == Some(&*state.expected_state) => (
            Ok(code),
            (StatusCode::OK, "Jarvis is authorized. You can close this window."),
        ),
        Callback::Code { .. } => (
            Err(AuthError::AuthorizationFailed(
                "state mismatch on OAuth redirect".to_string(),
            )),
            (StatusCode::BAD_REQUEST, "State mismatch."),
        ),
        Callback::Denied(error) => (
            Err(AuthError::AuthorizationFailed(error)),
            (StatusCode::OK, "Authorization was denied."),
        ),
        Callback::Ignored => {
            debug!("Ignoring OAuth redirect without a code");
            return (StatusCode::BAD_REQUEST, "Missing authorization code.");
        }
    };
    // Only the first outcome counts; later ones find the channel full.
    if state.result.try_send(outcome).is_err() {
        debug!("OAuth outcome already received");
    }
    reply
}

/// Serve the redirect on `listener` until a request settles the flow.
///
/// Each connection is handled on its own task, so an idle connection (a
/// browser's speculative preconnect, say) cannot hold up the real redirect.
async fn wait_for_code(listener: TcpListener, expected_state: &str) -> Result<String, AuthError> {
    let (result_tx, mut result_rx) = mpsc::channel(1);
    let app = Router::new()
        .route("/", get(handle_callback))
        .with_state(CallbackState {
            expected_state: Arc::from(expected_state),
            result: result_tx,
        });

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let outcome = result_rx.recv().await;
    let _ = shutdown_tx.send(());
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
        Ok(Ok(Err(e))) => warn!(error = %e, "OAuth redirect server failed"),
        Ok(_) => {}
        Err(_) => {
            debug!("OAuth redirect server still draining; aborting");
            server.abort();
        }
    }

    outcome.unwrap_or_else(|| {
        Err(AuthError::AuthorizationFailed(
            "redirect server stopped before a code arrived".to_string(),
        ))
    })
}

/// Supplies Google access tokens backed by a `TokenStore`.
pub struct GoogleAuth {
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    secrets_path: PathBuf,
    scopes: Vec<String>,
    interactive: bool,
}

impl GoogleAuth {
    pub fn new(store: Arc<dyn TokenStore>, secrets_path: PathBuf) -> Self {
        Self {
            http: reqwest::Client::new(),
            store,
            secrets_path,
            scopes: vec![CALENDAR_READONLY_SCOPE.to_string()],
            interactive: true,
        }
    }

    /// Allow or forbid the browser consent flow when no usable token exists.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub async fn access_token(&self) -> Result<String, AuthError> {
        let cached = self.store.load().await?;
        if let Some(token) = &cached
            && token.is_valid_at(Utc::now())
        {
            return Ok(token.access_token.clone());
        }

        let token = match cached {
            Some(token) if token.can_refresh() => self.refresh(&token).await?,
            _ => self.authorize_interactively().await?,
        };
        self.store.save(&token).await?;
        Ok(token.access_token)
    }

    async fn refresh(&self, token: &OAuthToken) -> Result<OAuthToken, AuthError> {
        info!("Refreshing Google OAuth token");
        let secrets = ClientSecrets::from_file(&self.secrets_path).await?;
        let refresh_token = token.refresh_token.clone().unwrap_or_default();
        let params = [
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        let resp = self
            .token_request(&secrets.token_uri, &params)
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;
        Ok(OAuthToken::from_response(resp, Utc::now(), Some(refresh_token)))
    }

    async fn authorize_interactively(&self) -> Result<OAuthToken, AuthError> {
        if !self.interactive {
            return Err(AuthError::AuthorizationFailed(
                "no valid Google token and interactive authorization is disabled".to_string(),
            ));
        }
        let secrets = ClientSecrets::from_file(&self.secrets_path).await?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}/", port);
        let state = format!("jarvis-{}", Utc::now().timestamp_micros());
        let auth_url = build_auth_url(&secrets, &redirect_uri, &self.scopes, &state)?;

        info!(port, "Waiting for Google authorization");
        eprintln!("Open this URL to authorize calendar access:\n{}\n", auth_url);

        let code = wait_for_code(listener, &state).await?;
        self.exchange_code(&secrets, &code, &redirect_uri).await
    }

    /// Trade an authorization code for a token.
    async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthToken, AuthError> {
        let params = [
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        let resp = self.token_request(&secrets.token_uri, &params).await?;
        Ok(OAuthToken::from_response(resp, Utc::now(), None))
    }

    async fn token_request(
        &self,
        token_uri: &str,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let resp = self
            .http
            .post(token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| AuthError::AuthorizationFailed(format!("token request failed: {}", e)))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AuthError::AuthorizationFailed(e.to_string()))?;
        if !status.is_success() {
            return Err(AuthError::AuthorizationFailed(format!(
                "token error {}: {}",
                status, text
            )));
        }
        Ok(serde_json::from_str(&text)?)
    }
}
