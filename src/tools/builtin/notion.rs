//! Notion tool: lists the items of every database shared with the integration.
//!
//! Databases whose title mentions "emails" are treated as an inbox and only
//! the most recent subjects are listed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::ToolError;
use crate::tools::tool::{Tool, ToolOutput};

const NOTION_API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Page size Notion accepts at most.
const MAX_PAGE_SIZE: usize = 100;

/// Databases whose title contains this are listed as email subjects.
pub const EMAIL_DATABASE_MARKER: &str = "emails";

/// Entries fetched from an email database.
pub const RECENT_EMAIL_LIMIT: usize = 5;

/// A rich-text fragment; only the plain text is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

/// A database visible to the integration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotionDatabase {
    pub id: String,
    #[serde(default)]
    pub title: Vec<RichText>,
}

impl NotionDatabase {
    pub fn display_title(&self) -> &str {
        self.title
            .first()
            .map(|t| t.plain_text.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled Database")
    }

    pub fn is_email_database(&self) -> bool {
        self.display_title()
            .to_lowercase()
            .contains(EMAIL_DATABASE_MARKER)
    }
}

/// A database row. Properties are kept as raw JSON; only `title` ones are read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotionPage {
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl NotionPage {
    /// Plain text of the page's title property, if it has a non-empty one.
    pub fn title(&self) -> Option<&str> {
        let prop = self
            .properties
            .values()
            .find(|p| p.get("type").and_then(Value::as_str) == Some("title"))?;
        prop.get("title")?
            .as_array()?
            .first()?
            .get("plain_text")?
            .as_str()
    }
}

#[derive(Debug, Deserialize)]
struct Paginated<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

/// The two Notion calls this tool needs.
#[async_trait]
pub trait NotionApi: Send + Sync {
    /// Every database shared with the integration.
    async fn search_databases(&self) -> Result<Vec<NotionDatabase>, ToolError>;

    /// Rows of a database. `limit` caps the count; `None` follows every cursor.
    async fn query_database(
        &self,
        database_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<NotionPage>, ToolError>;
}

/// HTTP client for the Notion REST API.
pub struct NotionClient {
    client: reqwest::Client,
    api_key: SecretString,
}

impl NotionClient {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    async fn post<T>(&self, path: &str, body: &Value) -> Result<Paginated<T>, ToolError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let resp = self
            .client
            .post(format!("{}{}", NOTION_API_BASE, path))
            .bearer_auth(self.api_key.expose_secret())
            .header("Notion-Version", NOTION_VERSION)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            return Err(ToolError::Api {
                service: "Notion".to_string(),
                status: status.as_u16(),
                body: message,
            });
        }
        Ok(resp.json().await?)
    }

    /// Collect results across cursors until `limit` is reached or Notion runs out.
    async fn fetch_all<T>(
        &self,
        path: &str,
        base: Value,
        limit: Option<usize>,
    ) -> Result<Vec<T>, ToolError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let remaining = limit.map(|l| l.saturating_sub(results.len()));
            let page_size = remaining.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE);
            let mut body = base.clone();
            body["page_size"] = json!(page_size);
            if let Some(ref c) = cursor {
                body["start_cursor"] = json!(c);
            }

            let page: Paginated<T> = self.post(path, &body).await?;
            results.extend(page.results);

            if let Some(l) = limit
                && results.len() >= l
            {
                results.truncate(l);
                break;
            }
            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }
        Ok(results)
    }
}

#[async_trait]
impl NotionApi for NotionClient {
    async fn search_databases(&self) -> Result<Vec<NotionDatabase>, ToolError> {
        self.fetch_all(
            "/search",
            json!({ "filter": { "value": "database", "property": "object" } }),
            None,
        )
        .await
    }

    async fn query_database(
        &self,
        database_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<NotionPage>, ToolError> {
        self.fetch_all(&format!("/databases/{}/query", database_id), json!({}), limit)
            .await
    }
}

/// Lists database items (or recent email subjects) from Notion.
pub struct NotionTool {
    api: Option<Arc<dyn NotionApi>>,
}

impl NotionTool {
    /// `None` means no integration key is configured.
    pub fn new(api: Option<Arc<dyn NotionApi>>) -> Self {
        Self { api }
    }

    async fn gather(&self, api: &dyn NotionApi) -> Result<ToolOutput, ToolError> {
        let databases = api.search_databases().await?;
        if databases.is_empty() {
            return Ok(ToolOutput::NotFound(
                "Context from Notion: No databases are shared with the Jarvis integration."
                    .to_string(),
            ));
        }

        let mut out = String::from("Context from Notion:\n");
        for db in &databases {
            let title = db.display_title();
            if db.is_email_database() {
                out.push_str(&format!("\n--- Recent Emails from '{}' ---\n", title));
                let pages = api.query_database(&db.id, Some(RECENT_EMAIL_LIMIT)).await?;
                for subject in pages.iter().filter_map(NotionPage::title) {
                    out.push_str(&format!("- Subject: {}\n", subject));
                }
            } else {
                out.push_str(&format!("\n--- Items from '{}' ---\n", title));
                let pages = api.query_database(&db.id, None).await?;
                for item in pages.iter().filter_map(NotionPage::title) {
                    out.push_str(&format!("- {}\n", item));
                }
            }
        }
        Ok(ToolOutput::Context(out))
    }
}

#[async_trait]
impl Tool for NotionTool {
    fn name(&self) -> &str {
        "notion"
    }

    fn description(&self) -> &str {
        "Lists items from every Notion database shared with the integration, and recent email subjects."
    }

    /// The command is not used for filtering; every call performs the same lookup.
    async fn execute(&self, _command: &str) -> ToolOutput {
        let Some(api) = self.api.as_deref() else {
            return ToolOutput::Unconfigured(
                "Context from Notion: Notion API key is not configured.".to_string(),
            );
        };
        info!("Querying Notion databases");
        match self.gather(api).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "Notion lookup failed");
                ToolOutput::ExternalError(format!("Error accessing Notion: {}", e))
            }
        }
    }
}
