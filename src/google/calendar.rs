//! Google Calendar v3 REST client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ToolError;
use crate::google::oauth::GoogleAuth;
use crate::tools::builtin::calendar::{CalendarApi, CalendarEvent, CalendarInfo, TimeWindow};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";

#[derive(Debug, Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

pub struct GoogleCalendarClient {
    http: reqwest::Client,
    auth: Arc<GoogleAuth>,
    base: Url,
}

impl GoogleCalendarClient {
    pub fn new(auth: Arc<GoogleAuth>) -> Result<Self, ToolError> {
        let base = Url::parse(CALENDAR_API_BASE)
            .map_err(|e| ToolError::InvalidResponse(format!("bad calendar base url: {}", e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            auth,
            base,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ToolError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ToolError::InvalidResponse("calendar base url cannot have a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, ToolError> {
        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(ToolError::Api {
                service: "Google Calendar".to_string(),
                status: status.as_u16(),
                body: message,
            });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, ToolError> {
        let url = self.url(&["users", "me", "calendarList"])?;
        let list: ItemList<CalendarInfo> = self.get(url, &[]).await?;
        Ok(list.items)
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
        max_results: usize,
    ) -> Result<Vec<CalendarEvent>, ToolError> {
        let url = self.url(&["calendars", calendar_id, "events"])?;
        let query = [
            ("timeMin", window.start.to_rfc3339()),
            ("timeMax", window.end.to_rfc3339()),
            ("maxResults", max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        let list: ItemList<CalendarEvent> = self.get(url, &query).await?;
        Ok(list.items)
    }
}
