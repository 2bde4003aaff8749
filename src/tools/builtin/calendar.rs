//! Calendar tool: upcoming events from every calendar the account can see.
//!
//! The time window comes from words in the command. All windows are computed
//! in UTC.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ToolError;
use crate::tools::tool::{Tool, ToolOutput};

/// Events requested per calendar.
pub const MAX_EVENTS_PER_CALENDAR: usize = 25;

/// `[start, end)` range for the event query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn next_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + Duration::days(1);
    tomorrow.and_time(NaiveTime::MIN).and_utc()
}

impl TimeWindow {
    /// Pick the window for a command. Checked in order: `today`, `tomorrow`,
    /// `year`, `week`; anything else covers the next seven days.
    pub fn for_command(command: &str, now: DateTime<Utc>) -> Self {
        let command = command.to_lowercase();
        if command.contains("today") {
            Self {
                start: now,
                end: next_midnight(now),
            }
        } else if command.contains("tomorrow") {
            let start = next_midnight(now);
            Self {
                start,
                end: start + Duration::days(1),
            }
        } else if command.contains("year") {
            Self {
                start: now,
                end: now + Duration::days(365),
            }
        } else if command.contains("week") {
            Self {
                start: now,
                end: now + Duration::weeks(1),
            }
        } else {
            Self {
                start: now,
                end: now + Duration::days(7),
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarInfo {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Start of an event: a date-time for timed events, a date for all-day ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStart {
    #[serde(default)]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl EventStart {
    /// Instant used for ordering. All-day events count as midnight UTC.
    pub fn sort_key(&self) -> Option<DateTime<Utc>> {
        self.date_time
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| self.date.map(|d| d.and_time(NaiveTime::MIN).and_utc()))
    }

    /// `Mon, Mar 04 @ 09:00 AM`, shown in the event's own offset.
    pub fn display(&self) -> String {
        match (self.date_time, self.date) {
            (Some(dt), _) => dt.format("%a, %b %d @ %I:%M %p").to_string(),
            (None, Some(d)) => d.format("%a, %b %d (all day)").to_string(),
            (None, None) => "(no start time)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: EventStart,
}

impl CalendarEvent {
    pub fn title(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("(No title)")
    }
}

/// The calendar operations this tool needs.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, ToolError>;

    async fn list_events(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
        max_results: usize,
    ) -> Result<Vec<CalendarEvent>, ToolError>;
}

/// Combine per-calendar lists into one list ordered by start. Events without
/// a start sort last; ties keep their input order.
pub fn merge_events(batches: Vec<Vec<CalendarEvent>>) -> Vec<CalendarEvent> {
    let mut all: Vec<CalendarEvent> = batches.into_iter().flatten().collect();
    all.sort_by_key(|e| (e.start.sort_key().is_none(), e.start.sort_key()));
    all
}

pub fn format_events(events: &[CalendarEvent]) -> String {
    let mut out = String::from("Context from calendar:\n");
    for event in events {
        out.push_str(&format!("- {}: {}\n", event.start.display(), event.title()));
    }
    out
}

/// Lists upcoming events across all calendars.
pub struct CalendarTool {
    api: Arc<dyn CalendarApi>,
}

impl CalendarTool {
    pub fn new(api: Arc<dyn CalendarApi>) -> Self {
        Self { api }
    }

    async fn gather(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>, ToolError> {
        let calendars = self.api.list_calendars().await?;
        let mut batches = Vec::with_capacity(calendars.len());
        for calendar in &calendars {
            let events = self
                .api
                .list_events(&calendar.id, window, MAX_EVENTS_PER_CALENDAR)
                .await?;
            debug!(
                calendar = calendar.summary.as_deref().unwrap_or(&calendar.id),
                count = events.len(),
                "Fetched events"
            );
            batches.push(events);
        }
        Ok(merge_events(batches))
    }
}

#[async_trait]
impl Tool for CalendarTool {
    fn name(&self) -> &str {
        "calendar"
    }

    fn description(&self) -> &str {
        "Lists upcoming events from all calendars, for today, tomorrow, the week or the year."
    }

    async fn execute(&self, command: &str) -> ToolOutput {
        let window = TimeWindow::for_command(command, Utc::now());
        info!(start = %window.start, end = %window.end, "Fetching calendar events");

        match self.gather(&window).await {
            Ok(events) if events.is_empty() => ToolOutput::NotFound(
                "Context from calendar: No upcoming events found.".to_string(),
            ),
            Ok(events) => ToolOutput::Context(format_events(&events)),
            Err(e) => {
                tracing::warn!(error = %e, "Calendar lookup failed");
                ToolOutput::ExternalError(format!("Error accessing calendar: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    fn timed(summary: &str, start: &str) -> CalendarEvent {
        CalendarEvent {
            summary: Some(summary.to_string()),
            start: EventStart {
                date_time: Some(DateTime::parse_from_rfc3339(start).unwrap()),
                date: None,
            },
        }
    }

    struct MockCalendar {
        calendars: Vec<CalendarInfo>,
        events: HashMap<String, Vec<CalendarEvent>>,
        fail: bool,
        windows: Mutex<Vec<TimeWindow>>,
    }

    impl MockCalendar {
        fn new(events: Vec<(&str, Vec<CalendarEvent>)>) -> Self {
            Self {
                calendars: events
                    .iter()
                    .map(|(id, _)| CalendarInfo {
                        id: id.to_string(),
                        summary: None,
                    })
                    .collect(),
                events: events
                    .into_iter()
                    .map(|(id, ev)| (id.to_string(), ev))
                    .collect(),
                fail: false,
                windows: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CalendarApi for MockCalendar {
        async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, ToolError> {
            if self.fail {
                return Err(ToolError::InvalidResponse("boom".to_string()));
            }
            Ok(self.calendars.clone())
        }

        async fn list_events(
            &self,
            calendar_id: &str,
            window: &TimeWindow,
            _max_results: usize,
        ) -> Result<Vec<CalendarEvent>, ToolError> {
            self.windows.lock().unwrap().push(*window);
            Ok(self.events.get(calendar_id).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn window_today_ends_at_next_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 15, 30, 0).unwrap();
        let window = TimeWindow::for_command("what's on today", now);
        assert_eq!(window.start, now);
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn window_tomorrow_is_the_whole_next_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 15, 30, 0).unwrap();
        let window = TimeWindow::for_command("Meetings TOMORROW", now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap());
    }

    #[test]
    fn window_precedence_and_default() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 15, 30, 0).unwrap();
        assert_eq!(
            TimeWindow::for_command("today and tomorrow", now).end,
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
        assert_eq!(
            TimeWindow::for_command("this year", now).end,
            now + Duration::days(365)
        );
        assert_eq!(
            TimeWindow::for_command("this week", now).end,
            now + Duration::weeks(1)
        );
        assert_eq!(
            TimeWindow::for_command("am i busy", now).end,
            now + Duration::days(7)
        );
    }

    #[test]
    fn merge_orders_by_instant_not_text() {
        let merged = merge_events(vec![
            vec![
                timed("standup", "2024-03-04T09:00:00Z"),
                timed("review", "2024-03-04T14:00:00Z"),
            ],
            vec![timed("lunch", "2024-03-04T11:00:00Z")],
            vec![timed("early", "2024-03-04T10:00:00+02:00")],
        ]);
        let titles: Vec<&str> = merged.iter().map(CalendarEvent::title).collect();
        assert_eq!(titles, vec!["early", "standup", "lunch", "review"]);
    }

    #[test]
    fn all_day_and_untitled_events_format() {
        let event: CalendarEvent =
            serde_json::from_str(r#"{"start": {"date": "2024-03-04"}}"#).unwrap();
        assert_eq!(
            format_events(&[event, timed("standup", "2024-03-04T09:00:00Z")]),
            "Context from calendar:\n- Mon, Mar 04 (all day): (No title)\n- Mon, Mar 04 @ 09:00 AM: standup\n"
        );
    }

    #[tokio::test]
    async fn execute_merges_across_calendars() {
        let api = MockCalendar::new(vec![
            (
                "a",
                vec![
                    timed("standup", "2024-03-04T09:00:00Z"),
                    timed("review", "2024-03-04T14:00:00Z"),
                ],
            ),
            ("b", vec![timed("lunch", "2024-03-04T11:00:00Z")]),
        ]);
        let tool = CalendarTool::new(Arc::new(api));
        let output = tool.execute("my schedule").await;
        assert_eq!(
            output,
            ToolOutput::Context(
                "Context from calendar:\n\
                 - Mon, Mar 04 @ 09:00 AM: standup\n\
                 - Mon, Mar 04 @ 11:00 AM: lunch\n\
                 - Mon, Mar 04 @ 02:00 PM: review\n"
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn no_events_is_not_found() {
        let api = Arc::new(MockCalendar::new(vec![("a", vec![])]));
        let tool = CalendarTool::new(api.clone());
        let output = tool.execute("today").await;
        assert_eq!(
            output,
            ToolOutput::NotFound("Context from calendar: No upcoming events found.".to_string())
        );
        assert_eq!(api.windows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failure_is_external_error() {
        let mut api = MockCalendar::new(vec![]);
        api.fail = true;
        let tool = CalendarTool::new(Arc::new(api));
        let output = tool.execute("calendar").await;
        assert!(matches!(output, ToolOutput::ExternalError(_)));
        assert!(output.text().starts_with("Error accessing calendar: "));
    }
}
