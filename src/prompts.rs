//! Fixed prompt text sent to the model.

/// System instruction for ordinary commands.
pub const SYSTEM_PROMPT: &str = "You are Jarvis, a helpful and concise AI productivity assistant. \
Analyze the provided context and conversation history to answer the user's question directly and insightfully.";

/// System instruction for the daily snapshot.
pub const SNAPSHOT_SYSTEM_PROMPT: &str = "You are Jarvis. Analyze the provided context from the user's tools \
and generate a concise, well-formatted daily snapshot. Use headings for each section \
(e.g., Calendar, Notion Tasks). If a section has no information, state that clearly.";

/// Leads the user message of a snapshot request.
pub const SNAPSHOT_REQUEST: &str = "Please provide my daily snapshot based on this information:";

/// What the history records as the user's side of a snapshot.
pub const SNAPSHOT_HISTORY_LABEL: &str = "(Requested Daily Snapshot)";

/// Command the calendar tool sees when building a snapshot.
pub const SNAPSHOT_CALENDAR_COMMAND: &str = "today";

/// Command the Notion tool sees when building a snapshot.
pub const SNAPSHOT_NOTION_COMMAND: &str = "tasks and emails";

/// Wrap tool output as the system message injected before the command.
pub fn context_message(context: &str) -> String {
    format!(
        "Use the following new context to answer the user's question:\n{}",
        context
    )
}

/// Join the two snapshot sources under their own headings.
pub fn snapshot_context(calendar: &str, notion: &str) -> String {
    format!("### Calendar\n{}\n\n### Notion\n{}", calendar, notion)
}

pub fn snapshot_request(context: &str) -> String {
    format!("{}\n{}", SNAPSHOT_REQUEST, context)
}
