//! Built-in tools for the vault, Notion, the calendar and knowledge files.

pub mod calendar;
pub mod file;
pub mod notion;
pub mod vault;

pub use calendar::{CalendarApi, CalendarTool};
pub use file::KnowledgeFileTool;
pub use notion::{NotionApi, NotionClient, NotionTool};
pub use vault::VaultTool;
