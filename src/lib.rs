//! Jarvis: a personal productivity assistant that answers commands with
//! context from notes, tasks, the calendar and local files.

pub mod assistant;
pub mod cli;
pub mod config;
pub mod error;
pub mod google;
pub mod history;
pub mod llm;
pub mod prompts;
pub mod router;
pub mod tools;

pub use assistant::Assistant;
pub use config::AssistantConfig;
