//! Keyword router: picks at most one tool for a command.
//!
//! Routes are checked top to bottom and the first match wins, so a command
//! that mentions both "summary" and "calendar" goes to the snapshot. Adding a
//! tool means adding a row to [`ROUTES`].

use tracing::debug;

/// Where a command is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Snapshot,
    Vault,
    Notion,
    Calendar,
    ReadFile,
}

impl Route {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Vault => "vault",
            Self::Notion => "notion",
            Self::Calendar => "calendar",
            Self::ReadFile => "read_file",
        }
    }
}

pub const SNAPSHOT_KEYWORDS: &[&str] = &["snapshot", "summary", "daily brief", "what's up"];

pub const VAULT_KEYWORDS: &[&str] = &["obsidian", "vault", "my notes", "remember", "research on"];

pub const NOTION_KEYWORDS: &[&str] = &["notion", "assignments", "tasks", "dashboard", "email"];

pub const CALENDAR_KEYWORDS: &[&str] = &[
    "calendar",
    "schedule",
    "meeting",
    "event",
    "priorities",
    "busy",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "today",
    "tomorrow",
    "week",
    "year",
];

/// Prefix that turns a command into a knowledge-file read.
pub const READ_PREFIX: &str = "read ";

/// How a route decides whether it applies to a lower-cased command.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Any keyword appears anywhere in the command.
    AnyKeyword(&'static [&'static str]),
    /// The command starts with the prefix.
    Prefix(&'static str),
}

impl Matcher {
    pub fn matches(&self, command: &str) -> bool {
        match self {
            Self::AnyKeyword(keywords) => keywords.iter().any(|k| command.contains(k)),
            Self::Prefix(prefix) => command.starts_with(prefix),
        }
    }
}

/// The dispatch table, in priority order.
pub const ROUTES: &[(Matcher, Route)] = &[
    (Matcher::AnyKeyword(SNAPSHOT_KEYWORDS), Route::Snapshot),
    (Matcher::AnyKeyword(VAULT_KEYWORDS), Route::Vault),
    (Matcher::AnyKeyword(NOTION_KEYWORDS), Route::Notion),
    (Matcher::AnyKeyword(CALENDAR_KEYWORDS), Route::Calendar),
    (Matcher::Prefix(READ_PREFIX), Route::ReadFile),
];

/// Ordered first-match router.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<(Matcher, Route)>,
}

impl Router {
    pub fn new(routes: Vec<(Matcher, Route)>) -> Self {
        Self { routes }
    }

    /// Pick the route for a command, if any. Matching is case-insensitive.
    pub fn route(&self, command: &str) -> Option<Route> {
        let command = command.to_lowercase();
        let route = self
            .routes
            .iter()
            .find(|(matcher, _)| matcher.matches(&command))
            .map(|(_, route)| *route);
        debug!(route = route.map(|r| r.label()).unwrap_or("none"), "Routed command");
        route
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(ROUTES.to_vec())
    }
}
