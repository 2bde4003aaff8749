//! Tool registry keyed by route.

use std::collections::HashMap;
use std::sync::Arc;

use crate::router::Route;
use crate::tools::tool::Tool;

/// Registry of the adapters the router can dispatch to.
pub struct ToolRegistry {
    tools: HashMap<Route, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool for a route. A later registration replaces an earlier one.
    pub fn register(&mut self, route: Route, tool: Arc<dyn Tool>) {
        tracing::debug!(route = route.label(), tool = tool.name(), "Registered tool");
        if self.tools.insert(route, tool).is_some() {
            tracing::warn!(route = route.label(), "Replaced existing tool registration");
        }
    }

    /// Get the tool for a route.
    pub fn get(&self, route: Route) -> Option<Arc<dyn Tool>> {
        self.tools.get(&route).cloned()
    }

    /// Check if a route has a tool.
    pub fn has(&self, route: Route) -> bool {
        self.tools.contains_key(&route)
    }

    /// List registered tool names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.values().map(|t| t.name().to_string()).collect();
        names.sort();
        names
    }

    /// Get the number of registered tools.
    pub fn count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
