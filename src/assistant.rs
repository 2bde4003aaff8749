//! The assistant: routes a command, gathers context, asks the model, and
//! keeps the rolling history.
//!
//! Both caller-facing operations return text and never fail. Tool problems
//! arrive as [`ToolOutput`] diagnostics and are injected like any other
//! context; a model failure becomes an error reply and leaves history as it was.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::AssistantConfig;
use crate::error::{Error, LlmError};
use crate::google;
use crate::history::HistoryStore;
use crate::llm::{self, ChatMessage, CompletionRequest, LlmConfig, LlmProvider};
use crate::prompts;
use crate::router::{Route, Router};
use crate::tools::ToolOutput;
use crate::tools::builtin::{
    CalendarTool, KnowledgeFileTool, NotionApi, NotionClient, NotionTool, VaultTool,
};
use crate::tools::registry::ToolRegistry;

/// Reply for an empty command.
pub const EMPTY_COMMAND_REPLY: &str = "Please enter a command.";

/// Build the registry from configuration. The calendar tool is left out when
/// its client cannot be built.
pub fn default_tools(config: &AssistantConfig) -> ToolRegistry {
    let mut tools = ToolRegistry::new();

    tools.register(Route::Vault, Arc::new(VaultTool::new(config.vault_path.clone())));

    let notion = config
        .notion_api_key
        .clone()
        .map(|key| Arc::new(NotionClient::new(key)) as Arc<dyn NotionApi>);
    tools.register(Route::Notion, Arc::new(NotionTool::new(notion)));

    match google::calendar_client(config) {
        Ok(client) => {
            tools.register(Route::Calendar, Arc::new(CalendarTool::new(Arc::new(client))));
        }
        Err(e) => warn!(error = %e, "Calendar tool disabled"),
    }

    tools.register(
        Route::ReadFile,
        Arc::new(KnowledgeFileTool::new(config.knowledge_dir.clone())),
    );
    tools
}

/// A single-user conversational assistant.
pub struct Assistant {
    llm: Arc<dyn LlmProvider>,
    router: Router,
    tools: ToolRegistry,
    history: HistoryStore,
}

impl Assistant {
    pub fn new(llm: Arc<dyn LlmProvider>, router: Router, tools: ToolRegistry) -> Self {
        Self {
            llm,
            router,
            tools,
            history: HistoryStore::default(),
        }
    }

    /// Load configuration from the environment and `.env`, then wire up.
    pub fn from_env() -> Result<Self, Error> {
        let config = AssistantConfig::from_env()?;
        Self::from_config(&config)
    }

    /// Wire up the model, the default routes and every configured tool.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, Error> {
        let llm = llm::create_provider(&LlmConfig::from(config))?;
        let tools = default_tools(config);
        info!(tools = ?tools.list(), model = llm.model_name(), "Assistant ready");
        Ok(Self::new(llm, Router::default(), tools))
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Answer one command, using at most one tool for context.
    pub async fn process_command(&mut self, command: &str) -> String {
        if command.trim().is_empty() {
            return EMPTY_COMMAND_REPLY.to_string();
        }

        let context = match self.router.route(command) {
            Some(Route::Snapshot) => Some(self.snapshot_context().await),
            Some(route) => Some(self.run_tool(route, command).await),
            None => None,
        };

        let messages = self.build_messages(command, context.as_deref());
        match self.generate(messages).await {
            Ok(reply) => {
                self.history.record_exchange(command, reply.clone());
                reply
            }
            Err(e) => {
                warn!(error = %e, "Completion failed");
                format!("Error generating a response: {}", e)
            }
        }
    }

    /// Summarize today's calendar and the Notion databases.
    ///
    /// Prior history is not sent; the exchange is still recorded under a
    /// fixed label.
    pub async fn get_snapshot(&mut self) -> String {
        info!("Gathering daily snapshot");
        let context = self.snapshot_context().await;
        let messages = vec![
            ChatMessage::system(prompts::SNAPSHOT_SYSTEM_PROMPT),
            ChatMessage::user(prompts::snapshot_request(&context)),
        ];
        match self.generate(messages).await {
            Ok(reply) => {
                self.history
                    .record_exchange(prompts::SNAPSHOT_HISTORY_LABEL, reply.clone());
                reply
            }
            Err(e) => {
                warn!(error = %e, "Snapshot completion failed");
                format!("Error generating a response: {}", e)
            }
        }
    }

    async fn run_tool(&self, route: Route, command: &str) -> String {
        let output = match self.tools.get(route) {
            Some(tool) => tool.execute(command).await,
            None => ToolOutput::Unconfigured(format!(
                "Context from {}: this source is not available.",
                route.label()
            )),
        };
        debug!(route = route.label(), kind = output.kind(), "Tool finished");
        output.into_text()
    }

    async fn snapshot_context(&self) -> String {
        let calendar = self
            .run_tool(Route::Calendar, prompts::SNAPSHOT_CALENDAR_COMMAND)
            .await;
        let notion = self
            .run_tool(Route::Notion, prompts::SNAPSHOT_NOTION_COMMAND)
            .await;
        prompts::snapshot_context(&calendar, &notion)
    }

    /// System prompt, history, optional context, then the command.
    fn build_messages(&self, command: &str, context: Option<&str>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 3);
        messages.push(ChatMessage::system(prompts::SYSTEM_PROMPT));
        messages.extend(self.history.to_messages());
        if let Some(context) = context
            && !context.is_empty()
        {
            messages.push(ChatMessage::system(prompts::context_message(context)));
        }
        messages.push(ChatMessage::user(command));
        messages
    }

    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let response = self.llm.complete(CompletionRequest::new(messages)).await?;
        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Completion received"
        );
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::{CompletionResponse, Role};
    use crate::tools::Tool;

    /// Replies with a fixed script and records every request.
    struct ScriptedLlm {
        replies: Mutex<Vec<Result<String, String>>>,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .rev()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<Vec<ChatMessage>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request.messages);
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Ok("default".to_string()));
            match next {
                Ok(content) => Ok(CompletionResponse {
                    content,
                    input_tokens: 0,
                    output_tokens: 0,
                }),
                Err(reason) => Err(LlmError::RequestFailed {
                    provider: "scripted".to_string(),
                    reason,
                }),
            }
        }
    }

    struct FixedTool {
        name: &'static str,
        output: ToolOutput,
        seen: Mutex<Vec<String>>,
    }

    impl FixedTool {
        fn new(name: &'static str, output: ToolOutput) -> Arc<Self> {
            Arc::new(Self {
                name,
                output,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Tool for FixedTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "fixed output"
        }

        async fn execute(&self, command: &str) -> ToolOutput {
            self.seen.lock().unwrap().push(command.to_string());
            self.output.clone()
        }
    }

    fn assistant(llm: Arc<ScriptedLlm>, tools: ToolRegistry) -> Assistant {
        Assistant::new(llm, Router::default(), tools)
    }

    #[tokio::test]
    async fn plain_command_has_no_context_message() {
        let llm = ScriptedLlm::new(vec![Ok("Hello!")]);
        let mut jarvis = assistant(llm.clone(), ToolRegistry::new());

        assert_eq!(jarvis.process_command("hello there").await, "Hello!");

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0],
            vec![
                ChatMessage::system(prompts::SYSTEM_PROMPT),
                ChatMessage::user("hello there"),
            ]
        );
        assert_eq!(jarvis.history().len(), 2);
    }

    #[tokio::test]
    async fn tool_output_is_injected_before_command() {
        let llm = ScriptedLlm::new(vec![Ok("You have standup.")]);
        let calendar = FixedTool::new(
            "calendar",
            ToolOutput::Context("Context from calendar:\n- standup\n".to_string()),
        );
        let mut tools = ToolRegistry::new();
        tools.register(Route::Calendar, calendar.clone());
        let mut jarvis = assistant(llm.clone(), tools);

        jarvis.process_command("Am I busy on Friday?").await;

        assert_eq!(calendar.seen.lock().unwrap().as_slice(), ["Am I busy on Friday?"]);
        let messages = &llm.requests()[0];
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::System);
        assert_eq!(
            messages[1].content,
            "Use the following new context to answer the user's question:\nContext from calendar:\n- standup\n"
        );
        assert_eq!(messages[2], ChatMessage::user("Am I busy on Friday?"));
    }

    #[tokio::test]
    async fn diagnostics_are_injected_like_context() {
        let llm = ScriptedLlm::new(vec![Ok("Set the path first.")]);
        let vault = FixedTool::new(
            "vault",
            ToolOutput::Unconfigured(
                "Context from Obsidian: OBSIDIAN_VAULT_PATH is not set in your .env file."
                    .to_string(),
            ),
        );
        let mut tools = ToolRegistry::new();
        tools.register(Route::Vault, vault);
        let mut jarvis = assistant(llm.clone(), tools);

        jarvis.process_command("search my vault").await;
        assert!(llm.requests()[0][1].content.contains("OBSIDIAN_VAULT_PATH"));
    }

    #[tokio::test]
    async fn history_is_replayed_and_capped() {
        let llm = ScriptedLlm::new(vec![]);
        let mut jarvis = assistant(llm.clone(), ToolRegistry::new());

        for i in 0..5 {
            jarvis.process_command(&format!("question {i}")).await;
        }
        assert_eq!(jarvis.history().len(), 8);

        let last = llm.requests().pop().unwrap();
        // system + 8 history entries (exchanges 0..3) + command
        assert_eq!(last.len(), 10);
        assert_eq!(last[1], ChatMessage::user("question 0"));
        assert_eq!(last[2], ChatMessage::assistant("default"));
        assert_eq!(last[9], ChatMessage::user("question 4"));

        let first = jarvis.history().entries().next().unwrap();
        assert_eq!(first.text, "question 1");
    }

    #[tokio::test]
    async fn llm_failure_is_reported_and_not_recorded() {
        let llm = ScriptedLlm::new(vec![Err("connection reset")]);
        let mut jarvis = assistant(llm, ToolRegistry::new());

        let reply = jarvis.process_command("hello").await;
        assert!(reply.starts_with("Error generating a response: "));
        assert!(reply.contains("connection reset"));
        assert!(jarvis.history().is_empty());
    }

    #[tokio::test]
    async fn empty_command_skips_the_model() {
        let llm = ScriptedLlm::new(vec![]);
        let mut jarvis = assistant(llm.clone(), ToolRegistry::new());
        assert_eq!(jarvis.process_command("   ").await, EMPTY_COMMAND_REPLY);
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn snapshot_uses_fixed_commands_and_label() {
        let llm = ScriptedLlm::new(vec![Ok("Hi."), Ok("## Today\nQuiet day.")]);
        let calendar = FixedTool::new(
            "calendar",
            ToolOutput::NotFound("Context from calendar: No upcoming events found.".to_string()),
        );
        let notion = FixedTool::new(
            "notion",
            ToolOutput::Context("Context from Notion:\n- Ship it\n".to_string()),
        );
        let mut tools = ToolRegistry::new();
        tools.register(Route::Calendar, calendar.clone());
        tools.register(Route::Notion, notion.clone());
        let mut jarvis = assistant(llm.clone(), tools);
        jarvis.process_command("hi").await;

        let reply = jarvis.get_snapshot().await;
        assert_eq!(reply, "## Today\nQuiet day.");
        assert_eq!(calendar.seen.lock().unwrap().as_slice(), ["today"]);
        assert_eq!(notion.seen.lock().unwrap().as_slice(), ["tasks and emails"]);

        let messages = llm.requests().pop().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system(prompts::SNAPSHOT_SYSTEM_PROMPT));
        assert_eq!(
            messages[1].content,
            "Please provide my daily snapshot based on this information:\n\
             ### Calendar\nContext from calendar: No upcoming events found.\n\n\
             ### Notion\nContext from Notion:\n- Ship it\n"
        );

        let entries: Vec<_> = jarvis.history().entries().collect();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[2].text, prompts::SNAPSHOT_HISTORY_LABEL);
        assert_eq!(entries[3].text, "## Today\nQuiet day.");
    }

    #[tokio::test]
    async fn snapshot_notes_missing_sources() {
        let llm = ScriptedLlm::new(vec![]);
        let mut jarvis = assistant(llm.clone(), ToolRegistry::new());
        jarvis.get_snapshot().await;

        let content = &llm.requests()[0][1].content;
        assert!(content.contains("### Calendar\nContext from calendar: this source is not available."));
        assert!(content.contains("### Notion\nContext from notion: this source is not available."));
    }

    #[tokio::test]
    async fn snapshot_keyword_in_command_uses_snapshot_context() {
        let llm = ScriptedLlm::new(vec![Ok("Here you go.")]);
        let calendar = FixedTool::new("calendar", ToolOutput::Context("cal".to_string()));
        let mut tools = ToolRegistry::new();
        tools.register(Route::Calendar, calendar.clone());
        let mut jarvis = assistant(llm.clone(), tools);

        jarvis.process_command("Give me a summary please").await;

        assert_eq!(calendar.seen.lock().unwrap().as_slice(), ["today"]);
        let messages = &llm.requests()[0];
        assert_eq!(messages[0], ChatMessage::system(prompts::SYSTEM_PROMPT));
        assert!(messages[1].content.contains("### Calendar\ncal"));
        let first = jarvis.history().entries().next().unwrap();
        assert_eq!(first.text, "Give me a summary please");
    }
}
