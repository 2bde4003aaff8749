//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::message::{AssistantContent, Message};

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role,
};

/// A role-tagged conversation split the way rig wants it: a preamble, the
/// prior turns, and the final prompt.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Conversation {
    pub preamble: Option<String>,
    pub history: Vec<ChatMessage>,
    pub prompt: String,
}

/// Split messages into preamble, history and prompt.
///
/// Leading system messages become the preamble. A system message after the
/// first turn is sent as a user turn. The last message must come from the user.
pub(crate) fn split_conversation(
    provider: &str,
    messages: Vec<ChatMessage>,
) -> Result<Conversation, LlmError> {
    let mut messages = messages.into_iter().peekable();

    let mut system = Vec::new();
    while let Some(message) = messages.next_if(|m| m.role == Role::System) {
        system.push(message.content);
    }
    let preamble = (!system.is_empty()).then(|| system.join("\n\n"));

    let mut history: Vec<ChatMessage> = messages
        .map(|m| match m.role {
            Role::System => ChatMessage::user(m.content),
            _ => m,
        })
        .collect();

    match history.pop() {
        Some(last) if last.role == Role::User => Ok(Conversation {
            preamble,
            history,
            prompt: last.content,
        }),
        _ => Err(LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: "conversation must end with a user message".to_string(),
        }),
    }
}

fn to_rig_message(message: ChatMessage) -> Message {
    match message.role {
        Role::Assistant => Message::assistant(message.content),
        Role::User | Role::System => Message::user(message.content),
    }
}

/// Adapter from a rig completion model to [`LlmProvider`].
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let conversation = split_conversation(&self.model_name, request.messages)?;
        let history: Vec<Message> = conversation
            .history
            .into_iter()
            .map(to_rig_message)
            .collect();

        let mut builder = self
            .model
            .completion_request(Message::user(conversation.prompt))
            .messages(history);
        if let Some(preamble) = conversation.preamble {
            builder = builder.preamble(preamble);
        }

        let response = self
            .model
            .completion(builder.build())
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: self.model_name.clone(),
                reason: e.to_string(),
            })?;

        let content = response
            .choice
            .iter()
            .find_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.clone()),
                _ => None,
            })
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: self.model_name.clone(),
                reason: "response contained no text".to_string(),
            })?;

        Ok(CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        })
    }
}
