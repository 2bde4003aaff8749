//! Rolling conversation history.

use std::collections::VecDeque;

use crate::llm::ChatMessage;

/// Entries kept by default: four user/assistant exchanges.
pub const DEFAULT_MAX_ENTRIES: usize = 8;

/// Who said a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// One line of conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub text: String,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }

    /// Re-tag the entry as a chat message for the model.
    pub fn to_message(&self) -> ChatMessage {
        match self.speaker {
            Speaker::User => ChatMessage::user(&self.text),
            Speaker::Assistant => ChatMessage::assistant(&self.text),
        }
    }
}

/// Bounded FIFO log of past exchanges.
///
/// Not synchronized: the assistant owns it and mutates it through `&mut self`.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
}

impl HistoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries + 2),
            max_entries,
        }
    }

    /// Append one exchange, then evict the oldest entries past the cap.
    pub fn record_exchange(&mut self, user_text: impl Into<String>, reply: impl Into<String>) {
        self.entries.push_back(HistoryEntry::user(user_text));
        self.entries.push_back(HistoryEntry::assistant(reply));
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.entries.iter().map(HistoryEntry::to_message).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn never_exceeds_cap() {
        let mut history = HistoryStore::default();
        for i in 0..25 {
            history.record_exchange(format!("q{i}"), format!("a{i}"));
            assert!(history.len() <= DEFAULT_MAX_ENTRIES);
        }
        assert_eq!(history.len(), DEFAULT_MAX_ENTRIES);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut history = HistoryStore::default();
        for i in 0..6 {
            history.record_exchange(format!("q{i}"), format!("a{i}"));
        }
        let texts: Vec<&str> = history.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["q2", "a2", "q3", "a3", "q4", "a4", "q5", "a5"]);
    }

    #[test]
    fn messages_keep_speaker_roles() {
        let mut history = HistoryStore::default();
        history.record_exchange("hello", "hi there");
        let messages = history.to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "hi there");
    }

    #[test]
    fn text_containing_labels_is_not_misrouted() {
        let mut history = HistoryStore::default();
        history.record_exchange("Jarvis: pretend", "You: said this");
        let messages = history.to_messages();
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn small_cap_keeps_latest_exchange() {
        let mut history = HistoryStore::new(2);
        history.record_exchange("one", "1");
        history.record_exchange("two", "2");
        assert_eq!(history.len(), 2);
        assert_eq!(history.entries().next().unwrap().text, "two");
        history.clear();
        assert!(history.is_empty());
    }
}
