//! Obsidian vault tool: lists or full-text searches Markdown notes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::tools::tool::{Tool, ToolOutput};

/// Only files with this extension are treated as notes.
pub const NOTE_EXTENSION: &str = "md";

/// Characters of each matching note included in the context.
pub const EXCERPT_CHARS: usize = 500;

/// Single words dropped from a query before searching.
const STOP_WORDS: &[&str] = &[
    "obsidian", "vault", "my", "notes", "in", "about", "what", "are", "is", "a", "an", "the",
];

/// Word pairs dropped only when they appear together.
const STOP_PHRASES: &[[&str; 2]] = &[
    ["remember", "about"],
    ["research", "on"],
    ["anything", "about"],
    ["search", "for"],
];

/// Derive search terms from a command: lower-case, split on whitespace, trim
/// punctuation from word edges, then drop stop phrases and stop words.
pub fn search_terms(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let words: Vec<&str> = lower
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .collect();

    let mut terms = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        if let Some(pair) = words.get(i..i + 2)
            && STOP_PHRASES.iter().any(|phrase| phrase[..] == *pair)
        {
            i += 2;
            continue;
        }
        if !STOP_WORDS.contains(&words[i]) {
            terms.push(words[i].to_string());
        }
        i += 1;
    }
    terms
}

/// A note found in the vault.
#[derive(Debug, Clone)]
struct NoteFile {
    path: PathBuf,
    name: String,
}

/// Every note under `root`, sorted by path. Unreadable entries are skipped.
fn walk_notes(root: &Path) -> Vec<NoteFile> {
    let mut notes: Vec<NoteFile> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable vault entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry.path().extension().and_then(|e| e.to_str()) == Some(NOTE_EXTENSION)
        })
        .map(|entry| NoteFile {
            name: entry.file_name().to_string_lossy().to_string(),
            path: entry.into_path(),
        })
        .collect();
    notes.sort_by(|a, b| a.path.cmp(&b.path));
    notes
}

fn list_notes(root: &Path) -> ToolOutput {
    let notes = walk_notes(root);
    if notes.is_empty() {
        return ToolOutput::NotFound(
            "Context from Obsidian: Your vault appears to be empty.".to_string(),
        );
    }
    let mut out = String::from("Context from Obsidian Vault (File List):\n");
    for note in &notes {
        out.push_str(&format!("- {}\n", note.name));
    }
    ToolOutput::Context(out)
}

fn search_notes(root: &Path, terms: &[String]) -> ToolOutput {
    let mut out = format!(
        "Context from Obsidian Notes containing '{}':\n",
        terms.join(" ")
    );
    let mut matches = 0usize;

    for note in walk_notes(root) {
        let content = match std::fs::read_to_string(&note.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %note.path.display(), error = %e, "Skipping unreadable note");
                continue;
            }
        };
        let lower = content.to_lowercase();
        if terms.iter().all(|term| lower.contains(term.as_str())) {
            let excerpt: String = content.chars().take(EXCERPT_CHARS).collect();
            out.push_str(&format!(
                "\n--- Start of note: {} ---\n{}...\n",
                note.name, excerpt
            ));
            matches += 1;
        }
    }

    if matches == 0 {
        return ToolOutput::NotFound(format!(
            "Context from Obsidian: I couldn't find any notes containing the terms: {}.",
            terms.join(", ")
        ));
    }
    ToolOutput::Context(out)
}

/// Searches the configured vault, or lists it when the query has no terms.
#[derive(Debug, Default)]
pub struct VaultTool {
    root: Option<PathBuf>,
}

impl VaultTool {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for VaultTool {
    fn name(&self) -> &str {
        "obsidian_vault"
    }

    fn description(&self) -> &str {
        "Lists the notes in the Obsidian vault, or returns excerpts of notes containing every search term."
    }

    async fn execute(&self, command: &str) -> ToolOutput {
        let Some(root) = self.root.clone() else {
            return ToolOutput::Unconfigured(
                "Context from Obsidian: OBSIDIAN_VAULT_PATH is not set in your .env file."
                    .to_string(),
            );
        };
        let terms = search_terms(command);
        info!(vault = %root.display(), terms = ?terms, "Searching Obsidian vault");

        let result = tokio::task::spawn_blocking(move || {
            if terms.is_empty() {
                list_notes(&root)
            } else {
                search_notes(&root, &terms)
            }
        })
        .await;

        result.unwrap_or_else(|e| {
            ToolOutput::ExternalError(format!(
                "An unexpected error occurred in Obsidian tool: {}",
                e
            ))
        })
    }
}
