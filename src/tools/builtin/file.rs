//! Knowledge file tool: `read <filename>` returns a file from the knowledge folder.
//!
//! Filenames are limited to word characters, dots and hyphens, so a command
//! can never name a path with separators in it.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::fs;

use crate::tools::tool::{Tool, ToolOutput};

/// Maximum file size for reading (1MB).
const MAX_READ_SIZE: u64 = 1024 * 1024;

static READ_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bread\s+([\w.\-]+)").expect("read pattern is valid"));

/// Extract the filename from a `read <filename>` command.
pub fn requested_filename(command: &str) -> Option<&str> {
    READ_PATTERN
        .captures(command)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| !name.chars().all(|c| c == '.'))
}

/// Reads one file by exact name from a fixed directory.
#[derive(Debug)]
pub struct KnowledgeFileTool {
    base_dir: PathBuf,
}

impl KnowledgeFileTool {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }
}

#[async_trait]
impl Tool for KnowledgeFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads a single file from the local knowledge folder by exact name."
    }

    async fn execute(&self, command: &str) -> ToolOutput {
        let Some(filename) = requested_filename(command) else {
            return ToolOutput::NotFound(
                "Jarvis: I see 'read', but couldn't find a filename.".to_string(),
            );
        };
        let path = self.base_dir.join(filename);
        tracing::info!(path = %path.display(), "Reading knowledge file");

        let not_found = || {
            ToolOutput::NotFound(format!(
                "Jarvis: Error - I could not find '{}' in the knowledge folder.",
                filename
            ))
        };

        match fs::metadata(&path).await {
            Ok(metadata) if metadata.len() > MAX_READ_SIZE => {
                return ToolOutput::ExternalError(format!(
                    "Jarvis: Error - '{}' is too large ({} bytes, maximum is {} bytes).",
                    filename,
                    metadata.len(),
                    MAX_READ_SIZE
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return not_found(),
            Err(e) => {
                return ToolOutput::ExternalError(format!(
                    "Jarvis: Error - could not read '{}': {}",
                    filename, e
                ));
            }
        }

        match fs::read_to_string(&path).await {
            Ok(content) => ToolOutput::Context(format!(
                "Context from file '{}':\n---\n{}\n---\n",
                filename, content
            )),
            Err(e) if e.kind() == ErrorKind::NotFound => not_found(),
            Err(e) => ToolOutput::ExternalError(format!(
                "Jarvis: Error - could not read '{}': {}",
                filename, e
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn filename_allows_word_chars_dots_and_hyphens() {
        assert_eq!(requested_filename("read notes.txt"), Some("notes.txt"));
        assert_eq!(requested_filename("read   my-file_v2.md"), Some("my-file_v2.md"));
        assert_eq!(requested_filename("READ Plan.MD please"), Some("Plan.MD"));
    }

    #[test]
    fn filename_stops_at_separators() {
        assert_eq!(requested_filename("read ../etc/passwd"), None);
        assert_eq!(requested_filename("read notes/secret.txt"), Some("notes"));
        assert_eq!(requested_filename("read .."), None);
        assert_eq!(requested_filename("read"), None);
    }

    #[tokio::test]
    async fn reads_existing_file_with_delimiters() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "line one\nline two").unwrap();

        let tool = KnowledgeFileTool::new(dir.path().to_path_buf());
        let output = tool.execute("read notes.txt").await;
        assert_eq!(
            output,
            ToolOutput::Context(
                "Context from file 'notes.txt':\n---\nline one\nline two\n---\n".to_string()
            )
        );
    }

    #[tokio::test]
    async fn missing_file_is_not_found_sentinel() {
        let dir = TempDir::new().unwrap();
        let tool = KnowledgeFileTool::new(dir.path().to_path_buf());
        let output = tool.execute("read missing.txt").await;
        assert_eq!(
            output,
            ToolOutput::NotFound(
                "Jarvis: Error - I could not find 'missing.txt' in the knowledge folder."
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn missing_filename_is_reported() {
        let dir = TempDir::new().unwrap();
        let tool = KnowledgeFileTool::new(dir.path().to_path_buf());
        let output = tool.execute("read ").await;
        assert!(matches!(output, ToolOutput::NotFound(_)));
        assert!(output.text().contains("couldn't find a filename"));
    }

    #[tokio::test]
    async fn directory_is_an_error_not_a_panic() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("folder")).unwrap();
        let tool = KnowledgeFileTool::new(dir.path().to_path_buf());
        let output = tool.execute("read folder").await;
        assert!(matches!(output, ToolOutput::ExternalError(_)));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let big = vec![b'a'; (MAX_READ_SIZE + 1) as usize];
        std::fs::write(dir.path().join("big.txt"), big).unwrap();
        let tool = KnowledgeFileTool::new(dir.path().to_path_buf());
        let output = tool.execute("read big.txt").await;
        assert!(matches!(output, ToolOutput::ExternalError(_)));
        assert!(output.text().contains("too large"));
    }
}
