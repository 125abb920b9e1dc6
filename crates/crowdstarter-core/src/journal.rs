//! JSONL transaction journals: one tagged [`Transaction`] per line.

use std::path::Path;

use crate::error::CoreError;
use crate::tx::Transaction;

/// Parse journal content, skipping blank lines. Line numbers in errors are
/// 1-based.
pub fn parse_journal(content: &str) -> Result<Vec<(usize, Transaction)>, CoreError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line.trim())
                .map(|tx| (idx + 1, tx))
                .map_err(|e| CoreError::JournalParse {
                    line: idx + 1,
                    message: e.to_string(),
                })
        })
        .collect()
}

pub async fn load_journal(path: &Path) -> Result<Vec<(usize, Transaction)>, CoreError> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_journal(&content)
}
