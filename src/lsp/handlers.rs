use std::time::Instant;

use tower_lsp::jsonrpc::{Error as LspError, Result as LspResult};
use tower_lsp::lsp_types::*;

use crate::caser::CaseMode;
use crate::config::Settings;
use crate::error::FixError;
use crate::fixer::{ExternalFixer, check_applicability};
use crate::lsp::backend::Backend;

/// Command id of the demonstrative greeting action
pub const GREETING_COMMAND: &str = "abapFormat.greeting";

/// Trait for handling whole-document formatting (keyword caser path)
#[tower_lsp::async_trait]
pub trait HandleFormatting {
    async fn handle_formatting(
        &self,
        params: DocumentFormattingParams,
    ) -> LspResult<Option<Vec<TextEdit>>>;
}

/// Trait for handling range formatting (external-fix bridge path)
#[tower_lsp::async_trait]
pub trait HandleRangeFormatting {
    async fn handle_range_formatting(
        &self,
        params: DocumentRangeFormattingParams,
    ) -> LspResult<Option<Vec<TextEdit>>>;
}

/// Trait for handling workspace commands
#[tower_lsp::async_trait]
pub trait HandleExecuteCommand {
    async fn handle_execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> LspResult<Option<serde_json::Value>>;
}

#[tower_lsp::async_trait]
impl HandleFormatting for Backend {
    async fn handle_formatting(
        &self,
        params: DocumentFormattingParams,
    ) -> LspResult<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;

        let docs = self.documents.lock().await;
        let doc_state = match docs.get(&uri) {
            Some(state) => state,
            None => return Ok(None),
        };

        let settings = self.settings.read().await.clone();
        let mode = if settings.keywords_to_lower_case {
            CaseMode::Lower
        } else {
            CaseMode::Upper
        };

        let started = Instant::now();
        let edits: Vec<TextEdit> = self
            .caser
            .edits(&doc_state.content, mode)
            .into_iter()
            .map(|r| TextEdit {
                range: Range::new(
                    Position::new(r.line, r.start),
                    Position::new(r.line, r.end),
                ),
                new_text: r.text,
            })
            .collect();
        log::debug!(
            "Keyword casing produced {} edit(s) in {:?}",
            edits.len(),
            started.elapsed()
        );

        if settings.notifications {
            self.client
                .show_message(
                    MessageType::INFO,
                    format!("Normalized {} keyword occurrence(s)", edits.len()),
                )
                .await;
        }

        Ok(Some(edits))
    }
}

#[tower_lsp::async_trait]
impl HandleRangeFormatting for Backend {
    async fn handle_range_formatting(
        &self,
        params: DocumentRangeFormattingParams,
    ) -> LspResult<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;

        // Snapshot everything needed from the document map so the lock is
        // not held across the child process.
        let (content, language_id) = {
            let docs = self.documents.lock().await;
            match docs.get(&uri) {
                Some(state) => (state.content.clone(), state.language_id.clone()),
                None => return Ok(None),
            }
        };
        let settings = self.settings.read().await.clone();

        // Applicability check comes first: no temp file, no process for
        // documents the fixer does not understand.
        if let Err(e) = check_applicability(&language_id, &settings.additional_extensions) {
            return Err(self.fail(&settings, e).await);
        }

        let (selected, edit_range) = select_content(&content, &params.range);

        let fixer = ExternalFixer::from_settings(&settings);
        let fixed = match fixer.fix(&selected).await {
            Ok(fixed) => fixed,
            Err(e) => return Err(self.fail(&settings, e).await),
        };

        log::debug!("Fixer rewrote {} line(s)", line_span(&edit_range));

        Ok(Some(vec![TextEdit {
            range: edit_range,
            new_text: fixed,
        }]))
    }
}

#[tower_lsp::async_trait]
impl HandleExecuteCommand for Backend {
    async fn handle_execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> LspResult<Option<serde_json::Value>> {
        match params.command.as_str() {
            GREETING_COMMAND => {
                self.client
                    .show_message(MessageType::INFO, "Hello from abap-format-server!")
                    .await;
                Ok(None)
            }
            other => Err(LspError::invalid_params(format!(
                "Unknown command: {other}"
            ))),
        }
    }
}

impl Backend {
    /// Log a bridge failure, optionally notify the user, and convert it into
    /// a JSON-RPC error. No edits are produced on any failure.
    async fn fail(&self, settings: &Settings, error: FixError) -> LspError {
        let message = error.to_string();
        log::warn!("Range formatting failed: {message}");
        if settings.notifications {
            self.client
                .show_message(MessageType::WARNING, message.clone())
                .await;
        }

        match error {
            FixError::UnsupportedLanguage(_) => LspError::invalid_params(message),
            _ => {
                let mut e = LspError::internal_error();
                e.message = message.into();
                e
            }
        }
    }
}

/// Pick what the fixer sees: an empty selection (start == end) falls back to
/// the whole document, together with the range one replacement edit covers.
pub fn select_content(content: &str, range: &Range) -> (String, Range) {
    if range.start == range.end {
        (content.to_string(), full_document_range(content))
    } else {
        (slice_range(content, range), *range)
    }
}

/// Number of lines a range touches; tolerates reversed ranges from
/// misbehaving clients.
fn line_span(range: &Range) -> u32 {
    range.end.line.saturating_sub(range.start.line) + 1
}

/// Range covering the entire document, end position inclusive of the last
/// line's final character. Positions are UTF-16 code units, the LSP default
/// position encoding.
pub fn full_document_range(text: &str) -> Range {
    let mut last_line = 0u32;
    let mut last_char = 0u32;
    for (idx, line) in text.split('\n').enumerate() {
        last_line = idx as u32;
        last_char = line.encode_utf16().count() as u32;
    }
    Range::new(Position::new(0, 0), Position::new(last_line, last_char))
}

/// Extract the text covered by `range`, with positions in UTF-16 code units.
/// A position splitting a surrogate pair degrades to the replacement
/// character rather than panicking.
pub fn slice_range(text: &str, range: &Range) -> String {
    let mut out = String::new();
    for (idx, line) in text.split('\n').enumerate() {
        let idx = idx as u32;
        if idx < range.start.line {
            continue;
        }
        if idx > range.end.line {
            break;
        }

        let units: Vec<u16> = line.encode_utf16().collect();
        let start = if idx == range.start.line {
            range.start.character as usize
        } else {
            0
        };
        let end = if idx == range.end.line {
            range.end.character as usize
        } else {
            units.len()
        };
        let end = end.min(units.len());
        let start = start.min(end);

        if idx > range.start.line {
            out.push('\n');
        }
        out.push_str(&String::from_utf16_lossy(&units[start..end]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_document_range_single_line() {
        let range = full_document_range("select * from foo");
        assert_eq!(range.start, Position::new(0, 0));
        assert_eq!(range.end, Position::new(0, 17));
    }

    #[test]
    fn test_full_document_range_trailing_newline() {
        let range = full_document_range("a = 1.\n");
        assert_eq!(range.end, Position::new(1, 0));
    }

    #[test]
    fn test_slice_range_within_one_line() {
        let range = Range::new(Position::new(0, 7), Position::new(0, 13));
        assert_eq!(slice_range("write 'hello'.", &range), "'hello");
    }

    #[test]
    fn test_slice_range_multiline() {
        let text = "form f.\n  x = 1.\nendform.";
        let range = Range::new(Position::new(1, 2), Position::new(2, 8));
        assert_eq!(slice_range(text, &range), "x = 1.\nendform.");
    }

    #[test]
    fn test_slice_range_whole_document_matches_full_range() {
        let text = "form f.\n  x = 1.\nendform.";
        let range = full_document_range(text);
        assert_eq!(slice_range(text, &range), text);
    }

    #[test]
    fn test_empty_range_selects_whole_document() {
        let text = "form f.\n  x = 1.\nendform.";
        let cursor = Range::new(Position::new(1, 3), Position::new(1, 3));

        let (selected, edit_range) = select_content(text, &cursor);
        assert_eq!(selected, text);
        assert_eq!(edit_range, full_document_range(text));
    }

    #[test]
    fn test_nonempty_range_selects_only_the_slice() {
        let text = "form f.\n  x = 1.\nendform.";
        let range = Range::new(Position::new(1, 2), Position::new(1, 8));

        let (selected, edit_range) = select_content(text, &range);
        assert_eq!(selected, "x = 1.");
        assert_eq!(edit_range, range);
    }

    #[test]
    fn test_line_span_tolerates_reversed_range() {
        let reversed = Range::new(Position::new(5, 0), Position::new(2, 0));
        assert_eq!(line_span(&reversed), 1);
    }

    #[test]
    fn test_full_document_range_counts_utf16_units() {
        // The emoji is two UTF-16 code units
        let range = full_document_range("x = '🙂'.");
        assert_eq!(range.end, Position::new(0, 9));
    }

    #[test]
    fn test_slice_range_utf16_offsets() {
        let range = Range::new(Position::new(0, 0), Position::new(0, 7));
        assert_eq!(slice_range("x = '🙂' + y", &range), "x = '🙂");
    }
}
