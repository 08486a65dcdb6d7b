//! Failure taxonomy for the external-fix bridge.

use thiserror::Error;

/// Errors produced while bridging a document through the external fixer.
#[derive(Debug, Error)]
pub enum FixError {
    /// The document's language id is neither `abap` nor listed in
    /// `additional_extensions`. Raised before any temp file or process exists.
    #[error("'{0}' is neither an abap document nor listed in additional_extensions")]
    UnsupportedLanguage(String),

    /// Temp-file write or read-back failed.
    #[error("temp file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The fixer binary could not be spawned at all.
    #[error("failed to spawn fixer command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The fixer ran but exited non-zero.
    #[error("fixer exited with status {code:?}: {stderr}")]
    FixerFailed { code: Option<i32>, stderr: String },

    /// The fixer did not finish within the configured timeout.
    #[error("fixer did not finish within {0} seconds")]
    TimedOut(u64),
}
