//! ABAP Format Server
//!
//! A Language Server Protocol implementation that formats ABAP source.
//!
//! This library provides:
//! - Keyword case normalization (whole-document formatting)
//! - A bridge to an external command-line fixer (range formatting)
//! - LSP protocol implementation
//! - Configuration management

pub mod caser;
pub mod config;
pub mod error;
pub mod fixer;
pub mod keywords;
pub mod lsp;

// Re-exports for clean public API
pub use caser::{CaseMode, KeywordCaser, TextReplacement};
pub use config::{Config, Settings};
pub use error::FixError;
pub use fixer::ExternalFixer;
pub use keywords::KeywordSet;
