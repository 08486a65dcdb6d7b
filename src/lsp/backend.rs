use std::collections::HashMap;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::sync::Mutex;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::caser::KeywordCaser;
use crate::config::{SettingsHandle, apply_client_settings};
use crate::keywords::KeywordSet;
use crate::lsp::document::DocumentState;
use crate::lsp::handlers::{
    GREETING_COMMAND, HandleExecuteCommand, HandleFormatting, HandleRangeFormatting,
};

/// The main LSP backend that holds state and implements the Language Server Protocol
pub struct Backend {
    pub client: Client,
    pub caser: KeywordCaser,
    pub settings: SettingsHandle,
    pub documents: Arc<Mutex<HashMap<Url, DocumentState>>>,
    // Held for its side effect: dropping it would stop config reloads
    _config_watcher: Option<RecommendedWatcher>,
}

impl Backend {
    pub fn new(
        client: Client,
        keywords: &KeywordSet,
        settings: SettingsHandle,
        config_watcher: Option<RecommendedWatcher>,
    ) -> Self {
        Self {
            client,
            caser: KeywordCaser::new(keywords),
            settings,
            documents: Arc::new(Mutex::new(HashMap::new())),
            _config_watcher: config_watcher,
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(
        &self,
        _: InitializeParams,
    ) -> tower_lsp::jsonrpc::Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                document_formatting_provider: Some(OneOf::Left(true)),
                document_range_formatting_provider: Some(OneOf::Left(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![GREETING_COMMAND.to_string()],
                    work_done_progress_options: Default::default(),
                }),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "abap-format-server initialized")
            .await;
    }

    async fn shutdown(&self) -> tower_lsp::jsonrpc::Result<()> {
        Ok(())
    }

    async fn formatting(
        &self,
        params: DocumentFormattingParams,
    ) -> tower_lsp::jsonrpc::Result<Option<Vec<TextEdit>>> {
        self.handle_formatting(params).await
    }

    async fn range_formatting(
        &self,
        params: DocumentRangeFormattingParams,
    ) -> tower_lsp::jsonrpc::Result<Option<Vec<TextEdit>>> {
        self.handle_range_formatting(params).await
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> tower_lsp::jsonrpc::Result<Option<serde_json::Value>> {
        self.handle_execute_command(params).await
    }

    // Store opened documents for the formatting providers
    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let doc_state = DocumentState {
            content: params.text_document.text,
            language_id: params.text_document.language_id,
        };

        let mut docs = self.documents.lock().await;
        docs.insert(uri, doc_state);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().last() {
            let mut docs = self.documents.lock().await;
            // Full sync: the last change carries the complete new content.
            // The language id was fixed at didOpen and never changes.
            if let Some(state) = docs.get_mut(&uri) {
                state.content = change.text;
            }
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let mut docs = self.documents.lock().await;
        docs.remove(&params.text_document.uri);
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let mut settings = self.settings.write().await;
        apply_client_settings(&mut settings, &params.settings);
        drop(settings);

        self.client
            .log_message(MessageType::INFO, "Configuration updated from client")
            .await;
    }
}
