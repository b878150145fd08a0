/// LSP server trait implementation.
///
/// This module contains the `impl LanguageServer for Backend` block,
/// which handles all LSP protocol messages (initialize, didOpen, didChange,
/// didClose, didChangeConfiguration, completion).
use tower_lsp::LanguageServer;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tracing::{debug, warn};

use crate::Backend;
use crate::config::{Config, ConfigLayer};

/// Completion requests of these kinds were triggered by typing; every
/// other request was asked for explicitly.
///
/// `INVOKED` counts as explicit.  Clients send it both for Ctrl+Space and
/// for identifier-typing auto popups, so those popups skip the
/// `minimum_word_length` gate.
fn is_automatic(context: Option<&CompletionContext>) -> bool {
    context.is_some_and(|context| {
        context.trigger_kind == CompletionTriggerKind::TRIGGER_CHARACTER
            || context.trigger_kind == CompletionTriggerKind::TRIGGER_FOR_INCOMPLETE_COMPLETIONS
    })
}

impl Backend {
    /// Defaults, then the user and workspace files, then the client's
    /// `initializationOptions`.
    async fn load_config(&self) -> Config {
        let root = self.workspace_root.lock().clone();
        let (mut config, errors) = Config::load(self.user_config.as_deref(), root.as_deref());
        for err in errors {
            warn!("{err}");
            self.log(MessageType::WARNING, format!("Ignoring configuration: {err}"))
                .await;
        }

        let init_options = self.init_options.lock().clone();
        if let Some(options) = init_options {
            match ConfigLayer::from_json(&options) {
                Ok(layer) => config.apply(layer),
                Err(err) => {
                    self.log(MessageType::WARNING, format!("Ignoring initializationOptions: {err}"))
                        .await;
                }
            }
        }
        config
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        // Extract and store the workspace root path
        #[allow(deprecated)]
        let workspace_root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|folder| folder.uri.to_file_path().ok())
            .or_else(|| params.root_uri.as_ref().and_then(|uri| uri.to_file_path().ok()));
        *self.workspace_root.lock() = workspace_root;
        *self.init_options.lock() = params.initialization_options;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(
                        ["<", ":", "{", "\"", " "].map(String::from).to_vec(),
                    ),
                    ..CompletionOptions::default()
                }),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: self.name.clone(),
                version: Some(self.version.clone()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let config = self.load_config().await;
        self.set_config(config);
        let report = self.reload_tlds().await;

        self.log(
            MessageType::INFO,
            format!(
                "JSPantomLSP initialized! {} tag librar{} available, {} failed to load",
                report.loaded.len(),
                if report.loaded.len() == 1 { "y" } else { "ies" },
                report.failures.len()
            ),
        )
        .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let uri = doc.uri.to_string();
        let text = doc.text;

        self.activate(&uri, &text);
        self.open_files.lock().insert(uri.clone(), text);

        self.log(MessageType::INFO, format!("Opened file: {}", uri))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.to_string();

        // Full sync: the last change holds the whole document.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.activate(&uri, &change.text);
            self.open_files.lock().insert(uri, change.text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.to_string();

        self.open_files.lock().remove(&uri);
        self.deactivate(&uri);

        self.log(MessageType::INFO, format!("Closed file: {}", uri))
            .await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let layer = match ConfigLayer::from_settings(&params.settings) {
            Ok(layer) => layer,
            Err(err) => {
                self.log(MessageType::WARNING, format!("Ignoring settings: {err}"))
                    .await;
                return;
            }
        };

        let mut config = self.config();
        let previous_sources = config.tld_sources.clone();
        config.apply(layer);
        let reload = config.tld_sources != previous_sources;
        self.set_config(config);

        if reload {
            self.reload_tlds().await;
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let activated_manually = !is_automatic(params.context.as_ref());

        // Get file content for offset calculation
        let Some(content) = self.open_files.lock().get(uri.as_str()).cloned() else {
            return Ok(None);
        };
        self.activate(uri.as_str(), &content);

        let items = self.complete_at(&uri, &content, position, activated_manually);
        debug!("{} completion item(s) at {}:{:?}", items.len(), uri, position);
        Ok(Some(CompletionResponse::Array(items)))
    }
}
