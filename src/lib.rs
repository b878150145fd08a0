//! JSPantomLSP: a language server for JSP pages.
//!
//! Completion covers EL keywords and implicit objects, variables declared
//! by the document, and the functions, tags and attributes of every tag
//! library the page declares, directly or through `include` directives.
//! Tag libraries come from TLD files found in the configured directories.
use std::collections::HashMap;
use std::error::Error as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tower_lsp::Client;
use tower_lsp::lsp_types::*;
use tracing::{error, info};

pub mod clock;
pub mod completion;
pub mod config;
pub mod descriptor;
pub mod fs;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod scanner;
mod server;
pub mod sources;
pub mod tld;
pub mod types;
pub mod util;

use completion::CompletionRequest;
use completion::builder::build_completion_items;
use config::Config;
use registry::Registry;
use resolver::{FreshnessPolicy, TaglibResolver};
use sources::document_vars::{ActiveDocument, DocumentVariables};
use sources::tlds::{TldLoadReport, load_tlds};
use util::position_to_offset;

pub struct Backend {
    name: String,
    version: String,
    open_files: Arc<Mutex<HashMap<String, String>>>,
    registry: Arc<Mutex<Registry>>,
    resolver: Arc<Mutex<TaglibResolver>>,
    /// The document the user is editing, read by the variable scanner.
    active_document: ActiveDocument,
    active_uri: Arc<Mutex<Option<String>>>,
    /// Shared with the variable scanner so configuration changes apply to it.
    scan_interval: Arc<Mutex<Duration>>,
    config: Arc<Mutex<Config>>,
    /// `initializationOptions`, applied on top of the file layers.
    init_options: Arc<Mutex<Option<serde_json::Value>>>,
    /// TLD directories given on the command line.
    extra_tld_dirs: Vec<String>,
    user_config: Option<PathBuf>,
    workspace_root: Arc<Mutex<Option<PathBuf>>>,
    client: Option<Client>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self::new_with_tld_dirs(client, Vec::new())
    }

    pub fn new_with_tld_dirs(client: Client, extra_tld_dirs: Vec<String>) -> Self {
        Self::build(Some(client), extra_tld_dirs, Config::user_config_path())
    }

    /// A backend without a client and without the user configuration file.
    pub fn new_test() -> Self {
        Self::build(None, Vec::new(), None)
    }

    pub fn new_test_with_tld_dirs(extra_tld_dirs: Vec<String>) -> Self {
        Self::build(None, extra_tld_dirs, None)
    }

    fn build(client: Option<Client>, extra_tld_dirs: Vec<String>, user_config: Option<PathBuf>) -> Self {
        let config = Config::default();
        let scan_interval = Arc::new(Mutex::new(config.variable_scan_interval()));
        let active_document = ActiveDocument::new();

        let mut registry = Registry::new();
        match sources::builtin::register(&mut registry) {
            Ok(count) => info!("registered {count} built-in entries"),
            Err(err) => error!("failed to register built-in entries: {err}"),
        }
        DocumentVariables::new(active_document.clone(), Arc::clone(&scan_interval)).register(&mut registry);

        let resolver = TaglibResolver::default();
        let backend = Self {
            name: "JSPantomLSP".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            open_files: Arc::new(Mutex::new(HashMap::new())),
            registry: Arc::new(Mutex::new(registry)),
            resolver: Arc::new(Mutex::new(resolver)),
            active_document,
            active_uri: Arc::new(Mutex::new(None)),
            scan_interval,
            config: Arc::new(Mutex::new(Config::default())),
            init_options: Arc::new(Mutex::new(None)),
            extra_tld_dirs,
            user_config,
            workspace_root: Arc::new(Mutex::new(None)),
            client,
        };
        backend.set_config(config);
        backend
    }

    pub fn config(&self) -> Config {
        self.config.lock().clone()
    }

    /// Install `config` and propagate the settings that live elsewhere.
    pub(crate) fn set_config(&self, config: Config) {
        *self.scan_interval.lock() = config.variable_scan_interval();
        self.resolver
            .lock()
            .set_policy(FreshnessPolicy::new(config.include_recheck()));
        *self.config.lock() = config;
    }

    /// Configured TLD directories followed by the command-line ones.
    pub fn tld_dirs(&self) -> Vec<String> {
        let mut dirs = self.config.lock().tld_sources.clone();
        dirs.extend(self.extra_tld_dirs.iter().cloned());
        dirs
    }

    /// Load every TLD below [`tld_dirs`](Self::tld_dirs) into the registry.
    /// Each file that fails to load is reported to the user.
    pub async fn reload_tlds(&self) -> TldLoadReport {
        let dirs = self.tld_dirs();
        let report = {
            let mut registry = self.registry.lock();
            load_tlds(&dirs, &mut registry)
        };

        for failure in &report.failures {
            let mut message = format!("JSPantomLSP: {failure}");
            let mut source = failure.source();
            while let Some(cause) = source {
                message.push_str(&format!(": {cause}"));
                source = cause.source();
            }
            self.show_message(MessageType::WARNING, message).await;
        }
        self.log(
            MessageType::INFO,
            format!(
                "Loaded {} tag librar{} from {} director{}",
                report.loaded.len(),
                if report.loaded.len() == 1 { "y" } else { "ies" },
                dirs.len(),
                if dirs.len() == 1 { "y" } else { "ies" },
            ),
        )
        .await;
        report
    }

    /// Make `uri` the document the variable scanner looks at.
    pub(crate) fn activate(&self, uri: &str, text: &str) {
        *self.active_uri.lock() = Some(uri.to_string());
        self.active_document.set(text);
    }

    pub(crate) fn deactivate(&self, uri: &str) {
        let mut active = self.active_uri.lock();
        if active.as_deref() == Some(uri) {
            *active = None;
            self.active_document.clear();
        }
    }

    /// Completion items for `position` in `content`, the text of `uri`.
    pub(crate) fn complete_at(
        &self,
        uri: &Url,
        content: &str,
        position: Position,
        activated_manually: bool,
    ) -> Vec<CompletionItem> {
        let offset = position_to_offset(content, position);
        let file_path = uri.to_file_path().ok();
        let minimum_word_length = self.config.lock().minimum_word_length;

        let mut request = CompletionRequest::new(content, offset)
            .manual(activated_manually)
            .with_minimum_word_length(minimum_word_length);
        if let Some(path) = file_path.as_deref() {
            request = request.with_file_path(path);
        }

        let suggestions = {
            let mut registry = self.registry.lock();
            let mut resolver = self.resolver.lock();
            completion::complete(&request, &mut registry, &mut resolver)
        };
        build_completion_items(&suggestions, content, request.offset)
    }

    /// Public helper for tests: the registry backing every completion.
    pub fn registry(&self) -> Arc<Mutex<Registry>> {
        Arc::clone(&self.registry)
    }
}
