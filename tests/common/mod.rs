#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use jspantom_lsp::Backend;
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

pub const TEST_URI: &str = "http://example.com/jsp/test";

/// A small taglib with one function and two tags.
pub const TEST_TLD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<taglib xmlns="http://java.sun.com/xml/ns/javaee" version="2.1">
  <description>Tags used by the tests.</description>
  <display-name>Test Tags</display-name>
  <tlib-version>1.0</tlib-version>
  <short-name>ts</short-name>
  <uri>http://example.com/jsp/test</uri>
  <function>
    <name>concat</name>
    <function-class>com.example.Functions</function-class>
    <function-signature>java.lang.String concat(java.lang.String, java.lang.String)</function-signature>
    <description>Concatenates two strings.</description>
  </function>
  <tag>
    <description>Iterates over a collection.</description>
    <name>forEach</name>
    <tag-class>com.example.ForEachTag</tag-class>
    <body-content>JSP</body-content>
    <attribute>
      <name>items</name>
      <required>false</required>
      <rtexprvalue>true</rtexprvalue>
      <type>java.lang.Object</type>
    </attribute>
    <attribute>
      <name>var</name>
      <required>false</required>
      <rtexprvalue>false</rtexprvalue>
    </attribute>
    <attribute>
      <name>varStatus</name>
      <required>false</required>
      <rtexprvalue>false</rtexprvalue>
    </attribute>
    <attribute>
      <name>begin</name>
      <rtexprvalue>true</rtexprvalue>
      <type>int</type>
    </attribute>
    <attribute>
      <name>requiredTest</name>
      <required>true</required>
    </attribute>
  </tag>
  <tag>
    <name>out</name>
    <tag-class>com.example.OutTag</tag-class>
    <body-content>empty</body-content>
    <attribute>
      <name>value</name>
      <required>true</required>
      <rtexprvalue>true</rtexprvalue>
      <type>java.lang.String</type>
    </attribute>
  </tag>
</taglib>
"#;

pub fn create_test_backend() -> Backend {
    Backend::new_test()
}

/// Write `files` (relative path, content) below a fresh temp directory.
pub fn create_workspace(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (rel_path, content) in files {
        let full = dir.path().join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create dirs");
        }
        fs::write(&full, content).expect("failed to write file");
    }
    dir
}

/// A backend whose TLD directory holds [`TEST_TLD`], already loaded.
pub async fn create_backend_with_test_tld() -> (Backend, tempfile::TempDir) {
    let dir = create_workspace(&[("tlds/test.tld", TEST_TLD)]);
    let backend = Backend::new_test_with_tld_dirs(vec![dir.path().join("tlds").to_string_lossy().to_string()]);
    let report = backend.reload_tlds().await;
    assert_eq!(report.loaded.len(), 1, "test TLD should load: {:?}", report.failures);
    (backend, dir)
}

pub fn file_uri(path: &Path) -> Url {
    Url::from_file_path(path).expect("absolute path")
}

pub async fn open(backend: &Backend, uri: &Url, text: &str) {
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "jsp".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
}

pub async fn change(backend: &Backend, uri: &Url, version: i32, text: &str) {
    backend
        .did_change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: text.to_string(),
            }],
        })
        .await;
}

/// Position of the end of `text`.
pub fn end_position(text: &str) -> Position {
    let line = text.matches('\n').count() as u32;
    let last_line = text.rsplit('\n').next().unwrap_or_default();
    Position::new(line, last_line.encode_utf16().count() as u32)
}

/// Request completion at `position`; `trigger` marks it as typed rather
/// than explicitly invoked.
pub async fn complete(
    backend: &Backend,
    uri: &Url,
    position: Position,
    trigger: Option<&str>,
) -> Vec<CompletionItem> {
    let context = trigger.map(|ch| CompletionContext {
        trigger_kind: CompletionTriggerKind::TRIGGER_CHARACTER,
        trigger_character: Some(ch.to_string()),
    });
    let params = CompletionParams {
        text_document_position: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position,
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
        context,
    };
    match backend.completion(params).await.unwrap() {
        Some(CompletionResponse::Array(items)) => items,
        Some(CompletionResponse::List(list)) => list.items,
        None => Vec::new(),
    }
}

/// Open `text` as `uri` and complete at its end.
pub async fn complete_at_end(
    backend: &Backend,
    uri: &Url,
    text: &str,
    trigger: Option<&str>,
) -> Vec<CompletionItem> {
    open(backend, uri, text).await;
    complete(backend, uri, end_position(text), trigger).await
}

pub fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|item| item.label.as_str()).collect()
}

pub fn insert_text(item: &CompletionItem) -> &str {
    match &item.text_edit {
        Some(CompletionTextEdit::Edit(edit)) => &edit.new_text,
        Some(CompletionTextEdit::InsertAndReplace(edit)) => &edit.new_text,
        None => item.insert_text.as_deref().unwrap_or(&item.label),
    }
}

pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

pub fn join(root: &Path, rel: &str) -> PathBuf {
    root.join(rel)
}
