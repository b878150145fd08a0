//! Data-driven completion tests.
//!
//! Every `tests/fixtures/**/*.fixture` file is one test.  A fixture is a
//! header of `// key: value` lines, a `---` line, and the document text
//! with `<|>` marking the cursor:
//!
//! ```text
//! // test: functions of a declared taglib
//! // tlds: tlds
//! // trigger: :
//! // expect: ts:concat
//! // insert: ts:concat => ts:concat(${1:String}, ${2:String})
//! ---
//! <%@ taglib prefix="ts" uri="http://example.com/jsp/test" %>
//! ${ts:<|>
//! ```
//!
//! Keys:
//! - `tlds`: TLD directory, relative to the fixtures root.
//! - `trigger`: the request was typed (this character); otherwise invoked.
//! - `expect`: the exact labels, in order, comma separated.
//! - `expect_contains` / `expect_absent`: labels that must (not) appear.
//! - `expect_none`: no suggestions at all.
//! - `insert`: `label => text` checks the inserted text of one item.
//! - `file`: path of the document below the fixtures root, for includes.

use std::path::Path;

use datatest_stable::Utf8Path;
use jspantom_lsp::Backend;
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

const FIXTURES_ROOT: &str = "tests/fixtures";
const CURSOR: &str = "<|>";

#[derive(Debug, Default)]
struct Fixture {
    name: String,
    tld_dirs: Vec<String>,
    trigger: Option<String>,
    file: Option<String>,
    expect: Option<Vec<String>>,
    expect_contains: Vec<String>,
    expect_absent: Vec<String>,
    expect_none: bool,
    inserts: Vec<(String, String)>,
    text: String,
    cursor: usize,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_fixture(path: &Utf8Path, contents: &str) -> Result<Fixture, String> {
    let (header, body) = contents
        .split_once("\n---\n")
        .ok_or_else(|| format!("{path}: missing `---` separator"))?;

    let mut fixture = Fixture {
        name: path.to_string(),
        ..Fixture::default()
    };
    for line in header.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(directive) = line.strip_prefix("//") else {
            return Err(format!("{path}: header line `{line}` is not a `//` directive"));
        };
        let (key, value) = directive.split_once(':').unwrap_or((directive, ""));
        let value = value.trim();
        match key.trim() {
            "test" => fixture.name = value.to_string(),
            "tlds" => fixture.tld_dirs.push(value.to_string()),
            "trigger" => fixture.trigger = Some(value.chars().next().unwrap_or(' ').to_string()),
            "file" => fixture.file = Some(value.to_string()),
            "expect" => fixture.expect = Some(split_list(value)),
            "expect_contains" => fixture.expect_contains.extend(split_list(value)),
            "expect_absent" => fixture.expect_absent.extend(split_list(value)),
            "expect_none" => fixture.expect_none = true,
            "insert" => {
                let (label, text) = value
                    .split_once("=>")
                    .ok_or_else(|| format!("{path}: `insert` needs `label => text`"))?;
                fixture.inserts.push((label.trim().to_string(), text.trim().to_string()));
            }
            other => return Err(format!("{path}: unknown directive `{other}`")),
        }
    }

    let cursor = body
        .find(CURSOR)
        .ok_or_else(|| format!("{path}: missing cursor marker {CURSOR}"))?;
    fixture.text = body.replacen(CURSOR, "", 1);
    fixture.cursor = cursor;
    Ok(fixture)
}

fn position_of(text: &str, offset: usize) -> Position {
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let column = before.rsplit('\n').next().unwrap_or_default();
    Position::new(line, column.encode_utf16().count() as u32)
}

fn inserted(item: &CompletionItem) -> &str {
    match &item.text_edit {
        Some(CompletionTextEdit::Edit(edit)) => &edit.new_text,
        Some(CompletionTextEdit::InsertAndReplace(edit)) => &edit.new_text,
        None => item.insert_text.as_deref().unwrap_or(&item.label),
    }
}

async fn run(fixture: &Fixture) -> Result<(), String> {
    let root = std::fs::canonicalize(FIXTURES_ROOT).map_err(|err| format!("{FIXTURES_ROOT}: {err}"))?;
    let tld_dirs = fixture
        .tld_dirs
        .iter()
        .map(|dir| root.join(dir).to_string_lossy().to_string())
        .collect();
    let backend = Backend::new_test_with_tld_dirs(tld_dirs);
    let report = backend.reload_tlds().await;
    if let Some(failure) = report.failures.first() {
        return Err(format!("TLD failed to load: {failure}"));
    }

    let document = root.join(fixture.file.as_deref().unwrap_or("fixture.jsp"));
    let uri = Url::from_file_path(Path::new(&document)).map_err(|()| "bad document path".to_string())?;
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "jsp".to_string(),
                version: 1,
                text: fixture.text.clone(),
            },
        })
        .await;

    let context = fixture.trigger.as_ref().map(|ch| CompletionContext {
        trigger_kind: CompletionTriggerKind::TRIGGER_CHARACTER,
        trigger_character: Some(ch.clone()),
    });
    let response = backend
        .completion(CompletionParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position: position_of(&fixture.text, fixture.cursor),
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context,
        })
        .await
        .map_err(|err| err.to_string())?;
    let items = match response {
        Some(CompletionResponse::Array(items)) => items,
        Some(CompletionResponse::List(list)) => list.items,
        None => Vec::new(),
    };
    let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();

    if fixture.expect_none && !items.is_empty() {
        return Err(format!("expected no suggestions, got {labels:?}"));
    }
    if let Some(expected) = &fixture.expect
        && labels != *expected
    {
        return Err(format!("expected {expected:?}, got {labels:?}"));
    }
    for label in &fixture.expect_contains {
        if !labels.contains(&label.as_str()) {
            return Err(format!("missing {label}, got {labels:?}"));
        }
    }
    for label in &fixture.expect_absent {
        if labels.contains(&label.as_str()) {
            return Err(format!("unexpected {label} in {labels:?}"));
        }
    }
    for (label, text) in &fixture.inserts {
        let item = items
            .iter()
            .find(|item| item.label == *label)
            .ok_or_else(|| format!("no item {label} to check insertion of, got {labels:?}"))?;
        if inserted(item) != text {
            return Err(format!("{label} inserts {:?}, expected {text:?}", inserted(item)));
        }
    }
    Ok(())
}

fn fixture_test(path: &Utf8Path, contents: String) -> datatest_stable::Result<()> {
    let fixture = parse_fixture(path, &contents)?;
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime
        .block_on(run(&fixture))
        .map_err(|err| format!("{}: {err}", fixture.name))?;
    Ok(())
}

datatest_stable::harness! {
    { test = fixture_test, root = "tests/fixtures", pattern = r"\.fixture$" },
}
