/// Completion item building.
///
/// This module converts protocol-independent [`Suggestion`]s into LSP
/// `CompletionItem`s.  Every item carries a `text_edit` over exactly the
/// suggestion's replacement prefix, so the editor replaces what the user
/// typed (including a namespace such as `ts:`) rather than guessing a word
/// boundary of its own.
use tower_lsp::lsp_types::*;

use crate::types::{Suggestion, SuggestionKind};
use crate::util::offset_to_position;

fn item_kind(kind: SuggestionKind) -> CompletionItemKind {
    match kind {
        SuggestionKind::Keyword => CompletionItemKind::KEYWORD,
        SuggestionKind::Variable => CompletionItemKind::VARIABLE,
        SuggestionKind::Function => CompletionItemKind::FUNCTION,
        SuggestionKind::Tag => CompletionItemKind::CLASS,
        SuggestionKind::Attribute => CompletionItemKind::FIELD,
        SuggestionKind::Namespace => CompletionItemKind::MODULE,
    }
}

/// Build completion items for `suggestions` computed at byte `offset` of
/// `content`.  Provider order is kept through `sort_text`.
pub fn build_completion_items(
    suggestions: &[Suggestion],
    content: &str,
    offset: usize,
) -> Vec<CompletionItem> {
    let end = offset_to_position(content, offset);
    suggestions
        .iter()
        .enumerate()
        .map(|(index, suggestion)| {
            let start_offset = offset.saturating_sub(suggestion.replacement_prefix.len());
            let range = Range {
                start: offset_to_position(content, start_offset),
                end,
            };
            build_completion_item(suggestion, range, index)
        })
        .collect()
}

pub(crate) fn build_completion_item(suggestion: &Suggestion, range: Range, index: usize) -> CompletionItem {
    let (new_text, format) = match (&suggestion.text, &suggestion.snippet) {
        (Some(text), _) => (text.clone(), InsertTextFormat::PLAIN_TEXT),
        (None, Some(snippet)) => (snippet.clone(), InsertTextFormat::SNIPPET),
        (None, None) => (suggestion.label().to_string(), InsertTextFormat::PLAIN_TEXT),
    };

    let label_details = (suggestion.left_label.is_some() || suggestion.right_label.is_some()).then(|| {
        CompletionItemLabelDetails {
            detail: suggestion.right_label.as_ref().map(|right| format!(" {right}")),
            description: suggestion.left_label.clone(),
        }
    });

    CompletionItem {
        label: suggestion.label().to_string(),
        label_details,
        kind: Some(item_kind(suggestion.kind)),
        detail: suggestion.left_label.clone(),
        documentation: suggestion.description.clone().map(Documentation::String),
        sort_text: Some(format!("{index:05}")),
        filter_text: Some(suggestion.label().to_string()),
        insert_text_format: Some(format),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit { range, new_text })),
        ..CompletionItem::default()
    }
}
