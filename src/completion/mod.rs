/// Completion engine.
///
/// This sub-module groups all completion logic:
/// - **context**: classifying the cursor (expression, tag name, attribute
///   name, attribute value) with a text-level state machine
/// - **expression**: suggestions inside `${…}` / `#{…}`
/// - **markup**: tag, attribute and attribute-value suggestions
/// - **builder**: turning [`Suggestion`]s into LSP `CompletionItem`s
pub mod builder;
pub mod context;
pub mod expression;
pub mod markup;

use std::path::Path;

use thiserror::Error;

use crate::registry::Registry;
use crate::resolver::TaglibResolver;
use crate::types::Suggestion;

use context::{CursorContext, classify};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("offset {offset} is not inside an expression")]
    NoExpressionScope { offset: usize },
}

/// One completion request, independent of the editor protocol.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// Full text of the document.
    pub text: &'a str,
    /// Byte offset of the cursor.
    pub offset: usize,
    /// On-disk location of the document, needed to follow includes.
    pub file_path: Option<&'a Path>,
    /// Explicitly invoked by the user rather than triggered by typing.
    pub activated_manually: bool,
    pub minimum_word_length: usize,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(text: &'a str, offset: usize) -> Self {
        Self {
            text,
            offset: floor_char_boundary(text, offset),
            file_path: None,
            activated_manually: false,
            minimum_word_length: 3,
        }
    }

    pub fn with_file_path(mut self, path: &'a Path) -> Self {
        self.file_path = Some(path);
        self
    }

    pub fn manual(mut self, activated_manually: bool) -> Self {
        self.activated_manually = activated_manually;
        self
    }

    pub fn with_minimum_word_length(mut self, len: usize) -> Self {
        self.minimum_word_length = len;
        self
    }

    /// Everything before the cursor.
    pub fn before_cursor(&self) -> &'a str {
        &self.text[..self.offset]
    }

    /// Whether `prefix` is long enough to complete.  Manual invocation
    /// always passes; automatic completion needs a non-empty prefix of at
    /// least the minimum word length.
    pub fn accepts_prefix(&self, prefix: &str) -> bool {
        self.activated_manually || (!prefix.is_empty() && prefix.chars().count() >= self.minimum_word_length)
    }
}

/// Suggestions for the cursor position in `request`.
pub fn complete(
    request: &CompletionRequest<'_>,
    registry: &mut Registry,
    resolver: &mut TaglibResolver,
) -> Vec<Suggestion> {
    match classify(request.text, request.offset) {
        CursorContext::Expression { start, in_string } => {
            expression::suggest(request, start, in_string, registry, resolver)
        }
        CursorContext::TagName { name_start, closing } => {
            markup::suggest_tags(request, name_start, closing, registry, resolver)
        }
        CursorContext::AttributeName { tag_start, tag_name } => {
            markup::suggest_attributes(request, tag_start, &tag_name, registry, resolver)
        }
        CursorContext::AttributeValue { attribute, value_start, .. } => {
            markup::suggest_attribute_values(request, &attribute, value_start, registry)
        }
        CursorContext::Text | CursorContext::Ignored => Vec::new(),
    }
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_gate() {
        let request = CompletionRequest::new("", 0);
        assert!(!request.accepts_prefix(""));
        assert!(!request.accepts_prefix("ab"));
        assert!(request.accepts_prefix("abc"));

        let manual = request.manual(true);
        assert!(manual.accepts_prefix(""));
        assert!(manual.accepts_prefix("a"));

        let short = request.with_minimum_word_length(0);
        assert!(!short.accepts_prefix(""));
        assert!(short.accepts_prefix("a"));
    }

    #[test]
    fn offset_is_clamped_to_a_char_boundary() {
        let text = "${é";
        assert_eq!(CompletionRequest::new(text, 3).offset, 2);
        assert_eq!(CompletionRequest::new(text, 99).offset, text.len());
    }

    #[test]
    fn text_outside_any_context_completes_nothing() {
        let mut registry = Registry::new();
        crate::sources::builtin::register(&mut registry).unwrap();
        let mut resolver = TaglibResolver::default();
        let text = "<p>hello world";
        let request = CompletionRequest::new(text, text.len()).manual(true);
        assert!(complete(&request, &mut registry, &mut resolver).is_empty());
    }
}
