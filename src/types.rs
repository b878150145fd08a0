//! Data types shared across the JSPantomLSP server.
//!
//! This module contains the editor-facing completion record produced by
//! every descriptor ([`Suggestion`]), its category ([`SuggestionKind`]) and
//! the result of taglib resolution ([`DeclaredTaglib`]).

use std::sync::Arc;

use crate::descriptor::TaglibDesc;

/// Category of a completion suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionKind {
    Keyword,
    Variable,
    Function,
    Tag,
    Attribute,
    Namespace,
}

impl SuggestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionKind::Keyword => "keyword",
            SuggestionKind::Variable => "variable",
            SuggestionKind::Function => "function",
            SuggestionKind::Tag => "tag",
            SuggestionKind::Attribute => "attribute",
            SuggestionKind::Namespace => "namespace",
        }
    }
}

/// A single completion candidate, independent of the editor protocol.
///
/// Either `text` (plain insertion) or `snippet` (numbered placeholders,
/// `$1`, `${2:hint}`, `$0`) is set.  Empty labels are normalised to `None`
/// so callers can test for presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Plain text to insert.
    pub text: Option<String>,
    /// Snippet to insert.
    pub snippet: Option<String>,
    /// What the completion list shows, when different from the insertion.
    pub display_text: Option<String>,
    /// Secondary label shown before the entry, usually a type.
    pub left_label: Option<String>,
    /// Secondary label shown after the entry, usually a short annotation.
    pub right_label: Option<String>,
    pub description: Option<String>,
    pub kind: SuggestionKind,
    /// The exact text before the cursor the editor replaces on accept.
    pub replacement_prefix: String,
}

impl Suggestion {
    pub(crate) fn new(kind: SuggestionKind, replacement_prefix: &str) -> Self {
        Self {
            text: None,
            snippet: None,
            display_text: None,
            left_label: None,
            right_label: None,
            description: None,
            kind,
            replacement_prefix: replacement_prefix.to_string(),
        }
    }

    pub(crate) fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = non_empty(text.into());
        self
    }

    pub(crate) fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = non_empty(snippet.into());
        self
    }

    pub(crate) fn with_display_text(mut self, display: impl Into<String>) -> Self {
        self.display_text = non_empty(display.into());
        self
    }

    pub(crate) fn with_left_label(mut self, label: impl Into<String>) -> Self {
        self.left_label = non_empty(label.into());
        self
    }

    pub(crate) fn with_right_label(mut self, label: impl Into<String>) -> Self {
        self.right_label = non_empty(label.into());
        self
    }

    pub(crate) fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = non_empty(description.into());
        self
    }

    /// The text or snippet that gets inserted.
    pub fn insertion(&self) -> &str {
        self.text
            .as_deref()
            .or(self.snippet.as_deref())
            .unwrap_or_default()
    }

    /// The label to show in a completion list.
    pub fn label(&self) -> &str {
        self.display_text
            .as_deref()
            .or(self.text.as_deref().map(str::trim_end))
            .unwrap_or_else(|| self.insertion())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// A taglib that is in scope at the cursor, together with the prefix the
/// document binds it to.
#[derive(Debug, Clone)]
pub struct DeclaredTaglib {
    pub prefix: String,
    pub desc: Arc<TaglibDesc>,
}

/// Look up the prefix a taglib (identified by `uri`) is bound to.
pub fn namespace_for<'a>(declared: &'a [DeclaredTaglib], uri: &str) -> Option<&'a str> {
    declared
        .iter()
        .find(|item| item.desc.uri == uri)
        .map(|item| item.prefix.as_str())
}
