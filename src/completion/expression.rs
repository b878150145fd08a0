//! Expression-language suggestions.
//!
//! Inside `${…}` the candidates are EL keywords, variables (implicit
//! objects and document variables) and the functions of every taglib
//! declared for the document.  A prefix that follows a `.` is a property
//! access; properties are not known, so nothing is offered there.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::context::{CursorContext, classify, completion_prefix};
use super::{CompletionRequest, ContextError};
use crate::descriptor::{DescriptorKind, MatchContext};
use crate::registry::{Query, Registry};
use crate::resolver::TaglibResolver;
use crate::types::Suggestion;

static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.\s*([a-zA-Z][a-zA-Z0-9_:]*)?$").expect("valid property access regex")
});

/// Descriptor kinds offered in a general expression position.
const EXPRESSION_KINDS: [DescriptorKind; 3] = [
    DescriptorKind::Function,
    DescriptorKind::Var,
    DescriptorKind::Keyword,
];

/// What the cursor is completing inside an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionContext {
    /// `a.b|`: a property of some value.
    Property,
    /// Anything else.
    None,
}

pub fn expression_context(expression_before_cursor: &str) -> ExpressionContext {
    if PROPERTY.is_match(expression_before_cursor) {
        ExpressionContext::Property
    } else {
        ExpressionContext::None
    }
}

/// Expression suggestions at the request's cursor.
///
/// Fails with [`ContextError::NoExpressionScope`] when the cursor is not
/// inside an expression at all.
pub fn complete_expression(
    request: &CompletionRequest<'_>,
    registry: &mut Registry,
    resolver: &mut TaglibResolver,
) -> Result<Vec<Suggestion>, ContextError> {
    match classify(request.text, request.offset) {
        CursorContext::Expression { start, in_string } => {
            Ok(suggest(request, start, in_string, registry, resolver))
        }
        _ => Err(ContextError::NoExpressionScope {
            offset: request.offset,
        }),
    }
}

pub(super) fn suggest(
    request: &CompletionRequest<'_>,
    expression_start: usize,
    in_string: bool,
    registry: &mut Registry,
    resolver: &mut TaglibResolver,
) -> Vec<Suggestion> {
    if in_string {
        return Vec::new();
    }
    let expression = &request.text[expression_start..request.offset];
    let prefix = completion_prefix(expression);
    if !request.accepts_prefix(prefix) {
        return Vec::new();
    }
    if expression_context(expression) == ExpressionContext::Property {
        debug!("property completion is not supported: {expression:?}");
        return Vec::new();
    }

    let declared =
        resolver.find_declared_taglibs(request.before_cursor(), request.file_path, registry);
    let ctx = MatchContext::new(prefix, &declared);

    registry
        .get_all(&Query::all(), true)
        .into_iter()
        .filter(|descriptor| EXPRESSION_KINDS.contains(&descriptor.kind()))
        .filter(|descriptor| descriptor.matches(&ctx))
        .map(|descriptor| descriptor.suggestion(&ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{TagFunctionDesc, TaglibDesc};
    use crate::sources::builtin;
    use crate::types::SuggestionKind;

    const URI: &str = "http://example.com/jsp/test";

    fn setup() -> (Registry, TaglibResolver) {
        let mut registry = Registry::new();
        builtin::register(&mut registry).unwrap();
        let taglib = TaglibDesc::new("ts", URI)
            .unwrap()
            .with_function(
                TagFunctionDesc::new("concat")
                    .unwrap()
                    .with_return_type("java.lang.String")
                    .with_argument_types(["java.lang.String", "java.lang.String"])
                    .with_description("Concatenates two strings."),
            );
        registry.import_taglib(taglib);
        (registry, TaglibResolver::default())
    }

    fn complete_at_end(text: &str, manual: bool) -> Vec<Suggestion> {
        let (mut registry, mut resolver) = setup();
        let request = CompletionRequest::new(text, text.len()).manual(manual);
        complete_expression(&request, &mut registry, &mut resolver).unwrap()
    }

    #[test]
    fn declared_function_is_suggested_with_its_namespace() {
        let text = format!("<%@ taglib uri=\"{URI}\" prefix=\"prefixOfTag\" %>\n${{prefixOfTag:con");
        let suggestions = complete_at_end(&text, false);
        assert_eq!(suggestions.len(), 1);
        let concat = &suggestions[0];
        assert_eq!(concat.kind, SuggestionKind::Function);
        assert_eq!(concat.left_label.as_deref(), Some("String"));
        assert_eq!(concat.description.as_deref(), Some("Concatenates two strings."));
        assert_eq!(concat.replacement_prefix, "prefixOfTag:con");
        assert_eq!(
            concat.snippet.as_deref(),
            Some("prefixOfTag:concat(${1:String}, ${2:String})")
        );
    }

    #[test]
    fn undeclared_taglib_functions_are_hidden() {
        let suggestions = complete_at_end("${prefixOfTag:con", false);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn empty_expression_needs_manual_invocation() {
        assert!(complete_at_end("${", false).is_empty());
        let manual = complete_at_end("${", true);
        assert!(manual.iter().any(|s| s.kind == SuggestionKind::Keyword));
        assert!(manual.iter().any(|s| s.kind == SuggestionKind::Variable));
        assert!(manual.iter().all(|s| s.kind != SuggestionKind::Namespace));
    }

    #[test]
    fn short_prefix_is_gated() {
        assert!(complete_at_end("${pa", false).is_empty());
        let suggestions = complete_at_end("${par", false);
        let labels: Vec<_> = suggestions.iter().map(Suggestion::label).collect();
        assert_eq!(labels, ["param", "paramValues"]);
    }

    #[test]
    fn abbreviations_match() {
        let suggestions = complete_at_end("${x + ip", true);
        assert!(suggestions.iter().any(|s| s.label() == "initParam"));
    }

    #[test]
    fn keywords_carry_their_full_name() {
        let suggestions = complete_at_end("${a ne", true);
        let ne = suggestions.iter().find(|s| s.label() == "ne").unwrap();
        assert_eq!(ne.kind, SuggestionKind::Keyword);
        assert_eq!(ne.right_label.as_deref(), Some("not equal"));
    }

    #[test]
    fn property_access_and_strings_offer_nothing() {
        assert!(complete_at_end("${param.hea", true).is_empty());
        assert!(complete_at_end("${param. ", true).is_empty());
        assert!(complete_at_end("${'par", true).is_empty());
    }

    #[test]
    fn outside_an_expression_is_an_error() {
        let (mut registry, mut resolver) = setup();
        let text = "<p>${a} par";
        let request = CompletionRequest::new(text, text.len()).manual(true);
        assert_eq!(
            complete_expression(&request, &mut registry, &mut resolver),
            Err(ContextError::NoExpressionScope { offset: text.len() })
        );
    }

    #[test]
    fn expression_context_classification() {
        assert_eq!(expression_context("a.b"), ExpressionContext::Property);
        assert_eq!(expression_context("a."), ExpressionContext::Property);
        assert_eq!(expression_context("a + b"), ExpressionContext::None);
        assert_eq!(expression_context("1.5"), ExpressionContext::None);
    }
}
