//! Tag, attribute and attribute-value suggestions.
//!
//! - After `<` (or `</`) the declared taglibs' tags are offered, rendered
//!   according to what already follows the cursor.
//! - Between the attributes of a custom tag the tag's remaining attributes
//!   are offered; attributes already present anywhere in the tag are left
//!   out.
//! - Inside the value of `var` / `varStatus` the known variables are
//!   offered, inside `scope` the four scopes.

use std::collections::HashSet;
use std::sync::Arc;

use super::CompletionRequest;
use super::context::completion_prefix;
use crate::descriptor::{Descriptor, DescriptorKind, MatchContext, TagCompletion, TagDesc};
use crate::registry::{Query, Registry};
use crate::resolver::TaglibResolver;
use crate::scanner::extract_attributes;
use crate::types::{DeclaredTaglib, Suggestion};

pub(super) fn suggest_tags(
    request: &CompletionRequest<'_>,
    name_start: usize,
    closing: bool,
    registry: &mut Registry,
    resolver: &mut TaglibResolver,
) -> Vec<Suggestion> {
    let prefix = completion_prefix(&request.text[name_start..request.offset]);
    if !request.accepts_prefix(prefix) {
        return Vec::new();
    }

    let tag_completion = if closing {
        TagCompletion::Closing
    } else if is_followed_by_tag_end(&request.text[request.offset..]) {
        TagCompletion::NameOnly
    } else {
        TagCompletion::Full
    };

    let declared =
        resolver.find_declared_taglibs(request.before_cursor(), request.file_path, registry);
    let ctx = MatchContext::new(prefix, &declared).with_tag_completion(tag_completion);

    registry
        .get_all(&Query::of_kind(DescriptorKind::Tag), true)
        .into_iter()
        .filter(|descriptor| descriptor.matches(&ctx))
        .map(|descriptor| descriptor.suggestion(&ctx))
        .collect()
}

pub(super) fn suggest_attributes(
    request: &CompletionRequest<'_>,
    tag_start: usize,
    tag_name: &str,
    registry: &mut Registry,
    resolver: &mut TaglibResolver,
) -> Vec<Suggestion> {
    let text = request.text;
    let prefix = completion_prefix(&text[tag_start..request.offset]);
    let head_end = request.offset - prefix.len();
    if !text[..head_end].ends_with(|c: char| c.is_ascii_whitespace()) {
        return Vec::new();
    }
    if !request.accepts_prefix(prefix) {
        return Vec::new();
    }
    let Some((namespace, local_name)) = tag_name.split_once(':') else {
        return Vec::new();
    };

    let declared =
        resolver.find_declared_taglibs(request.before_cursor(), request.file_path, registry);
    let Some(tag) = find_tag(&declared, namespace, local_name) else {
        return Vec::new();
    };

    let tail = tag_tail(&text[request.offset..]);
    let present: HashSet<&str> = extract_attributes(&text[tag_start..head_end])
        .into_iter()
        .chain(extract_attributes(tail))
        .map(|(name, _)| name)
        .collect();

    let ctx = MatchContext::new(prefix, &declared).with_namespace(namespace);
    tag.attributes
        .iter()
        .filter(|attribute| !present.contains(attribute.name.as_str()))
        .map(|attribute| Descriptor::Attribute(Arc::clone(attribute)))
        .filter(|descriptor| descriptor.matches(&ctx))
        .map(|descriptor| descriptor.suggestion(&ctx))
        .collect()
}

pub(super) fn suggest_attribute_values(
    request: &CompletionRequest<'_>,
    attribute: &str,
    value_start: usize,
    registry: &mut Registry,
) -> Vec<Suggestion> {
    let kind = match attribute {
        "var" | "varStatus" => DescriptorKind::Var,
        "scope" => DescriptorKind::Scope,
        _ => return Vec::new(),
    };
    let prefix = completion_prefix(&request.text[value_start..request.offset]);
    if !request.accepts_prefix(prefix) {
        return Vec::new();
    }

    let ctx = MatchContext::new(prefix, &[]);
    registry
        .get_all(&Query::of_kind(kind), true)
        .into_iter()
        .filter(|descriptor| descriptor.matches(&ctx))
        .map(|descriptor| descriptor.suggestion(&ctx))
        .collect()
}

fn find_tag(declared: &[DeclaredTaglib], namespace: &str, local_name: &str) -> Option<Arc<TagDesc>> {
    declared
        .iter()
        .filter(|taglib| taglib.prefix == namespace)
        .find_map(|taglib| taglib.desc.tag(local_name).cloned())
}

/// The rest of the tag name under the cursor.
fn skip_name(after_cursor: &str) -> &str {
    after_cursor.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-' | '.'))
}

/// Position and byte of the first `<` or `>` outside a quoted attribute
/// value.
fn find_tag_delimiter(rest: &str) -> Option<(usize, u8)> {
    let mut quote: Option<u8> = None;
    for (i, &b) in rest.as_bytes().iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'<' | b'>' => return Some((i, b)),
                _ => {}
            },
        }
    }
    None
}

/// Is the tag being named already closed, i.e. does a `>` come before the
/// next `<`?
fn is_followed_by_tag_end(after_cursor: &str) -> bool {
    find_tag_delimiter(skip_name(after_cursor)).is_some_and(|(_, b)| b == b'>')
}

/// The remainder of the current start tag after the cursor.
fn tag_tail(after_cursor: &str) -> &str {
    let rest = skip_name(after_cursor);
    let end = find_tag_delimiter(rest).map_or(rest.len(), |(pos, _)| pos);
    &rest[..end]
}
