//! Descriptor model.
//!
//! Every entity that can be completed (taglibs, taglib functions, tags,
//! tag attributes, EL variables, EL keywords and variable scopes) is a
//! descriptor.  Descriptors are immutable value objects that know how to
//! test themselves against a completion prefix ([`Descriptor::matches`])
//! and how to render themselves ([`Descriptor::suggestion`]).
//!
//! The set of variants is closed, so they are modelled as one sum type
//! ([`Descriptor`]) and the registry indexes them by [`DescriptorKind`].

mod simple;
pub mod snippet;
mod taglib;

use std::sync::{Arc, LazyLock};

use regex::Regex;
use thiserror::Error;

use crate::types::{DeclaredTaglib, Suggestion};

pub use simple::{KeywordDesc, ScopeDesc, VarDesc};
pub use taglib::{TagAttrDesc, TagDesc, TagFunctionDesc, TaglibDesc};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("descriptor name must not be empty")]
    EmptyName,
    #[error("taglib `{0}` has no uri")]
    EmptyUri(String),
}

/// A trimmed, non-empty name plus its camel-case abbreviation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescName {
    name: String,
    abbreviated: String,
}

impl DescName {
    pub fn new(raw: &str) -> Result<Self, DescriptorError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(DescriptorError::EmptyName);
        }
        Ok(Self {
            name: name.to_string(),
            abbreviated: abbreviate(name),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn abbreviated(&self) -> &str {
        &self.abbreviated
    }

    /// Plain (non-namespaced) prefix match.  `prefix` must be lower case.
    pub fn matches(&self, prefix: &str) -> bool {
        check(&self.name, prefix) || check(&self.abbreviated, prefix)
    }

    /// Prefix match for an item that lives in a taglib bound to `namespace`.
    ///
    /// When the namespace and the typed prefix overlap (either is a prefix
    /// of the other) the qualified forms `ns:name` / `ns:abbreviation` are
    /// tested, otherwise the bare name and abbreviation.
    pub fn matches_in_namespace(&self, namespace: &str, prefix: &str) -> bool {
        let ns = namespace.to_lowercase();
        if ns.starts_with(prefix) || prefix.starts_with(ns.as_str()) {
            format!("{ns}:{}", self.name)
                .to_lowercase()
                .starts_with(prefix)
                || format!("{ns}:{}", self.abbreviated).starts_with(prefix)
        } else {
            self.name.to_lowercase().starts_with(prefix) || self.abbreviated.starts_with(prefix)
        }
    }
}

/// First character plus every ASCII upper-case letter, lower-cased.
///
/// `initParam` → `ip`, `forEach` → `fe`.
pub fn abbreviate(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    std::iter::once(first)
        .chain(chars.filter(char::is_ascii_uppercase))
        .collect::<String>()
        .to_lowercase()
}

/// Does `name` start with `prefix`, either verbatim or once lower-cased?
/// `prefix` is expected to be lower case already.
pub fn check(name: &str, prefix: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    name.starts_with(prefix) || name.to_lowercase().starts_with(prefix)
}

static SHORT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z_$][a-zA-Z_$0-9\[\]]*(?:\.{3})?)\s*$").expect("valid short type regex")
});

/// The last identifier segment of a (possibly qualified) Java type.
///
/// `java.lang.String` → `String`, `java.lang.Object[]` → `Object[]`,
/// `java.lang.String...` → `String...`.
pub fn to_short_type(long_name: &str) -> String {
    SHORT_TYPE
        .captures(long_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| long_name.trim().to_string())
}

/// Registry type key, one per [`Descriptor`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorKind {
    Taglib,
    Function,
    Tag,
    Attribute,
    Var,
    Keyword,
    Scope,
}

/// How a tag suggestion should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagCompletion {
    /// Full snippet: required attributes and the closing part.
    #[default]
    Full,
    /// The tag is already closed by a `>`; complete the bare name only.
    NameOnly,
    /// Completing a closing tag (`</`); append only the `>`.
    Closing,
}

/// Everything a descriptor needs to decide whether it matches and how to
/// render itself.
#[derive(Debug, Clone)]
pub struct MatchContext<'a> {
    /// Lower-cased completion prefix.
    pub prefix: String,
    /// The prefix as typed; echoed back in every suggestion.
    pub replacement_prefix: &'a str,
    pub declared_taglibs: &'a [DeclaredTaglib],
    pub tag_completion: TagCompletion,
    /// Namespace of the enclosing tag, for attribute labels.
    pub namespace: Option<&'a str>,
}

impl<'a> MatchContext<'a> {
    pub fn new(replacement_prefix: &'a str, declared_taglibs: &'a [DeclaredTaglib]) -> Self {
        Self {
            prefix: replacement_prefix.to_lowercase(),
            replacement_prefix,
            declared_taglibs,
            tag_completion: TagCompletion::Full,
            namespace: None,
        }
    }

    pub fn with_tag_completion(mut self, tag_completion: TagCompletion) -> Self {
        self.tag_completion = tag_completion;
        self
    }

    pub fn with_namespace(mut self, namespace: &'a str) -> Self {
        self.namespace = Some(namespace);
        self
    }
}

/// Any entity the registry can hold.
#[derive(Debug, Clone)]
pub enum Descriptor {
    Taglib(Arc<TaglibDesc>),
    Function(Arc<TagFunctionDesc>),
    Tag(Arc<TagDesc>),
    Attribute(Arc<TagAttrDesc>),
    Var(Arc<VarDesc>),
    Keyword(Arc<KeywordDesc>),
    Scope(Arc<ScopeDesc>),
}

impl Descriptor {
    pub fn kind(&self) -> DescriptorKind {
        match self {
            Descriptor::Taglib(_) => DescriptorKind::Taglib,
            Descriptor::Function(_) => DescriptorKind::Function,
            Descriptor::Tag(_) => DescriptorKind::Tag,
            Descriptor::Attribute(_) => DescriptorKind::Attribute,
            Descriptor::Var(_) => DescriptorKind::Var,
            Descriptor::Keyword(_) => DescriptorKind::Keyword,
            Descriptor::Scope(_) => DescriptorKind::Scope,
        }
    }

    fn desc_name(&self) -> &DescName {
        match self {
            Descriptor::Taglib(d) => &d.name,
            Descriptor::Function(d) => &d.name,
            Descriptor::Tag(d) => &d.name,
            Descriptor::Attribute(d) => &d.name,
            Descriptor::Var(d) => &d.name,
            Descriptor::Keyword(d) => &d.name,
            Descriptor::Scope(d) => &d.name,
        }
    }

    pub fn name(&self) -> &str {
        self.desc_name().as_str()
    }

    pub fn abbreviated_name(&self) -> &str {
        self.desc_name().abbreviated()
    }

    /// Named string property, used by registry filter rules.
    pub fn property(&self, name: &str) -> Option<&str> {
        match name {
            "name" => return Some(self.name()),
            "abbreviatedName" => return Some(self.abbreviated_name()),
            _ => {}
        }
        match (self, name) {
            (Descriptor::Taglib(d), "uri") => Some(d.uri.as_str()),
            (Descriptor::Taglib(d), "shortName") => Some(d.short_name()),
            (Descriptor::Taglib(d), "fullName") => Some(d.full_name.as_str()),
            (Descriptor::Taglib(d), "description") => Some(d.description.as_str()),
            (Descriptor::Function(d), "uri") => Some(d.taglib_uri.as_str()),
            (Descriptor::Function(d), "class") => Some(d.class.as_str()),
            (Descriptor::Function(d), "signature") => Some(d.signature.as_str()),
            (Descriptor::Function(d), "returnType") => Some(d.return_type.as_str()),
            (Descriptor::Function(d), "description") => Some(d.description.as_str()),
            (Descriptor::Tag(d), "uri") => Some(d.taglib_uri.as_str()),
            (Descriptor::Tag(d), "class") => Some(d.class.as_str()),
            (Descriptor::Tag(d), "content") => Some(d.content.as_str()),
            (Descriptor::Tag(d), "description") => Some(d.description.as_str()),
            (Descriptor::Attribute(d), "type") => Some(d.attr_type.as_str()),
            (Descriptor::Attribute(d), "description") => Some(d.description.as_str()),
            (Descriptor::Var(d), "type") => Some(d.var_type.as_str()),
            (Descriptor::Var(d), "description") => Some(d.description.as_str()),
            (Descriptor::Keyword(d), "fullName") => Some(d.full_name.as_str()),
            (Descriptor::Keyword(d), "description") => Some(d.description.as_str()),
            (Descriptor::Scope(d), "description") => Some(d.description.as_str()),
            _ => None,
        }
    }

    /// Does this descriptor match the completion prefix in `ctx`?
    pub fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        match self {
            Descriptor::Function(d) => d.matches(ctx),
            Descriptor::Tag(d) => d.matches(ctx),
            _ => self.desc_name().matches(&ctx.prefix),
        }
    }

    /// Render this descriptor as a completion suggestion.
    pub fn suggestion(&self, ctx: &MatchContext<'_>) -> Suggestion {
        match self {
            Descriptor::Taglib(d) => d.suggestion(ctx),
            Descriptor::Function(d) => d.suggestion(ctx),
            Descriptor::Tag(d) => d.suggestion(ctx),
            Descriptor::Attribute(d) => d.suggestion(ctx),
            Descriptor::Var(d) => d.suggestion(ctx),
            Descriptor::Keyword(d) => d.suggestion(ctx),
            Descriptor::Scope(d) => d.suggestion(ctx),
        }
    }
}

impl std::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
