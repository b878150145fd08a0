//! Taglib descriptors: the library itself, its functions, its tags and
//! their attributes.
//!
//! A [`TaglibDesc`] owns its functions and tags.  Functions and tags keep
//! the owning taglib's `uri` as a back reference; an attribute keeps the
//! name of its tag.  The namespace a function or tag is rendered under is
//! whatever prefix the current document binds that `uri` to.

use std::sync::Arc;

use super::snippet::{jump, wrap_expression};
use super::{DescName, DescriptorError, MatchContext, TagCompletion, to_short_type};
use crate::types::{Suggestion, SuggestionKind, namespace_for};

/// `body-content` value of a tag that never has a body.
const EMPTY_BODY: &str = "empty";

// ─── Taglib ─────────────────────────────────────────────────────────────────

/// A tag library, identified by its `uri`.
///
/// The descriptor name is the library's short name (the prefix it suggests
/// for itself).
#[derive(Debug, Clone)]
pub struct TaglibDesc {
    pub name: DescName,
    pub uri: String,
    pub full_name: String,
    pub description: String,
    pub functions: Vec<Arc<TagFunctionDesc>>,
    pub tags: Vec<Arc<TagDesc>>,
}

impl TaglibDesc {
    pub fn new(short_name: &str, uri: &str) -> Result<Self, DescriptorError> {
        let name = DescName::new(short_name)?;
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(DescriptorError::EmptyUri(name.as_str().to_string()));
        }
        Ok(Self {
            name,
            uri: uri.to_string(),
            full_name: String::new(),
            description: String::new(),
            functions: Vec::new(),
            tags: Vec::new(),
        })
    }

    pub fn short_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn with_full_name(mut self, full_name: &str) -> Self {
        self.full_name = full_name.trim().to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.trim().to_string();
        self
    }

    /// Attach a function; it is re-parented onto this taglib's `uri`.
    pub fn with_function(mut self, mut function: TagFunctionDesc) -> Self {
        function.taglib_uri = self.uri.clone();
        self.functions.push(Arc::new(function));
        self
    }

    /// Attach a tag; it is re-parented onto this taglib's `uri`.
    pub fn with_tag(mut self, mut tag: TagDesc) -> Self {
        tag.taglib_uri = self.uri.clone();
        self.tags.push(Arc::new(tag));
        self
    }

    pub fn tag(&self, name: &str) -> Option<&Arc<TagDesc>> {
        self.tags.iter().find(|tag| tag.name.as_str() == name)
    }

    pub(crate) fn suggestion(&self, ctx: &MatchContext<'_>) -> Suggestion {
        Suggestion::new(SuggestionKind::Namespace, ctx.replacement_prefix)
            .with_snippet(format!("{}:$0", self.name.as_str()))
            .with_description(&self.description)
    }
}

// ─── Functions ──────────────────────────────────────────────────────────────

/// A function exported by a taglib, callable from EL as `ns:name(...)`.
#[derive(Debug, Clone)]
pub struct TagFunctionDesc {
    pub name: DescName,
    pub taglib_uri: String,
    /// Fully qualified class implementing the function.
    pub class: String,
    pub signature: String,
    pub example: String,
    pub description: String,
    pub return_type: String,
    pub short_return_type: String,
    pub argument_types: Vec<String>,
}

impl TagFunctionDesc {
    pub fn new(name: &str) -> Result<Self, DescriptorError> {
        Ok(Self {
            name: DescName::new(name)?,
            taglib_uri: String::new(),
            class: String::new(),
            signature: String::new(),
            example: String::new(),
            description: String::new(),
            return_type: String::new(),
            short_return_type: String::new(),
            argument_types: Vec::new(),
        })
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = class.trim().to_string();
        self
    }

    pub fn with_signature(mut self, signature: &str) -> Self {
        self.signature = signature.trim().to_string();
        self
    }

    pub fn with_example(mut self, example: &str) -> Self {
        self.example = example.trim().to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.trim().to_string();
        self
    }

    pub fn with_return_type(mut self, return_type: &str) -> Self {
        self.return_type = return_type.trim().to_string();
        self.short_return_type = if self.return_type.is_empty() {
            String::new()
        } else {
            to_short_type(&self.return_type)
        };
        self
    }

    pub fn with_argument_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argument_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// `ns:name(${1:T1}, ${2:T2})`, or `name(...)` without a namespace.
    pub fn snippet(&self, namespace: Option<&str>) -> String {
        let args = self
            .argument_types
            .iter()
            .enumerate()
            .map(|(i, ty)| jump(i + 1, &to_short_type(ty)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}{}({args})", qualifier(namespace), self.name.as_str())
    }

    pub(crate) fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        namespace_for(ctx.declared_taglibs, &self.taglib_uri)
            .is_some_and(|ns| self.name.matches_in_namespace(ns, &ctx.prefix))
    }

    pub(crate) fn suggestion(&self, ctx: &MatchContext<'_>) -> Suggestion {
        let ns = namespace_for(ctx.declared_taglibs, &self.taglib_uri);
        Suggestion::new(SuggestionKind::Function, ctx.replacement_prefix)
            .with_snippet(self.snippet(ns))
            .with_display_text(format!("{}{}", qualifier(ns), self.name.as_str()))
            .with_left_label(&self.short_return_type)
            .with_description(&self.description)
    }
}

// ─── Tags ───────────────────────────────────────────────────────────────────

/// A custom tag.
#[derive(Debug, Clone)]
pub struct TagDesc {
    pub name: DescName,
    pub taglib_uri: String,
    pub class: String,
    pub description: String,
    /// `body-content`; `"empty"` means the tag is self-closing.
    pub content: String,
    pub attributes: Vec<Arc<TagAttrDesc>>,
}

impl TagDesc {
    pub fn new(name: &str) -> Result<Self, DescriptorError> {
        Ok(Self {
            name: DescName::new(name)?,
            taglib_uri: String::new(),
            class: String::new(),
            description: String::new(),
            content: String::new(),
            attributes: Vec::new(),
        })
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = class.trim().to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.trim().to_string();
        self
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.trim().to_string();
        self
    }

    /// Attach an attribute; it is re-parented onto this tag.
    pub fn with_attribute(mut self, mut attribute: TagAttrDesc) -> Self {
        attribute.tag_name = self.name.as_str().to_string();
        self.attributes.push(Arc::new(attribute));
        self
    }

    pub fn is_self_closing(&self) -> bool {
        self.content == EMPTY_BODY
    }

    /// The full start-tag snippet: one placeholder per required attribute,
    /// a free tab stop when optional attributes exist, then either `/>` or
    /// a body stop and the matching end tag.
    pub fn snippet(&self, namespace: Option<&str>) -> String {
        let qualified = format!("{}{}", qualifier(namespace), self.name.as_str());
        let required: Vec<_> = self.attributes.iter().filter(|a| a.required).collect();
        let has_optional = required.len() < self.attributes.len();

        let mut out = qualified.clone();
        for (i, attribute) in required.iter().enumerate() {
            out.push(' ');
            out.push_str(&attribute.snippet(i + 1));
        }
        if has_optional {
            out.push_str(&jump(required.len() + 1, ""));
        }
        if self.is_self_closing() {
            out.push_str("/>$0");
        } else {
            out.push_str(">$0</");
            out.push_str(&qualified);
            out.push('>');
        }
        out
    }

    pub(crate) fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        namespace_for(ctx.declared_taglibs, &self.taglib_uri)
            .is_some_and(|ns| self.name.matches_in_namespace(ns, &ctx.prefix))
    }

    pub(crate) fn suggestion(&self, ctx: &MatchContext<'_>) -> Suggestion {
        let ns = namespace_for(ctx.declared_taglibs, &self.taglib_uri);
        let qualified = format!("{}{}", qualifier(ns), self.name.as_str());
        let snippet = match ctx.tag_completion {
            TagCompletion::NameOnly => qualified.clone(),
            TagCompletion::Closing => format!("{qualified}>"),
            TagCompletion::Full => self.snippet(ns),
        };
        Suggestion::new(SuggestionKind::Tag, ctx.replacement_prefix)
            .with_snippet(snippet)
            .with_display_text(qualified)
            .with_description(&self.description)
    }
}

// ─── Attributes ─────────────────────────────────────────────────────────────

/// An attribute of a custom tag.
#[derive(Debug, Clone)]
pub struct TagAttrDesc {
    pub name: DescName,
    pub tag_name: String,
    pub description: String,
    pub attr_type: String,
    pub short_type: String,
    pub required: bool,
    /// Whether the value may be a runtime expression.
    pub rtexprvalue: bool,
}

impl TagAttrDesc {
    pub fn new(name: &str) -> Result<Self, DescriptorError> {
        Ok(Self {
            name: DescName::new(name)?,
            tag_name: String::new(),
            description: String::new(),
            attr_type: String::new(),
            short_type: String::new(),
            required: false,
            rtexprvalue: false,
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.trim().to_string();
        self
    }

    pub fn with_type(mut self, attr_type: &str) -> Self {
        self.attr_type = attr_type.trim().to_string();
        self.short_type = if self.attr_type.is_empty() {
            String::new()
        } else {
            to_short_type(&self.attr_type)
        };
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn rtexprvalue(mut self, rtexprvalue: bool) -> Self {
        self.rtexprvalue = rtexprvalue;
        self
    }

    /// `name="…"` with the value as tab stop `index`.
    ///
    /// Static attributes get a bare stop.  Dynamic `String` attributes get
    /// a placeholder holding `${String}`; any other dynamic attribute gets
    /// its short type as placeholder inside literal expression delimiters.
    pub fn snippet(&self, index: usize) -> String {
        let value = if !self.rtexprvalue {
            jump(index, "")
        } else if self.short_type == "String" {
            jump(index, &format!("${{{}}}", self.short_type))
        } else {
            wrap_expression(&jump(index, &self.short_type))
        };
        format!("{}=\"{value}\"", self.name.as_str())
    }

    pub(crate) fn suggestion(&self, ctx: &MatchContext<'_>) -> Suggestion {
        let left = [
            (!self.rtexprvalue).then_some("static"),
            Some(self.short_type.as_str()).filter(|s| !s.is_empty()),
            self.required.then_some("required"),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");

        Suggestion::new(SuggestionKind::Attribute, ctx.replacement_prefix)
            .with_snippet(self.snippet(1))
            .with_display_text(self.name.as_str())
            .with_description(&self.description)
            .with_left_label(left)
            .with_right_label(format!("<{}{}>", qualifier(ctx.namespace), self.tag_name))
    }
}

fn qualifier(namespace: Option<&str>) -> String {
    namespace.map(|ns| format!("{ns}:")).unwrap_or_default()
}
