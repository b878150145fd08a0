//! Stand-alone descriptors: EL variables, EL keywords and variable scopes.

use super::{DescName, DescriptorError, MatchContext, to_short_type};
use crate::types::{Suggestion, SuggestionKind};

/// A variable visible inside EL expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDesc {
    pub name: DescName,
    pub var_type: String,
    pub short_type: String,
    pub description: String,
}

impl VarDesc {
    pub fn new(name: &str) -> Result<Self, DescriptorError> {
        Ok(Self {
            name: DescName::new(name)?,
            var_type: String::new(),
            short_type: String::new(),
            description: String::new(),
        })
    }

    pub fn with_type(mut self, var_type: &str) -> Self {
        self.var_type = var_type.trim().to_string();
        self.short_type = if self.var_type.is_empty() {
            String::new()
        } else {
            to_short_type(&self.var_type)
        };
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.trim().to_string();
        self
    }

    pub(crate) fn suggestion(&self, ctx: &MatchContext<'_>) -> Suggestion {
        Suggestion::new(SuggestionKind::Variable, ctx.replacement_prefix)
            .with_text(self.name.as_str())
            .with_left_label(&self.short_type)
            .with_description(&self.description)
    }
}

/// An EL operator keyword such as `ne` or `empty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordDesc {
    pub name: DescName,
    pub full_name: String,
    pub description: String,
}

impl KeywordDesc {
    pub fn new(keyword: &str, full_name: &str, description: &str) -> Result<Self, DescriptorError> {
        Ok(Self {
            name: DescName::new(keyword)?,
            full_name: full_name.trim().to_string(),
            description: description.trim().to_string(),
        })
    }

    /// Inserts the keyword followed by a space.
    pub(crate) fn suggestion(&self, ctx: &MatchContext<'_>) -> Suggestion {
        Suggestion::new(SuggestionKind::Keyword, ctx.replacement_prefix)
            .with_text(format!("{} ", self.name.as_str()))
            .with_right_label(&self.full_name)
            .with_description(&self.description)
    }
}

/// One of the four attribute scopes (`page`, `request`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeDesc {
    pub name: DescName,
    pub description: String,
}

impl ScopeDesc {
    pub fn new(name: &str, description: &str) -> Result<Self, DescriptorError> {
        Ok(Self {
            name: DescName::new(name)?,
            description: description.trim().to_string(),
        })
    }

    pub(crate) fn suggestion(&self, ctx: &MatchContext<'_>) -> Suggestion {
        Suggestion::new(SuggestionKind::Namespace, ctx.replacement_prefix)
            .with_text(self.name.as_str())
            .with_description(&self.description)
    }
}
