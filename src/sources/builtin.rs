//! Entries every JSP document can complete without declaring anything:
//! the EL operator keywords, the EL implicit objects and the four
//! attribute scopes.

use std::sync::Arc;

use crate::descriptor::{Descriptor, DescriptorError, KeywordDesc, ScopeDesc, VarDesc};
use crate::registry::{NewEntry, Registry};

/// `(keyword, full name, description)`
const KEYWORDS: &[(&str, &str, &str)] = &[
    ("div", "divide", "Division."),
    ("mod", "modulo", "Modulo (remainder)."),
    ("eq", "equal", "Test for equality."),
    ("ne", "not equal", "Test for inequality."),
    ("lt", "less than", "Test for less than."),
    ("gt", "greater than", "Test for greater than."),
    ("le", "less or equal", "Test for less or equal."),
    ("ge", "greater or equal", "Test for greater or equal."),
    ("and", "logical and", "Test for logical and."),
    ("or", "logical or", "Test for logical or."),
    ("not", "negation", "Negation."),
    ("empty", "is empty", "Test for empty variable values."),
];

/// `(name, type, description)`
const IMPLICIT_OBJECTS: &[(&str, &str, &str)] = &[
    ("pageContext", "PageContext", "The context for the JSP page."),
    ("param", "Map", "Maps a request parameter name to a single value."),
    ("paramValues", "Map", "Maps a request parameter name to an array of values."),
    ("header", "Map", "Maps a request header name to a single value."),
    ("headerValues", "Map", "Maps a request header name to an array of values."),
    ("cookie", "Map", "Maps a cookie name to a single cookie."),
    (
        "initParam",
        "Map",
        "Maps a context initialization parameter name to a single value.",
    ),
    ("pageScope", "Map", "Maps page-scoped variable names to their values."),
    ("requestScope", "Map", "Maps request-scoped variable names to their values."),
    ("sessionScope", "Map", "Maps session-scoped variable names to their values."),
    (
        "applicationScope",
        "Map",
        "Maps application-scoped variable names to their values.",
    ),
];

/// `(name, description)`
const SCOPES: &[(&str, &str)] = &[
    ("application", "Visible to the whole web application."),
    ("page", "Visible to the current page only."),
    ("request", "Visible while the current request is processed."),
    ("session", "Visible for the user's session."),
];

pub fn implicit_object_names() -> impl Iterator<Item = &'static str> {
    IMPLICIT_OBJECTS.iter().map(|(name, _, _)| *name)
}

/// Register keywords, implicit objects and scopes.  Returns how many
/// entries were added.
pub fn register(registry: &mut Registry) -> Result<usize, DescriptorError> {
    let mut added = 0;
    for (keyword, full_name, description) in KEYWORDS {
        let desc = KeywordDesc::new(keyword, full_name, description)?;
        registry.add(NewEntry::new(Descriptor::Keyword(Arc::new(desc))));
        added += 1;
    }
    for (name, ty, description) in IMPLICIT_OBJECTS {
        let desc = VarDesc::new(name)?.with_type(ty).with_description(description);
        registry.add(NewEntry::new(Descriptor::Var(Arc::new(desc))));
        added += 1;
    }
    for (name, description) in SCOPES {
        let desc = ScopeDesc::new(name, description)?;
        registry.add(NewEntry::new(Descriptor::Scope(Arc::new(desc))));
        added += 1;
    }
    Ok(added)
}
