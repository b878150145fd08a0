//! Text-level scanning of JSP documents.
//!
//! Nothing here parses markup.  Taglib declarations, include directives and
//! variable bindings are found with regular expressions over the raw text,
//! which is all the resolver and the variable scanner need.
//!
//! Recognised forms:
//!
//! - `<%@ taglib prefix="p" uri="u" %>` and `<jsp:directive.taglib prefix="p" uri="u"/>`
//!   (attributes in either order),
//! - `xmlns:p="u"` anywhere in the text,
//! - `<%@ include file="f" %>` and `<jsp:directive.include file="f"/>`,
//! - `var="name"` / `varStatus="name"` on any prefixed tag, and
//!   `<jsp:useBean id="name" class="type">` (attributes in either order).

use std::sync::LazyLock;

use regex::Regex;

static TAGLIB_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<(?:%@\s+taglib|jsp:directive\.taglib)\s+((?:prefix|uri)="[^"]*")\s+((?:prefix|uri)="[^"]*")"#,
    )
    .expect("valid taglib directive regex")
});

static XML_NAMESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"xmlns:([^=\s]+)="([^"]+)""#).expect("valid xmlns regex"));

static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:%@\s+include|jsp:directive\.include)\s+file="([^"]*)""#)
        .expect("valid include directive regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*"([^"]*)""#).expect("valid attribute regex")
});

static CUSTOM_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z]+:[a-zA-Z]+\s[^>]*>").expect("valid custom tag regex"));

/// Attributes of a custom tag that bind a page variable.
const VARIABLE_ATTRIBUTES: [&str; 2] = ["var", "varStatus"];

static USE_BEAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<jsp:useBean\b[^>]*>").expect("valid useBean regex"));

/// A `prefix → uri` binding found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaglibDeclaration {
    pub prefix: String,
    pub uri: String,
}

/// Everything the resolver needs to know about one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfos {
    /// Both directive forms, in text order.
    pub taglib_declaration_directives: Vec<TaglibDeclaration>,
    /// `xmlns:` declarations, in text order.  Their scope is taken to extend
    /// to the end of the file.
    pub taglib_declaration_namespaces: Vec<TaglibDeclaration>,
    /// Raw `file` values of include directives, in text order.
    pub include_directives: Vec<String>,
}

/// Scan a document for taglib declarations and include directives.
pub fn scan_text(text: &str) -> FileInfos {
    let mut infos = FileInfos::default();

    for m in TAGLIB_DIRECTIVE.find_iter(text) {
        let attrs = extract_attributes(m.as_str());
        if let (Some(prefix), Some(uri)) = (attribute(&attrs, "prefix"), attribute(&attrs, "uri")) {
            infos.taglib_declaration_directives.push(TaglibDeclaration {
                prefix: prefix.to_string(),
                uri: uri.to_string(),
            });
        }
    }

    for caps in XML_NAMESPACE.captures_iter(text) {
        infos.taglib_declaration_namespaces.push(TaglibDeclaration {
            prefix: caps[1].to_string(),
            uri: caps[2].to_string(),
        });
    }

    infos.include_directives = INCLUDE_DIRECTIVE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect();

    infos
}

/// All `name="value"` pairs in `text`, in order of appearance.
pub fn extract_attributes(text: &str) -> Vec<(&str, &str)> {
    ATTRIBUTE
        .captures_iter(text)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect()
}

/// The value of the last attribute called `name`.
pub fn attribute<'a>(attrs: &[(&'a str, &'a str)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .rev()
        .find(|(attr, _)| *attr == name)
        .map(|(_, value)| *value)
}

/// Where a variable binding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    /// `var` / `varStatus` on a custom tag.
    TagAttribute,
    /// `<jsp:useBean id class>`.
    Bean,
}

/// A variable introduced by document markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBinding {
    pub name: String,
    pub var_type: Option<String>,
    pub source: BindingSource,
}

/// Every variable binding in `text`, in text order.
pub fn scan_variables(text: &str) -> Vec<VariableBinding> {
    let mut found: Vec<(usize, VariableBinding)> = Vec::new();

    for m in CUSTOM_TAG.find_iter(text) {
        for (attr, value) in extract_attributes(m.as_str()) {
            let name = value.trim();
            if !VARIABLE_ATTRIBUTES.contains(&attr) || name.is_empty() {
                continue;
            }
            found.push((
                m.start(),
                VariableBinding {
                    name: name.to_string(),
                    var_type: None,
                    source: BindingSource::TagAttribute,
                },
            ));
        }
    }

    for m in USE_BEAN.find_iter(text) {
        let attrs = extract_attributes(m.as_str());
        let (Some(id), Some(class)) = (attribute(&attrs, "id"), attribute(&attrs, "class")) else {
            continue;
        };
        if id.trim().is_empty() {
            continue;
        }
        found.push((
            m.start(),
            VariableBinding {
                name: id.trim().to_string(),
                var_type: Some(class.trim().to_string()),
                source: BindingSource::Bean,
            },
        ));
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, binding)| binding).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(prefix: &str, uri: &str) -> TaglibDeclaration {
        TaglibDeclaration {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
        }
    }

    #[test]
    fn directive_forms_in_text_order() {
        let text = concat!(
            "<%@ taglib\nuri=\"http://example.com/jsp/test\" prefix=\"a\" %>\n",
            "<jsp:directive.taglib prefix=\"b\" uri=\"urn:b\" />\n",
            "<%@ taglib prefix=\"c\" uri=\"urn:c\"%>",
        );
        let infos = scan_text(text);
        assert_eq!(
            infos.taglib_declaration_directives,
            vec![
                decl("a", "http://example.com/jsp/test"),
                decl("b", "urn:b"),
                decl("c", "urn:c"),
            ]
        );
        assert!(infos.taglib_declaration_namespaces.is_empty());
    }

    #[test]
    fn namespaces_and_includes() {
        let text = concat!(
            "<jsp:root xmlns:jsp=\"http://java.sun.com/JSP/Page\" xmlns:t=\"urn:t\">\n",
            "<%@ include file=\"header.jspf\" %>\n",
            "<jsp:directive.include file=\"/WEB-INF/footer.jspf\"/>\n",
        );
        let infos = scan_text(text);
        assert_eq!(
            infos.taglib_declaration_namespaces,
            vec![decl("jsp", "http://java.sun.com/JSP/Page"), decl("t", "urn:t")]
        );
        assert_eq!(infos.include_directives, ["header.jspf", "/WEB-INF/footer.jspf"]);
    }

    #[test]
    fn incomplete_directive_is_ignored() {
        let infos = scan_text("<%@ taglib prefix=\"a\" %>");
        assert!(infos.taglib_declaration_directives.is_empty());
    }

    #[test]
    fn attributes_are_extracted_in_order() {
        let attrs = extract_attributes(r#"<x:y a="1" b = "two" a="3">"#);
        assert_eq!(attrs, [("a", "1"), ("b", "two"), ("a", "3")]);
        assert_eq!(attribute(&attrs, "a"), Some("3"));
        assert_eq!(attribute(&attrs, "c"), None);
    }

    #[test]
    fn variables_from_tags_and_beans() {
        let text = concat!(
            "<c:forEach items=\"${list}\" var=\"row\" varStatus=\"st\">\n",
            "<jsp:useBean class=\"com.acme.Cart\" id=\"cart\" scope=\"session\"/>\n",
            "<c:set myvar=\"nope\"/>\n",
            "<c:set var=\"total\" value=\"0\"/>\n",
        );
        let bindings = scan_variables(text);
        let names: Vec<_> = bindings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["row", "st", "cart", "total"]);
        assert_eq!(bindings[2].var_type.as_deref(), Some("com.acme.Cart"));
        assert_eq!(bindings[2].source, BindingSource::Bean);
        assert_eq!(bindings[0].source, BindingSource::TagAttribute);
    }
}
