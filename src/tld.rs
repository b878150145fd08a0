//! Tag library descriptor (TLD) parsing.
//!
//! A TLD is deserialised into raw serde structs first and then converted
//! into a [`TaglibDesc`].  Parsing is best effort: unknown elements are
//! ignored and only the fields completion cannot do without are required.
//! Both the JSP 2.x element names (`short-name`, `tag-class`,
//! `body-content`) and the JSP 1.1 ones (`shortname`, `tagclass`,
//! `bodycontent`) are accepted.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::descriptor::{DescriptorError, TagAttrDesc, TagDesc, TagFunctionDesc, TaglibDesc};

#[derive(Debug, Error)]
pub enum TldError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a valid tag library descriptor", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },
    #[error("{} is missing required element <{field}>", path.display())]
    MissingField { path: PathBuf, field: &'static str },
    #[error("{}: cannot parse function signature \"{signature}\"", path.display())]
    Signature { path: PathBuf, signature: String },
    #[error("{} contains an invalid entry", path.display())]
    Descriptor {
        path: PathBuf,
        #[source]
        source: DescriptorError,
    },
}

impl TldError {
    /// The descriptor file the error is about.
    pub fn path(&self) -> &Path {
        match self {
            TldError::Io { path, .. }
            | TldError::Xml { path, .. }
            | TldError::MissingField { path, .. }
            | TldError::Signature { path, .. }
            | TldError::Descriptor { path, .. } => path,
        }
    }
}

// ─── Raw schema ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawTaglib {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default, alias = "shortname")]
    short_name: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    description: Vec<String>,
    #[serde(default, rename = "function")]
    functions: Vec<RawFunction>,
    #[serde(default, rename = "tag")]
    tags: Vec<RawTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    function_class: Option<String>,
    #[serde(default)]
    function_signature: Option<String>,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    description: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawTag {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "tagclass")]
    tag_class: Option<String>,
    #[serde(default, alias = "bodycontent")]
    body_content: Option<String>,
    #[serde(default)]
    description: Vec<String>,
    #[serde(default, rename = "attribute")]
    attributes: Vec<RawAttribute>,
}

#[derive(Debug, Deserialize)]
struct RawAttribute {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Vec<String>,
    #[serde(default, rename = "type")]
    attr_type: Option<String>,
    #[serde(default)]
    required: Option<String>,
    #[serde(default)]
    rtexprvalue: Option<String>,
}

// ─── Signatures ─────────────────────────────────────────────────────────────

static SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"((?:[A-Za-z_$][\w$]*\.)*[A-Za-z_$][\w$]*(?:\[\])*)\s+([A-Za-z_$][\w$]*)\s*\(([^)]*)\)",
    )
    .expect("valid function signature regex")
});

/// A parsed `ReturnType name(Arg1, Arg2)` signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Fully qualified return type.
    pub return_type: String,
    pub name: String,
    /// Fully qualified argument types.
    pub argument_types: Vec<String>,
}

pub fn parse_function_signature(signature: &str) -> Option<FunctionSignature> {
    let caps = SIGNATURE.captures(signature)?;
    let argument_types = caps[3]
        .split(',')
        .map(str::trim)
        .filter(|arg| !arg.is_empty())
        .map(str::to_string)
        .collect();
    Some(FunctionSignature {
        return_type: caps[1].to_string(),
        name: caps[2].to_string(),
        argument_types,
    })
}

/// `required` / `rtexprvalue`: anything other than `false` is true, an
/// absent element is false.
fn parse_bool(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().eq_ignore_ascii_case("false"))
}

fn first(values: &[String]) -> &str {
    values.first().map(String::as_str).unwrap_or_default()
}

// ─── Conversion ─────────────────────────────────────────────────────────────

/// Read and parse the TLD at `path`.
pub fn load_tld(path: &Path) -> Result<TaglibDesc, TldError> {
    let xml = std::fs::read_to_string(path).map_err(|source| TldError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tld(path, &xml)
}

/// Parse the TLD `xml`; `path` is only used in errors.
pub fn parse_tld(path: &Path, xml: &str) -> Result<TaglibDesc, TldError> {
    let raw: RawTaglib = quick_xml::de::from_str(xml).map_err(|source| TldError::Xml {
        path: path.to_path_buf(),
        source,
    })?;

    let missing = |field: &'static str| TldError::MissingField {
        path: path.to_path_buf(),
        field,
    };
    let invalid = |source: DescriptorError| TldError::Descriptor {
        path: path.to_path_buf(),
        source,
    };

    let short_name = raw.short_name.as_deref().ok_or_else(|| missing("short-name"))?;
    let uri = raw.uri.as_deref().ok_or_else(|| missing("uri"))?;

    let mut taglib = TaglibDesc::new(short_name, uri)
        .map_err(invalid)?
        .with_full_name(raw.display_name.as_deref().unwrap_or_default())
        .with_description(first(&raw.description));

    for function in &raw.functions {
        let name = function.name.as_deref().ok_or_else(|| missing("name"))?;
        let signature = function
            .function_signature
            .as_deref()
            .ok_or_else(|| missing("function-signature"))?;
        let parsed = parse_function_signature(signature).ok_or_else(|| TldError::Signature {
            path: path.to_path_buf(),
            signature: signature.to_string(),
        })?;

        taglib = taglib.with_function(
            TagFunctionDesc::new(name)
                .map_err(invalid)?
                .with_class(function.function_class.as_deref().unwrap_or_default())
                .with_signature(signature)
                .with_example(function.example.as_deref().unwrap_or_default())
                .with_description(first(&function.description))
                .with_return_type(&parsed.return_type)
                .with_argument_types(parsed.argument_types),
        );
    }

    for tag in &raw.tags {
        let name = tag.name.as_deref().ok_or_else(|| missing("name"))?;
        let mut desc = TagDesc::new(name)
            .map_err(invalid)?
            .with_class(tag.tag_class.as_deref().unwrap_or_default())
            .with_description(first(&tag.description))
            .with_content(tag.body_content.as_deref().unwrap_or_default());

        for attribute in &tag.attributes {
            let name = attribute.name.as_deref().ok_or_else(|| missing("name"))?;
            desc = desc.with_attribute(
                TagAttrDesc::new(name)
                    .map_err(invalid)?
                    .with_description(first(&attribute.description))
                    .with_type(attribute.attr_type.as_deref().unwrap_or_default())
                    .required(parse_bool(attribute.required.as_deref()))
                    .rtexprvalue(parse_bool(attribute.rtexprvalue.as_deref())),
            );
        }
        taglib = taglib.with_tag(desc);
    }

    Ok(taglib)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TLD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<taglib xmlns="http://java.sun.com/xml/ns/javaee" version="2.1">
    <description>Test library</description>
    <display-name>Test</display-name>
    <tlib-version>1.0</tlib-version>
    <short-name>test</short-name>
    <uri>http://example.com/jsp/test</uri>

    <tag>
        <description>Tag for iteration.</description>
        <name>forEach</name>
        <tag-class>com.example.ForEachTag</tag-class>
        <body-content>JSP</body-content>
        <attribute>
            <description>Items to iterate over.</description>
            <name>items</name>
            <required>false</required>
            <rtexprvalue>true</rtexprvalue>
            <type>java.lang.Object</type>
        </attribute>
        <attribute>
            <name>var</name>
            <required>false</required>
            <rtexprvalue>false</rtexprvalue>
        </attribute>
        <attribute>
            <name>requiredTest</name>
            <required>true</required>
        </attribute>
    </tag>

    <function>
        <description>Concatenates two strings.</description>
        <name>concat</name>
        <function-class>com.example.Functions</function-class>
        <function-signature>java.lang.String concat(java.lang.String, java.lang.String)</function-signature>
        <example>${test:concat(a, b)}</example>
    </function>

    <tag>
        <name>out</name>
        <tag-class>com.example.OutTag</tag-class>
        <body-content>empty</body-content>
    </tag>
</taglib>
"#;

    fn path() -> &'static Path {
        Path::new("/tlds/test.tld")
    }

    #[test]
    fn parses_a_complete_descriptor() {
        let taglib = parse_tld(path(), TEST_TLD).unwrap();
        assert_eq!(taglib.short_name(), "test");
        assert_eq!(taglib.uri, "http://example.com/jsp/test");
        assert_eq!(taglib.full_name, "Test");
        assert_eq!(taglib.description, "Test library");

        assert_eq!(taglib.tags.len(), 2);
        let for_each = &taglib.tags[0];
        assert_eq!(for_each.description, "Tag for iteration.");
        assert_eq!(for_each.content, "JSP");
        assert!(taglib.tags[1].is_self_closing());

        let attrs = &for_each.attributes;
        assert_eq!(attrs.len(), 3);
        assert!(attrs[0].rtexprvalue && !attrs[0].required);
        assert_eq!(attrs[0].short_type, "Object");
        assert!(!attrs[1].rtexprvalue);
        assert!(attrs[2].required && !attrs[2].rtexprvalue);

        let concat = &taglib.functions[0];
        assert_eq!(concat.short_return_type, "String");
        assert_eq!(concat.argument_types, ["java.lang.String", "java.lang.String"]);
        assert_eq!(concat.class, "com.example.Functions");
        assert_eq!(concat.taglib_uri, taglib.uri);
    }

    #[test]
    fn missing_uri_is_reported() {
        let xml = "<taglib><short-name>x</short-name></taglib>";
        let err = parse_tld(path(), xml).unwrap_err();
        assert!(matches!(err, TldError::MissingField { field: "uri", .. }));
        assert_eq!(err.path(), path());
    }

    #[test]
    fn malformed_xml_is_reported() {
        let err = parse_tld(path(), "<taglib><uri>x</taglib>").unwrap_err();
        assert!(matches!(err, TldError::Xml { .. }));
    }

    #[test]
    fn bad_signature_is_reported() {
        let xml = r#"<taglib><short-name>x</short-name><uri>urn:x</uri>
            <function><name>f</name><function-signature>nonsense</function-signature></function>
        </taglib>"#;
        assert!(matches!(parse_tld(path(), xml), Err(TldError::Signature { .. })));
    }

    #[test]
    fn jsp_11_element_names() {
        let xml = r#"<taglib><shortname>old</shortname><uri>urn:old</uri>
            <tag><name>t</name><tagclass>T</tagclass><bodycontent>empty</bodycontent></tag>
        </taglib>"#;
        let taglib = parse_tld(path(), xml).unwrap();
        assert_eq!(taglib.short_name(), "old");
        assert_eq!(taglib.tags[0].class, "T");
        assert!(taglib.tags[0].is_self_closing());
    }

    #[test]
    fn signatures() {
        let sig = parse_function_signature("java.lang.String[] split( java.lang.String , int )").unwrap();
        assert_eq!(sig.return_type, "java.lang.String[]");
        assert_eq!(sig.name, "split");
        assert_eq!(sig.argument_types, ["java.lang.String", "int"]);

        let sig = parse_function_signature("boolean isEmpty()").unwrap();
        assert!(sig.argument_types.is_empty());
        assert!(parse_function_signature("isEmpty").is_none());
    }

    #[test]
    fn bool_parsing() {
        assert!(parse_bool(Some("true")));
        assert!(parse_bool(Some("yes")));
        assert!(!parse_bool(Some(" FALSE ")));
        assert!(!parse_bool(None));
    }
}
