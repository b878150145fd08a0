//! Cursor context classification.
//!
//! Completion needs to know what the user is typing: an EL expression, a
//! tag name, an attribute name or an attribute value.  There is no markup
//! parser behind this; [`classify`] makes a single forward pass over the
//! text before the cursor with a small state machine that understands just
//! enough JSP to tell these apart (tags, quoted attribute values, `${…}` /
//! `#{…}` expressions with nested braces and string literals, scriptlets
//! and comments).

/// Where the cursor is, as far as completion is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorContext {
    /// Plain template text.
    Text,
    /// Inside a scriptlet, directive or comment.
    Ignored,
    /// Typing a tag name; `name_start` is the byte right after `<` / `</`.
    TagName { name_start: usize, closing: bool },
    /// Between attributes of an open start tag.
    AttributeName { tag_start: usize, tag_name: String },
    /// Inside the quoted value of `attribute`.
    AttributeValue {
        tag_name: String,
        attribute: String,
        value_start: usize,
    },
    /// Inside an expression; `start` is the byte after the opening `{`.
    Expression { start: usize, in_string: bool },
}

impl CursorContext {
    pub fn is_expression(&self) -> bool {
        matches!(self, CursorContext::Expression { .. })
    }
}

#[derive(Debug, Clone)]
struct TagHead {
    start: usize,
    name_start: usize,
    name_end: usize,
    closing: bool,
}

#[derive(Debug, Clone)]
enum State {
    Text,
    TagName(TagHead),
    InTag(TagHead),
    AttrValue {
        tag: TagHead,
        attribute: String,
        quote: u8,
        value_start: usize,
    },
    Expression {
        start: usize,
        depth: usize,
        string: Option<u8>,
        within: Option<Box<State>>,
    },
    /// Skipping until the given terminator.
    Ignored(&'static [u8]),
}

/// Classify the cursor at byte `offset` of `text`.
pub fn classify(text: &str, offset: usize) -> CursorContext {
    let end = offset.min(text.len());
    let bytes = &text.as_bytes()[..end];
    let mut state = State::Text;
    let mut i = 0;

    while i < end {
        let c = bytes[i];
        state = match state {
            State::Text => {
                if bytes[i..].starts_with(b"<%--") {
                    i += 4;
                    State::Ignored(b"--%>")
                } else if bytes[i..].starts_with(b"<%") {
                    i += 2;
                    State::Ignored(b"%>")
                } else if bytes[i..].starts_with(b"<!--") {
                    i += 4;
                    State::Ignored(b"-->")
                } else if bytes[i..].starts_with(b"</") {
                    i += 2;
                    State::TagName(TagHead {
                        start: i - 2,
                        name_start: i,
                        name_end: i,
                        closing: true,
                    })
                } else if c == b'<' && bytes.get(i + 1).is_none_or(u8::is_ascii_alphabetic) {
                    i += 1;
                    State::TagName(TagHead {
                        start: i - 1,
                        name_start: i,
                        name_end: i,
                        closing: false,
                    })
                } else if opens_expression(bytes, i) {
                    i += 2;
                    State::Expression {
                        start: i,
                        depth: 0,
                        string: None,
                        within: None,
                    }
                } else {
                    i += 1;
                    State::Text
                }
            }
            State::TagName(mut head) => {
                if is_tag_name_byte(c) {
                    i += 1;
                    head.name_end = i;
                    State::TagName(head)
                } else if c.is_ascii_whitespace() || c == b'/' {
                    i += 1;
                    State::InTag(head)
                } else if c == b'>' {
                    i += 1;
                    State::Text
                } else {
                    // Not a tag after all; look at this byte again as text.
                    State::Text
                }
            }
            State::InTag(head) => match c {
                b'>' => {
                    i += 1;
                    State::Text
                }
                b'"' | b'\'' => {
                    let attribute = attribute_before_quote(bytes, i).to_string();
                    i += 1;
                    State::AttrValue {
                        tag: head,
                        attribute,
                        quote: c,
                        value_start: i,
                    }
                }
                b'<' => State::Text,
                _ => {
                    i += 1;
                    State::InTag(head)
                }
            },
            State::AttrValue { tag, attribute, quote, value_start } => {
                if c == quote {
                    i += 1;
                    State::InTag(tag)
                } else if opens_expression(bytes, i) {
                    i += 2;
                    State::Expression {
                        start: i,
                        depth: 0,
                        string: None,
                        within: Some(Box::new(State::AttrValue {
                            tag,
                            attribute,
                            quote,
                            value_start,
                        })),
                    }
                } else {
                    i += 1;
                    State::AttrValue { tag, attribute, quote, value_start }
                }
            }
            State::Expression { start, depth, string, within } => {
                i += 1;
                match string {
                    Some(_) if c == b'\\' => {
                        i += 1;
                        State::Expression { start, depth, string, within }
                    }
                    Some(q) if c == q => State::Expression { start, depth, string: None, within },
                    Some(_) => State::Expression { start, depth, string, within },
                    None => match c {
                        b'\'' | b'"' => State::Expression {
                            start,
                            depth,
                            string: Some(c),
                            within,
                        },
                        b'{' => State::Expression {
                            start,
                            depth: depth + 1,
                            string,
                            within,
                        },
                        b'}' if depth == 0 => within.map_or(State::Text, |outer| *outer),
                        b'}' => State::Expression {
                            start,
                            depth: depth - 1,
                            string,
                            within,
                        },
                        _ => State::Expression { start, depth, string, within },
                    },
                }
            }
            State::Ignored(terminator) => {
                if bytes[i..].starts_with(terminator) {
                    i += terminator.len();
                    State::Text
                } else {
                    i += 1;
                    State::Ignored(terminator)
                }
            }
        };
    }

    match state {
        State::Text => CursorContext::Text,
        State::Ignored(_) => CursorContext::Ignored,
        State::TagName(head) => CursorContext::TagName {
            name_start: head.name_start,
            closing: head.closing,
        },
        State::InTag(head) if head.closing => CursorContext::Text,
        State::InTag(head) => CursorContext::AttributeName {
            tag_start: head.start,
            tag_name: text[head.name_start..head.name_end].to_string(),
        },
        State::AttrValue { tag, attribute, value_start, .. } => CursorContext::AttributeValue {
            tag_name: text[tag.name_start..tag.name_end].to_string(),
            attribute,
            value_start,
        },
        State::Expression { start, string, .. } => CursorContext::Expression {
            start,
            in_string: string.is_some(),
        },
    }
}

/// `${` or `#{` at `i`, not escaped with a backslash.
fn opens_expression(bytes: &[u8], i: usize) -> bool {
    matches!(bytes[i], b'$' | b'#')
        && bytes.get(i + 1) == Some(&b'{')
        && (i == 0 || bytes[i - 1] != b'\\')
}

fn is_tag_name_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b':' | b'_' | b'-' | b'.')
}

/// The attribute name in front of the quote at `quote`: `name = "`.
fn attribute_before_quote(bytes: &[u8], quote: usize) -> &str {
    let mut end = quote;
    while end > 0 && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    if end == 0 || bytes[end - 1] != b'=' {
        return "";
    }
    end -= 1;
    while end > 0 && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && is_tag_name_byte(bytes[start - 1]) {
        start -= 1;
    }
    std::str::from_utf8(&bytes[start..end]).unwrap_or_default()
}

/// The partial identifier that ends `before_cursor`.
///
/// Extends backward over ASCII letters, digits, `_` and `:`, then drops
/// anything in front of the first letter, so `${1+ab` gives `ab` and
/// `${ns:fn` gives `ns:fn`.
pub fn completion_prefix(before_cursor: &str) -> &str {
    let run_start = before_cursor
        .bytes()
        .rposition(|c| !(c.is_ascii_alphanumeric() || c == b'_' || c == b':'))
        .map_or(0, |pos| pos + 1);
    let run = &before_cursor[run_start..];
    run.find(|c: char| c.is_ascii_alphabetic())
        .map_or("", |letter| &run[letter..])
}
