//! Snippet text helpers (LSP snippet syntax).

/// Escape the characters that are special inside a snippet: `\`, `$`, `}`.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '$' | '}') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A tab stop: `$1`, or `${1:content}` when `content` is non-empty.
pub fn jump(index: usize, content: &str) -> String {
    if content.is_empty() {
        format!("${index}")
    } else {
        format!("${{{index}:{}}}", escape(content))
    }
}

/// Wrap already-valid snippet text in literal EL delimiters: `\${…\}`.
pub fn wrap_expression(inner: &str) -> String {
    format!("\\${{{inner}\\}}")
}
