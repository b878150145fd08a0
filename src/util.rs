/// Utility functions for the JSPantomLSP server.
///
/// This module contains helpers for converting between LSP positions
/// (line + UTF-16 column) and byte offsets, and for logging to the client.
use memchr::memchr_iter;
use tower_lsp::lsp_types::*;

use crate::Backend;

/// Byte offset of the first character of every line.
fn line_starts(content: &str) -> impl Iterator<Item = usize> + '_ {
    std::iter::once(0).chain(memchr_iter(b'\n', content.as_bytes()).map(|nl| nl + 1))
}

/// Convert an LSP `Position` to a byte offset in `content`.
///
/// Columns count UTF-16 code units.  A column past the end of its line
/// clamps to the end of the line; a line past the end of the document
/// clamps to the end of the document.
pub fn position_to_offset(content: &str, position: Position) -> usize {
    let Some(line_start) = line_starts(content).nth(position.line as usize) else {
        return content.len();
    };
    let line = &content[line_start..];
    let line = &line[..line.find('\n').unwrap_or(line.len())];
    let line = line.strip_suffix('\r').unwrap_or(line);

    let mut units = 0u32;
    for (idx, ch) in line.char_indices() {
        if units >= position.character {
            return line_start + idx;
        }
        units += ch.len_utf16() as u32;
    }
    line_start + line.len()
}

/// Convert a byte offset in `content` to an LSP `Position`.
pub fn offset_to_position(content: &str, offset: usize) -> Position {
    let mut offset = offset.min(content.len());
    while !content.is_char_boundary(offset) {
        offset -= 1;
    }
    let (line, line_start) = line_starts(content)
        .take_while(|start| *start <= offset)
        .enumerate()
        .last()
        .unwrap_or((0, 0));
    let character = content[line_start..offset]
        .chars()
        .map(|ch| ch.len_utf16() as u32)
        .sum();
    Position::new(line as u32, character)
}

impl Backend {
    pub(crate) async fn log(&self, typ: MessageType, message: String) {
        if let Some(client) = &self.client {
            client.log_message(typ, message).await;
        }
    }

    pub(crate) async fn show_message(&self, typ: MessageType, message: String) {
        if let Some(client) = &self.client {
            client.show_message(typ, message).await;
        }
    }
}
