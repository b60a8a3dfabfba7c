//! Source-text cleanup applied before XML parsing.
//!
//! Each pass is a function `&str -> String` applied in sequence.

/// Zero-width spaces are scattered through the published DocBook and would
/// otherwise leak into names, tags and value lists.
const ZERO_WIDTH_SPACE: char = '\u{200B}';

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Run all cleanup passes over raw DocBook source.
pub fn clean_source(raw: &str) -> String {
    let result = strip_byte_order_mark(raw);
    strip_zero_width_spaces(result)
}

fn strip_byte_order_mark(raw: &str) -> &str {
    raw.strip_prefix(BYTE_ORDER_MARK).unwrap_or(raw)
}

fn strip_zero_width_spaces(text: &str) -> String {
    text.replace(ZERO_WIDTH_SPACE, "")
}
