/// Longest prefix of `value` that fits in `max_bytes` without splitting a char.
pub fn truncate_utf8_prefix(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

fn is_quote(c: char) -> bool {
    c == '\'' || c == '"'
}

/// Strips at most one leading and one trailing quote of either kind, plus whitespace.
pub fn strip_quote_layer(value: &str) -> &str {
    let mut out = value.trim();
    if let Some(rest) = out.strip_prefix(is_quote) {
        out = rest;
    }
    if let Some(rest) = out.strip_suffix(is_quote) {
        out = rest;
    }
    out.trim()
}
