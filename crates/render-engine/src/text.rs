//! Overlay text sanitation.

/// Make user text safe to embed in a text overlay.
///
/// Straight quotes become typographic quotes and colons are escaped.
/// Leading and trailing whitespace is dropped. Percent signs stay as they
/// are, so every drawtext filter fed by this text must set
/// `expansion=none`.
pub fn sanitize_overlay_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.trim().chars() {
        match ch {
            '\'' => out.push('\u{2019}'),
            '"' => out.push('\u{201D}'),
            ':' => out.push_str("\\:"),
            '\\' => out.push_str("\\\\"),
            '\n' | '\r' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}
