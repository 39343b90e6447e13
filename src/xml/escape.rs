//! Character escaping shared by the serializer and the canonicalizer.
//!
//! The escaped forms are exactly those required by Canonical XML, which also
//! guarantees that re-parsing serialized output yields the same values.

use std::borrow::Cow;

fn escape_with(s: &str, replacement: fn(char) -> Option<&'static str>) -> Cow<'_, str> {
    let Some(first) = s.find(|ch| replacement(ch).is_some()) else {
        return Cow::Borrowed(s);
    };

    let mut out = String::with_capacity(s.len() + s.len() / 4);
    out.push_str(&s[..first]);
    for ch in s[first..].chars() {
        match replacement(ch) {
            Some(escaped) => out.push_str(escaped),
            None => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Escape a text node value.
pub fn escape_text(s: &str) -> Cow<'_, str> {
    escape_with(s, |ch| match ch {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '\r' => Some("&#xD;"),
        _ => None,
    })
}

/// Escape an attribute value for a double-quoted literal.
pub fn escape_attribute(s: &str) -> Cow<'_, str> {
    escape_with(s, |ch| match ch {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '"' => Some("&quot;"),
        '\t' => Some("&#x9;"),
        '\n' => Some("&#xA;"),
        '\r' => Some("&#xD;"),
        _ => None,
    })
}
