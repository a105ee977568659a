//! Escaping utilities for generated documents.
//!
//! Checklists and benchmarks are assembled as text, so every value taken
//! from a profile passes through one of these helpers before it is embedded
//! in XML or in a Ruby control file.

/// Characters XML 1.0 does not allow at all, even escaped.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
}

/// Escape a string for XML element content.
///
/// Characters that XML cannot carry are dropped.
///
/// # Examples
///
/// ```
/// use compliance_tools::reports::escape::escape_xml;
///
/// assert_eq!(escape_xml("a < b && c"), "a &lt; b &amp;&amp; c");
/// ```
#[must_use]
pub fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars().filter(|c| is_xml_char(*c)) {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape a string for a double-quoted XML attribute value.
///
/// Whitespace is written as character references so attribute-value
/// normalization does not fold it away.
#[must_use]
pub fn escape_xml_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars().filter(|c| is_xml_char(*c)) {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\n' => result.push_str("&#10;"),
            '\r' => result.push_str("&#13;"),
            '\t' => result.push_str("&#9;"),
            _ => result.push(c),
        }
    }
    result
}

/// Single-quoted Ruby string literal.
///
/// # Examples
///
/// ```
/// use compliance_tools::reports::escape::ruby_string;
///
/// assert_eq!(ruby_string("it's"), r"'it\'s'");
/// ```
#[must_use]
pub fn ruby_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('\'');
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            _ => result.push(c),
        }
    }
    result.push('\'');
    result
}

/// Hash key for a Ruby keyword argument: bare when it is an identifier,
/// quoted otherwise.
#[must_use]
pub fn ruby_key(name: &str) -> String {
    let mut chars = name.chars();
    let bare = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        format!("{name}:")
    } else {
        format!("\"{}\":", name.replace('\\', "\\\\").replace('"', "\\\""))
    }
}
