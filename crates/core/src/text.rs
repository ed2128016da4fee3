//! Text helpers shared by extraction, matching and rewriting.
//!
//! Covers markup escaping for DrawingML text content and the comparison
//! key used for tolerant (case-insensitive) matching.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse runs of whitespace into a single space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Escape all five XML special characters.
pub fn escape_xml(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Escape only the characters that must be escaped in element content.
///
/// Office writes quotes and apostrophes literally inside `a:t`, so this is
/// the form most often found in real slide parts.
pub fn escape_xml_content(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Every distinct escaped spelling a text may have inside slide XML.
pub fn escaped_forms(text: &str) -> Vec<String> {
    let full = escape_xml(text).into_owned();
    let content = escape_xml_content(text).into_owned();
    if full == content {
        vec![full]
    } else {
        vec![full, content]
    }
}

/// Build a key for tolerant comparison.
///
/// Applies NFC normalization, lowercases, collapses whitespace and trims.
pub fn comparison_key(text: &str) -> String {
    let normalized: String = text.nfc().collect::<String>().to_lowercase();
    WHITESPACE_COLLAPSE_REGEX
        .replace_all(normalized.trim(), " ")
        .into_owned()
}

/// Split a string into leading whitespace, content and trailing whitespace.
pub fn split_padding(text: &str) -> (&str, &str, &str) {
    let start = text.len() - text.trim_start().len();
    let end = text.trim_end().len().max(start);
    (&text[..start], &text[start..end], &text[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("Hello"), "Hello");
        assert_eq!(
            escape_xml(r#"Tom & "Jerry" <'s>"#),
            "Tom &amp; &quot;Jerry&quot; &lt;&apos;s&gt;"
        );
    }

    #[test]
    fn test_escape_xml_content_keeps_quotes() {
        assert_eq!(escape_xml_content("It's \"fine\" & <ok>"), "It's \"fine\" &amp; &lt;ok&gt;");
    }

    #[test]
    fn test_escaped_forms() {
        assert_eq!(escaped_forms("plain"), vec!["plain".to_string()]);
        assert_eq!(
            escaped_forms("it's"),
            vec!["it&apos;s".to_string(), "it's".to_string()]
        );
    }

    #[test]
    fn test_comparison_key() {
        assert_eq!(comparison_key("  Hello   WORLD "), "hello world");
        // Decomposed e + combining acute matches the precomposed form.
        assert_eq!(comparison_key("Cafe\u{301}"), comparison_key("CAF\u{c9}"));
    }

    #[test]
    fn test_split_padding() {
        assert_eq!(split_padding("  Hi there "), ("  ", "Hi there", " "));
        assert_eq!(split_padding("Hi"), ("", "Hi", ""));
        assert_eq!(split_padding("   "), ("   ", "", ""));
    }
}
