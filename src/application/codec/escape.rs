/// Escape text content. Carriage returns are written as references so the
/// HTML parser's newline normalisation cannot fold `\r\n` into `\n`.
pub(crate) fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' => escaped.push_str("&#13;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape a double-quoted attribute value. Whitespace is preserved verbatim,
/// which matters for `data-code-content`.
pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' => escaped.push_str("&#13;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Decode every character reference in a raw attribute value read by the
/// streaming rewriter: named, decimal and hexadecimal.
pub(crate) fn decode_attribute(value: &str) -> String {
    html_escape::decode_html_entities(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_escaping_keeps_newlines() {
        assert_eq!(
            escape_attribute("a \"b\"\n<c>&"),
            "a &quot;b&quot;\n&lt;c&gt;&amp;"
        );
    }

    #[test]
    fn decode_reverses_attribute_escaping() {
        let raw = "if a < b && c > \"d\" {\r\n}";
        assert_eq!(decode_attribute(&escape_attribute(raw)), raw);
    }

    #[test]
    fn text_escaping_protects_carriage_returns() {
        assert_eq!(escape_text("a\r\nb<"), "a&#13;\nb&lt;");
    }

    #[test]
    fn numeric_and_named_references_are_decoded() {
        assert_eq!(decode_attribute("a.png?x=1&#38;y=2"), "a.png?x=1&y=2");
        assert_eq!(decode_attribute("a.png?x=1&#x26;y=2"), "a.png?x=1&y=2");
        assert_eq!(decode_attribute("&quot;&lt;b&gt;&quot;"), "\"<b>\"");
        assert_eq!(decode_attribute("plain"), "plain");
    }
}
