use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use once_cell::sync::Lazy;

static STORED_HTML_SANITIZER: Lazy<AmmoniaBuilder<'static>> = Lazy::new(build_stored_sanitizer);

/// Clean serialised editor output before it is persisted. Extension markup
/// (code blocks, embed containers and their `data-*` attributes) survives;
/// scripts, frames and event handlers do not.
pub fn sanitize_stored_html(html: &str) -> String {
    STORED_HTML_SANITIZER.clean(html).to_string()
}

fn build_stored_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "b",
        "blockquote",
        "br",
        "code",
        "del",
        "div",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "kbd",
        "li",
        "mark",
        "ol",
        "p",
        "pre",
        "s",
        "span",
        "strike",
        "strong",
        "sub",
        "sup",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from(["class", "id", "title", "lang", "dir"]);
    builder.generic_attributes(generic);
    builder.add_generic_attribute_prefixes(&["data-"]);

    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes("img", &["title", "width", "height", "alt", "loading"]);
    builder.add_tag_attributes("ol", &["start"]);

    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::codec::{parse_document, render_document};
    use crate::domain::document::{
        Block, CodeBlockAttrs, Document, GiphyEmbedAttrs, GistEmbedAttrs, Inline,
    };

    #[test]
    fn scripts_and_handlers_are_removed() {
        let cleaned = sanitize_stored_html(
            "<p onclick=\"x()\">hi</p><script>alert(1)</script><iframe src=\"https://evil.test\"></iframe>",
        );
        assert_eq!(cleaned, "<p>hi</p>");
    }

    #[test]
    fn extension_markup_survives_sanitisation() {
        let document = Document::new(vec![
            Block::paragraph(vec![Inline::text("intro")]),
            Block::CodeBlock(
                CodeBlockAttrs::new(Some("python"))
                    .with_filename("app.py")
                    .with_code("def f():\n    return \"<ok>\"\n"),
            ),
            Block::GistEmbed(GistEmbedAttrs {
                gist_id: "abc123".into(),
                filename: Some("main-rb".into()),
            }),
            Block::GiphyEmbed(GiphyEmbedAttrs::from_id("XyZ789")),
        ]);

        let stored = sanitize_stored_html(&render_document(&document));
        assert_eq!(parse_document(&stored), document);
    }
}
