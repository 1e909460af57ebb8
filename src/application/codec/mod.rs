//! Bidirectional mapping between [`Document`] trees and stored HTML.
//!
//! Rendering is an exhaustive match over node types; parsing walks an
//! html5ever DOM. Attribute data (code language, filename, raw code, embed
//! identifiers) survives a render/parse round trip.

pub(crate) mod escape;
mod parse;
mod render;

use thiserror::Error;

use crate::domain::document::Document;

pub use parse::parse_document;
pub use render::render_document;
pub(crate) use render::{GIPHY_EMBED_TYPE, GIST_EMBED_TYPE};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode a document from its JSON representation.
pub fn document_from_json(json: &str) -> Result<Document, DocumentError> {
    Ok(serde_json::from_str(json)?)
}

/// Encode a document as pretty-printed JSON.
pub fn document_to_json(document: &Document) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{
        Block, CodeBlockAttrs, GiphyEmbedAttrs, GistEmbedAttrs, HeadingLevel, ImageAttrs, Inline,
        ListItem, Marks,
    };

    fn sample_document() -> Document {
        let link = Marks {
            link: Some("https://example.com/a?b=1&c=2".into()),
            ..Marks::default()
        };
        let italic = Marks {
            italic: true,
            ..Marks::default()
        };
        Document::new(vec![
            Block::Heading {
                level: HeadingLevel::try_from(1).expect("level"),
                content: vec![Inline::text("Release notes")],
            },
            Block::Paragraph {
                content: vec![
                    Inline::text("Read "),
                    Inline::marked("the docs", link),
                    Inline::HardBreak,
                    Inline::marked("then <ship>", italic),
                ],
            },
            Block::CodeBlock(
                CodeBlockAttrs::new(Some("rust"))
                    .with_filename("src/main.rs")
                    .with_code("fn main() {\r\n\tlet s = \"<&>\";\n\n}\n"),
            ),
            Block::GistEmbed(GistEmbedAttrs {
                gist_id: "abc123".into(),
                filename: Some("main-rb".into()),
            }),
            Block::GistEmbed(GistEmbedAttrs {
                gist_id: "def456".into(),
                filename: None,
            }),
            Block::GiphyEmbed(GiphyEmbedAttrs::from_id("XyZ789")),
            Block::GiphyEmbed(GiphyEmbedAttrs::from_src(
                "https://media.giphy.com/media/XyZ789/giphy.gif",
            )),
            Block::Blockquote {
                content: vec![Block::paragraph(vec![Inline::text("quoted")])],
            },
            Block::OrderedList {
                start: 3,
                items: vec![ListItem {
                    content: vec![Block::paragraph(vec![Inline::text("third")])],
                }],
            },
            Block::BulletList {
                items: vec![ListItem {
                    content: vec![Block::paragraph(vec![Inline::text("item")])],
                }],
            },
            Block::HorizontalRule,
            Block::Image(ImageAttrs {
                src: "https://example.com/a.png".into(),
                alt: Some("diagram".into()),
                title: None,
            }),
        ])
    }

    #[test]
    fn render_then_parse_recovers_the_document() {
        let document = sample_document();
        let html = render_document(&document);
        assert_eq!(parse_document(&html), document);
    }

    #[test]
    fn blank_filenames_survive_the_round_trip() {
        let document = Document::new(vec![
            Block::CodeBlock(CodeBlockAttrs {
                filename: Some(String::new()),
                ..CodeBlockAttrs::new(Some("rust"))
            }),
            Block::GistEmbed(GistEmbedAttrs {
                gist_id: "abc123".into(),
                filename: Some(String::new()),
            }),
        ]);
        assert_eq!(parse_document(&render_document(&document)), document);
    }

    #[test]
    fn rendering_is_stable_across_round_trips() {
        let html = render_document(&sample_document());
        assert_eq!(render_document(&parse_document(&html)), html);
    }

    #[test]
    fn json_round_trip_preserves_embed_attributes() {
        let document = sample_document();
        let json = document_to_json(&document).expect("encode");
        assert_eq!(document_from_json(&json).expect("decode"), document);
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = document_from_json("{\"content\": [{\"type\": \"heading\", \"level\": 9}]}")
            .expect_err("level 9 is rejected");
        assert!(err.to_string().contains("heading level"));
    }
}
