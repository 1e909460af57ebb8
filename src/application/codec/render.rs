use crate::domain::document::{
    Block, CodeBlockAttrs, Document, GiphyEmbedAttrs, GistEmbedAttrs, ImageAttrs, Inline,
    ListItem, Marks,
};

use super::escape::{escape_attribute, escape_text};

pub(crate) const CODE_BLOCK_CLASS: &str = "code-block";
pub(crate) const GIST_EMBED_TYPE: &str = "gist-embed";
pub(crate) const GIPHY_EMBED_TYPE: &str = "giphy-embed";

/// Serialise a document into its canonical stored HTML.
pub fn render_document(document: &Document) -> String {
    let mut html = String::new();
    write_blocks(&mut html, &document.content);
    html
}

fn write_blocks(html: &mut String, blocks: &[Block]) {
    for block in blocks {
        write_block(html, block);
    }
}

fn write_block(html: &mut String, block: &Block) {
    match block {
        Block::Paragraph { content } => {
            html.push_str("<p>");
            write_inlines(html, content);
            html.push_str("</p>");
        }
        Block::Heading { level, content } => {
            let level = level.get();
            html.push_str(&format!("<h{level}>"));
            write_inlines(html, content);
            html.push_str(&format!("</h{level}>"));
        }
        Block::Blockquote { content } => {
            html.push_str("<blockquote>");
            write_blocks(html, content);
            html.push_str("</blockquote>");
        }
        Block::BulletList { items } => {
            html.push_str("<ul>");
            write_list_items(html, items);
            html.push_str("</ul>");
        }
        Block::OrderedList { start, items } => {
            if *start == 1 {
                html.push_str("<ol>");
            } else {
                html.push_str(&format!("<ol start=\"{start}\">"));
            }
            write_list_items(html, items);
            html.push_str("</ol>");
        }
        Block::HorizontalRule => html.push_str("<hr>"),
        Block::Image(attrs) => write_image(html, attrs),
        Block::CodeBlock(attrs) => write_code_block(html, attrs),
        Block::GistEmbed(attrs) => write_gist_embed(html, attrs),
        Block::GiphyEmbed(attrs) => write_giphy_embed(html, attrs),
    }
}

fn write_list_items(html: &mut String, items: &[ListItem]) {
    for item in items {
        html.push_str("<li>");
        write_blocks(html, &item.content);
        html.push_str("</li>");
    }
}

fn write_image(html: &mut String, attrs: &ImageAttrs) {
    html.push_str("<img src=\"");
    html.push_str(&escape_attribute(&attrs.src));
    html.push('"');
    if let Some(alt) = attrs.alt.as_deref() {
        html.push_str(" alt=\"");
        html.push_str(&escape_attribute(alt));
        html.push('"');
    }
    if let Some(title) = attrs.title.as_deref() {
        html.push_str(" title=\"");
        html.push_str(&escape_attribute(title));
        html.push('"');
    }
    html.push('>');
}

fn write_code_block(html: &mut String, attrs: &CodeBlockAttrs) {
    let language = escape_attribute(attrs.language.as_str());
    html.push_str(&format!(
        "<pre class=\"{CODE_BLOCK_CLASS}\" data-language=\"{language}\""
    ));
    if let Some(filename) = attrs.filename.as_deref() {
        html.push_str(" data-filename=\"");
        html.push_str(&escape_attribute(filename));
        html.push('"');
    }
    html.push_str(&format!(
        "><code class=\"language-{language}\" data-code-content=\"{}\">",
        escape_attribute(&attrs.code)
    ));
    html.push_str(&escape_text(&attrs.code));
    html.push_str("</code></pre>");
}

fn write_gist_embed(html: &mut String, attrs: &GistEmbedAttrs) {
    html.push_str(&format!(
        "<div data-type=\"{GIST_EMBED_TYPE}\" data-gist-id=\"{}\"",
        escape_attribute(&attrs.gist_id)
    ));
    if let Some(filename) = attrs.filename.as_deref() {
        html.push_str(" data-filename=\"");
        html.push_str(&escape_attribute(filename));
        html.push('"');
    }
    html.push_str("></div>");
}

fn write_giphy_embed(html: &mut String, attrs: &GiphyEmbedAttrs) {
    html.push_str(&format!("<div data-type=\"{GIPHY_EMBED_TYPE}\""));
    if let Some(giphy_id) = attrs.giphy_id.as_deref() {
        html.push_str(" data-giphy-id=\"");
        html.push_str(&escape_attribute(giphy_id));
        html.push('"');
    }
    if let Some(src) = attrs.src.as_deref() {
        html.push_str(" data-src=\"");
        html.push_str(&escape_attribute(src));
        html.push('"');
    }
    html.push_str("></div>");
}

fn write_inlines(html: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text { text, marks } => write_marked_text(html, text, marks),
            Inline::HardBreak => html.push_str("<br>"),
        }
    }
}

/// Marks nest in a fixed order (link outermost, code innermost) so equal mark
/// sets always produce identical markup.
fn write_marked_text(html: &mut String, text: &str, marks: &Marks) {
    let mut closing: Vec<&'static str> = Vec::new();

    if let Some(href) = marks.link.as_deref() {
        html.push_str("<a href=\"");
        html.push_str(&escape_attribute(href));
        html.push_str("\">");
        closing.push("</a>");
    }
    for (enabled, open, close) in [
        (marks.bold, "<strong>", "</strong>"),
        (marks.italic, "<em>", "</em>"),
        (marks.strike, "<s>", "</s>"),
        (marks.code, "<code>", "</code>"),
    ] {
        if enabled {
            html.push_str(open);
            closing.push(close);
        }
    }

    html.push_str(&escape_text(text));
    for close in closing.into_iter().rev() {
        html.push_str(close);
    }
}
