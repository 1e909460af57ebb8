use html5ever::{ParseOpts, parse_document as parse_html, tendril::TendrilSink};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

use crate::domain::document::{
    Block, CodeBlockAttrs, Document, GiphyEmbedAttrs, GistEmbedAttrs, HeadingLevel, ImageAttrs,
    Inline, Language, ListItem, Marks, normalize_inlines,
};

use super::render::{GIPHY_EMBED_TYPE, GIST_EMBED_TYPE};

const SKIPPED_TAGS: &[&str] = &["script", "style", "template", "noscript", "iframe", "head"];
const TRANSPARENT_INLINE_TAGS: &[&str] = &[
    "span", "u", "mark", "sub", "sup", "abbr", "small", "label", "cite", "q", "time", "ins",
];

/// Parse stored HTML back into a document. Parsing never fails: unknown
/// elements are transparent and stray inline content is wrapped into
/// paragraphs.
pub fn parse_document(html: &str) -> Document {
    let dom = parse_html(RcDom::default(), ParseOpts::default()).one(html);
    let Some(body) = find_element(&dom.document, "body") else {
        return Document::default();
    };
    Document::new(parse_blocks(&body))
}

fn parse_blocks(parent: &Handle) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    collect_blocks(parent, &mut builder);
    builder.finish()
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    pending: Vec<Inline>,
}

impl BlockBuilder {
    fn push_block(&mut self, block: Block) {
        self.flush();
        self.blocks.push(block);
    }

    fn push_items(&mut self, items: Vec<InlineItem>) {
        for item in items {
            match item {
                InlineItem::Inline(inline) => self.pending.push(inline),
                InlineItem::Image(attrs) => self.push_block(Block::Image(attrs)),
            }
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut pending = std::mem::take(&mut self.pending);
        let whitespace_only = pending.iter().all(|inline| match inline {
            Inline::Text { text, .. } => text.trim().is_empty(),
            Inline::HardBreak => false,
        });
        if whitespace_only {
            return;
        }
        normalize_inlines(&mut pending);
        self.blocks.push(Block::Paragraph { content: pending });
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

enum InlineItem {
    Inline(Inline),
    Image(ImageAttrs),
}

fn collect_blocks(parent: &Handle, builder: &mut BlockBuilder) {
    for child in parent.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                builder.pending.push(Inline::text(text));
            }
            NodeData::Element { name, .. } => {
                let tag = name.local.as_ref();
                collect_block_element(child, tag, builder);
            }
            _ => {}
        }
    }
}

fn collect_block_element(node: &Handle, tag: &str, builder: &mut BlockBuilder) {
    match tag {
        "p" => {
            let items = collect_inline_items(node, &Marks::default());
            push_textblock(builder, items, |content| Block::Paragraph { content });
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..]
                .parse::<u8>()
                .ok()
                .and_then(|value| HeadingLevel::try_from(value).ok());
            let items = collect_inline_items(node, &Marks::default());
            match level {
                Some(level) => {
                    push_textblock(builder, items, |content| Block::Heading { level, content })
                }
                None => push_textblock(builder, items, |content| Block::Paragraph { content }),
            }
        }
        "blockquote" => builder.push_block(Block::Blockquote {
            content: parse_blocks(node),
        }),
        "ul" => builder.push_block(Block::BulletList {
            items: parse_list_items(node),
        }),
        "ol" => {
            let start = attribute(node, "start")
                .and_then(|value| value.trim().parse::<u32>().ok())
                .unwrap_or(1);
            builder.push_block(Block::OrderedList {
                start,
                items: parse_list_items(node),
            });
        }
        "hr" => builder.push_block(Block::HorizontalRule),
        "img" => {
            if let Some(attrs) = image_attrs(node) {
                builder.push_block(Block::Image(attrs));
            }
        }
        "pre" => builder.push_block(Block::CodeBlock(code_block_attrs(node))),
        "br" => builder.pending.push(Inline::HardBreak),
        "div" if attribute(node, "data-type").as_deref() == Some(GIST_EMBED_TYPE) => {
            builder.push_block(Block::GistEmbed(GistEmbedAttrs {
                gist_id: attribute(node, "data-gist-id").unwrap_or_default(),
                filename: attribute(node, "data-filename"),
            }));
        }
        "div" if attribute(node, "data-type").as_deref() == Some(GIPHY_EMBED_TYPE) => {
            builder.push_block(Block::GiphyEmbed(GiphyEmbedAttrs {
                giphy_id: attribute(node, "data-giphy-id").filter(|id| !id.is_empty()),
                src: attribute(node, "data-src").filter(|src| !src.is_empty()),
            }));
        }
        tag if SKIPPED_TAGS.contains(&tag) => {
            debug!(
                target = "application::codec::parse",
                tag, "skipping non-content element"
            );
        }
        tag => match inline_marks(node, tag, &Marks::default()) {
            Some(marks) => {
                let items = collect_inline_items(node, &marks);
                builder.push_items(items);
            }
            None => {
                builder.flush();
                collect_blocks(node, builder);
                builder.flush();
            }
        },
    }
}

/// Push a paragraph-like block, hoisting any images out of its inline flow.
fn push_textblock<F>(builder: &mut BlockBuilder, items: Vec<InlineItem>, make: F)
where
    F: Fn(Vec<Inline>) -> Block,
{
    builder.flush();
    let mut content = Vec::new();
    let mut emitted = false;
    for item in items {
        match item {
            InlineItem::Inline(inline) => content.push(inline),
            InlineItem::Image(attrs) => {
                normalize_inlines(&mut content);
                if content.iter().any(|inline| !is_blank(inline)) {
                    builder.blocks.push(make(std::mem::take(&mut content)));
                } else {
                    content.clear();
                }
                builder.blocks.push(Block::Image(attrs));
                emitted = true;
            }
        }
    }
    normalize_inlines(&mut content);
    if !emitted || content.iter().any(|inline| !is_blank(inline)) {
        builder.blocks.push(make(content));
    }
}

fn is_blank(inline: &Inline) -> bool {
    matches!(inline, Inline::Text { text, .. } if text.trim().is_empty())
}

fn parse_list_items(list: &Handle) -> Vec<ListItem> {
    list.children
        .borrow()
        .iter()
        .filter(|child| element_name(child).as_deref() == Some("li"))
        .map(|item| ListItem {
            content: parse_blocks(item),
        })
        .collect()
}

fn collect_inline_items(parent: &Handle, marks: &Marks) -> Vec<InlineItem> {
    let mut items = Vec::new();
    collect_inline_into(parent, marks, &mut items);
    items
}

fn collect_inline_into(parent: &Handle, marks: &Marks, items: &mut Vec<InlineItem>) {
    for child in parent.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => {
                items.push(InlineItem::Inline(Inline::marked(
                    contents.borrow().to_string(),
                    marks.clone(),
                )));
            }
            NodeData::Element { name, .. } => {
                let tag = name.local.as_ref();
                match tag {
                    "br" => items.push(InlineItem::Inline(Inline::HardBreak)),
                    "img" => {
                        if let Some(attrs) = image_attrs(child) {
                            items.push(InlineItem::Image(attrs));
                        }
                    }
                    tag if SKIPPED_TAGS.contains(&tag) => {}
                    tag => {
                        let nested = inline_marks(child, tag, marks).unwrap_or_else(|| marks.clone());
                        collect_inline_into(child, &nested, items);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Marks contributed by an inline element, or `None` for non-inline tags.
fn inline_marks(node: &Handle, tag: &str, marks: &Marks) -> Option<Marks> {
    let mut next = marks.clone();
    match tag {
        "strong" | "b" => next.bold = true,
        "em" | "i" => next.italic = true,
        "s" | "del" | "strike" => next.strike = true,
        "code" | "kbd" => next.code = true,
        "a" => {
            if let Some(href) = attribute(node, "href").filter(|href| !href.trim().is_empty()) {
                next.link = Some(href);
            }
        }
        tag if TRANSPARENT_INLINE_TAGS.contains(&tag) => {}
        _ => return None,
    }
    Some(next)
}

fn image_attrs(node: &Handle) -> Option<ImageAttrs> {
    let src = attribute(node, "src").filter(|src| !src.trim().is_empty())?;
    Some(ImageAttrs {
        src,
        alt: attribute(node, "alt"),
        title: attribute(node, "title"),
    })
}

fn code_block_attrs(pre: &Handle) -> CodeBlockAttrs {
    let code = pre
        .children
        .borrow()
        .iter()
        .find(|child| element_name(child).as_deref() == Some("code"))
        .cloned();

    let language_token = code.as_ref().and_then(|code| {
        attribute(code, "class").and_then(|classes| {
            classes
                .split_whitespace()
                .find_map(|class| class.strip_prefix("language-").map(str::to_string))
        })
    });

    let raw_code = code
        .as_ref()
        .and_then(|code| attribute(code, "data-code-content"))
        .unwrap_or_else(|| text_content(code.as_ref().unwrap_or(pre)));

    CodeBlockAttrs {
        language: Language::new(language_token.as_deref()),
        filename: attribute(pre, "data-filename"),
        code: raw_code,
    }
}

fn text_content(node: &Handle) -> String {
    fn walk(node: &Handle, buffer: &mut String) {
        match &node.data {
            NodeData::Text { contents } => buffer.push_str(&contents.borrow()),
            NodeData::Element { name, .. } if name.local.as_ref() == "br" => buffer.push('\n'),
            _ => {}
        }
        for child in node.children.borrow().iter() {
            walk(child, buffer);
        }
    }

    let mut text = String::new();
    walk(node, &mut text);
    text
}

fn element_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attribute(node: &Handle, attribute: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| attr.name.local.as_ref() == attribute)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    if element_name(node).as_deref() == Some(tag) {
        return Some(node.clone());
    }
    node.children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}
