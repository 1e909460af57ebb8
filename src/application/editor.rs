//! Editing session over a [`Document`].
//!
//! The editor applies commands at a cursor that addresses a top-level block
//! and a character range inside it (hard breaks count as one character).
//! Commands return `true` when they changed the document; commands that
//! cannot apply leave the document untouched and return `false`.

use std::ops::Range;

use crate::application::codec::{parse_document, render_document};
use crate::domain::document::{
    Block, CodeBlockAttrs, Document, GiphyEmbedAttrs, GistEmbedAttrs, HeadingLevel, Inline,
    MarkKind, Marks, inlines_from_text, normalize_inlines, plain_text,
};
use crate::domain::embeds::{extract_gist_id, extract_giphy_id, is_giphy_url, is_gist_url};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub block: usize,
    pub selection: Range<usize>,
}

impl Cursor {
    pub fn is_collapsed(&self) -> bool {
        self.selection.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Editor {
    document: Document,
    cursor: Cursor,
}

impl Editor {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            cursor: Cursor::default(),
        }
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(parse_document(html))
    }

    pub fn to_html(&self) -> String {
        render_document(&self.document)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Move the cursor. The range is clamped to the block's text length.
    pub fn select(&mut self, block: usize, selection: Range<usize>) -> bool {
        let Some(target) = self.document.content.get(block) else {
            return false;
        };
        let len = block_text_len(target);
        let start = selection.start.min(len);
        let end = selection.end.clamp(start, len);
        self.cursor = Cursor {
            block,
            selection: start..end,
        };
        true
    }

    /// Insert a paragraph after the cursor block and move onto its end.
    pub fn insert_paragraph(&mut self, text: &str) -> bool {
        let index = self.insert_after_cursor(Block::paragraph(inlines_from_text(text)));
        let len = block_text_len(&self.document.content[index]);
        self.cursor.selection = len..len;
        true
    }

    /// Toggle a code block at the cursor.
    ///
    /// An active code block turns back into a paragraph holding its code.
    /// Paragraphs and headings become a code block with their text. Any
    /// other block gets a fresh code block inserted after it.
    pub fn set_code_block(&mut self, attrs: Option<CodeBlockAttrs>) -> bool {
        let attrs = attrs.unwrap_or_default();
        let index = self.cursor.block;

        let replacement = match self.document.content.get(index) {
            Some(Block::CodeBlock(existing)) => Block::paragraph(inlines_from_text(&existing.code)),
            Some(Block::Paragraph { content } | Block::Heading { content, .. }) => {
                Block::CodeBlock(attrs.with_code(plain_text(content)))
            }
            _ => {
                self.insert_after_cursor(Block::CodeBlock(attrs));
                return true;
            }
        };
        self.document.content[index] = replacement;
        self.clamp_selection();
        true
    }

    pub fn set_paragraph(&mut self) -> bool {
        let Some(block) = self.document.content.get_mut(self.cursor.block) else {
            return false;
        };
        let replacement = match block {
            Block::Heading { content, .. } => Block::paragraph(std::mem::take(content)),
            Block::CodeBlock(attrs) => Block::paragraph(inlines_from_text(&attrs.code)),
            _ => return false,
        };
        *block = replacement;
        true
    }

    pub fn set_heading(&mut self, level: HeadingLevel) -> bool {
        let Some(block) = self.document.content.get_mut(self.cursor.block) else {
            return false;
        };
        let content = match block {
            Block::Heading {
                level: current,
                content,
            } => {
                if *current == level {
                    return false;
                }
                std::mem::take(content)
            }
            Block::Paragraph { content } => std::mem::take(content),
            Block::CodeBlock(attrs) => inlines_from_text(&attrs.code),
            _ => return false,
        };
        *block = Block::Heading { level, content };
        true
    }

    /// Insert a Giphy embed from a Giphy URL or a bare identifier. Input that
    /// yields no identifier inserts nothing.
    pub fn insert_giphy_embed(&mut self, input: &str) -> bool {
        let input = input.trim();
        let giphy_id = if is_giphy_url(input) {
            extract_giphy_id(input)
        } else if !input.is_empty() && input.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some(input.to_string())
        } else {
            None
        };

        let Some(giphy_id) = giphy_id else {
            return false;
        };
        self.insert_after_cursor(Block::GiphyEmbed(GiphyEmbedAttrs::from_id(giphy_id)));
        true
    }

    pub fn insert_gist_embed(&mut self, url: &str) -> bool {
        let url = url.trim();
        if !is_gist_url(url) {
            return false;
        }
        let Some(gist) = extract_gist_id(url) else {
            return false;
        };
        self.insert_after_cursor(Block::GistEmbed(GistEmbedAttrs {
            gist_id: gist.gist_id,
            filename: gist.filename,
        }));
        true
    }

    /// Link the selection to `url`. A blank URL removes the link instead.
    /// With a collapsed cursor inside a link, that link's target is replaced.
    pub fn insert_link(&mut self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return self.unset_link();
        }

        let range = if self.cursor.is_collapsed() {
            match self.link_run_at_cursor() {
                Some(range) => range,
                None => return false,
            }
        } else {
            self.cursor.selection.clone()
        };

        self.update_marks(range, |marks| marks.link = Some(url.to_string()))
    }

    /// Remove the link mark from the selection, or from the whole link under
    /// a collapsed cursor.
    pub fn unset_link(&mut self) -> bool {
        let range = if self.cursor.is_collapsed() {
            match self.link_run_at_cursor() {
                Some(range) => range,
                None => return false,
            }
        } else {
            self.cursor.selection.clone()
        };

        self.update_marks(range, |marks| marks.link = None)
    }

    /// Add `kind` to the selection, or remove it when every selected run
    /// already carries it.
    pub fn toggle_mark(&mut self, kind: MarkKind) -> bool {
        if self.cursor.is_collapsed() {
            return false;
        }
        let range = self.cursor.selection.clone();
        let Some(content) = self.cursor_inlines() else {
            return false;
        };

        let mut any_text = false;
        let mut all_marked = true;
        for segment in split_runs(content, &range) {
            if let (true, Inline::Text { marks, .. }) = (segment.inside, &segment.inline) {
                any_text = true;
                all_marked &= marks.has(kind);
            }
        }
        if !any_text {
            return false;
        }

        self.update_marks(range, |marks| marks.set(kind, !all_marked))
    }

    fn cursor_inlines(&self) -> Option<&[Inline]> {
        self.document
            .content
            .get(self.cursor.block)
            .and_then(Block::inline_content)
    }

    fn update_marks<F>(&mut self, range: Range<usize>, mut apply: F) -> bool
    where
        F: FnMut(&mut Marks),
    {
        let Some(content) = self
            .document
            .content
            .get_mut(self.cursor.block)
            .and_then(Block::inline_content_mut)
        else {
            return false;
        };

        let mut updated: Vec<Inline> = split_runs(content, &range)
            .into_iter()
            .map(|segment| match segment.inline {
                Inline::Text { text, mut marks } if segment.inside => {
                    apply(&mut marks);
                    Inline::Text { text, marks }
                }
                other => other,
            })
            .collect();
        normalize_inlines(&mut updated);

        if *content == updated {
            return false;
        }
        *content = updated;
        true
    }

    /// Character range of the contiguous same-target link around the cursor.
    fn link_run_at_cursor(&self) -> Option<Range<usize>> {
        let position = self.cursor.selection.start;
        let content = self.cursor_inlines()?;

        let mut spans: Vec<(Range<usize>, Option<&str>)> = Vec::with_capacity(content.len());
        let mut offset = 0;
        for inline in content {
            let len = inline.char_len();
            let link = match inline {
                Inline::Text { marks, .. } => marks.link.as_deref(),
                Inline::HardBreak => None,
            };
            spans.push((offset..offset + len, link));
            offset += len;
        }

        let hit = spans
            .iter()
            .position(|(span, link)| link.is_some() && span.start <= position && position < span.end)
            .or_else(|| {
                spans
                    .iter()
                    .position(|(span, link)| link.is_some() && span.end == position)
            })?;
        let target = spans[hit].1;

        let mut first = hit;
        while first > 0 && spans[first - 1].1 == target {
            first -= 1;
        }
        let mut last = hit;
        while last + 1 < spans.len() && spans[last + 1].1 == target {
            last += 1;
        }
        Some(spans[first].0.start..spans[last].0.end)
    }

    fn insert_after_cursor(&mut self, block: Block) -> usize {
        let index = if self.document.content.is_empty() {
            0
        } else {
            (self.cursor.block + 1).min(self.document.content.len())
        };
        self.document.content.insert(index, block);
        self.cursor = Cursor {
            block: index,
            selection: 0..0,
        };
        index
    }

    fn clamp_selection(&mut self) {
        let len = self
            .document
            .content
            .get(self.cursor.block)
            .map_or(0, block_text_len);
        let start = self.cursor.selection.start.min(len);
        let end = self.cursor.selection.end.clamp(start, len);
        self.cursor.selection = start..end;
    }
}

fn block_text_len(block: &Block) -> usize {
    match block {
        Block::CodeBlock(attrs) => attrs.code.chars().count(),
        other => other
            .inline_content()
            .map_or(0, |inlines| inlines.iter().map(Inline::char_len).sum()),
    }
}

struct Segment {
    inline: Inline,
    inside: bool,
}

/// Split runs at the range boundaries, flagging the pieces inside it.
fn split_runs(content: &[Inline], range: &Range<usize>) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(content.len() + 2);
    let mut offset = 0;

    for inline in content {
        let len = inline.char_len();
        let (start, end) = (offset, offset + len);
        offset = end;

        let Inline::Text { text, marks } = inline else {
            segments.push(Segment {
                inline: inline.clone(),
                inside: range.start <= start && end <= range.end,
            });
            continue;
        };

        let cut_start = range.start.clamp(start, end) - start;
        let cut_end = range.end.clamp(start, end) - start;
        let first = byte_offset(text, cut_start);
        let second = byte_offset(text, cut_end.max(cut_start));

        for (piece, inside) in [
            (&text[..first], false),
            (&text[first..second], true),
            (&text[second..], false),
        ] {
            if !piece.is_empty() {
                segments.push(Segment {
                    inline: Inline::marked(piece, marks.clone()),
                    inside,
                });
            }
        }
    }

    segments
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::DEFAULT_CODE_LANGUAGE;

    fn editor_with(blocks: Vec<Block>) -> Editor {
        Editor::new(Document::new(blocks))
    }

    fn linked(text: &str, href: &str) -> Inline {
        Inline::marked(
            text,
            Marks {
                link: Some(href.into()),
                ..Marks::default()
            },
        )
    }

    #[test]
    fn code_block_toggle_round_trips_paragraph_text() {
        let mut editor = editor_with(vec![Block::paragraph(vec![
            Inline::text("let a = 1;"),
            Inline::HardBreak,
            Inline::text("let b = 2;"),
        ])]);

        assert!(editor.set_code_block(None));
        let Block::CodeBlock(attrs) = &editor.document().content[0] else {
            panic!("expected code block");
        };
        assert_eq!(attrs.code, "let a = 1;\nlet b = 2;");
        assert_eq!(attrs.language.as_str(), DEFAULT_CODE_LANGUAGE);

        assert!(editor.set_code_block(None));
        assert_eq!(
            editor.document().content[0],
            Block::paragraph(vec![
                Inline::text("let a = 1;"),
                Inline::HardBreak,
                Inline::text("let b = 2;"),
            ])
        );
    }

    #[test]
    fn code_block_uses_given_attributes() {
        let mut editor = editor_with(vec![Block::paragraph(vec![Inline::text("fn f() {}")])]);
        editor.set_code_block(Some(CodeBlockAttrs::new(Some("rs")).with_filename("lib.rs")));
        assert_eq!(
            editor.document().content[0],
            Block::CodeBlock(
                CodeBlockAttrs::new(Some("rust"))
                    .with_filename("lib.rs")
                    .with_code("fn f() {}")
            )
        );
    }

    #[test]
    fn code_block_is_inserted_after_atoms_instead_of_nesting() {
        let mut editor = editor_with(vec![Block::HorizontalRule]);
        assert!(editor.set_code_block(None));
        assert_eq!(editor.document().content.len(), 2);
        assert!(matches!(editor.document().content[1], Block::CodeBlock(_)));
        assert_eq!(editor.cursor().block, 1);

        let mut empty = Editor::default();
        assert!(empty.set_code_block(None));
        assert!(matches!(empty.document().content[0], Block::CodeBlock(_)));
    }

    #[test]
    fn giphy_embed_accepts_urls_and_bare_ids() {
        let mut editor = editor_with(vec![Block::paragraph(vec![Inline::text("intro")])]);
        assert!(editor.insert_giphy_embed("https://giphy.com/gifs/funny-cat-XyZ789"));
        assert!(editor.insert_giphy_embed("  AbC123 "));
        assert_eq!(
            editor.document().content[1..],
            [
                Block::GiphyEmbed(GiphyEmbedAttrs::from_id("XyZ789")),
                Block::GiphyEmbed(GiphyEmbedAttrs::from_id("AbC123")),
            ]
        );
        assert_eq!(editor.cursor().block, 2);
    }

    #[test]
    fn underivable_giphy_input_inserts_nothing() {
        let mut editor = editor_with(vec![Block::paragraph(vec![Inline::text("intro")])]);
        for input in ["", "   ", "not an id", "https://giphy.com/", "https://example.com/a.gif"] {
            assert!(!editor.insert_giphy_embed(input), "{input:?} should be rejected");
        }
        assert_eq!(editor.document().content.len(), 1);
    }

    #[test]
    fn gist_embed_keeps_filename() {
        let mut editor = Editor::default();
        assert!(editor.insert_gist_embed("https://gist.github.com/alice/abc123#file-main-rb"));
        assert!(!editor.insert_gist_embed("https://github.com/alice/abc123"));
        assert_eq!(
            editor.document().content,
            vec![Block::GistEmbed(GistEmbedAttrs {
                gist_id: "abc123".into(),
                filename: Some("main-rb".into()),
            })]
        );
    }

    #[test]
    fn insert_link_marks_only_the_selection() {
        let mut editor = editor_with(vec![Block::paragraph(vec![Inline::text("read the docs")])]);
        editor.select(0, 5..13);
        assert!(editor.insert_link("https://docs.example.com"));
        assert_eq!(
            editor.document().content[0],
            Block::paragraph(vec![
                Inline::text("read "),
                linked("the docs", "https://docs.example.com"),
            ])
        );
    }

    #[test]
    fn blank_link_url_removes_the_link() {
        let mut editor = editor_with(vec![Block::paragraph(vec![
            Inline::text("see "),
            linked("here", "https://a.test"),
        ])]);
        editor.select(0, 4..8);
        assert!(editor.insert_link("   "));
        assert_eq!(
            editor.document().content[0],
            Block::paragraph(vec![Inline::text("see here")])
        );
    }

    #[test]
    fn unset_link_at_collapsed_cursor_clears_the_whole_link() {
        let bold_link = Inline::marked(
            "bold",
            Marks {
                bold: true,
                link: Some("https://a.test".into()),
                ..Marks::default()
            },
        );
        let mut editor = editor_with(vec![Block::paragraph(vec![
            Inline::text("x "),
            linked("plain ", "https://a.test"),
            bold_link,
            Inline::text(" y"),
        ])]);
        editor.select(0, 4..4);
        assert!(editor.unset_link());
        assert_eq!(
            editor.document().content[0],
            Block::paragraph(vec![
                Inline::text("x plain "),
                Inline::marked(
                    "bold",
                    Marks {
                        bold: true,
                        ..Marks::default()
                    }
                ),
                Inline::text(" y"),
            ])
        );

        editor.select(0, 0..0);
        assert!(!editor.unset_link());
    }

    #[test]
    fn toggle_mark_adds_then_removes() {
        let mut editor = editor_with(vec![Block::paragraph(vec![Inline::text("hello world")])]);
        editor.select(0, 0..5);
        assert!(editor.toggle_mark(MarkKind::Bold));
        let bold = Marks {
            bold: true,
            ..Marks::default()
        };
        assert_eq!(
            editor.document().content[0],
            Block::paragraph(vec![Inline::marked("hello", bold), Inline::text(" world")])
        );

        assert!(editor.toggle_mark(MarkKind::Bold));
        assert_eq!(
            editor.document().content[0],
            Block::paragraph(vec![Inline::text("hello world")])
        );
    }

    #[test]
    fn marks_do_not_apply_to_code_blocks_or_collapsed_cursors() {
        let mut editor = editor_with(vec![Block::CodeBlock(
            CodeBlockAttrs::default().with_code("x"),
        )]);
        editor.select(0, 0..1);
        assert!(!editor.toggle_mark(MarkKind::Italic));

        let mut editor = editor_with(vec![Block::paragraph(vec![Inline::text("abc")])]);
        editor.select(0, 1..1);
        assert!(!editor.toggle_mark(MarkKind::Italic));
    }

    #[test]
    fn headings_and_paragraphs_convert() {
        let mut editor = editor_with(vec![Block::paragraph(vec![Inline::text("Title")])]);
        let level = HeadingLevel::try_from(2).expect("level");
        assert!(editor.set_heading(level));
        assert!(!editor.set_heading(level));
        assert!(editor.set_paragraph());
        assert_eq!(
            editor.document().content[0],
            Block::paragraph(vec![Inline::text("Title")])
        );
    }

    #[test]
    fn html_round_trip_preserves_edits() {
        let mut editor = Editor::default();
        editor.insert_paragraph("intro");
        editor.set_code_block(Some(CodeBlockAttrs::new(Some("python"))));
        editor.insert_giphy_embed("XyZ789");

        let reloaded = Editor::from_html(&editor.to_html());
        assert_eq!(reloaded.document(), editor.document());
    }
}
