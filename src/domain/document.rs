//! Rich-text document tree.
//!
//! Documents are persisted as HTML (see [`crate::application::codec`]); this
//! module defines the closed set of node types and the invariants attached to
//! their attributes. Embed and image blocks are atomic: everything they need
//! lives in their attribute record.

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Language assigned to code blocks whose language is unset or unrecognised.
pub const DEFAULT_CODE_LANGUAGE: &str = "plaintext";

const SUPPORTED_LANGUAGES: &[&str] = &[
    "bash",
    "c",
    "cpp",
    "csharp",
    "css",
    "diff",
    "dockerfile",
    "go",
    "graphql",
    "haskell",
    "html",
    "java",
    "javascript",
    "json",
    "kotlin",
    "lua",
    "makefile",
    "markdown",
    "php",
    "plaintext",
    "python",
    "ruby",
    "rust",
    "scss",
    "shell",
    "sql",
    "swift",
    "toml",
    "typescript",
    "xml",
    "yaml",
];

const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("c++", "cpp"),
    ("cs", "csharp"),
    ("golang", "go"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("md", "markdown"),
    ("py", "python"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("sh", "shell"),
    ("text", "plaintext"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("txt", "plaintext"),
    ("yml", "yaml"),
    ("zsh", "shell"),
];

/// Normalised code block language. Construction never fails: unknown tokens
/// collapse to [`DEFAULT_CODE_LANGUAGE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Language(String);

impl Language {
    pub fn new(token: Option<&str>) -> Self {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Self::default();
        };

        let lowercase = token.to_ascii_lowercase();
        if let Some(&(_, canonical)) = LANGUAGE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == lowercase)
        {
            return Self(canonical.to_string());
        }

        if SUPPORTED_LANGUAGES.contains(&lowercase.as_str()) {
            Self(lowercase)
        } else {
            Self::default()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_CODE_LANGUAGE
    }
}

impl Default for Language {
    fn default() -> Self {
        Self(DEFAULT_CODE_LANGUAGE.to_string())
    }
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        Self::new(Some(value.as_str()))
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.0
    }
}

/// Heading level in the inclusive range `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=6).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::validation(format!(
                "heading level must be between 1 and 6, got {value}"
            )))
        }
    }
}

impl From<HeadingLevel> for u8 {
    fn from(value: HeadingLevel) -> Self {
        value.0
    }
}

/// Root of a rich-text document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub content: Vec<Block>,
}

impl Document {
    pub fn new(content: Vec<Block>) -> Self {
        Self { content }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Block-level nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph {
        #[serde(default)]
        content: Vec<Inline>,
    },
    Heading {
        level: HeadingLevel,
        #[serde(default)]
        content: Vec<Inline>,
    },
    Blockquote {
        #[serde(default)]
        content: Vec<Block>,
    },
    BulletList {
        #[serde(default)]
        items: Vec<ListItem>,
    },
    OrderedList {
        #[serde(default = "default_list_start")]
        start: u32,
        #[serde(default)]
        items: Vec<ListItem>,
    },
    HorizontalRule,
    Image(ImageAttrs),
    CodeBlock(CodeBlockAttrs),
    GistEmbed(GistEmbedAttrs),
    GiphyEmbed(GiphyEmbedAttrs),
}

fn default_list_start() -> u32 {
    1
}

impl Block {
    pub fn paragraph(content: Vec<Inline>) -> Self {
        let mut content = content;
        normalize_inlines(&mut content);
        Self::Paragraph { content }
    }

    /// Inline children for textblocks (paragraphs and headings).
    pub fn inline_content(&self) -> Option<&[Inline]> {
        match self {
            Block::Paragraph { content } | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn inline_content_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Block::Paragraph { content } | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(default)]
    pub content: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttrs {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Code block attributes. `code` is kept verbatim, including whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlockAttrs {
    #[serde(default)]
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub code: String,
}

impl CodeBlockAttrs {
    pub fn new(language: Option<&str>) -> Self {
        Self {
            language: Language::new(language),
            ..Self::default()
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        self.filename = (!filename.trim().is_empty()).then_some(filename);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistEmbedAttrs {
    #[serde(default)]
    pub gist_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl GistEmbedAttrs {
    /// The Gist identifier, if present and non-blank.
    pub fn gist_id(&self) -> Option<&str> {
        let trimmed = self.gist_id.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Giphy embed attributes: exactly one of `giphy_id` and `src` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiphyEmbedAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub giphy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

/// Where a Giphy embed's image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiphySource<'a> {
    Id(&'a str),
    Url(&'a str),
}

impl GiphyEmbedAttrs {
    pub fn from_id(giphy_id: impl Into<String>) -> Self {
        Self {
            giphy_id: Some(giphy_id.into()),
            src: None,
        }
    }

    pub fn from_src(src: impl Into<String>) -> Self {
        Self {
            giphy_id: None,
            src: Some(src.into()),
        }
    }

    /// Resolve the image source. `None` when both or neither attribute is set.
    pub fn source(&self) -> Option<GiphySource<'_>> {
        let id = non_blank(self.giphy_id.as_deref());
        let src = non_blank(self.src.as_deref());
        match (id, src) {
            (Some(id), None) => Some(GiphySource::Id(id)),
            (None, Some(src)) => Some(GiphySource::Url(src)),
            _ => None,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Inline nodes inside paragraphs and headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Marks::is_plain")]
        marks: Marks,
    },
    HardBreak,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Self::Text {
            text: text.into(),
            marks,
        }
    }

    /// Length in characters; a hard break counts as one.
    pub fn char_len(&self) -> usize {
        match self {
            Inline::Text { text, .. } => text.chars().count(),
            Inline::HardBreak => 1,
        }
    }
}

/// Formatting marks applied to a text run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strike: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Boolean marks that can be toggled on a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    Bold,
    Italic,
    Strike,
    Code,
}

impl Marks {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    pub fn has(&self, kind: MarkKind) -> bool {
        match kind {
            MarkKind::Bold => self.bold,
            MarkKind::Italic => self.italic,
            MarkKind::Strike => self.strike,
            MarkKind::Code => self.code,
        }
    }

    pub fn set(&mut self, kind: MarkKind, enabled: bool) {
        match kind {
            MarkKind::Bold => self.bold = enabled,
            MarkKind::Italic => self.italic = enabled,
            MarkKind::Strike => self.strike = enabled,
            MarkKind::Code => self.code = enabled,
        }
    }
}

/// Merge adjacent text runs with identical marks and drop empty runs.
pub fn normalize_inlines(inlines: &mut Vec<Inline>) {
    let mut merged: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines.drain(..) {
        let Inline::Text { text, marks } = inline else {
            merged.push(Inline::HardBreak);
            continue;
        };
        if text.is_empty() {
            continue;
        }
        if let Some(Inline::Text {
            text: previous,
            marks: previous_marks,
        }) = merged.last_mut()
            && *previous_marks == marks
        {
            previous.push_str(&text);
            continue;
        }
        merged.push(Inline::Text { text, marks });
    }
    *inlines = merged;
}

/// Plain text of inline content; hard breaks become newlines.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut text = String::new();
    for inline in inlines {
        match inline {
            Inline::Text { text: run, .. } => text.push_str(run),
            Inline::HardBreak => text.push('\n'),
        }
    }
    text
}

/// Split plain text into inline runs, turning newlines into hard breaks.
pub fn inlines_from_text(text: &str) -> Vec<Inline> {
    let mut inlines = Vec::new();
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            inlines.push(Inline::HardBreak);
        }
        if !line.is_empty() {
            inlines.push(Inline::text(line));
        }
    }
    inlines
}
