//! Node vocabulary of the editable document tree.
//!
//! This is the tree the editing surfaces operate on. It differs from the
//! markdown AST in three ways:
//! - formatting is a flat, ordered list of [`Mark`]s on each inline leaf,
//! - some constructs are atomic and carry their data as attributes
//!   (`block_image`, `math_inline`, `wikiLink`, `link_definition`, ...),
//! - container invariants are enforced when nodes are built (a details block
//!   always has a summary and at least one content block).
//!
//! The serde representation uses the editor's type names (`alertBlock`,
//! `block_image`, `tableHeader`, ...) so the JSON form can be handed to a
//! front end unchanged.

use crate::ir::nodes::{Align, AlertType};
use serde::{Deserialize, Deserializer, Serialize};

/// Language sentinel marking a code block that holds display math.
pub const MATH_SENTINEL: &str = "$$math$$";

/// The root of a document tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: Vec<Block>,
}

/// Block nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    #[serde(rename = "paragraph")]
    Paragraph(Paragraph),
    #[serde(rename = "heading")]
    Heading(Heading),
    #[serde(rename = "codeBlock")]
    CodeBlock(CodeBlock),
    #[serde(rename = "blockquote")]
    Blockquote(Blockquote),
    #[serde(rename = "alertBlock")]
    AlertBlock(AlertBlock),
    #[serde(rename = "detailsBlock")]
    DetailsBlock(DetailsBlock),
    #[serde(rename = "bulletList")]
    BulletList(ListBlock),
    #[serde(rename = "orderedList")]
    OrderedList(ListBlock),
    #[serde(rename = "horizontalRule")]
    HorizontalRule,
    #[serde(rename = "table")]
    Table(Table),
    #[serde(rename = "block_image")]
    BlockImage(BlockImage),
    #[serde(rename = "link_definition")]
    LinkDefinition(LinkDefinition),
    #[serde(rename = "frontmatter")]
    Frontmatter(Frontmatter),
    #[serde(rename = "html_block")]
    HtmlBlock(HtmlBlock),
    #[serde(rename = "footnote_definition")]
    FootnoteDefinition(FootnoteDefinition),
}

impl Block {
    /// The editor type name of this node.
    pub fn type_name(&self) -> &'static str {
        match self {
            Block::Paragraph(_) => "paragraph",
            Block::Heading(_) => "heading",
            Block::CodeBlock(_) => "codeBlock",
            Block::Blockquote(_) => "blockquote",
            Block::AlertBlock(_) => "alertBlock",
            Block::DetailsBlock(_) => "detailsBlock",
            Block::BulletList(_) => "bulletList",
            Block::OrderedList(_) => "orderedList",
            Block::HorizontalRule => "horizontalRule",
            Block::Table(_) => "table",
            Block::BlockImage(_) => "block_image",
            Block::LinkDefinition(_) => "link_definition",
            Block::Frontmatter(_) => "frontmatter",
            Block::HtmlBlock(_) => "html_block",
            Block::FootnoteDefinition(_) => "footnote_definition",
        }
    }

    /// Source line the block was parsed from, when known.
    pub fn source_line(&self) -> Option<usize> {
        match self {
            Block::Paragraph(n) => n.source_line,
            Block::Heading(n) => n.source_line,
            Block::CodeBlock(n) => n.source_line,
            Block::BlockImage(n) => n.source_line,
            Block::Table(n) => n.source_line,
            _ => None,
        }
    }

    pub fn empty_paragraph() -> Self {
        Block::Paragraph(Paragraph::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub content: Vec<Inline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
}

impl Paragraph {
    pub fn new(content: Vec<Inline>) -> Self {
        Paragraph {
            content,
            source_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    /// Anchor slug; `None` when the heading has no text to derive one from.
    pub id: Option<String>,
    #[serde(default)]
    pub content: Vec<Inline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
}

impl CodeBlock {
    /// A code block carrying display math.
    pub fn math(text: impl Into<String>) -> Self {
        CodeBlock {
            language: Some(MATH_SENTINEL.to_string()),
            text: text.into(),
            source_line: None,
        }
    }

    pub fn is_math(&self) -> bool {
        self.language.as_deref() == Some(MATH_SENTINEL)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blockquote {
    pub content: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertBlock {
    pub alert_type: AlertType,
    #[serde(deserialize_with = "non_empty_blocks")]
    content: Vec<Block>,
}

impl AlertBlock {
    /// Builds an alert, substituting an empty paragraph for empty content.
    pub fn new(alert_type: AlertType, content: Vec<Block>) -> Self {
        AlertBlock {
            alert_type,
            content: non_empty(content),
        }
    }

    pub fn content(&self) -> &[Block] {
        &self.content
    }

    pub fn into_content(self) -> Vec<Block> {
        self.content
    }
}

/// The summary line of a details block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailsSummary {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailsBlock {
    pub open: bool,
    pub summary: DetailsSummary,
    #[serde(deserialize_with = "non_empty_blocks")]
    content: Vec<Block>,
}

impl DetailsBlock {
    pub const DEFAULT_SUMMARY: &'static str = "Details";

    /// Builds a details block.
    ///
    /// A blank summary becomes [`DetailsBlock::DEFAULT_SUMMARY`] and empty
    /// content becomes a single empty paragraph.
    pub fn new(summary: &str, open: bool, content: Vec<Block>) -> Self {
        let summary = summary.trim();
        let text = if summary.is_empty() {
            Self::DEFAULT_SUMMARY.to_string()
        } else {
            summary.to_string()
        };
        DetailsBlock {
            open,
            summary: DetailsSummary { text },
            content: non_empty(content),
        }
    }

    pub fn content(&self) -> &[Block] {
        &self.content
    }

    pub fn into_parts(self) -> (DetailsSummary, bool, Vec<Block>) {
        (self.summary, self.open, self.content)
    }
}

fn non_empty(content: Vec<Block>) -> Vec<Block> {
    if content.is_empty() {
        vec![Block::empty_paragraph()]
    } else {
        content
    }
}

fn non_empty_blocks<'de, D>(deserializer: D) -> Result<Vec<Block>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Block>::deserialize(deserializer).map(non_empty)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListBlock {
    /// First number of an ordered list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    pub tight: bool,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    /// `Some` for task items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    pub content: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Row 0 is the header row.
    pub rows: Vec<TableRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TableCell {
    #[serde(rename = "tableHeader")]
    Header(CellContent),
    #[serde(rename = "tableCell")]
    Data(CellContent),
}

impl TableCell {
    pub fn body(&self) -> &CellContent {
        match self {
            TableCell::Header(cell) | TableCell::Data(cell) => cell,
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self, TableCell::Header(_))
    }
}

/// Cell content is always wrapped in paragraphs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellContent {
    pub align: Option<Align>,
    pub content: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockImage {
    pub src: String,
    pub alt: String,
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDefinition {
    /// The label as written, e.g. `Docs` in `[Docs]: ...`.
    pub identifier: String,
    pub url: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub yaml: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlBlock {
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootnoteDefinition {
    pub label: String,
    pub content: Vec<Block>,
}

/// An inline leaf together with the marks applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inline {
    #[serde(flatten)]
    pub node: InlineNode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline {
            node: InlineNode::Text { text: text.into() },
            marks: Vec::new(),
        }
    }

    pub fn with_marks(node: InlineNode, marks: Vec<Mark>) -> Self {
        Inline { node, marks }
    }

    pub fn has_mark(&self, mark: &Mark) -> bool {
        self.marks.contains(mark)
    }
}

/// Inline leaf kinds. Every variant except `Text` is atomic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InlineNode {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "hardBreak")]
    HardBreak,
    #[serde(rename = "image")]
    Image {
        src: String,
        alt: String,
        title: Option<String>,
    },
    /// Raw LaTeX lives in `content`, not in child text.
    #[serde(rename = "math_inline")]
    MathInline { content: String },
    #[serde(rename = "wikiLink")]
    WikiLink { value: String, alias: Option<String> },
    #[serde(rename = "wikiEmbed")]
    WikiEmbed { value: String, alias: Option<String> },
    #[serde(rename = "footnote_reference")]
    FootnoteReference { label: String },
    #[serde(rename = "html_inline")]
    HtmlInline { html: String },
}

/// Formatting attached to an inline leaf.
///
/// Marks are value objects. A leaf stores them in an ordered `Vec`; that order
/// is the outer-to-inner nesting order used when rebuilding markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
    Link { href: String, title: Option<String> },
    Subscript,
    Superscript,
    Highlight,
    Underline,
}
