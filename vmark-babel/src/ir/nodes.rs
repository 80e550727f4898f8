//! Core data structures for the markdown syntax tree.
//!
//! The tree mirrors the markdown grammar closely: formatting is expressed by
//! nesting (`Strong(vec![Emphasis(..)])`), never by flat attributes. Every
//! node kind is a variant of [`Block`] or [`Inline`], so converters match
//! exhaustively instead of switching on type strings.

use serde::Serialize;

/// A location in the markdown source (1-based, like comrak's sourcepos).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub line: usize,
    pub column: usize,
}

/// Source span attached by the parser.
///
/// Positions are advisory provenance only (editor gutter mapping); nothing in
/// the pipeline relies on them for correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub start: Point,
    pub end: Point,
}

impl Position {
    pub fn lines(start: usize, end: usize) -> Self {
        Position {
            start: Point {
                line: start,
                column: 1,
            },
            end: Point {
                line: end,
                column: 1,
            },
        }
    }
}

/// The root of a markdown syntax tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Root {
    pub children: Vec<Block>,
}

/// Block-level (flow) nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Paragraph(Paragraph),
    Heading(Heading),
    Code(Code),
    Math(MathBlock),
    Blockquote(Blockquote),
    List(List),
    ThematicBreak(ThematicBreak),
    Table(Table),
    Definition(Definition),
    Frontmatter(Frontmatter),
    Details(Details),
    Alert(Alert),
    HtmlBlock(HtmlBlock),
    FootnoteDefinition(FootnoteDefinition),
}

impl Block {
    pub fn position(&self) -> Option<Position> {
        match self {
            Block::Paragraph(n) => n.position,
            Block::Heading(n) => n.position,
            Block::Code(n) => n.position,
            Block::Math(n) => n.position,
            Block::Blockquote(n) => n.position,
            Block::List(n) => n.position,
            Block::ThematicBreak(n) => n.position,
            Block::Table(n) => n.position,
            Block::Definition(n) => n.position,
            Block::Frontmatter(n) => n.position,
            Block::Details(n) => n.position,
            Block::Alert(n) => n.position,
            Block::HtmlBlock(n) => n.position,
            Block::FootnoteDefinition(n) => n.position,
        }
    }

    pub fn start_line(&self) -> Option<usize> {
        self.position().map(|p| p.start.line)
    }

    fn position_mut(&mut self) -> &mut Option<Position> {
        match self {
            Block::Paragraph(n) => &mut n.position,
            Block::Heading(n) => &mut n.position,
            Block::Code(n) => &mut n.position,
            Block::Math(n) => &mut n.position,
            Block::Blockquote(n) => &mut n.position,
            Block::List(n) => &mut n.position,
            Block::ThematicBreak(n) => &mut n.position,
            Block::Table(n) => &mut n.position,
            Block::Definition(n) => &mut n.position,
            Block::Frontmatter(n) => &mut n.position,
            Block::Details(n) => &mut n.position,
            Block::Alert(n) => &mut n.position,
            Block::HtmlBlock(n) => &mut n.position,
            Block::FootnoteDefinition(n) => &mut n.position,
        }
    }

    /// Moves this block and everything nested in it down by `offset` lines.
    pub fn shift_lines(&mut self, offset: usize) {
        if let Some(position) = self.position_mut() {
            position.start.line += offset;
            position.end.line += offset;
        }
        let children: &mut [Block] = match self {
            Block::Blockquote(n) => &mut n.children,
            Block::Details(n) => &mut n.children,
            Block::Alert(n) => &mut n.children,
            Block::FootnoteDefinition(n) => &mut n.children,
            Block::List(list) => {
                for item in &mut list.children {
                    item.children.iter_mut().for_each(|b| b.shift_lines(offset));
                }
                return;
            }
            _ => return,
        };
        children.iter_mut().for_each(|b| b.shift_lines(offset));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Paragraph {
    pub children: Vec<Inline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heading {
    /// 1 to 6.
    pub depth: u8,
    pub children: Vec<Inline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Code {
    pub lang: Option<String>,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// `$$ ... $$` display math.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MathBlock {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Blockquote {
    pub children: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct List {
    pub ordered: bool,
    pub start: Option<u32>,
    /// Loose lists separate their items with blank lines.
    pub spread: bool,
    pub children: Vec<ListItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListItem {
    /// `None` for a plain item, `Some(done)` for a task item.
    pub checked: Option<bool>,
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThematicBreak {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Column alignment of a GFM table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    /// One entry per column; `None` means no explicit alignment.
    pub align: Vec<Option<Align>>,
    /// The first row is the header row.
    pub rows: Vec<TableRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableCell {
    pub children: Vec<Inline>,
}

/// A link reference definition: `[label]: url "title"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    /// Normalized (case-folded, whitespace-collapsed) lookup key.
    pub identifier: String,
    /// The label as written in the source.
    pub label: String,
    pub url: String,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Raw YAML frontmatter, without the `---` fences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frontmatter {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// `<details><summary>..</summary> .. </details>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Details {
    pub summary: String,
    pub open: bool,
    pub children: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// GitHub alert kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertType {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AlertType {
    pub const ALL: [AlertType; 5] = [
        AlertType::Note,
        AlertType::Tip,
        AlertType::Important,
        AlertType::Warning,
        AlertType::Caution,
    ];

    /// The marker keyword, e.g. `NOTE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Note => "NOTE",
            AlertType::Tip => "TIP",
            AlertType::Important => "IMPORTANT",
            AlertType::Warning => "WARNING",
            AlertType::Caution => "CAUTION",
        }
    }

    /// Case-insensitive lookup of a marker keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        AlertType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(keyword))
    }
}

/// `> [!TYPE]` callout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub alert_type: AlertType,
    pub children: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlBlock {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// `[^label]: content`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootnoteDefinition {
    pub identifier: String,
    pub children: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Inline (phrasing) nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Delete(Vec<Inline>),
    InlineCode(String),
    Link(Link),
    Image(Image),
    Break,
    InlineMath(String),
    Subscript(Vec<Inline>),
    Superscript(Vec<Inline>),
    Highlight(Vec<Inline>),
    Underline(Vec<Inline>),
    WikiLink(WikiLink),
    WikiEmbed(WikiLink),
    FootnoteReference(String),
    LinkReference(LinkReference),
    ImageReference(ImageReference),
    Html(String),
}

impl Inline {
    pub fn text(value: impl Into<String>) -> Self {
        Inline::Text(value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub url: String,
    pub title: Option<String>,
    pub children: Vec<Inline>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub url: String,
    pub alt: String,
    pub title: Option<String>,
}

/// Target of a `[[...]]` link or `![[...]]` embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WikiLink {
    pub value: String,
    pub alias: Option<String>,
}

/// How a reference-style link was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    /// `[text][id]`
    Full,
    /// `[id][]`
    Collapsed,
    /// `[id]`
    Shortcut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkReference {
    pub identifier: String,
    pub label: String,
    pub reference_type: ReferenceType,
    pub children: Vec<Inline>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageReference {
    pub identifier: String,
    pub label: String,
    pub reference_type: ReferenceType,
    pub alt: String,
}

/// Normalizes a reference label into a lookup identifier.
///
/// Case-folds and collapses internal whitespace runs, so `[Foo  Bar]` and
/// `[foo bar]` resolve to the same definition.
pub fn normalize_identifier(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  Foo \n Bar "), "foo bar");
        assert_eq!(normalize_identifier("ID"), "id");
    }

    #[test]
    fn test_alert_keyword_is_case_insensitive() {
        assert_eq!(AlertType::from_keyword("tip"), Some(AlertType::Tip));
        assert_eq!(AlertType::from_keyword("Warning"), Some(AlertType::Warning));
        assert_eq!(AlertType::from_keyword("DANGER"), None);
    }

    #[test]
    fn test_block_start_line() {
        let block = Block::ThematicBreak(ThematicBreak {
            position: Some(Position::lines(4, 4)),
        });
        assert_eq!(block.start_line(), Some(4));
    }
}
