//! Treeviz formatter for document trees
//!
//! A visual outline of a [`Document`], one node per line, with box-drawing
//! connectors for nesting:
//!
//! ```text
//! ⧉ document
//! ├─ # Setup {#setup}
//! ├─ ¶ H2O
//! │ ├─ ◦ H
//! │ ├─ ◦ 2 [sub]
//! │ └─ ◦ O
//! └─ ☰ 2 items
//!   ├─ • first
//!   │ └─ ¶ first
//!   └─ • second
//!     └─ ¶ second
//! ```
//!
//! Paragraph lines show the block's plain text; their children list the
//! inline leaves with their marks. Labels are truncated to 30 characters.
//! With `show_line_numbers` every block recorded with a source line is
//! prefixed by that line.
//!
//! Icons
//!     Blocks:
//!         Document: ⧉
//!         Heading: #
//!         Paragraph: ¶
//!         CodeBlock: 𝒱
//!         Math: √
//!         Blockquote: ❝
//!         Alert: ⚠
//!         Details: ▸
//!         List: ☰
//!         ListItem: •
//!         HorizontalRule: ⎯
//!         Table: ▦
//!         TableRow: ─
//!         Image: ▣
//!         LinkDefinition: ≔
//!         Frontmatter: ⚙
//!         Html: ⟨⟩
//!         Footnote: ³
//!     Inlines:
//!         Text: ◦
//!         HardBreak: ↵
//!         WikiLink: ⊕

use crate::error::BabelError;
use crate::format::Format;
use crate::model::nodes::{Block, Document, Inline, InlineNode, Mark};
use crate::model::{block_text, inline_text};
use std::collections::HashMap;

const LABEL_WIDTH: usize = 30;

/// Format implementation for the tree visualisation
#[derive(Debug, Default)]
pub struct TreevizFormat {
    /// Prefix blocks with their source line when known.
    pub show_line_numbers: bool,
}

impl Format for TreevizFormat {
    fn name(&self) -> &str {
        "treeviz"
    }

    fn description(&self) -> &str {
        "Visual tree of the document model"
    }

    fn file_extensions(&self) -> &[&str] {
        &["tree"]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize(&self, doc: &Document) -> Result<String, BabelError> {
        Ok(to_treeviz(doc, self.show_line_numbers))
    }

    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, BabelError> {
        let mut show_line_numbers = self.show_line_numbers;
        for (key, value) in options {
            match (key.as_str(), value.as_str()) {
                ("show-linum" | "show_line_numbers", "true") => show_line_numbers = true,
                ("show-linum" | "show_line_numbers", "false") => show_line_numbers = false,
                _ => {
                    return Err(BabelError::NotSupported(format!(
                        "Unknown treeviz option '{key}={value}'"
                    )))
                }
            }
        }
        Ok(to_treeviz(doc, show_line_numbers))
    }
}

/// Renders a document as a tree.
pub fn to_treeviz(doc: &Document, show_line_numbers: bool) -> String {
    let mut out = String::from("⧉ document\n");
    let mut writer = TreeWriter {
        out: &mut out,
        show_line_numbers,
    };
    writer.blocks(&doc.content, "");
    out
}

struct TreeWriter<'o> {
    out: &'o mut String,
    show_line_numbers: bool,
}

impl TreeWriter<'_> {
    fn line(&mut self, prefix: &str, last: bool, source_line: Option<usize>, label: &str) {
        if self.show_line_numbers {
            match source_line {
                Some(line) => self.out.push_str(&format!("{line:02} ")),
                None => self.out.push_str("   "),
            }
        }
        let connector = if last { "└─" } else { "├─" };
        self.out.push_str(&format!("{prefix}{connector} {label}\n"));
    }

    fn blocks(&mut self, blocks: &[Block], prefix: &str) {
        for (index, block) in blocks.iter().enumerate() {
            self.block(block, prefix, index + 1 == blocks.len());
        }
    }

    fn block(&mut self, block: &Block, prefix: &str, last: bool) {
        let child_prefix = format!("{prefix}{}", if last { "  " } else { "│ " });
        let label = block_label(block);
        self.line(prefix, last, block.source_line(), &label);

        match block {
            Block::Paragraph(p) => self.inlines(&p.content, &child_prefix),
            Block::Heading(h) => self.inlines(&h.content, &child_prefix),
            Block::Blockquote(quote) => self.blocks(&quote.content, &child_prefix),
            Block::AlertBlock(alert) => self.blocks(alert.content(), &child_prefix),
            Block::DetailsBlock(details) => self.blocks(details.content(), &child_prefix),
            Block::FootnoteDefinition(footnote) => self.blocks(&footnote.content, &child_prefix),
            Block::BulletList(list) | Block::OrderedList(list) => {
                for (index, item) in list.items.iter().enumerate() {
                    let item_last = index + 1 == list.items.len();
                    let task = match item.checked {
                        Some(true) => "[x] ",
                        Some(false) => "[ ] ",
                        None => "",
                    };
                    let text = item
                        .content
                        .first()
                        .map(block_text)
                        .unwrap_or_default();
                    let label = format!("• {task}{}", truncate(&text));
                    self.line(&child_prefix, item_last, None, &label);
                    let branch = if item_last { "  " } else { "│ " };
                    let item_prefix = format!("{child_prefix}{branch}");
                    self.blocks(&item.content, &item_prefix);
                }
            }
            Block::Table(table) => {
                for (index, row) in table.rows.iter().enumerate() {
                    let row_last = index + 1 == table.rows.len();
                    let cells: Vec<String> = row
                        .cells
                        .iter()
                        .map(|cell| {
                            let text: String =
                                cell.body().content.iter().map(block_text).collect();
                            if cell.is_header() {
                                format!("**{text}**")
                            } else {
                                text
                            }
                        })
                        .collect();
                    let label = format!("─ {}", truncate(&cells.join(" | ")));
                    self.line(&child_prefix, row_last, None, &label);
                }
            }
            Block::CodeBlock(_)
            | Block::HorizontalRule
            | Block::BlockImage(_)
            | Block::LinkDefinition(_)
            | Block::Frontmatter(_)
            | Block::HtmlBlock(_) => {}
        }
    }

    fn inlines(&mut self, inlines: &[Inline], prefix: &str) {
        // A single unmarked text leaf adds nothing to the block label.
        if let [Inline {
            node: InlineNode::Text { .. },
            marks,
        }] = inlines
        {
            if marks.is_empty() {
                return;
            }
        }
        for (index, inline) in inlines.iter().enumerate() {
            let label = inline_label(inline);
            self.line(prefix, index + 1 == inlines.len(), None, &label);
        }
    }
}

fn block_label(block: &Block) -> String {
    match block {
        Block::Paragraph(p) => format!("¶ {}", truncate(&inline_text(&p.content))),
        Block::Heading(h) => {
            let text = truncate(&inline_text(&h.content));
            let marker = "#".repeat(h.level as usize);
            match &h.id {
                Some(id) => format!("{marker} {text} {{#{id}}}"),
                None => format!("{marker} {text}"),
            }
        }
        Block::CodeBlock(code) if code.is_math() => format!("√ {}", truncate(&code.text)),
        Block::CodeBlock(code) => format!(
            "𝒱 {} ({} lines)",
            code.language.as_deref().unwrap_or("text"),
            code.text.lines().count()
        ),
        Block::Blockquote(_) => "❝ blockquote".to_string(),
        Block::AlertBlock(alert) => format!("⚠ {}", alert.alert_type.as_str()),
        Block::DetailsBlock(details) => {
            let state = if details.open { " (open)" } else { "" };
            format!("▸ {}{state}", truncate(&details.summary.text))
        }
        Block::BulletList(list) | Block::OrderedList(list) => {
            format!("☰ {} items", list.items.len())
        }
        Block::HorizontalRule => "⎯".to_string(),
        Block::Table(table) => format!(
            "▦ {}x{}",
            table.rows.len(),
            table.rows.first().map_or(0, |row| row.cells.len())
        ),
        Block::BlockImage(image) => format!("▣ {} <{}>", truncate(&image.alt), image.src),
        Block::LinkDefinition(definition) => {
            format!("≔ [{}] {}", definition.identifier, definition.url)
        }
        Block::Frontmatter(frontmatter) => {
            format!("⚙ frontmatter ({} lines)", frontmatter.yaml.lines().count())
        }
        Block::HtmlBlock(html) => {
            format!("⟨⟩ {}", truncate(html.html.lines().next().unwrap_or("")))
        }
        Block::FootnoteDefinition(footnote) => format!("³ [^{}]", footnote.label),
    }
}

fn inline_label(inline: &Inline) -> String {
    let body = match &inline.node {
        InlineNode::Text { text } => format!("◦ {}", truncate(text)),
        InlineNode::HardBreak => "↵".to_string(),
        InlineNode::Image { src, alt, .. } => format!("▣ {} <{src}>", truncate(alt)),
        InlineNode::MathInline { content } => format!("√ {}", truncate(content)),
        InlineNode::WikiLink { value, .. } => format!("⊕ [[{value}]]"),
        InlineNode::WikiEmbed { value, .. } => format!("⊕ ![[{value}]]"),
        InlineNode::FootnoteReference { label } => format!("³ [^{label}]"),
        InlineNode::HtmlInline { html } => format!("⟨⟩ {}", truncate(html)),
    };
    if inline.marks.is_empty() {
        body
    } else {
        let marks: Vec<String> = inline.marks.iter().map(mark_name).collect();
        format!("{body} [{}]", marks.join(", "))
    }
}

fn mark_name(mark: &Mark) -> String {
    match mark {
        Mark::Bold => "bold".to_string(),
        Mark::Italic => "italic".to_string(),
        Mark::Strike => "strike".to_string(),
        Mark::Code => "code".to_string(),
        Mark::Link { href, .. } => format!("link {href}"),
        Mark::Subscript => "sub".to_string(),
        Mark::Superscript => "sup".to_string(),
        Mark::Highlight => "highlight".to_string(),
        Mark::Underline => "underline".to_string(),
    }
}

fn truncate(text: &str) -> String {
    let text = text.replace('\n', " ");
    if text.chars().count() > LABEL_WIDTH {
        let cut: String = text.chars().take(LABEL_WIDTH - 1).collect();
        format!("{cut}…")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::nodes::{Heading, ListBlock, ListItem, Paragraph};
    use insta::assert_snapshot;

    fn sample() -> Document {
        Document {
            content: vec![
                Block::Heading(Heading {
                    level: 1,
                    id: Some("setup".to_string()),
                    content: vec![Inline::text("Setup")],
                    source_line: Some(1),
                }),
                Block::Paragraph(Paragraph {
                    content: vec![
                        Inline::text("H"),
                        Inline::with_marks(
                            InlineNode::Text {
                                text: "2".to_string(),
                            },
                            vec![Mark::Subscript],
                        ),
                        Inline::text("O"),
                    ],
                    source_line: Some(3),
                }),
                Block::BulletList(ListBlock {
                    start: None,
                    tight: true,
                    items: vec![ListItem {
                        checked: Some(true),
                        content: vec![Block::Paragraph(Paragraph::new(vec![Inline::text("done")]))],
                    }],
                }),
            ],
        }
    }

    #[test]
    fn test_tree() {
        assert_snapshot!(to_treeviz(&sample(), false).trim_end(), @r"
        ⧉ document
        ├─ # Setup {#setup}
        ├─ ¶ H2O
        │ ├─ ◦ H
        │ ├─ ◦ 2 [sub]
        │ └─ ◦ O
        └─ ☰ 1 items
          └─ • [x] done
            └─ ¶ done
        ");
    }

    #[test]
    fn test_line_numbers() {
        let tree = to_treeviz(&sample(), true);
        assert!(tree.contains("01 ├─ # Setup"), "{tree}");
        assert!(tree.contains("03 ├─ ¶ H2O"), "{tree}");
    }

    #[test]
    fn test_truncate() {
        let long = "x".repeat(40);
        assert_eq!(truncate(&long).chars().count(), LABEL_WIDTH);
    }
}
