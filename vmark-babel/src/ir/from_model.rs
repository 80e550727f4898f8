//! Conversion from the document model back to the markdown AST.
//!
//! Inline leaves carry flat mark lists; the AST wants nested wrappers. The
//! converter keeps a stack of open wrappers while walking the leaves of one
//! block:
//!
//! 1. keep the longest prefix of the stack whose marks the next leaf still
//!    carries, closing everything above it,
//! 2. open the leaf's remaining marks in their stored order,
//! 3. append the leaf to the innermost open wrapper.
//!
//! So `[bold] [bold, italic] [bold]` becomes `strong(a, emphasis(b), c)`, and
//! the stored mark order decides which wrapper ends up outermost.
//!
//! The `code` mark never opens a wrapper: a leaf carrying it becomes an
//! `inlineCode` node with the leaf's plain text, and adjacent code leaves
//! inside the same wrapper are joined into one node.

use crate::ir::nodes::{
    self as ast, normalize_identifier, Alert, Blockquote, Code, Definition, Details,
    FootnoteDefinition, Frontmatter, Heading, HtmlBlock, MathBlock, Position, Root, ThematicBreak,
};
use crate::model::nodes::{Block, CodeBlock, Document, Inline, InlineNode, ListBlock, Mark, Table};

/// Converts a document into a markdown AST.
pub fn to_ast(document: &Document) -> Root {
    Root {
        children: blocks(&document.content),
    }
}

fn blocks(blocks: &[Block]) -> Vec<ast::Block> {
    blocks.iter().map(block).collect()
}

fn position(source_line: Option<usize>) -> Option<Position> {
    source_line.map(|line| Position::lines(line, line))
}

fn block(block: &Block) -> ast::Block {
    match block {
        Block::Paragraph(paragraph) => ast::Block::Paragraph(ast::Paragraph {
            children: inlines(&paragraph.content),
            position: position(paragraph.source_line),
        }),
        Block::Heading(heading) => ast::Block::Heading(Heading {
            depth: heading.level.clamp(1, 6),
            children: inlines(&heading.content),
            position: position(heading.source_line),
        }),
        Block::CodeBlock(code) => code_block(code),
        Block::Blockquote(quote) => ast::Block::Blockquote(Blockquote {
            children: blocks(&quote.content),
            position: None,
        }),
        Block::AlertBlock(alert) => ast::Block::Alert(Alert {
            alert_type: alert.alert_type,
            children: blocks(alert.content()),
            position: None,
        }),
        Block::DetailsBlock(details) => ast::Block::Details(Details {
            summary: details.summary.text.clone(),
            open: details.open,
            children: blocks(details.content()),
            position: None,
        }),
        Block::BulletList(list) => list_block(list, false),
        Block::OrderedList(list) => list_block(list, true),
        Block::HorizontalRule => ast::Block::ThematicBreak(ThematicBreak { position: None }),
        Block::Table(table) => table_block(table),
        Block::BlockImage(image) => ast::Block::Paragraph(ast::Paragraph {
            children: vec![ast::Inline::Image(ast::Image {
                url: image.src.clone(),
                alt: image.alt.clone(),
                title: image.title.clone(),
            })],
            position: position(image.source_line),
        }),
        Block::LinkDefinition(definition) => ast::Block::Definition(Definition {
            identifier: normalize_identifier(&definition.identifier),
            label: definition.identifier.clone(),
            url: definition.url.clone(),
            title: definition.title.clone(),
            position: None,
        }),
        Block::Frontmatter(frontmatter) => ast::Block::Frontmatter(Frontmatter {
            value: frontmatter.yaml.clone(),
            position: None,
        }),
        Block::HtmlBlock(html) => ast::Block::HtmlBlock(HtmlBlock {
            value: html.html.clone(),
            position: None,
        }),
        Block::FootnoteDefinition(footnote) => {
            ast::Block::FootnoteDefinition(FootnoteDefinition {
                identifier: footnote.label.clone(),
                children: blocks(&footnote.content),
                position: None,
            })
        }
    }
}

fn code_block(code: &CodeBlock) -> ast::Block {
    if code.is_math() {
        ast::Block::Math(MathBlock {
            value: code.text.clone(),
            position: position(code.source_line),
        })
    } else {
        ast::Block::Code(Code {
            lang: code.language.clone().filter(|lang| !lang.is_empty()),
            value: code.text.clone(),
            position: position(code.source_line),
        })
    }
}

fn list_block(list: &ListBlock, ordered: bool) -> ast::Block {
    ast::Block::List(ast::List {
        ordered,
        start: if ordered { Some(list.start.unwrap_or(1)) } else { None },
        spread: !list.tight,
        children: list
            .items
            .iter()
            .map(|item| ast::ListItem {
                checked: item.checked,
                children: blocks(&item.content),
            })
            .collect(),
        position: None,
    })
}

fn table_block(table: &Table) -> ast::Block {
    let align = table
        .rows
        .first()
        .map(|header| header.cells.iter().map(|cell| cell.body().align).collect())
        .unwrap_or_default();

    let rows = table
        .rows
        .iter()
        .map(|row| ast::TableRow {
            cells: row
                .cells
                .iter()
                .map(|cell| ast::TableCell {
                    children: cell_inlines(&cell.body().content),
                })
                .collect(),
        })
        .collect();

    ast::Block::Table(ast::Table {
        align,
        rows,
        position: position(table.source_line),
    })
}

/// Cells hold paragraphs; a table cell in markdown is one line of inlines.
fn cell_inlines(content: &[Block]) -> Vec<ast::Inline> {
    let mut out = Vec::new();
    for (index, block) in content.iter().enumerate() {
        if index > 0 {
            out.push(ast::Inline::Break);
        }
        match block {
            Block::Paragraph(paragraph) => out.extend(inlines(&paragraph.content)),
            Block::Heading(heading) => out.extend(inlines(&heading.content)),
            other => out.push(ast::Inline::text(crate::model::block_text(other))),
        }
    }
    out
}

/// Open wrapper on the nesting stack.
struct Frame {
    mark: Mark,
    children: Vec<ast::Inline>,
}

/// Rebuilds nested inline wrappers from leaves with flat marks.
pub fn inlines(leaves: &[Inline]) -> Vec<ast::Inline> {
    let mut root: Vec<ast::Inline> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for leaf in leaves {
        let wanted: Vec<&Mark> = leaf.marks.iter().filter(|m| **m != Mark::Code).collect();

        let keep = stack
            .iter()
            .take_while(|frame| wanted.contains(&&frame.mark))
            .count();
        while stack.len() > keep {
            close_frame(&mut stack, &mut root);
        }

        for mark in wanted {
            if !stack.iter().any(|frame| frame.mark == *mark) {
                stack.push(Frame {
                    mark: mark.clone(),
                    children: Vec::new(),
                });
            }
        }

        let target = match stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut root,
        };
        push_leaf(target, leaf);
    }

    while !stack.is_empty() {
        close_frame(&mut stack, &mut root);
    }
    root
}

fn close_frame(stack: &mut Vec<Frame>, root: &mut Vec<ast::Inline>) {
    let Some(frame) = stack.pop() else {
        return;
    };
    let wrapped = wrap(frame.mark, frame.children);
    match stack.last_mut() {
        Some(parent) => parent.children.push(wrapped),
        None => root.push(wrapped),
    }
}

fn wrap(mark: Mark, children: Vec<ast::Inline>) -> ast::Inline {
    match mark {
        Mark::Bold => ast::Inline::Strong(children),
        Mark::Italic => ast::Inline::Emphasis(children),
        Mark::Strike => ast::Inline::Delete(children),
        Mark::Subscript => ast::Inline::Subscript(children),
        Mark::Superscript => ast::Inline::Superscript(children),
        Mark::Highlight => ast::Inline::Highlight(children),
        Mark::Underline => ast::Inline::Underline(children),
        Mark::Link { href, title } => ast::Inline::Link(ast::Link {
            url: href,
            title,
            children,
        }),
        // Never pushed on the stack.
        Mark::Code => ast::Inline::InlineCode(crate::common::text::plain_text(&children)),
    }
}

fn push_leaf(target: &mut Vec<ast::Inline>, leaf: &Inline) {
    let node = match &leaf.node {
        InlineNode::Text { text } if leaf.has_mark(&Mark::Code) => {
            if let Some(ast::Inline::InlineCode(previous)) = target.last_mut() {
                previous.push_str(text);
                return;
            }
            ast::Inline::InlineCode(text.clone())
        }
        InlineNode::Text { text } => {
            if let Some(ast::Inline::Text(previous)) = target.last_mut() {
                previous.push_str(text);
                return;
            }
            ast::Inline::Text(text.clone())
        }
        InlineNode::HardBreak => ast::Inline::Break,
        InlineNode::Image { src, alt, title } => ast::Inline::Image(ast::Image {
            url: src.clone(),
            alt: alt.clone(),
            title: title.clone(),
        }),
        InlineNode::MathInline { content } => ast::Inline::InlineMath(content.clone()),
        InlineNode::WikiLink { value, alias } => ast::Inline::WikiLink(ast::WikiLink {
            value: value.clone(),
            alias: alias.clone(),
        }),
        InlineNode::WikiEmbed { value, alias } => ast::Inline::WikiEmbed(ast::WikiLink {
            value: value.clone(),
            alias: alias.clone(),
        }),
        InlineNode::FootnoteReference { label } => ast::Inline::FootnoteReference(label.clone()),
        InlineNode::HtmlInline { html } => ast::Inline::Html(html.clone()),
    };
    target.push(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::{AlertType, Align};
    use crate::model::nodes::{AlertBlock, CellContent, Paragraph, TableCell, TableRow};

    fn leaf(text: &str, marks: Vec<Mark>) -> Inline {
        Inline::with_marks(
            InlineNode::Text {
                text: text.to_string(),
            },
            marks,
        )
    }

    #[test]
    fn test_shared_marks_share_a_wrapper() {
        let leaves = vec![
            leaf("a", vec![Mark::Bold]),
            leaf("b", vec![Mark::Bold, Mark::Italic]),
            leaf("c", vec![Mark::Bold]),
        ];
        assert_eq!(
            inlines(&leaves),
            vec![ast::Inline::Strong(vec![
                ast::Inline::text("a"),
                ast::Inline::Emphasis(vec![ast::Inline::text("b")]),
                ast::Inline::text("c"),
            ])]
        );
    }

    #[test]
    fn test_mark_order_decides_nesting() {
        let leaves = vec![leaf("x", vec![Mark::Italic, Mark::Bold])];
        assert_eq!(
            inlines(&leaves),
            vec![ast::Inline::Emphasis(vec![ast::Inline::Strong(vec![
                ast::Inline::text("x")
            ])])]
        );
    }

    #[test]
    fn test_code_mark_flattens_to_inline_code() {
        let link = Mark::Link {
            href: "https://x.com".to_string(),
            title: None,
        };
        let leaves = vec![
            leaf("see ", vec![link.clone()]),
            leaf("fn", vec![link.clone(), Mark::Code, Mark::Bold]),
            leaf("()", vec![link.clone(), Mark::Code, Mark::Bold]),
        ];
        assert_eq!(
            inlines(&leaves),
            vec![ast::Inline::Link(ast::Link {
                url: "https://x.com".to_string(),
                title: None,
                children: vec![
                    ast::Inline::text("see "),
                    ast::Inline::Strong(vec![ast::Inline::InlineCode("fn()".to_string())]),
                ],
            })]
        );
    }

    #[test]
    fn test_atomic_leaves_map_directly() {
        let leaves = vec![
            Inline::with_marks(
                InlineNode::MathInline {
                    content: "x^2".to_string(),
                },
                vec![],
            ),
            Inline::with_marks(
                InlineNode::FootnoteReference {
                    label: "1".to_string(),
                },
                vec![],
            ),
        ];
        assert_eq!(
            inlines(&leaves),
            vec![
                ast::Inline::InlineMath("x^2".to_string()),
                ast::Inline::FootnoteReference("1".to_string()),
            ]
        );
    }

    #[test]
    fn test_math_code_block_becomes_math() {
        let doc = Document {
            content: vec![Block::CodeBlock(CodeBlock::math("a+b"))],
        };
        assert!(matches!(&to_ast(&doc).children[0], ast::Block::Math(m) if m.value == "a+b"));
    }

    #[test]
    fn test_alert_block_becomes_alert() {
        let doc = Document {
            content: vec![Block::AlertBlock(AlertBlock::new(AlertType::Warning, vec![]))],
        };
        match &to_ast(&doc).children[0] {
            ast::Block::Alert(alert) => {
                assert_eq!(alert.alert_type, AlertType::Warning);
                assert_eq!(alert.children.len(), 1);
            }
            other => panic!("expected alert, got {other:?}"),
        }
    }

    #[test]
    fn test_table_alignment_comes_from_header_row() {
        let cell = |header: bool, align: Option<Align>, text: &str| {
            let body = CellContent {
                align,
                content: vec![Block::Paragraph(Paragraph::new(vec![Inline::text(text)]))],
            };
            if header {
                TableCell::Header(body)
            } else {
                TableCell::Data(body)
            }
        };
        let doc = Document {
            content: vec![Block::Table(Table {
                rows: vec![
                    TableRow {
                        cells: vec![cell(true, Some(Align::Left), "a"), cell(true, None, "b")],
                    },
                    TableRow {
                        cells: vec![cell(false, Some(Align::Left), "1"), cell(false, None, "2")],
                    },
                ],
                source_line: None,
            })],
        };
        match &to_ast(&doc).children[0] {
            ast::Block::Table(table) => {
                assert_eq!(table.align, vec![Some(Align::Left), None]);
                assert_eq!(table.rows[1].cells[0].children, vec![ast::Inline::text("1")]);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }
}
