//! Conversion from the markdown AST to the document model.
//!
//! Formatting wrappers (`strong`, `emphasis`, `link`, ...) are flattened into
//! mark lists on the inline leaves; the order of a leaf's marks is the
//! wrapper order from outermost to innermost. Besides the one-to-one mappings,
//! the converter:
//!
//! - turns a blockquote whose first text is `[!NOTE]` (or another alert
//!   keyword) into an `alertBlock`,
//! - promotes a paragraph holding a single image to `block_image`,
//! - copies table column alignment onto every cell of the column,
//! - assigns each heading a slug unique within this conversion,
//! - writes unresolved references back out as literal bracket text.
//!
//! Nodes the target [`Schema`] lacks are skipped (logged at debug level), so
//! a reduced schema still yields a best-effort document.

use crate::common::slug::Slugger;
use crate::common::text::plain_text;
use crate::ir::nodes::{self as ast, AlertType, ReferenceType, Root};
use crate::model::nodes::{
    AlertBlock, Block, BlockImage, Blockquote, CellContent, CodeBlock, DetailsBlock, Document,
    FootnoteDefinition, Frontmatter, Heading, HtmlBlock, Inline, InlineNode, LinkDefinition,
    ListBlock, ListItem, Mark, Paragraph, Table, TableCell, TableRow,
};
use crate::model::schema::{NodeType, Schema};
use tracing::debug;

/// Converts a (resolved) markdown AST into a document.
///
/// Heading slugs are unique within this call only; every call starts from an
/// empty slug set.
pub fn to_document(root: &Root, schema: &Schema) -> Document {
    let mut converter = ModelConverter::new(schema);
    Document {
        content: converter.blocks(&root.children),
    }
}

/// State of one AST → document conversion.
struct ModelConverter<'s> {
    schema: &'s Schema,
    slugger: Slugger,
}

impl<'s> ModelConverter<'s> {
    fn new(schema: &'s Schema) -> Self {
        ModelConverter {
            schema,
            slugger: Slugger::new(),
        }
    }

    fn supports(&self, node: NodeType) -> bool {
        let supported = self.schema.supports(node);
        if !supported {
            debug!(?node, "schema lacks node type, skipping");
        }
        supported
    }

    fn blocks(&mut self, blocks: &[ast::Block]) -> Vec<Block> {
        blocks.iter().filter_map(|block| self.block(block)).collect()
    }

    fn block(&mut self, block: &ast::Block) -> Option<Block> {
        let source_line = block.start_line();
        match block {
            ast::Block::Paragraph(paragraph) => {
                Some(self.paragraph(&paragraph.children, source_line))
            }

            ast::Block::Heading(heading) => {
                if !self.supports(NodeType::Heading) {
                    return None;
                }
                let id = self.slugger.slug(&plain_text(&heading.children));
                Some(Block::Heading(Heading {
                    level: heading.depth.clamp(1, 6),
                    id,
                    content: self.inlines(&heading.children),
                    source_line,
                }))
            }

            ast::Block::Code(code) => self.supports(NodeType::CodeBlock).then(|| {
                Block::CodeBlock(CodeBlock {
                    language: code.lang.clone(),
                    text: code.value.clone(),
                    source_line,
                })
            }),

            ast::Block::Math(math) => self.supports(NodeType::CodeBlock).then(|| {
                let mut block = CodeBlock::math(math.value.clone());
                block.source_line = source_line;
                Block::CodeBlock(block)
            }),

            ast::Block::Blockquote(quote) => self.blockquote(&quote.children),

            ast::Block::Alert(alert) => {
                if !self.supports(NodeType::AlertBlock) {
                    return None;
                }
                let content = self.blocks(&alert.children);
                Some(Block::AlertBlock(AlertBlock::new(alert.alert_type, content)))
            }

            ast::Block::Details(details) => {
                if !self.supports(NodeType::DetailsBlock) {
                    return None;
                }
                let content = self.blocks(&details.children);
                Some(Block::DetailsBlock(DetailsBlock::new(
                    &details.summary,
                    details.open,
                    content,
                )))
            }

            ast::Block::List(list) => self.list(list),

            ast::Block::ThematicBreak(_) => {
                self.supports(NodeType::HorizontalRule).then_some(Block::HorizontalRule)
            }

            ast::Block::Table(table) => {
                if !self.supports(NodeType::Table) {
                    return None;
                }
                Some(Block::Table(self.table(table, source_line)))
            }

            ast::Block::Definition(definition) => {
                self.supports(NodeType::LinkDefinition).then(|| {
                    Block::LinkDefinition(LinkDefinition {
                        identifier: definition.label.clone(),
                        url: definition.url.clone(),
                        title: definition.title.clone(),
                    })
                })
            }

            ast::Block::Frontmatter(frontmatter) => {
                self.supports(NodeType::Frontmatter).then(|| {
                    Block::Frontmatter(Frontmatter {
                        yaml: frontmatter.value.clone(),
                    })
                })
            }

            ast::Block::HtmlBlock(html) => self.supports(NodeType::HtmlBlock).then(|| {
                Block::HtmlBlock(HtmlBlock {
                    html: html.value.clone(),
                })
            }),

            ast::Block::FootnoteDefinition(footnote) => {
                if !self.supports(NodeType::FootnoteDefinition) {
                    return None;
                }
                let content = non_empty(self.blocks(&footnote.children));
                Some(Block::FootnoteDefinition(FootnoteDefinition {
                    label: footnote.identifier.clone(),
                    content,
                }))
            }
        }
    }

    fn paragraph(&mut self, children: &[ast::Inline], source_line: Option<usize>) -> Block {
        if let Some(image) = lone_image(children) {
            if self.supports(NodeType::BlockImage) {
                return Block::BlockImage(BlockImage {
                    src: image.url.clone(),
                    alt: image.alt.clone(),
                    title: image.title.clone(),
                    source_line,
                });
            }
        }
        Block::Paragraph(Paragraph {
            content: self.inlines(children),
            source_line,
        })
    }

    fn blockquote(&mut self, children: &[ast::Block]) -> Option<Block> {
        if self.schema.supports(NodeType::AlertBlock) {
            if let Some((alert_type, body)) = split_alert_marker(children) {
                let content = self.blocks(&body);
                return Some(Block::AlertBlock(AlertBlock::new(alert_type, content)));
            }
        }
        if !self.supports(NodeType::Blockquote) {
            return None;
        }
        Some(Block::Blockquote(Blockquote {
            content: self.blocks(children),
        }))
    }

    fn list(&mut self, list: &ast::List) -> Option<Block> {
        let node = if list.ordered {
            NodeType::OrderedList
        } else {
            NodeType::BulletList
        };
        if !self.supports(node) || !self.supports(NodeType::ListItem) {
            return None;
        }

        let items = list
            .children
            .iter()
            .map(|item| ListItem {
                checked: item.checked,
                content: non_empty(self.blocks(&item.children)),
            })
            .collect();
        let block = ListBlock {
            start: list.start.filter(|_| list.ordered),
            tight: !list.spread,
            items,
        };
        Some(if list.ordered {
            Block::OrderedList(block)
        } else {
            Block::BulletList(block)
        })
    }

    fn table(&mut self, table: &ast::Table, source_line: Option<usize>) -> Table {
        let rows = table
            .rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| TableRow {
                cells: row
                    .cells
                    .iter()
                    .enumerate()
                    .map(|(column, cell)| {
                        let body = CellContent {
                            align: table.align.get(column).copied().flatten(),
                            content: vec![Block::Paragraph(Paragraph::new(
                                self.inlines(&cell.children),
                            ))],
                        };
                        if row_index == 0 {
                            TableCell::Header(body)
                        } else {
                            TableCell::Data(body)
                        }
                    })
                    .collect(),
            })
            .collect();
        Table { rows, source_line }
    }

    fn inlines(&mut self, inlines: &[ast::Inline]) -> Vec<Inline> {
        let mut out = Vec::new();
        self.collect_inlines(inlines, &[], &mut out);
        merge_runs(out)
    }

    fn collect_inlines(&mut self, inlines: &[ast::Inline], marks: &[Mark], out: &mut Vec<Inline>) {
        for inline in inlines {
            self.collect_inline(inline, marks, out);
        }
    }

    fn collect_inline(&mut self, inline: &ast::Inline, marks: &[Mark], out: &mut Vec<Inline>) {
        match inline {
            ast::Inline::Text(text) => push_text(out, text, marks),
            ast::Inline::Strong(children) => self.wrapped(children, marks, Mark::Bold, out),
            ast::Inline::Emphasis(children) => self.wrapped(children, marks, Mark::Italic, out),
            ast::Inline::Delete(children) => self.wrapped(children, marks, Mark::Strike, out),
            ast::Inline::Subscript(children) => self.wrapped(children, marks, Mark::Subscript, out),
            ast::Inline::Superscript(children) => {
                self.wrapped(children, marks, Mark::Superscript, out)
            }
            ast::Inline::Highlight(children) => self.wrapped(children, marks, Mark::Highlight, out),
            ast::Inline::Underline(children) => self.wrapped(children, marks, Mark::Underline, out),
            ast::Inline::InlineCode(code) => {
                push_text(out, code, &with_mark(marks, Mark::Code));
            }
            ast::Inline::Link(link) => {
                let mark = Mark::Link {
                    href: link.url.clone(),
                    title: link.title.clone(),
                };
                self.wrapped(&link.children, marks, mark, out);
            }
            ast::Inline::Image(image) => {
                if self.supports(NodeType::Image) {
                    out.push(Inline::with_marks(
                        InlineNode::Image {
                            src: image.url.clone(),
                            alt: image.alt.clone(),
                            title: image.title.clone(),
                        },
                        marks.to_vec(),
                    ));
                }
            }
            ast::Inline::Break => {
                if self.supports(NodeType::HardBreak) {
                    out.push(Inline::with_marks(InlineNode::HardBreak, marks.to_vec()));
                } else {
                    push_text(out, "\n", marks);
                }
            }
            ast::Inline::InlineMath(content) => {
                if self.supports(NodeType::MathInline) {
                    out.push(Inline::with_marks(
                        InlineNode::MathInline {
                            content: content.clone(),
                        },
                        marks.to_vec(),
                    ));
                }
            }
            ast::Inline::WikiLink(link) => {
                if self.supports(NodeType::WikiLink) {
                    out.push(Inline::with_marks(
                        InlineNode::WikiLink {
                            value: link.value.clone(),
                            alias: link.alias.clone(),
                        },
                        marks.to_vec(),
                    ));
                }
            }
            ast::Inline::WikiEmbed(link) => {
                if self.supports(NodeType::WikiEmbed) {
                    out.push(Inline::with_marks(
                        InlineNode::WikiEmbed {
                            value: link.value.clone(),
                            alias: link.alias.clone(),
                        },
                        marks.to_vec(),
                    ));
                }
            }
            ast::Inline::FootnoteReference(label) => {
                if self.supports(NodeType::FootnoteReference) {
                    out.push(Inline::with_marks(
                        InlineNode::FootnoteReference {
                            label: label.clone(),
                        },
                        marks.to_vec(),
                    ));
                }
            }
            ast::Inline::Html(html) => {
                if self.supports(NodeType::HtmlInline) {
                    out.push(Inline::with_marks(
                        InlineNode::HtmlInline { html: html.clone() },
                        marks.to_vec(),
                    ));
                }
            }
            ast::Inline::LinkReference(reference) => {
                debug!(
                    identifier = %reference.identifier,
                    "unresolved link reference kept as text"
                );
                let suffix = reference_suffix(reference.reference_type, &reference.label);
                push_text(out, "[", marks);
                self.collect_inlines(&reference.children, marks, out);
                push_text(out, "]", marks);
                push_text(out, &suffix, marks);
            }
            ast::Inline::ImageReference(reference) => {
                debug!(
                    identifier = %reference.identifier,
                    "unresolved image reference kept as text"
                );
                let text = format!(
                    "![{}]{}",
                    reference.alt,
                    reference_suffix(reference.reference_type, &reference.label)
                );
                push_text(out, &text, marks);
            }
        }
    }

    fn wrapped(
        &mut self,
        children: &[ast::Inline],
        marks: &[Mark],
        mark: Mark,
        out: &mut Vec<Inline>,
    ) {
        let marks = with_mark(marks, mark);
        self.collect_inlines(children, &marks, out);
    }
}

/// Appends `mark` unless an equal mark is already active.
pub(crate) fn with_mark(marks: &[Mark], mark: Mark) -> Vec<Mark> {
    let mut marks = marks.to_vec();
    if !marks.contains(&mark) {
        marks.push(mark);
    }
    marks
}

pub(crate) fn push_text(out: &mut Vec<Inline>, text: &str, marks: &[Mark]) {
    if !text.is_empty() {
        out.push(Inline::with_marks(
            InlineNode::Text {
                text: text.to_string(),
            },
            marks.to_vec(),
        ));
    }
}

/// Joins neighbouring text leaves that carry identical marks.
pub(crate) fn merge_runs(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut merged: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines {
        if let (
            Some(Inline {
                node: InlineNode::Text { text: previous },
                marks: previous_marks,
            }),
            InlineNode::Text { text },
        ) = (merged.last_mut(), &inline.node)
        {
            if *previous_marks == inline.marks {
                previous.push_str(text);
                continue;
            }
        }
        merged.push(inline);
    }
    merged
}

fn reference_suffix(reference_type: ReferenceType, label: &str) -> String {
    match reference_type {
        ReferenceType::Full => format!("[{label}]"),
        ReferenceType::Collapsed => "[]".to_string(),
        ReferenceType::Shortcut => String::new(),
    }
}

fn non_empty(blocks: Vec<Block>) -> Vec<Block> {
    if blocks.is_empty() {
        vec![Block::empty_paragraph()]
    } else {
        blocks
    }
}

/// The image of a paragraph whose only content is one image.
fn lone_image(children: &[ast::Inline]) -> Option<&ast::Image> {
    let mut visible = children
        .iter()
        .filter(|inline| !matches!(inline, ast::Inline::Text(text) if text.trim().is_empty()));
    match (visible.next(), visible.next()) {
        (Some(ast::Inline::Image(image)), None) => Some(image),
        _ => None,
    }
}

/// Detects a leading `[!TYPE]` marker and returns the body with the marker
/// (and one line break after it) removed.
fn split_alert_marker(children: &[ast::Block]) -> Option<(AlertType, Vec<ast::Block>)> {
    let Some(ast::Block::Paragraph(first)) = children.first() else {
        return None;
    };
    let Some(ast::Inline::Text(text)) = first.children.first() else {
        return None;
    };

    let rest = text.strip_prefix("[!")?;
    let close = rest.find(']')?;
    let alert_type = AlertType::from_keyword(&rest[..close])?;
    let after = rest[close + 1..].trim_start_matches([' ', '\t']);

    let mut inlines = first.children[1..].to_vec();
    if let Some(after) = after.strip_prefix('\n') {
        if !after.is_empty() {
            inlines.insert(0, ast::Inline::text(after));
        }
    } else if !after.is_empty() {
        inlines.insert(0, ast::Inline::text(after));
    } else if matches!(inlines.first(), Some(ast::Inline::Break)) {
        inlines.remove(0);
    }

    let mut body = Vec::with_capacity(children.len());
    if !inlines.is_empty() {
        body.push(ast::Block::Paragraph(ast::Paragraph {
            children: inlines,
            position: first.position,
        }));
    }
    body.extend_from_slice(&children[1..]);
    Some((alert_type, body))
}
