//! Legacy markdown parsing (markdown → document, no intermediate AST)
//!
//! comrak parses with its own GFM extensions and the resulting tree is walked
//! straight into the document model. Syntax comrak does not know (highlight,
//! underline, subscript, wiki links, alerts, details) stays literal text.

use crate::common::slug::Slugger;
use crate::ir::nodes::Align;
use crate::ir::to_model::{merge_runs, push_text, with_mark};
use crate::model::nodes::{
    Block, BlockImage, Blockquote, CellContent, CodeBlock, Document, FootnoteDefinition,
    Frontmatter, Heading, HtmlBlock, Inline, InlineNode, ListBlock, ListItem, Mark, Paragraph,
    Table, TableCell, TableRow,
};
use crate::model::schema::{NodeType, Schema};
use comrak::nodes::{AstNode, ListType, NodeValue, TableAlignment};
use comrak::{parse_document, Arena, ComrakOptions};
use tracing::debug;

pub(crate) fn comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.superscript = true;
    options.extension.footnotes = true;
    options.extension.math_dollars = true;
    options.extension.front_matter_delimiter = Some("---".to_string());
    options.render.unsafe_ = true;
    options
}

/// Parses markdown into a document using comrak's native extensions.
pub fn parse_to_document(source: &str, schema: &Schema) -> Document {
    let arena = Arena::new();
    let root = parse_document(&arena, source, &comrak_options());
    let mut converter = LegacyConverter {
        schema,
        slugger: Slugger::new(),
    };
    Document {
        content: converter.blocks(root),
    }
}

struct LegacyConverter<'s> {
    schema: &'s Schema,
    slugger: Slugger,
}

impl LegacyConverter<'_> {
    fn supports(&self, node: NodeType) -> bool {
        let supported = self.schema.supports(node);
        if !supported {
            debug!(?node, "schema lacks node type, skipping");
        }
        supported
    }

    fn blocks<'a>(&mut self, parent: &'a AstNode<'a>) -> Vec<Block> {
        parent
            .children()
            .filter_map(|child| self.block(child))
            .collect()
    }

    fn block<'a>(&mut self, node: &'a AstNode<'a>) -> Option<Block> {
        let source_line = Some(node.data.borrow().sourcepos.start.line);
        let value = node.data.borrow().value.clone();

        match value {
            NodeValue::Paragraph => {
                if let Some(math) = display_math(node) {
                    return self.supports(NodeType::CodeBlock).then(|| {
                        let mut code = CodeBlock::math(math);
                        code.source_line = source_line;
                        Block::CodeBlock(code)
                    });
                }
                if let Some((src, alt, title)) = lone_image(node) {
                    if self.supports(NodeType::BlockImage) {
                        return Some(Block::BlockImage(BlockImage {
                            src,
                            alt,
                            title,
                            source_line,
                        }));
                    }
                }
                Some(Block::Paragraph(Paragraph {
                    content: self.inlines(node),
                    source_line,
                }))
            }

            NodeValue::Heading(heading) => {
                if !self.supports(NodeType::Heading) {
                    return None;
                }
                let content = self.inlines(node);
                let id = self.slugger.slug(&crate::model::inline_text(&content));
                Some(Block::Heading(Heading {
                    level: heading.level.clamp(1, 6),
                    id,
                    content,
                    source_line,
                }))
            }

            NodeValue::CodeBlock(code) => self.supports(NodeType::CodeBlock).then(|| {
                let language = code.info.split_whitespace().next().map(str::to_string);
                Block::CodeBlock(CodeBlock {
                    language,
                    text: code.literal.strip_suffix('\n').unwrap_or(&code.literal).to_string(),
                    source_line,
                })
            }),

            NodeValue::BlockQuote => self.supports(NodeType::Blockquote).then(|| {
                Block::Blockquote(Blockquote {
                    content: self.blocks(node),
                })
            }),

            NodeValue::List(list) => {
                let ordered = list.list_type == ListType::Ordered;
                let node_type = if ordered {
                    NodeType::OrderedList
                } else {
                    NodeType::BulletList
                };
                if !self.supports(node_type) {
                    return None;
                }
                let items = node
                    .children()
                    .map(|item| {
                        let checked = match &item.data.borrow().value {
                            NodeValue::TaskItem(symbol) => Some(symbol.is_some()),
                            _ => None,
                        };
                        ListItem {
                            checked,
                            content: self.blocks(item),
                        }
                    })
                    .collect();
                let block = ListBlock {
                    start: ordered.then_some(list.start as u32),
                    tight: list.tight,
                    items,
                };
                Some(if ordered {
                    Block::OrderedList(block)
                } else {
                    Block::BulletList(block)
                })
            }

            NodeValue::ThematicBreak => {
                self.supports(NodeType::HorizontalRule).then_some(Block::HorizontalRule)
            }

            NodeValue::Table(table) => {
                if !self.supports(NodeType::Table) {
                    return None;
                }
                let rows = node
                    .children()
                    .enumerate()
                    .map(|(row_index, row)| TableRow {
                        cells: row
                            .children()
                            .enumerate()
                            .map(|(column, cell)| {
                                let paragraph = Paragraph::new(self.inlines(cell));
                                let body = CellContent {
                                    align: table.alignments.get(column).and_then(|a| align(*a)),
                                    content: vec![Block::Paragraph(paragraph)],
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
                Some(Block::Table(Table { rows, source_line }))
            }

            NodeValue::HtmlBlock(html) => self.supports(NodeType::HtmlBlock).then(|| {
                Block::HtmlBlock(HtmlBlock {
                    html: html.literal.trim_end_matches('\n').to_string(),
                })
            }),

            NodeValue::FrontMatter(raw) => self.supports(NodeType::Frontmatter).then(|| {
                Block::Frontmatter(Frontmatter {
                    yaml: strip_frontmatter_fences(&raw),
                })
            }),

            NodeValue::FootnoteDefinition(definition) => {
                self.supports(NodeType::FootnoteDefinition).then(|| {
                    Block::FootnoteDefinition(FootnoteDefinition {
                        label: definition.name.clone(),
                        content: self.blocks(node),
                    })
                })
            }

            other => {
                debug!(node = ?other, "unhandled comrak block, skipping");
                None
            }
        }
    }

    fn inlines<'a>(&mut self, node: &'a AstNode<'a>) -> Vec<Inline> {
        let mut out = Vec::new();
        for child in node.children() {
            self.collect(child, &[], &mut out);
        }
        merge_runs(out)
    }

    fn collect<'a>(&mut self, node: &'a AstNode<'a>, marks: &[Mark], out: &mut Vec<Inline>) {
        let value = node.data.borrow().value.clone();
        let nested = |mark: Mark, this: &mut Self, out: &mut Vec<Inline>| {
            let marks = with_mark(marks, mark);
            for child in node.children() {
                this.collect(child, &marks, out);
            }
        };

        match value {
            NodeValue::Text(text) => push_text(out, &text, marks),
            NodeValue::SoftBreak => push_text(out, "\n", marks),
            NodeValue::LineBreak => {
                if self.supports(NodeType::HardBreak) {
                    out.push(Inline::with_marks(InlineNode::HardBreak, marks.to_vec()));
                } else {
                    push_text(out, "\n", marks);
                }
            }
            NodeValue::Code(code) => push_text(out, &code.literal, &with_mark(marks, Mark::Code)),
            NodeValue::Strong => nested(Mark::Bold, self, out),
            NodeValue::Emph => nested(Mark::Italic, self, out),
            NodeValue::Strikethrough => nested(Mark::Strike, self, out),
            NodeValue::Superscript => nested(Mark::Superscript, self, out),
            NodeValue::Link(link) => nested(
                Mark::Link {
                    href: link.url.clone(),
                    title: (!link.title.is_empty()).then(|| link.title.clone()),
                },
                self,
                out,
            ),
            NodeValue::Image(link) => {
                if self.supports(NodeType::Image) {
                    out.push(Inline::with_marks(
                        InlineNode::Image {
                            src: link.url.clone(),
                            alt: collect_text(node),
                            title: (!link.title.is_empty()).then(|| link.title.clone()),
                        },
                        marks.to_vec(),
                    ));
                }
            }
            NodeValue::Math(math) => {
                if self.supports(NodeType::MathInline) {
                    out.push(Inline::with_marks(
                        InlineNode::MathInline {
                            content: math.literal.clone(),
                        },
                        marks.to_vec(),
                    ));
                }
            }
            NodeValue::HtmlInline(html) => {
                if self.supports(NodeType::HtmlInline) {
                    out.push(Inline::with_marks(InlineNode::HtmlInline { html }, marks.to_vec()));
                }
            }
            NodeValue::FootnoteReference(reference) => {
                if self.supports(NodeType::FootnoteReference) {
                    out.push(Inline::with_marks(
                        InlineNode::FootnoteReference {
                            label: reference.name.clone(),
                        },
                        marks.to_vec(),
                    ));
                }
            }
            other => {
                debug!(node = ?other, "unhandled comrak inline, keeping its text");
                push_text(out, &collect_text(node), marks);
            }
        }
    }
}

fn align(alignment: TableAlignment) -> Option<Align> {
    match alignment {
        TableAlignment::Left => Some(Align::Left),
        TableAlignment::Center => Some(Align::Center),
        TableAlignment::Right => Some(Align::Right),
        TableAlignment::None => None,
    }
}

/// The content of a paragraph made of a single `$$ .. $$` math node.
fn display_math<'a>(paragraph: &'a AstNode<'a>) -> Option<String> {
    let mut children = paragraph.children();
    let first = children.next()?;
    if children.next().is_some() {
        return None;
    }
    match &first.data.borrow().value {
        NodeValue::Math(math) if math.display_math => Some(math.literal.trim().to_string()),
        _ => None,
    }
}

fn lone_image<'a>(paragraph: &'a AstNode<'a>) -> Option<(String, String, Option<String>)> {
    let mut children = paragraph.children();
    let first = children.next()?;
    if children.next().is_some() {
        return None;
    }
    match &first.data.borrow().value {
        NodeValue::Image(link) => Some((
            link.url.clone(),
            collect_text(first),
            (!link.title.is_empty()).then(|| link.title.clone()),
        )),
        _ => None,
    }
}

fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for descendant in node.descendants().skip(1) {
        match &descendant.data.borrow().value {
            NodeValue::Text(value) => text.push_str(value),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::Math(math) => text.push_str(&math.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

fn strip_frontmatter_fences(raw: &str) -> String {
    let lines: Vec<&str> = raw.trim_end().lines().collect();
    let body = match lines.as_slice() {
        [first, body @ .., last] if first.trim() == "---" && last.trim() == "---" => body,
        _ => &lines[..],
    };
    body.join("\n")
}
