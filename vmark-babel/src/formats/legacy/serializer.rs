//! Legacy markdown serialization (document → comrak AST → markdown)
//!
//! The document is rebuilt as a comrak tree and written with
//! `format_commonmark`. Constructs comrak has no node for (alerts, details,
//! math, wiki links, highlight, underline, subscript, footnotes, link
//! definitions) are written as raw html nodes holding their markdown
//! syntax, which comrak copies through verbatim.

use super::parser::comrak_options;
use crate::error::BabelError;
use crate::ir::from_model;
use crate::ir::nodes::{self as ast, Align};
use crate::model::nodes::{Block, CodeBlock, Document, ListBlock, Table};
use crate::model::block_text;
use comrak::nodes::{
    Ast, AstNode, ListDelimType, ListType, NodeCode, NodeCodeBlock, NodeHeading, NodeHtmlBlock,
    NodeLink, NodeList, NodeTable, NodeValue, TableAlignment,
};
use comrak::{format_commonmark, Arena};
use std::cell::RefCell;

/// Serializes a document with comrak's CommonMark writer.
pub fn serialize_to_markdown(doc: &Document) -> Result<String, BabelError> {
    let arena = Arena::new();
    let root = node(&arena, NodeValue::Document);
    for block in &doc.content {
        append_block(&arena, root, block);
    }

    let mut output = Vec::new();
    format_commonmark(root, &comrak_options(), &mut output)
        .map_err(|e| BabelError::SerializationError(format!("comrak serialization failed: {e}")))?;
    let markdown = String::from_utf8(output)
        .map_err(|e| BabelError::SerializationError(format!("UTF-8 conversion failed: {e}")))?;

    // comrak separates adjacent lists with a marker comment
    Ok(markdown.replace("<!-- end list -->\n\n", ""))
}

fn node<'a>(arena: &'a Arena<AstNode<'a>>, value: NodeValue) -> &'a AstNode<'a> {
    arena.alloc(AstNode::new(RefCell::new(Ast::new(value, (0, 0).into()))))
}

fn raw_block<'a>(arena: &'a Arena<AstNode<'a>>, parent: &'a AstNode<'a>, literal: String) {
    let mut literal = literal;
    if !literal.ends_with('\n') {
        literal.push('\n');
    }
    parent.append(node(
        arena,
        NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal,
        }),
    ));
}

fn raw_inline<'a>(arena: &'a Arena<AstNode<'a>>, parent: &'a AstNode<'a>, literal: String) {
    parent.append(node(arena, NodeValue::HtmlInline(literal)));
}

fn append_block<'a>(arena: &'a Arena<AstNode<'a>>, parent: &'a AstNode<'a>, block: &Block) {
    match block {
        Block::Paragraph(paragraph) => {
            let para = node(arena, NodeValue::Paragraph);
            append_inlines(arena, para, &from_model::inlines(&paragraph.content));
            parent.append(para);
        }

        Block::Heading(heading) => {
            let head = node(
                arena,
                NodeValue::Heading(NodeHeading {
                    level: heading.level.clamp(1, 6),
                    setext: false,
                }),
            );
            append_inlines(arena, head, &from_model::inlines(&heading.content));
            parent.append(head);
        }

        Block::CodeBlock(code) if code.is_math() => {
            raw_block(arena, parent, format!("$$\n{}\n$$", code.text.trim_matches('\n')))
        }

        Block::CodeBlock(code) => append_code(arena, parent, code),

        Block::Blockquote(quote) => {
            let container = node(arena, NodeValue::BlockQuote);
            for child in &quote.content {
                append_block(arena, container, child);
            }
            parent.append(container);
        }

        Block::AlertBlock(alert) => {
            let container = node(arena, NodeValue::BlockQuote);
            let marker = node(arena, NodeValue::Paragraph);
            raw_inline(arena, marker, format!("[!{}]", alert.alert_type.as_str()));
            container.append(marker);
            for child in alert.content() {
                append_block(arena, container, child);
            }
            parent.append(container);
        }

        Block::DetailsBlock(details) => {
            let open = if details.open { " open" } else { "" };
            raw_block(
                arena,
                parent,
                format!("<details{open}>\n<summary>{}</summary>", details.summary.text),
            );
            for child in details.content() {
                append_block(arena, parent, child);
            }
            raw_block(arena, parent, "</details>".to_string());
        }

        Block::BulletList(list) => append_list(arena, parent, list, false),
        Block::OrderedList(list) => append_list(arena, parent, list, true),

        Block::HorizontalRule => parent.append(node(arena, NodeValue::ThematicBreak)),

        Block::Table(table) => append_table(arena, parent, table),

        Block::BlockImage(image) => {
            let para = node(arena, NodeValue::Paragraph);
            let img = node(
                arena,
                NodeValue::Image(NodeLink {
                    url: image.src.clone(),
                    title: image.title.clone().unwrap_or_default(),
                }),
            );
            img.append(node(arena, NodeValue::Text(image.alt.clone())));
            para.append(img);
            parent.append(para);
        }

        Block::LinkDefinition(definition) => {
            let title = definition
                .title
                .as_deref()
                .map(|title| format!(" \"{}\"", title.replace('"', "\\\"")))
                .unwrap_or_default();
            raw_block(
                arena,
                parent,
                format!("[{}]: {}{title}", definition.identifier, definition.url),
            )
        }

        Block::Frontmatter(frontmatter) => parent.append(node(
            arena,
            NodeValue::FrontMatter(format!(
                "---\n{}\n---\n\n",
                frontmatter.yaml.trim_matches('\n')
            )),
        )),

        Block::HtmlBlock(html) => raw_block(arena, parent, html.html.clone()),

        Block::FootnoteDefinition(footnote) => {
            let body = footnote
                .content
                .iter()
                .map(block_text)
                .collect::<Vec<_>>()
                .join(" ");
            raw_block(arena, parent, format!("[^{}]: {body}", footnote.label))
        }
    }
}

fn append_code<'a>(arena: &'a Arena<AstNode<'a>>, parent: &'a AstNode<'a>, code: &CodeBlock) {
    let mut literal = code.text.clone();
    if !literal.ends_with('\n') {
        literal.push('\n');
    }
    parent.append(node(
        arena,
        NodeValue::CodeBlock(NodeCodeBlock {
            fenced: true,
            fence_char: b'`',
            fence_length: 3,
            fence_offset: 0,
            info: code.language.clone().unwrap_or_default(),
            literal,
        }),
    ));
}

fn append_list<'a>(
    arena: &'a Arena<AstNode<'a>>,
    parent: &'a AstNode<'a>,
    list: &ListBlock,
    ordered: bool,
) {
    let data = NodeList {
        list_type: if ordered {
            ListType::Ordered
        } else {
            ListType::Bullet
        },
        marker_offset: 0,
        padding: 0,
        start: list.start.unwrap_or(1) as usize,
        delimiter: ListDelimType::Period,
        bullet_char: b'-',
        tight: list.tight,
    };
    let list_node = node(arena, NodeValue::List(data));
    for item in &list.items {
        let item_node = node(arena, NodeValue::Item(data));
        for child in &item.content {
            append_block(arena, item_node, child);
        }
        if let Some(checked) = item.checked {
            let marker = if checked { "[x] " } else { "[ ] " };
            match item_node.first_child() {
                Some(first) if matches!(first.data.borrow().value, NodeValue::Paragraph) => {
                    first.prepend(node(arena, NodeValue::HtmlInline(marker.to_string())));
                }
                _ => {
                    let para = node(arena, NodeValue::Paragraph);
                    raw_inline(arena, para, marker.trim_end().to_string());
                    item_node.prepend(para);
                }
            }
        }
        list_node.append(item_node);
    }
    parent.append(list_node);
}

fn append_table<'a>(arena: &'a Arena<AstNode<'a>>, parent: &'a AstNode<'a>, table: &Table) {
    let columns = table.rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);
    if columns == 0 {
        return;
    }
    let alignments = (0..columns)
        .map(|column| {
            let align = table
                .rows
                .first()
                .and_then(|row| row.cells.get(column))
                .and_then(|cell| cell.body().align);
            match align {
                Some(Align::Left) => TableAlignment::Left,
                Some(Align::Center) => TableAlignment::Center,
                Some(Align::Right) => TableAlignment::Right,
                None => TableAlignment::None,
            }
        })
        .collect();

    let table_node = node(
        arena,
        NodeValue::Table(NodeTable {
            alignments,
            num_columns: columns,
            num_rows: table.rows.len(),
            num_nonempty_cells: 0,
        }),
    );
    for (index, row) in table.rows.iter().enumerate() {
        let row_node = node(arena, NodeValue::TableRow(index == 0));
        for column in 0..columns {
            let cell_node = node(arena, NodeValue::TableCell);
            if let Some(cell) = row.cells.get(column) {
                let leaves: Vec<_> = cell
                    .body()
                    .content
                    .iter()
                    .filter_map(|block| match block {
                        Block::Paragraph(p) => Some(p.content.clone()),
                        _ => None,
                    })
                    .flatten()
                    .collect();
                append_inlines(arena, cell_node, &from_model::inlines(&leaves));
            }
            row_node.append(cell_node);
        }
        table_node.append(row_node);
    }
    parent.append(table_node);
}

fn append_inlines<'a>(
    arena: &'a Arena<AstNode<'a>>,
    parent: &'a AstNode<'a>,
    inlines: &[ast::Inline],
) {
    for inline in inlines {
        append_inline(arena, parent, inline);
    }
}

fn append_wrapped<'a>(
    arena: &'a Arena<AstNode<'a>>,
    parent: &'a AstNode<'a>,
    value: NodeValue,
    children: &[ast::Inline],
) {
    let wrapper = node(arena, value);
    append_inlines(arena, wrapper, children);
    parent.append(wrapper);
}

fn append_delimited<'a>(
    arena: &'a Arena<AstNode<'a>>,
    parent: &'a AstNode<'a>,
    delimiter: &str,
    children: &[ast::Inline],
) {
    raw_inline(arena, parent, delimiter.to_string());
    append_inlines(arena, parent, children);
    raw_inline(arena, parent, delimiter.to_string());
}

fn append_inline<'a>(arena: &'a Arena<AstNode<'a>>, parent: &'a AstNode<'a>, inline: &ast::Inline) {
    match inline {
        ast::Inline::Text(text) => parent.append(node(arena, NodeValue::Text(text.clone()))),
        ast::Inline::Strong(children) => append_wrapped(arena, parent, NodeValue::Strong, children),
        ast::Inline::Emphasis(children) => append_wrapped(arena, parent, NodeValue::Emph, children),
        ast::Inline::Delete(children) => {
            append_wrapped(arena, parent, NodeValue::Strikethrough, children)
        }
        ast::Inline::Superscript(children) => {
            append_wrapped(arena, parent, NodeValue::Superscript, children)
        }
        ast::Inline::Subscript(children) => append_delimited(arena, parent, "~", children),
        ast::Inline::Highlight(children) => append_delimited(arena, parent, "==", children),
        ast::Inline::Underline(children) => append_delimited(arena, parent, "++", children),
        ast::Inline::InlineCode(code) => parent.append(node(
            arena,
            NodeValue::Code(NodeCode {
                num_backticks: 1,
                literal: code.clone(),
            }),
        )),
        ast::Inline::Link(link) => append_wrapped(
            arena,
            parent,
            NodeValue::Link(NodeLink {
                url: link.url.clone(),
                title: link.title.clone().unwrap_or_default(),
            }),
            &link.children,
        ),
        ast::Inline::Image(image) => {
            let img = node(
                arena,
                NodeValue::Image(NodeLink {
                    url: image.url.clone(),
                    title: image.title.clone().unwrap_or_default(),
                }),
            );
            img.append(node(arena, NodeValue::Text(image.alt.clone())));
            parent.append(img);
        }
        ast::Inline::Break => parent.append(node(arena, NodeValue::LineBreak)),
        ast::Inline::InlineMath(math) => raw_inline(arena, parent, format!("${math}$")),
        ast::Inline::WikiLink(link) => raw_inline(arena, parent, wiki_syntax("", link)),
        ast::Inline::WikiEmbed(link) => raw_inline(arena, parent, wiki_syntax("!", link)),
        ast::Inline::FootnoteReference(label) => raw_inline(arena, parent, format!("[^{label}]")),
        ast::Inline::LinkReference(reference) => append_inlines(arena, parent, &reference.children),
        ast::Inline::ImageReference(reference) => {
            parent.append(node(arena, NodeValue::Text(reference.alt.clone())))
        }
        ast::Inline::Html(html) => raw_inline(arena, parent, html.clone()),
    }
}

fn wiki_syntax(prefix: &str, link: &ast::WikiLink) -> String {
    match &link.alias {
        Some(alias) => format!("{prefix}[[{}|{alias}]]", link.value),
        None => format!("{prefix}[[{}]]", link.value),
    }
}
