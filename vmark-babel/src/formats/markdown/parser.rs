//! Markdown parsing (markdown text → markdown AST)
//!
//! Pipeline: source → pre-pass → comrak AST → [`Root`] with inline
//! extensions applied → details extraction → lifted definitions re-inserted.
//!
//! comrak runs with tables, autolinks, dollar math and `---` frontmatter.
//! Strikethrough, superscript and task lists stay off: `~`, `^` and `[ ]` are
//! handled by the inline scanner and the list converter so the extension
//! syntax has a single owner.

use super::details::extract_details;
use super::inline::{apply_extensions, merge_text, ExtensionContext};
use super::preprocess::{
    prepare, restore_escaped, restore_literal, shield_escapes, Lifted, NESTED_FOOTNOTE,
};
use crate::ir::nodes::{
    normalize_identifier, Align, Block, Blockquote, Code, Definition, FootnoteDefinition,
    Frontmatter, Heading, HtmlBlock, Image, Inline, Link, List, ListItem, MathBlock, Paragraph,
    Point, Position, Root, Table, TableCell, TableRow, ThematicBreak,
};
use crate::model::MATH_SENTINEL;
use comrak::nodes::{AstNode, ListType, NodeValue, TableAlignment};
use comrak::{parse_document, Arena, ComrakOptions};
use tracing::debug;

/// Parses markdown into the markdown AST.
///
/// Never fails: anything the grammar does not recognise ends up as text.
/// Reference-style links are left unresolved; see
/// [`crate::common::references`].
pub fn parse_markdown_ast(source: &str) -> Root {
    parse_with_context(source, &ExtensionContext::default())
}

fn parse_with_context(source: &str, outer: &ExtensionContext) -> Root {
    let prepared = prepare(source);

    let mut ctx = outer.clone();
    ctx.definitions.extend(prepared.lifted.iter().filter_map(|lifted| match lifted {
        Lifted::Definition { label, .. } => Some(normalize_identifier(label)),
        Lifted::Footnote { .. } => None,
    }));

    let arena = Arena::new();
    let options = comrak_options();
    let root = parse_document(&arena, &prepared.text, &options);

    let children = convert_blocks(root, &ctx);
    let lifted = prepared
        .lifted
        .into_iter()
        .map(|lifted| lifted_block(lifted, &ctx))
        .collect();

    Root {
        children: interleave(children, lifted),
    }
}

pub(crate) fn comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.math_dollars = true;
    options.extension.front_matter_delimiter = Some("---".to_string());
    options
}

/// Parses a chunk of markdown found inside raw HTML (details bodies).
fn parse_fragment(text: &str, ctx: &ExtensionContext) -> Vec<Block> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let arena = Arena::new();
    let options = comrak_options();
    let root = parse_document(&arena, &shield_escapes(text), &options);
    convert_blocks(root, ctx)
}

fn lifted_block(lifted: Lifted, ctx: &ExtensionContext) -> (usize, Block) {
    match lifted {
        Lifted::Definition {
            line,
            label,
            url,
            title,
        } => (
            line,
            Block::Definition(Definition {
                identifier: normalize_identifier(&label),
                label,
                url,
                title,
                position: Some(Position::lines(line, line)),
            }),
        ),
        Lifted::Footnote {
            line,
            end_line,
            label,
            body,
        } => {
            let mut children = parse_with_context(&body, ctx).children;
            children.iter_mut().for_each(|block| block.shift_lines(line - 1));
            (
                line,
                Block::FootnoteDefinition(FootnoteDefinition {
                    identifier: label,
                    children,
                    position: Some(Position::lines(line, end_line)),
                }),
            )
        }
    }
}

/// Merges lifted blocks back into the block list by source line.
fn interleave(blocks: Vec<Block>, lifted: Vec<(usize, Block)>) -> Vec<Block> {
    let mut out = Vec::with_capacity(blocks.len() + lifted.len());
    let mut pending = lifted.into_iter().peekable();
    for block in blocks {
        if let Some(line) = block.start_line() {
            while let Some((_, lifted)) = pending.next_if(|(at, _)| *at < line) {
                out.push(lifted);
            }
        }
        out.push(block);
    }
    out.extend(pending.map(|(_, block)| block));
    out
}

fn position_of(node: &AstNode<'_>) -> Option<Position> {
    let sourcepos = node.data.borrow().sourcepos;
    if sourcepos.start.line == 0 {
        return None;
    }
    Some(Position {
        start: Point {
            line: sourcepos.start.line,
            column: sourcepos.start.column,
        },
        end: Point {
            line: sourcepos.end.line,
            column: sourcepos.end.column,
        },
    })
}

fn convert_blocks<'a>(parent: &'a AstNode<'a>, ctx: &ExtensionContext) -> Vec<Block> {
    let blocks: Vec<Block> = parent
        .children()
        .filter_map(|child| convert_block(child, ctx))
        .collect();
    extract_details(blocks, &|text| parse_fragment(text, ctx))
}

fn convert_block<'a>(node: &'a AstNode<'a>, ctx: &ExtensionContext) -> Option<Block> {
    let position = position_of(node);
    let value = node.data.borrow().value.clone();

    let block = match value {
        NodeValue::Paragraph => match nested_footnote(node, ctx, position) {
            Some(footnote) => footnote,
            None => {
                let children = convert_inlines(node, ctx, false);
                match display_math(node) {
                    Some(value) => Block::Math(MathBlock { value, position }),
                    None => Block::Paragraph(Paragraph { children, position }),
                }
            }
        },

        NodeValue::Heading(heading) => Block::Heading(Heading {
            depth: heading.level,
            children: convert_inlines(node, ctx, false),
            position,
        }),

        NodeValue::CodeBlock(code) => {
            let info = code.info.trim();
            let value = restore_escaped(code.literal.strip_suffix('\n').unwrap_or(&code.literal));
            if info == MATH_SENTINEL {
                Block::Math(MathBlock { value, position })
            } else {
                let lang = info.split_whitespace().next().map(restore_literal);
                Block::Code(Code {
                    lang,
                    value,
                    position,
                })
            }
        }

        NodeValue::BlockQuote => Block::Blockquote(Blockquote {
            children: convert_blocks(node, ctx),
            position,
        }),

        NodeValue::List(list) => {
            let ordered = matches!(list.list_type, ListType::Ordered);
            Block::List(List {
                ordered,
                start: ordered.then(|| u32::try_from(list.start).unwrap_or(1)),
                spread: !list.tight,
                children: node
                    .children()
                    .map(|item| convert_list_item(item, ctx))
                    .collect(),
                position,
            })
        }

        NodeValue::ThematicBreak => Block::ThematicBreak(ThematicBreak { position }),

        NodeValue::Table(table) => {
            let align = table
                .alignments
                .iter()
                .map(|alignment| match alignment {
                    TableAlignment::Left => Some(Align::Left),
                    TableAlignment::Center => Some(Align::Center),
                    TableAlignment::Right => Some(Align::Right),
                    TableAlignment::None => None,
                })
                .collect();
            let rows = node
                .children()
                .map(|row| TableRow {
                    cells: row
                        .children()
                        .map(|cell| TableCell {
                            children: convert_inlines(cell, ctx, false),
                        })
                        .collect(),
                })
                .collect();
            Block::Table(Table {
                align,
                rows,
                position,
            })
        }

        NodeValue::HtmlBlock(html) => Block::HtmlBlock(HtmlBlock {
            value: restore_escaped(html.literal.trim_end_matches('\n')),
            position,
        }),

        NodeValue::FrontMatter(raw) => {
            let trimmed = raw.trim();
            let yaml = trimmed
                .strip_prefix("---")
                .and_then(|rest| rest.strip_suffix("---"))
                .unwrap_or(trimmed)
                .trim_matches('\n');
            Block::Frontmatter(Frontmatter {
                value: yaml.to_string(),
                position,
            })
        }

        other => {
            debug!(node = ?other, "skipping unsupported markdown block");
            return None;
        }
    };

    Some(block)
}

fn convert_list_item<'a>(item: &'a AstNode<'a>, ctx: &ExtensionContext) -> ListItem {
    let checked = take_task_marker(item);
    let children = convert_blocks(item, ctx);
    ListItem { checked, children }
}

/// Strips a leading `[ ]` / `[x]` from the item's first paragraph.
///
/// Runs on the comrak tree, before the inline pass could read the marker as
/// a shortcut reference to a `[x]: ...` definition.
fn take_task_marker<'a>(item: &'a AstNode<'a>) -> Option<bool> {
    let paragraph = item.first_child()?;
    if !matches!(paragraph.data.borrow().value, NodeValue::Paragraph) {
        return None;
    }

    // comrak splits text at brackets, so the marker spans several nodes.
    let mut texts = Vec::new();
    let mut head = String::new();
    for child in paragraph.children() {
        match &child.data.borrow().value {
            NodeValue::Text(text) => head.push_str(text),
            _ => break,
        }
        texts.push(child);
    }

    let checked = match head.get(..3) {
        Some("[ ]") => false,
        Some("[x]") | Some("[X]") => true,
        _ => return None,
    };
    let rest = &head[3..];
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }

    let rest = rest.trim_start_matches(' ').to_string();
    let (first, others) = texts.split_first()?;
    others.iter().for_each(|node| node.detach());
    if rest.is_empty() {
        first.detach();
    } else {
        first.data.borrow_mut().value = NodeValue::Text(rest);
    }
    Some(checked)
}

/// A `[^label]: body` paragraph inside a blockquote or list item.
fn nested_footnote<'a>(
    paragraph: &'a AstNode<'a>,
    ctx: &ExtensionContext,
    position: Option<Position>,
) -> Option<Block> {
    let marked = paragraph.first_child().is_some_and(|child| match &child.data.borrow().value {
        NodeValue::Text(text) => text.starts_with(NESTED_FOOTNOTE),
        _ => false,
    });
    if !marked {
        return None;
    }

    let mut raw = Vec::new();
    for child in paragraph.children() {
        convert_inline(child, ctx, false, &mut raw);
    }
    let mut raw = merge_text(raw);
    let Some(Inline::Text(first)) = raw.first_mut() else {
        return None;
    };
    let (label, body) = first
        .strip_prefix(NESTED_FOOTNOTE)
        .and_then(|rest| rest.strip_prefix('^'))
        .and_then(|rest| rest.split_once("]:"))?;
    let identifier = restore_literal(label);
    *first = body.trim_start_matches([' ', '\t']).to_string();

    let inlines = apply_extensions(raw, ctx, false);
    let children = if inlines.is_empty() {
        Vec::new()
    } else {
        vec![Block::Paragraph(Paragraph {
            children: inlines,
            position,
        })]
    };
    Some(Block::FootnoteDefinition(FootnoteDefinition {
        identifier,
        children,
        position,
    }))
}

/// The literal of a paragraph made of one display-math span.
fn display_math<'a>(paragraph: &'a AstNode<'a>) -> Option<String> {
    let mut children = paragraph.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }
    match &only.data.borrow().value {
        NodeValue::Math(math) if math.display_math => Some(restore_escaped(math.literal.trim())),
        _ => None,
    }
}

fn convert_inlines<'a>(
    node: &'a AstNode<'a>,
    ctx: &ExtensionContext,
    in_link: bool,
) -> Vec<Inline> {
    let mut raw = Vec::new();
    for child in node.children() {
        convert_inline(child, ctx, in_link, &mut raw);
    }
    apply_extensions(raw, ctx, in_link)
}

fn convert_inline<'a>(
    node: &'a AstNode<'a>,
    ctx: &ExtensionContext,
    in_link: bool,
    out: &mut Vec<Inline>,
) {
    let value = node.data.borrow().value.clone();
    match value {
        NodeValue::Text(text) => out.push(Inline::Text(text)),
        NodeValue::SoftBreak => out.push(Inline::text("\n")),
        NodeValue::LineBreak => out.push(Inline::Break),
        NodeValue::Code(code) => out.push(Inline::InlineCode(restore_escaped(&code.literal))),
        NodeValue::Strong => out.push(Inline::Strong(convert_inlines(node, ctx, in_link))),
        NodeValue::Emph => out.push(Inline::Emphasis(convert_inlines(node, ctx, in_link))),
        NodeValue::Strikethrough => out.push(Inline::Delete(convert_inlines(node, ctx, in_link))),
        NodeValue::Link(link) => {
            let children = match autolink_text(node, &link.url) {
                Some(text) => vec![Inline::Text(restore_literal(&text))],
                None => convert_inlines(node, ctx, true),
            };
            out.push(Inline::Link(Link {
                url: restore_literal(&link.url),
                title: non_empty(restore_literal(&link.title)),
                children,
            }))
        }
        NodeValue::Image(link) => out.push(Inline::Image(Image {
            url: restore_literal(&link.url),
            alt: restore_literal(&collect_text(node)),
            title: non_empty(restore_literal(&link.title)),
        })),
        NodeValue::Math(math) => out.push(Inline::InlineMath(restore_escaped(&math.literal))),
        NodeValue::HtmlInline(html) => out.push(Inline::Html(restore_escaped(&html))),
        other => {
            debug!(node = ?other, "unsupported inline node kept as text");
            let text = collect_text(node);
            if !text.is_empty() {
                out.push(Inline::Text(text));
            }
        }
    }
}

/// The text of an autolink, which is literal: the inline extensions never
/// apply inside a url.
fn autolink_text<'a>(link: &'a AstNode<'a>, url: &str) -> Option<String> {
    let only = link.first_child()?;
    if only.next_sibling().is_some() {
        return None;
    }
    let NodeValue::Text(text) = &only.data.borrow().value else {
        return None;
    };
    let literal = url == text.as_str()
        || url.strip_prefix("mailto:") == Some(text.as_str())
        || url.strip_prefix("http://") == Some(text.as_str());
    literal.then(|| text.clone())
}

fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for descendant in node.descendants().skip(1) {
        match &descendant.data.borrow().value {
            NodeValue::Text(t) => text.push_str(t),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::Math(math) => text.push_str(&math.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::{ReferenceType, WikiLink};

    fn blocks(source: &str) -> Vec<Block> {
        parse_markdown_ast(source).children
    }

    fn paragraph_inlines(source: &str) -> Vec<Inline> {
        match blocks(source).into_iter().next() {
            Some(Block::Paragraph(p)) => p.children,
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_heading_and_paragraph() {
        let parsed = blocks("# Title\n\nHello *world*");
        assert_eq!(parsed.len(), 2);
        match &parsed[0] {
            Block::Heading(h) => {
                assert_eq!(h.depth, 1);
                assert_eq!(h.children, vec![Inline::text("Title")]);
                assert_eq!(h.position.map(|p| p.start.line), Some(1));
            }
            other => panic!("expected heading, got {other:?}"),
        }
        match &parsed[1] {
            Block::Paragraph(p) => assert_eq!(
                p.children,
                vec![
                    Inline::text("Hello "),
                    Inline::Emphasis(vec![Inline::text("world")])
                ]
            ),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_inline_math() {
        assert_eq!(
            paragraph_inlines("$E=mc^2$"),
            vec![Inline::InlineMath("E=mc^2".to_string())]
        );
    }

    #[test]
    fn test_math_block() {
        match &blocks("$$\n\\frac{a}{b}\n$$")[0] {
            Block::Math(math) => assert_eq!(math.value, "\\frac{a}{b}"),
            other => panic!("expected math, got {other:?}"),
        }
    }

    #[test]
    fn test_strikethrough_is_delete_only() {
        let inlines = paragraph_inlines("~~gone~~ and H~2~O");
        assert_eq!(inlines[0], Inline::Delete(vec![Inline::text("gone")]));
        assert!(inlines.contains(&Inline::Subscript(vec![Inline::text("2")])));
    }

    #[test]
    fn test_escaped_tilde_stays_literal() {
        assert_eq!(paragraph_inlines(r"a \~b\~ c"), vec![Inline::text("a ~b~ c")]);
    }

    #[test]
    fn test_code_span_keeps_escapes() {
        assert_eq!(
            paragraph_inlines(r"`\~x~`"),
            vec![Inline::InlineCode(r"\~x~".to_string())]
        );
    }

    #[test]
    fn test_wiki_link_not_in_code() {
        assert_eq!(
            paragraph_inlines("`[[Page]]` [[Page]]"),
            vec![
                Inline::InlineCode("[[Page]]".to_string()),
                Inline::text(" "),
                Inline::WikiLink(WikiLink {
                    value: "Page".to_string(),
                    alias: None,
                }),
            ]
        );
    }

    #[test]
    fn test_reference_and_definition() {
        let parsed = blocks("[text][id]\n\n[id]: https://x.com \"T\"");
        assert_eq!(parsed.len(), 2);
        match &parsed[0] {
            Block::Paragraph(p) => match &p.children[0] {
                Inline::LinkReference(reference) => {
                    assert_eq!(reference.identifier, "id");
                    assert_eq!(reference.reference_type, ReferenceType::Full);
                }
                other => panic!("expected link reference, got {other:?}"),
            },
            other => panic!("expected paragraph, got {other:?}"),
        }
        match &parsed[1] {
            Block::Definition(def) => {
                assert_eq!(def.url, "https://x.com");
                assert_eq!(def.title.as_deref(), Some("T"));
            }
            other => panic!("expected definition, got {other:?}"),
        }
    }

    #[test]
    fn test_footnote_definition() {
        let parsed = blocks("Fact[^1].\n\n[^1]: Source **here**.\n    More.");
        assert_eq!(parsed.len(), 2);
        match &parsed[1] {
            Block::FootnoteDefinition(footnote) => {
                assert_eq!(footnote.identifier, "1");
                assert_eq!(footnote.children.len(), 1);
            }
            other => panic!("expected footnote definition, got {other:?}"),
        }
    }

    #[test]
    fn test_task_list() {
        match &blocks("- [ ] todo\n- [x] done\n- plain")[0] {
            Block::List(list) => {
                let checked: Vec<_> = list.children.iter().map(|item| item.checked).collect();
                assert_eq!(checked, vec![Some(false), Some(true), None]);
                match &list.children[0].children[0] {
                    Block::Paragraph(p) => assert_eq!(p.children, vec![Inline::text("todo")]),
                    other => panic!("expected paragraph, got {other:?}"),
                }
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_task_marker_wins_over_shortcut_reference() {
        let parsed = blocks("- [x] done\n\n[x]: /url");
        let Block::List(list) = &parsed[0] else {
            panic!("expected list, got {:?}", parsed[0]);
        };
        assert_eq!(list.children[0].checked, Some(true));
        match &list.children[0].children[0] {
            Block::Paragraph(p) => assert_eq!(p.children, vec![Inline::text("done")]),
            other => panic!("expected paragraph, got {other:?}"),
        }
        assert!(matches!(parsed[1], Block::Definition(_)));
    }

    #[test]
    fn test_math_fence_inside_list_item() {
        let parsed = blocks("- item\n\n  $$\n  x^2\n  $$\n\nafter");
        assert_eq!(parsed.len(), 2);
        let Block::List(list) = &parsed[0] else {
            panic!("expected list, got {:?}", parsed[0]);
        };
        assert!(list.spread);
        match &list.children[0].children[..] {
            [Block::Paragraph(_), Block::Math(math)] => assert_eq!(math.value, "x^2"),
            other => panic!("expected paragraph and math, got {other:?}"),
        }
    }

    #[test]
    fn test_footnote_definition_inside_blockquote() {
        let parsed = blocks("> [^1]: note\n\nText[^1]");
        let Block::Blockquote(quote) = &parsed[0] else {
            panic!("expected blockquote, got {:?}", parsed[0]);
        };
        match &quote.children[..] {
            [Block::FootnoteDefinition(footnote)] => {
                assert_eq!(footnote.identifier, "1");
                match &footnote.children[..] {
                    [Block::Paragraph(p)] => assert_eq!(p.children, vec![Inline::text("note")]),
                    other => panic!("expected one paragraph, got {other:?}"),
                }
            }
            other => panic!("expected footnote definition, got {other:?}"),
        }
        let Block::Paragraph(p) = &parsed[1] else {
            panic!("expected paragraph, got {:?}", parsed[1]);
        };
        assert_eq!(
            p.children,
            vec![
                Inline::text("Text"),
                Inline::FootnoteReference("1".to_string())
            ]
        );
    }

    #[test]
    fn test_footnote_body_keeps_source_lines() {
        let parsed = blocks("Fact[^1].\n\n[^1]: First.\n\n    Second.");
        let Block::FootnoteDefinition(footnote) = &parsed[1] else {
            panic!("expected footnote definition, got {:?}", parsed[1]);
        };
        let lines: Vec<_> = footnote.children.iter().map(Block::start_line).collect();
        assert_eq!(lines, vec![Some(3), Some(5)]);
    }

    #[test]
    fn test_autolink_text_is_literal() {
        let inlines = paragraph_inlines("https://x.com/~a~b");
        let [Inline::Link(link)] = &inlines[..] else {
            panic!("expected one link, got {inlines:?}");
        };
        assert_eq!(link.url, "https://x.com/~a~b");
        assert_eq!(link.children, vec![Inline::text("https://x.com/~a~b")]);
    }

    #[test]
    fn test_table_alignment() {
        match &blocks("| a | b | c |\n|:--|:-:|--:|\n| 1 | 2 | 3 |")[0] {
            Block::Table(table) => {
                assert_eq!(
                    table.align,
                    vec![Some(Align::Left), Some(Align::Center), Some(Align::Right)]
                );
                assert_eq!(table.rows.len(), 2);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_frontmatter() {
        match &blocks("---\ntitle: Hi\n---\n\nBody")[0] {
            Block::Frontmatter(fm) => assert_eq!(fm.value, "title: Hi"),
            other => panic!("expected frontmatter, got {other:?}"),
        }
    }

    #[test]
    fn test_details_block() {
        let parsed = blocks("<details>\n<summary>More</summary>\n\nHidden *text*\n\n</details>");
        match &parsed[0] {
            Block::Details(details) => {
                assert_eq!(details.summary, "More");
                assert!(!details.open);
                assert!(matches!(details.children[0], Block::Paragraph(_)));
            }
            other => panic!("expected details, got {other:?}"),
        }
    }

    #[test]
    fn test_alert_marker_stays_in_blockquote() {
        // Alerts are recognised by the model converter, not the parser.
        match &blocks("> [!TIP]\n> Heads up")[0] {
            Block::Blockquote(quote) => match &quote.children[0] {
                Block::Paragraph(p) => {
                    assert_eq!(p.children, vec![Inline::text("[!TIP]\nHeads up")])
                }
                other => panic!("expected paragraph, got {other:?}"),
            },
            other => panic!("expected blockquote, got {other:?}"),
        }
    }

    #[test]
    fn test_never_fails_on_garbage() {
        for source in ["", "[", "~~~", "$$", "<details>", "[^", "==", "| a |\n|-", "\\"] {
            let _ = parse_markdown_ast(source);
        }
    }
}
