use vmark_babel::ir::nodes::{AlertType, Inline as Ast};
use vmark_babel::ir::{from_model, to_ast};
use vmark_babel::model::nodes::{
    AlertBlock, Block, CellContent, CodeBlock, DetailsBlock, Document, Paragraph, Table, TableCell,
    TableRow,
};
use vmark_babel::model::{Inline, InlineNode, Mark};
use vmark_babel::ir::nodes::Align;
use vmark_babel::serialize;

fn text(value: &str, marks: Vec<Mark>) -> Inline {
    Inline::with_marks(
        InlineNode::Text {
            text: value.to_string(),
        },
        marks,
    )
}

fn doc(content: Vec<Block>) -> Document {
    Document { content }
}

#[test]
fn test_shared_outer_mark_wraps_both_leaves() {
    let nested = from_model::inlines(&[
        text("a", vec![Mark::Bold]),
        text("b", vec![Mark::Bold, Mark::Italic]),
    ]);
    assert_eq!(
        nested,
        vec![Ast::Strong(vec![
            Ast::text("a"),
            Ast::Emphasis(vec![Ast::text("b")]),
        ])]
    );
}

#[test]
fn test_mark_order_is_nesting_order() {
    let outer_bold = from_model::inlines(&[text("x", vec![Mark::Bold, Mark::Italic])]);
    assert_eq!(outer_bold, vec![Ast::Strong(vec![Ast::Emphasis(vec![Ast::text("x")])])]);

    let outer_italic = from_model::inlines(&[text("x", vec![Mark::Italic, Mark::Bold])]);
    assert_eq!(outer_italic, vec![Ast::Emphasis(vec![Ast::Strong(vec![Ast::text("x")])])]);
}

#[test]
fn test_adjacent_code_leaves_merge() {
    let nested = from_model::inlines(&[
        text("let ", vec![Mark::Code]),
        text("x", vec![Mark::Code, Mark::Bold]),
    ]);
    assert_eq!(nested.first(), Some(&Ast::InlineCode("let ".to_string())));
}

#[test]
fn test_link_mark_becomes_link() {
    let href = Mark::Link {
        href: "https://x.com".to_string(),
        title: None,
    };
    let out = serialize(&doc(vec![Block::Paragraph(Paragraph::new(vec![
        text("see ", vec![]),
        text("the ", vec![href.clone()]),
        text("docs", vec![href, Mark::Bold]),
    ]))]));
    assert_eq!(out, "see [the **docs**](https://x.com)\n");
}

#[test]
fn test_math_sentinel_code_block_is_display_math() {
    let out = serialize(&doc(vec![Block::CodeBlock(CodeBlock::math("a^2 + b^2"))]));
    assert_eq!(out, "$$\na^2 + b^2\n$$\n");
}

#[test]
fn test_empty_containers_serialize() {
    let out = serialize(&doc(vec![
        Block::AlertBlock(AlertBlock::new(AlertType::Caution, vec![])),
        Block::DetailsBlock(DetailsBlock::new("", false, vec![])),
    ]));
    assert_eq!(
        out,
        "> [!CAUTION]\n\n<details>\n<summary>Details</summary>\n\n</details>\n"
    );
}

#[test]
fn test_table_alignment_from_header_row() {
    let cell = |header: bool, align: Option<Align>, value: &str| {
        let body = CellContent {
            align,
            content: vec![Block::Paragraph(Paragraph::new(vec![Inline::text(value)]))],
        };
        if header {
            TableCell::Header(body)
        } else {
            TableCell::Data(body)
        }
    };
    let table = Table {
        rows: vec![
            TableRow {
                cells: vec![
                    cell(true, Some(Align::Left), "a"),
                    cell(true, Some(Align::Center), "b"),
                    cell(true, Some(Align::Right), "c"),
                ],
            },
            TableRow {
                cells: vec![
                    cell(false, Some(Align::Left), "1"),
                    cell(false, Some(Align::Center), "2"),
                    cell(false, Some(Align::Right), "3"),
                ],
            },
        ],
        source_line: None,
    };
    let root = to_ast(&doc(vec![Block::Table(table)]));
    let vmark_babel::ir::nodes::Block::Table(ast_table) = &root.children[0] else {
        panic!("expected table");
    };
    assert_eq!(
        ast_table.align,
        vec![Some(Align::Left), Some(Align::Center), Some(Align::Right)]
    );
    assert_eq!(
        serialize(&doc(vec![Block::Table(Table {
            rows: vec![],
            source_line: None
        })])),
        ""
    );
}
