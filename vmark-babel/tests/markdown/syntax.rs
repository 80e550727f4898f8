use vmark_babel::ir::nodes::AlertType;
use vmark_babel::model::nodes::{Block, Heading, Paragraph};
use vmark_babel::model::{block_text, Inline, InlineNode, Mark};
use vmark_babel::parse;

fn paragraph(source: &str) -> Paragraph {
    match parse(source).content.into_iter().next() {
        Some(Block::Paragraph(p)) => p,
        other => panic!("expected a paragraph for {source:?}, got {other:?}"),
    }
}

fn leaves(source: &str) -> Vec<(String, Vec<Mark>)> {
    paragraph(source)
        .content
        .into_iter()
        .map(|inline| match inline.node {
            InlineNode::Text { text } => (text, inline.marks),
            other => (format!("{other:?}"), inline.marks),
        })
        .collect()
}

#[test]
fn test_strikethrough_is_not_subscript() {
    let leaves = leaves("~~strikethrough~~");
    assert_eq!(leaves, vec![("strikethrough".to_string(), vec![Mark::Strike])]);
}

#[test]
fn test_unclosed_tilde_is_text() {
    let leaves = leaves("text ~not closed");
    assert_eq!(leaves, vec![("text ~not closed".to_string(), vec![])]);
}

#[test]
fn test_subscript_and_superscript() {
    assert_eq!(
        leaves("H~2~O x^2^"),
        vec![
            ("H".to_string(), vec![]),
            ("2".to_string(), vec![Mark::Subscript]),
            ("O x".to_string(), vec![]),
            ("2".to_string(), vec![Mark::Superscript]),
        ]
    );
}

#[test]
fn test_nested_marks_keep_outer_to_inner_order() {
    assert_eq!(
        leaves("**bold ==both==**"),
        vec![
            ("bold ".to_string(), vec![Mark::Bold]),
            ("both".to_string(), vec![Mark::Bold, Mark::Highlight]),
        ]
    );
}

#[test]
fn test_inline_math_is_atomic() {
    let p = paragraph("$E=mc^2$");
    assert_eq!(
        p.content,
        vec![Inline::with_marks(
            InlineNode::MathInline {
                content: "E=mc^2".to_string()
            },
            vec![]
        )]
    );
}

#[test]
fn test_padded_delimiters_stay_literal() {
    assert_eq!(leaves("a == b == c"), vec![("a == b == c".to_string(), vec![])]);
}

#[test]
fn test_wiki_link_alias() {
    let p = paragraph("[[Page|Alias]]");
    assert_eq!(
        p.content[0].node,
        InlineNode::WikiLink {
            value: "Page".to_string(),
            alias: Some("Alias".to_string())
        }
    );
}

#[test]
fn test_alert_detection() {
    let doc = parse("> [!TIP]\nHeads up");
    let Block::AlertBlock(alert) = &doc.content[0] else {
        panic!("expected alert, got {:?}", doc.content[0]);
    };
    assert_eq!(alert.alert_type, AlertType::Tip);
    assert_eq!(alert.alert_type.as_str(), "TIP");
    assert_eq!(alert.content().len(), 1);
    assert_eq!(block_text(&alert.content()[0]), "Heads up");
}

#[test]
fn test_unknown_alert_keyword_stays_blockquote() {
    let doc = parse("> [!DANGER]\n> text");
    assert!(matches!(doc.content[0], Block::Blockquote(_)));
}

#[test]
fn test_empty_alert_and_details_hold_one_empty_paragraph() {
    let doc = parse("> [!NOTE]\n\n<details>\n<summary>S</summary>\n</details>");
    let Block::AlertBlock(alert) = &doc.content[0] else {
        panic!("expected alert, got {:?}", doc.content[0]);
    };
    assert_eq!(alert.content(), &[Block::empty_paragraph()]);

    let Block::DetailsBlock(details) = &doc.content[1] else {
        panic!("expected details, got {:?}", doc.content[1]);
    };
    assert_eq!(details.summary.text, "S");
    assert_eq!(details.content(), &[Block::empty_paragraph()]);
}

#[test]
fn test_duplicate_headings_get_distinct_ids() {
    let doc = parse("# Setup\n\ntext\n\n## Setup");
    let ids: Vec<Option<String>> = doc
        .content
        .iter()
        .filter_map(|block| match block {
            Block::Heading(Heading { id, .. }) => Some(id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec![Some("setup".to_string()), Some("setup-1".to_string())]);
}

#[test]
fn test_slugs_do_not_leak_between_parses() {
    for _ in 0..2 {
        let doc = parse("# Setup");
        let Block::Heading(heading) = &doc.content[0] else {
            panic!("expected heading");
        };
        assert_eq!(heading.id.as_deref(), Some("setup"));
    }
}

#[test]
fn test_block_image_promotion() {
    let doc = parse("![A cat](cat.png)\n\ntext ![inline](i.png)");
    assert!(matches!(
        &doc.content[0],
        Block::BlockImage(image) if image.src == "cat.png" && image.alt == "A cat"
    ));
    let Block::Paragraph(p) = &doc.content[1] else {
        panic!("expected paragraph");
    };
    assert!(matches!(&p.content[1].node, InlineNode::Image { src, .. } if src == "i.png"));
}

#[test]
fn test_math_block_uses_sentinel_language() {
    let doc = parse("$$\n\\int_0^1 x\\,dx\n$$");
    let Block::CodeBlock(code) = &doc.content[0] else {
        panic!("expected code block, got {:?}", doc.content[0]);
    };
    assert!(code.is_math());
    assert_eq!(code.text, "\\int_0^1 x\\,dx");
}

#[test]
fn test_garbage_never_fails() {
    for source in ["[", "[[", "~", "$$", "> [!", "<details>", "[^", "| a |\n|-", "==", "\\"] {
        let _ = parse(source);
    }
}
