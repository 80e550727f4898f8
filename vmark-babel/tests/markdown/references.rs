use vmark_babel::common::references::resolve;
use vmark_babel::formats::markdown::parse_markdown_ast;
use vmark_babel::ir::nodes::{Block, Inline, ReferenceType};
use vmark_babel::model::nodes::Block as ModelBlock;
use vmark_babel::model::{InlineNode, Mark};
use vmark_babel::parse;

fn first_paragraph(blocks: &[Block]) -> &[Inline] {
    match blocks.first() {
        Some(Block::Paragraph(p)) => &p.children,
        other => panic!("expected paragraph, got {other:?}"),
    }
}

#[test]
fn test_full_reference_resolves_to_link() {
    let root = resolve(parse_markdown_ast("[text][id]\n\n[id]: https://x.com \"T\""));
    let Inline::Link(link) = &first_paragraph(&root.children)[0] else {
        panic!("expected link, got {:?}", root.children[0]);
    };
    assert_eq!(link.url, "https://x.com");
    assert_eq!(link.title.as_deref(), Some("T"));
    assert_eq!(link.children, vec![Inline::text("text")]);
    assert!(matches!(root.children[1], Block::Definition(_)));
}

#[test]
fn test_labels_match_case_insensitively() {
    let root = resolve(parse_markdown_ast("[Docs]\n\n[docs]: /guide"));
    assert!(matches!(
        &first_paragraph(&root.children)[0],
        Inline::Link(link) if link.url == "/guide"
    ));
}

#[test]
fn test_unresolved_reference_is_left_intact() {
    let root = resolve(parse_markdown_ast("[text][missing]"));
    let Inline::LinkReference(reference) = &first_paragraph(&root.children)[0] else {
        panic!("expected reference, got {:?}", root.children[0]);
    };
    assert_eq!(reference.identifier, "missing");
    assert_eq!(reference.reference_type, ReferenceType::Full);
}

#[test]
fn test_orphan_reference_becomes_literal_text() {
    let doc = parse("[text][missing]");
    let ModelBlock::Paragraph(p) = &doc.content[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(
        p.content[0].node,
        InlineNode::Text {
            text: "[text][missing]".to_string()
        }
    );
}

#[test]
fn test_resolved_link_mark_in_model() {
    let doc = parse("[text][id]\n\n[id]: https://x.com \"T\"");
    let ModelBlock::Paragraph(p) = &doc.content[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(
        p.content[0].marks,
        vec![Mark::Link {
            href: "https://x.com".to_string(),
            title: Some("T".to_string())
        }]
    );
    assert!(matches!(&doc.content[1], ModelBlock::LinkDefinition(def) if def.identifier == "id"));
}

#[test]
fn test_image_reference() {
    let root = resolve(parse_markdown_ast("![logo][img]\n\n[img]: logo.png"));
    assert!(matches!(
        &first_paragraph(&root.children)[0],
        Inline::Image(image) if image.url == "logo.png" && image.alt == "logo"
    ));
}

#[test]
fn test_definitions_after_closed_blocks_still_resolve() {
    for source in [
        "```\ncode\n```\n[id]: https://x.com\n\nSee [id].",
        "***\n[id]: https://x.com\n\nSee [id].",
    ] {
        let doc = parse(source);
        let defined = doc.content.iter().any(|block| {
            matches!(block, ModelBlock::LinkDefinition(def) if def.identifier == "id")
        });
        assert!(defined, "source: {source:?}");
        let Some(ModelBlock::Paragraph(p)) = doc.content.last() else {
            panic!("expected trailing paragraph for {source:?}");
        };
        let linked = p.content.iter().any(|inline| {
            inline
                .marks
                .iter()
                .any(|mark| matches!(mark, Mark::Link { href, .. } if href == "https://x.com"))
        });
        assert!(linked, "source: {source:?}");
    }
}

#[test]
fn test_task_marker_is_not_a_shortcut_reference() {
    let doc = parse("- [x] done\n\n[x]: /url");
    let ModelBlock::BulletList(list) = &doc.content[0] else {
        panic!("expected bullet list, got {:?}", doc.content[0]);
    };
    assert_eq!(list.items[0].checked, Some(true));
    let ModelBlock::Paragraph(p) = &list.items[0].content[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(p.content.len(), 1);
    assert_eq!(
        p.content[0].node,
        InlineNode::Text {
            text: "done".to_string()
        }
    );
    assert!(p.content[0].marks.is_empty());
}

#[test]
fn test_footnote_definition_in_blockquote_is_not_a_link() {
    let doc = parse("> [^1]: note\n\nText[^1]");
    let ModelBlock::Blockquote(quote) = &doc.content[0] else {
        panic!("expected blockquote, got {:?}", doc.content[0]);
    };
    assert!(matches!(
        &quote.content[0],
        ModelBlock::FootnoteDefinition(footnote) if footnote.label == "1"
    ));
    let ModelBlock::Paragraph(p) = &doc.content[1] else {
        panic!("expected paragraph, got {:?}", doc.content[1]);
    };
    assert_eq!(
        p.content[1].node,
        InlineNode::FootnoteReference {
            label: "1".to_string()
        }
    );
    assert!(p.content.iter().all(|inline| inline.marks.is_empty()));
}
