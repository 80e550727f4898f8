use vmark_babel::model::nodes::Block;
use vmark_babel::model::{NodeType, Schema};
use vmark_babel::{parse_markdown, PipelineOptions};

fn parse_with(schema: &Schema, source: &str) -> Vec<Block> {
    parse_markdown(schema, source, &PipelineOptions::ast()).content
}

#[test]
fn test_unsupported_blocks_are_skipped() {
    let schema = Schema::full().without(NodeType::Table);
    let blocks = parse_with(&schema, "before\n\n| a |\n|---|\n| 1 |\n\nafter");
    assert_eq!(blocks.len(), 2);
    assert!(blocks.iter().all(|block| matches!(block, Block::Paragraph(_))));
}

#[test]
fn test_reduced_schema_still_yields_paragraphs() {
    let schema = Schema::with_nodes([]);
    let blocks = parse_with(&schema, "# Title\n\ntext");
    assert_eq!(blocks.len(), 1);
    assert!(matches!(blocks[0], Block::Paragraph(_)));
}

#[test]
fn test_missing_image_support_keeps_paragraph() {
    let schema = Schema::full().without(NodeType::BlockImage);
    let blocks = parse_with(&schema, "![a](b.png)");
    assert_eq!(blocks.len(), 1);
    assert!(!matches!(blocks[0], Block::BlockImage(_)));
}
