use crate::common::shape;
use vmark_babel::model::nodes::Block;
use vmark_babel::model::{Mark, Schema};
use vmark_babel::{
    ast_pipeline_enabled, parse_markdown, serialize_markdown, set_ast_pipeline_enabled,
    PipelineOptions, SerializeOptions,
};

fn first_marks(blocks: &[Block]) -> Vec<Vec<Mark>> {
    match blocks.first() {
        Some(Block::Paragraph(p)) => p.content.iter().map(|inline| inline.marks.clone()).collect(),
        other => panic!("expected paragraph, got {other:?}"),
    }
}

// The only test touching the process-wide flag; everything else passes an
// explicit override.
#[test]
fn test_global_flag_and_per_call_override() {
    let schema = Schema::full();
    let inherit = PipelineOptions::default();

    assert!(!ast_pipeline_enabled(), "legacy pipeline is the default");
    let legacy = parse_markdown(&schema, "==hi==", &inherit);
    assert_eq!(first_marks(&legacy.content), vec![Vec::<Mark>::new()]);

    set_ast_pipeline_enabled(true);
    let ast = parse_markdown(&schema, "==hi==", &inherit);
    assert_eq!(first_marks(&ast.content), vec![vec![Mark::Highlight]]);

    // an explicit override wins and leaves the flag alone
    let forced = parse_markdown(&schema, "==hi==", &PipelineOptions::legacy());
    assert_eq!(first_marks(&forced.content), vec![Vec::<Mark>::new()]);
    assert!(ast_pipeline_enabled());

    set_ast_pipeline_enabled(false);
    assert!(!ast_pipeline_enabled());
}

#[test]
fn test_legacy_pipeline_round_trip() {
    let schema = Schema::full();
    let options = PipelineOptions::legacy();
    let doc = parse_markdown(&schema, "# Title\n\nsome **bold** and `code`\n", &options);
    assert_eq!(
        serialize_markdown(&schema, &doc, &options),
        "# Title\n\nsome **bold** and `code`\n"
    );
}

#[test]
fn test_serialize_options_apply_to_ast_pipeline() {
    let schema = Schema::full();
    let options = PipelineOptions {
        use_ast_pipeline: Some(true),
        serialize: SerializeOptions {
            emphasis_marker: '_',
            strong_marker: '_',
            thematic_break: "---".to_string(),
            ..Default::default()
        },
    };
    let doc = parse_markdown(&schema, "*a* **b**\n\n***", &options);
    assert_eq!(serialize_markdown(&schema, &doc, &options), "_a_ __b__\n\n---\n");
}

#[test]
fn test_both_pipelines_agree_on_common_syntax() {
    let schema = Schema::full();
    let source = "# Notes\n\nSome **bold** text.\n\n- one\n- two\n";
    let ast = parse_markdown(&schema, source, &PipelineOptions::ast());
    let legacy = parse_markdown(&schema, source, &PipelineOptions::legacy());
    assert_eq!(shape(&ast), shape(&legacy));
}
