use proptest::prelude::*;
use vmark_babel::model::Schema;
use vmark_babel::{parse_markdown, serialize_markdown, PipelineOptions};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn parse_and_serialize_are_total(source in "[a-z ~^=+$*_`\\[\\]!|>#\\-\n]{0,80}") {
        for options in [PipelineOptions::ast(), PipelineOptions::legacy()] {
            let doc = parse_markdown(&Schema::full(), &source, &options);
            let _ = serialize_markdown(&Schema::full(), &doc, &options);
        }
    }

    #[test]
    fn plain_prose_round_trips(source in "[a-z]{1,8}( [a-z]{1,8}){0,10}") {
        let doc = vmark_babel::parse(&source);
        prop_assert_eq!(vmark_babel::serialize(&doc), format!("{source}\n"));
    }
}
