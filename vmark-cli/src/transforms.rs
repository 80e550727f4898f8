//! Inspect transforms
//!
//! Each transform is a stage + format combination:
//!
//! - `mdast-json`: the markdown syntax tree after reference resolution, as
//!   JSON. Always produced by the AST pipeline, since the legacy pipeline
//!   never builds one.
//! - `model-json`: the document model as JSON.
//! - `model-treeviz`: the document model as a tree (default).
//!
//! Parameters (`--extra-<name> [value]`):
//!
//! - `show-linum`: prefix treeviz lines with source lines.
//! - `pretty`: pretty-print JSON output.

use std::collections::HashMap;
use vmark_babel::common::references::resolve;
use vmark_babel::formats::markdown::parse_markdown_ast;
use vmark_babel::formats::treeviz::to_treeviz;
use vmark_babel::model::Schema;
use vmark_babel::{parse_markdown, PipelineOptions};

/// All transforms `vmark inspect` accepts.
pub const AVAILABLE_TRANSFORMS: &[&str] = &["mdast-json", "model-json", "model-treeviz"];

pub const DEFAULT_TRANSFORM: &str = "model-treeviz";

/// Runs `transform_name` over markdown `source`.
pub fn execute_transform(
    source: &str,
    transform_name: &str,
    options: &PipelineOptions,
    params: &HashMap<String, String>,
) -> Result<String, String> {
    let pretty = flag(params, "pretty", true)?;
    match transform_name {
        "mdast-json" => {
            let root = resolve(parse_markdown_ast(source));
            to_json(&root, pretty)
        }
        "model-json" => {
            let doc = parse_markdown(&Schema::full(), source, options);
            to_json(&doc, pretty)
        }
        "model-treeviz" => {
            let doc = parse_markdown(&Schema::full(), source, options);
            Ok(to_treeviz(&doc, flag(params, "show-linum", false)?))
        }
        other => Err(format!(
            "Unknown transform '{other}'. Available: {}",
            AVAILABLE_TRANSFORMS.join(", ")
        )),
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.map(|mut text| {
        text.push('\n');
        text
    })
    .map_err(|e| format!("JSON serialization failed: {e}"))
}

fn flag(params: &HashMap<String, String>, key: &str, default: bool) -> Result<bool, String> {
    match params.get(key).map(|raw| raw.to_lowercase()) {
        None => Ok(default),
        Some(raw) => match raw.as_str() {
            "true" | "1" | "yes" | "y" => Ok(true),
            "false" | "0" | "no" | "n" => Ok(false),
            other => Err(format!("Invalid boolean value '{other}' for --extra-{key}")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_model_json_compact() {
        let output = execute_transform(
            "***",
            "model-json",
            &PipelineOptions::ast(),
            &params(&[("pretty", "false")]),
        )
        .unwrap();
        assert_eq!(output, "{\"content\":[{\"type\":\"horizontalRule\"}]}\n");
    }

    #[test]
    fn test_mdast_json_has_extension_nodes() {
        let output = execute_transform(
            "H~2~O",
            "mdast-json",
            &PipelineOptions::legacy(),
            &HashMap::new(),
        )
        .unwrap();
        assert!(output.contains("subscript"), "{output}");
    }

    #[test]
    fn test_treeviz_respects_pipeline() {
        let ast = execute_transform(
            "==hi==",
            "model-treeviz",
            &PipelineOptions::ast(),
            &HashMap::new(),
        )
        .unwrap();
        assert!(ast.contains("[highlight]"), "{ast}");
        let legacy = execute_transform(
            "==hi==",
            "model-treeviz",
            &PipelineOptions::legacy(),
            &HashMap::new(),
        )
        .unwrap();
        assert!(!legacy.contains("[highlight]"), "{legacy}");
    }

    #[test]
    fn test_unknown_transform_and_bad_flag() {
        let none = HashMap::new();
        assert!(execute_transform("x", "ast-tag", &PipelineOptions::ast(), &none).is_err());
        let bad = params(&[("show-linum", "maybe")]);
        assert!(execute_transform("x", "model-treeviz", &PipelineOptions::ast(), &bad).is_err());
    }
}
