//! Document-model JSON format
//!
//! The serde form of [`Document`], using the editor's node type names. This
//! is what a front end receives, and it is the easiest way to look at the
//! marks a parse produced.

use crate::error::BabelError;
use crate::format::Format;
use crate::model::Document;
use std::collections::HashMap;

/// Format implementation for document-model JSON
#[derive(Debug, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Document model as JSON"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, BabelError> {
        Ok(serde_json::from_str(source)?)
    }

    fn serialize(&self, doc: &Document) -> Result<String, BabelError> {
        Ok(serde_json::to_string_pretty(doc)?)
    }

    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, BabelError> {
        let pretty = match options.get("pretty").map(String::as_str) {
            None | Some("true") => true,
            Some("false") => false,
            Some(other) => {
                return Err(BabelError::NotSupported(format!(
                    "'pretty' expects true or false, got '{other}'"
                )))
            }
        };
        if let Some(key) = options.keys().find(|key| key.as_str() != "pretty") {
            return Err(BabelError::NotSupported(format!("Unknown json option '{key}'")));
        }
        if pretty {
            Ok(serde_json::to_string_pretty(doc)?)
        } else {
            Ok(serde_json::to_string(doc)?)
        }
    }
}
