//! Legacy markdown format
//!
//! The pipeline the editor shipped with before the AST pipeline: comrak with
//! its built-in GFM extensions, converted straight into the document model,
//! and comrak's CommonMark writer on the way back. It knows strikethrough,
//! superscript, task lists, tables, footnotes and dollar math, but none of
//! the editor's own syntax (subscript, highlight, underline, wiki links,
//! alerts, details). It stays selectable through
//! [`crate::pipeline::PipelineOptions`] for documents that depend on its
//! exact output.

pub mod parser;
pub mod serializer;

pub use parser::parse_to_document;

use crate::error::BabelError;
use crate::format::Format;
use crate::model::{Document, Schema};
use tracing::warn;

/// Serializes a document with the legacy writer.
///
/// comrak writes into memory, so the writer cannot fail in practice; should
/// it ever do so the document is logged and an empty string returned.
pub fn serialize_document(doc: &Document) -> String {
    serializer::serialize_to_markdown(doc).unwrap_or_else(|err| {
        warn!(%err, "legacy serializer failed");
        String::new()
    })
}

/// Format implementation for the legacy comrak-native pipeline
#[derive(Debug, Default)]
pub struct LegacyMarkdownFormat;

impl Format for LegacyMarkdownFormat {
    fn name(&self) -> &str {
        "markdown-legacy"
    }

    fn description(&self) -> &str {
        "CommonMark/GFM markdown through comrak's native extensions"
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, BabelError> {
        Ok(parse_to_document(source, &Schema::full()))
    }

    fn serialize(&self, doc: &Document) -> Result<String, BabelError> {
        serializer::serialize_to_markdown(doc)
    }
}
