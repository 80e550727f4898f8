//! Pipeline selection
//!
//! Two markdown pipelines produce the same document model:
//!
//! - the AST pipeline ([`crate::formats::markdown`]): parser, reference
//!   resolver and the two converters, with the full extension syntax,
//! - the legacy pipeline ([`crate::formats::legacy`]): comrak straight into
//!   the document model, kept for compatibility.
//!
//! Callers pick one per call through [`PipelineOptions::use_ast_pipeline`].
//! When that is `None` the process-wide default applies, which starts out as
//! the legacy pipeline and is changed with [`set_ast_pipeline_enabled`].

use crate::formats::legacy;
use crate::formats::markdown::{self, SerializeOptions};
use crate::model::{Document, Schema};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

static AST_PIPELINE: AtomicBool = AtomicBool::new(false);

/// Sets the process-wide pipeline default.
pub fn set_ast_pipeline_enabled(enabled: bool) {
    AST_PIPELINE.store(enabled, Ordering::Relaxed);
}

/// The process-wide pipeline default.
pub fn ast_pipeline_enabled() -> bool {
    AST_PIPELINE.load(Ordering::Relaxed)
}

/// Per-call pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Overrides the process-wide default for this call only.
    pub use_ast_pipeline: Option<bool>,
    /// Writer settings of the AST pipeline.
    pub serialize: SerializeOptions,
}

impl PipelineOptions {
    /// Options that force the AST pipeline.
    pub fn ast() -> Self {
        PipelineOptions {
            use_ast_pipeline: Some(true),
            ..Default::default()
        }
    }

    /// Options that force the legacy pipeline.
    pub fn legacy() -> Self {
        PipelineOptions {
            use_ast_pipeline: Some(false),
            ..Default::default()
        }
    }

    fn uses_ast(&self) -> bool {
        self.use_ast_pipeline.unwrap_or_else(ast_pipeline_enabled)
    }
}

/// Parses markdown text into a document for `schema`.
pub fn parse_markdown(schema: &Schema, text: &str, options: &PipelineOptions) -> Document {
    if options.uses_ast() {
        trace!(bytes = text.len(), "parsing with the AST pipeline");
        markdown::parse_to_document(text, schema)
    } else {
        trace!(bytes = text.len(), "parsing with the legacy pipeline");
        legacy::parse_to_document(text, schema)
    }
}

/// Serializes a document back to markdown text.
pub fn serialize_markdown(_schema: &Schema, doc: &Document, options: &PipelineOptions) -> String {
    if options.uses_ast() {
        trace!(blocks = doc.content.len(), "serializing with the AST pipeline");
        markdown::serialize_document(doc, &options.serialize)
    } else {
        trace!(blocks = doc.content.len(), "serializing with the legacy pipeline");
        legacy::serialize_document(doc)
    }
}
