//! Markdown ⇄ document-model conversion for the vmark editor
//!
//!     The editor shows the same document in two surfaces: a structured (WYSIWYG) view that
//!     edits a document tree, and a source view that edits markdown text. This crate is the
//!     bridge: `parse(text) → Document` and `serialize(&Document) → text`, both total.
//!
//!     This is a pure lib: no printing, no env vars, no file I/O. The vmark-cli crate is the
//!     shell around it.
//!
//! Architecture
//!
//!     Markdown is first parsed into a markdown syntax tree (./ir/nodes.rs) that mirrors the
//!     grammar, formatting expressed as nesting. The document model (./model) is what the
//!     editor works on: inline leaves carrying flat, ordered mark lists, atomic nodes for
//!     math, images and wiki links, and containers that are never empty. The two converters
//!     in ./ir do the nested ⇄ flat work; everything format specific stays in ./formats.
//!
//!     text ─parser─▶ AST ─references─▶ AST ─to_model─▶ Document
//!     text ◀─serializer─ AST ◀─from_model─ Document
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     ├── pipeline.rs             # AST vs legacy pipeline selection
//!     ├── formats
//!     │   ├── markdown            # AST pipeline: pre-pass, parser, scanner, serializer
//!     │   ├── legacy              # comrak-native pipeline
//!     │   ├── json                # document model as JSON
//!     │   └── treeviz             # visual tree of the document model
//!     ├── ir                      # markdown AST and the two converters
//!     ├── model                   # document model and schema
//!     └── common                  # reference resolution, heading slugs, plain text
//!
//! Testing
//!     tests
//!     ├── lib.rs
//!     ├── markdown                # syntax and round trips
//!     ├── model                   # converter invariants
//!     └── pipeline                # pipeline selection and properties
//!
//!     Rust does not discover tests in subdirectories by default, so tests/lib.rs includes
//!     them as modules.
//!
//! Error Handling
//!
//!     Parsing and serializing markdown never fail. Syntax that does not parse as intended
//!     falls back to literal text, and nodes a reduced schema lacks are skipped (both logged
//!     at debug level with `tracing`). `BabelError` only shows up at the format boundary:
//!     unknown format names, invalid JSON, unsupported options.
//!
//! Library Choices
//!
//!     comrak does the CommonMark/GFM parsing, and writes markdown for the legacy pipeline.
//!     The editor's own syntax (subscript, highlight, underline, wiki links, alerts, details,
//!     footnote and reference links) is recognised by our inline scanner on top of comrak's
//!     tree, and the AST pipeline writes markdown itself so round trips stay stable.

pub mod common;
pub mod error;
pub mod format;
pub mod formats;
pub mod ir;
pub mod model;
pub mod pipeline;
pub mod registry;

pub use error::BabelError;
pub use format::Format;
pub use formats::markdown::SerializeOptions;
pub use model::{Document, Schema};
pub use pipeline::{
    ast_pipeline_enabled, parse_markdown, serialize_markdown, set_ast_pipeline_enabled,
    PipelineOptions,
};
pub use registry::FormatRegistry;

/// Parses markdown into a document through the AST pipeline and the full
/// schema. Never fails.
pub fn parse(text: &str) -> Document {
    parse_markdown(&Schema::full(), text, &PipelineOptions::ast())
}

/// Serializes a document to markdown through the AST pipeline. Total over
/// every document `parse` produces.
pub fn serialize(doc: &Document) -> String {
    serialize_markdown(&Schema::full(), doc, &PipelineOptions::ast())
}
