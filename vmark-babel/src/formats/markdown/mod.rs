//! Markdown format implementation (AST pipeline)
//!
//! Markdown text goes through an intermediate markdown AST ([`crate::ir`])
//! before it reaches the document model:
//!
//! ```text
//! text ──parser──▶ AST ──references──▶ AST ──to_model──▶ Document
//! text ◀─serializer── AST ◀──from_model── Document
//! ```
//!
//! # Library Choice
//!
//! `comrak` does the CommonMark/GFM block and inline parsing. Its GFM
//! extensions for strikethrough, superscript and task lists are switched off;
//! those constructs, together with subscript, highlight, underline, wiki
//! links, footnote references and reference links, come from our own inline
//! scanner ([`inline`]) so each piece of syntax has exactly one owner.
//! Serialization does not use comrak: [`serializer`] writes the AST directly,
//! which keeps the output stable for editor round trips.
//!
//! # Syntax Mapping
//!
//! | Markdown                    | AST node              | Document node              |
//! |-----------------------------|-----------------------|----------------------------|
//! | `# Heading`                 | heading               | heading (+ slug id)        |
//! | `> [!TIP]` quote            | blockquote → alert    | alertBlock                 |
//! | `<details>` html run        | details               | detailsBlock               |
//! | `$$` fence                  | math                  | codeBlock `$$math$$`       |
//! | `![alt](src)` alone         | paragraph › image     | block_image                |
//! | `[id]: url`                 | definition            | link_definition            |
//! | `[^id]: text`               | footnoteDefinition    | footnote_definition        |
//! | `~x~` `^x^` `==x==` `++x++` | subscript … underline | marks                      |
//! | `$x$`                       | inlineMath            | math_inline                |
//! | `[[Page\|Alias]]`           | wikiLink              | wikiLink                   |
//!
//! # Lossy Conversions
//!
//! - Indented code blocks come back as fenced code.
//! - Setext headings come back as ATX headings.
//! - Emphasis and bullet markers are normalised (see [`SerializeOptions`]).
//! - Link reference definitions nested inside containers are consumed by
//!   comrak and do not survive.

pub mod details;
pub mod escape;
pub mod inline;
pub mod parser;
pub mod preprocess;
pub mod serializer;

pub use parser::parse_markdown_ast;
pub use serializer::{serialize_ast, SerializeOptions};

use crate::common::references::resolve;
use crate::error::BabelError;
use crate::format::Format;
use crate::ir::{to_ast, to_document};
use crate::model::{Document, Schema};
use std::collections::HashMap;

/// Parses markdown into a document through the AST pipeline.
pub fn parse_to_document(source: &str, schema: &Schema) -> Document {
    let root = resolve(parse_markdown_ast(source));
    to_document(&root, schema)
}

/// Serializes a document through the AST pipeline.
pub fn serialize_document(doc: &Document, options: &SerializeOptions) -> String {
    serialize_ast(&to_ast(doc), options)
}

/// Format implementation for markdown through the AST pipeline
#[derive(Debug, Default)]
pub struct MarkdownFormat;

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "CommonMark/GFM markdown with editor extensions"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
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
        Ok(serialize_document(doc, &SerializeOptions::default()))
    }

    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, BabelError> {
        let options = options_from_map(options)?;
        Ok(serialize_document(doc, &options))
    }
}

/// Builds serializer options from `key=value` pairs.
pub fn options_from_map(map: &HashMap<String, String>) -> Result<SerializeOptions, BabelError> {
    let mut options = SerializeOptions::default();
    apply_options(&mut options, map)?;
    Ok(options)
}

/// Layers `key=value` pairs over existing serializer options. Keys accept
/// both the dashed and the underscored spelling.
pub fn apply_options(
    options: &mut SerializeOptions,
    map: &HashMap<String, String>,
) -> Result<(), BabelError> {
    for (key, value) in map {
        match key.as_str() {
            "bullet-marker" | "bullet_marker" => {
                options.bullet_marker = single_char(key, value, &['-', '*', '+'])?
            }
            "emphasis-marker" | "emphasis_marker" => {
                options.emphasis_marker = single_char(key, value, &['*', '_'])?
            }
            "strong-marker" | "strong_marker" => {
                options.strong_marker = single_char(key, value, &['*', '_'])?
            }
            "thematic-break" | "thematic_break" => options.thematic_break = value.clone(),
            "collapse-blank-lines" | "collapse_blank_lines" => {
                options.collapse_blank_lines = value.parse().map_err(|_| {
                    BabelError::NotSupported(format!(
                        "'{key}' expects true or false, got '{value}'"
                    ))
                })?
            }
            other => {
                return Err(BabelError::NotSupported(format!(
                    "Unknown markdown option '{other}'"
                )))
            }
        }
    }
    Ok(())
}

fn single_char(key: &str, value: &str, allowed: &[char]) -> Result<char, BabelError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if allowed.contains(&ch) => Ok(ch),
        _ => Err(BabelError::NotSupported(format!(
            "'{key}' expects one of {allowed:?}, got '{value}'"
        ))),
    }
}
