//! Format trait definition
//!
//! Every surface the document model can be read from or written to (markdown
//! through either pipeline, JSON, the tree visualiser) implements [`Format`],
//! so the registry and the CLI treat them uniformly.

use crate::error::BabelError;
use crate::model::Document;
use std::collections::HashMap;

/// A textual representation of [`Document`]s.
///
/// Formats may support parsing, serialization or both; the default methods
/// report [`BabelError::NotSupported`].
///
/// ```ignore
/// struct Outline;
///
/// impl Format for Outline {
///     fn name(&self) -> &str {
///         "outline"
///     }
///
///     fn supports_serialization(&self) -> bool {
///         true
///     }
///
///     fn serialize(&self, doc: &Document) -> Result<String, BabelError> {
///         Ok(format!("{} blocks", doc.content.len()))
///     }
/// }
/// ```
pub trait Format: Send + Sync {
    /// Registry name, e.g. `markdown` or `json`
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// File extensions without the leading dot, used for detection
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    fn supports_parsing(&self) -> bool {
        false
    }

    fn supports_serialization(&self) -> bool {
        false
    }

    fn parse(&self, _source: &str) -> Result<Document, BabelError> {
        Err(BabelError::NotSupported(format!(
            "Format '{}' does not support parsing",
            self.name()
        )))
    }

    fn serialize(&self, _doc: &Document) -> Result<String, BabelError> {
        Err(BabelError::NotSupported(format!(
            "Format '{}' does not support serialization",
            self.name()
        )))
    }

    /// Serialize with format-specific `key=value` options.
    ///
    /// Formats without options accept an empty map only.
    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, BabelError> {
        if options.is_empty() {
            self.serialize(doc)
        } else {
            Err(BabelError::NotSupported(format!(
                "Format '{}' does not support extra parameters",
                self.name()
            )))
        }
    }
}
