//! Format registry for format discovery and selection

use crate::error::BabelError;
use crate::format::Format;
use crate::model::Document;
use std::collections::HashMap;

/// Formats by name.
///
/// ```ignore
/// let registry = FormatRegistry::default();
/// let doc = registry.parse("# Title", "markdown")?;
/// let json = registry.serialize(&doc, "json")?;
/// ```
pub struct FormatRegistry {
    formats: HashMap<String, Box<dyn Format>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        FormatRegistry {
            formats: HashMap::new(),
        }
    }

    /// Registers `format`, replacing any format of the same name.
    pub fn register<F: Format + 'static>(&mut self, format: F) {
        self.formats
            .insert(format.name().to_string(), Box::new(format));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Format, BabelError> {
        self.formats
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| BabelError::FormatNotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Sorted format names.
    pub fn list_formats(&self) -> Vec<String> {
        let mut names: Vec<_> = self.formats.keys().cloned().collect();
        names.sort();
        names
    }

    /// Picks a format from a file name's extension.
    ///
    /// Several formats may claim an extension (`md` is read by both markdown
    /// pipelines); the alphabetically first name wins, which is `markdown`.
    pub fn detect_format_from_filename(&self, filename: &str) -> Option<String> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())?;

        self.list_formats().into_iter().find(|name| {
            self.formats
                .get(name)
                .is_some_and(|format| format.file_extensions().contains(&extension))
        })
    }

    pub fn parse(&self, source: &str, format: &str) -> Result<Document, BabelError> {
        let fmt = self.get(format)?;
        if !fmt.supports_parsing() {
            return Err(BabelError::NotSupported(format!(
                "Format '{format}' does not support parsing"
            )));
        }
        fmt.parse(source)
    }

    pub fn serialize(&self, doc: &Document, format: &str) -> Result<String, BabelError> {
        self.serialize_with_options(doc, format, &HashMap::new())
    }

    pub fn serialize_with_options(
        &self,
        doc: &Document,
        format: &str,
        options: &HashMap<String, String>,
    ) -> Result<String, BabelError> {
        let fmt = self.get(format)?;
        if !fmt.supports_serialization() {
            return Err(BabelError::NotSupported(format!(
                "Format '{format}' does not support serialization"
            )));
        }
        fmt.serialize_with_options(doc, options)
    }

    /// A registry holding every built-in format.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(crate::formats::markdown::MarkdownFormat);
        registry.register(crate::formats::legacy::LegacyMarkdownFormat);
        registry.register(crate::formats::json::JsonFormat);
        registry.register(crate::formats::treeviz::TreevizFormat::default());
        registry
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
