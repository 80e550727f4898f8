//! Shared configuration loader for the vmark toolchain.
//!
//! `defaults/vmark.default.toml` is embedded into every binary so the
//! documented defaults and the runtime behavior cannot drift apart.
//! Applications layer user files and command line overrides on top of those
//! defaults via [`Loader`] before deserializing into [`VmarkConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;
use vmark_babel::{PipelineOptions, SerializeOptions};

const DEFAULT_TOML: &str = include_str!("../defaults/vmark.default.toml");

/// Top-level configuration consumed by vmark applications.
#[derive(Debug, Clone, Deserialize)]
pub struct VmarkConfig {
    pub pipeline: PipelineConfig,
    pub markdown: MarkdownConfig,
    pub inspect: InspectConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub use_ast_pipeline: bool,
}

/// Mirrors the knobs exposed by the markdown serializer.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownConfig {
    pub bullet_marker: char,
    pub emphasis_marker: char,
    pub strong_marker: char,
    pub thematic_break: String,
    pub collapse_blank_lines: bool,
}

impl MarkdownConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.bullet_marker, '-' | '*' | '+') {
            return Err(ConfigError::Message(format!(
                "markdown.bullet_marker must be one of - * +, got '{}'",
                self.bullet_marker
            )));
        }
        for (key, marker) in [
            ("emphasis_marker", self.emphasis_marker),
            ("strong_marker", self.strong_marker),
        ] {
            if !matches!(marker, '*' | '_') {
                return Err(ConfigError::Message(format!(
                    "markdown.{key} must be * or _, got '{marker}'"
                )));
            }
        }
        Ok(())
    }
}

impl From<&MarkdownConfig> for SerializeOptions {
    fn from(config: &MarkdownConfig) -> Self {
        SerializeOptions {
            bullet_marker: config.bullet_marker,
            emphasis_marker: config.emphasis_marker,
            strong_marker: config.strong_marker,
            thematic_break: config.thematic_break.clone(),
            collapse_blank_lines: config.collapse_blank_lines,
        }
    }
}

/// Controls `vmark inspect` output.
#[derive(Debug, Clone, Deserialize)]
pub struct InspectConfig {
    pub pretty_json: bool,
    pub show_line_numbers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// A `tracing_subscriber::EnvFilter` directive.
    pub level: String,
}

impl VmarkConfig {
    /// Per-call pipeline options carrying the configured pipeline choice and
    /// serializer knobs.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            use_ast_pipeline: Some(self.pipeline.use_ast_pipeline),
            serialize: SerializeOptions::from(&self.markdown),
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a configuration file that may be absent.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override, e.g. from a command line flag.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder, deserialize and check the markdown markers.
    pub fn build(self) -> Result<VmarkConfig, ConfigError> {
        let config: VmarkConfig = self.builder.build()?.try_deserialize()?;
        config.markdown.validate()?;
        Ok(config)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<VmarkConfig, ConfigError> {
    Loader::new().build()
}
