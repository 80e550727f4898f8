//! Format implementations
//!
//! Each format converts between the document model and one textual
//! representation and is registered in [`crate::registry::FormatRegistry`].

pub mod json;
pub mod legacy;
pub mod markdown;
pub mod treeviz;

pub use json::JsonFormat;
pub use legacy::LegacyMarkdownFormat;
pub use markdown::MarkdownFormat;
pub use treeviz::TreevizFormat;
