//! Markdown abstract syntax tree and its conversions.
//!
//! [`nodes`] is the grammar-faithful tree produced by the markdown parser and
//! consumed by the serializer. [`to_model`] and [`from_model`] convert between
//! it and the editable document model in [`crate::model`].

pub mod from_model;
pub mod nodes;
pub mod to_model;

pub use from_model::to_ast;
pub use to_model::to_document;
