//! Markdown syntax tests
//!
//! Parsing and serialization of the supported syntax through the AST
//! pipeline.

mod references;
mod round_trip;
mod syntax;
mod table;
