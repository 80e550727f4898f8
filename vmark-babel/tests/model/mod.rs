//! Document model tests
//!
//! Invariants of the two converters, exercised from hand-built documents.

mod from_model;
mod schema;
