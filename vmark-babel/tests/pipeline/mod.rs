//! Pipeline adapter tests
//!
//! Pipeline selection and whole-pipeline properties.

mod properties;
mod selection;
