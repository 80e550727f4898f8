//! Format-agnostic passes shared by the converters.

pub mod references;
pub mod slug;
pub mod text;
