//! Error types for format operations
//!
//! The markdown pipeline itself never fails; errors only come from format
//! lookup, JSON decoding and writer failures at the format boundary.

use std::fmt;

/// Errors raised at the format and registry boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum BabelError {
    /// No format registered under that name
    FormatNotFound(String),
    /// Input could not be decoded (only structured formats such as JSON)
    ParseError(String),
    /// Output could not be produced
    SerializationError(String),
    /// The format does not implement the requested direction or option
    NotSupported(String),
}

impl fmt::Display for BabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BabelError::FormatNotFound(name) => write!(f, "Format '{name}' not found"),
            BabelError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            BabelError::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            BabelError::NotSupported(msg) => write!(f, "Operation not supported: {msg}"),
        }
    }
}

impl std::error::Error for BabelError {}

impl From<serde_json::Error> for BabelError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            BabelError::ParseError(err.to_string())
        } else {
            BabelError::SerializationError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            BabelError::FormatNotFound("rtf".to_string()).to_string(),
            "Format 'rtf' not found"
        );
        assert_eq!(
            BabelError::NotSupported("no parsing".to_string()).to_string(),
            "Operation not supported: no parsing"
        );
    }

    #[test]
    fn test_json_syntax_error_is_parse_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(BabelError::from(err), BabelError::ParseError(_)));
    }
}
