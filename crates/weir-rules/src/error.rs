use crate::token::SourceLocation;
use thiserror::Error;

/// Lexer, parser or validation failure, located in the rule source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at {location}: {message}")]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl ParseError {
    pub fn at(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}
