//! Diagnostics for modules that fail to parse
//!
//! Struct fields are read by miette's `#[derive(Diagnostic)]` expansion.

#![allow(unused_assignments, reason = "fields are consumed by the miette derive")]

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Parse error with rich diagnostic information
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum ParseError {
    /// Syntax error with unexpected input
    #[error("unexpected token `{token}`")]
    #[diagnostic(code(parser::unexpected_token), help("this token is not valid here"))]
    UnexpectedToken {
        /// What was found
        token: String,
        /// Source location
        #[label("unexpected token")]
        span: SourceSpan,
        /// Module source for context
        #[source_code]
        src: NamedSource<String>,
    },

    /// Missing expected token
    #[error("expected `{expected}`, found `{found}`")]
    #[diagnostic(code(parser::missing_token), help("try adding `{expected}` here"))]
    MissingToken {
        /// What was expected
        expected: String,
        /// What was actually found
        found: String,
        /// Source location where it should be
        #[label("expected `{expected}` here")]
        span: SourceSpan,
        /// Module source for context
        #[source_code]
        src: NamedSource<String>,
    },

    /// Unclosed delimiter
    #[error("this module contains an unclosed delimiter `{opening_char}`")]
    #[diagnostic(code(parser::unclosed_delimiter), help("add a closing `{closing_char}`"))]
    UnclosedDelimiter {
        /// The opening character
        opening_char: char,
        /// The expected closing character
        closing_char: char,
        /// Opening delimiter location
        #[label("unclosed delimiter")]
        opening: SourceSpan,
        /// Location where closing was expected
        #[label]
        expected_close: SourceSpan,
        /// Module source for context
        #[source_code]
        src: NamedSource<String>,
    },

    /// Invalid syntax construct
    #[error("invalid {construct}")]
    #[diagnostic(code(parser::invalid_syntax))]
    InvalidSyntax {
        /// Type of construct (e.g. "class declaration")
        construct: String,
        /// Detailed explanation
        #[help]
        suggestion: Option<String>,
        /// Source location
        #[label("{construct} is invalid")]
        span: SourceSpan,
        /// Module source for context
        #[source_code]
        src: NamedSource<String>,
    },

    /// Parse failed completely
    #[error("failed to parse module: {reason}")]
    #[diagnostic(code(parser::parse_failed))]
    ParseFailed {
        /// Reason for failure
        reason: String,
    },
}

impl ParseError {
    /// Byte span of the primary label, if the error has one
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::MissingToken { span, .. }
            | Self::InvalidSyntax { span, .. } => Some(*span),
            Self::UnclosedDelimiter { opening, .. } => Some(*opening),
            Self::ParseFailed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_of_each_variant() {
        let src = || NamedSource::new("a.php", "<?php class {".to_string());

        let unexpected = ParseError::UnexpectedToken {
            token: "{".to_string(),
            span: (12, 1).into(),
            src: src(),
        };
        assert_eq!(unexpected.span().map(|span| span.offset()), Some(12));

        let unclosed = ParseError::UnclosedDelimiter {
            opening_char: '{',
            closing_char: '}',
            opening: (12, 1).into(),
            expected_close: (13, 0).into(),
            src: src(),
        };
        assert_eq!(unclosed.span().map(|span| span.offset()), Some(12));
        assert!(unclosed.to_string().contains("unclosed delimiter `{`"));

        let failed = ParseError::ParseFailed {
            reason: "no language".to_string(),
        };
        assert!(failed.span().is_none());
    }
}
