//! Error taxonomy for the conversion engine.
//!
//! Replaces the prototype-inherited error hierarchy of the source system
//! with a single tagged sum type. Every variant carries enough context to
//! render a one-line `kind: line: pos: message` diagnostic; the cause
//! chain is preserved through `source: Option<Box<SynformError>>` or
//! `#[source]`/`#[from]` where `thiserror` can derive it directly.

use thiserror::Error;

/// Errors produced anywhere inside the syntax/lexer/parser/formatter core.
#[derive(Debug, Error)]
pub enum SynformError {
    /// Generic data-pipeline failure; the root of the taxonomy.
    #[error("data error: {message}")]
    Data {
        message: String,
        #[source]
        source: Option<Box<SynformError>>,
    },

    /// Syntactic violation raised by the parser (missing prefix command,
    /// row symmetry violation, unterminated section, ...).
    #[error("parse error at {line}:{pos}: {message}")]
    Parse {
        message: String,
        line: u32,
        pos: u32,
        #[source]
        source: Option<Box<SynformError>>,
    },

    /// A parse error tagged to one specific offending token.
    #[error("syntax error at {line}:{pos} (token {token:?}): {message}")]
    Syntax {
        message: String,
        line: u32,
        pos: u32,
        token: Option<String>,
    },

    /// The lexer rejected a character or could not complete a token.
    #[error("token error at {line}:{pos}: {message} (found {found:?})")]
    Token {
        message: String,
        line: u32,
        pos: u32,
        found: String,
    },

    /// A semantic violation on an already-built expression (duplicate key
    /// under `throw` policy, a `Section` and `Property` sharing one name).
    #[error("expression error: {message}")]
    Expression { message: String },

    /// A formatter received a node shape it cannot emit.
    #[error("format error: {message}")]
    Format { message: String },

    /// `SyntaxBuilder::build` validation failure (not a parse-time error:
    /// this is a misconfigured dialect, caught before any input is read).
    #[error("syntax build error: {message}")]
    Build { message: String },

    /// Propagated I/O failure from a `FileFormat` sink or source read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SynformError {
    pub fn data(message: impl Into<String>) -> Self {
        SynformError::Data {
            message: message.into(),
            source: None,
        }
    }

    pub fn data_with_cause(message: impl Into<String>, cause: SynformError) -> Self {
        SynformError::Data {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn parse(message: impl Into<String>, line: u32, pos: u32) -> Self {
        SynformError::Parse {
            message: message.into(),
            line,
            pos,
            source: None,
        }
    }

    pub fn syntax(message: impl Into<String>, line: u32, pos: u32, token: Option<&str>) -> Self {
        SynformError::Syntax {
            message: message.into(),
            line,
            pos,
            token: token.map(ToString::to_string),
        }
    }

    pub fn token(message: impl Into<String>, line: u32, pos: u32, found: impl Into<String>) -> Self {
        SynformError::Token {
            message: message.into(),
            line,
            pos,
            found: found.into(),
        }
    }

    pub fn expression(message: impl Into<String>) -> Self {
        SynformError::Expression {
            message: message.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        SynformError::Format {
            message: message.into(),
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        SynformError::Build {
            message: message.into(),
        }
    }

    /// Renders the one-line, user-visible diagnostic required by the spec:
    /// kind, line/position when known, and the message.
    pub fn one_line(&self) -> String {
        format!("{self}")
    }
}

/// Convenience alias used throughout the core modules.
pub type Result<T> = std::result::Result<T, SynformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_line_includes_position_for_parse_errors() {
        let err = SynformError::parse("unexpected token", 3, 7);
        assert_eq!(err.one_line(), "parse error at 3:7: unexpected token");
    }

    #[test]
    fn token_error_reports_offending_text() {
        let err = SynformError::token("unterminated quote", 1, 0, "\"abc");
        let rendered = err.one_line();
        assert!(rendered.contains("unterminated quote"));
        assert!(rendered.contains("\\\"abc"));
    }

    #[test]
    fn data_error_preserves_cause_chain() {
        use std::error::Error as _;
        let cause = SynformError::expression("duplicate section under throw policy");
        let top = SynformError::data_with_cause("conversion aborted", cause);
        assert!(top.source().is_some());
    }
}
