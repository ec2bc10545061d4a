//! Token types and tokens shared by the CSV and INI lexers.
//!
//! A [`TokenType`] is an opaque id plus a Pratt-parsing precedence. A
//! [`Token`] is one lexeme: its raw text, its type, and its precise
//! source position. Both are immutable once produced by a lexer.

use std::fmt;

/// Classification of a lexeme, carrying the precedence that drives the
/// Pratt parser's binding decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenType {
    pub id: &'static str,
    pub precedence: i32,
}

impl TokenType {
    pub const fn new(id: &'static str, precedence: i32) -> Self {
        TokenType { id, precedence }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Reserved token types for the CSV family.
pub mod csv {
    use super::TokenType;

    pub const FIELD: TokenType = TokenType::new("FIELD", 10);
    pub const SEPARATOR: TokenType = TokenType::new("SEPARATOR", 20);
    pub const EOL: TokenType = TokenType::new("EOL", 5);
    pub const EOF: TokenType = TokenType::new("EOF", 0);
}

/// Reserved token types for the INI family. `INIT` is the parser-loop
/// sentinel (max precedence so its
/// prefix command always fires first), `EOF` is the floor that
/// guarantees every Pratt loop terminates, structural terminators sit
/// just above it, and operator-like tokens bind tighter still.
pub mod ini {
    use super::TokenType;

    pub const INIT: TokenType = TokenType::new("INIT", i32::MAX);
    pub const EOF: TokenType = TokenType::new("EOF", i32::MIN);
    pub const EOL: TokenType = TokenType::new("EOL", 5);
    pub const SECTION_START: TokenType = TokenType::new("SECTION_START", 40);
    pub const SECTION_END: TokenType = TokenType::new("SECTION_END", 5);
    pub const SUB_SECTION: TokenType = TokenType::new("SUB_SECTION", 35);
    pub const IDENTIFIER: TokenType = TokenType::new("IDENTIFIER", 30);
    pub const QUOTE: TokenType = TokenType::new("QUOTE", 30);
    pub const D_QUOTE: TokenType = TokenType::new("D_QUOTE", 30);
    pub const QUOTE_END: TokenType = TokenType::new("QUOTE_END", 5);
    pub const D_QUOTE_END: TokenType = TokenType::new("D_QUOTE_END", 5);
    pub const ASSIGNMENT: TokenType = TokenType::new("ASSIGNMENT", 50);
    pub const COMMENT: TokenType = TokenType::new("COMMENT", 45);
    pub const ESCAPE: TokenType = TokenType::new("ESCAPE", 30);
    pub const ESCAPED: TokenType = TokenType::new("ESCAPED", 30);
    pub const WHITESPACE: TokenType = TokenType::new("WHITESPACE", 1);
}

/// One lexeme: raw text, type tag, and source position.
///
/// `length` always equals `value.chars().count()`; the invariant is
/// checked in [`Token::new`] with a `debug_assert!` rather than carried
/// as a runtime check, matching how the teacher treats internally
/// enforced invariants elsewhere (e.g. `FixedDecimalValue::validate_decimal`
/// is the one place that actually runs the check).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub value: String,
    pub kind: TokenType,
    pub line_start: u32,
    pub line_end: u32,
    pub start_pos: u32,
    pub length: usize,
}

impl Token {
    pub fn new(value: impl Into<String>, kind: TokenType, line_start: u32, line_end: u32, start_pos: u32) -> Self {
        let value = value.into();
        let length = value.chars().count();
        debug_assert!(line_start <= line_end, "token line range must be non-decreasing");
        Token {
            value,
            kind,
            line_start,
            line_end,
            start_pos,
            length,
        }
    }

    /// Builds the EOF sentinel returned by [`crate::lexer::Lexer::next`]
    /// once the queue is drained.
    pub fn eof(kind: TokenType, line: u32, pos: u32) -> Self {
        Token::new("", kind, line, line, pos)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == csv::EOF || self.kind == ini::EOF
    }
}

impl Ord for Token {
    /// Lexicographic over (line, column, a stable hash of type, value),
    /// per spec.md §4.2.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        self.line_start
            .cmp(&other.line_start)
            .then(self.start_pos.cmp(&other.start_pos))
            .then_with(|| {
                let mut hasher_self = DefaultHasher::new();
                self.kind.hash(&mut hasher_self);
                let mut hasher_other = DefaultHasher::new();
                other.kind.hash(&mut hasher_other);
                hasher_self.finish().cmp(&hasher_other.finish())
            })
            .then_with(|| self.value.cmp(&other.value))
            .then(Ordering::Equal)
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_length_matches_value_char_count() {
        let t = Token::new("héllo", csv::FIELD, 1, 1, 0);
        assert_eq!(t.length, "héllo".chars().count());
    }

    #[test]
    fn ordering_is_line_then_column() {
        let a = Token::new("a", csv::FIELD, 1, 1, 0);
        let b = Token::new("b", csv::FIELD, 1, 1, 1);
        let c = Token::new("c", csv::FIELD, 2, 2, 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn eof_sentinel_has_extreme_precedence() {
        assert_eq!(ini::EOF.precedence, i32::MIN);
        assert_eq!(ini::INIT.precedence, i32::MAX);
        assert!(ini::EOF.precedence < ini::EOL.precedence);
    }
}
