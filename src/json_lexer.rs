//! JSON-value lexer (spec.md §4.3 "JSON lexer").
//!
//! Drives the JSON → text direction: instead of scanning characters, it
//! walks an in-memory [`serde_json::Value`] and emits the same token
//! vocabulary the text lexers produce, so the existing Pratt command
//! tables (`csv_commands`/`ini_commands`) and formatters need no
//! JSON-specific code path. Tokens carry synthetic source positions —
//! one "line" per emitted record/assignment — good enough for error
//! messages, never compared against real source input.

use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::lexer::{Lexer, LexerState};
use crate::projection::{flatten_headers, resolve_cell};
use crate::syntax::{Format, Syntax};
use crate::token::{csv, ini, Token, TokenType};

pub struct JsonLexer {
    format: Format,
    syntax: Syntax,
    state: LexerState,
}

impl JsonLexer {
    pub fn new(syntax: Syntax) -> Self {
        JsonLexer {
            format: syntax.format,
            syntax,
            state: LexerState::new(),
        }
    }

    fn push(&mut self, value: impl Into<String>, kind: TokenType) {
        let value = value.into();
        let line = self.state.line;
        let pos = self.state.column;
        self.state.column += value.chars().count() as u32;
        self.state.push(Token::new(value, kind, line, line, pos));
    }

    fn newline(&mut self) {
        self.state.line += 1;
        self.state.column = 0;
    }

    /// Loads a CSV-shaped token stream: a header row, then one row per
    /// record. `header` overrides the derived header (e.g. when the
    /// caller already knows it); otherwise it is derived via
    /// [`flatten_headers`] (spec.md §4.6 phase 1).
    pub fn load_csv(&mut self, records: &[JsonValue], header: Option<Vec<String>>) -> Result<Vec<String>> {
        let headers = header.unwrap_or_else(|| flatten_headers(records, &self.syntax));
        self.emit_csv_row(headers.iter().map(String::as_str))?;
        for record in records {
            let mut cells = Vec::with_capacity(headers.len());
            for h in &headers {
                cells.push(resolve_cell(record, h, &self.syntax)?.to_string());
            }
            self.emit_csv_row(cells.iter().map(String::as_str))?;
        }
        self.state.push(Token::eof(csv::EOF, self.state.line, self.state.column));
        self.state.ended = true;
        Ok(headers)
    }

    fn emit_csv_row<'a>(&mut self, cells: impl Iterator<Item = &'a str>) -> Result<()> {
        let sep = self.syntax.delimiters.first().copied().unwrap_or(',');
        let mut first = true;
        for cell in cells {
            if !first {
                self.push(sep.to_string(), csv::SEPARATOR);
            }
            self.push(cell.to_string(), csv::FIELD);
            first = false;
        }
        self.push(self.syntax.line_terminator.clone(), csv::EOL);
        self.newline();
        Ok(())
    }

    /// Loads an INI-shaped token stream from a nested JSON object: one
    /// `SECTION_START`/body pair per nested object, one assignment per
    /// scalar leaf, and a repeated assignment per array element — the
    /// reverse of `IniJsonFormat`'s "a `Property` with multiple values
    /// becomes an array" (spec.md §4.7). Reconstructing the array on
    /// the way back in requires the document to be parsed under the
    /// `merge` property-duplicate policy; the converter is responsible
    /// for selecting that when driving this direction.
    pub fn load_ini(&mut self, root: &JsonValue) -> Result<()> {
        if let JsonValue::Object(map) = root {
            for (key, value) in map {
                self.emit_ini_entry(key, value)?;
            }
        }
        self.state.push(Token::eof(ini::EOF, self.state.line, self.state.column));
        self.state.ended = true;
        Ok(())
    }

    fn emit_ini_entry(&mut self, key: &str, value: &JsonValue) -> Result<()> {
        match value {
            JsonValue::Object(map) => {
                let (open, close) = self.syntax.section_brackets.unwrap_or(('[', ']'));
                self.push(open.to_string(), ini::SECTION_START);
                self.push(key.to_string(), ini::IDENTIFIER);
                self.push(close.to_string(), ini::SECTION_END);
                self.push(self.syntax.line_terminator.clone(), ini::EOL);
                self.newline();
                for (child_key, child_value) in map {
                    self.emit_ini_entry(child_key, child_value)?;
                }
            }
            JsonValue::Array(items) => {
                for item in items {
                    self.emit_scalar_assignment(key, item);
                }
            }
            other => self.emit_scalar_assignment(key, other),
        }
        Ok(())
    }

    fn emit_scalar_assignment(&mut self, key: &str, value: &JsonValue) {
        let delim = self.syntax.delimiters.first().copied().unwrap_or('=');
        let raw = match value {
            JsonValue::Null => String::new(),
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.push(key.to_string(), ini::IDENTIFIER);
        self.push(delim.to_string(), ini::ASSIGNMENT);
        self.push(raw, ini::IDENTIFIER);
        self.push(self.syntax.line_terminator.clone(), ini::EOL);
        self.newline();
    }

    fn eof_kind(&self) -> TokenType {
        match self.format {
            Format::Csv => csv::EOF,
            Format::Ini => ini::EOF,
        }
    }
}

impl Lexer for JsonLexer {
    /// No-op: this lexer is driven by [`JsonLexer::load_csv`]/
    /// [`JsonLexer::load_ini`] rather than by raw text chunks.
    fn process(&mut self, _chunk: &str) -> Result<()> {
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.state.ended {
            self.state.push(Token::eof(self.eof_kind(), self.state.line, self.state.column));
            self.state.ended = true;
        }
        Ok(())
    }

    fn processed(&self) -> usize {
        self.state.processed
    }

    fn line(&self) -> u32 {
        self.state.line
    }

    fn position(&self) -> u32 {
        self.state.column
    }

    fn can_process(&self) -> bool {
        self.state.can_process()
    }

    fn queue(&self) -> &std::collections::VecDeque<Token> {
        &self.state.queue
    }

    fn next(&mut self) -> Token {
        self.state.queue.pop_front().unwrap_or_else(|| Token::eof(self.eof_kind(), self.state.line, self.state.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::csv::rfc4180;
    use crate::syntax::ini::unix;
    use serde_json::json;

    #[test]
    fn load_csv_emits_header_row_then_one_row_per_record() {
        let syntax = rfc4180().unwrap();
        let mut lexer = JsonLexer::new(syntax);
        let records = vec![json!({"a": "1", "b": "2"})];
        let headers = lexer.load_csv(&records, None).unwrap();
        assert_eq!(headers, vec!["a", "b"]);

        let mut values = Vec::new();
        while lexer.has_tokens() {
            values.push(lexer.next().value);
        }
        assert_eq!(values, vec!["a", ",", "b", "\r\n", "1", ",", "2", "\r\n", ""]);
    }

    #[test]
    fn load_ini_emits_nested_section_and_assignment_tokens() {
        let syntax = unix().unwrap();
        let mut lexer = JsonLexer::new(syntax);
        let root = json!({"a": {"k": "v"}});
        lexer.load_ini(&root).unwrap();
        let kinds: Vec<_> = lexer.queue().iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&ini::SECTION_START));
        assert!(kinds.contains(&ini::ASSIGNMENT));
    }
}
