//! Streaming CSV/TSV/DSV lexer (spec.md §4.3 "CSV text lexer state
//! machine").
//!
//! Outside a quoted field the longest-prefix match against the
//! configured delimiters and line terminator wins; partial matches are
//! held in a [`LiteralTokenizer`] across `process()` calls so a chunk
//! boundary that splits `\r|\n` never produces a spurious token.
//! Quote parity (counted, not "open"/"close" tagged) decides whether
//! the current field is inside quotes, in which case delimiter and eol
//! characters are copied into the field literally.

use std::collections::VecDeque;

use crate::error::Result;
use crate::lexer::{Lexer, LexerState};
use crate::syntax::Syntax;
use crate::token::{csv, Token};
use crate::tokenizer::{LiteralTokenizer, Tokenizer, TokenizerOutcome};

pub struct CsvTextLexer {
    syntax: Syntax,
    state: LexerState,
    field_buf: String,
    quote_count: usize,
    eol_tokenizer: Option<LiteralTokenizer>,
    replay: VecDeque<char>,
}

impl CsvTextLexer {
    pub fn new(syntax: Syntax) -> Self {
        CsvTextLexer {
            syntax,
            state: LexerState::new(),
            field_buf: String::new(),
            quote_count: 0,
            eol_tokenizer: None,
            replay: VecDeque::new(),
        }
    }

    fn in_quotes(&self) -> bool {
        self.quote_count % 2 == 1
    }

    fn quote_char(&self) -> Option<char> {
        match &self.syntax.quote {
            crate::syntax::QuoteSpec::Csv { quote, .. } => Some(*quote),
            _ => None,
        }
    }

    fn flush_field(&mut self) -> Token {
        let line = self.state.line;
        let pos = self.state.column.saturating_sub(self.field_buf.chars().count() as u32);
        let value = std::mem::take(&mut self.field_buf);
        self.quote_count = 0;
        Token::new(value, csv::FIELD, line, line, pos)
    }

    fn emit_field_and(&mut self, sep_kind: crate::token::TokenType, sep_value: String) {
        let field_tok = self.flush_field();
        let line = self.state.line;
        let pos = self.state.column;
        self.state.push(field_tok);
        self.state.push(Token::new(sep_value, sep_kind, line, line, pos));
        if sep_kind == csv::EOL {
            self.field_buf.clear();
            self.quote_count = 0;
        }
    }

    fn handle_char(&mut self, ch: char) {
        if let Some(tok) = self.eol_tokenizer.as_mut() {
            match tok.append(ch) {
                TokenizerOutcome::Continue => {}
                TokenizerOutcome::Complete(eol_tok) => {
                    self.eol_tokenizer = None;
                    let field_tok = self.flush_field();
                    self.state.push(field_tok);
                    self.state.push(eol_tok);
                }
                TokenizerOutcome::CompleteAndReplay(eol_tok, replayed) => {
                    self.eol_tokenizer = None;
                    let field_tok = self.flush_field();
                    self.state.push(field_tok);
                    self.state.push(eol_tok);
                    self.replay.push_back(replayed);
                }
                TokenizerOutcome::Abort(spilled) => {
                    self.eol_tokenizer = None;
                    // Everything but the breaking character was already
                    // a confirmed partial match against the eol target
                    // (e.g. a lone `\r` before a CRLF terminator); it's
                    // literal field content now, not eol-candidate text.
                    // Only the breaking character itself needs to go
                    // through normal classification again, otherwise a
                    // `\r` that keeps getting followed by non-`\n`
                    // characters re-arms the eol tokenizer and aborts
                    // forever on the same input.
                    if let Some((last, prefix)) = spilled.split_last() {
                        self.field_buf.extend(prefix.iter());
                        self.replay.push_back(*last);
                    }
                }
            }
            return;
        }

        if self.in_quotes() {
            self.field_buf.push(ch);
            if Some(ch) == self.quote_char() {
                self.quote_count += 1;
            }
            return;
        }

        if Some(ch) == self.quote_char() {
            self.field_buf.push(ch);
            self.quote_count += 1;
            return;
        }

        if self.syntax.delimiters.contains(&ch) {
            self.emit_field_and(csv::SEPARATOR, ch.to_string());
            return;
        }

        let eol = &self.syntax.line_terminator;
        if eol.chars().next() == Some(ch) {
            let mut t = LiteralTokenizer::new(eol, csv::EOL, self.state.line, self.state.column);
            match t.append(ch) {
                TokenizerOutcome::Complete(eol_tok) => {
                    let field_tok = self.flush_field();
                    self.state.push(field_tok);
                    self.state.push(eol_tok);
                }
                TokenizerOutcome::Continue => {
                    self.eol_tokenizer = Some(t);
                }
                // single-char append can't Abort/CompleteAndReplay on its first character
                _ => unreachable!("single-character append cannot abort"),
            }
            return;
        }

        self.field_buf.push(ch);
    }
}

impl Lexer for CsvTextLexer {
    fn process(&mut self, chunk: &str) -> Result<()> {
        for ch in chunk.chars() {
            self.replay.push_back(ch);
            while let Some(c) = self.replay.pop_front() {
                self.state.advance(c);
                self.handle_char(c);
            }
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if let Some(mut t) = self.eol_tokenizer.take() {
            match t.generate() {
                Some(eol_tok) => {
                    let field_tok = self.flush_field();
                    self.state.push(field_tok);
                    self.state.push(eol_tok);
                }
                None => {
                    for c in t.cancel() {
                        self.field_buf.push(c);
                    }
                }
            }
        }
        if !self.field_buf.is_empty() || self.quote_count > 0 {
            let field_tok = self.flush_field();
            self.state.push(field_tok);
        }
        self.state.push(Token::eof(csv::EOF, self.state.line, self.state.column));
        self.state.ended = true;
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

    fn queue(&self) -> &VecDeque<Token> {
        &self.state.queue
    }

    fn next(&mut self) -> Token {
        self.state
            .queue
            .pop_front()
            .unwrap_or_else(|| Token::eof(csv::EOF, self.state.line, self.state.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::csv::rfc4180;

    fn collect(lexer: &mut CsvTextLexer) -> Vec<Token> {
        let mut out = Vec::new();
        while lexer.has_tokens() {
            out.push(lexer.next());
        }
        out
    }

    #[test]
    fn simple_row_emits_field_separator_field_eol() {
        let mut lexer = CsvTextLexer::new(rfc4180().unwrap());
        lexer.process("a,b\r\n").unwrap();
        lexer.end().unwrap();
        let toks = collect(&mut lexer);
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![csv::FIELD, csv::SEPARATOR, csv::FIELD, csv::EOL, csv::EOF]);
        assert_eq!(toks[0].value, "a");
        assert_eq!(toks[3].value, "\r\n");
    }

    #[test]
    fn chunk_boundary_splitting_crlf_produces_no_spurious_tokens() {
        let mut lexer = CsvTextLexer::new(rfc4180().unwrap());
        lexer.process("hello,wor").unwrap();
        lexer.process("ld\r\n").unwrap();
        lexer.end().unwrap();
        let toks = collect(&mut lexer);
        let values: Vec<_> = toks.iter().map(|t| t.value.clone()).collect();
        assert_eq!(values, vec!["hello", ",", "world", "\r\n", ""]);
    }

    #[test]
    fn quoted_field_treats_delimiter_and_eol_as_literal() {
        let mut lexer = CsvTextLexer::new(rfc4180().unwrap());
        lexer.process("\"a,b\nc\"\n").unwrap();
        lexer.end().unwrap();
        let toks = collect(&mut lexer);
        assert_eq!(toks[0].value, "\"a,b\nc\"");
        assert_eq!(toks[0].kind, csv::FIELD);
    }

    #[test]
    fn trailing_record_without_eol_is_still_emitted() {
        let mut lexer = CsvTextLexer::new(rfc4180().unwrap());
        lexer.process("a,b").unwrap();
        lexer.end().unwrap();
        let toks = collect(&mut lexer);
        assert_eq!(toks.last().unwrap().kind, csv::EOF);
        assert!(toks.iter().any(|t| t.kind == csv::FIELD && t.value == "b"));
    }
}
