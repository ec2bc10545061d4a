//! Streaming INI/conf/properties/winapi lexer (spec.md §4.3 "INI text
//! lexer state machine").
//!
//! Unlike the CSV lexer, most INI token types are single characters
//! classified eagerly. The two exceptions that need cross-chunk state
//! are the line terminator (handled the same way as in
//! [`crate::csv_lexer`]) and escape sequences, which are two tokens
//! (`ESCAPE` then `ESCAPED`) with unicode escapes greedily consuming up
//! to the configured prefix's `max_digits`.

use std::collections::VecDeque;

use crate::error::Result;
use crate::lexer::{Lexer, LexerState};
use crate::syntax::{QuoteSpec, Syntax};
use crate::token::{ini, Token, TokenType};
use crate::tokenizer::{LiteralTokenizer, Tokenizer, TokenizerOutcome, UnicodeEscapeTokenizer};

#[derive(PartialEq, Eq, Clone, Copy)]
enum QuoteKind {
    Single,
    Double,
}

enum EscapeState {
    None,
    JustSawEscapeChar,
    ConsumingUnicode(UnicodeEscapeTokenizer),
}

pub struct IniTextLexer {
    syntax: Syntax,
    state: LexerState,
    eol_tokenizer: Option<LiteralTokenizer>,
    run_buf: String,
    run_is_whitespace: bool,
    quote_open: Option<QuoteKind>,
    comment_buf: Option<String>,
    escape_state: EscapeState,
    replay: VecDeque<char>,
}

impl IniTextLexer {
    pub fn new(syntax: Syntax) -> Self {
        IniTextLexer {
            syntax,
            state: LexerState::new(),
            eol_tokenizer: None,
            run_buf: String::new(),
            run_is_whitespace: false,
            quote_open: None,
            comment_buf: None,
            escape_state: EscapeState::None,
            replay: VecDeque::new(),
        }
    }

    fn flush_run(&mut self) {
        if self.run_buf.is_empty() {
            return;
        }
        let kind = if self.run_is_whitespace { ini::WHITESPACE } else { ini::IDENTIFIER };
        let line = self.state.line;
        let pos = self.state.column.saturating_sub(self.run_buf.chars().count() as u32);
        let value = std::mem::take(&mut self.run_buf);
        self.state.push(Token::new(value, kind, line, line, pos));
    }

    fn push_run_char(&mut self, ch: char, is_ws: bool) {
        if !self.run_buf.is_empty() && self.run_is_whitespace != is_ws {
            self.flush_run();
        }
        self.run_is_whitespace = is_ws;
        self.run_buf.push(ch);
    }

    fn emit_single(&mut self, kind: TokenType, ch: char) {
        self.flush_run();
        let line = self.state.line;
        let pos = self.state.column;
        self.state.push(Token::new(ch.to_string(), kind, line, line, pos));
    }

    fn quote_chars(&self) -> (Option<char>, Option<char>) {
        match &self.syntax.quote {
            QuoteSpec::Ini { single, double } => (*single, *double),
            _ => (None, None),
        }
    }

    fn handle_escape_char(&mut self, ch: char) -> bool {
        let escape = match &self.syntax.escape {
            Some(e) => e.clone(),
            None => return false,
        };
        match std::mem::replace(&mut self.escape_state, EscapeState::None) {
            EscapeState::None => {
                if ch == escape.escape_char {
                    self.flush_run();
                    self.emit_single(ini::ESCAPE, ch);
                    self.escape_state = EscapeState::JustSawEscapeChar;
                    true
                } else {
                    false
                }
            }
            EscapeState::JustSawEscapeChar => {
                if let Some(prefix) = escape.find_unicode_prefix(ch) {
                    let line = self.state.line;
                    let pos = self.state.column;
                    self.escape_state = EscapeState::ConsumingUnicode(UnicodeEscapeTokenizer::new(
                        prefix.prefix_char,
                        prefix.min_digits,
                        prefix.max_digits,
                        prefix.radix,
                        ini::ESCAPED,
                        line,
                        pos,
                    ));
                } else {
                    let line = self.state.line;
                    let pos = self.state.column;
                    self.state.push(Token::new(ch.to_string(), ini::ESCAPED, line, line, pos));
                }
                true
            }
            EscapeState::ConsumingUnicode(mut tok) => {
                match tok.append(ch) {
                    TokenizerOutcome::Continue => {
                        self.escape_state = EscapeState::ConsumingUnicode(tok);
                    }
                    TokenizerOutcome::Complete(t) => {
                        self.state.push(t);
                    }
                    TokenizerOutcome::CompleteAndReplay(t, replayed) => {
                        self.state.push(t);
                        self.replay.push_back(replayed);
                    }
                    TokenizerOutcome::Abort(spilled) => {
                        for c in spilled {
                            self.replay.push_back(c);
                        }
                    }
                }
                true
            }
        }
    }

    fn handle_char(&mut self, ch: char) {
        if let Some(tok) = self.eol_tokenizer.as_mut() {
            match tok.append(ch) {
                TokenizerOutcome::Continue => return,
                TokenizerOutcome::Complete(t) => {
                    self.eol_tokenizer = None;
                    self.flush_comment_if_any();
                    self.flush_run();
                    self.state.push(t);
                    return;
                }
                TokenizerOutcome::CompleteAndReplay(t, replayed) => {
                    self.eol_tokenizer = None;
                    self.flush_comment_if_any();
                    self.flush_run();
                    self.state.push(t);
                    self.replay.push_back(replayed);
                    return;
                }
                TokenizerOutcome::Abort(spilled) => {
                    self.eol_tokenizer = None;
                    for c in spilled {
                        self.replay.push_back(c);
                    }
                    return;
                }
            }
        }

        if matches!(self.escape_state, EscapeState::JustSawEscapeChar | EscapeState::ConsumingUnicode(_)) {
            self.handle_escape_char(ch);
            return;
        }

        if let Some(comment) = self.comment_buf.as_mut() {
            let eol = &self.syntax.line_terminator;
            if eol.chars().next() == Some(ch) {
                let mut t = LiteralTokenizer::new(eol, ini::EOL, self.state.line, self.state.column);
                match t.append(ch) {
                    TokenizerOutcome::Complete(eol_tok) => {
                        let line = self.state.line;
                        let value = std::mem::take(comment);
                        self.comment_buf = None;
                        self.state.push(Token::new(value, ini::COMMENT, line, line, 0));
                        self.state.push(eol_tok);
                    }
                    TokenizerOutcome::Continue => {
                        self.eol_tokenizer = Some(t);
                    }
                    _ => unreachable!("single-character append cannot abort"),
                }
            } else {
                comment.push(ch);
            }
            return;
        }

        if self.handle_escape_char(ch) {
            return;
        }

        let (single, double) = self.quote_chars();
        if Some(ch) == single {
            self.flush_run();
            match self.quote_open {
                Some(QuoteKind::Single) => {
                    self.quote_open = None;
                    self.emit_single(ini::QUOTE_END, ch);
                }
                _ => {
                    self.quote_open = Some(QuoteKind::Single);
                    self.emit_single(ini::QUOTE, ch);
                }
            }
            return;
        }
        if Some(ch) == double {
            self.flush_run();
            match self.quote_open {
                Some(QuoteKind::Double) => {
                    self.quote_open = None;
                    self.emit_single(ini::D_QUOTE_END, ch);
                }
                _ => {
                    self.quote_open = Some(QuoteKind::Double);
                    self.emit_single(ini::D_QUOTE, ch);
                }
            }
            return;
        }

        if self.syntax.comments.iter().any(|c| c.starter == ch) {
            self.flush_run();
            self.comment_buf = Some(String::new());
            return;
        }

        if let Some((open, close)) = self.syntax.section_brackets {
            if ch == open {
                self.emit_single(ini::SECTION_START, ch);
                return;
            }
            if ch == close {
                self.emit_single(ini::SECTION_END, ch);
                return;
            }
        }

        if let Some(op) = self.syntax.nesting.object_op {
            if ch == op {
                self.emit_single(ini::SUB_SECTION, ch);
                return;
            }
        }
        if let Some(op) = self.syntax.nesting.array_op {
            if ch == op {
                self.emit_single(ini::SUB_SECTION, ch);
                return;
            }
        }

        if self.syntax.delimiters.contains(&ch) {
            self.emit_single(ini::ASSIGNMENT, ch);
            return;
        }

        let eol = &self.syntax.line_terminator;
        if eol.chars().next() == Some(ch) {
            self.flush_run();
            let mut t = LiteralTokenizer::new(eol, ini::EOL, self.state.line, self.state.column);
            match t.append(ch) {
                TokenizerOutcome::Complete(eol_tok) => {
                    self.state.push(eol_tok);
                }
                TokenizerOutcome::Continue => {
                    self.eol_tokenizer = Some(t);
                }
                _ => unreachable!("single-character append cannot abort"),
            }
            return;
        }

        let is_ws = self.syntax.is_whitespace(ch);
        self.push_run_char(ch, is_ws);
    }

    fn flush_comment_if_any(&mut self) {
        if let Some(buf) = self.comment_buf.take() {
            if !buf.is_empty() {
                let line = self.state.line;
                self.state.push(Token::new(buf, ini::COMMENT, line, line, 0));
            }
        }
    }
}

impl Lexer for IniTextLexer {
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
                Some(tok) => {
                    self.flush_comment_if_any();
                    self.flush_run();
                    self.state.push(tok);
                }
                None => {
                    for c in t.cancel() {
                        self.run_buf.push(c);
                    }
                }
            }
        }
        self.flush_comment_if_any();
        self.flush_run();
        self.state.push(Token::eof(ini::EOF, self.state.line, self.state.column));
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
            .unwrap_or_else(|| Token::eof(ini::EOF, self.state.line, self.state.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ini::{unix, winapi};

    fn collect(lexer: &mut IniTextLexer) -> Vec<Token> {
        let mut out = Vec::new();
        while lexer.has_tokens() {
            out.push(lexer.next());
        }
        out
    }

    #[test]
    fn section_and_assignment_classify_eagerly() {
        let mut lexer = IniTextLexer::new(unix().unwrap());
        lexer.process("[a]\nk=v\n").unwrap();
        lexer.end().unwrap();
        let toks = collect(&mut lexer);
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&ini::SECTION_START));
        assert!(kinds.contains(&ini::SECTION_END));
        assert!(kinds.contains(&ini::ASSIGNMENT));
    }

    #[test]
    fn winapi_comment_is_not_inline() {
        let mut lexer = IniTextLexer::new(winapi().unwrap());
        lexer.process("; a comment\n").unwrap();
        lexer.end().unwrap();
        let toks = collect(&mut lexer);
        assert!(toks.iter().any(|t| t.kind == ini::COMMENT));
    }

    #[test]
    fn quote_toggles_between_open_and_close() {
        let mut lexer = IniTextLexer::new(unix().unwrap());
        lexer.process("k=\"v\"\n").unwrap();
        lexer.end().unwrap();
        let toks = collect(&mut lexer);
        let quote_kinds: Vec<_> = toks.iter().filter(|t| t.kind == ini::D_QUOTE || t.kind == ini::D_QUOTE_END).map(|t| t.kind).collect();
        assert_eq!(quote_kinds, vec![ini::D_QUOTE, ini::D_QUOTE_END]);
    }
}
