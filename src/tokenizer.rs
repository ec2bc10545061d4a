//! Tokenizer factory: the lexer sub-component responsible for
//! assembling multi-character tokens across input chunks (spec.md §4.3,
//! glossary "Tokenizer factory").
//!
//! A lexer holds at most one "last saved tokenizer" at a time. While it
//! is present, incoming characters feed into it instead of the lexer's
//! normal single-character classification. The tokenizer reports back
//! one of three outcomes every time it is fed a character.

use crate::token::{Token, TokenType};

/// Result of feeding one character into a [`Tokenizer`].
pub enum TokenizerOutcome {
    /// The character extends the in-progress token; keep going.
    Continue,
    /// The token is complete; the lexer resets its "last saved
    /// tokenizer" pointer and enqueues the produced token. The fed
    /// character was consumed as part of the token.
    Complete(Token),
    /// The token is complete, but the fed character was *not* part of
    /// it (e.g. a variable-width unicode escape that hit a non-digit
    /// before `max_digits`). The lexer enqueues the token and then
    /// feeds `char` again through its normal classification path.
    CompleteAndReplay(Token, char),
    /// The match was broken. The characters consumed so far (including
    /// the one that broke the match) are returned so the lexer can
    /// reclassify them as single-character tokens of their default
    /// types, per spec.md's "spills the partial content back".
    Abort(Vec<char>),
}

/// A multi-character-token assembler.
pub trait Tokenizer {
    fn append(&mut self, ch: char) -> TokenizerOutcome;

    /// Called from `Lexer::end()`: best-effort completion of whatever
    /// has been buffered so far, or `None` if there is nothing usable.
    fn generate(&mut self) -> Option<Token>;

    /// Abandons the in-progress token, returning its buffered content
    /// for the caller to reclassify.
    fn cancel(&mut self) -> Vec<char>;
}

/// Matches a fixed target string character-by-character. Used for line
/// terminators (`\r\n`, `\r`, `\n`, or any configured multi-char
/// terminator) — this is the mechanism by which a `\r` that arrives at
/// the end of one chunk is held until the next chunk's first character
/// decides whether it was standalone or the start of `\r\n`.
pub struct LiteralTokenizer {
    target: Vec<char>,
    matched: Vec<char>,
    kind: TokenType,
    line: u32,
    start_pos: u32,
}

impl LiteralTokenizer {
    pub fn new(target: &str, kind: TokenType, line: u32, start_pos: u32) -> Self {
        LiteralTokenizer {
            target: target.chars().collect(),
            matched: Vec::new(),
            kind,
            line,
            start_pos,
        }
    }
}

impl Tokenizer for LiteralTokenizer {
    fn append(&mut self, ch: char) -> TokenizerOutcome {
        let next_idx = self.matched.len();
        if next_idx < self.target.len() && self.target[next_idx] == ch {
            self.matched.push(ch);
            if self.matched.len() == self.target.len() {
                let text: String = self.matched.iter().collect();
                TokenizerOutcome::Complete(Token::new(text, self.kind, self.line, self.line, self.start_pos))
            } else {
                TokenizerOutcome::Continue
            }
        } else {
            let mut spilled = self.matched.clone();
            spilled.push(ch);
            TokenizerOutcome::Abort(spilled)
        }
    }

    fn generate(&mut self) -> Option<Token> {
        if self.matched.is_empty() {
            None
        } else {
            let text: String = self.matched.iter().collect();
            Some(Token::new(text, self.kind, self.line, self.line, self.start_pos))
        }
    }

    fn cancel(&mut self) -> Vec<char> {
        std::mem::take(&mut self.matched)
    }
}

/// Accumulates the digits of a unicode-escape sequence up to a prefix's
/// `max_digits`, greedily stopping as soon as that many digits have
/// been seen or a non-digit-of-`radix` character arrives (spec.md §4.3
/// "unicode escapes greedily consuming up to the prefix's max hex
/// digits").
pub struct UnicodeEscapeTokenizer {
    prefix_char: char,
    digits: Vec<char>,
    min_digits: u8,
    max_digits: u8,
    radix: u32,
    kind: TokenType,
    line: u32,
    start_pos: u32,
}

impl UnicodeEscapeTokenizer {
    pub fn new(prefix_char: char, min_digits: u8, max_digits: u8, radix: u32, kind: TokenType, line: u32, start_pos: u32) -> Self {
        UnicodeEscapeTokenizer {
            prefix_char,
            digits: Vec::new(),
            min_digits,
            max_digits,
            radix,
            kind,
            line,
            start_pos,
        }
    }

    fn text(&self) -> String {
        let mut out = String::new();
        out.push(self.prefix_char);
        out.extend(self.digits.iter());
        out
    }
}

impl Tokenizer for UnicodeEscapeTokenizer {
    fn append(&mut self, ch: char) -> TokenizerOutcome {
        if ch.is_digit(self.radix) && self.digits.len() < self.max_digits as usize {
            self.digits.push(ch);
            if self.digits.len() == self.max_digits as usize {
                let text = self.text();
                TokenizerOutcome::Complete(Token::new(text, self.kind, self.line, self.line, self.start_pos))
            } else {
                TokenizerOutcome::Continue
            }
        } else if self.digits.len() >= self.min_digits as usize {
            // Enough digits collected and this character doesn't extend
            // the escape; complete the token and hand `ch` back so the
            // lexer reprocesses it through normal classification.
            let text = self.text();
            let token = Token::new(text, self.kind, self.line, self.line, self.start_pos);
            TokenizerOutcome::CompleteAndReplay(token, ch)
        } else {
            let mut spilled = vec![self.prefix_char];
            spilled.extend(self.digits.iter());
            spilled.push(ch);
            TokenizerOutcome::Abort(spilled)
        }
    }

    fn generate(&mut self) -> Option<Token> {
        if self.digits.len() >= self.min_digits as usize {
            Some(Token::new(self.text(), self.kind, self.line, self.line, self.start_pos))
        } else {
            None
        }
    }

    fn cancel(&mut self) -> Vec<char> {
        let mut out = vec![self.prefix_char];
        out.extend(self.digits.drain(..));
        out
    }
}

/// Accumulates a run of characters that are not individually special
/// (IDENTIFIER runs in INI, the fallback "plain text" tokenizer spec.md
/// §4.3 mentions alongside integers-in-radix). Completion is driven by
/// the lexer calling [`Tokenizer::generate`] once it sees a character
/// that ends the run, rather than by `append` itself ever returning
/// `Complete` — a plain run has no terminator character of its own.
pub struct PlainRunTokenizer {
    buffer: Vec<char>,
    kind: TokenType,
    line: u32,
    start_pos: u32,
}

impl PlainRunTokenizer {
    pub fn new(kind: TokenType, line: u32, start_pos: u32) -> Self {
        PlainRunTokenizer {
            buffer: Vec::new(),
            kind,
            line,
            start_pos,
        }
    }
}

impl Tokenizer for PlainRunTokenizer {
    fn append(&mut self, ch: char) -> TokenizerOutcome {
        self.buffer.push(ch);
        TokenizerOutcome::Continue
    }

    fn generate(&mut self) -> Option<Token> {
        if self.buffer.is_empty() {
            None
        } else {
            let text: String = self.buffer.iter().collect();
            Some(Token::new(text, self.kind, self.line, self.line, self.start_pos))
        }
    }

    fn cancel(&mut self) -> Vec<char> {
        std::mem::take(&mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::ini::EOL;

    #[test]
    fn literal_tokenizer_completes_on_full_match() {
        let mut t = LiteralTokenizer::new("\r\n", EOL, 1, 0);
        assert!(matches!(t.append('\r'), TokenizerOutcome::Continue));
        match t.append('\n') {
            TokenizerOutcome::Complete(tok) => assert_eq!(tok.value, "\r\n"),
            _ => panic!("expected completion"),
        }
    }

    #[test]
    fn literal_tokenizer_aborts_on_mismatch_and_spills_consumed_chars() {
        let mut t = LiteralTokenizer::new("\r\n", EOL, 1, 0);
        assert!(matches!(t.append('\r'), TokenizerOutcome::Continue));
        match t.append('x') {
            TokenizerOutcome::Abort(spilled) => assert_eq!(spilled, vec!['\r', 'x']),
            _ => panic!("expected abort"),
        }
    }

    #[test]
    fn unicode_escape_tokenizer_stops_at_max_digits() {
        let mut t = UnicodeEscapeTokenizer::new('u', 4, 4, 16, EOL, 1, 0);
        t.append('0');
        t.append('0');
        t.append('2');
        match t.append('0') {
            TokenizerOutcome::Complete(tok) => assert_eq!(tok.value, "u0020"),
            _ => panic!("expected completion at max digits"),
        }
    }

    #[test]
    fn unicode_escape_tokenizer_completes_early_and_replays_terminator() {
        let mut t = UnicodeEscapeTokenizer::new('x', 2, 4, 16, EOL, 1, 0);
        t.append('4');
        match t.append('1') {
            TokenizerOutcome::Continue => {}
            _ => panic!("expected continue after min_digits but before max_digits"),
        }
        match t.append(';') {
            TokenizerOutcome::CompleteAndReplay(tok, replayed) => {
                assert_eq!(tok.value, "x41");
                assert_eq!(replayed, ';');
            }
            _ => panic!("expected complete-and-replay"),
        }
    }

    #[test]
    fn plain_run_tokenizer_accumulates_until_generate() {
        let mut t = PlainRunTokenizer::new(EOL, 1, 0);
        t.append('a');
        t.append('b');
        t.append('c');
        let tok = t.generate().unwrap();
        assert_eq!(tok.value, "abc");
    }
}
