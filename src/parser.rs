//! Vaughn-Pratt precedence-climbing parser (spec.md §4.5).
//!
//! Generic over the expression type `E` so the same engine drives both
//! the CSV and INI command tables (`csv_commands.rs`, `ini_commands.rs`).
//! Reentrant by construction: all lookahead lives in this struct, not in
//! a module-level stack (spec.md §9 "Global mutable stack in the Pratt
//! parser... re-architect as a parser-owned field").

use crate::commands::CommandTable;
use crate::error::{Result, SynformError};
use crate::lexer::Lexer;
use crate::params::Params;
use crate::syntax::Syntax;
use crate::token::{Token, TokenType};

pub struct PrattParser<'a, E> {
    lexer: &'a mut dyn Lexer,
    syntax: &'a Syntax,
    pub params: &'a mut Params,
    commands: &'a CommandTable<E>,
    eof_kind: TokenType,
}

impl<'a, E> PrattParser<'a, E> {
    pub fn new(
        lexer: &'a mut dyn Lexer,
        syntax: &'a Syntax,
        params: &'a mut Params,
        commands: &'a CommandTable<E>,
        eof_kind: TokenType,
    ) -> Self {
        PrattParser {
            lexer,
            syntax,
            params,
            commands,
            eof_kind,
        }
    }

    pub fn syntax(&self) -> &'a Syntax {
        self.syntax
    }

    /// Pops the next token from the lexer's queue, or its `EOF`
    /// sentinel when the queue is drained (spec.md §4.3 `next()`).
    pub fn next_token(&mut self) -> Token {
        self.lexer.next()
    }

    /// The type of the next queued token without consuming it, falling
    /// back to the parser's `EOF` kind when nothing remains — this is
    /// what guarantees every Pratt loop below terminates (spec.md §4.5
    /// "Tie-breaks... EOF's minimum precedence guarantees termination").
    pub fn peek_kind(&self) -> TokenType {
        self.lexer.queue().front().map(|t| t.kind).unwrap_or(self.eof_kind)
    }

    pub fn has_tokens(&self) -> bool {
        self.lexer.has_tokens()
    }

    /// The five-step algorithm from spec.md §4.5: pop a token, run its
    /// prefix command, then keep folding in infix commands as long as
    /// the next token's precedence exceeds `min_precedence`.
    pub fn parse_expression(&mut self, min_precedence: i32) -> Result<E> {
        let token = self.next_token();
        let prefix = self.commands.prefix(token.kind).ok_or_else(|| {
            SynformError::syntax(
                format!("no prefix command registered for token type '{}'", token.kind),
                token.line_start,
                token.start_pos,
                Some(&token.value),
            )
        })?;
        let mut left = prefix(self, token)?;

        loop {
            let next_kind = self.peek_kind();
            if next_kind.precedence <= min_precedence {
                break;
            }
            let Some(infix) = self.commands.infix(next_kind) else {
                break;
            };
            let token = self.next_token();
            left = infix(self, left, token)?;
        }

        Ok(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CsvExpr;
    use crate::csv_commands;
    use crate::csv_lexer::CsvTextLexer;
    use crate::syntax::csv::rfc4180;
    use crate::token::csv;

    #[test]
    fn parses_one_record_building_right_leaning_separator_chain() {
        let syntax = rfc4180().unwrap();
        let mut lexer = CsvTextLexer::new(syntax.clone());
        lexer.process("a,b,c\r\n").unwrap();
        lexer.end().unwrap();

        let mut params = Params::new();
        let table = csv_commands::table();
        let mut parser = PrattParser::new(&mut lexer, &syntax, &mut params, &table, csv::EOF);
        let expr = parser.parse_expression(0).unwrap();
        match expr {
            CsvExpr::Record { body, eol } => {
                assert_eq!(eol, "\r\n");
                assert_eq!(body.cells(), vec!["a", "b", "c"]);
            }
            other => panic!("expected Record, got {other:?}"),
        }
    }
}
