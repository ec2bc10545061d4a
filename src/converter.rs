//! Streaming driver tying a [`Lexer`] to a Pratt command table across
//! chunk boundaries (spec.md §4.8).
//!
//! `transform`/`flush` are the only two operations a caller needs:
//! decode a chunk, hand back whatever complete top-level expressions it
//! produced, then call `flush` once at end of input for the tail. CSV
//! records are always complete the moment an `EOL` token lands in the
//! lexer's queue, so `transform` parses them as it goes. INI top-level
//! items don't share that property — a `Section`'s body is only known
//! to be finished once the *next* `SECTION_START` (or `EOF`) has been
//! seen, which can be arbitrarily far ahead — so `transform` defers all
//! INI parsing to `flush`, which drains the whole remaining document in
//! one pass via [`crate::ini_commands::parse_document`]. This is an
//! intentional simplification recorded in DESIGN.md: chunked CSV
//! streaming is exact, chunked INI streaming degrades to
//! buffer-then-parse, which is still correct, just not incremental.

use crate::ast::{CsvExpr, IniExpr};
use crate::csv_commands;
use crate::error::Result;
use crate::ini_commands;
use crate::lexer::Lexer;
use crate::params::Params;
use crate::parser::PrattParser;
use crate::syntax::Syntax;
use crate::token::csv;

/// Per-expression-type parsing strategy the converter is generic over.
pub trait Document: Sized {
    fn is_ready(lexer: &dyn Lexer) -> bool;
    fn parse_one(lexer: &mut dyn Lexer, syntax: &Syntax, params: &mut Params) -> Result<Option<Self>>;
}

impl Document for CsvExpr {
    fn is_ready(lexer: &dyn Lexer) -> bool {
        lexer.frequency(csv::EOL) >= 1
    }

    fn parse_one(lexer: &mut dyn Lexer, syntax: &Syntax, params: &mut Params) -> Result<Option<Self>> {
        let table = csv_commands::table();
        let mut parser = PrattParser::new(lexer, syntax, params, &table, csv::EOF);
        if parser.peek_kind() == csv::EOF {
            return Ok(None);
        }
        Ok(Some(parser.parse_expression(0)?))
    }
}

impl Document for IniExpr {
    fn is_ready(_lexer: &dyn Lexer) -> bool {
        false
    }

    fn parse_one(lexer: &mut dyn Lexer, syntax: &Syntax, params: &mut Params) -> Result<Option<Self>> {
        use crate::token::ini;
        if lexer.queue().iter().all(|t| t.kind == ini::EOF) {
            return Ok(None);
        }
        Ok(Some(ini_commands::parse_document(lexer, syntax, params)?))
    }
}

/// Wires a lexer, a `Syntax`, and a `Params` scratchpad together and
/// exposes the `transform`/`flush` pair spec.md §4.8 describes.
pub struct Converter<L: Lexer, E: Document> {
    lexer: L,
    syntax: Syntax,
    params: Params,
    _marker: std::marker::PhantomData<E>,
}

impl<L: Lexer, E: Document> Converter<L, E> {
    pub fn new(lexer: L, syntax: Syntax, params: Params) -> Self {
        Converter {
            lexer,
            syntax,
            params,
            _marker: std::marker::PhantomData,
        }
    }

    /// Feeds one chunk to the lexer and returns every top-level
    /// expression that became parseable as a result.
    pub fn transform(&mut self, chunk: &str) -> Result<Vec<E>> {
        self.lexer.process(chunk)?;
        let mut out = Vec::new();
        while E::is_ready(&self.lexer) {
            match E::parse_one(&mut self.lexer, &self.syntax, &mut self.params)? {
                Some(expr) => out.push(expr),
                None => break,
            }
        }
        Ok(out)
    }

    /// Ends the lexer and parses whatever remains.
    pub fn flush(&mut self) -> Result<Vec<E>> {
        self.lexer.end()?;
        let mut out = Vec::new();
        while let Some(expr) = E::parse_one(&mut self.lexer, &self.syntax, &mut self.params)? {
            out.push(expr);
        }
        Ok(out)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn into_params(self) -> Params {
        self.params
    }
}
