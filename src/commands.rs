//! Prefix/infix/postfix command registries for the Pratt parser (spec.md
//! §4.5, §9 "Command registries").
//!
//! Each table is a `Vec<(TokenType, Command)>` with last-insert-wins
//! semantics: re-registering a `TokenType` replaces its existing entry
//! in place rather than appending a shadow. A `HashMap` would give the
//! same externally-visible behavior; the teacher favors plain `Vec`s for
//! small, rarely-mutated collections elsewhere (e.g. `schema.rs`'s
//! column list), so this follows suit.

use crate::error::Result;
use crate::parser::PrattParser;
use crate::token::{Token, TokenType};

pub type PrefixCommand<E> = fn(&mut PrattParser<'_, E>, Token) -> Result<E>;
pub type InfixCommand<E> = fn(&mut PrattParser<'_, E>, E, Token) -> Result<E>;
pub type PostfixCommand<E> = fn(&mut PrattParser<'_, E>, E, Token) -> Result<E>;

pub struct CommandTable<E> {
    prefix: Vec<(TokenType, PrefixCommand<E>)>,
    infix: Vec<(TokenType, InfixCommand<E>)>,
    postfix: Vec<(TokenType, PostfixCommand<E>)>,
}

impl<E> CommandTable<E> {
    pub fn new() -> Self {
        CommandTable {
            prefix: Vec::new(),
            infix: Vec::new(),
            postfix: Vec::new(),
        }
    }

    pub fn register_prefix(&mut self, kind: TokenType, command: PrefixCommand<E>) {
        register(&mut self.prefix, kind, command);
    }

    pub fn register_infix(&mut self, kind: TokenType, command: InfixCommand<E>) {
        register(&mut self.infix, kind, command);
    }

    #[allow(dead_code)]
    pub fn register_postfix(&mut self, kind: TokenType, command: PostfixCommand<E>) {
        register(&mut self.postfix, kind, command);
    }

    pub fn prefix(&self, kind: TokenType) -> Option<PrefixCommand<E>> {
        lookup(&self.prefix, kind)
    }

    pub fn infix(&self, kind: TokenType) -> Option<InfixCommand<E>> {
        lookup(&self.infix, kind)
    }

    #[allow(dead_code)]
    pub fn postfix(&self, kind: TokenType) -> Option<PostfixCommand<E>> {
        lookup(&self.postfix, kind)
    }
}

impl<E> Default for CommandTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-registering a `TokenType` overwrites its existing slot so the
/// "last addition wins" tie-break (spec.md §4.5) holds regardless of how
/// many times a table is built up.
fn register<C>(table: &mut Vec<(TokenType, C)>, kind: TokenType, command: C) {
    if let Some(slot) = table.iter_mut().find(|(k, _)| k.id == kind.id) {
        slot.1 = command;
    } else {
        table.push((kind, command));
    }
}

fn lookup<C: Copy>(table: &[(TokenType, C)], kind: TokenType) -> Option<C> {
    table.iter().rev().find(|(k, _)| k.id == kind.id).map(|(_, c)| *c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CsvExpr;
    use crate::token::csv;

    fn dummy_prefix(_: &mut PrattParser<'_, CsvExpr>, _: Token) -> Result<CsvExpr> {
        Ok(CsvExpr::Field("first".into()))
    }

    fn dummy_prefix_2(_: &mut PrattParser<'_, CsvExpr>, _: Token) -> Result<CsvExpr> {
        Ok(CsvExpr::Field("second".into()))
    }

    #[test]
    fn re_registering_a_token_type_overwrites_in_place() {
        let mut table: CommandTable<CsvExpr> = CommandTable::new();
        table.register_prefix(csv::FIELD, dummy_prefix);
        table.register_prefix(csv::FIELD, dummy_prefix_2);
        assert_eq!(table.prefix.len(), 1);
    }

    #[test]
    fn lookup_returns_none_for_unregistered_token_type() {
        let table: CommandTable<CsvExpr> = CommandTable::new();
        assert!(table.prefix(csv::FIELD).is_none());
    }
}
