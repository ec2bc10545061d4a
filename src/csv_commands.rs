//! CSV/TSV/DSV prefix and infix Pratt commands (spec.md §4.5).
//!
//! The lexer hands every raw field to prefix `FIELD` as one token,
//! quote markers included; unquoting, doubled-quote unescaping, and
//! trim-flag application all happen here rather than in the lexer.

use crate::ast::CsvExpr;
use crate::commands::CommandTable;
use crate::error::{Result, SynformError};
use crate::parser::PrattParser;
use crate::syntax::{QuoteSpec, Syntax};
use crate::token::{csv, Token};

/// Builds the CSV command table once; cheap enough to construct per
/// conversion (a handful of `Vec` pushes), matching how `Syntax` presets
/// are rebuilt rather than cached.
pub fn table() -> CommandTable<CsvExpr> {
    let mut table = CommandTable::new();
    table.register_prefix(csv::FIELD, prefix_field);
    table.register_infix(csv::SEPARATOR, infix_separator);
    table.register_infix(csv::EOL, infix_eol);
    table
}

fn quote_char(syntax: &Syntax) -> Option<char> {
    match &syntax.quote {
        QuoteSpec::Csv { quote, .. } => Some(*quote),
        _ => None,
    }
}

/// Strips a balanced pair of quote characters and unescapes doubled
/// quotes inside, or returns `None` if `raw` isn't quote-delimited.
fn unquote(raw: &str, quote: char) -> Option<String> {
    let mut chars = raw.chars();
    if chars.next()? != quote {
        return None;
    }
    let mut rest: Vec<char> = chars.collect();
    if rest.pop()? != quote {
        return None;
    }

    let mut out = String::with_capacity(rest.len());
    let mut iter = rest.into_iter().peekable();
    while let Some(ch) = iter.next() {
        if ch == quote && iter.peek() == Some(&quote) {
            iter.next();
            out.push(quote);
        } else {
            out.push(ch);
        }
    }
    Some(out)
}

fn trim(value: &str, syntax: &Syntax) -> String {
    match (syntax.trim_leading, syntax.trim_trailing) {
        (true, true) => value.trim_matches(|c| syntax.is_whitespace(c)).to_string(),
        (true, false) => value.trim_start_matches(|c| syntax.is_whitespace(c)).to_string(),
        (false, true) => value.trim_end_matches(|c| syntax.is_whitespace(c)).to_string(),
        (false, false) => value.to_string(),
    }
}

fn prefix_field(parser: &mut PrattParser<'_, CsvExpr>, token: Token) -> Result<CsvExpr> {
    parser.params.field_count += 1;
    let syntax = parser.syntax();

    if let Some(quote) = quote_char(syntax) {
        if token.value.chars().count() >= 2 {
            if let Some(unescaped) = unquote(&token.value, quote) {
                return Ok(CsvExpr::Quoted {
                    open: quote.to_string(),
                    field: Box::new(CsvExpr::Field(unescaped)),
                    close: quote.to_string(),
                });
            }
        }
    }

    Ok(CsvExpr::Field(trim(&token.value, syntax)))
}

fn infix_separator(parser: &mut PrattParser<'_, CsvExpr>, left: CsvExpr, token: Token) -> Result<CsvExpr> {
    let right = parser.parse_expression(token.kind.precedence - 1)?;
    Ok(CsvExpr::Separator {
        left: Box::new(left),
        sep: token.value,
        right: Box::new(right),
    })
}

fn infix_eol(parser: &mut PrattParser<'_, CsvExpr>, left: CsvExpr, token: Token) -> Result<CsvExpr> {
    let syntax = parser.syntax();
    if syntax.enforce_symmetry {
        if let Some(header) = parser.params.header() {
            if header.len() != parser.params.field_count {
                return Err(SynformError::parse(
                    format!(
                        "row has {} field(s), expected {} to match the header",
                        parser.params.field_count,
                        header.len()
                    ),
                    token.line_start,
                    token.start_pos,
                ));
            }
        }
    }
    parser.params.reset_row_counters();
    Ok(CsvExpr::Record {
        body: Box::new(left),
        eol: token.value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_lexer::CsvTextLexer;
    use crate::lexer::Lexer;
    use crate::params::Params;
    use crate::syntax::csv::rfc4180;
    use crate::token::csv::EOF;

    fn parse_one(input: &str, syntax: &Syntax, params: &mut Params) -> CsvExpr {
        let mut lexer = CsvTextLexer::new(syntax.clone());
        lexer.process(input).unwrap();
        lexer.end().unwrap();
        let table = table();
        let mut parser = PrattParser::new(&mut lexer, syntax, params, &table, EOF);
        parser.parse_expression(0).unwrap()
    }

    #[test]
    fn unescapes_doubled_quotes_inside_a_quoted_field() {
        let syntax = rfc4180().unwrap();
        let mut params = Params::new();
        let expr = parse_one("a,\"wo\"\"rld\"\r\n", &syntax, &mut params);
        assert_eq!(expr.cells(), vec!["a", "wo\"rld"]);
    }

    #[test]
    fn symmetry_violation_is_rejected_against_known_header() {
        let syntax = rfc4180().unwrap();
        let mut params = Params::with_header(vec!["a".into(), "b".into(), "c".into()]);
        let mut lexer = CsvTextLexer::new(syntax.clone());
        lexer.process("1,2\r\n").unwrap();
        lexer.end().unwrap();
        let table = table();
        let mut parser = PrattParser::new(&mut lexer, &syntax, &mut params, &table, EOF);
        assert!(parser.parse_expression(0).is_err());
    }

    #[test]
    fn row_with_matching_header_length_parses_to_record() {
        let syntax = rfc4180().unwrap();
        let mut params = Params::with_header(vec!["a".into(), "b".into()]);
        let expr = parse_one("1,2\r\n", &syntax, &mut params);
        match expr {
            CsvExpr::Record { eol, .. } => assert_eq!(eol, "\r\n"),
            other => panic!("expected Record, got {other:?}"),
        }
        assert_eq!(params.field_count, 0);
        assert_eq!(params.row_count, 1);
    }
}
