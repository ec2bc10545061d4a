//! Driver-facing API (spec.md §6): the narrow surface an external
//! caller — the CLI in `cli.rs`, or any other embedder — uses to run
//! one whole conversion without touching lexer/parser/formatter
//! plumbing directly.
//!
//! Each function composes exactly the pieces spec.md §2 lists in
//! dependency order: build a `Syntax`, drive a lexer through a
//! `Converter`, append every produced expression into the right
//! formatter, then hand back the formatter's `data()`. The streaming
//! chunk-by-chunk contract (`Converter::transform`/`flush`) still
//! applies underneath; these entry points simply feed the whole input
//! as one chunk, which is the common case for a CLI invocation that
//! already has the full file in memory.

use serde_json::Value as JsonValue;

use crate::csv_formatter::{CsvFileFormat, CsvJsonFormat, CsvStringFormat};
use crate::csv_lexer::CsvTextLexer;
use crate::error::{Result, SynformError};
use crate::formatter::Formatter;
use crate::ini_formatter::{IniFileFormat, IniJsonFormat, IniStringFormat};
use crate::ini_lexer::IniTextLexer;
use crate::json_lexer::JsonLexer;
use crate::params::Params;
use crate::syntax::Syntax;

/// How the header row is supplied for a CSV → JSON conversion: either
/// read from the input's own first record, or provided up front by the
/// caller (spec.md §3 `Params.header`, "fields set at most once").
pub enum HeaderSource {
    FirstRow,
    Explicit(Vec<String>),
}

/// CSV/TSV text → JSON value array, one object per data row.
///
/// Drives the lexer and Pratt parser directly rather than through
/// [`Converter`] so the header can be assigned from the first parsed
/// record *before* the remaining rows are parsed — `enforce_symmetry`
/// only fires once `params.header()` is `Some`, so header assignment
/// must happen between records, not after the whole input has been
/// consumed (spec.md §8 "every Record contains exactly header.len Field
/// leaves").
pub fn csv_text_to_json(input: &str, syntax: &Syntax, header: HeaderSource) -> Result<Vec<JsonValue>> {
    let mut params = match header {
        HeaderSource::FirstRow => Params::new(),
        HeaderSource::Explicit(cols) => Params::with_header(cols),
    };
    let mut lexer = CsvTextLexer::new(syntax.clone());
    crate::lexer::Lexer::process(&mut lexer, input)?;
    crate::lexer::Lexer::end(&mut lexer)?;

    let table = crate::csv_commands::table();
    let mut formatter = CsvJsonFormat::new();
    let mut first_row = true;
    while crate::lexer::Lexer::has_tokens(&lexer) {
        let mut parser = crate::parser::PrattParser::new(&mut lexer, syntax, &mut params, &table, crate::token::csv::EOF);
        if parser.peek_kind() == crate::token::csv::EOF {
            break;
        }
        let expr = parser.parse_expression(0)?;
        if first_row {
            first_row = false;
            if params.header().is_none() {
                params.assign_header(expr.cells().into_iter().map(str::to_string).collect())?;
                continue;
            }
        }
        formatter.append(&expr, syntax, &mut params)?;
    }
    if first_row && params.header().is_none() {
        return Err(SynformError::data("CSV input is empty; no header row to read"));
    }
    Ok(formatter.into_rows())
}

/// JSON value array → CSV/TSV text, deriving (or reusing) the header
/// via spec.md §4.6 phase 1/phase 2.
pub fn json_to_csv_text(records: &[JsonValue], syntax: &Syntax, header: HeaderSource, headerless: bool) -> Result<String> {
    let explicit = match header {
        HeaderSource::Explicit(cols) => Some(cols),
        HeaderSource::FirstRow => None,
    };
    let mut lexer = JsonLexer::new(syntax.clone());
    let headers = lexer.load_csv(records, explicit)?;

    let mut params = if headerless { Params::new().headerless() } else { Params::with_header(headers) };
    let table = crate::csv_commands::table();
    let mut formatter = CsvStringFormat::new();

    // `JsonLexer::load_csv` always emits the derived header row first
    // (it needs it to order every data row's cells) regardless of
    // `headerless`; the formatter decides on its own whether to
    // *write* a header from `params.header()` (spec.md §9 Open
    // Question (a)), so that synthetic first record is always skipped
    // here rather than appended as data.
    let mut skip_first = true;
    while crate::lexer::Lexer::has_tokens(&lexer) {
        let mut parser = crate::parser::PrattParser::new(&mut lexer, syntax, &mut params, &table, crate::token::csv::EOF);
        if parser.peek_kind() == crate::token::csv::EOF {
            break;
        }
        let expr = parser.parse_expression(0)?;
        if skip_first {
            skip_first = false;
            continue;
        }
        formatter.append(&expr, syntax, &mut params)?;
    }
    Ok(formatter.data().clone())
}

/// INI text → JSON value (a nested object, spec.md §4.7 `IniJsonFormat`).
pub fn ini_text_to_json(input: &str, syntax: &Syntax) -> Result<JsonValue> {
    let mut lexer = IniTextLexer::new(syntax.clone());
    crate::lexer::Lexer::process(&mut lexer, input)?;
    crate::lexer::Lexer::end(&mut lexer)?;
    let mut params = Params::new();
    let root = crate::ini_commands::parse_document(&mut lexer, syntax, &mut params)?;

    let mut formatter = IniJsonFormat::new();
    formatter.append(&root, syntax, &mut params)?;
    Ok(formatter.into_value())
}

/// JSON value → INI text (spec.md §4.3 "JSON lexer" INI direction).
pub fn json_to_ini_text(value: &JsonValue, syntax: &Syntax) -> Result<String> {
    let mut lexer = JsonLexer::new(syntax.clone());
    lexer.load_ini(value)?;
    let mut params = Params::new();
    let root = crate::ini_commands::parse_document(&mut lexer, syntax, &mut params)?;

    let mut formatter = IniStringFormat::new();
    formatter.append(&root, syntax, &mut params)?;
    Ok(formatter.data().clone())
}

/// CSV/TSV text → a byte sink, re-serialized under a (possibly
/// different) target `Syntax` — the "file" formatter counterpart of
/// [`csv_text_to_json`], used when the CLI's `--to` format is CSV
/// itself (dialect conversion rather than a format change).
pub fn csv_json_to_file<W: std::io::Write>(records: &[JsonValue], syntax: &Syntax, header: HeaderSource, headerless: bool, sink: W) -> Result<()> {
    let explicit = match header {
        HeaderSource::Explicit(cols) => Some(cols),
        HeaderSource::FirstRow => None,
    };
    let mut lexer = JsonLexer::new(syntax.clone());
    let headers = lexer.load_csv(records, explicit)?;
    let mut params = if headerless { Params::new().headerless() } else { Params::with_header(headers) };
    let table = crate::csv_commands::table();
    let mut formatter = CsvFileFormat::new(sink);

    let mut skip_first = true;
    while crate::lexer::Lexer::has_tokens(&lexer) {
        let mut parser = crate::parser::PrattParser::new(&mut lexer, syntax, &mut params, &table, crate::token::csv::EOF);
        if parser.peek_kind() == crate::token::csv::EOF {
            break;
        }
        let expr = parser.parse_expression(0)?;
        if skip_first {
            skip_first = false;
            continue;
        }
        formatter.append(&expr, syntax, &mut params)?;
    }
    Ok(())
}

/// JSON value → an INI byte sink under `syntax` (file-format counterpart
/// of [`json_to_ini_text`]).
pub fn json_to_ini_file<W: std::io::Write>(value: &JsonValue, syntax: &Syntax, sink: W) -> Result<()> {
    let mut lexer = JsonLexer::new(syntax.clone());
    lexer.load_ini(value)?;
    let mut params = Params::new();
    let root = crate::ini_commands::parse_document(&mut lexer, syntax, &mut params)?;
    let mut formatter = IniFileFormat::new(sink);
    formatter.append(&root, syntax, &mut params)
}

/// Re-expresses an `IniExpr` root across dialects isn't needed directly
/// by the CLI today (INI → INI dialect conversion goes text → JSON →
/// text, same as CSV), but `ini_text_to_ini_text` is provided for
/// embedders that want a single call without an intermediate
/// `serde_json::Value`.
pub fn ini_text_to_ini_text(input: &str, from: &Syntax, to: &Syntax) -> Result<String> {
    let value = ini_text_to_json(input, from)?;
    json_to_ini_text(&value, to)
}

/// Same shortcut for CSV → CSV dialect conversion (e.g. CSV → TSV).
pub fn csv_text_to_csv_text(input: &str, from: &Syntax, to: &Syntax, header: HeaderSource, headerless: bool) -> Result<String> {
    let header_for_read = match &header {
        HeaderSource::Explicit(cols) => HeaderSource::Explicit(cols.clone()),
        HeaderSource::FirstRow => HeaderSource::FirstRow,
    };
    let rows = csv_text_to_json(input, from, header_for_read)?;
    json_to_csv_text(&rows, to, header, headerless)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::csv::rfc4180;
    use crate::syntax::ini::{unix, winapi};
    use serde_json::json;

    #[test]
    fn csv_text_round_trips_through_json_with_first_row_header() {
        let syntax = rfc4180().unwrap();
        let input = "a,b,c\r\nhello,\"wo\"\"rld\",\r\n1,\"two, fields\",3\r\n";
        let rows = csv_text_to_json(input, &syntax, HeaderSource::FirstRow).unwrap();
        assert_eq!(
            rows,
            vec![
                json!({"a": "hello", "b": "wo\"rld", "c": null}),
                json!({"a": "1", "b": "two, fields", "c": "3"}),
            ]
        );
    }

    #[test]
    fn json_to_csv_text_writes_header_once_then_one_row_per_record() {
        let syntax = rfc4180().unwrap();
        let rows = vec![json!({"a": "x", "b": "y"})];
        let text = json_to_csv_text(&rows, &syntax, HeaderSource::FirstRow, false).unwrap();
        assert_eq!(text, "a,b\r\nx,y\r\n");
    }

    #[test]
    fn json_to_csv_text_omits_header_when_headerless() {
        let syntax = rfc4180().unwrap();
        let rows = vec![json!({"a": "x"})];
        let text = json_to_csv_text(&rows, &syntax, HeaderSource::FirstRow, true).unwrap();
        assert_eq!(text, "x\r\n");
    }

    #[test]
    fn ini_unix_round_trips_relative_nesting_through_json() {
        let syntax = unix().unwrap();
        let input = "[a.b]\nk = v\n[.c]\nk2=v2\n";
        let value = ini_text_to_json(input, &syntax).unwrap();
        assert_eq!(value, json!({"a": {"b": {"k": "v", "c": {"k2": "v2"}}}}));
    }

    #[test]
    fn ini_winapi_merges_duplicate_property_into_array_then_back_to_text() {
        let syntax = winapi().unwrap();
        let input = "[s]\r\nk=1\r\nk=2\r\nk=3\r\n";
        let value = ini_text_to_json(input, &syntax).unwrap();
        assert_eq!(value, json!({"s": {"k": ["1", "2", "3"]}}));

        let text = json_to_ini_text(&value, &syntax).unwrap();
        assert!(text.contains("[s]"));
        assert!(text.contains("k=1"));
        assert!(text.contains("k=2"));
        assert!(text.contains("k=3"));
    }

    #[test]
    fn csv_text_to_csv_text_converts_between_dialects() {
        let from = rfc4180().unwrap();
        let to = crate::syntax::csv::tsv().unwrap();
        let input = "a,b\r\n1,2\r\n";
        let text = csv_text_to_csv_text(input, &from, &to, HeaderSource::FirstRow, false).unwrap();
        assert_eq!(text, "a\tb\n1\t2\n");
    }
}
