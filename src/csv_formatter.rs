//! CSV/TSV formatters (spec.md §4.7): string, file, and JSON sinks
//! sharing one cell-rendering core.
//!
//! Quoting is decided fresh on the way out rather than preserved from
//! however the source happened to be quoted — `QuoteMode::Auto` quotes a
//! cell only if it actually contains a delimiter, the quote character,
//! or a line-terminator character, same rule the lexer uses in reverse.

use std::io::Write;

use serde_json::Value as JsonValue;

use crate::ast::CsvExpr;
use crate::error::{Result, SynformError};
use crate::formatter::{write_bom, write_encoded, FormatLog, Formatter};
use crate::params::Params;
use crate::projection::unflatten_row;
use crate::syntax::{QuoteMode, QuoteSpec, Syntax};

fn quote_mode(syntax: &Syntax) -> (Option<char>, QuoteMode) {
    match &syntax.quote {
        QuoteSpec::Csv { quote, mode } => (Some(*quote), *mode),
        _ => (None, QuoteMode::None),
    }
}

fn needs_quoting(cell: &str, delim: char, quote: char, syntax: &Syntax) -> bool {
    cell.contains(delim) || cell.contains(quote) || cell.chars().any(|c| syntax.line_terminator.contains(c))
}

fn render_cell(out: &mut String, cell: &str, syntax: &Syntax, log: &mut FormatLog) {
    let (quote, mode) = quote_mode(syntax);
    let delim = syntax.delimiters.first().copied().unwrap_or(',');
    let must_quote = match (quote, mode) {
        (Some(_), QuoteMode::Always) => true,
        (Some(q), QuoteMode::Auto) => needs_quoting(cell, delim, q, syntax),
        _ => false,
    };

    if !must_quote {
        out.push_str(cell);
        return;
    }

    match quote {
        Some(q) => {
            out.push(q);
            for ch in cell.chars() {
                if ch == q {
                    out.push(q);
                }
                out.push(ch);
            }
            out.push(q);
        }
        None => {
            log.warn("cell requires quoting but this dialect has no quote character configured");
            out.push_str(cell);
        }
    }
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, syntax: &Syntax, log: &mut FormatLog) -> String {
    let delim = syntax.delimiters.first().copied().unwrap_or(',');
    let mut out = String::new();
    let mut first = true;
    for cell in cells {
        if !first {
            out.push(delim);
        }
        render_cell(&mut out, cell, syntax, log);
        first = false;
    }
    out.push_str(&syntax.line_terminator);
    out
}

/// Renders a whole CSV document into one in-memory `String`.
#[derive(Debug, Default)]
pub struct CsvStringFormat {
    buf: String,
    header_written: bool,
    rows: usize,
    columns: usize,
    log: FormatLog,
}

impl CsvStringFormat {
    pub fn new() -> Self {
        CsvStringFormat::default()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }
}

impl Formatter<CsvExpr> for CsvStringFormat {
    type Output = String;

    fn append(&mut self, node: &CsvExpr, syntax: &Syntax, params: &mut Params) -> Result<()> {
        if !self.header_written
            && let Some(header) = params.header()
        {
            self.columns = header.len();
            let header = header.to_vec();
            self.buf.push_str(&render_row(header.iter().map(String::as_str), syntax, &mut self.log));
            self.header_written = true;
        }
        let cells = node.cells();
        self.columns = self.columns.max(cells.len());
        self.rows += 1;
        self.buf.push_str(&render_row(cells.into_iter(), syntax, &mut self.log));
        Ok(())
    }

    fn data(&self) -> &String {
        &self.buf
    }

    fn warnings(&self) -> &[String] {
        &self.log.messages
    }
}

/// Renders a whole CSV document to a byte sink, honoring `syntax.bom`
/// and `syntax.encoding`.
pub struct CsvFileFormat<W: Write> {
    sink: W,
    header_written: bool,
    bom_written: bool,
    rows: usize,
    columns: usize,
    log: FormatLog,
}

impl<W: Write> CsvFileFormat<W> {
    pub fn new(sink: W) -> Self {
        CsvFileFormat {
            sink,
            header_written: false,
            bom_written: false,
            rows: 0,
            columns: 0,
            log: FormatLog::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    fn ensure_bom(&mut self, syntax: &Syntax) -> Result<()> {
        if !self.bom_written {
            write_bom(&mut self.sink, syntax)?;
            self.bom_written = true;
        }
        Ok(())
    }
}

impl<W: Write> Formatter<CsvExpr> for CsvFileFormat<W> {
    type Output = ();

    fn append(&mut self, node: &CsvExpr, syntax: &Syntax, params: &mut Params) -> Result<()> {
        self.ensure_bom(syntax)?;
        if !self.header_written
            && let Some(header) = params.header()
        {
            self.columns = header.len();
            let header = header.to_vec();
            let row = render_row(header.iter().map(String::as_str), syntax, &mut self.log);
            write_encoded(&mut self.sink, &row, syntax)?;
            self.header_written = true;
        }
        let cells = node.cells();
        self.columns = self.columns.max(cells.len());
        self.rows += 1;
        let row = render_row(cells.into_iter(), syntax, &mut self.log);
        write_encoded(&mut self.sink, &row, syntax)
    }

    fn data(&self) -> &() {
        &()
    }

    fn warnings(&self) -> &[String] {
        &self.log.messages
    }
}

/// Projects each CSV record into a JSON object via the configured
/// header path operators (spec.md §4.6), accumulating one row per
/// `append` call.
#[derive(Debug, Default)]
pub struct CsvJsonFormat {
    rows: Vec<JsonValue>,
}

impl CsvJsonFormat {
    pub fn new() -> Self {
        CsvJsonFormat::default()
    }

    pub fn into_rows(self) -> Vec<JsonValue> {
        self.rows
    }
}

impl Formatter<CsvExpr> for CsvJsonFormat {
    type Output = Vec<JsonValue>;

    fn append(&mut self, node: &CsvExpr, syntax: &Syntax, params: &mut Params) -> Result<()> {
        let header = params
            .header()
            .ok_or_else(|| SynformError::format("CSV-to-JSON formatting requires a known header"))?;
        let cells: Vec<String> = node.cells().into_iter().map(str::to_string).collect();
        self.rows.push(unflatten_row(header, &cells, syntax)?);
        Ok(())
    }

    fn data(&self) -> &Vec<JsonValue> {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_lexer::CsvTextLexer;
    use crate::lexer::Lexer;
    use crate::parser::PrattParser;
    use crate::syntax::csv::rfc4180;
    use crate::token::csv::EOF;
    use crate::{csv_commands, params::Params};

    fn parse_record(input: &str, syntax: &Syntax, params: &mut Params) -> CsvExpr {
        let mut lexer = CsvTextLexer::new(syntax.clone());
        lexer.process(input).unwrap();
        lexer.end().unwrap();
        let table = csv_commands::table();
        let mut parser = PrattParser::new(&mut lexer, syntax, params, &table, EOF);
        parser.parse_expression(0).unwrap()
    }

    #[test]
    fn string_format_quotes_only_when_auto_mode_requires_it() {
        let syntax = rfc4180().unwrap();
        let mut params = Params::with_header(vec!["a".into(), "b".into()]);
        let expr = parse_record("1,\"has, comma\"\r\n", &syntax, &mut params);

        let mut fmt = CsvStringFormat::new();
        fmt.append(&expr, &syntax, &mut params).unwrap();
        assert_eq!(fmt.data(), "a,b\r\n1,\"has, comma\"\r\n");
    }

    #[test]
    fn json_format_projects_header_into_nested_object() {
        let syntax = rfc4180().unwrap();
        let mut params = Params::with_header(vec!["user.name".into(), "user.age".into()]);
        let expr = parse_record("Ada,30\r\n", &syntax, &mut params);

        let mut fmt = CsvJsonFormat::new();
        fmt.append(&expr, &syntax, &mut params).unwrap();
        let rows = fmt.into_rows();
        assert_eq!(rows[0]["user"]["name"], JsonValue::String("Ada".into()));
        assert_eq!(rows[0]["user"]["age"], JsonValue::String("30".into()));
    }
}
