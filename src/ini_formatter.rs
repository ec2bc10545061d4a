//! INI/conf/properties/winapi formatters (spec.md §4.7): string, file,
//! and JSON sinks sharing one section/property rendering core.
//!
//! Every formatter here expects `append` to be called with the fully
//! assembled root `Section` that [`crate::ini_commands::parse_document`]
//! (or [`crate::converter::Converter::flush`]) produces — unlike CSV,
//! there is no meaningful "one row at a time" unit to stream, since a
//! section's own identity is its whole subtree.

use std::io::Write;

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

use crate::ast::{CommentSet, IniExpr};
use crate::error::{Result, SynformError};
use crate::formatter::{write_bom, write_encoded, FormatLog, Formatter};
use crate::params::Params;
use crate::syntax::Syntax;

fn text_of(expr: &IniExpr) -> &str {
    match expr {
        IniExpr::Text(s) => s.as_str(),
        _ => "",
    }
}

fn escape_text(raw: &str, syntax: &Syntax, log: &mut FormatLog) -> String {
    let Some(escape) = &syntax.escape else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if escape.is_special.contains(&ch) {
            match escape.escape_for(ch) {
                Some(code) => {
                    out.push(escape.escape_char);
                    out.push(code);
                }
                None => {
                    log.warn(format!("character '{ch}' must be escaped but this dialect has no escape sequence for it"));
                    out.push(ch);
                }
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn render_comments(out: &mut String, comments: &CommentSet, syntax: &Syntax) {
    let Some(rule) = syntax.comments.iter().find(|c| c.retain) else {
        return;
    };
    for line in &comments.block {
        out.push(rule.starter);
        out.push_str(line);
        out.push_str(&syntax.line_terminator);
    }
}

fn render_inline_comment(out: &mut String, comment: &Option<String>, syntax: &Syntax) {
    let Some(text) = comment else { return };
    let Some(rule) = syntax.comments.iter().find(|c| c.inline_allowed) else {
        return;
    };
    out.push(rule.starter);
    out.push_str(text);
}

fn render_section(
    out: &mut String,
    path: &[String],
    entries: &IndexMap<String, IniExpr>,
    comments: &CommentSet,
    syntax: &Syntax,
    log: &mut FormatLog,
) {
    if !path.is_empty() {
        render_comments(out, comments, syntax);
        if let Some((open, close)) = syntax.section_brackets {
            let joiner = syntax.nesting.object_op.map(|c| c.to_string()).unwrap_or_default();
            out.push(open);
            out.push_str(&path.join(&joiner));
            out.push(close);
            out.push_str(&syntax.line_terminator);
        }
    }
    for value in entries.values() {
        render_entry(out, value, syntax, log);
    }
}

fn render_entry(out: &mut String, entry: &IniExpr, syntax: &Syntax, log: &mut FormatLog) {
    match entry {
        IniExpr::Section { path, entries, comments } => render_section(out, path, entries, comments, syntax, log),
        IniExpr::Property { values } => {
            for kv in values {
                render_entry(out, kv, syntax, log);
            }
        }
        IniExpr::KeyValue { key, value, comments } => {
            render_comments(out, comments, syntax);
            let delim = syntax.delimiters.first().copied().unwrap_or('=');
            out.push_str(&escape_text(text_of(key), syntax, log));
            out.push(delim);
            out.push_str(&escape_text(text_of(value), syntax, log));
            render_inline_comment(out, &comments.inline, syntax);
            out.push_str(&syntax.line_terminator);
        }
        IniExpr::Text(_) => {}
    }
}

fn property_to_json(values: &[IniExpr]) -> JsonValue {
    let texts: Vec<Option<String>> = values
        .iter()
        .map(|kv| match kv {
            IniExpr::KeyValue { value, .. } => {
                let text = text_of(value);
                if text.is_empty() { None } else { Some(text.to_string()) }
            }
            _ => None,
        })
        .collect();

    match texts.len() {
        0 => JsonValue::Null,
        1 => texts.into_iter().next().flatten().map(JsonValue::String).unwrap_or(JsonValue::Null),
        _ => JsonValue::Array(texts.into_iter().map(|t| t.map(JsonValue::String).unwrap_or(JsonValue::Null)).collect()),
    }
}

fn build_object(entries: &IndexMap<String, IniExpr>) -> Result<JsonValue> {
    let mut map = Map::new();
    for (key, value) in entries {
        let json_value = match value {
            IniExpr::Section { entries, .. } => build_object(entries)?,
            IniExpr::Property { values } => property_to_json(values),
            IniExpr::KeyValue { .. } => {
                return Err(SynformError::format("a bare KeyValue cannot appear directly under a section; expected a Property wrapper"));
            }
            IniExpr::Text(_) => JsonValue::Null,
        };
        map.insert(key.clone(), json_value);
    }
    Ok(JsonValue::Object(map))
}

fn expect_root_section(node: &IniExpr) -> Result<(&[String], &IndexMap<String, IniExpr>, &CommentSet)> {
    match node {
        IniExpr::Section { path, entries, comments } => Ok((path, entries, comments)),
        other => Err(SynformError::format(format!("INI formatting expects a root Section, got {other:?}"))),
    }
}

/// Renders a whole INI document into one in-memory `String`.
#[derive(Debug, Default)]
pub struct IniStringFormat {
    buf: String,
    log: FormatLog,
}

impl IniStringFormat {
    pub fn new() -> Self {
        IniStringFormat::default()
    }
}

impl Formatter<IniExpr> for IniStringFormat {
    type Output = String;

    fn append(&mut self, node: &IniExpr, syntax: &Syntax, _params: &mut Params) -> Result<()> {
        let (path, entries, comments) = expect_root_section(node)?;
        render_section(&mut self.buf, path, entries, comments, syntax, &mut self.log);
        Ok(())
    }

    fn data(&self) -> &String {
        &self.buf
    }

    fn warnings(&self) -> &[String] {
        &self.log.messages
    }
}

/// Renders a whole INI document to a byte sink, honoring `syntax.bom`
/// and `syntax.encoding`.
pub struct IniFileFormat<W: Write> {
    sink: W,
    bom_written: bool,
    log: FormatLog,
}

impl<W: Write> IniFileFormat<W> {
    pub fn new(sink: W) -> Self {
        IniFileFormat {
            sink,
            bom_written: false,
            log: FormatLog::new(),
        }
    }

    fn ensure_bom(&mut self, syntax: &Syntax) -> Result<()> {
        if !self.bom_written {
            write_bom(&mut self.sink, syntax)?;
            self.bom_written = true;
        }
        Ok(())
    }
}

impl<W: Write> Formatter<IniExpr> for IniFileFormat<W> {
    type Output = ();

    fn append(&mut self, node: &IniExpr, syntax: &Syntax, _params: &mut Params) -> Result<()> {
        self.ensure_bom(syntax)?;
        let (path, entries, comments) = expect_root_section(node)?;
        let mut out = String::new();
        render_section(&mut out, path, entries, comments, syntax, &mut self.log);
        write_encoded(&mut self.sink, &out, syntax)
    }

    fn data(&self) -> &() {
        &()
    }

    fn warnings(&self) -> &[String] {
        &self.log.messages
    }
}

/// Maps the root `Section` tree to a nested JSON object (spec.md §4.7):
/// a `Property` with one value becomes a scalar, with several becomes
/// an array, and an empty one becomes `null`.
#[derive(Debug)]
pub struct IniJsonFormat {
    value: JsonValue,
}

impl Default for IniJsonFormat {
    fn default() -> Self {
        IniJsonFormat { value: JsonValue::Object(Map::new()) }
    }
}

impl IniJsonFormat {
    pub fn new() -> Self {
        IniJsonFormat::default()
    }

    pub fn into_value(self) -> JsonValue {
        self.value
    }
}

impl Formatter<IniExpr> for IniJsonFormat {
    type Output = JsonValue;

    fn append(&mut self, node: &IniExpr, _syntax: &Syntax, _params: &mut Params) -> Result<()> {
        let (_, entries, _) = expect_root_section(node)?;
        self.value = build_object(entries)?;
        Ok(())
    }

    fn data(&self) -> &JsonValue {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ini_commands::parse_document;
    use crate::ini_lexer::IniTextLexer;
    use crate::lexer::Lexer;
    use crate::syntax::ini::{unix, winapi};

    fn parse(input: &str, syntax: &Syntax) -> IniExpr {
        let mut lexer = IniTextLexer::new(syntax.clone());
        lexer.process(input).unwrap();
        lexer.end().unwrap();
        let mut params = Params::new();
        parse_document(&mut lexer, syntax, &mut params).unwrap()
    }

    #[test]
    fn string_format_renders_dotted_section_and_assignment() {
        let syntax = unix().unwrap();
        let root = parse("[a.b]\nk=v\n", &syntax);
        let mut fmt = IniStringFormat::new();
        fmt.append(&root, &syntax, &mut Params::new()).unwrap();
        assert_eq!(fmt.data(), "[a.b]\nk=v\n");
    }

    #[test]
    fn json_format_merges_duplicate_property_into_array() {
        let syntax = winapi().unwrap();
        let root = parse("[a]\r\nk=1\r\nk=2\r\n", &syntax);
        let mut fmt = IniJsonFormat::new();
        fmt.append(&root, &syntax, &mut Params::new()).unwrap();
        let value = fmt.into_value();
        assert_eq!(value["a"]["k"], JsonValue::Array(vec![JsonValue::String("1".into()), JsonValue::String("2".into())]));
    }

    #[test]
    fn root_level_properties_render_without_a_synthetic_bracket_line() {
        let syntax = crate::syntax::ini::properties().unwrap();
        let root = parse("a=1\n", &syntax);
        let mut fmt = IniStringFormat::new();
        fmt.append(&root, &syntax, &mut Params::new()).unwrap();
        assert_eq!(fmt.data(), "a=1\n");
    }
}
