//! INI/conf/properties/winapi prefix and infix Pratt commands, plus the
//! document-level driver that plays the role of spec.md §4.5's `INIT`
//! sentinel (the lexer never actually emits an `INIT` token, so the
//! driver calls straight into the parse loop instead of dispatching
//! through the command table for that one bootstrap step).

use crate::ast::IniExpr;
use crate::commands::CommandTable;
use crate::error::{Result, SynformError};
use crate::lexer::Lexer;
use crate::params::Params;
use crate::parser::PrattParser;
use crate::syntax::Syntax;
use crate::token::{ini, Token, TokenType};

pub fn table() -> CommandTable<IniExpr> {
    let mut table = CommandTable::new();
    table.register_prefix(ini::IDENTIFIER, prefix_text);
    table.register_prefix(ini::QUOTE, prefix_text);
    table.register_prefix(ini::D_QUOTE, prefix_text);
    table.register_prefix(ini::ASSIGNMENT, prefix_assignment);
    table.register_prefix(ini::SECTION_START, prefix_section_start);
    table.register_prefix(ini::COMMENT, prefix_comment);
    table.register_prefix(ini::EOL, prefix_eol);
    table.register_prefix(ini::WHITESPACE, prefix_whitespace);

    table.register_infix(ini::ASSIGNMENT, infix_assignment);
    table.register_infix(ini::COMMENT, infix_comment);
    table.register_infix(ini::EOL, infix_eol);
    table
}

/// Parses a whole document: loops top-level statements until `EOF`,
/// attaching each into a synthetic root `Section` at the path it
/// declares (spec.md §4.5 prefix `INIT`).
pub fn parse_document(lexer: &mut dyn Lexer, syntax: &Syntax, params: &mut Params) -> Result<IniExpr> {
    let table = table();
    let mut root = IniExpr::empty_section(Vec::new());
    loop {
        let mut parser = PrattParser::new(lexer, syntax, params, &table, ini::EOF);
        if parser.peek_kind() == ini::EOF {
            break;
        }
        let item = parser.parse_expression(0)?;
        attach(&mut root, item, syntax)?;
    }
    Ok(root)
}

/// Attaches one parsed top-level item — a property assignment, a
/// section, or nothing (a comment-only or blank line) — into `target`,
/// which must itself be a `Section` node.
fn attach(target: &mut IniExpr, item: IniExpr, syntax: &Syntax) -> Result<()> {
    match item {
        IniExpr::Text(text) if text.is_empty() => Ok(()),
        IniExpr::KeyValue { ref key, .. } => {
            let name = match key.as_ref() {
                IniExpr::Text(text) => text.clone(),
                _ => return Err(SynformError::expression("assignment key did not resolve to text")),
            };
            target.insert_property(name, item, syntax.duplicates.properties)
        }
        IniExpr::Section { ref path, .. } => {
            let path = path.clone();
            target.insert_section_path(&path, item, syntax.duplicates.sections)
        }
        other => Err(SynformError::expression(format!("unexpected top-level expression: {other:?}"))),
    }
}

fn prefix_whitespace(parser: &mut PrattParser<'_, IniExpr>, _token: Token) -> Result<IniExpr> {
    parser.parse_expression(0)
}

fn prefix_eol(_parser: &mut PrattParser<'_, IniExpr>, _token: Token) -> Result<IniExpr> {
    Ok(IniExpr::Text(String::new()))
}

fn infix_eol(_parser: &mut PrattParser<'_, IniExpr>, left: IniExpr, _token: Token) -> Result<IniExpr> {
    Ok(left)
}

fn prefix_comment(parser: &mut PrattParser<'_, IniExpr>, token: Token) -> Result<IniExpr> {
    parser.params.pending_block_comments.push(token.value);
    Ok(IniExpr::Text(String::new()))
}

fn infix_comment(_parser: &mut PrattParser<'_, IniExpr>, left: IniExpr, token: Token) -> Result<IniExpr> {
    match left {
        IniExpr::KeyValue { key, value, mut comments } => {
            comments.inline = Some(token.value);
            Ok(IniExpr::KeyValue { key, value, comments })
        }
        other => Ok(other),
    }
}

fn prefix_assignment(parser: &mut PrattParser<'_, IniExpr>, _token: Token) -> Result<IniExpr> {
    finish_assignment(parser, IniExpr::Text(String::new()))
}

fn infix_assignment(parser: &mut PrattParser<'_, IniExpr>, left: IniExpr, _token: Token) -> Result<IniExpr> {
    finish_assignment(parser, left)
}

fn finish_assignment(parser: &mut PrattParser<'_, IniExpr>, key: IniExpr) -> Result<IniExpr> {
    let kind = parser.peek_kind();
    let value = if kind == ini::EOL || kind == ini::COMMENT || kind == ini::EOF {
        IniExpr::Text(String::new())
    } else {
        let token = parser.next_token();
        prefix_text(parser, token)?
    };
    let comments = parser.params.take_pending_comments();
    Ok(IniExpr::KeyValue {
        key: Box::new(key),
        value: Box::new(value),
        comments,
    })
}

/// Shared text accumulator for prefix `IDENTIFIER`/`QUOTE`/`D_QUOTE`:
/// builds one `Text` node, consuming continuation tokens until a
/// terminator (spec.md §4.5 "accumulate a Text value...").
fn prefix_text(parser: &mut PrattParser<'_, IniExpr>, token: Token) -> Result<IniExpr> {
    let mut content = String::new();
    if token.kind == ini::QUOTE {
        read_quoted(parser, &mut content, ini::QUOTE_END)?;
    } else if token.kind == ini::D_QUOTE {
        read_quoted(parser, &mut content, ini::D_QUOTE_END)?;
    } else {
        content.push_str(&token.value);
        read_unquoted(parser, &mut content)?;
        // Whitespace is only a continuation character so a run of
        // identifiers separated by spaces stays one Text node; it is
        // not part of the value outside quotes (spec.md §4.5 "whitespace
        // inside quotes"), so trim what it contributed at the edges.
        if content.trim().len() != content.len() {
            content = content.trim().to_string();
        }
    }
    Ok(IniExpr::Text(content))
}

fn read_quoted(parser: &mut PrattParser<'_, IniExpr>, content: &mut String, end_kind: TokenType) -> Result<()> {
    loop {
        let token = parser.next_token();
        if token.kind == end_kind {
            return Ok(());
        }
        if token.is_eof() {
            return Err(SynformError::syntax(
                "unterminated quoted text",
                token.line_start,
                token.start_pos,
                None,
            ));
        }
        if token.kind == ini::ESCAPE {
            push_escape(parser, content)?;
            continue;
        }
        content.push_str(&token.value);
    }
}

fn read_unquoted(parser: &mut PrattParser<'_, IniExpr>, content: &mut String) -> Result<()> {
    loop {
        let kind = parser.peek_kind();
        if kind == ini::IDENTIFIER || kind == ini::WHITESPACE || kind == ini::SUB_SECTION {
            let token = parser.next_token();
            content.push_str(&token.value);
        } else if kind == ini::ESCAPE {
            parser.next_token();
            push_escape(parser, content)?;
        } else {
            return Ok(());
        }
    }
}

fn push_escape(parser: &mut PrattParser<'_, IniExpr>, content: &mut String) -> Result<()> {
    let token = parser.next_token();
    if token.value.chars().count() > 1 {
        let escape = parser
            .syntax()
            .escape
            .as_ref()
            .ok_or_else(|| SynformError::expression("escaped token seen without escape rules configured"))?;
        let prefix_char = token.value.chars().next().unwrap();
        let prefix = escape
            .unicode_prefixes
            .iter()
            .find(|p| p.prefix_char == prefix_char)
            .ok_or_else(|| SynformError::expression(format!("unknown unicode escape prefix '{prefix_char}'")))?;
        let digits = &token.value[prefix_char.len_utf8()..];
        let code = u32::from_str_radix(digits, prefix.radix)
            .map_err(|_| SynformError::expression(format!("invalid unicode escape digits '{digits}'")))?;
        let ch = char::from_u32(code)
            .ok_or_else(|| SynformError::expression(format!("'{code:x}' is not a valid unicode scalar value")))?;
        content.push(ch);
    } else if let Some(ch) = token.value.chars().next() {
        let resolved = parser.syntax().escape.as_ref().and_then(|e| e.resolve_simple(ch)).unwrap_or(ch);
        content.push(resolved);
    }
    Ok(())
}

/// Reads a declared section path (`IDENTIFIER`/`SUB_SECTION` segments up
/// to `SECTION_END`), resolves relative-nesting against the previously
/// declared path, then recursively parses the body until the next
/// `SECTION_START` or `EOF` (spec.md §4.5 prefix `SECTION_START`).
fn prefix_section_start(parser: &mut PrattParser<'_, IniExpr>, _token: Token) -> Result<IniExpr> {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut leading_relative = false;
    let mut first = true;

    loop {
        let kind = parser.peek_kind();
        if kind == ini::SECTION_END {
            parser.next_token();
            break;
        }
        if kind == ini::EOF {
            let token = parser.next_token();
            return Err(SynformError::syntax("unterminated section header", token.line_start, token.start_pos, None));
        }
        let token = parser.next_token();
        if token.kind == ini::SUB_SECTION {
            if first && current.is_empty() {
                leading_relative = true;
            } else {
                segments.push(std::mem::take(&mut current));
            }
        } else {
            current.push_str(&token.value);
        }
        first = false;
    }
    segments.push(current);

    let syntax = parser.syntax();
    let path = if leading_relative && syntax.nesting.relative {
        let mut path = parser.params.current_section_path().to_vec();
        path.extend(segments);
        path
    } else {
        segments
    };
    parser.params.section_path = path.clone();

    let comments = parser.params.take_pending_comments();
    let mut section = IniExpr::Section {
        path,
        entries: indexmap::IndexMap::new(),
        comments,
    };

    loop {
        let kind = parser.peek_kind();
        if kind == ini::SECTION_START || kind == ini::EOF {
            break;
        }
        let item = parser.parse_expression(0)?;
        attach(&mut section, item, syntax)?;
    }

    Ok(section)
}
