//! Dialect configuration: [`Syntax`] and its [`SyntaxBuilder`].
//!
//! A `Syntax` fully describes one CSV-family or INI-family dialect. It is
//! immutable once built and safe to share read-only across conversions
//! (spec.md §5). All cross-field validation happens in the builder so a
//! `Syntax` value is always internally consistent.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::{Result, SynformError};

/// Which family of dialect a [`Syntax`] describes. The Pratt command
/// tables (`csv_commands.rs` / `ini_commands.rs`) are selected by this
/// tag rather than embedded in `Syntax` itself — see DESIGN.md for why
/// the command registry lives with the parser instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Ini,
}

/// CSV quoting mode (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMode {
    Always,
    None,
    Auto,
}

/// How quoting is configured for a dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteSpec {
    /// CSV: one quote character plus a mode.
    Csv { quote: char, mode: QuoteMode },
    /// INI: an optional single-quote and/or double-quote character, each
    /// used as matched open/close delimiters.
    Ini {
        single: Option<char>,
        double: Option<char>,
    },
    /// No quoting support at all (e.g. Win32 INI disables single quotes
    /// but keeps double quotes — encode that as `Ini` with `single: None`;
    /// `None` here means neither family is quoted).
    None,
}

/// A single comment-starter character and its dialect-level behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CommentRule {
    pub starter: char,
    pub retain: bool,
    pub inline_allowed: bool,
}

/// Nesting operators controlling JSON traversal and INI sub-sectioning
/// (spec.md §4.1, §4.6, glossary "Nesting op / array op").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestingConfig {
    /// Descends into a nested JSON object key (`.` by default).
    pub object_op: Option<char>,
    /// Indexes into a nested JSON array (`#` by default).
    pub array_op: Option<char>,
    /// A leading nesting char denotes "relative to the previously
    /// declared section path" rather than "relative to the root".
    pub relative: bool,
}

impl Default for NestingConfig {
    fn default() -> Self {
        NestingConfig {
            object_op: Some('.'),
            array_op: Some('#'),
            relative: false,
        }
    }
}

/// Policy controlling how a second occurrence of the same section or
/// property name is handled (spec.md §4.5 "Duplicate semantics").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    Merge,
    Overwrite,
    Discard,
    Throw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicatePolicies {
    pub sections: DuplicatePolicy,
    pub properties: DuplicatePolicy,
}

impl Default for DuplicatePolicies {
    fn default() -> Self {
        DuplicatePolicies {
            sections: DuplicatePolicy::Merge,
            properties: DuplicatePolicy::Overwrite,
        }
    }
}

/// One unicode-escape prefix (`A`, `\x41`, ...), spec.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicodePrefix {
    pub prefix_char: char,
    pub min_digits: u8,
    pub max_digits: u8,
    pub radix: u32,
}

/// Escape configuration: which character introduces an escape, whether
/// it is honored outside quotes, the single-character substitution
/// table, and any unicode-escape prefixes.
#[derive(Debug, Clone)]
pub struct EscapeRules {
    pub escape_char: char,
    pub allowed_outside_quotes: bool,
    /// Characters that must be escaped on output.
    pub is_special: HashSet<char>,
    /// Single-character escape substitutions, e.g. `n` -> `\n`.
    pub escape_map: Vec<(char, char)>,
    pub unicode_prefixes: Vec<UnicodePrefix>,
}

impl EscapeRules {
    /// Resolves a single escaped character (the character immediately
    /// following the escape char) to its literal value, or `None` if it
    /// is not in the substitution table (the caller then falls back to
    /// unicode-prefix handling or passes the character through literally).
    pub fn resolve_simple(&self, escaped: char) -> Option<char> {
        self.escape_map
            .iter()
            .find(|(from, _)| *from == escaped)
            .map(|(_, to)| *to)
    }

    pub fn find_unicode_prefix(&self, ch: char) -> Option<UnicodePrefix> {
        self.unicode_prefixes.iter().copied().find(|p| p.prefix_char == ch)
    }

    /// Reverse lookup used by formatters: given a literal character that
    /// needs escaping, find the escape-sequence character for it.
    pub fn escape_for(&self, literal: char) -> Option<char> {
        self.escape_map
            .iter()
            .find(|(_, to)| *to == literal)
            .map(|(from, _)| *from)
    }
}

/// `string -> JsonValue` cell parser. Default: empty string becomes
/// `null`, anything else becomes a JSON string (spec.md §4.1).
pub type CellParser = Arc<dyn Fn(&str) -> JsonValue + Send + Sync>;

/// Whitespace predicate. Default: Unicode whitespace minus the
/// configured line terminator's characters (spec.md §4.1).
pub type WhitespacePredicate = Arc<dyn Fn(char) -> bool + Send + Sync>;

fn default_cell_parser() -> CellParser {
    Arc::new(|raw: &str| {
        if raw.is_empty() {
            JsonValue::Null
        } else {
            JsonValue::String(raw.to_string())
        }
    })
}

fn default_whitespace(line_terminator: String) -> WhitespacePredicate {
    Arc::new(move |ch: char| ch.is_whitespace() && !line_terminator.contains(ch))
}

/// The immutable dialect descriptor. Construct via [`SyntaxBuilder`].
#[derive(Clone)]
pub struct Syntax {
    pub format: Format,
    pub delimiters: Vec<char>,
    pub line_terminator: String,
    pub quote: QuoteSpec,
    pub comments: Vec<CommentRule>,
    pub section_brackets: Option<(char, char)>,
    pub nesting: NestingConfig,
    pub duplicates: DuplicatePolicies,
    pub escape: Option<EscapeRules>,
    pub cell_parser: CellParser,
    pub whitespace: WhitespacePredicate,
    pub trim_leading: bool,
    pub trim_trailing: bool,
    pub enforce_symmetry: bool,
    pub bom: bool,
    pub encoding: &'static encoding_rs::Encoding,
    pub media_type: String,
    pub standard: String,
    pub file_extension: String,
}

impl fmt::Debug for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Syntax")
            .field("format", &self.format)
            .field("delimiters", &self.delimiters)
            .field("line_terminator", &self.line_terminator)
            .field("quote", &self.quote)
            .field("comments", &self.comments)
            .field("section_brackets", &self.section_brackets)
            .field("nesting", &self.nesting)
            .field("duplicates", &self.duplicates)
            .field("escape", &self.escape.as_ref().map(|e| e.escape_char))
            .field("trim_leading", &self.trim_leading)
            .field("trim_trailing", &self.trim_trailing)
            .field("enforce_symmetry", &self.enforce_symmetry)
            .field("bom", &self.bom)
            .field("encoding", &self.encoding.name())
            .field("standard", &self.standard)
            .finish()
    }
}

impl Syntax {
    /// Characters the whitespace predicate classifies as whitespace.
    pub fn is_whitespace(&self, ch: char) -> bool {
        (self.whitespace)(ch)
    }

    /// Every structural single-character token this dialect defines,
    /// used by the builder's "no duplicates, none whitespace" checks and
    /// reusable by callers that need to know what a raw cell must avoid.
    fn structural_chars(&self) -> Vec<char> {
        let mut chars = Vec::new();
        chars.extend(self.delimiters.iter().copied());
        if self.line_terminator.chars().count() == 1 {
            chars.push(self.line_terminator.chars().next().unwrap());
        }
        match &self.quote {
            QuoteSpec::Csv { quote, .. } => chars.push(*quote),
            QuoteSpec::Ini { single, double } => {
                chars.extend(single.iter().copied());
                chars.extend(double.iter().copied());
            }
            QuoteSpec::None => {}
        }
        chars.extend(self.comments.iter().map(|c| c.starter));
        if let Some((open, close)) = self.section_brackets {
            chars.push(open);
            chars.push(close);
        }
        chars.extend(self.nesting.object_op.iter().copied());
        chars.extend(self.nesting.array_op.iter().copied());
        if let Some(escape) = &self.escape {
            chars.push(escape.escape_char);
            chars.extend(escape.unicode_prefixes.iter().map(|p| p.prefix_char));
        }
        chars
    }
}

/// Builder mediating [`Syntax`] construction with cross-field
/// validation (spec.md §4.1).
#[derive(Clone)]
pub struct SyntaxBuilder {
    format: Format,
    delimiters: Vec<char>,
    line_terminator: String,
    quote: QuoteSpec,
    comments: Vec<CommentRule>,
    section_brackets: Option<(char, char)>,
    nesting: NestingConfig,
    duplicates: DuplicatePolicies,
    escape: Option<EscapeRules>,
    cell_parser: Option<CellParser>,
    whitespace: Option<WhitespacePredicate>,
    trim_leading: bool,
    trim_trailing: bool,
    enforce_symmetry: bool,
    bom: bool,
    encoding: &'static encoding_rs::Encoding,
    media_type: String,
    standard: String,
    file_extension: String,
}

impl SyntaxBuilder {
    pub fn new(format: Format) -> Self {
        SyntaxBuilder {
            format,
            delimiters: vec![','],
            line_terminator: "\n".to_string(),
            quote: QuoteSpec::None,
            comments: Vec::new(),
            section_brackets: None,
            nesting: NestingConfig::default(),
            duplicates: DuplicatePolicies::default(),
            escape: None,
            cell_parser: None,
            whitespace: None,
            trim_leading: false,
            trim_trailing: false,
            enforce_symmetry: true,
            bom: false,
            encoding: encoding_rs::UTF_8,
            media_type: String::new(),
            standard: String::new(),
            file_extension: String::new(),
        }
    }

    /// Copies every field out of an existing `Syntax` with no
    /// validation, per spec.md §4.1 `rebuild(from: Syntax)`.
    pub fn rebuild(from: &Syntax) -> Self {
        SyntaxBuilder {
            format: from.format,
            delimiters: from.delimiters.clone(),
            line_terminator: from.line_terminator.clone(),
            quote: from.quote.clone(),
            comments: from.comments.clone(),
            section_brackets: from.section_brackets,
            nesting: from.nesting,
            duplicates: from.duplicates,
            escape: from.escape.clone(),
            cell_parser: Some(from.cell_parser.clone()),
            whitespace: Some(from.whitespace.clone()),
            trim_leading: from.trim_leading,
            trim_trailing: from.trim_trailing,
            enforce_symmetry: from.enforce_symmetry,
            bom: from.bom,
            encoding: from.encoding,
            media_type: from.media_type.clone(),
            standard: from.standard.clone(),
            file_extension: from.file_extension.clone(),
        }
    }

    /// Resets every field to the defaults `new` would have produced,
    /// optionally keeping the format tag (`to_defaults` mirrors
    /// spec.md's `clear(toDefaults?)`).
    pub fn clear(self, to_defaults: bool) -> Self {
        if to_defaults {
            SyntaxBuilder::new(self.format)
        } else {
            self
        }
    }

    pub fn delimiters(mut self, delimiters: impl IntoIterator<Item = char>) -> Self {
        self.delimiters = delimiters.into_iter().collect();
        self
    }

    pub fn line_terminator(mut self, value: impl Into<String>) -> Self {
        self.line_terminator = value.into();
        self
    }

    pub fn quote(mut self, quote: QuoteSpec) -> Self {
        self.quote = quote;
        self
    }

    pub fn comments(mut self, comments: impl IntoIterator<Item = CommentRule>) -> Self {
        self.comments = comments.into_iter().collect();
        self
    }

    pub fn section_brackets(mut self, open: char, close: char) -> Self {
        self.section_brackets = Some((open, close));
        self
    }

    pub fn nesting(mut self, nesting: NestingConfig) -> Self {
        self.nesting = nesting;
        self
    }

    pub fn duplicates(mut self, duplicates: DuplicatePolicies) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn escape(mut self, escape: EscapeRules) -> Self {
        self.escape = Some(escape);
        self
    }

    pub fn cell_parser(mut self, parser: CellParser) -> Self {
        self.cell_parser = Some(parser);
        self
    }

    pub fn whitespace(mut self, predicate: WhitespacePredicate) -> Self {
        self.whitespace = Some(predicate);
        self
    }

    pub fn trim(mut self, leading: bool, trailing: bool) -> Self {
        self.trim_leading = leading;
        self.trim_trailing = trailing;
        self
    }

    pub fn enforce_symmetry(mut self, enforce: bool) -> Self {
        self.enforce_symmetry = enforce;
        self
    }

    pub fn bom(mut self, bom: bool) -> Self {
        self.bom = bom;
        self
    }

    pub fn encoding(mut self, encoding: &'static encoding_rs::Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn metadata(
        mut self,
        media_type: impl Into<String>,
        standard: impl Into<String>,
        file_extension: impl Into<String>,
    ) -> Self {
        self.media_type = media_type.into();
        self.standard = standard.into();
        self.file_extension = file_extension.into();
        self
    }

    /// Validates every cross-field contract from spec.md §4.1 and
    /// produces the immutable [`Syntax`].
    pub fn build(self) -> Result<Syntax> {
        if self.delimiters.is_empty() {
            return Err(SynformError::build("at least one delimiter is required"));
        }
        if self.line_terminator.is_empty() {
            return Err(SynformError::build("line terminator must not be empty"));
        }

        let whitespace = self
            .whitespace
            .unwrap_or_else(|| default_whitespace(self.line_terminator.clone()));
        let cell_parser = self.cell_parser.unwrap_or_else(default_cell_parser);

        let syntax = Syntax {
            format: self.format,
            delimiters: self.delimiters,
            line_terminator: self.line_terminator,
            quote: self.quote,
            comments: self.comments,
            section_brackets: self.section_brackets,
            nesting: self.nesting,
            duplicates: self.duplicates,
            escape: self.escape,
            cell_parser,
            whitespace,
            trim_leading: self.trim_leading,
            trim_trailing: self.trim_trailing,
            enforce_symmetry: self.enforce_symmetry,
            bom: self.bom,
            encoding: self.encoding,
            media_type: self.media_type,
            standard: self.standard,
            file_extension: self.file_extension,
        };

        validate_no_duplicates_or_whitespace(&syntax)?;
        Ok(syntax)
    }
}

fn validate_no_duplicates_or_whitespace(syntax: &Syntax) -> Result<()> {
    let chars = syntax.structural_chars();
    let mut seen: HashSet<char> = HashSet::new();
    for ch in &chars {
        if !seen.insert(*ch) {
            return Err(SynformError::build(format!(
                "structural token '{ch}' is used for more than one purpose"
            )));
        }
        if syntax.is_whitespace(*ch) {
            return Err(SynformError::build(format!(
                "structural token '{ch}' must not satisfy the whitespace predicate"
            )));
        }
    }
    Ok(())
}

/// CSV-family presets (spec.md §6 "choose a preset").
pub mod csv {
    use super::*;

    /// RFC 4180: comma delimiter, CRLF, double-quote quoting, doubled-quote
    /// escape inside quoted fields, row symmetry enforced, no comments.
    pub fn rfc4180() -> Result<Syntax> {
        SyntaxBuilder::new(Format::Csv)
            .delimiters([','])
            .line_terminator("\r\n")
            .quote(QuoteSpec::Csv {
                quote: '"',
                mode: QuoteMode::Auto,
            })
            .enforce_symmetry(true)
            .metadata("text/csv", "RFC 4180", "csv")
            .build()
    }

    /// Tab-separated values: same as RFC 4180 but `\t` delimited and a
    /// bare `\n` terminator, matching the teacher's `.tsv` convention in
    /// `io_utils::resolve_input_delimiter`.
    pub fn tsv() -> Result<Syntax> {
        SyntaxBuilder::new(Format::Csv)
            .delimiters(['\t'])
            .line_terminator("\n")
            .quote(QuoteSpec::Csv {
                quote: '"',
                mode: QuoteMode::Auto,
            })
            .enforce_symmetry(true)
            .metadata("text/tab-separated-values", "TSV", "tsv")
            .build()
    }
}

/// INI-family presets (spec.md §6).
pub mod ini {
    use super::*;

    fn unix_escape_rules() -> EscapeRules {
        EscapeRules {
            escape_char: '\\',
            allowed_outside_quotes: false,
            is_special: ['\\', '"', '\''].into_iter().collect(),
            escape_map: vec![
                ('n', '\n'),
                ('r', '\r'),
                ('t', '\t'),
                ('\'', '\''),
                ('"', '"'),
                ('\\', '\\'),
                ('0', '\0'),
                ('=', '='),
                ('[', '['),
                (']', ']'),
                ('#', '#'),
                ('b', '\u{0008}'),
                ('a', '\u{0007}'),
            ],
            unicode_prefixes: Vec::new(),
        }
    }

    fn properties_escape_rules() -> EscapeRules {
        EscapeRules {
            escape_char: '\\',
            allowed_outside_quotes: true,
            is_special: ['\\', '=', ':', '#', '!'].into_iter().collect(),
            escape_map: vec![('n', '\n'), ('r', '\r'), ('t', '\t'), ('f', '\u{000C}'), ('\\', '\\')],
            unicode_prefixes: vec![UnicodePrefix {
                prefix_char: 'u',
                min_digits: 4,
                max_digits: 4,
                radix: 16,
            }],
        }
    }

    /// Generic — default builder settings, no comment retention.
    pub fn generic() -> Result<Syntax> {
        SyntaxBuilder::new(Format::Ini)
            .delimiters(['='])
            .line_terminator("\n")
            .quote(QuoteSpec::Ini {
                single: Some('\''),
                double: Some('"'),
            })
            .section_brackets('[', ']')
            .duplicates(DuplicatePolicies {
                sections: DuplicatePolicy::Merge,
                properties: DuplicatePolicy::Overwrite,
            })
            .metadata("text/plain", "INI", "ini")
            .build()
    }

    /// UNIX conf-style: `#` comments, `=`, dotted nested section names,
    /// quoted strings with the escapes spec.md §6 lists, sections merge,
    /// properties overwrite.
    pub fn unix() -> Result<Syntax> {
        SyntaxBuilder::new(Format::Ini)
            .delimiters(['='])
            .line_terminator("\n")
            .quote(QuoteSpec::Ini {
                single: Some('\''),
                double: Some('"'),
            })
            .section_brackets('[', ']')
            .comments([CommentRule {
                starter: '#',
                retain: false,
                inline_allowed: false,
            }])
            .nesting(NestingConfig {
                object_op: Some('.'),
                array_op: None,
                relative: true,
            })
            .duplicates(DuplicatePolicies {
                sections: DuplicatePolicy::Merge,
                properties: DuplicatePolicy::Overwrite,
            })
            .escape(unix_escape_rules())
            .metadata("text/plain", "UNIX INI", "conf")
            .build()
    }

    /// Java `.properties`-style: `#`/`!` comments, multiple delimiters,
    /// no section brackets, no quoted text, `\uXXXX` unicode escapes,
    /// duplicate properties overwrite.
    pub fn properties() -> Result<Syntax> {
        SyntaxBuilder::new(Format::Ini)
            .delimiters(['=', ':', '\t', '\u{000C}'])
            .line_terminator("\n")
            .quote(QuoteSpec::None)
            .comments([
                CommentRule {
                    starter: '#',
                    retain: false,
                    inline_allowed: false,
                },
                CommentRule {
                    starter: '!',
                    retain: false,
                    inline_allowed: false,
                },
            ])
            .nesting(NestingConfig {
                object_op: None,
                array_op: None,
                relative: false,
            })
            .duplicates(DuplicatePolicies {
                sections: DuplicatePolicy::Discard,
                properties: DuplicatePolicy::Overwrite,
            })
            .escape(properties_escape_rules())
            .metadata("text/x-java-properties", "Java properties", "properties")
            .build()
    }

    /// Win32 INI: only `;` comments (no inline), `=` only, no nesting,
    /// no unicode escapes, quoted text supported, sections discard
    /// duplicates, properties merge into arrays.
    pub fn winapi() -> Result<Syntax> {
        SyntaxBuilder::new(Format::Ini)
            .delimiters(['='])
            .line_terminator("\r\n")
            .quote(QuoteSpec::Ini {
                single: None,
                double: Some('"'),
            })
            .section_brackets('[', ']')
            .comments([CommentRule {
                starter: ';',
                retain: true,
                inline_allowed: false,
            }])
            .nesting(NestingConfig {
                object_op: None,
                array_op: None,
                relative: false,
            })
            .duplicates(DuplicatePolicies {
                sections: DuplicatePolicy::Discard,
                properties: DuplicatePolicy::Merge,
            })
            .metadata("text/plain", "Win32 INI", "ini")
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc4180_preset_builds() {
        let syntax = csv::rfc4180().unwrap();
        assert_eq!(syntax.delimiters, vec![',']);
        assert_eq!(syntax.line_terminator, "\r\n");
        assert!(syntax.enforce_symmetry);
    }

    #[test]
    fn duplicate_structural_token_is_rejected() {
        let result = SyntaxBuilder::new(Format::Csv)
            .delimiters([','])
            .line_terminator(",")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn structural_token_cannot_be_whitespace() {
        let result = SyntaxBuilder::new(Format::Csv)
            .delimiters([' '])
            .line_terminator("\n")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rebuild_copies_state_without_revalidating() {
        let base = csv::rfc4180().unwrap();
        let rebuilt = SyntaxBuilder::rebuild(&base).delimiters(['\t']).build().unwrap();
        assert_eq!(rebuilt.delimiters, vec!['\t']);
        assert_eq!(rebuilt.line_terminator, base.line_terminator);
    }

    #[test]
    fn default_cell_parser_maps_empty_to_null() {
        let syntax = csv::rfc4180().unwrap();
        assert_eq!((syntax.cell_parser)(""), JsonValue::Null);
        assert_eq!((syntax.cell_parser)("x"), JsonValue::String("x".to_string()));
    }

    #[test]
    fn unix_ini_preset_builds_with_dotted_nesting() {
        let syntax = ini::unix().unwrap();
        assert_eq!(syntax.nesting.object_op, Some('.'));
        assert!(syntax.nesting.relative);
        assert_eq!(syntax.duplicates.properties, DuplicatePolicy::Overwrite);
    }

    #[test]
    fn properties_preset_resolves_unicode_escape_prefix() {
        let syntax = ini::properties().unwrap();
        let escape = syntax.escape.unwrap();
        let prefix = escape.find_unicode_prefix('u').unwrap();
        assert_eq!(prefix.max_digits, 4);
        assert_eq!(prefix.radix, 16);
    }

    #[test]
    fn winapi_preset_merges_properties_and_discards_sections() {
        let syntax = ini::winapi().unwrap();
        assert_eq!(syntax.duplicates.properties, DuplicatePolicy::Merge);
        assert_eq!(syntax.duplicates.sections, DuplicatePolicy::Discard);
    }
}
