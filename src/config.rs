//! Externalizable dialect files (spec.md §6 "load a dialect from a
//! file"): a serde-friendly mirror of [`Syntax`]'s fields that can be
//! read from or written to YAML/JSON, modeled on the teacher's
//! `Schema::load`/`save` pattern (`src/schema.rs`) — open, `BufReader`,
//! `serde_yaml::from_reader` with a `.context`-equivalent error, same
//! shape in reverse for `save`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynformError};
use crate::syntax::{CommentRule, DuplicatePolicies, DuplicatePolicy, NestingConfig, QuoteMode, QuoteSpec, Syntax, SyntaxBuilder};
use crate::syntax::Format as SynFormat;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DialectFormat {
    Csv,
    Ini,
}

impl From<DialectFormat> for SynFormat {
    fn from(value: DialectFormat) -> Self {
        match value {
            DialectFormat::Csv => SynFormat::Csv,
            DialectFormat::Ini => SynFormat::Ini,
        }
    }
}

impl From<SynFormat> for DialectFormat {
    fn from(value: SynFormat) -> Self {
        match value {
            SynFormat::Csv => DialectFormat::Csv,
            SynFormat::Ini => DialectFormat::Ini,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuoteModeFile {
    Always,
    None,
    Auto,
}

impl From<QuoteModeFile> for QuoteMode {
    fn from(value: QuoteModeFile) -> Self {
        match value {
            QuoteModeFile::Always => QuoteMode::Always,
            QuoteModeFile::None => QuoteMode::None,
            QuoteModeFile::Auto => QuoteMode::Auto,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuoteFile {
    /// CSV only: the single quote character plus its mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_quote: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_mode: Option<QuoteModeFile>,
    /// INI only: either family may be absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ini_single: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ini_double: Option<char>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicyFile {
    Merge,
    Overwrite,
    Discard,
    Throw,
}

impl From<DuplicatePolicyFile> for DuplicatePolicy {
    fn from(value: DuplicatePolicyFile) -> Self {
        match value {
            DuplicatePolicyFile::Merge => DuplicatePolicy::Merge,
            DuplicatePolicyFile::Overwrite => DuplicatePolicy::Overwrite,
            DuplicatePolicyFile::Discard => DuplicatePolicy::Discard,
            DuplicatePolicyFile::Throw => DuplicatePolicy::Throw,
        }
    }
}

impl From<DuplicatePolicy> for DuplicatePolicyFile {
    fn from(value: DuplicatePolicy) -> Self {
        match value {
            DuplicatePolicy::Merge => DuplicatePolicyFile::Merge,
            DuplicatePolicy::Overwrite => DuplicatePolicyFile::Overwrite,
            DuplicatePolicy::Discard => DuplicatePolicyFile::Discard,
            DuplicatePolicy::Throw => DuplicatePolicyFile::Throw,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct DuplicatesFile {
    #[serde(default = "default_merge")]
    pub sections: DuplicatePolicyFile,
    #[serde(default = "default_overwrite")]
    pub properties: DuplicatePolicyFile,
}

fn default_merge() -> DuplicatePolicyFile {
    DuplicatePolicyFile::Merge
}

fn default_overwrite() -> DuplicatePolicyFile {
    DuplicatePolicyFile::Overwrite
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct NestingFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_op: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_op: Option<char>,
    #[serde(default)]
    pub relative: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EscapeFile {
    pub escape_char: char,
    #[serde(default)]
    pub allowed_outside_quotes: bool,
    /// `(escape-code-char, literal-char)` pairs, e.g. `('n', '\n')`.
    #[serde(default)]
    pub escape_map: Vec<(char, char)>,
    /// Unicode-prefix escapes as `(prefix_char, min_digits, max_digits, radix)`.
    #[serde(default)]
    pub unicode_prefixes: Vec<(char, u8, u8, u32)>,
}

/// Serializable mirror of [`Syntax`]'s configurable fields (spec.md
/// §4.1), loadable from / savable to YAML or JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialectFile {
    pub format: DialectFormat,
    pub delimiters: Vec<char>,
    pub line_terminator: String,
    #[serde(default)]
    pub quote: QuoteFile,
    #[serde(default)]
    pub comments: Vec<CommentRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_brackets: Option<(char, char)>,
    #[serde(default)]
    pub nesting: NestingFile,
    #[serde(default)]
    pub duplicates: DuplicatesFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escape: Option<EscapeFile>,
    #[serde(default)]
    pub trim_leading: bool,
    #[serde(default)]
    pub trim_trailing: bool,
    #[serde(default = "default_true")]
    pub enforce_symmetry: bool,
    #[serde(default)]
    pub bom: bool,
    #[serde(default = "default_encoding_label")]
    pub encoding: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub standard: String,
    #[serde(default)]
    pub file_extension: String,
}

fn default_true() -> bool {
    true
}

fn default_encoding_label() -> String {
    "UTF-8".to_string()
}

impl DialectFile {
    /// Builds a [`SyntaxBuilder`] from this file, resolving the encoding
    /// label via `encoding_rs`, then defers all cross-field validation
    /// to [`SyntaxBuilder::build`].
    pub fn into_builder(self) -> Result<SyntaxBuilder> {
        let encoding = encoding_rs::Encoding::for_label(self.encoding.as_bytes())
            .ok_or_else(|| SynformError::build(format!("unknown encoding label '{}'", self.encoding)))?;

        let quote = match SynFormat::from(self.format) {
            SynFormat::Csv => QuoteSpec::Csv {
                quote: self.quote.csv_quote.unwrap_or('"'),
                mode: self.quote.csv_mode.map(QuoteMode::from).unwrap_or(QuoteMode::Auto),
            },
            SynFormat::Ini => {
                if self.quote.ini_single.is_none() && self.quote.ini_double.is_none() {
                    QuoteSpec::None
                } else {
                    QuoteSpec::Ini {
                        single: self.quote.ini_single,
                        double: self.quote.ini_double,
                    }
                }
            }
        };

        let escape = self.escape.map(|e| crate::syntax::EscapeRules {
            escape_char: e.escape_char,
            allowed_outside_quotes: e.allowed_outside_quotes,
            is_special: e.escape_map.iter().map(|(_, literal)| *literal).collect(),
            escape_map: e.escape_map,
            unicode_prefixes: e
                .unicode_prefixes
                .into_iter()
                .map(|(prefix_char, min_digits, max_digits, radix)| crate::syntax::UnicodePrefix {
                    prefix_char,
                    min_digits,
                    max_digits,
                    radix,
                })
                .collect(),
        });

        let builder = SyntaxBuilder::new(self.format.into())
            .delimiters(self.delimiters)
            .line_terminator(self.line_terminator)
            .quote(quote)
            .comments(self.comments)
            .nesting(NestingConfig {
                object_op: self.nesting.object_op,
                array_op: self.nesting.array_op,
                relative: self.nesting.relative,
            })
            .duplicates(DuplicatePolicies {
                sections: self.duplicates.sections.into(),
                properties: self.duplicates.properties.into(),
            })
            .trim(self.trim_leading, self.trim_trailing)
            .enforce_symmetry(self.enforce_symmetry)
            .bom(self.bom)
            .encoding(encoding)
            .metadata(self.media_type, self.standard, self.file_extension);

        let builder = match self.section_brackets {
            Some((open, close)) => builder.section_brackets(open, close),
            None => builder,
        };
        let builder = match escape {
            Some(rules) => builder.escape(rules),
            None => builder,
        };
        Ok(builder)
    }

    pub fn from_syntax(syntax: &Syntax) -> Self {
        let quote = match &syntax.quote {
            QuoteSpec::Csv { quote, mode } => QuoteFile {
                csv_quote: Some(*quote),
                csv_mode: Some(match mode {
                    QuoteMode::Always => QuoteModeFile::Always,
                    QuoteMode::None => QuoteModeFile::None,
                    QuoteMode::Auto => QuoteModeFile::Auto,
                }),
                ini_single: None,
                ini_double: None,
            },
            QuoteSpec::Ini { single, double } => QuoteFile {
                csv_quote: None,
                csv_mode: None,
                ini_single: *single,
                ini_double: *double,
            },
            QuoteSpec::None => QuoteFile::default(),
        };

        let escape = syntax.escape.as_ref().map(|e| EscapeFile {
            escape_char: e.escape_char,
            allowed_outside_quotes: e.allowed_outside_quotes,
            escape_map: e.escape_map.clone(),
            unicode_prefixes: e
                .unicode_prefixes
                .iter()
                .map(|p| (p.prefix_char, p.min_digits, p.max_digits, p.radix))
                .collect(),
        });

        DialectFile {
            format: syntax.format.into(),
            delimiters: syntax.delimiters.clone(),
            line_terminator: syntax.line_terminator.clone(),
            quote,
            comments: syntax.comments.clone(),
            section_brackets: syntax.section_brackets,
            nesting: NestingFile {
                object_op: syntax.nesting.object_op,
                array_op: syntax.nesting.array_op,
                relative: syntax.nesting.relative,
            },
            duplicates: DuplicatesFile {
                sections: syntax.duplicates.sections.into(),
                properties: syntax.duplicates.properties.into(),
            },
            escape,
            trim_leading: syntax.trim_leading,
            trim_trailing: syntax.trim_trailing,
            enforce_symmetry: syntax.enforce_symmetry,
            bom: syntax.bom,
            encoding: syntax.encoding.name().to_string(),
            media_type: syntax.media_type.clone(),
            standard: syntax.standard.clone(),
            file_extension: syntax.file_extension.clone(),
        }
    }

    pub fn load(path: &Path) -> Result<Syntax> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let dialect: DialectFile = if is_json(path) {
            serde_json::from_reader(reader).map_err(|e| SynformError::build(format!("parsing dialect JSON: {e}")))?
        } else {
            serde_yaml::from_reader(reader).map_err(|e| SynformError::build(format!("parsing dialect YAML: {e}")))?
        };
        dialect.into_builder()?.build()
    }

    pub fn save(syntax: &Syntax, path: &Path) -> Result<()> {
        let dialect = DialectFile::from_syntax(syntax);
        let file = File::create(path)?;
        if is_json(path) {
            serde_json::to_writer_pretty(file, &dialect).map_err(|e| SynformError::build(format!("writing dialect JSON: {e}")))?;
        } else {
            serde_yaml::to_writer(file, &dialect).map_err(|e| SynformError::build(format!("writing dialect YAML: {e}")))?;
        }
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Resolves a named built-in preset (spec.md §6's four dialects plus
/// TSV), used by the `dialects` CLI subcommand and as the default when
/// `--dialect-file` is absent.
pub fn resolve_preset(name: &str) -> Result<Syntax> {
    match name {
        "rfc4180" => crate::syntax::csv::rfc4180(),
        "tsv" => crate::syntax::csv::tsv(),
        "ini-generic" => crate::syntax::ini::generic(),
        "ini-unix" => crate::syntax::ini::unix(),
        "ini-properties" => crate::syntax::ini::properties(),
        "ini-winapi" => crate::syntax::ini::winapi(),
        other => Err(SynformError::build(format!("unknown dialect preset '{other}'"))),
    }
}

pub const PRESET_NAMES: &[&str] = &["rfc4180", "tsv", "ini-generic", "ini-unix", "ini-properties", "ini-winapi"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_rfc4180_through_dialect_file() {
        let syntax = crate::syntax::csv::rfc4180().unwrap();
        let file = DialectFile::from_syntax(&syntax);
        let rebuilt = file.into_builder().unwrap().build().unwrap();
        assert_eq!(rebuilt.delimiters, syntax.delimiters);
        assert_eq!(rebuilt.line_terminator, syntax.line_terminator);
        assert_eq!(rebuilt.encoding.name(), syntax.encoding.name());
    }

    #[test]
    fn round_trips_unix_ini_escape_rules() {
        let syntax = crate::syntax::ini::unix().unwrap();
        let file = DialectFile::from_syntax(&syntax);
        let rebuilt = file.into_builder().unwrap().build().unwrap();
        assert!(rebuilt.escape.is_some());
        assert_eq!(rebuilt.nesting.object_op, syntax.nesting.object_op);
    }

    #[test]
    fn resolve_preset_rejects_unknown_name() {
        assert!(resolve_preset("does-not-exist").is_err());
    }
}
