//! Shared formatter contract, warning log, and BOM byte table (spec.md
//! §4.7).
//!
//! `Formatter<E>` is generic over the expression type the same way
//! [`crate::parser::PrattParser`] is: the CSV formatters implement it for
//! [`crate::ast::CsvExpr`], the INI formatters for
//! [`crate::ast::IniExpr`]. Each concrete formatter picks its own
//! `Output` (a growing `String`, a byte sink with no return value, or an
//! in-memory `serde_json::Value`), matching spec.md's "three formatters
//! per format share a common `append` contract and expose `data()`".

use std::io::Write;

use crate::error::{Result, SynformError};
use crate::params::Params;
use crate::syntax::Syntax;

/// Consumes one expression tree, accumulating into `Self::Output`.
pub trait Formatter<E> {
    type Output;

    fn append(&mut self, node: &E, syntax: &Syntax, params: &mut Params) -> Result<()>;

    fn data(&self) -> &Self::Output;

    /// Warnings recorded during formatting (spec.md §7 "Warnings...
    /// do not abort"). Default: no warnings tracked.
    fn warnings(&self) -> &[String] {
        &[]
    }
}

/// Collects non-fatal formatting warnings (e.g. "character must be
/// escaped but the syntax forbids it", spec.md §4.7) and forwards each
/// one to the `log` crate at the moment it is recorded, so a warning is
/// never silently swallowed even if the caller never inspects
/// [`Formatter::warnings`].
#[derive(Debug, Default)]
pub struct FormatLog {
    pub messages: Vec<String>,
}

impl FormatLog {
    pub fn new() -> Self {
        FormatLog::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.messages.push(message);
    }
}

/// Byte-order-mark sequences for every encoding spec.md §4.7 enumerates.
/// Several of these (UTF-32, UTF-7, UTF-1, UTF-EBCDIC, SCSU, BOCU-1)
/// have no `encoding_rs` implementation — that crate deliberately limits
/// itself to the Encoding Standard's living set — so this table exists
/// for completeness and for dialects that supply their own encoder; the
/// formatters below only ever look up the BOM for `Syntax::encoding`'s
/// own name, which resolves through the first few entries plus
/// `GB18030`.
pub const BOM_TABLE: &[(&str, &[u8])] = &[
    ("UTF-8", &[0xEF, 0xBB, 0xBF]),
    ("UTF-16BE", &[0xFE, 0xFF]),
    ("UTF-16LE", &[0xFF, 0xFE]),
    ("UTF-32BE", &[0x00, 0x00, 0xFE, 0xFF]),
    ("UTF-32LE", &[0xFF, 0xFE, 0x00, 0x00]),
    ("UTF-7", &[0x2B, 0x2F, 0x76]),
    ("UTF-1", &[0xF7, 0x64, 0x4C]),
    ("UTF-EBCDIC", &[0xDD, 0x73, 0x66, 0x73]),
    ("SCSU", &[0x0E, 0xFE, 0xFF]),
    ("BOCU-1", &[0xFB, 0xEE, 0x28]),
    ("GB18030", &[0x84, 0x31, 0x95, 0x33]),
];

/// Looks up a BOM byte sequence by encoding label, case-insensitively
/// (`encoding_rs::Encoding::name()` returns e.g. `"UTF-8"`, `"gb18030"`).
pub fn bom_bytes(label: &str) -> Option<&'static [u8]> {
    BOM_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(label))
        .map(|(_, bytes)| *bytes)
}

/// Writes the BOM for `syntax.encoding` to `sink` iff `syntax.bom` is set
/// and this encoding has a known BOM sequence (spec.md §9 Open Question
/// (c): "BOM handling... implementers should support BOM for both [CSV
/// and INI] on read and write" — both file formatters call this once,
/// before their first payload byte).
pub fn write_bom<W: Write>(sink: &mut W, syntax: &Syntax) -> Result<()> {
    if syntax.bom
        && let Some(bytes) = bom_bytes(syntax.encoding.name())
    {
        sink.write_all(bytes)?;
    }
    Ok(())
}

/// Encodes `text` per `syntax.encoding` and writes the resulting bytes.
pub fn write_encoded<W: Write>(sink: &mut W, text: &str, syntax: &Syntax) -> Result<()> {
    let (bytes, _, had_errors) = syntax.encoding.encode(text);
    if had_errors {
        return Err(SynformError::format(format!(
            "failed to encode output text using encoding '{}'",
            syntax.encoding.name()
        )));
    }
    sink.write_all(&bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_bytes_looks_up_case_insensitively() {
        assert_eq!(bom_bytes("utf-8"), Some(&[0xEFu8, 0xBB, 0xBF][..]));
        assert_eq!(bom_bytes("GB18030"), Some(&[0x84u8, 0x31, 0x95, 0x33][..]));
        assert_eq!(bom_bytes("nonexistent"), None);
    }
}
