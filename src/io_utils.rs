//! I/O utilities: stdio/file routing and character-encoding
//! transcoding (spec.md §1 treats both as external collaborators the
//! core calls into, not reimplements).
//!
//! Kept from the teacher's own `io_utils.rs`: the `-` stdin/stdout
//! convention (`is_dash`), encoding resolution via `encoding_rs`
//! (`resolve_encoding`), and `decode_bytes`. Dropped: every helper that
//! wrapped the `csv` crate's own reader/writer builders — `synform`'s
//! CSV engine is the hand-built lexer/parser in `csv_lexer.rs`/
//! `csv_commands.rs`, so there is no `csv::Reader`/`csv::Writer` left to
//! configure (see DESIGN.md for the dropped-dependency note).

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

/// Resolves an `--*-encoding` CLI value (or `None` for the default) to
/// an `encoding_rs` label, the same fallback-to-UTF-8 behavior the
/// teacher's `resolve_encoding` had.
pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes()).ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Opens `path` for reading, or stdin when `path` is `-`.
pub fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening input file {path:?}"))?,
        )))
    }
}

/// Opens `path` for writing, or stdout when `path` is `-` or absent.
pub fn open_writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) if !is_dash(p) => Ok(Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("creating output file {p:?}"))?,
        ))),
        _ => Ok(Box::new(io::stdout())),
    }
}

/// Reads all of `path` (or stdin) into memory, stripping a byte-order
/// mark if present before transcoding — the text lexers never see BOM
/// bytes, matching spec.md §9 Open Question (c): BOM support is
/// symmetric across both formats on read, not just on write.
pub fn read_all(path: &Path) -> Result<Vec<u8>> {
    let mut reader = open_reader(path)?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).with_context(|| format!("reading {path:?}"))?;
    Ok(strip_known_bom(bytes))
}

fn strip_known_bom(mut bytes: Vec<u8>) -> Vec<u8> {
    for (_, bom) in crate::formatter::BOM_TABLE {
        if bytes.starts_with(bom) {
            bytes.drain(..bom.len());
            return bytes;
        }
    }
    bytes
}

/// Decodes `bytes` using `encoding`, failing loudly on malformed input
/// rather than silently substituting replacement characters.
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!("failed to decode text with encoding {}", encoding.name()))
    } else {
        Ok(text.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_dash_recognizes_the_stdio_convention() {
        assert!(is_dash(Path::new("-")));
        assert!(!is_dash(Path::new("-x")));
    }

    #[test]
    fn resolve_encoding_defaults_to_utf8() {
        assert_eq!(resolve_encoding(None).unwrap().name(), "UTF-8");
        assert_eq!(resolve_encoding(Some("utf-16le")).unwrap().name(), "UTF-16LE");
        assert!(resolve_encoding(Some("not-a-real-encoding")).is_err());
    }

    #[test]
    fn strip_known_bom_removes_utf8_bom_only_once() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"a,b\n");
        let stripped = strip_known_bom(bytes);
        assert_eq!(stripped, b"a,b\n");
    }
}
