//! Per-parse mutable scratch area (spec.md §3 `Params`).
//!
//! Exclusively owned by one [`crate::converter::Converter`] for the
//! duration of one conversion. Several fields are "set at most once"
//! per spec.md's invariant table; those are guarded with an `assigned`
//! flag rather than re-checked ad hoc at every call site.

use crate::ast::CommentSet;
use crate::error::{Result, SynformError};

/// Per-parse mutable state shared between the parser, its commands, and
/// the formatters that eventually consume the resulting tree.
#[derive(Debug, Clone, Default)]
pub struct Params {
    header: Option<Vec<String>>,
    headerless: bool,
    header_assigned: bool,
    pub section_path: Vec<String>,
    pub row_count: usize,
    pub field_count: usize,
    pub pending_block_comments: Vec<String>,
    pub pending_inline_comment: Option<String>,
    pub inside_section_name: bool,
}

impl Params {
    pub fn new() -> Self {
        Params::default()
    }

    pub fn with_header(headers: Vec<String>) -> Self {
        Params {
            header: Some(headers),
            header_assigned: true,
            ..Params::default()
        }
    }

    pub fn headerless(mut self) -> Self {
        self.headerless = true;
        self.header_assigned = true;
        self
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn is_headerless(&self) -> bool {
        self.headerless
    }

    /// Sets the header exactly once; subsequent calls are an error, per
    /// spec.md's "fields set at most once where noted (header,
    /// headerless)".
    pub fn assign_header(&mut self, headers: Vec<String>) -> Result<()> {
        if self.header_assigned {
            return Err(SynformError::expression("header has already been assigned for this parse"));
        }
        self.header = Some(headers);
        self.header_assigned = true;
        Ok(())
    }

    pub fn take_pending_comments(&mut self) -> CommentSet {
        CommentSet {
            block: std::mem::take(&mut self.pending_block_comments),
            inline: self.pending_inline_comment.take(),
        }
    }

    pub fn reset_row_counters(&mut self) {
        self.field_count = 0;
        self.row_count += 1;
    }

    pub fn push_section_segment(&mut self, segment: String) {
        self.section_path.push(segment);
    }

    pub fn current_section_path(&self) -> &[String] {
        &self.section_path
    }
}
