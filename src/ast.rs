//! Expression tree variants produced by the Pratt parser (spec.md §4.4).
//!
//! `CsvExpr` forms a right-leaning chain per row:
//! `Record(Separator(Field, sep, Separator(Field, sep, ...)), eol)`.
//! `IniExpr` forms an ordered map of ordered maps where leaves are
//! `Property` nodes holding ordered `KeyValue` lists.

use indexmap::IndexMap;

use crate::error::{Result, SynformError};
use crate::syntax::{DuplicatePolicy, Syntax};

/// Comments attached to an INI node: preceding block comments and one
/// optional trailing inline comment (spec.md §4.5 prefix/infix `COMMENT`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CommentSet {
    pub block: Vec<String>,
    pub inline: Option<String>,
}

impl CommentSet {
    pub fn is_empty(&self) -> bool {
        self.block.is_empty() && self.inline.is_none()
    }
}

/// CSV expression tree (spec.md §3, §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CsvExpr {
    Field(String),
    Quoted {
        open: String,
        field: Box<CsvExpr>,
        close: String,
    },
    Separator {
        left: Box<CsvExpr>,
        sep: String,
        right: Box<CsvExpr>,
    },
    Record {
        body: Box<CsvExpr>,
        eol: String,
    },
}

impl CsvExpr {
    /// Flattens a `Separator`/`Field`/`Quoted` chain into the ordered
    /// list of raw cell values a row resolves to (quote markers
    /// stripped, content as parsed).
    pub fn cells(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_cells(&mut out);
        out
    }

    fn collect_cells<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            CsvExpr::Field(value) => out.push(value.as_str()),
            CsvExpr::Quoted { field, .. } => field.collect_cells(out),
            CsvExpr::Separator { left, right, .. } => {
                left.collect_cells(out);
                right.collect_cells(out);
            }
            CsvExpr::Record { body, .. } => body.collect_cells(out),
        }
    }

    pub fn field_count(&self) -> usize {
        self.cells().len()
    }

    /// Reconstructs the original surface form (round-trippable when the
    /// syntax permits it), per spec.md §4.4 `debug()`.
    pub fn debug_render(&self) -> String {
        match self {
            CsvExpr::Field(value) => value.clone(),
            CsvExpr::Quoted { open, field, close } => {
                format!("{open}{}{close}", field.debug_render())
            }
            CsvExpr::Separator { left, sep, right } => {
                format!("{}{sep}{}", left.debug_render(), right.debug_render())
            }
            CsvExpr::Record { body, eol } => format!("{}{eol}", body.debug_render()),
        }
    }
}

/// INI expression tree (spec.md §3, §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IniExpr {
    Text(String),
    KeyValue {
        key: Box<IniExpr>,
        value: Box<IniExpr>,
        comments: CommentSet,
    },
    Property {
        values: Vec<IniExpr>,
    },
    Section {
        path: Vec<String>,
        entries: IndexMap<String, IniExpr>,
        comments: CommentSet,
    },
}

impl IniExpr {
    pub fn empty_section(path: Vec<String>) -> Self {
        IniExpr::Section {
            path,
            entries: IndexMap::new(),
            comments: CommentSet::default(),
        }
    }

    pub fn as_section_mut(&mut self) -> Option<(&mut Vec<String>, &mut IndexMap<String, IniExpr>)> {
        match self {
            IniExpr::Section { path, entries, .. } => Some((path, entries)),
            _ => None,
        }
    }

    /// Inserts a `KeyValue` into this section's `Property` entry for
    /// `key`, applying the configured property duplicate policy
    /// (spec.md §4.5 "Duplicate semantics").
    pub fn insert_property(&mut self, key: String, kv: IniExpr, policy: DuplicatePolicy) -> Result<()> {
        let (_, entries) = self
            .as_section_mut()
            .ok_or_else(|| SynformError::expression("insert_property called on a non-section node"))?;

        match entries.get_mut(&key) {
            None => {
                entries.insert(key, IniExpr::Property { values: vec![kv] });
            }
            Some(IniExpr::Property { values }) => match policy {
                DuplicatePolicy::Merge => values.push(kv),
                DuplicatePolicy::Overwrite => {
                    values.clear();
                    values.push(kv);
                }
                DuplicatePolicy::Discard => {}
                DuplicatePolicy::Throw => {
                    return Err(SynformError::expression(format!(
                        "duplicate property '{key}' is not permitted under the throw policy"
                    )));
                }
            },
            Some(IniExpr::Section { .. }) => {
                return Err(SynformError::expression(format!(
                    "'{key}' is already declared as a section"
                )));
            }
            Some(_) => {
                return Err(SynformError::expression(format!(
                    "'{key}' cannot hold a property value"
                )));
            }
        }
        Ok(())
    }

    /// Inserts a nested `Section` under this section's entries,
    /// applying the configured section duplicate policy.
    pub fn insert_section(&mut self, name: String, section: IniExpr, policy: DuplicatePolicy) -> Result<()> {
        let (_, entries) = self
            .as_section_mut()
            .ok_or_else(|| SynformError::expression("insert_section called on a non-section node"))?;

        // Mutate in place (rather than remove-then-reinsert) so a
        // merged/overwritten section keeps its first-seen position.
        match entries.get_mut(&name) {
            None => {
                entries.insert(name, section);
            }
            Some(existing @ IniExpr::Section { .. }) => match policy {
                DuplicatePolicy::Merge => {
                    let taken = std::mem::replace(existing, IniExpr::empty_section(Vec::new()));
                    *existing = merge_sections(taken, section, policy)?;
                }
                DuplicatePolicy::Overwrite => {
                    *existing = section;
                }
                DuplicatePolicy::Discard => {}
                DuplicatePolicy::Throw => {
                    return Err(SynformError::expression(format!(
                        "duplicate section '{name}' is not permitted under the throw policy"
                    )));
                }
            },
            Some(IniExpr::Property { .. }) => {
                return Err(SynformError::expression(format!(
                    "'{name}' is already declared as a property"
                )));
            }
            Some(_) => {
                return Err(SynformError::expression(format!("'{name}' has an incompatible shape")));
            }
        }
        Ok(())
    }

    /// Inserts `leaf` (a fully-built `Section`) at `path` relative to
    /// `self`, creating intermediate sections as needed (each tagged with
    /// its own prefix of `path`, spec.md §3 "full dotted name path").
    /// The final segment is attached via [`IniExpr::insert_section`], so
    /// the configured section duplicate policy applies only at the leaf —
    /// intermediate sections declared implicitly by a dotted path are
    /// never duplicates of anything.
    pub fn insert_section_path(&mut self, path: &[String], leaf: IniExpr, policy: DuplicatePolicy) -> Result<()> {
        self.insert_section_path_at(path, 0, leaf, policy)
    }

    fn insert_section_path_at(&mut self, path: &[String], depth: usize, leaf: IniExpr, policy: DuplicatePolicy) -> Result<()> {
        if path.is_empty() {
            return Err(SynformError::expression("cannot insert a section with an empty path"));
        }
        let is_last = depth == path.len() - 1;
        let name = path[depth].clone();

        if is_last {
            return self.insert_section(name, leaf, policy);
        }

        let (_, entries) = self
            .as_section_mut()
            .ok_or_else(|| SynformError::expression("insert_section_path called on a non-section node"))?;
        if !entries.contains_key(&name) {
            entries.insert(name.clone(), IniExpr::empty_section(path[..=depth].to_vec()));
        }
        let child = entries
            .get_mut(&name)
            .expect("just inserted or already present");
        child.insert_section_path_at(path, depth + 1, leaf, policy)
    }

    pub fn debug_render(&self, syntax: &Syntax) -> String {
        match self {
            IniExpr::Text(value) => value.clone(),
            IniExpr::KeyValue { key, value, .. } => {
                let delim = syntax.delimiters.first().copied().unwrap_or('=');
                format!("{}{delim}{}", key.debug_render(syntax), value.debug_render(syntax))
            }
            IniExpr::Property { values } => values
                .iter()
                .map(|v| v.debug_render(syntax))
                .collect::<Vec<_>>()
                .join(&syntax.line_terminator),
            IniExpr::Section { path, entries, .. } => {
                let joiner = syntax.nesting.object_op.map(|c| c.to_string()).unwrap_or_default();
                let (open, close) = syntax.section_brackets.unwrap_or(('[', ']'));
                let header = format!("{open}{}{close}", path.join(&joiner));
                let body = entries
                    .values()
                    .map(|v| v.debug_render(syntax))
                    .collect::<Vec<_>>()
                    .join(&syntax.line_terminator);
                format!("{header}{}{body}", syntax.line_terminator)
            }
        }
    }
}

/// Merges two `Section` nodes recursively: the child set is the union
/// of both, property lists are concatenated (spec.md §8 "For INI in
/// merge mode: inserting the same section twice...").
fn merge_sections(left: IniExpr, right: IniExpr, policy: DuplicatePolicy) -> Result<IniExpr> {
    let (left_path, mut left_entries, left_comments) = match left {
        IniExpr::Section { path, entries, comments } => (path, entries, comments),
        _ => return Err(SynformError::expression("merge_sections requires two sections")),
    };

    let right_entries = match right {
        IniExpr::Section { entries, .. } => entries,
        _ => return Err(SynformError::expression("merge_sections requires two sections")),
    };

    for (key, value) in right_entries {
        match left_entries.get_mut(&key) {
            None => {
                left_entries.insert(key, value);
            }
            Some(IniExpr::Property { values }) => {
                if let IniExpr::Property { values: more } = value {
                    values.extend(more);
                }
            }
            Some(existing @ IniExpr::Section { .. }) => {
                if let IniExpr::Section { .. } = value {
                    let taken = std::mem::replace(existing, IniExpr::empty_section(Vec::new()));
                    *existing = merge_sections(taken, value, policy)?;
                }
            }
            Some(_) => {}
        }
    }

    Ok(IniExpr::Section {
        path: left_path,
        entries: left_entries,
        comments: left_comments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax;

    fn kv(key: &str, value: &str) -> IniExpr {
        IniExpr::KeyValue {
            key: Box::new(IniExpr::Text(key.to_string())),
            value: Box::new(IniExpr::Text(value.to_string())),
            comments: CommentSet::default(),
        }
    }

    #[test]
    fn csv_record_collects_cells_in_order() {
        let expr = CsvExpr::Record {
            body: Box::new(CsvExpr::Separator {
                left: Box::new(CsvExpr::Field("a".into())),
                sep: ",".into(),
                right: Box::new(CsvExpr::Field("b".into())),
            }),
            eol: "\n".into(),
        };
        assert_eq!(expr.cells(), vec!["a", "b"]);
        assert_eq!(expr.field_count(), 2);
    }

    #[test]
    fn csv_debug_render_reconstructs_surface_form() {
        let expr = CsvExpr::Record {
            body: Box::new(CsvExpr::Separator {
                left: Box::new(CsvExpr::Quoted {
                    open: "\"".into(),
                    field: Box::new(CsvExpr::Field("a,b".into())),
                    close: "\"".into(),
                }),
                sep: ",".into(),
                right: Box::new(CsvExpr::Field("c".into())),
            }),
            eol: "\n".into(),
        };
        assert_eq!(expr.debug_render(), "\"a,b\",c\n");
    }

    #[test]
    fn property_merge_appends_values() {
        let mut section = IniExpr::empty_section(vec!["s".into()]);
        section
            .insert_property("k".into(), kv("k", "1"), DuplicatePolicy::Merge)
            .unwrap();
        section
            .insert_property("k".into(), kv("k", "2"), DuplicatePolicy::Merge)
            .unwrap();
        let (_, entries) = section.as_section_mut().unwrap();
        match entries.get("k").unwrap() {
            IniExpr::Property { values } => assert_eq!(values.len(), 2),
            _ => panic!("expected property"),
        }
    }

    #[test]
    fn property_throw_rejects_second_occurrence() {
        let mut section = IniExpr::empty_section(vec!["s".into()]);
        section
            .insert_property("k".into(), kv("k", "1"), DuplicatePolicy::Throw)
            .unwrap();
        let err = section.insert_property("k".into(), kv("k", "2"), DuplicatePolicy::Throw);
        assert!(err.is_err());
    }

    #[test]
    fn section_merge_unions_children_and_concatenates_properties() {
        let mut root = IniExpr::empty_section(vec![]);
        let mut first = IniExpr::empty_section(vec!["a".into()]);
        first.insert_property("k".into(), kv("k", "1"), DuplicatePolicy::Merge).unwrap();
        root.insert_section("a".into(), first, DuplicatePolicy::Merge).unwrap();

        let mut second = IniExpr::empty_section(vec!["a".into()]);
        second.insert_property("k".into(), kv("k", "2"), DuplicatePolicy::Merge).unwrap();
        second.insert_property("other".into(), kv("other", "x"), DuplicatePolicy::Merge).unwrap();
        root.insert_section("a".into(), second, DuplicatePolicy::Merge).unwrap();

        let (_, entries) = root.as_section_mut().unwrap();
        let (_, merged_entries) = entries.get_mut("a").unwrap().as_section_mut().unwrap();
        match merged_entries.get("k").unwrap() {
            IniExpr::Property { values } => assert_eq!(values.len(), 2),
            _ => panic!("expected property"),
        }
        assert!(merged_entries.contains_key("other"));
    }

    #[test]
    fn insert_section_path_creates_intermediate_sections() {
        let mut root = IniExpr::empty_section(vec![]);
        let mut leaf = IniExpr::empty_section(vec!["a".into(), "b".into()]);
        leaf.insert_property("k".into(), kv("k", "v"), DuplicatePolicy::Overwrite).unwrap();
        root.insert_section_path(&["a".into(), "b".into()], leaf, DuplicatePolicy::Merge).unwrap();

        let (_, entries) = root.as_section_mut().unwrap();
        let (a_path, a_entries) = entries.get_mut("a").unwrap().as_section_mut().unwrap();
        assert_eq!(a_path, &vec!["a".to_string()]);
        let (b_path, b_entries) = a_entries.get_mut("b").unwrap().as_section_mut().unwrap();
        assert_eq!(b_path, &vec!["a".to_string(), "b".to_string()]);
        assert!(b_entries.contains_key("k"));
    }

    #[test]
    fn debug_render_emits_bracketed_section_with_dotted_path() {
        let syntax = syntax::ini::generic().unwrap();
        let mut section = IniExpr::empty_section(vec!["a".into(), "b".into()]);
        section.insert_property("k".into(), kv("k", "v"), DuplicatePolicy::Overwrite).unwrap();
        let rendered = section.debug_render(&syntax);
        assert!(rendered.starts_with("[a.b]"));
        assert!(rendered.contains("k=v"));
    }
}
