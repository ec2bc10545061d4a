//! Header-directed projection between flat CSV rows and nested JSON
//! (spec.md §4.6).
//!
//! A CSV header column name is a path string split on the dialect's
//! configured nesting operators (`.` for object descent, `#` for array
//! indexing by default, spec.md glossary "Nesting op / array op"). This
//! module parses those paths once per header, flattens a JSON value into
//! a first-seen-order header list (phase 1 of §4.6), and unflattens a row
//! of raw cell strings back into nested JSON (the reverse direction).

use std::collections::HashSet;

use serde_json::{Map, Value as JsonValue};

use crate::error::{Result, SynformError};
use crate::syntax::Syntax;

/// One segment of a parsed header path: either an object key or an
/// array index (spec.md §4.6 "a segment beginning with the array op is
/// an integer index; a segment beginning with the object op is a
/// property name; the first segment has no op prefix").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Object(String),
    Index(usize),
}

/// Whether a path's next segment expects its parent to be a JSON object
/// or array — threaded explicitly rather than inferred from whatever the
/// JSON value currently holds, per spec.md §9 "Header-path segment
/// disambiguation".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    Object,
    Array,
}

/// Splits a raw header string into its path segments using the dialect's
/// nesting configuration.
pub fn parse_header_path(header: &str, syntax: &Syntax) -> Result<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_is_index = false;

    let flush = |current: &mut String, is_index: bool, segments: &mut Vec<PathSegment>| -> Result<()> {
        if is_index {
            let idx: usize = current
                .parse()
                .map_err(|_| SynformError::expression(format!("header segment '{current}' is not a valid array index")))?;
            segments.push(PathSegment::Index(idx));
        } else {
            segments.push(PathSegment::Object(std::mem::take(current)));
        }
        current.clear();
        Ok(())
    };

    for ch in header.chars() {
        if Some(ch) == syntax.nesting.array_op {
            flush(&mut current, current_is_index, &mut segments)?;
            current_is_index = true;
        } else if Some(ch) == syntax.nesting.object_op {
            flush(&mut current, current_is_index, &mut segments)?;
            current_is_index = false;
        } else {
            current.push(ch);
        }
    }
    flush(&mut current, current_is_index, &mut segments)?;
    Ok(segments)
}

fn joiner_for(is_index: bool, syntax: &Syntax) -> String {
    let op = if is_index { syntax.nesting.array_op } else { syntax.nesting.object_op };
    op.map(|c| c.to_string()).unwrap_or_default()
}

/// Phase 1 of spec.md §4.6: walks every record and derives the header
/// array by enumerating reachable leaf paths in first-seen order.
/// Records with different shapes are tolerated — a path seen in a later
/// record that was absent from earlier ones is simply appended; phase 2
/// (row emission) back-fills it as an empty cell in the earlier rows by
/// resolving against the full header list regardless of which record
/// actually has the leaf.
pub fn flatten_headers(records: &[JsonValue], syntax: &Syntax) -> Vec<String> {
    let mut headers = Vec::new();
    let mut seen = HashSet::new();
    for record in records {
        collect_leaf_paths(record, String::new(), syntax, &mut headers, &mut seen);
    }
    headers
}

fn collect_leaf_paths(value: &JsonValue, prefix: String, syntax: &Syntax, headers: &mut Vec<String>, seen: &mut HashSet<String>) {
    match value {
        JsonValue::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let next = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}{}{key}", joiner_for(false, syntax))
                };
                collect_leaf_paths(child, next, syntax, headers, seen);
            }
        }
        JsonValue::Array(items) if !items.is_empty() => {
            for (idx, child) in items.iter().enumerate() {
                let next = format!("{prefix}{}{idx}", joiner_for(true, syntax));
                collect_leaf_paths(child, next, syntax, headers, seen);
            }
        }
        _ => {
            if !prefix.is_empty() && seen.insert(prefix.clone()) {
                headers.push(prefix);
            }
        }
    }
}

/// Resolves one header path against a row object, returning the raw
/// cell string (empty when the leaf is missing, spec.md §4.6 "missing
/// leaves emit empty FIELD").
pub fn resolve_cell<'a>(row: &'a JsonValue, header: &str, syntax: &Syntax) -> Result<&'a str> {
    let segments = parse_header_path(header, syntax)?;
    let mut current = row;
    for segment in &segments {
        current = match (segment, current) {
            (PathSegment::Object(key), JsonValue::Object(map)) => match map.get(key) {
                Some(v) => v,
                None => return Ok(""),
            },
            (PathSegment::Index(idx), JsonValue::Array(items)) => match items.get(*idx) {
                Some(v) => v,
                None => return Ok(""),
            },
            _ => return Ok(""),
        };
    }
    Ok(current.as_str().unwrap_or(""))
}

/// Reverse direction: unflattens one row's raw cells back into nested
/// JSON (spec.md §4.6 "Unflattening CSV → JSON"). `cells` and `headers`
/// must be the same length; the cell parser resolves each raw string to
/// a `JsonValue` leaf.
pub fn unflatten_row(headers: &[String], cells: &[String], syntax: &Syntax) -> Result<JsonValue> {
    let mut root = JsonValue::Object(Map::new());
    for (header, cell) in headers.iter().zip(cells.iter()) {
        let segments = parse_header_path(header, syntax)?;
        let leaf = (syntax.cell_parser)(cell);
        set_path(&mut root, &segments, 0, leaf)?;
    }
    Ok(root)
}

fn set_path(container: &mut JsonValue, segments: &[PathSegment], depth: usize, leaf: JsonValue) -> Result<()> {
    let segment = &segments[depth];
    let is_last = depth == segments.len() - 1;
    let child_parent = if !is_last {
        Some(match &segments[depth + 1] {
            PathSegment::Index(_) => Parent::Array,
            PathSegment::Object(_) => Parent::Object,
        })
    } else {
        None
    };

    match segment {
        PathSegment::Object(key) => {
            let map = container
                .as_object_mut()
                .ok_or_else(|| SynformError::expression(format!("path segment '{key}' expects an object parent")))?;
            if is_last {
                set_leaf(map.entry(key.clone()).or_insert(JsonValue::Null), leaf);
                return Ok(());
            }
            let wants_array = child_parent == Some(Parent::Array);
            if let Some(existing) = map.get(key) {
                if !container_compatible(existing, wants_array) {
                    // Name already used for an incompatible shape; per
                    // spec.md §8 scenario 2, the later insertion is
                    // dropped rather than overwriting the first one.
                    return Ok(());
                }
            } else {
                map.insert(key.clone(), empty_container(wants_array));
            }
            set_path(map.get_mut(key).unwrap(), segments, depth + 1, leaf)
        }
        PathSegment::Index(idx) => {
            let arr = container
                .as_array_mut()
                .ok_or_else(|| SynformError::expression(format!("path segment '#{idx}' expects an array parent")))?;
            while arr.len() <= *idx {
                arr.push(JsonValue::Null);
            }
            if is_last {
                set_leaf(&mut arr[*idx], leaf);
                return Ok(());
            }
            let wants_array = child_parent == Some(Parent::Array);
            if !container_compatible(&arr[*idx], wants_array) {
                return Ok(());
            }
            if arr[*idx].is_null() {
                arr[*idx] = empty_container(wants_array);
            }
            set_path(&mut arr[*idx], segments, depth + 1, leaf)
        }
    }
}

/// "Do not overwrite an existing non-null leaf" (spec.md §4.6).
fn set_leaf(slot: &mut JsonValue, leaf: JsonValue) {
    if slot.is_null() {
        *slot = leaf;
    }
}

fn container_compatible(existing: &JsonValue, wants_array: bool) -> bool {
    existing.is_null() || (wants_array && existing.is_array()) || (!wants_array && existing.is_object())
}

fn empty_container(is_array: bool) -> JsonValue {
    if is_array {
        JsonValue::Array(Vec::new())
    } else {
        JsonValue::Object(Map::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::csv::rfc4180;
    use serde_json::json;

    #[test]
    fn parses_mixed_object_and_index_segments() {
        let syntax = rfc4180().unwrap();
        let segments = parse_header_path("sibling3.child1", &syntax).unwrap();
        assert_eq!(segments, vec![PathSegment::Object("sibling3".into()), PathSegment::Object("child1".into())]);

        let segments = parse_header_path("sibling3#0", &syntax).unwrap();
        assert_eq!(segments, vec![PathSegment::Object("sibling3".into()), PathSegment::Index(0)]);
    }

    #[test]
    fn flatten_headers_collects_first_seen_leaf_paths() {
        let syntax = rfc4180().unwrap();
        let records = vec![json!({"a": "1", "b": {"c": "2"}}), json!({"a": "3", "d": "4"})];
        let headers = flatten_headers(&records, &syntax);
        assert_eq!(headers, vec!["a", "b.c", "d"]);
    }

    #[test]
    fn unflatten_row_builds_nested_object_for_dotted_header() {
        let syntax = rfc4180().unwrap();
        let headers = vec!["sibling1".to_string(), "sibling3.child1".to_string()];
        let cells = vec!["x".to_string(), "y".to_string()];
        let value = unflatten_row(&headers, &cells, &syntax).unwrap();
        assert_eq!(value, json!({"sibling1": "x", "sibling3": {"child1": "y"}}));
    }

    #[test]
    fn unflatten_row_drops_conflicting_array_insertion_after_object() {
        let syntax = rfc4180().unwrap();
        let headers = vec!["sibling3.child1".to_string(), "sibling3#0".to_string()];
        let cells = vec!["y".to_string(), "z".to_string()];
        let value = unflatten_row(&headers, &cells, &syntax).unwrap();
        // sibling3 was first declared as an object; the later array
        // insertion at the same key is dropped per spec.md §8 scenario 2.
        assert_eq!(value, json!({"sibling3": {"child1": "y"}}));
    }

    #[test]
    fn unflatten_row_does_not_overwrite_existing_non_null_leaf() {
        let syntax = rfc4180().unwrap();
        let headers = vec!["a".to_string(), "a".to_string()];
        let cells = vec!["first".to_string(), "second".to_string()];
        let value = unflatten_row(&headers, &cells, &syntax).unwrap();
        assert_eq!(value, json!({"a": "first"}));
    }

    #[test]
    fn resolve_cell_returns_empty_for_missing_leaf() {
        let syntax = rfc4180().unwrap();
        let row = json!({"a": "1"});
        assert_eq!(resolve_cell(&row, "b", &syntax).unwrap(), "");
        assert_eq!(resolve_cell(&row, "a", &syntax).unwrap(), "1");
    }
}
