use proptest::prelude::*;
use synform::convert::{csv_text_to_json, json_to_csv_text, HeaderSource};
use synform::syntax::csv::rfc4180;
use synform::syntax::ini::unix;

fn csv_safe_cell() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_]{1,10}"
}

proptest! {
    /// A CSV value free of delimiters/quotes/newlines round-trips through
    /// CSV -> JSON -> CSV unchanged, regardless of content (spec.md §8
    /// "round trip back to the original content").
    #[test]
    fn csv_json_csv_round_trip_preserves_plain_cell_values(
        a in csv_safe_cell(),
        b in csv_safe_cell(),
        c in csv_safe_cell(),
    ) {
        let syntax = rfc4180().unwrap();
        let input = format!("col_a,col_b,col_c\r\n{a},{b},{c}\r\n");
        let rows = csv_text_to_json(&input, &syntax, HeaderSource::FirstRow).expect("parse csv");
        let text = json_to_csv_text(&rows, &syntax, HeaderSource::FirstRow, false).expect("format csv");
        let reparsed = csv_text_to_json(&text, &syntax, HeaderSource::FirstRow).expect("reparse csv");
        prop_assert_eq!(rows, reparsed);
    }

    /// A value containing the delimiter, the quote character, or a
    /// newline forces quoting on the way out, but still reads back as the
    /// exact same string (spec.md §4.5 "unescaping doubled quotes").
    #[test]
    fn csv_json_csv_round_trip_preserves_values_needing_quoting(
        value in "[A-Za-z0-9,\"\n ]{1,12}",
    ) {
        let syntax = rfc4180().unwrap();
        let rows = vec![serde_json::json!({"field": value.clone()})];
        let text = json_to_csv_text(&rows, &syntax, HeaderSource::FirstRow, false).expect("format csv");
        let reparsed = csv_text_to_json(&text, &syntax, HeaderSource::FirstRow).expect("reparse csv");
        prop_assert_eq!(reparsed[0]["field"].as_str().unwrap(), value);
    }
}

proptest! {
    /// Any combination of section/key segments made of plain identifier
    /// characters round-trips through INI -> JSON -> INI with the same
    /// nested shape, since none of the chosen characters collide with the
    /// unix dialect's nesting operator or delimiter (spec.md §4.7).
    #[test]
    fn ini_json_ini_round_trip_preserves_nested_scalars(
        section in "[a-z]{2,8}",
        key in "[a-z]{2,8}",
        value in "[A-Za-z0-9 ]{0,10}",
    ) {
        let syntax = unix().unwrap();
        let input = format!("[{section}]\n{key} = {value}\n");
        let parsed = synform::convert::ini_text_to_json(&input, &syntax).expect("parse ini");
        let text = synform::convert::json_to_ini_text(&parsed, &syntax).expect("format ini");
        let reparsed = synform::convert::ini_text_to_json(&text, &syntax).expect("reparse ini");
        prop_assert_eq!(parsed, reparsed);
    }
}
