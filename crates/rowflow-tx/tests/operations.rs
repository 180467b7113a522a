//! Catalog operator behavior, one case per operator family.

use rowflow_core::{FlowError, Mapper, Reducer, Row, Value};
use rowflow_tx::{
    Average, Count, Filter, FilterPunctuation, First, HaversineDistance, Hour, Identity,
    InverseDocumentFrequency, LowerCase, Product, Project, RoadTime, Speed, Split, Sum,
    TermFrequency, TopN, Weekday,
};
use serde_json::json;

fn row(v: serde_json::Value) -> Row {
    Row::try_from(v).unwrap()
}

fn apply_one(mapper: &impl Mapper, input: serde_json::Value) -> Row {
    let mut out = mapper.apply(row(input)).unwrap();
    assert_eq!(out.len(), 1);
    out.remove(0)
}

fn reduce_all(
    reducer: &impl Reducer,
    keys: &[&str],
    inputs: Vec<serde_json::Value>,
) -> Vec<Row> {
    let keys: Vec<String> = keys.iter().map(|k| (*k).to_owned()).collect();
    let mut rows = inputs.into_iter().map(row).map(Ok);
    reducer.reduce(&keys, &mut rows).unwrap()
}

fn float(r: &Row, column: &str) -> f64 {
    r.get(column).and_then(|v| v.as_f64()).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "{actual} not within 1e-3 of {expected}"
    );
}

#[test]
fn identity_yields_the_row() {
    let input = json!({"a": 1, "b": "x"});
    assert_eq!(
        Identity.apply(row(input.clone())).unwrap(),
        vec![row(input)]
    );
}

#[test]
fn filter_punctuation_strips_ascii_punctuation() {
    let out = apply_one(
        &FilterPunctuation::new("text"),
        json!({"text": "NO, GOD! plEasE... NOOO!?"}),
    );
    assert_eq!(out.get("text"), Some(&"NO GOD plEasE NOOO".into()));
}

#[test]
fn lower_case_is_ascii_only() {
    let out = apply_one(&LowerCase::new("text"), json!({"text": "Hello WORLD"}));
    assert_eq!(out.get("text"), Some(&"hello world".into()));
}

#[test]
fn split_emits_one_row_per_word() {
    let out = Split::new("text")
        .apply(row(json!({"doc_id": 7, "text": "one two  three"})))
        .unwrap();
    let words: Vec<&str> = out
        .iter()
        .map(|r| r.get("text").and_then(|v| v.as_str()).unwrap())
        .collect();
    assert_eq!(words, vec!["one", "two", "three"]);
    for r in &out {
        assert_eq!(r.get("doc_id"), Some(&7i64.into()));
    }
}

#[test]
fn split_of_empty_text_emits_the_empty_string() {
    let out = Split::new("text").apply(row(json!({"text": "..."}))).unwrap();
    assert_eq!(out, vec![row(json!({"text": ""}))]);
    let out = Split::new("text").apply(row(json!({"text": ""}))).unwrap();
    assert_eq!(out, vec![row(json!({"text": ""}))]);
}

#[test]
fn split_on_separator_characters() {
    let out = Split::on_any_of("text", ",;")
        .apply(row(json!({"text": "a,b;;c"})))
        .unwrap();
    let words: Vec<&str> = out
        .iter()
        .map(|r| r.get("text").and_then(|v| v.as_str()).unwrap())
        .collect();
    assert_eq!(words, vec!["a", "b", "c"]);
}

#[test]
fn product_multiplies_columns() {
    let out = apply_one(
        &Product::new(&["a", "b", "c"], "product"),
        json!({"a": 2, "b": 3, "c": 4}),
    );
    assert_eq!(out.get("product"), Some(&24i64.into()));

    let out = apply_one(&Product::new(&["a", "b"], "p"), json!({"a": 2, "b": 0.5}));
    assert_eq!(out.get("p"), Some(&1.0f64.into()));
}

#[test]
fn filter_keeps_matching_rows_only() {
    let filter = Filter::new(|r: &Row| r.get("n").and_then(|v| v.as_i64()).unwrap_or(0) > 1);
    assert!(filter.apply(row(json!({"n": 1}))).unwrap().is_empty());
    assert_eq!(filter.apply(row(json!({"n": 2}))).unwrap().len(), 1);
}

#[test]
fn project_keeps_listed_columns() {
    let out = apply_one(&Project::new(&["a", "c"]), json!({"a": 1, "b": 2, "c": 3}));
    assert_eq!(out, row(json!({"a": 1, "c": 3})));
}

#[test]
fn project_fails_on_missing_column() {
    let err = Project::new(&["a", "zz"])
        .apply(row(json!({"a": 1})))
        .unwrap_err();
    assert!(matches!(err, FlowError::MissingColumn { column, .. } if column == "zz"));
}

#[test]
fn haversine_distance_moscow_block() {
    let out = apply_one(
        &HaversineDistance::new("start", "end", "distance"),
        json!({
            "start": [37.61729811111, 55.75582511111],
            "end": [37.62729811111, 55.75682511111],
        }),
    );
    assert_close(float(&out, "distance"), 0.635711);

    let out = apply_one(
        &HaversineDistance::new("start", "end", "distance"),
        json!({"start": [37.617, 55.755], "end": [37.617, 55.755]}),
    );
    assert_eq!(float(&out, "distance"), 0.0);
}

#[test]
fn road_time_in_seconds() {
    let mapper = RoadTime::new("enter_time", "leave_time", "road_time");
    let out = apply_one(
        &mapper,
        json!({"enter_time": "20231128T183807.417100", "leave_time": "20231128T190807.417100"}),
    );
    assert_eq!(float(&out, "road_time"), 1800.0);

    let out = apply_one(
        &mapper,
        json!({"enter_time": "19991128T210807.300000", "leave_time": "19991128T230807.300000"}),
    );
    assert_eq!(float(&out, "road_time"), 7200.0);
}

#[test]
fn road_time_rejects_malformed_timestamps() {
    let err = RoadTime::new("enter_time", "leave_time", "road_time")
        .apply(row(json!({"enter_time": "2023-11-28 18:38", "leave_time": "x"})))
        .unwrap_err();
    assert!(matches!(err, FlowError::InvalidDatetime { .. }));
}

#[test]
fn weekday_abbreviations() {
    let mapper = Weekday::new("datetime", "weekday");
    let out = apply_one(&mapper, json!({"datetime": "20231128T191500.000000"}));
    assert_eq!(out.get("weekday"), Some(&"Tue".into()));
    let out = apply_one(&mapper, json!({"datetime": "20231120T101500.000000"}));
    assert_eq!(out.get("weekday"), Some(&"Mon".into()));
}

#[test]
fn hour_of_day() {
    let mapper = Hour::new("datetime", "hour");
    let out = apply_one(&mapper, json!({"datetime": "20231128T191500.000000"}));
    assert_eq!(out.get("hour"), Some(&19i64.into()));
    let out = apply_one(&mapper, json!({"datetime": "20231120T101500.000000"}));
    assert_eq!(out.get("hour"), Some(&10i64.into()));
}

#[test]
fn speed_in_km_per_hour() {
    let mapper = Speed::new("distance", "time", "speed");
    let out = apply_one(&mapper, json!({"distance": 4, "time": 360000}));
    assert_close(float(&out, "speed"), 0.04);
    let out = apply_one(&mapper, json!({"distance": 1000, "time": 72000}));
    assert_close(float(&out, "speed"), 50.0);
}

#[test]
fn speed_surfaces_division_by_zero() {
    let err = Speed::new("distance", "time", "speed")
        .apply(row(json!({"distance": 4, "time": 0})))
        .unwrap_err();
    assert!(matches!(err, FlowError::DivisionByZero { .. }));
}

#[test]
fn speed_rejects_non_numeric_input() {
    let err = Speed::new("distance", "time", "speed")
        .apply(row(json!({"distance": "far", "time": 10})))
        .unwrap_err();
    assert!(matches!(
        err,
        FlowError::TypeMismatch { column, found, .. } if column == "distance" && found == "string"
    ));
}

#[test]
fn inverse_document_frequency_is_log_ratio() {
    let mapper = InverseDocumentFrequency::new("total_docs", "word_docs");
    for (docs, expected) in [(100, 2.302585), (10, 4.605170), (1, 6.907755)] {
        let out = apply_one(&mapper, json!({"total_docs": 1000, "word_docs": docs}));
        assert_close(float(&out, "idf"), expected);
    }
}

#[test]
fn first_keeps_the_first_row_of_the_run() {
    let out = reduce_all(
        &First,
        &["k"],
        vec![json!({"k": 1, "n": 10}), json!({"k": 1, "n": 20})],
    );
    assert_eq!(out, vec![row(json!({"k": 1, "n": 10}))]);
}

#[test]
fn count_emits_key_and_count() {
    let out = reduce_all(
        &Count::new("d"),
        &["a"],
        vec![
            json!({"a": 1, "b": 5, "c": 2}),
            json!({"a": 1, "b": 6, "c": 1}),
        ],
    );
    assert_eq!(out, vec![row(json!({"a": 1, "d": 2}))]);
}

#[test]
fn count_without_keys_emits_bare_total() {
    let out = reduce_all(&Count::new("total"), &[], vec![json!({"x": 1}), json!({"x": 2})]);
    assert_eq!(out, vec![row(json!({"total": 2}))]);
}

#[test]
fn sum_keeps_column_name_and_intness() {
    let out = reduce_all(
        &Sum::new("b"),
        &["a"],
        vec![
            json!({"a": 1, "b": 2, "c": 4}),
            json!({"a": 1, "b": 3, "c": 5}),
        ],
    );
    assert_eq!(out, vec![row(json!({"a": 1, "b": 5}))]);

    let out = reduce_all(
        &Sum::new("b"),
        &["a"],
        vec![json!({"a": 1, "b": 2}), json!({"a": 1, "b": 0.5})],
    );
    assert_eq!(out, vec![row(json!({"a": 1, "b": 2.5}))]);
}

#[test]
fn average_is_always_a_float() {
    let out = reduce_all(
        &Average::new("b"),
        &["a"],
        vec![json!({"a": 1, "b": 2, "f": 4}), json!({"a": 1, "b": 8, "f": 5})],
    );
    assert_eq!(out, vec![row(json!({"a": 1, "b": 5.0}))]);
}

#[test]
fn top_n_is_descending_with_stable_ties() {
    let out = reduce_all(
        &TopN::new("score", 3),
        &[],
        vec![
            json!({"id": 1, "score": 5}),
            json!({"id": 2, "score": 9}),
            json!({"id": 3, "score": 5}),
            json!({"id": 4, "score": 1}),
        ],
    );
    let ids: Vec<i64> = out
        .iter()
        .map(|r| r.get("id").and_then(|v| v.as_i64()).unwrap())
        .collect();
    assert_eq!(ids, vec![2, 1, 3]);
}

#[test]
fn term_frequency_normalizes_counts() {
    let out = reduce_all(
        &TermFrequency::new("text"),
        &["doc_id"],
        vec![
            json!({"doc_id": 1, "text": "a"}),
            json!({"doc_id": 1, "text": "b"}),
            json!({"doc_id": 1, "text": "a"}),
            json!({"doc_id": 1, "text": "a"}),
        ],
    );
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].get("text"), Some(&"a".into()));
    assert_close(float(&out[0], "tf"), 0.75);
    assert_eq!(out[1].get("text"), Some(&"b".into()));
    assert_close(float(&out[1], "tf"), 0.25);
    for r in &out {
        assert_eq!(r.get("doc_id"), Some(&1i64.into()));
    }
}

#[test]
fn term_frequency_without_keys_has_only_word_and_frequency() {
    let out = reduce_all(
        &TermFrequency::new("text"),
        &[],
        vec![json!({"doc_id": 1, "text": "a"}), json!({"doc_id": 2, "text": "a"})],
    );
    assert_eq!(out, vec![row(json!({"text": "a", "tf": 1.0}))]);
}

#[test]
fn sum_rejects_non_numeric_values() {
    let keys: Vec<String> = vec!["a".into()];
    let mut rows = vec![row(json!({"a": 1, "b": "x"}))].into_iter().map(Ok);
    let err = Sum::new("b").reduce(&keys, &mut rows).unwrap_err();
    assert!(matches!(err, FlowError::TypeMismatch { .. }));
}

#[test]
fn value_kinds_are_preserved_through_mappers() {
    let out = apply_one(&Identity, json!({"i": 3, "f": 3.5, "s": "x", "b": true, "n": null}));
    assert_eq!(out.get("i"), Some(&Value::Int(3)));
    assert_eq!(out.get("f"), Some(&Value::Float(3.5)));
    assert_eq!(out.get("b"), Some(&Value::Bool(true)));
    assert_eq!(out.get("n"), Some(&Value::Null));
}
