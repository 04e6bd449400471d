use pipelens::input::{parse_records, parse_records_lossy, InputError};

#[test]
fn parses_json_array() {
    let recs = parse_records(r#"  [{"tool": "jenkins"}, {"tool": "git"}]"#).unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[1].get_str("tool"), Some("git"));
}

#[test]
fn parses_ndjson_and_skips_blank_lines() {
    let text = "{\"tool\": \"a\"}\n\n{\"tool\": \"b\"}\n";
    let recs = parse_records(text).unwrap();
    assert_eq!(recs.len(), 2);
}

#[test]
fn unwraps_search_hit_envelopes() {
    let recs = parse_records(r#"[{"_id": "x", "_source": {"tool": "sonar", "bugs": 2}}]"#).unwrap();
    assert_eq!(recs[0].get_u64("bugs"), Some(2));
    assert!(!recs[0].has("_id"));

    // a non-object _source is kept as an ordinary field
    let recs = parse_records(r#"{"_source": "archive", "tool": "git"}"#).unwrap();
    assert_eq!(recs[0].get_str("_source"), Some("archive"));
}

#[test]
fn non_object_entries_are_errors() {
    match parse_records("[{\"a\": 1}, 3]") {
        Err(InputError::NotObject { index }) => assert_eq!(index, 1),
        other => panic!("expected NotObject, got {other:?}"),
    }
    match parse_records("{\"a\": 1}\nnot json") {
        Err(InputError::Line { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected Line error, got {other:?}"),
    }
}

#[test]
fn lossy_mode_counts_skipped_lines() {
    let text = "{\"a\": 1}\n[1]\n{broken\n{\"b\": 2}";
    let (recs, skipped) = parse_records_lossy(text);
    assert_eq!(recs.len(), 2);
    assert_eq!(skipped, 2);
}
