use std::fs;
use std::path::PathBuf;

use knockout_predictor::model::{Side, Slot};
use knockout_predictor::rows::{normalize_rows, parse_matches_json, parse_rows_json};
use serde_json::json;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_matches_fixture() {
    let records = parse_matches_json(&read_fixture("matches.json")).expect("fixture should parse");
    assert_eq!(records.len(), 7);
    let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);

    let first = &records[0];
    assert_eq!(first.round, "Quarterfinal");
    assert_eq!(first.team_a, "Brazil");
    assert_eq!(first.next_match_id, Some(5));
    assert_eq!(first.next_slot, Some(Slot::A));
    assert_eq!(first.side, Some(Side::Left));
    assert_eq!(first.seed_position, Some(1));
}

#[test]
fn duplicate_ids_keep_the_first_row() {
    let records = parse_matches_json(&read_fixture("matches.json")).unwrap();
    let third = records.iter().find(|r| r.id == 3).unwrap();
    assert_eq!(third.team_a, "Spain");
}

#[test]
fn placeholder_teams_read_as_blank() {
    let records = parse_matches_json(&read_fixture("matches.json")).unwrap();
    let semi = records.iter().find(|r| r.id == 5).unwrap();
    assert_eq!(semi.team_a, "");
    assert_eq!(semi.team_b, "");
    let last = records.iter().find(|r| r.id == 7).unwrap();
    assert_eq!(last.next_match_id, None);
    assert_eq!(last.next_slot, None);
}

#[test]
fn numeric_cells_and_odd_headers_are_accepted() {
    let rows = vec![json!({
        "match id": 12,
        "round": "R16",
        "Team A": " Ghana ",
        "Team B": "bye",
        "next match id": 20.0,
        "next slot": "b",
        "side": "r",
    })];
    let records = normalize_rows(&rows);
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.id, 12);
    assert_eq!(r.team_a, "Ghana");
    assert_eq!(r.team_b, "");
    assert_eq!(r.next_match_id, Some(20));
    assert_eq!(r.next_slot, Some(Slot::B));
    assert_eq!(r.side, Some(Side::Right));
}

#[test]
fn rows_without_usable_ids_are_skipped() {
    let rows = vec![
        json!({"MatchID": "7a", "TeamA": "X"}),
        json!({"MatchID": -1, "TeamA": "X"}),
        json!({"MatchID": 1.5, "TeamA": "X"}),
        json!("not a row"),
        json!({"MatchID": "4", "TeamA": "Kept"}),
    ];
    let records = normalize_rows(&rows);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 4);
}

#[test]
fn empty_and_error_bodies() {
    assert!(parse_rows_json("").unwrap().is_empty());
    assert!(parse_rows_json("null").unwrap().is_empty());
    assert!(parse_rows_json("[]").unwrap().is_empty());

    let err = parse_rows_json(r#"{"error":"Sheet not found"}"#).unwrap_err();
    assert!(format!("{err:#}").contains("Sheet not found"));
    assert!(parse_rows_json("<html>").is_err());
    assert!(parse_rows_json("42").is_err());
}
