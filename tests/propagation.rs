use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use knockout_predictor::bracket::{BracketState, IgnoreReason, PickOutcome};
use knockout_predictor::graph::BracketGraph;
use knockout_predictor::model::{MatchRecord, Participants, Slot, display_team};
use knockout_predictor::propagate::{Picks, PropagationOptions, pass_limit, propagate};
use knockout_predictor::rows::parse_matches_json;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture_bracket() -> BracketState {
    let records = parse_matches_json(&read_fixture("matches.json")).unwrap();
    BracketState::from_records(records)
}

fn slot(bracket: &BracketState, id: u32, slot: Slot) -> String {
    bracket
        .participants(id)
        .map(|p| p.get(slot).to_string())
        .unwrap_or_default()
}

#[test]
fn official_winners_flow_without_picks() {
    let bracket = fixture_bracket();
    assert_eq!(slot(&bracket, 5, Slot::B), "France");
    assert_eq!(slot(&bracket, 5, Slot::A), "");
    assert_eq!(slot(&bracket, 7, Slot::A), "");
    assert!(bracket.propagation().converged);
}

#[test]
fn pick_then_switch_then_unpick() {
    let mut bracket = fixture_bracket();

    assert_eq!(bracket.toggle_pick(1, "Brazil"), PickOutcome::Picked);
    assert_eq!(slot(&bracket, 5, Slot::A), "Brazil");

    assert_eq!(bracket.toggle_pick(1, "japan"), PickOutcome::Switched);
    assert_eq!(slot(&bracket, 5, Slot::A), "Japan");
    assert_eq!(bracket.pick(1), Some("Japan"));

    assert_eq!(bracket.toggle_pick(1, "Japan"), PickOutcome::Unpicked);
    assert_eq!(slot(&bracket, 5, Slot::A), "");
    assert_eq!(display_team(&slot(&bracket, 5, Slot::A)), "TBD");
    assert!(bracket.picks().is_empty());
}

#[test]
fn picks_on_decided_matches_are_ignored() {
    let mut bracket = fixture_bracket();
    let outcome = bracket.toggle_pick(2, "Mexico");
    assert_eq!(outcome, PickOutcome::Ignored(IgnoreReason::OfficialResult));
    assert!(!outcome.changed());
    assert!(bracket.picks().is_empty());
    assert_eq!(slot(&bracket, 5, Slot::B), "France");
}

#[test]
fn blank_and_foreign_teams_cannot_be_picked() {
    let mut bracket = fixture_bracket();
    assert_eq!(
        bracket.toggle_slot(5, Slot::A),
        PickOutcome::Ignored(IgnoreReason::BlankSlot)
    );
    assert_eq!(
        bracket.toggle_pick(1, "Spain"),
        PickOutcome::Ignored(IgnoreReason::NotParticipant)
    );
    assert_eq!(
        bracket.toggle_pick(99, "Spain"),
        PickOutcome::Ignored(IgnoreReason::UnknownMatch)
    );
}

#[test]
fn changing_an_early_pick_drops_stale_later_picks() {
    let mut bracket = fixture_bracket();
    bracket.toggle_pick(1, "Brazil");
    bracket.toggle_pick(5, "Brazil");
    bracket.toggle_pick(3, "Spain");
    bracket.toggle_pick(6, "Spain");
    bracket.toggle_pick(7, "Brazil");
    assert_eq!(bracket.picks().len(), 5);
    assert_eq!(slot(&bracket, 7, Slot::A), "Brazil");
    assert_eq!(slot(&bracket, 7, Slot::B), "Spain");

    bracket.toggle_pick(1, "Japan");
    assert_eq!(bracket.pick(5), None);
    assert_eq!(bracket.pick(7), None);
    assert_eq!(bracket.pick(6), Some("Spain"));
    assert_eq!(slot(&bracket, 7, Slot::A), "");
    assert_eq!(slot(&bracket, 7, Slot::B), "Spain");
}

#[test]
fn propagation_is_idempotent() {
    let records = parse_matches_json(&read_fixture("matches.json")).unwrap();
    let graph = BracketGraph::build(&records);
    let picks = Picks::from([
        (1, "Brazil".to_string()),
        (5, "France".to_string()),
        (7, "France".to_string()),
    ]);
    let once = propagate(&records, &graph, &picks, PropagationOptions::default());
    let twice = propagate(&records, &graph, &once.picks, PropagationOptions::default());
    assert_eq!(once.participants, twice.participants);
    assert_eq!(once.picks, twice.picks);
    assert_eq!(slot_of(&once.participants, 7, Slot::A), "France");
}

fn slot_of(participants: &BTreeMap<u32, Participants>, id: u32, slot: Slot) -> String {
    participants
        .get(&id)
        .map(|p| p.get(slot).to_string())
        .unwrap_or_default()
}

#[test]
fn cyclic_wiring_terminates() {
    let records = vec![
        MatchRecord::new(1, "R1", "", "Yankee").feeding(2, Slot::A),
        MatchRecord::new(2, "R1", "", "Zulu").feeding(1, Slot::A),
    ];
    let graph = BracketGraph::build(&records);
    let picks = Picks::from([(1, "Yankee".to_string()), (2, "Yankee".to_string())]);
    let out = propagate(&records, &graph, &picks, PropagationOptions::default());
    assert!(out.passes <= pass_limit(records.len()));
    assert_eq!(slot_of(&out.participants, 2, Slot::A), "Yankee");
}

#[test]
fn sheet_filled_slots_are_never_overwritten() {
    let records = vec![
        MatchRecord::new(1, "R1", "Alpha", "Beta").feeding(2, Slot::A),
        MatchRecord::new(2, "Final", "Gamma", "Delta"),
    ];
    let graph = BracketGraph::build(&records);
    let picks = Picks::from([(1, "Alpha".to_string())]);
    let out = propagate(&records, &graph, &picks, PropagationOptions::default());
    assert_eq!(slot_of(&out.participants, 2, Slot::A), "Gamma");
}

#[test]
fn replacing_records_keeps_picks_that_still_fit() {
    let mut bracket = fixture_bracket();
    bracket.toggle_pick(1, "Brazil");
    bracket.toggle_pick(3, "Morocco");

    let mut records = bracket.records().to_vec();
    if let Some(r) = records.iter_mut().find(|r| r.id == 3) {
        r.official_winner = "Spain".to_string();
    }
    bracket.replace_records(records);
    assert_eq!(bracket.pick(1), Some("Brazil"));
    assert_eq!(bracket.pick(3), None);
    assert_eq!(slot(&bracket, 6, Slot::A), "Spain");
}
