use std::fs;
use std::path::PathBuf;

use knockout_predictor::leaderboard::{LeaderboardEntry, LeaderboardView};
use knockout_predictor::model::Slot;
use knockout_predictor::persist::Draft;
use knockout_predictor::propagate::Picks;
use knockout_predictor::rows::parse_matches_json;
use knockout_predictor::state::{AppState, Delta, LoadStatus, apply_delta};
use knockout_predictor::submit::SubmitReport;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn loaded_state() -> AppState {
    let mut state = AppState::default();
    let records = parse_matches_json(&read_fixture("matches.json")).unwrap();
    apply_delta(&mut state, Delta::SetMatches(records));
    state
}

#[test]
fn set_matches_loads_bracket_and_selects_first_card() {
    let state = loaded_state();
    assert_eq!(state.bracket.records().len(), 7);
    assert!(matches!(state.status, LoadStatus::Loaded { .. }));
    assert_eq!(state.selected, Some(1));
    assert!(state.logs.iter().any(|l| l.contains("Loaded 7 matches")));
}

#[test]
fn pending_draft_is_restored_and_revalidated() {
    let mut state = AppState::default();
    state.pending_draft = Some(Draft {
        username: "ana".to_string(),
        picks: Picks::from([(1, "Brazil".to_string()), (2, "Mexico".to_string())]),
        saved_at: 0,
    });
    let records = parse_matches_json(&read_fixture("matches.json")).unwrap();
    apply_delta(&mut state, Delta::SetMatches(records));

    assert!(state.pending_draft.is_none());
    assert_eq!(state.username, "ana");
    assert_eq!(state.bracket.pick(1), Some("Brazil"));
    assert_eq!(state.bracket.pick(2), None);
    assert!(state.logs.iter().any(|l| l.contains("Restored 1/2 draft picks")));
}

#[test]
fn failed_reload_keeps_the_current_bracket() {
    let mut state = loaded_state();
    state.bracket.toggle_pick(1, "Japan");
    apply_delta(&mut state, Delta::MatchesFailed("http 503".to_string()));
    assert_eq!(state.status, LoadStatus::Failed("http 503".to_string()));
    assert_eq!(state.bracket.records().len(), 7);
    assert_eq!(state.bracket.pick(1), Some("Japan"));
}

#[test]
fn picking_through_the_cursor() {
    let mut state = loaded_state();
    state.pick_selected(Slot::B);
    assert_eq!(state.bracket.pick(1), Some("Japan"));

    state.select_right();
    assert_eq!(state.selected, Some(5));
    let slot_a = state
        .bracket
        .participants(5)
        .map(|p| p.slot_a.clone())
        .unwrap_or_default();
    assert_eq!(slot_a, "Japan");

    state.select_left();
    state.select_next();
    assert_eq!(state.selected, Some(2));
    state.pick_selected(Slot::A);
    assert_eq!(state.bracket.pick(2), None);
    assert!(state.logs.back().is_some_and(|l| l.contains("already has a result")));
}

#[test]
fn clearing_picks_blanks_later_rounds() {
    let mut state = loaded_state();
    state.pick_selected(Slot::A);
    state.clear_picks();
    assert!(state.bracket.picks().is_empty());
    let slot_a = state
        .bracket
        .participants(5)
        .map(|p| p.slot_a.clone())
        .unwrap_or_default();
    assert_eq!(slot_a, "");
}

#[test]
fn leaderboard_and_submit_deltas() {
    let mut state = AppState::default();
    assert_eq!(state.leaderboard, LeaderboardView::Loading);
    apply_delta(&mut state, Delta::SetLeaderboard(Vec::new()));
    assert_eq!(state.leaderboard, LeaderboardView::Empty);
    apply_delta(
        &mut state,
        Delta::SetLeaderboard(vec![LeaderboardEntry {
            username: "ana".to_string(),
            points: "3".to_string(),
        }]),
    );
    assert!(matches!(state.leaderboard, LeaderboardView::Entries(ref e) if e.len() == 1));

    state.submitting = true;
    apply_delta(
        &mut state,
        Delta::SubmitFinished(SubmitReport {
            sent: vec![1],
            failed: vec![(5, "timeout".to_string())],
        }),
    );
    assert!(!state.submitting);
    assert!(state.logs.back().is_some_and(|l| l.contains("Press s to retry")));
}

#[test]
fn submission_comes_from_state() {
    let mut state = loaded_state();
    state.username = " ana ".to_string();
    state.pick_selected(Slot::A);
    let submission = state.submission();
    assert_eq!(submission.username, "ana");
    assert_eq!(submission.match_ids(), vec![1]);
    assert_eq!(state.draft().picks.len(), 1);
}

#[test]
fn log_is_bounded() {
    let mut state = AppState::default();
    for i in 0..250 {
        state.push_log(format!("[INFO] {i}"));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("[INFO] 50"));
}
