use std::collections::VecDeque;

use chrono::Utc;

use crate::bracket::{BracketState, IgnoreReason, PickOutcome};
use crate::layout::LayoutConfig;
use crate::leaderboard::{LeaderboardEntry, LeaderboardView};
use crate::model::{MatchId, MatchRecord, Slot, display_team};
use crate::persist::Draft;
use crate::propagate::PropagationOptions;
use crate::submit::{MatchMutation, SubmitReport, Submission};

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded { at: String },
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    EditingUsername,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub bracket: BracketState,
    pub status: LoadStatus,
    pub leaderboard: LeaderboardView,
    pub selected: Option<MatchId>,
    pub username: String,
    pub input_mode: InputMode,
    pub submitting: bool,
    pub syncing: bool,
    pub pending_draft: Option<Draft>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(LayoutConfig::default(), PropagationOptions::default())
    }
}

impl AppState {
    pub fn new(layout: LayoutConfig, options: PropagationOptions) -> Self {
        Self {
            bracket: BracketState::new(Vec::new(), layout, options),
            status: LoadStatus::Idle,
            leaderboard: LeaderboardView::Loading,
            selected: None,
            username: String::new(),
            input_mode: InputMode::Normal,
            submitting: false,
            syncing: false,
            pending_draft: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn draft(&self) -> Draft {
        Draft {
            username: self.username.trim().to_string(),
            picks: self.bracket.picks().clone(),
            saved_at: 0,
        }
    }

    pub fn submission(&self) -> Submission {
        Submission::from_picks(&self.username, self.bracket.picks())
    }

    pub fn selected_record(&self) -> Option<&MatchRecord> {
        self.selected.and_then(|id| self.bracket.record(id))
    }

    /// Keeps the cursor on an existing match, falling back to the first one on screen.
    pub fn ensure_selection(&mut self) {
        let order = self.bracket.layout().reading_order();
        let valid = self.selected.is_some_and(|id| order.contains(&id));
        if !valid {
            self.selected = order.first().copied();
        }
    }

    pub fn select_next(&mut self) {
        self.step_in_column(1);
    }

    pub fn select_prev(&mut self) {
        self.step_in_column(-1);
    }

    pub fn select_left(&mut self) {
        self.step_column(-1);
    }

    pub fn select_right(&mut self) {
        self.step_column(1);
    }

    fn step_in_column(&mut self, delta: isize) {
        let layout = self.bracket.layout();
        let Some(pos) = self.selected.and_then(|id| layout.position(id)) else {
            self.ensure_selection();
            return;
        };
        let column = layout.column_matches(pos.column);
        let Some(idx) = column.iter().position(|id| Some(*id) == self.selected) else {
            return;
        };
        let next = idx as isize + delta;
        if next >= 0 && (next as usize) < column.len() {
            self.selected = Some(column[next as usize]);
        }
    }

    /// Moves to the vertically closest match in the neighbouring non-empty column.
    fn step_column(&mut self, delta: isize) {
        let layout = self.bracket.layout();
        let Some(pos) = self.selected.and_then(|id| layout.position(id)) else {
            self.ensure_selection();
            return;
        };
        let mut col = pos.column as isize + delta;
        while col >= 0 && (col as usize) < layout.columns.len() {
            let candidates = layout.column_matches(col as usize);
            let closest = candidates.iter().copied().min_by(|a, b| {
                let ya = layout.position(*a).map_or(0.0, |p| (p.y - pos.y).abs());
                let yb = layout.position(*b).map_or(0.0, |p| (p.y - pos.y).abs());
                ya.total_cmp(&yb)
            });
            if let Some(id) = closest {
                self.selected = Some(id);
                return;
            }
            col += delta;
        }
    }

    /// Picks (or un-picks) the team in `slot` of the selected match and reports it.
    pub fn pick_selected(&mut self, slot: Slot) -> Option<PickOutcome> {
        let id = self.selected?;
        let team = self
            .bracket
            .participants(id)
            .map(|p| p.get(slot).to_string())
            .unwrap_or_default();
        let outcome = self.bracket.toggle_slot(id, slot);
        match outcome {
            PickOutcome::Picked | PickOutcome::Switched => {
                self.push_log(format!("[INFO] Match {id}: picked {team}"));
            }
            PickOutcome::Unpicked => {
                self.push_log(format!("[INFO] Match {id}: pick cleared"));
            }
            PickOutcome::Ignored(IgnoreReason::OfficialResult) => {
                self.push_log(format!("[INFO] Match {id} already has a result"));
            }
            PickOutcome::Ignored(IgnoreReason::BlankSlot) => {
                self.push_log(format!(
                    "[INFO] Match {id} slot {} is still {}",
                    slot.label(),
                    display_team("")
                ));
            }
            PickOutcome::Ignored(_) => {}
        }
        Some(outcome)
    }

    pub fn clear_picks(&mut self) {
        let cleared = self.bracket.clear_picks();
        if cleared > 0 {
            self.push_log(format!("[INFO] Cleared {cleared} picks"));
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    MatchesLoading,
    SetMatches(Vec<MatchRecord>),
    MatchesFailed(String),
    SetLeaderboard(Vec<LeaderboardEntry>),
    SubmitFinished(SubmitReport),
    SubmitFailed(String),
    SyncFinished,
    SyncFailed(String),
    AdvancesPushed(SubmitReport),
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    FetchMatches,
    FetchLeaderboard,
    Submit(Submission),
    SyncBracket,
    PushOfficialAdvances(Vec<MatchMutation>),
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::MatchesLoading => {
            state.status = LoadStatus::Loading;
        }
        Delta::SetMatches(records) => {
            let count = records.len();
            state.bracket.replace_records(records);
            if let Some(draft) = state.pending_draft.take() {
                let wanted = draft.picks.len();
                let kept = state.bracket.restore_picks(draft.picks);
                if state.username.trim().is_empty() {
                    state.username = draft.username;
                }
                if wanted > 0 {
                    state.push_log(format!("[INFO] Restored {kept}/{wanted} draft picks"));
                }
            }
            state.status = LoadStatus::Loaded {
                at: Utc::now().format("%H:%M:%S UTC").to_string(),
            };
            state.ensure_selection();
            state.push_log(format!("[INFO] Loaded {count} matches"));
            if state.bracket.graph().terminal().is_none() && count > 0 {
                state.push_log("[WARN] No final match found; showing a flat bracket");
            }
            if !state.bracket.propagation().converged {
                state.push_log("[WARN] Bracket wiring loops back on itself; showing best effort");
            }
        }
        Delta::MatchesFailed(err) => {
            // Keep whatever bracket was already on screen.
            state.status = LoadStatus::Failed(err.clone());
            state.push_log(format!("[WARN] Could not load bracket: {err}"));
        }
        Delta::SetLeaderboard(entries) => {
            state.leaderboard = LeaderboardView::from_entries(entries);
        }
        Delta::SubmitFinished(report) => {
            state.submitting = false;
            if report.is_complete() {
                state.push_log(format!("[INFO] Submitted ✅ ({})", report.summary()));
            } else {
                state.push_log(format!(
                    "[WARN] Submit incomplete: {}. Press s to retry",
                    report.summary()
                ));
            }
        }
        Delta::SubmitFailed(err) => {
            state.submitting = false;
            state.push_log(format!("[WARN] Submit failed: {err}. Press s to retry"));
        }
        Delta::SyncFinished => {
            state.syncing = false;
            state.push_log("[INFO] Synced ✅");
        }
        Delta::SyncFailed(err) => {
            state.syncing = false;
            state.push_log(format!("[WARN] Sync failed: {err}"));
        }
        Delta::AdvancesPushed(report) => {
            state.syncing = false;
            let level = if report.is_complete() { "INFO" } else { "WARN" };
            state.push_log(format!("[{level}] Official advances: {}", report.summary()));
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
