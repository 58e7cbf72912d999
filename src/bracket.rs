use tracing::{debug, warn};

use crate::graph::BracketGraph;
use crate::layout::{BracketLayout, LayoutConfig, compute_layout};
use crate::model::{MatchId, MatchRecord, Participants, Slot, equal_team, is_blank};
use crate::propagate::{Picks, Propagation, PropagationOptions, propagate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    Picked,
    Switched,
    Unpicked,
    Ignored(IgnoreReason),
}

impl PickOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, PickOutcome::Ignored(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownMatch,
    OfficialResult,
    BlankSlot,
    NotParticipant,
}

/// Everything the bracket view needs: sheet records, wiring, the user's picks and the
/// derived participants and layout. Every accepted mutation recomputes the derived parts
/// before returning.
#[derive(Debug, Clone, Default)]
pub struct BracketState {
    records: Vec<MatchRecord>,
    graph: BracketGraph,
    picks: Picks,
    propagation: Propagation,
    layout: BracketLayout,
    layout_cfg: LayoutConfig,
    options: PropagationOptions,
}

impl BracketState {
    pub fn new(
        records: Vec<MatchRecord>,
        layout_cfg: LayoutConfig,
        options: PropagationOptions,
    ) -> Self {
        let mut state = Self {
            layout_cfg,
            options,
            ..Self::default()
        };
        state.replace_records(records);
        state
    }

    pub fn from_records(records: Vec<MatchRecord>) -> Self {
        Self::new(records, LayoutConfig::default(), PropagationOptions::default())
    }

    /// Swaps in freshly loaded sheet data. Picks on matches that still exist are kept and
    /// re-validated against the new bracket.
    pub fn replace_records(&mut self, records: Vec<MatchRecord>) {
        self.graph = BracketGraph::build(&records);
        self.records = records;
        let graph = &self.graph;
        self.picks.retain(|id, _| graph.contains(*id));
        self.recompute();
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn record(&self, id: MatchId) -> Option<&MatchRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn graph(&self) -> &BracketGraph {
        &self.graph
    }

    pub fn picks(&self) -> &Picks {
        &self.picks
    }

    pub fn pick(&self, id: MatchId) -> Option<&str> {
        self.picks.get(&id).map(String::as_str)
    }

    pub fn participants(&self, id: MatchId) -> Option<&Participants> {
        self.propagation.participants(id)
    }

    pub fn propagation(&self) -> &Propagation {
        &self.propagation
    }

    pub fn layout(&self) -> &BracketLayout {
        &self.layout
    }

    pub fn layout_config(&self) -> LayoutConfig {
        self.layout_cfg
    }

    /// Click on a team: pick it, switch to it, or un-pick it when it is already the pick.
    pub fn toggle_pick(&mut self, id: MatchId, team: &str) -> PickOutcome {
        let Some(record) = self.record(id) else {
            return PickOutcome::Ignored(IgnoreReason::UnknownMatch);
        };
        if record.has_official_winner() {
            return PickOutcome::Ignored(IgnoreReason::OfficialResult);
        }
        if is_blank(team) {
            return PickOutcome::Ignored(IgnoreReason::BlankSlot);
        }
        let Some(found) = self
            .participants(id)
            .and_then(|p| p.find(team))
            .map(str::to_string)
        else {
            return PickOutcome::Ignored(IgnoreReason::NotParticipant);
        };

        let outcome = match self.picks.get(&id) {
            Some(current) if equal_team(current, &found) => {
                self.picks.remove(&id);
                PickOutcome::Unpicked
            }
            Some(_) => {
                self.picks.insert(id, found);
                PickOutcome::Switched
            }
            None => {
                self.picks.insert(id, found);
                PickOutcome::Picked
            }
        };
        debug!(match_id = id, ?outcome, "pick toggled");
        self.recompute();
        outcome
    }

    /// Click on whatever team currently occupies `slot`.
    pub fn toggle_slot(&mut self, id: MatchId, slot: Slot) -> PickOutcome {
        let Some(team) = self.participants(id).map(|p| p.get(slot).to_string()) else {
            return PickOutcome::Ignored(IgnoreReason::UnknownMatch);
        };
        self.toggle_pick(id, &team)
    }

    pub fn clear_picks(&mut self) -> usize {
        let cleared = self.picks.len();
        if cleared > 0 {
            self.picks.clear();
            self.recompute();
        }
        cleared
    }

    /// Loads previously saved picks; returns how many survived validation.
    pub fn restore_picks(&mut self, picks: Picks) -> usize {
        self.picks = picks;
        self.recompute();
        self.picks.len()
    }

    fn recompute(&mut self) {
        self.propagation = propagate(&self.records, &self.graph, &self.picks, self.options);
        if !self.propagation.converged {
            warn!(
                passes = self.propagation.passes,
                "propagation stopped at the pass limit; bracket wiring likely has a cycle"
            );
        }
        self.picks = self.propagation.picks.clone();
        self.layout = compute_layout(&self.records, &self.graph, self.layout_cfg);
    }
}
