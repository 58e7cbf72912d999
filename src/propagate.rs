use std::collections::{BTreeMap, HashMap};

use crate::graph::BracketGraph;
use crate::model::{MatchId, MatchRecord, Participants, Slot, is_blank};

pub type Picks = BTreeMap<MatchId, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationOptions {
    /// Advance the lone team of a match whose other slot is blank and has no feeder.
    pub auto_byes: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
    pub participants: BTreeMap<MatchId, Participants>,
    /// The input picks that survived validation against the fixpoint.
    pub picks: Picks,
    pub passes: usize,
    pub converged: bool,
}

impl Propagation {
    pub fn participants(&self, id: MatchId) -> Option<&Participants> {
        self.participants.get(&id)
    }
}

/// Upper bound on relaxation passes for a bracket of `matches` fixtures.
pub fn pass_limit(matches: usize) -> usize {
    matches * 2 + 2
}

/// Computes the displayed teams of every match from sheet teams, official winners and picks.
///
/// Each pass walks every edge in sheet order and rewrites the destination slot with the
/// feeder's resolved winner (or blank when it has none). Slots the sheet fills in itself are
/// never touched. Passes repeat until nothing changes or [`pass_limit`] is hit, so cyclic
/// wiring returns a best-effort state with `converged == false` instead of spinning.
pub fn propagate(
    records: &[MatchRecord],
    graph: &BracketGraph,
    picks: &Picks,
    options: PropagationOptions,
) -> Propagation {
    let by_id: HashMap<MatchId, &MatchRecord> = records.iter().map(|r| (r.id, r)).collect();
    let mut participants: BTreeMap<MatchId, Participants> = records
        .iter()
        .map(|r| (r.id, Participants::new(r.team_a.clone(), r.team_b.clone())))
        .collect();

    let limit = pass_limit(records.len());
    let mut passes = 0;
    let mut converged = false;
    while passes < limit {
        passes += 1;
        let mut changed = false;

        for edge in graph.edges() {
            let (Some(source), Some(dest)) = (by_id.get(&edge.source), by_id.get(&edge.dest))
            else {
                continue;
            };
            if !is_blank(dest.declared(edge.slot)) {
                continue;
            }
            let winner = participants
                .get(&edge.source)
                .and_then(|current| resolved_winner(source, current, picks, graph, options))
                .unwrap_or_default();
            if let Some(slots) = participants.get_mut(&edge.dest)
                && slots.get(edge.slot) != winner
            {
                slots.set(edge.slot, winner);
                changed = true;
            }
        }

        if !changed {
            converged = true;
            break;
        }
    }

    let picks = validate_picks(&by_id, &participants, picks);
    Propagation {
        participants,
        picks,
        passes,
        converged,
    }
}

/// The team a match sends forward right now, if any.
pub fn resolved_winner(
    record: &MatchRecord,
    current: &Participants,
    picks: &Picks,
    graph: &BracketGraph,
    options: PropagationOptions,
) -> Option<String> {
    if record.has_official_winner() {
        return current.find(&record.official_winner).map(str::to_string);
    }
    if let Some(pick) = picks.get(&record.id)
        && let Some(found) = current.find(pick)
    {
        return Some(found.to_string());
    }
    if options.auto_byes {
        return walkover(record.id, current, graph);
    }
    None
}

fn walkover(id: MatchId, current: &Participants, graph: &BracketGraph) -> Option<String> {
    for slot in [Slot::A, Slot::B] {
        let team = current.get(slot);
        let empty = slot.other();
        if !is_blank(team) && is_blank(current.get(empty)) && graph.source_of(id, empty).is_none()
        {
            return Some(team.to_string());
        }
    }
    None
}

fn validate_picks(
    by_id: &HashMap<MatchId, &MatchRecord>,
    participants: &BTreeMap<MatchId, Participants>,
    picks: &Picks,
) -> Picks {
    picks
        .iter()
        .filter_map(|(id, team)| {
            let record = by_id.get(id)?;
            if record.has_official_winner() {
                return None;
            }
            let found = participants.get(id)?.find(team)?;
            Some((*id, found.to_string()))
        })
        .collect()
}
