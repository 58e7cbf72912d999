use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::{MatchId, MatchRecord, Side, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub source: MatchId,
    pub dest: MatchId,
    pub slot: Slot,
}

/// Wiring of a bracket: who feeds whom, which half each match sits in, and how far it is
/// from the final.
#[derive(Debug, Clone, Default)]
pub struct BracketGraph {
    order: Vec<MatchId>,
    index: HashMap<MatchId, usize>,
    edges: Vec<Edge>,
    outgoing: HashMap<MatchId, Edge>,
    incoming: HashMap<(MatchId, Slot), MatchId>,
    terminal: Option<MatchId>,
    sides: HashMap<MatchId, Side>,
    depths: HashMap<MatchId, usize>,
}

impl BracketGraph {
    pub fn build(records: &[MatchRecord]) -> Self {
        let order: Vec<MatchId> = records.iter().map(|r| r.id).collect();
        let index: HashMap<MatchId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut edges = Vec::new();
        let mut outgoing = HashMap::new();
        let mut incoming = HashMap::new();
        for record in records {
            let Some((dest, slot)) = record.edge() else {
                continue;
            };
            if dest == record.id || !index.contains_key(&dest) {
                continue;
            }
            // A destination slot has exactly one feeder; later claimants lose their edge.
            if incoming.contains_key(&(dest, slot)) {
                continue;
            }
            let edge = Edge {
                source: record.id,
                dest,
                slot,
            };
            incoming.insert((dest, slot), record.id);
            outgoing.insert(record.id, edge);
            edges.push(edge);
        }

        let mut graph = Self {
            order,
            index,
            edges,
            outgoing,
            incoming,
            terminal: None,
            sides: HashMap::new(),
            depths: HashMap::new(),
        };
        graph.terminal = graph.find_terminal(records);
        graph.sides = graph.assign_sides(records);
        graph.depths = graph.compute_depths();
        graph
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: MatchId) -> bool {
        self.index.contains_key(&id)
    }

    /// Match ids in sheet order.
    pub fn match_ids(&self) -> &[MatchId] {
        &self.order
    }

    pub fn position(&self, id: MatchId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn terminal(&self) -> Option<MatchId> {
        self.terminal
    }

    pub fn outgoing(&self, id: MatchId) -> Option<Edge> {
        self.outgoing.get(&id).copied()
    }

    pub fn source_of(&self, id: MatchId, slot: Slot) -> Option<MatchId> {
        self.incoming.get(&(id, slot)).copied()
    }

    /// Feeders of a match, slot A first.
    pub fn feeders(&self, id: MatchId) -> Vec<MatchId> {
        [Slot::A, Slot::B]
            .into_iter()
            .filter_map(|slot| self.source_of(id, slot))
            .collect()
    }

    pub fn side(&self, id: MatchId) -> Side {
        self.sides.get(&id).copied().unwrap_or(Side::Left)
    }

    pub fn depth(&self, id: MatchId) -> usize {
        self.depths.get(&id).copied().unwrap_or(1)
    }

    pub fn max_depth(&self, side: Side) -> usize {
        self.order
            .iter()
            .filter(|id| self.side(**id) == side)
            .map(|id| self.depth(*id))
            .max()
            .unwrap_or(0)
    }

    fn find_terminal(&self, records: &[MatchRecord]) -> Option<MatchId> {
        if let Some(final_round) = records.iter().find(|r| r.is_final_round()) {
            return Some(final_round.id);
        }

        let candidates: Vec<MatchId> = self
            .order
            .iter()
            .copied()
            .filter(|id| !self.outgoing.contains_key(id))
            .collect();
        match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => {
                let mut best: Option<(MatchId, usize)> = None;
                for id in candidates {
                    let size = self.upstream_count(id);
                    if best.is_none_or(|(_, best_size)| size > best_size) {
                        best = Some((id, size));
                    }
                }
                best.map(|(id, _)| id)
            }
        }
    }

    fn upstream_count(&self, id: MatchId) -> usize {
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(cur) = queue.pop_front() {
            for feeder in self.feeders(cur) {
                if seen.insert(feeder) {
                    queue.push_back(feeder);
                }
            }
        }
        seen.len() - 1
    }

    fn assign_sides(&self, records: &[MatchRecord]) -> HashMap<MatchId, Side> {
        let mut sides = HashMap::with_capacity(records.len());

        let Some(terminal) = self.terminal else {
            for record in records {
                sides.insert(record.id, record.side.unwrap_or(Side::Left));
            }
            return sides;
        };

        let round_halves = round_halves(records);
        for record in records {
            let side = if record.id == terminal {
                Side::Center
            } else if let Some(side) = record.side {
                side
            } else {
                match self.entry_slot(record.id, terminal) {
                    Some(Slot::A) => Side::Left,
                    Some(Slot::B) => Side::Right,
                    None => round_halves
                        .get(&record.id)
                        .copied()
                        .unwrap_or(Side::Left),
                }
            };
            sides.insert(record.id, side);
        }
        sides
    }

    /// Slot of the terminal that `id` eventually feeds, if a path exists.
    fn entry_slot(&self, id: MatchId, terminal: MatchId) -> Option<Slot> {
        let mut cur = id;
        for _ in 0..self.order.len() {
            let edge = self.outgoing(cur)?;
            if edge.dest == terminal {
                return Some(edge.slot);
            }
            cur = edge.dest;
        }
        None
    }

    fn compute_depths(&self) -> HashMap<MatchId, usize> {
        let mut depths = HashMap::with_capacity(self.order.len());
        let Some(terminal) = self.terminal else {
            for id in &self.order {
                depths.insert(*id, 1);
            }
            return depths;
        };

        depths.insert(terminal, 0);
        let mut queue = VecDeque::from([terminal]);
        while let Some(cur) = queue.pop_front() {
            let next_depth = depths.get(&cur).copied().unwrap_or(0) + 1;
            for feeder in self.feeders(cur) {
                if !depths.contains_key(&feeder) {
                    depths.insert(feeder, next_depth);
                    queue.push_back(feeder);
                }
            }
        }

        let detached = depths.values().copied().max().unwrap_or(0) + 1;
        for id in &self.order {
            depths.entry(*id).or_insert(detached);
        }
        depths
    }
}

/// Last-resort side guess: first half of each round's rows on the left, the rest on the right.
fn round_halves(records: &[MatchRecord]) -> HashMap<MatchId, Side> {
    let mut by_round: HashMap<String, Vec<MatchId>> = HashMap::new();
    for record in records {
        by_round
            .entry(record.round.to_lowercase())
            .or_default()
            .push(record.id);
    }
    let mut out = HashMap::with_capacity(records.len());
    for ids in by_round.values() {
        let half = ids.len().div_ceil(2);
        for (i, id) in ids.iter().enumerate() {
            out.insert(*id, if i < half { Side::Left } else { Side::Right });
        }
    }
    out
}
