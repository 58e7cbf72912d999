use std::collections::{BTreeMap, HashMap};

use crate::graph::BracketGraph;
use crate::model::{MatchId, MatchRecord, Side};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub card_height: f32,
    pub v_gap: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            card_height: 88.0,
            v_gap: 16.0,
        }
    }
}

impl LayoutConfig {
    pub fn spacing(&self) -> f32 {
        self.card_height + self.v_gap
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub side: Side,
    pub depth: usize,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutPosition {
    pub column: usize,
    /// Top edge of the card.
    pub y: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BracketLayout {
    pub columns: Vec<ColumnSpec>,
    pub positions: BTreeMap<MatchId, LayoutPosition>,
    pub card_height: f32,
    pub height: f32,
}

impl BracketLayout {
    pub fn position(&self, id: MatchId) -> Option<LayoutPosition> {
        self.positions.get(&id).copied()
    }

    pub fn center_y(&self, id: MatchId) -> Option<f32> {
        self.position(id).map(|p| p.y + self.card_height / 2.0)
    }

    /// Matches of one column, top to bottom.
    pub fn column_matches(&self, column: usize) -> Vec<MatchId> {
        let mut ids: Vec<(MatchId, f32)> = self
            .positions
            .iter()
            .filter(|(_, p)| p.column == column)
            .map(|(id, p)| (*id, p.y))
            .collect();
        ids.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        ids.into_iter().map(|(id, _)| id).collect()
    }

    /// Every match, column by column, top to bottom.
    pub fn reading_order(&self) -> Vec<MatchId> {
        (0..self.columns.len())
            .flat_map(|col| self.column_matches(col))
            .collect()
    }
}

type ColumnKey = (Side, usize);

fn column_key(graph: &BracketGraph, id: MatchId) -> ColumnKey {
    match graph.side(id) {
        Side::Center => (Side::Center, 0),
        side => (side, graph.depth(id)),
    }
}

/// Places every match so that each later-round card sits halfway between its two feeders.
///
/// Columns run outermost-left to the final to outermost-right. Both halves use the same
/// vertical math; only the column order is mirrored.
pub fn compute_layout(
    records: &[MatchRecord],
    graph: &BracketGraph,
    cfg: LayoutConfig,
) -> BracketLayout {
    let columns = column_specs(records, graph);
    let column_index: HashMap<ColumnKey, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| ((c.side, c.depth), i))
        .collect();

    let y = vertical_positions(records, graph, cfg);

    let positions = records
        .iter()
        .filter_map(|r| {
            let column = *column_index.get(&column_key(graph, r.id))?;
            let y = *y.get(&r.id)?;
            Some((r.id, LayoutPosition { column, y }))
        })
        .collect::<BTreeMap<_, _>>();

    let height = positions
        .values()
        .map(|p| p.y + cfg.card_height)
        .fold(0.0_f32, f32::max);

    BracketLayout {
        columns,
        positions,
        card_height: cfg.card_height,
        height,
    }
}

fn column_specs(records: &[MatchRecord], graph: &BracketGraph) -> Vec<ColumnSpec> {
    let mut rounds: HashMap<ColumnKey, Vec<&str>> = HashMap::new();
    for record in records {
        rounds
            .entry(column_key(graph, record.id))
            .or_default()
            .push(record.round.as_str());
    }

    let mut keys: Vec<ColumnKey> = Vec::new();
    let mut left: Vec<usize> = depths_for(&rounds, Side::Left);
    left.reverse();
    keys.extend(left.into_iter().map(|d| (Side::Left, d)));
    if rounds.contains_key(&(Side::Center, 0)) {
        keys.push((Side::Center, 0));
    }
    keys.extend(
        depths_for(&rounds, Side::Right)
            .into_iter()
            .map(|d| (Side::Right, d)),
    );

    keys.into_iter()
        .map(|(side, depth)| {
            let label = rounds
                .get(&(side, depth))
                .and_then(|names| most_common(names))
                .unwrap_or_else(|| {
                    match side {
                        Side::Left => "Left",
                        Side::Center => "Final",
                        Side::Right => "Right",
                    }
                    .to_string()
                });
            ColumnSpec { side, depth, label }
        })
        .collect()
}

fn depths_for(rounds: &HashMap<ColumnKey, Vec<&str>>, side: Side) -> Vec<usize> {
    let mut depths: Vec<usize> = rounds
        .keys()
        .filter(|(s, _)| *s == side)
        .map(|(_, d)| *d)
        .collect();
    depths.sort_unstable();
    depths
}

fn most_common(names: &[&str]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        match counts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, c)) => *c += 1,
            None => counts.push((name, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (name, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.to_string())
}

fn vertical_positions(
    records: &[MatchRecord],
    graph: &BracketGraph,
    cfg: LayoutConfig,
) -> HashMap<MatchId, f32> {
    let spacing = cfg.spacing();
    let seeds: HashMap<MatchId, Option<u32>> =
        records.iter().map(|r| (r.id, r.seed_position)).collect();
    let anchor = |id: MatchId| -> Option<f32> {
        seeds
            .get(&id)
            .copied()
            .flatten()
            .map(|seed| (seed.saturating_sub(1)) as f32 * spacing)
    };

    let mut y: HashMap<MatchId, f32> = HashMap::with_capacity(records.len());

    // Leaves: evenly stacked per column by seed, then sheet order.
    let mut leaves: BTreeMap<ColumnKey, Vec<(Option<u32>, usize, MatchId)>> = BTreeMap::new();
    for (pos, record) in records.iter().enumerate() {
        if graph.feeders(record.id).is_empty() {
            leaves
                .entry(column_key(graph, record.id))
                .or_default()
                .push((record.seed_position, pos, record.id));
        }
    }
    for stack in leaves.values_mut() {
        stack.sort_by_key(|(seed, pos, _)| (seed.unwrap_or(u32::MAX), *pos));
        for (row, (_, _, id)) in stack.iter().enumerate() {
            y.insert(*id, row as f32 * spacing);
        }
    }

    // Later rounds: feeders first, so walk from the deepest column inward.
    let mut inner: Vec<(usize, usize, MatchId)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| !y.contains_key(&r.id))
        .map(|(pos, r)| (graph.depth(r.id), pos, r.id))
        .collect();
    inner.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, _, id) in inner {
        let placed: Vec<f32> = graph
            .feeders(id)
            .iter()
            .filter_map(|f| y.get(f).copied())
            .collect();
        let at = match placed.as_slice() {
            [only] => *only,
            [a, b] => (a + b) / 2.0,
            _ => anchor(id).unwrap_or_else(|| {
                let side = graph.side(id);
                y.iter()
                    .filter(|(other, _)| graph.side(**other) == side)
                    .map(|(_, v)| *v + spacing)
                    .fold(0.0_f32, f32::max)
            }),
        };
        y.insert(id, at);
    }

    resolve_collisions(records, graph, &mut y, spacing);
    y
}

/// Pushes cards down until every pair in the same column is at least `spacing` apart.
fn resolve_collisions(
    records: &[MatchRecord],
    graph: &BracketGraph,
    y: &mut HashMap<MatchId, f32>,
    spacing: f32,
) {
    let mut columns: BTreeMap<ColumnKey, Vec<(usize, MatchId)>> = BTreeMap::new();
    for (pos, record) in records.iter().enumerate() {
        columns
            .entry(column_key(graph, record.id))
            .or_default()
            .push((pos, record.id));
    }

    for ids in columns.values_mut() {
        ids.sort_by(|a, b| {
            let ya = y.get(&a.1).copied().unwrap_or(0.0);
            let yb = y.get(&b.1).copied().unwrap_or(0.0);
            ya.total_cmp(&yb).then(a.0.cmp(&b.0))
        });
        for pair in 1..ids.len() {
            let prev = y.get(&ids[pair - 1].1).copied().unwrap_or(0.0);
            let cur = ids[pair].1;
            let min = prev + spacing;
            if y.get(&cur).copied().unwrap_or(0.0) < min {
                y.insert(cur, min);
            }
        }
    }
}
