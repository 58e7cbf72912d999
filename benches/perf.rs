use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use knockout_predictor::graph::BracketGraph;
use knockout_predictor::layout::{LayoutConfig, compute_layout};
use knockout_predictor::model::{MatchId, MatchRecord, Side, Slot};
use knockout_predictor::propagate::{Picks, PropagationOptions, propagate};
use knockout_predictor::rows::parse_matches_json;

/// A full bracket of `teams` entrants (a power of two), wired round by round.
fn synthetic_bracket(teams: usize) -> Vec<MatchRecord> {
    let mut records = Vec::new();
    let mut round_ids: Vec<MatchId> = Vec::new();
    let mut next_id: MatchId = 1;

    let first = teams / 2;
    for i in 0..first {
        let a = format!("Team {}", i * 2 + 1);
        let b = format!("Team {}", i * 2 + 2);
        records.push(MatchRecord::new(next_id, "Round 1", &a, &b).seeded(i as u32 + 1));
        round_ids.push(next_id);
        next_id += 1;
    }

    let mut round = 2;
    while round_ids.len() > 1 {
        let label = if round_ids.len() == 2 {
            "Final".to_string()
        } else {
            format!("Round {round}")
        };
        let mut next_round = Vec::with_capacity(round_ids.len() / 2);
        for pair in round_ids.chunks(2) {
            let id = next_id;
            next_id += 1;
            for (feeder, slot) in pair.iter().zip([Slot::A, Slot::B]) {
                if let Some(r) = records.iter_mut().find(|r| r.id == *feeder) {
                    r.next_match_id = Some(id);
                    r.next_slot = Some(slot);
                }
            }
            records.push(MatchRecord::new(id, &label, "", ""));
            next_round.push(id);
        }
        round_ids = next_round;
        round += 1;
    }
    records
}

/// Picks slot A all the way through, so every later round gets filled.
fn favourite_picks(records: &[MatchRecord], graph: &BracketGraph) -> Picks {
    let mut picks = Picks::new();
    for _ in 0..graph.max_depth(Side::Left) + 2 {
        let prop = propagate(records, graph, &picks, PropagationOptions::default());
        for (id, participants) in &prop.participants {
            if !participants.slot_a.is_empty() {
                picks.entry(*id).or_insert_with(|| participants.slot_a.clone());
            }
        }
    }
    picks
}

fn bench_propagate_64(c: &mut Criterion) {
    let records = synthetic_bracket(64);
    let graph = BracketGraph::build(&records);
    let picks = favourite_picks(&records, &graph);
    c.bench_function("propagate_64_teams", |b| {
        b.iter(|| {
            let prop = propagate(
                black_box(&records),
                black_box(&graph),
                black_box(&picks),
                PropagationOptions::default(),
            );
            black_box(prop.passes);
        })
    });
}

fn bench_graph_build_64(c: &mut Criterion) {
    let records = synthetic_bracket(64);
    c.bench_function("graph_build_64_teams", |b| {
        b.iter(|| {
            let graph = BracketGraph::build(black_box(&records));
            black_box(graph.terminal());
        })
    });
}

fn bench_layout_64(c: &mut Criterion) {
    let records = synthetic_bracket(64);
    let graph = BracketGraph::build(&records);
    c.bench_function("layout_64_teams", |b| {
        b.iter(|| {
            let layout = compute_layout(black_box(&records), &graph, LayoutConfig::default());
            black_box(layout.height);
        })
    });
}

fn bench_matches_parse(c: &mut Criterion) {
    c.bench_function("matches_parse", |b| {
        b.iter(|| {
            let records = parse_matches_json(black_box(MATCHES_JSON)).unwrap();
            black_box(records.len());
        })
    });
}

criterion_group!(
    perf,
    bench_propagate_64,
    bench_graph_build_64,
    bench_layout_64,
    bench_matches_parse
);
criterion_main!(perf);

static MATCHES_JSON: &str = include_str!("../tests/fixtures/matches.json");
