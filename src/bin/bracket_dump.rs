use std::fs;
use std::path::PathBuf;

use knockout_predictor::bracket::BracketState;
use knockout_predictor::model::{MatchId, Slot, display_team};
use knockout_predictor::rows::parse_matches_json;

// Offline view of a saved sheet export: apply `id=Team` picks and print what the bracket
// would show. No network calls.
fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/matches.json"));

    let raw = fs::read_to_string(&path)?;
    let mut bracket = BracketState::from_records(parse_matches_json(&raw)?);

    for arg in args {
        let Some((id, team)) = arg.split_once('=') else {
            anyhow::bail!("expected id=Team, got {arg}");
        };
        let id: MatchId = id.trim().parse()?;
        let outcome = bracket.toggle_pick(id, team.trim());
        println!("pick {id}={}: {outcome:?}", team.trim());
    }

    match bracket.graph().terminal() {
        Some(id) => println!("Final: #{id}"),
        None => println!("Final: none"),
    }
    let propagation = bracket.propagation();
    println!(
        "Passes: {} (converged: {})",
        propagation.passes, propagation.converged
    );

    let layout = bracket.layout();
    for (col, spec) in layout.columns.iter().enumerate() {
        println!();
        println!("[{}] {} ({})", col, spec.label, spec.side.code());
        for id in layout.column_matches(col) {
            let y = layout.position(id).map_or(0.0, |p| p.y);
            let teams = bracket
                .participants(id)
                .map(|p| {
                    format!(
                        "{} vs {}",
                        display_team(p.get(Slot::A)),
                        display_team(p.get(Slot::B))
                    )
                })
                .unwrap_or_default();
            let pick = bracket
                .pick(id)
                .map(|p| format!("  pick: {p}"))
                .unwrap_or_default();
            println!("  #{id:<3} y={y:>6.0}  {teams}{pick}");
        }
    }

    Ok(())
}
