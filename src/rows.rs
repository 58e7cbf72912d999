use std::collections::HashSet;

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};

use crate::model::{MatchId, MatchRecord, Side, Slot, clean_team};

const KEY_MATCH_ID: &[&str] = &["MatchID", "Match ID", "Match_ID", "ID"];
const KEY_ROUND: &[&str] = &["Round"];
const KEY_TEAM_A: &[&str] = &["TeamA", "Team A", "Team_A"];
const KEY_TEAM_B: &[&str] = &["TeamB", "Team B", "Team_B"];
const KEY_WINNER: &[&str] = &["Winner"];
const KEY_NEXT_ID: &[&str] = &["NextMatchID", "Next Match ID", "Next_Match_ID"];
const KEY_NEXT_SLOT: &[&str] = &["NextSlot", "Next Slot", "Next_Slot"];
const KEY_SIDE: &[&str] = &["Side"];
const KEY_SEED: &[&str] = &["SeedY", "Seed Y", "Seed"];
const KEY_LOGO_A: &[&str] = &["LogoA", "Logo A"];
const KEY_LOGO_B: &[&str] = &["LogoB", "Logo B"];

/// Parses an opensheet-style body (a JSON array of row objects) into match records.
pub fn parse_matches_json(raw: &str) -> Result<Vec<MatchRecord>> {
    let rows = parse_rows_json(raw).context("invalid matches json")?;
    Ok(normalize_rows(&rows))
}

/// Splits a sheet response into its row objects. Empty and `null` bodies are an empty sheet.
pub fn parse_rows_json(raw: &str) -> Result<Vec<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("body is not json")?;
    match root {
        Value::Array(rows) => Ok(rows),
        Value::Object(obj) => {
            let message = obj
                .get("error")
                .and_then(as_string)
                .unwrap_or_else(|| "unexpected object".to_string());
            Err(anyhow!("sheet returned an error: {message}"))
        }
        Value::Null => Ok(Vec::new()),
        other => Err(anyhow!("expected an array of rows, got {other}")),
    }
}

pub fn normalize_rows(rows: &[Value]) -> Vec<MatchRecord> {
    let mut seen: HashSet<MatchId> = HashSet::with_capacity(rows.len());
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(obj) = row.as_object() else {
            continue;
        };
        let Some(record) = normalize_row(obj) else {
            continue;
        };
        // First row wins on duplicate ids.
        if seen.insert(record.id) {
            records.push(record);
        }
    }
    records
}

pub fn normalize_row(row: &Map<String, Value>) -> Option<MatchRecord> {
    let id = pick_int(row, KEY_MATCH_ID)?;
    let next_match_id = pick_int(row, KEY_NEXT_ID);
    let next_slot = pick_string(row, KEY_NEXT_SLOT).and_then(|raw| Slot::parse(&raw));

    Some(MatchRecord {
        id,
        round: pick_string(row, KEY_ROUND).unwrap_or_default(),
        team_a: clean_team(&pick_string(row, KEY_TEAM_A).unwrap_or_default()),
        team_b: clean_team(&pick_string(row, KEY_TEAM_B).unwrap_or_default()),
        official_winner: clean_team(&pick_string(row, KEY_WINNER).unwrap_or_default()),
        next_match_id,
        next_slot,
        side: pick_string(row, KEY_SIDE).and_then(|raw| Side::parse(&raw)),
        seed_position: pick_int(row, KEY_SEED).filter(|seed| *seed > 0),
        logo_a: pick_string(row, KEY_LOGO_A),
        logo_b: pick_string(row, KEY_LOGO_B),
    })
}

/// Case-insensitive column lookup. Blank cells count as missing.
pub(crate) fn pick_string(row: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(v) = lookup(row, key)
            && let Some(s) = as_string(v)
        {
            return Some(s);
        }
    }
    None
}

pub(crate) fn pick_int(row: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    for key in keys {
        if let Some(v) = lookup(row, key)
            && let Some(num) = as_strict_u32(v)
        {
            return Some(num);
        }
    }
    None
}

fn lookup<'a>(row: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    row.get(key).or_else(|| {
        row.iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

pub(crate) fn as_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() { None } else { Some(s) }
}

fn as_strict_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return u32::try_from(v).ok();
            }
            let f = n.as_f64()?;
            if f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64 {
                Some(f as u32)
            } else {
                None
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            trimmed.parse::<u32>().ok()
        }
        _ => None,
    }
}
