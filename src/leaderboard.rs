use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rows::{parse_rows_json, pick_string};

pub const NO_ENTRIES: &str = "No entries yet.";

const KEY_USERNAME: &[&str] = &["Username", "User", "Name"];
const KEY_POINTS: &[&str] = &["Points", "Score", "Pts"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    /// Kept as the sheet wrote it; scoring happens elsewhere.
    pub points: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LeaderboardView {
    #[default]
    Loading,
    Empty,
    Entries(Vec<LeaderboardEntry>),
}

impl LeaderboardView {
    pub fn from_entries(entries: Vec<LeaderboardEntry>) -> Self {
        if entries.is_empty() {
            LeaderboardView::Empty
        } else {
            LeaderboardView::Entries(entries)
        }
    }

    pub fn lines(&self) -> Vec<String> {
        match self {
            LeaderboardView::Loading => vec!["Loading…".to_string()],
            LeaderboardView::Empty => vec![NO_ENTRIES.to_string()],
            LeaderboardView::Entries(entries) => entries
                .iter()
                .enumerate()
                .map(|(i, e)| format!("{:>2}. {}  {} pts", i + 1, e.username, e.points))
                .collect(),
        }
    }
}

pub fn parse_leaderboard_json(raw: &str) -> Result<Vec<LeaderboardEntry>> {
    let rows = parse_rows_json(raw).context("invalid leaderboard json")?;
    Ok(normalize_leaderboard(&rows))
}

/// Rows without a username are skipped; a missing points cell reads as "0".
pub fn normalize_leaderboard(rows: &[Value]) -> Vec<LeaderboardEntry> {
    rows.iter()
        .filter_map(Value::as_object)
        .filter_map(|row| {
            let username = pick_string(row, KEY_USERNAME)?;
            let points = pick_string(row, KEY_POINTS).unwrap_or_else(|| "0".to_string());
            Some(LeaderboardEntry { username, points })
        })
        .collect()
}
