use serde::{Deserialize, Serialize};

pub type MatchId = u32;

pub const TBD_LABEL: &str = "TBD";

const BLANK_SENTINELS: [&str; 5] = ["tbd", "bye", "?", "null", "undefined"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Slot::A),
            "B" => Some(Slot::B),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Slot::A => "A",
            Slot::B => "B",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Left,
    Center,
    Right,
}

impl Side {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "L" => Some(Side::Left),
            "R" => Some(Side::Right),
            "C" => Some(Side::Center),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Center => "C",
            Side::Right => "R",
        }
    }
}

/// One canonical bracket fixture, as read from the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub round: String,
    pub team_a: String,
    pub team_b: String,
    pub official_winner: String,
    pub next_match_id: Option<MatchId>,
    pub next_slot: Option<Slot>,
    pub side: Option<Side>,
    pub seed_position: Option<u32>,
    #[serde(default)]
    pub logo_a: Option<String>,
    #[serde(default)]
    pub logo_b: Option<String>,
}

impl MatchRecord {
    pub fn new(id: MatchId, round: &str, team_a: &str, team_b: &str) -> Self {
        Self {
            id,
            round: round.trim().to_string(),
            team_a: clean_team(team_a),
            team_b: clean_team(team_b),
            official_winner: String::new(),
            next_match_id: None,
            next_slot: None,
            side: None,
            seed_position: None,
            logo_a: None,
            logo_b: None,
        }
    }

    pub fn feeding(mut self, next_match_id: MatchId, slot: Slot) -> Self {
        self.next_match_id = Some(next_match_id);
        self.next_slot = Some(slot);
        self
    }

    pub fn on_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn seeded(mut self, seed: u32) -> Self {
        self.seed_position = (seed > 0).then_some(seed);
        self
    }

    pub fn won_by(mut self, winner: &str) -> Self {
        self.official_winner = clean_team(winner);
        self
    }

    /// Outbound edge; only present when both the next id and the slot parsed.
    pub fn edge(&self) -> Option<(MatchId, Slot)> {
        match (self.next_match_id, self.next_slot) {
            (Some(next), Some(slot)) => Some((next, slot)),
            _ => None,
        }
    }

    pub fn declared(&self, slot: Slot) -> &str {
        match slot {
            Slot::A => &self.team_a,
            Slot::B => &self.team_b,
        }
    }

    pub fn has_official_winner(&self) -> bool {
        !is_blank(&self.official_winner)
    }

    pub fn is_final_round(&self) -> bool {
        self.round.eq_ignore_ascii_case("final")
    }
}

/// The pair of teams currently shown for a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
    pub slot_a: String,
    pub slot_b: String,
}

impl Participants {
    pub fn new(slot_a: impl Into<String>, slot_b: impl Into<String>) -> Self {
        Self {
            slot_a: slot_a.into(),
            slot_b: slot_b.into(),
        }
    }

    pub fn get(&self, slot: Slot) -> &str {
        match slot {
            Slot::A => &self.slot_a,
            Slot::B => &self.slot_b,
        }
    }

    pub fn set(&mut self, slot: Slot, team: String) {
        match slot {
            Slot::A => self.slot_a = team,
            Slot::B => self.slot_b = team,
        }
    }

    /// Returns the participant spelling matching `team`, ignoring case.
    pub fn find(&self, team: &str) -> Option<&str> {
        if is_blank(team) {
            return None;
        }
        [self.slot_a.as_str(), self.slot_b.as_str()]
            .into_iter()
            .find(|candidate| !is_blank(candidate) && equal_team(candidate, team))
    }

    pub fn contains(&self, team: &str) -> bool {
        self.find(team).is_some()
    }

    pub fn display(&self, slot: Slot) -> &str {
        display_team(self.get(slot))
    }
}

/// Trims a cell and collapses every "not known yet" marker to the empty string.
pub fn clean_team(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_blank(trimmed) {
        String::new()
    } else {
        trimmed.to_string()
    }
}

pub fn is_blank(team: &str) -> bool {
    let trimmed = team.trim();
    trimmed.is_empty()
        || BLANK_SENTINELS
            .iter()
            .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
}

pub fn equal_team(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub fn display_team(team: &str) -> &str {
    if is_blank(team) { TBD_LABEL } else { team }
}

pub fn abbreviate_team(name: &str) -> String {
    let trimmed = name.trim();
    if is_blank(trimmed) {
        return String::new();
    }
    if trimmed.chars().count() <= 3 {
        return trimmed.to_uppercase();
    }
    let abbr: String = trimmed
        .split_whitespace()
        .take(2)
        .filter_map(|part| part.chars().next())
        .collect();
    if abbr.chars().count() >= 2 {
        return abbr.to_uppercase();
    }
    trimmed.chars().take(3).collect::<String>().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_collapse_to_blank() {
        for raw in ["", "  ", "TBD", "tbd", " Bye ", "?", "NULL", "undefined"] {
            assert_eq!(clean_team(raw), "", "{raw:?} should be blank");
        }
        assert_eq!(clean_team("  Brazil "), "Brazil");
    }

    #[test]
    fn participants_find_ignores_case_but_not_blanks() {
        let p = Participants::new("Spain", "");
        assert_eq!(p.find("spain"), Some("Spain"));
        assert_eq!(p.find(""), None);
        assert_eq!(p.find("TBD"), None);
        assert_eq!(p.display(Slot::B), TBD_LABEL);
    }

    #[test]
    fn abbreviations_follow_word_initials() {
        assert_eq!(abbreviate_team("Real Madrid"), "RM");
        assert_eq!(abbreviate_team("psg"), "PSG");
        assert_eq!(abbreviate_team("Liverpool"), "LIV");
        assert_eq!(abbreviate_team("TBD"), "");
    }
}
