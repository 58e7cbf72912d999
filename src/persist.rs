use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::propagate::Picks;

const CACHE_DIR: &str = "knockout_predictor";
const CACHE_FILE: &str = "drafts.json";
const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct DraftFile {
    version: u32,
    drafts: HashMap<String, Draft>,
}

/// An unsubmitted set of picks for one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub picks: Picks,
    #[serde(default)]
    pub saved_at: u64,
}

pub fn load_draft(key: &str) -> Option<Draft> {
    let path = cache_path()?;
    load_draft_from(&path, key)
}

pub fn save_draft(key: &str, draft: &Draft) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    save_draft_to(&path, key, draft)
}

pub fn load_draft_from(path: &Path, key: &str) -> Option<Draft> {
    let raw = fs::read_to_string(path).ok()?;
    let file = serde_json::from_str::<DraftFile>(&raw).ok()?;
    if file.version != CACHE_VERSION {
        return None;
    }
    file.drafts.get(key).cloned()
}

pub fn save_draft_to(path: &Path, key: &str, draft: &Draft) -> Result<()> {
    let mut file = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<DraftFile>(&raw).ok())
        .filter(|f| f.version == CACHE_VERSION)
        .unwrap_or_default();
    file.version = CACHE_VERSION;

    let mut draft = draft.clone();
    draft.saved_at = system_time_to_secs(SystemTime::now()).unwrap_or_default();
    if draft.picks.is_empty() && draft.username.is_empty() {
        file.drafts.remove(key);
    } else {
        file.drafts.insert(key.to_string(), draft);
    }

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok();
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(&file).context("serialize drafts")?;
    fs::write(&tmp, json).context("write drafts")?;
    fs::rename(&tmp, path).context("swap drafts")?;
    Ok(())
}

fn cache_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(CACHE_FILE));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR).join(CACHE_FILE))
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("knockout_predictor_{}_{name}", std::process::id()));
        path.push(CACHE_FILE);
        path
    }

    #[test]
    fn drafts_round_trip_per_key() {
        let path = scratch("round_trip");
        let draft = Draft {
            username: "sam".to_string(),
            picks: Picks::from([(1, "X".to_string())]),
            saved_at: 0,
        };
        save_draft_to(&path, "sheet-a", &draft).unwrap();
        let loaded = load_draft_from(&path, "sheet-a").unwrap();
        assert_eq!(loaded.username, "sam");
        assert_eq!(loaded.picks, draft.picks);
        assert!(load_draft_from(&path, "sheet-b").is_none());
        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn empty_draft_removes_the_entry() {
        let path = scratch("clear");
        let draft = Draft {
            username: "sam".to_string(),
            ..Draft::default()
        };
        save_draft_to(&path, "k", &draft).unwrap();
        save_draft_to(&path, "k", &Draft::default()).unwrap();
        assert!(load_draft_from(&path, "k").is_none());
        fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
