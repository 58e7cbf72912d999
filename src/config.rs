use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::layout::LayoutConfig;
use crate::propagate::PropagationOptions;

const DEFAULT_SHEET_BASE_URL: &str = "https://opensheet.elk.sh";
const DEFAULT_MATCHES_TAB: &str = "Matches";
const DEFAULT_LEADERBOARD_TAB: &str = "Leaderboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStyle {
    /// One `{username, picks: [...]}` object per submission.
    Structured,
    /// One `[timestamp, username, matchId, pick]` row per pick.
    Rows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// The endpoint's reply is unreadable; reaching it counts as success.
    Opaque,
    /// Require a success status and no `error` field in a JSON reply.
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sheet_id: Option<String>,
    pub sheet_base_url: String,
    pub matches_tab: String,
    pub leaderboard_tab: String,
    pub matches_url: Option<String>,
    pub leaderboard_url: Option<String>,
    pub script_url: Option<String>,
    pub submit_style: SubmitStyle,
    pub response_mode: ResponseMode,
    pub http_timeout_secs: u64,
    pub refresh_secs: Option<u64>,
    pub layout: LayoutConfig,
    pub propagation: PropagationOptions,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            sheet_base_url: DEFAULT_SHEET_BASE_URL.to_string(),
            matches_tab: DEFAULT_MATCHES_TAB.to_string(),
            leaderboard_tab: DEFAULT_LEADERBOARD_TAB.to_string(),
            matches_url: None,
            leaderboard_url: None,
            script_url: None,
            submit_style: SubmitStyle::Structured,
            response_mode: ResponseMode::Json,
            http_timeout_secs: 15,
            refresh_secs: None,
            layout: LayoutConfig::default(),
            propagation: PropagationOptions::default(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    /// Reads settings from the process environment. Call after `dotenvy` has loaded any
    /// `.env` files.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let opt = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let cfg = Self {
            sheet_id: opt("SHEET_ID"),
            sheet_base_url: opt("SHEET_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.sheet_base_url),
            matches_tab: opt("MATCHES_TAB").unwrap_or(defaults.matches_tab),
            leaderboard_tab: opt("LEADERBOARD_TAB").unwrap_or(defaults.leaderboard_tab),
            matches_url: opt("MATCHES_URL"),
            leaderboard_url: opt("LEADERBOARD_URL"),
            script_url: opt("SCRIPT_URL"),
            submit_style: match opt("SUBMIT_STYLE").map(|v| v.to_lowercase()).as_deref() {
                Some("rows") | Some("row") => SubmitStyle::Rows,
                _ => SubmitStyle::Structured,
            },
            response_mode: match opt("SUBMIT_RESPONSE").map(|v| v.to_lowercase()).as_deref() {
                Some("opaque") | Some("no-cors") => ResponseMode::Opaque,
                _ => ResponseMode::Json,
            },
            http_timeout_secs: opt("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.http_timeout_secs)
                .max(1),
            refresh_secs: opt("REFRESH_POLL_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(|secs| secs.max(15)),
            layout: LayoutConfig {
                card_height: opt("CARD_HEIGHT")
                    .and_then(|v| v.parse::<f32>().ok())
                    .filter(|v| *v > 0.0)
                    .unwrap_or(defaults.layout.card_height),
                v_gap: opt("V_GAP")
                    .and_then(|v| v.parse::<f32>().ok())
                    .filter(|v| *v >= 0.0)
                    .unwrap_or(defaults.layout.v_gap),
            },
            propagation: PropagationOptions {
                auto_byes: opt("BRACKET_AUTO_BYES").is_some_and(|v| parse_flag(&v)),
            },
            log_dir: opt("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
        };

        if cfg.sheet_id.is_none() && cfg.matches_url.is_none() {
            return Err(anyhow!("set SHEET_ID or MATCHES_URL (in the environment or .env)"));
        }
        Ok(cfg)
    }

    /// Key under which local drafts are stored.
    pub fn draft_key(&self) -> String {
        self.sheet_id
            .clone()
            .or_else(|| self.matches_url.clone())
            .unwrap_or_default()
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
