use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use reqwest::Url;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::http_client::http_client;
use crate::leaderboard::{LeaderboardEntry, parse_leaderboard_json};
use crate::model::MatchRecord;
use crate::rows::parse_matches_json;

pub fn matches_url(cfg: &AppConfig) -> Result<Url> {
    match cfg.matches_url.as_deref() {
        Some(url) => Url::parse(url).context("invalid MATCHES_URL"),
        None => sheet_tab_url(cfg, &cfg.matches_tab),
    }
}

pub fn leaderboard_url(cfg: &AppConfig) -> Result<Url> {
    match cfg.leaderboard_url.as_deref() {
        Some(url) => Url::parse(url).context("invalid LEADERBOARD_URL"),
        None => sheet_tab_url(cfg, &cfg.leaderboard_tab),
    }
}

/// `{base}/{sheet_id}/{tab}` with both path parts percent-encoded.
pub fn sheet_tab_url(cfg: &AppConfig, tab: &str) -> Result<Url> {
    let sheet_id = cfg
        .sheet_id
        .as_deref()
        .ok_or_else(|| anyhow!("no SHEET_ID configured for tab {tab}"))?;
    let mut url = Url::parse(&cfg.sheet_base_url).context("invalid SHEET_BASE_URL")?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("SHEET_BASE_URL cannot carry a path"))?
        .pop_if_empty()
        .push(sheet_id)
        .push(tab);
    Ok(url)
}

/// Appends `t=<millis>` so intermediaries never serve a stale sheet.
pub fn with_cache_buster(mut url: Url, millis: i64) -> Url {
    url.query_pairs_mut().append_pair("t", &millis.to_string());
    url
}

pub fn fetch_matches(cfg: &AppConfig) -> Result<Vec<MatchRecord>> {
    let client = http_client(Duration::from_secs(cfg.http_timeout_secs))?;
    let url = with_cache_buster(matches_url(cfg)?, Utc::now().timestamp_millis());
    let body = fetch_text(client, &url).context("matches request failed")?;
    let records = parse_matches_json(&body)?;
    info!(count = records.len(), "loaded bracket rows");
    Ok(records)
}

/// The leaderboard is optional: a missing tab, a network error or a malformed body all
/// read as "no entries".
pub fn fetch_leaderboard(cfg: &AppConfig) -> Vec<LeaderboardEntry> {
    match try_fetch_leaderboard(cfg) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("leaderboard unavailable: {err:#}");
            Vec::new()
        }
    }
}

fn try_fetch_leaderboard(cfg: &AppConfig) -> Result<Vec<LeaderboardEntry>> {
    let client = http_client(Duration::from_secs(cfg.http_timeout_secs))?;
    let url = with_cache_buster(leaderboard_url(cfg)?, Utc::now().timestamp_millis());
    let body = fetch_text(client, &url).context("leaderboard request failed")?;
    parse_leaderboard_json(&body)
}

fn fetch_text(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "GET");
    let resp = client.get(url.clone()).send().context("request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {}: {}", status, body));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> AppConfig {
        AppConfig {
            sheet_id: Some("sheet-1".to_string()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn tab_names_are_encoded_into_the_path() {
        let mut cfg = cfg();
        cfg.leaderboard_tab = "Top Players".to_string();
        let url = leaderboard_url(&cfg).unwrap();
        assert_eq!(
            url.as_str(),
            "https://opensheet.elk.sh/sheet-1/Top%20Players"
        );
    }

    #[test]
    fn cache_buster_is_appended_to_existing_query() {
        let url = Url::parse("http://localhost/rows?tab=Matches").unwrap();
        let busted = with_cache_buster(url, 1234);
        assert_eq!(busted.as_str(), "http://localhost/rows?tab=Matches&t=1234");
    }

    #[test]
    fn explicit_urls_override_the_sheet() {
        let cfg = AppConfig {
            matches_url: Some("http://localhost:8080/matches.json".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(
            matches_url(&cfg).unwrap().as_str(),
            "http://localhost:8080/matches.json"
        );
        assert!(leaderboard_url(&cfg).is_err());
    }
}
