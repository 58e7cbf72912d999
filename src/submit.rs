use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::{AppConfig, ResponseMode, SubmitStyle};
use crate::graph::BracketGraph;
use crate::http_client::http_client;
use crate::model::{MatchId, MatchRecord};
use crate::propagate::{Picks, PropagationOptions, propagate};

const BODY_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickEntry {
    #[serde(rename = "MatchID")]
    pub match_id: MatchId,
    #[serde(rename = "Pick")]
    pub pick: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub username: String,
    pub picks: Vec<PickEntry>,
}

impl Submission {
    /// Picks are listed by ascending match id.
    pub fn from_picks(username: &str, picks: &Picks) -> Self {
        Self {
            username: username.trim().to_string(),
            picks: picks
                .iter()
                .map(|(id, team)| PickEntry {
                    match_id: *id,
                    pick: team.clone(),
                })
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            bail!("Enter your name first.");
        }
        if self.picks.is_empty() {
            bail!("Make at least 1 pick.");
        }
        Ok(())
    }

    pub fn match_ids(&self) -> Vec<MatchId> {
        self.picks.iter().map(|p| p.match_id).collect()
    }

    pub fn structured_body(&self) -> Value {
        json!({
            "action": "submitPicks",
            "username": self.username,
            "picks": self.picks,
        })
    }

    pub fn rows(&self, at: DateTime<Utc>) -> Vec<PredictionRow> {
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.picks
            .iter()
            .map(|p| PredictionRow {
                timestamp: timestamp.clone(),
                username: self.username.clone(),
                match_id: p.match_id,
                pick: p.pick.clone(),
            })
            .collect()
    }
}

/// One appended sheet row: `[timestamp, username, matchId, pickedTeam]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRow {
    pub timestamp: String,
    pub username: String,
    pub match_id: MatchId,
    pub pick: String,
}

impl PredictionRow {
    pub fn body(&self) -> Value {
        json!([self.timestamp, self.username, self.match_id, self.pick])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum MatchMutation {
    #[serde(rename = "setMatchTeams", rename_all = "camelCase")]
    SetMatchTeams {
        match_id: MatchId,
        team_a: String,
        team_b: String,
    },
}

impl MatchMutation {
    pub fn match_id(&self) -> MatchId {
        match self {
            MatchMutation::SetMatchTeams { match_id, .. } => *match_id,
        }
    }

    pub fn body(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub fn sync_request_body() -> Value {
    json!({ "action": "syncBracket" })
}

/// Sheet rows whose teams lag behind recorded official winners. Picks play no part here.
pub fn plan_official_advances(records: &[MatchRecord], graph: &BracketGraph) -> Vec<MatchMutation> {
    let official = propagate(records, graph, &Picks::new(), PropagationOptions::default());
    records
        .iter()
        .filter_map(|record| {
            let current = official.participants(record.id)?;
            if current.slot_a == record.team_a && current.slot_b == record.team_b {
                return None;
            }
            Some(MatchMutation::SetMatchTeams {
                match_id: record.id,
                team_a: current.slot_a.clone(),
                team_b: current.slot_b.clone(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitReport {
    pub sent: Vec<MatchId>,
    pub failed: Vec<(MatchId, String)>,
}

impl SubmitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            return format!("{} sent", self.sent.len());
        }
        let ids = self
            .failed
            .iter()
            .map(|(id, _)| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} sent, {} failed (matches {ids})",
            self.sent.len(),
            self.failed.len()
        )
    }
}

/// Posts JSON bodies to the sheet's script endpoint.
#[derive(Debug, Clone)]
pub struct ScriptEndpoint {
    client: Client,
    url: Url,
    mode: ResponseMode,
}

impl ScriptEndpoint {
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let raw = cfg
            .script_url
            .as_deref()
            .ok_or_else(|| anyhow!("SCRIPT_URL not set"))?;
        let url = Url::parse(raw).context("invalid SCRIPT_URL")?;
        let client = http_client(Duration::from_secs(cfg.http_timeout_secs))?.clone();
        Ok(Self {
            client,
            url,
            mode: cfg.response_mode,
        })
    }

    pub fn post(&self, body: &Value) -> Result<()> {
        let payload = serde_json::to_string(body).context("serialize request body")?;
        let resp = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, BODY_CONTENT_TYPE)
            .body(payload)
            .send()
            .context("request failed")?;
        if self.mode == ResponseMode::Opaque {
            return Ok(());
        }

        let status = resp.status();
        let text = resp.text().context("failed reading body")?;
        let parsed: Option<Value> = serde_json::from_str(text.trim()).ok();
        let error = parsed
            .as_ref()
            .and_then(|v| v.get("error"))
            .filter(|v| !v.is_null())
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()));
        if !status.is_success() {
            return Err(anyhow!("http {}: {}", status, error.unwrap_or(text)));
        }
        if let Some(error) = error {
            return Err(anyhow!("endpoint rejected request: {error}"));
        }
        Ok(())
    }
}

/// Sends a submission in the configured style.
///
/// A structured submission is one request and either lands or fails as a whole. Row-style
/// submission sends one request per pick, in match order, and keeps going after a failure;
/// the report says which rows made it. Nothing is rolled back.
pub fn submit(cfg: &AppConfig, submission: &Submission) -> Result<SubmitReport> {
    submission.validate()?;
    let endpoint = ScriptEndpoint::from_config(cfg)?;

    match cfg.submit_style {
        SubmitStyle::Structured => {
            endpoint.post(&submission.structured_body())?;
            info!(
                username = %submission.username,
                picks = submission.picks.len(),
                "submitted picks"
            );
            Ok(SubmitReport {
                sent: submission.match_ids(),
                failed: Vec::new(),
            })
        }
        SubmitStyle::Rows => {
            let mut report = SubmitReport::default();
            for row in submission.rows(Utc::now()) {
                match endpoint.post(&row.body()) {
                    Ok(()) => report.sent.push(row.match_id),
                    Err(err) => {
                        warn!(match_id = row.match_id, "prediction row failed: {err:#}");
                        report.failed.push((row.match_id, format!("{err:#}")));
                    }
                }
            }
            info!(summary = %report.summary(), "submitted prediction rows");
            Ok(report)
        }
    }
}

/// Writes each mutation as its own request; failures do not stop the rest.
pub fn push_mutations(cfg: &AppConfig, mutations: &[MatchMutation]) -> Result<SubmitReport> {
    let endpoint = ScriptEndpoint::from_config(cfg)?;
    let mut report = SubmitReport::default();
    for mutation in mutations {
        match endpoint.post(&mutation.body()) {
            Ok(()) => report.sent.push(mutation.match_id()),
            Err(err) => report.failed.push((mutation.match_id(), format!("{err:#}"))),
        }
    }
    Ok(report)
}

pub fn request_sync(cfg: &AppConfig) -> Result<()> {
    ScriptEndpoint::from_config(cfg)?.post(&sync_request_body())
}
