use std::sync::mpsc::{Receiver, RecvTimeoutError, SendError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::config::AppConfig;
use crate::sheet_fetch;
use crate::state::{Delta, ProviderCommand};
use crate::submit::{self, SubmitReport};

/// Runs every network call off the UI thread. Commands are handled one at a time, in the
/// order they arrive; results come back as deltas.
pub fn spawn_provider(cfg: AppConfig, tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || {
        info!("provider started");
        load_all(&cfg, &tx);

        let refresh = cfg.refresh_secs.map(Duration::from_secs);
        let mut last_refresh = Instant::now();
        loop {
            let wait = refresh
                .map(|every| every.saturating_sub(last_refresh.elapsed()))
                .unwrap_or(Duration::from_secs(3600));
            match cmd_rx.recv_timeout(wait) {
                Ok(cmd) => {
                    if handle_command(&cfg, &tx, cmd).is_err() {
                        break;
                    }
                    last_refresh = Instant::now();
                }
                Err(RecvTimeoutError::Timeout) => {
                    if refresh.is_some_and(|every| last_refresh.elapsed() >= every) {
                        load_all(&cfg, &tx);
                        last_refresh = Instant::now();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("provider stopped");
    });
}

fn handle_command(
    cfg: &AppConfig,
    tx: &Sender<Delta>,
    cmd: ProviderCommand,
) -> Result<(), SendError<Delta>> {
    match cmd {
        ProviderCommand::FetchMatches => load_matches(cfg, tx),
        ProviderCommand::FetchLeaderboard => load_leaderboard(cfg, tx),
        ProviderCommand::Submit(submission) => {
            let delta = match submit::submit(cfg, &submission) {
                Ok(report) => Delta::SubmitFinished(report),
                Err(err) => {
                    error!("submit failed: {err:#}");
                    Delta::SubmitFailed(format!("{err:#}"))
                }
            };
            let complete = matches!(&delta, Delta::SubmitFinished(r) if r.is_complete());
            tx.send(delta)?;
            if complete {
                load_leaderboard(cfg, tx)?;
            }
            Ok(())
        }
        ProviderCommand::SyncBracket => match submit::request_sync(cfg) {
            Ok(()) => {
                tx.send(Delta::SyncFinished)?;
                load_all(cfg, tx);
                Ok(())
            }
            Err(err) => {
                error!("sync failed: {err:#}");
                tx.send(Delta::SyncFailed(format!("{err:#}")))
            }
        },
        ProviderCommand::PushOfficialAdvances(mutations) => {
            if mutations.is_empty() {
                tx.send(Delta::Log("[INFO] Sheet already matches official results".to_string()))?;
                return tx.send(Delta::AdvancesPushed(SubmitReport::default()));
            }
            match submit::push_mutations(cfg, &mutations) {
                Ok(report) => {
                    tx.send(Delta::AdvancesPushed(report))?;
                    load_matches(cfg, tx)
                }
                Err(err) => tx.send(Delta::SyncFailed(format!("{err:#}"))),
            }
        }
    }
}

fn load_all(cfg: &AppConfig, tx: &Sender<Delta>) {
    let _ = load_matches(cfg, tx);
    let _ = load_leaderboard(cfg, tx);
}

fn load_matches(cfg: &AppConfig, tx: &Sender<Delta>) -> Result<(), SendError<Delta>> {
    tx.send(Delta::MatchesLoading)?;
    match sheet_fetch::fetch_matches(cfg) {
        Ok(records) => tx.send(Delta::SetMatches(records)),
        Err(err) => {
            error!("matches fetch failed: {err:#}");
            tx.send(Delta::MatchesFailed(format!("{err:#}")))
        }
    }
}

fn load_leaderboard(cfg: &AppConfig, tx: &Sender<Delta>) -> Result<(), SendError<Delta>> {
    tx.send(Delta::SetLeaderboard(sheet_fetch::fetch_leaderboard(cfg)))
}
