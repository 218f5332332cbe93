use crate::output::Output;
use color_eyre::Result;
use serde_json::json;

use anisync_config::PathManager;
use anisync_core::{SyncOutcome, SyncReport};

pub async fn run_sync(output: &Output) -> Result<()> {
    tracing::debug!("Sync command started");

    let path_manager = PathManager::default();
    let config = super::load_config(&path_manager)?;
    let service = super::build_service(&config, &path_manager)?;

    let spinner = output.is_human().then(|| {
        let spinner = indicatif::ProgressBar::new_spinner();
        if let Ok(style) =
            indicatif::ProgressStyle::default_spinner().template("{spinner:.blue} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message("Syncing Plex to MyAnimeList...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));
        spinner
    });

    let result = service.trigger_sync().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match result? {
        Some(outcome) => {
            report_outcome(&outcome, output);
            if let SyncOutcome::LoginFailed(_) = outcome {
                return Err(color_eyre::eyre::eyre!(
                    "Could not log in to MyAnimeList, check myanimelist.username and the stored password"
                ));
            }
        }
        None => output.warn("A sync is already running"),
    }

    Ok(())
}

fn report_outcome(outcome: &SyncOutcome, output: &Output) {
    let report = outcome.report();
    if output.is_human() {
        match outcome {
            SyncOutcome::Completed(_) => output.success(summary(report)),
            SyncOutcome::LoginFailed(_) => output.error(format!(
                "Login failed, {} pending update(s) not applied",
                report.candidates
            )),
        }
        if report.unresolved_seasons > 0 {
            output.info(format!(
                "{} season(s) could not be mapped, see 'anisync errors'",
                report.unresolved_seasons
            ));
        }
    } else {
        output.json(&report_json(outcome));
    }
}

fn summary(report: &SyncReport) -> String {
    if report.candidates == 0 {
        return format!(
            "Sync completed: {} show(s) checked, MyAnimeList already up to date ({:.1}s)",
            report.shows,
            report.duration.as_secs_f64()
        );
    }
    format!(
        "Sync completed: {} of {} update(s) applied ({:.1}s)",
        report.applied,
        report.candidates,
        report.duration.as_secs_f64()
    )
}

fn report_json(outcome: &SyncOutcome) -> serde_json::Value {
    let report = outcome.report();
    json!({
        "success": matches!(outcome, SyncOutcome::Completed(_)),
        "login_failed": matches!(outcome, SyncOutcome::LoginFailed(_)),
        "shows": report.shows,
        "resolved_seasons": report.resolved_seasons,
        "unresolved_seasons": report.unresolved_seasons,
        "candidates": report.candidates,
        "applied": report.applied,
        "failed": report.failed,
        "duration_seconds": report.duration.as_secs_f64(),
    })
}
