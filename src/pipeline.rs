//! The deploy sequence run for every accepted push

use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::AppState;
use crate::deploy::StepOutcome;
use crate::notifier::InlineKeyboardMarkup;
use crate::webhook::{Commit, commit_summary};

pub const BUILD_SUCCESS_TEXT: &str = "Application is being built from the latest commit";
pub const RESTART_SUCCESS_TEXT: &str = "Application has been restarted";
pub const UNREACHABLE_TEXT: &str = "Production URL is not reachable";
pub const VIEW_COMMIT: &str = "View Commit";
pub const VIEW_APPLICATION: &str = "View Application";

/// What happened during one deploy. `healthy` is `None` when the check was skipped.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub deploy_id: String,
    pub commit_url: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u128,
    pub build: StepOutcome,
    pub restart: StepOutcome,
    pub healthy: Option<bool>,
}

impl DeployReport {
    pub fn log(&self) {
        let healthy = match self.healthy {
            Some(true) => "yes",
            Some(false) => "no",
            None => "not checked",
        };
        info!(
            "Deploy {}{} for {} started {} finished in {}ms: build={:?} restart={:?} healthy={}",
            self.deploy_id,
            if self.dry_run { " [DRY_RUN]" } else { "" },
            self.commit_url,
            self.started_at.to_rfc3339(),
            self.duration_ms,
            self.build,
            self.restart,
            healthy
        );
    }
}

/// Announce the commit, build, restart, then verify the production URL.
///
/// A failed build does not stop the restart. Only one deploy runs at a time;
/// later deliveries wait for the lock.
pub async fn run_deploy(
    state: &AppState,
    commit: &Commit,
    sender_url: &str,
    dry_run: bool,
) -> DeployReport {
    let deploy_id = Uuid::now_v7().to_string();
    let span = info_span!("deploy", id = %deploy_id);

    async {
        let _guard = match state.deploy_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                info!("Another deploy is in progress, waiting");
                state.deploy_lock.lock().await
            }
        };

        let started_at = Utc::now();
        let start = Instant::now();
        let config = &state.config;

        state
            .notifier
            .notify(
                &commit_summary(commit, sender_url),
                Some(InlineKeyboardMarkup::single_link(VIEW_COMMIT, &commit.url)),
            )
            .await;

        let mut report = DeployReport {
            deploy_id: deploy_id.clone(),
            commit_url: commit.url.clone(),
            dry_run,
            started_at,
            duration_ms: 0,
            build: StepOutcome::Skipped,
            restart: StepOutcome::Skipped,
            healthy: None,
        };

        if dry_run {
            info!("[DRY_RUN] Skipping build, restart and health check");
            report.duration_ms = start.elapsed().as_millis();
            report.log();
            return report;
        }

        report.build = state
            .deployer
            .execute_command(
                &config.build_command,
                BUILD_SUCCESS_TEXT,
                &commit.url,
                VIEW_COMMIT,
            )
            .await;

        report.restart = state
            .deployer
            .execute_command(
                &config.restart_command,
                RESTART_SUCCESS_TEXT,
                &config.prod_url,
                VIEW_APPLICATION,
            )
            .await;

        let healthy = state.health.check_prod_url(&config.prod_url).await;
        if !healthy {
            warn!("Production URL {} is not reachable", config.prod_url);
            state
                .notifier
                .notify(
                    UNREACHABLE_TEXT,
                    Some(InlineKeyboardMarkup::single_link(
                        VIEW_APPLICATION,
                        &config.prod_url,
                    )),
                )
                .await;
        }
        report.healthy = Some(healthy);
        report.duration_ms = start.elapsed().as_millis();

        report.log();
        report
    }
    .instrument(span)
    .await
}
