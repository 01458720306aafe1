use chrono::Local;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    config::ScheduleConfig,
    dto::automation::{AutomationStatus, RunAccepted},
    error::ServiceError,
    services::{
        automation::{RunTrigger, spawn_run},
        scheduler::{apply_schedule, next_fire_time},
    },
    state::SharedState,
};

/// Schedule currently driving the background scheduler.
pub async fn get_schedule(state: &SharedState) -> ScheduleConfig {
    state.schedule().await
}

/// Validate, persist and apply a new schedule.
pub async fn update_schedule(
    state: &SharedState,
    schedule: ScheduleConfig,
) -> Result<ScheduleConfig, ServiceError> {
    schedule.validate()?;
    state.schedule_store().save(schedule).await?;
    apply_schedule(state, schedule).await;
    Ok(schedule)
}

/// Load the persisted schedule and start the scheduler with it.
///
/// Storage failures fall back to the default (disabled) schedule.
pub async fn restore_schedule(state: &SharedState) -> ScheduleConfig {
    let schedule = match state.schedule_store().load().await {
        Ok(Some(schedule)) => match schedule.validated() {
            Ok(schedule) => {
                info!(?schedule, "restored automation schedule");
                schedule
            }
            Err(err) => {
                warn!(error = %err, "stored schedule is out of range; using defaults");
                ScheduleConfig::default()
            }
        },
        Ok(None) => ScheduleConfig::default(),
        Err(err) => {
            warn!(error = %err, "failed to load automation schedule; using defaults");
            ScheduleConfig::default()
        }
    };
    apply_schedule(state, schedule).await;
    schedule
}

/// Start an automation run in the background.
pub fn run_now(state: &SharedState) -> Result<RunAccepted, ServiceError> {
    let run_id = spawn_run(state, RunTrigger::Manual)?;
    info!(%run_id, "manual automation run accepted");
    Ok(RunAccepted { run_id })
}

/// Driver activity, applied schedule, next fire time and last run.
pub async fn status(state: &SharedState) -> AutomationStatus {
    let driver = state.automation();
    let schedule = state.schedule().await;
    let next_run_at = schedule
        .enabled
        .then(|| next_fire_time(&Local::now(), &schedule))
        .flatten()
        .map(|at| at.to_rfc3339());

    AutomationStatus {
        running: driver.is_running(),
        phase: driver.current_phase(),
        schedule,
        next_run_at,
        last_run: driver.last_report(),
    }
}
