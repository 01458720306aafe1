//! Daily scheduler firing automation runs at a configured local time.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{info, warn};

use crate::{
    config::ScheduleConfig,
    error::ServiceError,
    services::automation::RunTrigger,
    state::SharedState,
};

/// Source of the current local time used to plan the next fire.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Running scheduler task together with its shutdown signal.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop, abort it and wait until it is gone.
    ///
    /// A run in flight is dropped with the task and reported as cancelled.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
        let _ = self.task.await;
    }
}

/// Next daily occurrence of the configured hour and minute strictly after `now`.
///
/// When today's slot has already passed (or is exactly `now`) the run fires tomorrow.
/// Local times skipped by a clock change move on to the following day.
pub fn next_fire_time<Tz: TimeZone>(
    now: &DateTime<Tz>,
    schedule: &ScheduleConfig,
) -> Option<DateTime<Tz>> {
    let time = NaiveTime::from_hms_opt(schedule.hour, schedule.minute, 0)?;
    let today = now.date_naive();

    (0..=2u64).find_map(|offset| {
        let day = today.checked_add_days(Days::new(offset))?;
        now.timezone()
            .from_local_datetime(&day.and_time(time))
            .earliest()
            .filter(|candidate| candidate > now)
    })
}

/// Replace the running scheduler with one following `schedule`.
///
/// A disabled schedule only stops the previous loop.
pub async fn apply_schedule(state: &SharedState, schedule: ScheduleConfig) {
    apply_schedule_with_clock(state, schedule, Arc::new(Local::now)).await;
}

async fn apply_schedule_with_clock(state: &SharedState, schedule: ScheduleConfig, clock: Clock) {
    let mut slot = state.scheduler().lock().await;
    if let Some(previous) = slot.take() {
        previous.stop().await;
    }
    state.set_schedule(schedule).await;

    if schedule.enabled {
        info!(
            hour = schedule.hour,
            minute = schedule.minute,
            "automation schedule enabled"
        );
        *slot = Some(spawn(state.clone(), schedule, clock));
    } else {
        info!("automation schedule disabled");
    }
}

/// Stop the background scheduler, if any.
pub async fn stop(state: &SharedState) {
    let handle = state.scheduler().lock().await.take();
    if let Some(handle) = handle {
        handle.stop().await;
        info!("automation scheduler stopped");
    }
}

/// Whether a scheduler loop is currently installed.
pub async fn is_active(state: &SharedState) -> bool {
    state.scheduler().lock().await.is_some()
}

fn spawn(state: SharedState, schedule: ScheduleConfig, clock: Clock) -> SchedulerHandle {
    let (shutdown, receiver) = watch::channel(false);
    let task = tokio::spawn(schedule_loop(state, schedule, clock, receiver));
    SchedulerHandle { shutdown, task }
}

async fn schedule_loop(
    state: SharedState,
    schedule: ScheduleConfig,
    clock: Clock,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let now = clock();
        let Some(fire_at) = next_fire_time(&now, &schedule) else {
            warn!(?schedule, "schedule has no next occurrence; scheduler exiting");
            return;
        };
        let delay = (fire_at - now).to_std().unwrap_or(Duration::ZERO);
        info!(next_run = %fire_at.to_rfc3339(), "next automation run scheduled");

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = sleep(delay) => {}
        }

        match state.automation().run(&state, RunTrigger::Scheduled).await {
            Ok(report) => info!(
                run_id = %report.run_id,
                completed = report.is_completed(),
                "scheduled automation run finished"
            ),
            Err(ServiceError::Busy) => {
                warn!("automation already running; skipping scheduled run")
            }
            Err(err) => warn!(error = %err, "scheduled automation run could not start"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{FixedOffset, TimeDelta, Timelike, Utc};

    use super::*;
    use crate::{
        config::{AppConfig, AutomationPauses},
        dao::schedule_store::InMemoryScheduleStore,
        services::automation::{AutomationPhase, RunOutcome},
        state::AppState,
    };

    fn paused_state(pauses: AutomationPauses) -> SharedState {
        AppState::new(
            &AppConfig::default().with_pauses(pauses),
            Arc::new(InMemoryScheduleStore::new()),
        )
    }

    /// Schedule for the next minute boundary and a frozen clock three seconds before it.
    fn three_seconds_ahead() -> (ScheduleConfig, Clock) {
        let now = Local::now();
        let slot = now
            .with_nanosecond(0)
            .and_then(|t| t.with_second(0))
            .unwrap()
            + TimeDelta::minutes(1);
        let frozen = slot - TimeDelta::seconds(3);
        (at(slot.hour(), slot.minute()), Arc::new(move || frozen))
    }

    fn at(hour: u32, minute: u32) -> ScheduleConfig {
        ScheduleConfig {
            hour,
            minute,
            enabled: true,
        }
    }

    #[test]
    fn later_today_fires_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap();
        let next = next_fire_time(&now, &at(9, 15)).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 10, 9, 15, 0).unwrap());
    }

    #[test]
    fn passed_time_fires_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap();
        let next = next_fire_time(&now, &at(9, 15)).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 11, 9, 15, 0).unwrap());
    }

    #[test]
    fn exact_time_fires_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 9, 15, 0).unwrap();
        let next = next_fire_time(&now, &at(9, 15)).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 1, 9, 15, 0).unwrap());
    }

    #[test]
    fn uses_the_clock_of_the_given_zone() {
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = zone.with_ymd_and_hms(2024, 6, 1, 23, 59, 30).unwrap();
        let next = next_fire_time(&now, &at(0, 0)).unwrap();
        assert_eq!(next.hour(), 0);
        assert_eq!(next, zone.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn out_of_range_schedule_has_no_occurrence() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap();
        assert_eq!(next_fire_time(&now, &at(24, 0)), None);
    }

    #[tokio::test]
    async fn applying_a_schedule_replaces_the_loop() {
        let state = AppState::new(&AppConfig::default(), Arc::new(InMemoryScheduleStore::new()));

        apply_schedule(&state, at(3, 0)).await;
        assert!(is_active(&state).await);
        assert_eq!(state.schedule().await, at(3, 0));

        let disabled = ScheduleConfig {
            enabled: false,
            ..at(4, 0)
        };
        apply_schedule(&state, disabled).await;
        assert!(!is_active(&state).await);
        assert_eq!(state.schedule().await, disabled);

        apply_schedule(&state, at(5, 0)).await;
        stop(&state).await;
        assert!(!is_active(&state).await);
    }

    #[tokio::test(start_paused = true)]
    async fn due_schedule_fires_a_run() {
        let state = paused_state(AutomationPauses::NONE);
        let (schedule, clock) = three_seconds_ahead();

        apply_schedule_with_clock(&state, schedule, clock).await;
        sleep(Duration::from_secs(4)).await;

        let report = state.automation().last_report().unwrap();
        assert_eq!(report.trigger, RunTrigger::Scheduled);
        assert!(report.is_completed());
        stop(&state).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_schedule_never_fires() {
        let state = paused_state(AutomationPauses::NONE);
        let (schedule, clock) = three_seconds_ahead();

        apply_schedule_with_clock(&state, schedule, clock).await;
        stop(&state).await;
        sleep(Duration::from_secs(10)).await;

        assert!(state.automation().last_report().is_none());
        assert!(!state.automation().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn replaced_schedule_never_fires() {
        let state = paused_state(AutomationPauses::NONE);
        let (schedule, clock) = three_seconds_ahead();

        apply_schedule_with_clock(&state, schedule, clock).await;
        let disabled = ScheduleConfig {
            enabled: false,
            ..schedule
        };
        apply_schedule(&state, disabled).await;
        sleep(Duration::from_secs(10)).await;

        assert!(state.automation().last_report().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_mid_run_cancels_the_run() {
        let pauses = AutomationPauses {
            phase: Duration::from_secs(5),
            result: Duration::from_secs(5),
        };
        let state = paused_state(pauses);
        let (schedule, clock) = three_seconds_ahead();

        apply_schedule_with_clock(&state, schedule, clock).await;
        sleep(Duration::from_secs(4)).await;
        assert_eq!(
            state.automation().current_phase(),
            Some(AutomationPhase::Seeding)
        );

        stop(&state).await;

        assert!(!state.automation().is_running());
        let report = state.automation().last_report().unwrap();
        assert_eq!(report.trigger, RunTrigger::Scheduled);
        assert_eq!(
            report.outcome,
            RunOutcome::Cancelled {
                phase: AutomationPhase::Seeding
            }
        );
        sleep(Duration::from_secs(30)).await;
        assert_eq!(state.automation().last_report(), Some(report));
    }
}
