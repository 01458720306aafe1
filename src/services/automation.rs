//! Automation driver replaying a whole draft unattended.
//!
//! A run walks through named phases (seeding, balancing, captain selection, toss,
//! result), taking the workflow lock once per phase and pausing in between so
//! observers of the SSE stream can follow each intermediate state. At most one run is
//! in flight at any time; the phase cursor doubles as the single-flight guard.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Local};
use rand::Rng;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::{AutomationPauses, RosterEntry},
    dto::workflow::SessionSnapshot,
    error::ServiceError,
    services::sse_events::{
        broadcast_automation_completed, broadcast_automation_failed, broadcast_automation_phase,
    },
    state::{
        AppState, SharedState,
        balancing::form_balanced_teams,
        model::{CoinFace, TeamId, TossChoice, TossOutcome},
        toss::select_random_captains,
        transitions::apply_run_phase,
        workflow::WorkflowStep,
    },
};

/// Named stages of an automation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AutomationPhase {
    /// Session reset and default roster added to the pool.
    Seeding,
    /// Pool distributed across both teams.
    Balancing,
    /// One random captain per team.
    CaptainSelection,
    /// Random call and coin flip.
    Toss,
    /// Session moved to the result step and handed to the result sink.
    Result,
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    /// Started through `POST /automation/run`.
    Manual,
    /// Fired by the daily scheduler.
    Scheduled,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every phase succeeded and the result was handed to the sink.
    Completed {
        /// Winner of the toss.
        winning_team: TeamId,
        /// Total weight of Team Alpha after balancing.
        alpha_weight: f64,
        /// Total weight of Team Beta after balancing.
        beta_weight: f64,
    },
    /// A phase was rejected; the session keeps whatever earlier phases committed.
    Failed {
        /// Phase whose command was rejected.
        phase: AutomationPhase,
        /// Rejection reason.
        message: String,
    },
    /// The run was dropped before finishing, e.g. by stopping the scheduler.
    Cancelled {
        /// Phase the run was in when it was dropped.
        phase: AutomationPhase,
    },
}

/// Record of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RunReport {
    /// Identifier handed out when the run was accepted.
    pub run_id: Uuid,
    /// What started the run.
    pub trigger: RunTrigger,
    /// When the driver was claimed.
    pub started_at: DateTime<Local>,
    /// When the run completed, failed or was cancelled.
    pub finished_at: DateTime<Local>,
    /// How the run ended.
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Whether every phase of the run succeeded.
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { .. })
    }
}

/// Consumer of the final session once a run reaches the result step.
pub trait ResultSink: Send + Sync {
    /// Called once per completed run. An error fails the run.
    fn on_result(
        &self,
        state: &AppState,
        run_id: Uuid,
        session: &SessionSnapshot,
    ) -> Result<(), ServiceError>;
}

/// Announces completed runs on the SSE stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct BroadcastResultSink;

impl ResultSink for BroadcastResultSink {
    fn on_result(
        &self,
        state: &AppState,
        run_id: Uuid,
        session: &SessionSnapshot,
    ) -> Result<(), ServiceError> {
        broadcast_automation_completed(state, run_id, session);
        Ok(())
    }
}

type PhaseCursor = Arc<Mutex<Option<AutomationPhase>>>;
type ReportSlot = Arc<Mutex<Option<RunReport>>>;

/// Single-flight automation driver.
pub struct AutomationDriver {
    cursor: PhaseCursor,
    last_report: ReportSlot,
    roster: Vec<RosterEntry>,
    pauses: AutomationPauses,
    sink: Arc<dyn ResultSink>,
}

/// Exclusive right to execute one run. The driver becomes idle again when it drops.
///
/// A guard dropped before its run finished records a [`RunOutcome::Cancelled`] report.
pub struct RunGuard {
    cursor: PhaseCursor,
    last_report: ReportSlot,
    run_id: Uuid,
    trigger: RunTrigger,
    started_at: DateTime<Local>,
    finished: bool,
}

impl RunGuard {
    /// Identifier of the claimed run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// What started the claimed run.
    pub fn trigger(&self) -> RunTrigger {
        self.trigger
    }

    fn enter(&self, phase: AutomationPhase) {
        *lock(&self.cursor) = Some(phase);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let phase = lock(&self.cursor).take();
        if self.finished {
            return;
        }
        let phase = phase.unwrap_or(AutomationPhase::Seeding);
        warn!(
            run_id = %self.run_id,
            phase = ?phase,
            "automation run cancelled before finishing"
        );
        *lock(&self.last_report) = Some(RunReport {
            run_id: self.run_id,
            trigger: self.trigger,
            started_at: self.started_at,
            finished_at: Local::now(),
            outcome: RunOutcome::Cancelled { phase },
        });
    }
}

struct PhaseFailure {
    phase: AutomationPhase,
    error: ServiceError,
}

impl AutomationDriver {
    /// Idle driver seeding runs with `roster` and pausing between phases per `pauses`.
    pub fn new(
        roster: Vec<RosterEntry>,
        pauses: AutomationPauses,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            cursor: Arc::new(Mutex::new(None)),
            last_report: Arc::new(Mutex::new(None)),
            roster,
            pauses,
            sink,
        }
    }

    /// Whether a run currently holds the driver.
    pub fn is_running(&self) -> bool {
        lock(&self.cursor).is_some()
    }

    /// Phase of the in-flight run, `None` when idle.
    pub fn current_phase(&self) -> Option<AutomationPhase> {
        *lock(&self.cursor)
    }

    /// Report of the most recent finished or cancelled run.
    pub fn last_report(&self) -> Option<RunReport> {
        lock(&self.last_report).clone()
    }

    /// Claim the driver for a new run, failing with [`ServiceError::Busy`] when one is
    /// already in flight.
    pub fn try_begin(&self, trigger: RunTrigger) -> Result<RunGuard, ServiceError> {
        let mut cursor = lock(&self.cursor);
        if cursor.is_some() {
            return Err(ServiceError::Busy);
        }
        *cursor = Some(AutomationPhase::Seeding);
        Ok(RunGuard {
            cursor: self.cursor.clone(),
            last_report: self.last_report.clone(),
            run_id: Uuid::new_v4(),
            trigger,
            started_at: Local::now(),
            finished: false,
        })
    }

    /// Claim the driver and execute a complete run.
    pub async fn run(
        &self,
        state: &SharedState,
        trigger: RunTrigger,
    ) -> Result<RunReport, ServiceError> {
        let guard = self.try_begin(trigger)?;
        Ok(self.execute(state, guard).await)
    }

    /// Execute a run previously claimed with [`AutomationDriver::try_begin`].
    ///
    /// Failures are contained: they are logged, broadcast and recorded in the report.
    pub async fn execute(&self, state: &SharedState, mut guard: RunGuard) -> RunReport {
        info!(run_id = %guard.run_id, trigger = ?guard.trigger, "automation run started");

        let outcome = match self.run_phases(state, &guard).await {
            Ok((toss, alpha_weight, beta_weight)) => {
                info!(
                    run_id = %guard.run_id,
                    winner = %toss.winning_team,
                    "automation run completed"
                );
                RunOutcome::Completed {
                    winning_team: toss.winning_team,
                    alpha_weight,
                    beta_weight,
                }
            }
            Err(PhaseFailure { phase, error }) => {
                let message = error.to_string();
                warn!(
                    run_id = %guard.run_id,
                    phase = ?phase,
                    error = %message,
                    "automation run failed"
                );
                broadcast_automation_failed(state, guard.run_id, phase, &message);
                RunOutcome::Failed { phase, message }
            }
        };

        let report = RunReport {
            run_id: guard.run_id,
            trigger: guard.trigger,
            started_at: guard.started_at,
            finished_at: Local::now(),
            outcome,
        };
        *lock(&self.last_report) = Some(report.clone());
        guard.finished = true;
        report
    }

    async fn run_phases(
        &self,
        state: &SharedState,
        guard: &RunGuard,
    ) -> Result<(TossOutcome, f64, f64), PhaseFailure> {
        self.begin_phase(state, guard, AutomationPhase::Seeding);
        let roster = &self.roster;
        apply_run_phase(state, |wf| {
            wf.reset_to_step(WorkflowStep::AddPlayers)?;
            for entry in roster {
                wf.add_player(&entry.name, entry.image_url.as_deref(), entry.weight)?;
            }
            wf.advance(WorkflowStep::FormTeams)
        })
        .await
        .map_err(failed(AutomationPhase::Seeding))?;
        pause(self.pauses.phase).await;

        self.begin_phase(state, guard, AutomationPhase::Balancing);
        let (balance, _) = apply_run_phase(state, |wf| {
            let report = form_balanced_teams(wf);
            wf.advance(WorkflowStep::SelectCaptains)?;
            Ok(report)
        })
        .await
        .map_err(failed(AutomationPhase::Balancing))?;
        pause(self.pauses.phase).await;

        self.begin_phase(state, guard, AutomationPhase::CaptainSelection);
        apply_run_phase(state, |wf| {
            select_random_captains(wf, &mut rand::rng());
            wf.advance(WorkflowStep::Toss)
        })
        .await
        .map_err(failed(AutomationPhase::CaptainSelection))?;
        pause(self.pauses.phase).await;

        self.begin_phase(state, guard, AutomationPhase::Toss);
        let (toss, _) = apply_run_phase(state, |wf| {
            let mut rng = rand::rng();
            let calling_team = if rng.random_bool(0.5) {
                TeamId::Alpha
            } else {
                TeamId::Beta
            };
            wf.set_captain_choice(TossChoice {
                calling_team,
                called_face: CoinFace::draw(&mut rng),
            });
            wf.perform_toss(&mut rng)
        })
        .await
        .map_err(failed(AutomationPhase::Toss))?;
        pause(self.pauses.result).await;

        self.begin_phase(state, guard, AutomationPhase::Result);
        let (_, session) = apply_run_phase(state, |wf| wf.advance(WorkflowStep::Result))
            .await
            .map_err(failed(AutomationPhase::Result))?;
        self.sink
            .on_result(state, guard.run_id, &session)
            .map_err(failed(AutomationPhase::Result))?;

        Ok((toss, balance.alpha_weight, balance.beta_weight))
    }

    fn begin_phase(&self, state: &AppState, guard: &RunGuard, phase: AutomationPhase) {
        guard.enter(phase);
        info!(run_id = %guard.run_id, phase = ?phase, "automation phase started");
        broadcast_automation_phase(state, guard.run_id, guard.trigger, phase);
    }
}

/// Claim the driver and execute the run on a background task, returning its id.
pub fn spawn_run(state: &SharedState, trigger: RunTrigger) -> Result<Uuid, ServiceError> {
    let guard = state.automation().try_begin(trigger)?;
    let run_id = guard.run_id();
    let state = state.clone();
    tokio::spawn(async move {
        state.automation().execute(&state, guard).await;
    });
    Ok(run_id)
}

fn failed(phase: AutomationPhase) -> impl Fn(ServiceError) -> PhaseFailure {
    move |error| PhaseFailure { phase, error }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig, dao::schedule_store::InMemoryScheduleStore, state::AppState,
    };

    struct RejectingSink;

    impl ResultSink for RejectingSink {
        fn on_result(
            &self,
            _state: &AppState,
            _run_id: Uuid,
            _session: &SessionSnapshot,
        ) -> Result<(), ServiceError> {
            Err(ServiceError::InvalidState("export refused".into()))
        }
    }

    fn state_with(config: AppConfig, sink: Arc<dyn ResultSink>) -> SharedState {
        AppState::with_result_sink(
            &config.with_pauses(AutomationPauses::NONE),
            Arc::new(InMemoryScheduleStore::new()),
            sink,
        )
    }

    #[tokio::test]
    async fn run_reaches_result_with_default_roster() {
        let state = state_with(AppConfig::default(), Arc::new(BroadcastResultSink));
        let mut events = state.events().subscribe();

        let report = state
            .automation()
            .run(&state, RunTrigger::Manual)
            .await
            .unwrap();

        assert!(report.is_completed());
        assert!(!state.automation().is_running());
        assert_eq!(state.automation().last_report(), Some(report));

        let snapshot = state.snapshot().await;
        assert!(snapshot.result_ready);
        assert!(snapshot.pool.is_empty());
        assert_eq!(snapshot.team_alpha.players.len() + snapshot.team_beta.players.len(), 16);
        assert!(snapshot.team_alpha.captain_id.is_some());
        assert!(snapshot.team_beta.captain_id.is_some());

        let mut names = Vec::new();
        while let Ok(event) = events.try_recv() {
            names.extend(event.event);
        }
        assert_eq!(names.first().map(String::as_str), Some("automation.phase"));
        assert_eq!(names.last().map(String::as_str), Some("automation.completed"));
    }

    #[tokio::test]
    async fn second_run_is_rejected_while_one_is_in_flight() {
        let state = state_with(AppConfig::default(), Arc::new(BroadcastResultSink));
        let guard = state.automation().try_begin(RunTrigger::Manual).unwrap();

        let err = state
            .automation()
            .run(&state, RunTrigger::Scheduled)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Busy));
        assert_eq!(
            state.automation().current_phase(),
            Some(AutomationPhase::Seeding)
        );

        drop(guard);
        assert!(!state.automation().is_running());
    }

    #[tokio::test]
    async fn too_small_roster_fails_during_seeding() {
        let config = AppConfig::default().with_default_roster(vec![RosterEntry {
            name: "Solo".into(),
            image_url: None,
            weight: 60.0,
        }]);
        let state = state_with(config, Arc::new(BroadcastResultSink));
        state
            .with_workflow_mut(|wf| wf.add_player("Kept", None, 50.0))
            .await
            .unwrap();

        let report = state
            .automation()
            .run(&state, RunTrigger::Manual)
            .await
            .unwrap();

        assert!(matches!(
            report.outcome,
            RunOutcome::Failed {
                phase: AutomationPhase::Seeding,
                ..
            }
        ));
        // The seeding command was rejected as a whole.
        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.pool.len(), 1);
        assert_eq!(snapshot.pool[0].name, "Kept");
        assert!(!state.automation().is_running());
    }

    #[tokio::test]
    async fn sink_failure_fails_the_run_but_not_the_driver() {
        let state = state_with(AppConfig::default(), Arc::new(RejectingSink));

        let first = state
            .automation()
            .run(&state, RunTrigger::Scheduled)
            .await
            .unwrap();
        assert!(matches!(
            first.outcome,
            RunOutcome::Failed {
                phase: AutomationPhase::Result,
                ..
            }
        ));

        let second = state
            .automation()
            .run(&state, RunTrigger::Scheduled)
            .await
            .unwrap();
        assert_ne!(first.run_id, second.run_id);
        assert!(!second.is_completed());
    }

    #[tokio::test]
    async fn dropped_run_is_reported_as_cancelled() {
        let state = state_with(AppConfig::default(), Arc::new(BroadcastResultSink));
        let guard = state.automation().try_begin(RunTrigger::Scheduled).unwrap();
        let run_id = guard.run_id();
        guard.enter(AutomationPhase::Balancing);

        drop(guard);

        let report = state.automation().last_report().unwrap();
        assert_eq!(report.run_id, run_id);
        assert_eq!(report.trigger, RunTrigger::Scheduled);
        assert_eq!(
            report.outcome,
            RunOutcome::Cancelled {
                phase: AutomationPhase::Balancing
            }
        );
        assert!(!state.automation().is_running());
    }

    #[tokio::test]
    async fn finished_run_is_not_reported_as_cancelled() {
        let state = state_with(AppConfig::default(), Arc::new(BroadcastResultSink));
        let report = state
            .automation()
            .run(&state, RunTrigger::Manual)
            .await
            .unwrap();
        assert_eq!(state.automation().last_report(), Some(report));
    }

    #[test]
    fn report_serialises_with_status_tag() {
        let report = RunReport {
            run_id: Uuid::nil(),
            trigger: RunTrigger::Manual,
            started_at: Local::now(),
            finished_at: Local::now(),
            outcome: RunOutcome::Failed {
                phase: AutomationPhase::Toss,
                message: "boom".into(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["trigger"], "manual");
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["outcome"]["phase"], "toss");
    }
}
