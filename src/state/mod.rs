pub mod balancing;
/// Players, teams and coin types.
pub mod model;
mod sse;
pub mod toss;
/// Workflow commands followed by an SSE broadcast.
pub mod transitions;
/// The draft session and its step machine.
pub mod workflow;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::{
    config::{AppConfig, ScheduleConfig},
    dao::schedule_store::ScheduleStore,
    dto::workflow::SessionSnapshot,
    error::ServiceError,
    services::{
        automation::{AutomationDriver, BroadcastResultSink, ResultSink},
        scheduler::SchedulerHandle,
    },
    state::workflow::{Workflow, WorkflowError},
};

pub use self::sse::SseHub;

/// Shared handle to [`AppState`] passed to handlers and background tasks.
pub type SharedState = Arc<AppState>;

const SSE_CAPACITY: usize = 32;

/// Central application state: the live draft session plus its automation plumbing.
pub struct AppState {
    workflow: RwLock<Workflow>,
    sse: SseHub,
    automation: AutomationDriver,
    schedule_store: Arc<dyn ScheduleStore>,
    schedule: RwLock<ScheduleConfig>,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Completed automation runs are announced on the SSE stream.
    pub fn new(config: &AppConfig, schedule_store: Arc<dyn ScheduleStore>) -> SharedState {
        Self::with_result_sink(config, schedule_store, Arc::new(BroadcastResultSink))
    }

    /// Same as [`AppState::new`] with a custom consumer for completed runs.
    pub fn with_result_sink(
        config: &AppConfig,
        schedule_store: Arc<dyn ScheduleStore>,
        sink: Arc<dyn ResultSink>,
    ) -> SharedState {
        Arc::new(Self {
            workflow: RwLock::new(Workflow::with_settings(
                config.toss_rule(),
                config.placeholder_image_base(),
            )),
            sse: SseHub::new(SSE_CAPACITY),
            automation: AutomationDriver::new(
                config.default_roster().to_vec(),
                config.pauses(),
                sink,
            ),
            schedule_store,
            schedule: RwLock::new(ScheduleConfig::default()),
            scheduler: Mutex::new(None),
        })
    }

    /// Run a read-only closure against the live session.
    pub async fn read_workflow<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Workflow) -> T,
    {
        let guard = self.workflow.read().await;
        f(&guard)
    }

    /// Apply `command` to the session atomically.
    ///
    /// The command runs against a draft copy which only replaces the live session when
    /// it succeeds, so a rejected command never leaves partial changes behind.
    pub async fn with_workflow_mut<F, T>(
        &self,
        command: F,
    ) -> Result<(T, SessionSnapshot), WorkflowError>
    where
        F: FnOnce(&mut Workflow) -> Result<T, WorkflowError>,
    {
        let mut guard = self.workflow.write().await;
        commit(&mut guard, command)
    }

    /// Apply a client command atomically, refusing it while an automation run owns the
    /// session.
    ///
    /// The driver claims its run before taking the lock for its first phase, so checking
    /// under the lock leaves no window for a client command to land between two phases.
    pub async fn with_client_workflow_mut<F, T>(
        &self,
        command: F,
    ) -> Result<(T, SessionSnapshot), ServiceError>
    where
        F: FnOnce(&mut Workflow) -> Result<T, WorkflowError>,
    {
        let mut guard = self.workflow.write().await;
        if self.automation.is_running() {
            return Err(ServiceError::Busy);
        }
        Ok(commit(&mut guard, command)?)
    }

    /// Client-facing view of the live session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.read_workflow(|wf| SessionSnapshot::from(wf)).await
    }

    /// Broadcast hub feeding the `/sse` stream.
    pub fn events(&self) -> &SseHub {
        &self.sse
    }

    /// Single-flight automation driver.
    pub fn automation(&self) -> &AutomationDriver {
        &self.automation
    }

    /// Store persisting the automation schedule.
    pub fn schedule_store(&self) -> &Arc<dyn ScheduleStore> {
        &self.schedule_store
    }

    /// Schedule currently applied to the background scheduler.
    pub async fn schedule(&self) -> ScheduleConfig {
        *self.schedule.read().await
    }

    pub(crate) async fn set_schedule(&self, schedule: ScheduleConfig) {
        *self.schedule.write().await = schedule;
    }

    /// Slot holding the running scheduler task, if any.
    pub(crate) fn scheduler(&self) -> &Mutex<Option<SchedulerHandle>> {
        &self.scheduler
    }
}

/// Run `command` against a draft copy and keep it only when it succeeds.
fn commit<F, T>(live: &mut Workflow, command: F) -> Result<(T, SessionSnapshot), WorkflowError>
where
    F: FnOnce(&mut Workflow) -> Result<T, WorkflowError>,
{
    let mut draft = live.clone();
    let value = command(&mut draft)?;
    *live = draft;
    Ok((value, SessionSnapshot::from(&*live)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::schedule_store::InMemoryScheduleStore,
        state::workflow::WorkflowStep,
    };

    fn state() -> SharedState {
        AppState::new(&AppConfig::default(), Arc::new(InMemoryScheduleStore::new()))
    }

    #[tokio::test]
    async fn rejected_command_leaves_session_untouched() {
        let state = state();
        state
            .with_workflow_mut(|wf| wf.add_player("Joe", None, 70.0))
            .await
            .unwrap();
        let before = state.snapshot().await;

        let err = state
            .with_workflow_mut(|wf| {
                wf.reset_to_step(WorkflowStep::AddPlayers)?;
                wf.advance(WorkflowStep::FormTeams)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Precondition(_)));
        let after = state.snapshot().await;
        assert_eq!(after.pool.len(), before.pool.len());
        assert_eq!(after.pool[0].id, before.pool[0].id);
    }

    #[tokio::test]
    async fn client_commands_wait_for_the_automation_run() {
        let state = state();
        let guard = state
            .automation()
            .try_begin(crate::services::automation::RunTrigger::Manual)
            .unwrap();

        let err = state
            .with_client_workflow_mut(|wf| wf.add_player("Joe", None, 70.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Busy));
        assert_eq!(state.read_workflow(|wf| wf.player_count()).await, 0);

        state
            .with_workflow_mut(|wf| wf.add_player("Driver", None, 70.0))
            .await
            .unwrap();

        drop(guard);
        state
            .with_client_workflow_mut(|wf| wf.add_player("Joe", None, 70.0))
            .await
            .unwrap();
        assert_eq!(state.read_workflow(|wf| wf.player_count()).await, 2);
    }

    #[tokio::test]
    async fn accepted_command_returns_fresh_snapshot() {
        let state = state();
        let (id, snapshot) = state
            .with_workflow_mut(|wf| wf.add_player("Joe", None, 70.0))
            .await
            .unwrap();
        assert_eq!(snapshot.pool[0].id, id);
        assert_eq!(state.read_workflow(|wf| wf.player_count()).await, 1);
    }
}
