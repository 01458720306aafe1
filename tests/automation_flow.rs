//! Integration tests for automation runs, the schedule and the session service.

use std::{sync::Arc, time::Duration};

use team_toss_back::{
    config::{AppConfig, AutomationPauses, ScheduleConfig},
    dao::schedule_store::{InMemoryScheduleStore, JsonFileScheduleStore, ScheduleStore},
    dto::workflow::AddPlayerRequest,
    error::ServiceError,
    services::{
        automation::{AutomationPhase, RunOutcome, RunTrigger},
        automation_service, scheduler, workflow_service,
    },
    state::{AppState, SharedState, model::TeamId, workflow::WorkflowStep},
};
use tokio::time::{sleep, timeout};
use uuid::Uuid;

fn instant_state() -> SharedState {
    let config = AppConfig::default().with_pauses(AutomationPauses::NONE);
    AppState::new(&config, Arc::new(InMemoryScheduleStore::new()))
}

async fn wait_until_idle(state: &SharedState) {
    timeout(Duration::from_secs(5), async {
        while state.automation().is_running() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("automation run did not finish in time");
}

#[tokio::test]
async fn manual_run_replaces_the_session_and_reaches_result() {
    let state = instant_state();
    workflow_service::add_player(
        &state,
        AddPlayerRequest {
            name: "Leftover".into(),
            image_url: None,
            weight: 40.0,
        },
    )
    .await
    .unwrap();

    let accepted = automation_service::run_now(&state).unwrap();
    wait_until_idle(&state).await;

    let status = automation_service::status(&state).await;
    let report = status.last_run.expect("run report");
    assert_eq!(report.run_id, accepted.run_id);
    assert_eq!(report.trigger, RunTrigger::Manual);
    let RunOutcome::Completed {
        alpha_weight,
        beta_weight,
        ..
    } = report.outcome
    else {
        panic!("run failed: {:?}", report.outcome);
    };
    assert!((alpha_weight - beta_weight).abs() <= 85.0);

    let result = workflow_service::result(&state).await.unwrap();
    assert_eq!(result.step, WorkflowStep::Result);
    let names: Vec<&str> = result
        .team_alpha
        .players
        .iter()
        .chain(&result.team_beta.players)
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names.len(), 16);
    assert!(!names.contains(&"Leftover"));
    assert!(result.captain_choice.is_some());
}

#[tokio::test]
async fn run_now_is_rejected_while_a_run_is_in_flight() {
    let state = instant_state();
    let guard = state.automation().try_begin(RunTrigger::Scheduled).unwrap();

    assert!(matches!(
        automation_service::run_now(&state),
        Err(ServiceError::Busy)
    ));
    let status = automation_service::status(&state).await;
    assert!(status.running);
    assert_eq!(status.phase, Some(AutomationPhase::Seeding));

    drop(guard);
    assert!(automation_service::run_now(&state).is_ok());
    wait_until_idle(&state).await;
}

#[tokio::test(start_paused = true)]
async fn session_stays_locked_between_run_phases() {
    let pauses = AutomationPauses {
        phase: Duration::from_millis(300),
        result: Duration::from_millis(300),
    };
    let config = AppConfig::default().with_pauses(pauses);
    let state = AppState::new(&config, Arc::new(InMemoryScheduleStore::new()));

    automation_service::run_now(&state).unwrap();
    let captain = timeout(Duration::from_secs(5), async {
        loop {
            if state.automation().current_phase() == Some(AutomationPhase::CaptainSelection) {
                if let Some(id) = state.snapshot().await.team_alpha.captain_id {
                    return id;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("run did not reach captain selection");

    assert!(matches!(
        workflow_service::move_player(&state, captain, TeamId::Beta).await,
        Err(ServiceError::Busy)
    ));
    assert!(matches!(
        workflow_service::reset(&state, WorkflowStep::FormTeams).await,
        Err(ServiceError::Busy)
    ));
    wait_until_idle(&state).await;

    let report = state.automation().last_report().expect("run report");
    assert!(report.is_completed(), "run failed: {:?}", report.outcome);
    let result = workflow_service::result(&state).await.unwrap();
    assert_eq!(result.team_alpha.captain_id, Some(captain));
    assert!(result.team_beta.captain_id.is_some());
    assert_eq!(
        result.team_alpha.players.len() + result.team_beta.players.len(),
        16
    );

    workflow_service::reset(&state, WorkflowStep::FormTeams)
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_run_does_not_stop_later_runs() {
    let config = AppConfig::default()
        .with_pauses(AutomationPauses::NONE)
        .with_default_roster(Vec::new());
    let state = AppState::new(&config, Arc::new(InMemoryScheduleStore::new()));

    let report = state
        .automation()
        .run(&state, RunTrigger::Scheduled)
        .await
        .unwrap();
    assert!(matches!(
        report.outcome,
        RunOutcome::Failed {
            phase: AutomationPhase::Seeding,
            ..
        }
    ));
    assert_eq!(state.snapshot().await.step, WorkflowStep::AddPlayers);

    let again = state
        .automation()
        .run(&state, RunTrigger::Scheduled)
        .await
        .unwrap();
    assert_ne!(again.run_id, report.run_id);
    assert!(!state.automation().is_running());
}

#[tokio::test]
async fn schedule_survives_a_restart() {
    let path = std::env::temp_dir()
        .join(format!("team-toss-it-{}", Uuid::new_v4().simple()))
        .join("schedule.json");
    let schedule = ScheduleConfig {
        hour: 21,
        minute: 45,
        enabled: true,
    };

    let first = AppState::new(
        &AppConfig::default(),
        Arc::new(JsonFileScheduleStore::new(&path)),
    );
    automation_service::update_schedule(&first, schedule)
        .await
        .unwrap();
    assert!(scheduler::is_active(&first).await);
    scheduler::stop(&first).await;

    let second = AppState::new(
        &AppConfig::default(),
        Arc::new(JsonFileScheduleStore::new(&path)),
    );
    assert_eq!(automation_service::restore_schedule(&second).await, schedule);
    assert!(scheduler::is_active(&second).await);
    assert!(automation_service::status(&second).await.next_run_at.is_some());
    scheduler::stop(&second).await;

    let stored = JsonFileScheduleStore::new(&path).load().await.unwrap();
    assert_eq!(stored, Some(schedule));
    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[tokio::test]
async fn missing_schedule_file_restores_the_disabled_default() {
    let path = std::env::temp_dir()
        .join(format!("team-toss-it-{}", Uuid::new_v4().simple()))
        .join("schedule.json");
    let state = AppState::new(
        &AppConfig::default(),
        Arc::new(JsonFileScheduleStore::new(&path)),
    );

    let restored = automation_service::restore_schedule(&state).await;

    assert_eq!(restored, ScheduleConfig::default());
    assert!(!restored.enabled);
    assert!(!scheduler::is_active(&state).await);
}
