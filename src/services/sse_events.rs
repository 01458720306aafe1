use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        sse::{
            AutomationCompletedEvent, AutomationFailedEvent, AutomationPhaseEvent, ServerEvent,
            WorkflowUpdatedEvent,
        },
        workflow::SessionSnapshot,
    },
    services::automation::{AutomationPhase, RunTrigger},
    state::AppState,
};

pub(crate) const EVENT_WORKFLOW_UPDATED: &str = "workflow.updated";
pub(crate) const EVENT_AUTOMATION_PHASE: &str = "automation.phase";
pub(crate) const EVENT_AUTOMATION_COMPLETED: &str = "automation.completed";
pub(crate) const EVENT_AUTOMATION_FAILED: &str = "automation.failed";
pub(crate) const EVENT_HANDSHAKE: &str = "handshake";

/// Broadcast the session after an accepted mutation.
pub fn broadcast_workflow_updated(state: &AppState, session: &SessionSnapshot) {
    let payload = WorkflowUpdatedEvent(session.clone());
    send_event(state, EVENT_WORKFLOW_UPDATED, &payload);
}

/// Broadcast that an automation run entered `phase`.
pub fn broadcast_automation_phase(
    state: &AppState,
    run_id: Uuid,
    trigger: RunTrigger,
    phase: AutomationPhase,
) {
    let payload = AutomationPhaseEvent {
        run_id,
        trigger,
        phase,
    };
    send_event(state, EVENT_AUTOMATION_PHASE, &payload);
}

/// Broadcast the final session of a completed automation run.
pub fn broadcast_automation_completed(state: &AppState, run_id: Uuid, session: &SessionSnapshot) {
    let payload = AutomationCompletedEvent {
        run_id,
        session: session.clone(),
    };
    send_event(state, EVENT_AUTOMATION_COMPLETED, &payload);
}

/// Broadcast that an automation run aborted during `phase`.
pub fn broadcast_automation_failed(
    state: &AppState,
    run_id: Uuid,
    phase: AutomationPhase,
    message: &str,
) {
    let payload = AutomationFailedEvent {
        run_id,
        phase,
        message: message.to_string(),
    };
    send_event(state, EVENT_AUTOMATION_FAILED, &payload);
}

fn send_event(state: &AppState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.events().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
