use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::workflow::SessionSnapshot,
    services::automation::{AutomationPhase, RunTrigger},
    state::workflow::WorkflowStep,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE channel.
pub struct ServerEvent {
    /// SSE event name.
    pub event: Option<String>,
    /// Serialised JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Workflow step at connection time.
    pub step: WorkflowStep,
    /// Whether an automation run is in flight.
    pub automation_running: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast after every accepted workflow mutation.
pub struct WorkflowUpdatedEvent(pub SessionSnapshot);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an automation run enters a new phase.
pub struct AutomationPhaseEvent {
    /// Run identifier.
    pub run_id: Uuid,
    /// What started the run.
    pub trigger: RunTrigger,
    /// Phase just entered.
    pub phase: AutomationPhase,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once an automation run reached the result step.
pub struct AutomationCompletedEvent {
    /// Run identifier.
    pub run_id: Uuid,
    /// Session at the result step.
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an automation run aborted.
pub struct AutomationFailedEvent {
    /// Run identifier.
    pub run_id: Uuid,
    /// Phase that was running when the failure happened.
    pub phase: AutomationPhase,
    /// Rejection reason.
    pub message: String,
}
