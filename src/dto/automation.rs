//! Request and response payloads for the automation routes.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::ScheduleConfig,
    services::automation::{AutomationPhase, RunReport},
};

/// Returned when a manual run was accepted.
#[derive(Debug, Serialize, ToSchema)]
pub struct RunAccepted {
    /// Identifier of the run, reported again in its SSE events.
    pub run_id: Uuid,
}

/// Snapshot of the automation driver.
#[derive(Debug, Serialize, ToSchema)]
pub struct AutomationStatus {
    /// Whether a run is in flight.
    pub running: bool,
    /// Phase of the in-flight run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<AutomationPhase>,
    /// Schedule currently in effect.
    pub schedule: ScheduleConfig,
    /// Next local fire time, RFC 3339, when the schedule is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<String>,
    /// Report of the most recent run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<RunReport>,
}
