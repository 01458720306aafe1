use serde::Serialize;
use utoipa::ToSchema;

use crate::state::workflow::WorkflowStep;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok").
    pub status: String,
    /// Current workflow step of the live session.
    pub step: WorkflowStep,
    /// Whether an automation run is in flight.
    pub automation_running: bool,
}
