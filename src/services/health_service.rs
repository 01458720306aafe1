use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the current step and automation activity.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let step = state.read_workflow(|wf| wf.step()).await;
    HealthResponse {
        status: "ok".into(),
        step,
        automation_running: state.automation().is_running(),
    }
}
