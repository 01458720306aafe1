use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    config::ScheduleConfig,
    dto::automation::{AutomationStatus, RunAccepted},
    error::AppError,
    services::automation_service,
    state::SharedState,
};

/// Schedule management and manual automation runs.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/automation/schedule",
            get(get_schedule).put(update_schedule),
        )
        .route("/automation/run", post(run_now))
        .route("/automation/status", get(get_status))
}

/// Schedule currently in effect.
#[utoipa::path(
    get,
    path = "/automation/schedule",
    tag = "automation",
    responses((status = 200, description = "Current schedule", body = ScheduleConfig))
)]
pub async fn get_schedule(State(state): State<SharedState>) -> Json<ScheduleConfig> {
    Json(automation_service::get_schedule(&state).await)
}

/// Persist a new schedule and restart the scheduler with it.
#[utoipa::path(
    put,
    path = "/automation/schedule",
    tag = "automation",
    request_body = ScheduleConfig,
    responses(
        (status = 200, description = "Schedule saved", body = ScheduleConfig),
        (status = 400, description = "Hour or minute out of range"),
        (status = 503, description = "Schedule could not be persisted")
    )
)]
pub async fn update_schedule(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ScheduleConfig>>,
) -> Result<Json<ScheduleConfig>, AppError> {
    Ok(Json(
        automation_service::update_schedule(&state, payload).await?,
    ))
}

/// Start an automation run immediately.
#[utoipa::path(
    post,
    path = "/automation/run",
    tag = "automation",
    responses(
        (status = 202, description = "Run started", body = RunAccepted),
        (status = 409, description = "A run is already in flight")
    )
)]
pub async fn run_now(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<RunAccepted>), AppError> {
    let accepted = automation_service::run_now(&state)?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// Driver activity, schedule and last run report.
#[utoipa::path(
    get,
    path = "/automation/status",
    tag = "automation",
    responses((status = 200, description = "Automation status", body = AutomationStatus))
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<AutomationStatus> {
    Json(automation_service::status(&state).await)
}
