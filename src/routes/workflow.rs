use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::workflow::{
        AddPlayerRequest, BalanceResponse, FormationRequest, MovePlayerRequest,
        PlayerAddedResponse, SelectCaptainRequest, SessionSnapshot, StepRequest,
    },
    error::AppError,
    services::workflow_service,
    state::{SharedState, model::TossChoice},
};

/// Draft session commands.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/workflow", get(get_session))
        .route("/workflow/players", post(add_player))
        .route("/workflow/players/{id}", delete(remove_player))
        .route("/workflow/players/{id}/move", post(move_player))
        .route("/workflow/players/{id}/unassign", post(unassign_player))
        .route("/workflow/teams/balance", post(balance_teams))
        .route("/workflow/teams/formation", post(set_formation))
        .route("/workflow/captains", post(select_captain))
        .route("/workflow/captains/random", post(select_random_captains))
        .route("/workflow/toss/choice", post(set_captain_choice))
        .route("/workflow/toss", post(perform_toss))
        .route("/workflow/step", post(set_step))
        .route("/workflow/advance", post(advance))
        .route("/workflow/reset", post(reset))
        .route("/workflow/result", get(get_result))
}

/// Current state of the draft session.
#[utoipa::path(
    get,
    path = "/workflow",
    tag = "workflow",
    responses((status = 200, description = "Draft session", body = SessionSnapshot))
)]
pub async fn get_session(State(state): State<SharedState>) -> Json<SessionSnapshot> {
    Json(workflow_service::session(&state).await)
}

/// Add a player to the unassigned pool.
#[utoipa::path(
    post,
    path = "/workflow/players",
    tag = "workflow",
    request_body = AddPlayerRequest,
    responses(
        (status = 201, description = "Player added", body = PlayerAddedResponse),
        (status = 400, description = "Empty name or non-positive weight")
    )
)]
pub async fn add_player(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AddPlayerRequest>>,
) -> Result<(StatusCode, Json<PlayerAddedResponse>), AppError> {
    let response = workflow_service::add_player(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Remove a player from the pool or a team.
#[utoipa::path(
    delete,
    path = "/workflow/players/{id}",
    tag = "workflow",
    params(("id" = Uuid, Path, description = "Identifier of the player to remove")),
    responses(
        (status = 200, description = "Player removed", body = SessionSnapshot),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn remove_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(workflow_service::remove_player(&state, id).await?))
}

/// Move a player to the end of a team roster.
#[utoipa::path(
    post,
    path = "/workflow/players/{id}/move",
    tag = "workflow",
    params(("id" = Uuid, Path, description = "Identifier of the player to move")),
    request_body = MovePlayerRequest,
    responses(
        (status = 200, description = "Player moved", body = SessionSnapshot),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn move_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MovePlayerRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(
        workflow_service::move_player(&state, id, payload.team_id).await?,
    ))
}

/// Send a player back to the unassigned pool.
#[utoipa::path(
    post,
    path = "/workflow/players/{id}/unassign",
    tag = "workflow",
    params(("id" = Uuid, Path, description = "Identifier of the player to unassign")),
    responses(
        (status = 200, description = "Player returned to the pool", body = SessionSnapshot),
        (status = 404, description = "Unknown player"),
        (status = 409, description = "An automation run owns the session")
    )
)]
pub async fn unassign_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(workflow_service::unassign_player(&state, id).await?))
}

/// Distribute the pool across both teams by weight.
#[utoipa::path(
    post,
    path = "/workflow/teams/balance",
    tag = "workflow",
    responses((status = 200, description = "Teams balanced", body = BalanceResponse))
)]
pub async fn balance_teams(
    State(state): State<SharedState>,
) -> Result<Json<BalanceResponse>, AppError> {
    Ok(Json(workflow_service::balance_teams(&state).await?))
}

/// Mark team formation as complete or reopen it.
#[utoipa::path(
    post,
    path = "/workflow/teams/formation",
    tag = "workflow",
    request_body = FormationRequest,
    responses((status = 200, description = "Flag updated", body = SessionSnapshot))
)]
pub async fn set_formation(
    State(state): State<SharedState>,
    Json(payload): Json<FormationRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(
        workflow_service::set_formation_complete(&state, payload.complete).await?,
    ))
}

/// Appoint a team captain.
#[utoipa::path(
    post,
    path = "/workflow/captains",
    tag = "workflow",
    request_body = SelectCaptainRequest,
    responses(
        (status = 200, description = "Captain appointed", body = SessionSnapshot),
        (status = 404, description = "Player is not on that team")
    )
)]
pub async fn select_captain(
    State(state): State<SharedState>,
    Json(payload): Json<SelectCaptainRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(
        workflow_service::select_captain(&state, payload.player_id, payload.team_id).await?,
    ))
}

/// Appoint a random captain in each non-empty team.
#[utoipa::path(
    post,
    path = "/workflow/captains/random",
    tag = "workflow",
    responses((status = 200, description = "Captains appointed", body = SessionSnapshot))
)]
pub async fn select_random_captains(
    State(state): State<SharedState>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(
        workflow_service::select_random_captains_for_teams(&state).await?,
    ))
}

/// Record which team calls the toss and the face it calls.
#[utoipa::path(
    post,
    path = "/workflow/toss/choice",
    tag = "workflow",
    request_body = TossChoice,
    responses((status = 200, description = "Call recorded", body = SessionSnapshot))
)]
pub async fn set_captain_choice(
    State(state): State<SharedState>,
    Json(payload): Json<TossChoice>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(
        workflow_service::set_captain_choice(&state, payload).await?,
    ))
}

/// Flip the coin.
#[utoipa::path(
    post,
    path = "/workflow/toss",
    tag = "workflow",
    responses(
        (status = 200, description = "Toss resolved", body = SessionSnapshot),
        (status = 409, description = "No captain's call recorded")
    )
)]
pub async fn perform_toss(
    State(state): State<SharedState>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(workflow_service::perform_toss(&state).await?))
}

/// Jump to a step without checking prerequisites.
#[utoipa::path(
    post,
    path = "/workflow/step",
    tag = "workflow",
    request_body = StepRequest,
    responses((status = 200, description = "Step set", body = SessionSnapshot))
)]
pub async fn set_step(
    State(state): State<SharedState>,
    Json(payload): Json<StepRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(workflow_service::set_step(&state, payload.step).await?))
}

/// Move one step forward.
#[utoipa::path(
    post,
    path = "/workflow/advance",
    tag = "workflow",
    request_body = StepRequest,
    responses(
        (status = 200, description = "Step advanced", body = SessionSnapshot),
        (status = 409, description = "Prerequisites of the step are not met")
    )
)]
pub async fn advance(
    State(state): State<SharedState>,
    Json(payload): Json<StepRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(workflow_service::advance(&state, payload.step).await?))
}

/// Rewind the session to an earlier step.
#[utoipa::path(
    post,
    path = "/workflow/reset",
    tag = "workflow",
    request_body = StepRequest,
    responses(
        (status = 200, description = "Session rewound", body = SessionSnapshot),
        (status = 409, description = "The result step cannot be a reset target")
    )
)]
pub async fn reset(
    State(state): State<SharedState>,
    Json(payload): Json<StepRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(workflow_service::reset(&state, payload.step).await?))
}

/// Final teams, captains and toss outcome.
#[utoipa::path(
    get,
    path = "/workflow/result",
    tag = "workflow",
    responses(
        (status = 200, description = "Draft result", body = SessionSnapshot),
        (status = 409, description = "The draft has not reached its result")
    )
)]
pub async fn get_result(
    State(state): State<SharedState>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(workflow_service::result(&state).await?))
}
