use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Team Toss Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::event_stream,
        crate::routes::workflow::get_session,
        crate::routes::workflow::add_player,
        crate::routes::workflow::remove_player,
        crate::routes::workflow::move_player,
        crate::routes::workflow::unassign_player,
        crate::routes::workflow::balance_teams,
        crate::routes::workflow::set_formation,
        crate::routes::workflow::select_captain,
        crate::routes::workflow::select_random_captains,
        crate::routes::workflow::set_captain_choice,
        crate::routes::workflow::perform_toss,
        crate::routes::workflow::set_step,
        crate::routes::workflow::advance,
        crate::routes::workflow::reset,
        crate::routes::workflow::get_result,
        crate::routes::automation::get_schedule,
        crate::routes::automation::update_schedule,
        crate::routes::automation::run_now,
        crate::routes::automation::get_status,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::workflow::AddPlayerRequest,
            crate::dto::workflow::MovePlayerRequest,
            crate::dto::workflow::SelectCaptainRequest,
            crate::dto::workflow::StepRequest,
            crate::dto::workflow::FormationRequest,
            crate::dto::workflow::SessionSnapshot,
            crate::dto::workflow::PlayerAddedResponse,
            crate::dto::workflow::BalanceResponse,
            crate::dto::automation::RunAccepted,
            crate::dto::automation::AutomationStatus,
            crate::dto::sse::Handshake,
            crate::dto::sse::AutomationPhaseEvent,
            crate::dto::sse::AutomationCompletedEvent,
            crate::dto::sse::AutomationFailedEvent,
            crate::config::ScheduleConfig,
            crate::state::model::TossChoice,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "workflow", description = "Draft session commands"),
        (name = "automation", description = "Scheduled and manual automation runs"),
        (name = "sse", description = "Server-sent events stream"),
    )
)]
pub struct ApiDoc;
