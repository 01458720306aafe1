use axum::Router;

use crate::state::SharedState;

/// Schedule and manual run endpoints.
pub mod automation;
/// Swagger UI and OpenAPI document.
pub mod docs;
/// Liveness endpoint.
pub mod health;
/// Server-Sent Events stream.
pub mod sse;
/// Draft session commands.
pub mod workflow;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(workflow::router())
        .merge(automation::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
