use crate::{
    dto::workflow::SessionSnapshot,
    error::ServiceError,
    services::sse_events::broadcast_workflow_updated,
    state::{
        SharedState,
        workflow::{Workflow, WorkflowError},
    },
};

/// Apply a client command atomically, then broadcast the resulting session.
///
/// Nothing is broadcast when the command is rejected. Commands are refused with
/// [`ServiceError::Busy`] while an automation run is in flight.
pub async fn apply_with_broadcast<F, T>(
    state: &SharedState,
    command: F,
) -> Result<(T, SessionSnapshot), ServiceError>
where
    F: FnOnce(&mut Workflow) -> Result<T, WorkflowError>,
{
    let (value, snapshot) = state.with_client_workflow_mut(command).await?;
    broadcast_workflow_updated(state, &snapshot);
    Ok((value, snapshot))
}

/// Apply one phase of the in-flight automation run, then broadcast the resulting session.
pub(crate) async fn apply_run_phase<F, T>(
    state: &SharedState,
    command: F,
) -> Result<(T, SessionSnapshot), ServiceError>
where
    F: FnOnce(&mut Workflow) -> Result<T, WorkflowError>,
{
    let (value, snapshot) = state.with_workflow_mut(command).await?;
    broadcast_workflow_updated(state, &snapshot);
    Ok((value, snapshot))
}
