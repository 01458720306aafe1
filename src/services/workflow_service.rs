use tracing::info;
use uuid::Uuid;

use crate::{
    dto::workflow::{
        AddPlayerRequest, BalanceResponse, PlayerAddedResponse, PlayerSummary, SessionSnapshot,
    },
    error::ServiceError,
    state::{
        SharedState,
        balancing::form_balanced_teams,
        model::{TeamId, TossChoice},
        toss::select_random_captains,
        transitions::apply_with_broadcast,
        workflow::{WorkflowError, WorkflowStep},
    },
};

/// Current state of the draft session.
pub async fn session(state: &SharedState) -> SessionSnapshot {
    state.snapshot().await
}

/// Add a player to the unassigned pool.
pub async fn add_player(
    state: &SharedState,
    request: AddPlayerRequest,
) -> Result<PlayerAddedResponse, ServiceError> {
    let (player, session) = apply_with_broadcast(state, |wf| {
        let id = wf.add_player(&request.name, request.image_url.as_deref(), request.weight)?;
        wf.find_player(id)
            .map(|(_, player)| PlayerSummary::from(player))
            .ok_or_else(|| player_not_found(id))
    })
    .await?;
    info!(player_id = %player.id, name = %player.name, "player added");
    Ok(PlayerAddedResponse { player, session })
}

/// Remove a player from wherever it sits.
pub async fn remove_player(
    state: &SharedState,
    player_id: Uuid,
) -> Result<SessionSnapshot, ServiceError> {
    let (_, session) = apply_with_broadcast(state, |wf| {
        wf.remove_player(player_id)
            .map(|_| ())
            .ok_or_else(|| player_not_found(player_id))
    })
    .await?;
    Ok(session)
}

/// Move a player to the end of a team roster.
pub async fn move_player(
    state: &SharedState,
    player_id: Uuid,
    team_id: TeamId,
) -> Result<SessionSnapshot, ServiceError> {
    let (_, session) = apply_with_broadcast(state, |wf| {
        if wf.move_player_to_team(player_id, team_id) {
            Ok(())
        } else {
            Err(player_not_found(player_id))
        }
    })
    .await?;
    Ok(session)
}

/// Send a player back to the unassigned pool.
pub async fn unassign_player(
    state: &SharedState,
    player_id: Uuid,
) -> Result<SessionSnapshot, ServiceError> {
    let (_, session) = apply_with_broadcast(state, |wf| {
        if wf.move_player_to_pool(player_id) {
            Ok(())
        } else {
            Err(player_not_found(player_id))
        }
    })
    .await?;
    Ok(session)
}

/// Distribute the pool across both teams by weight.
pub async fn balance_teams(state: &SharedState) -> Result<BalanceResponse, ServiceError> {
    let (report, session) =
        apply_with_broadcast(state, |wf| Ok(form_balanced_teams(wf))).await?;
    Ok(BalanceResponse {
        alpha_weight: report.alpha_weight,
        beta_weight: report.beta_weight,
        session,
    })
}

/// Mark team formation as complete or reopen it.
pub async fn set_formation_complete(
    state: &SharedState,
    complete: bool,
) -> Result<SessionSnapshot, ServiceError> {
    let (_, session) = apply_with_broadcast(state, |wf| {
        wf.set_team_formation_complete(complete);
        Ok(())
    })
    .await?;
    Ok(session)
}

/// Appoint `player_id` as the captain of `team_id`.
pub async fn select_captain(
    state: &SharedState,
    player_id: Uuid,
    team_id: TeamId,
) -> Result<SessionSnapshot, ServiceError> {
    let (_, session) = apply_with_broadcast(state, |wf| {
        if wf.select_captain(player_id, team_id) {
            Ok(())
        } else {
            Err(WorkflowError::NotFound(format!(
                "player {player_id} is not on {}",
                team_id.display_name()
            )))
        }
    })
    .await?;
    Ok(session)
}

/// Appoint a random captain in each non-empty team.
pub async fn select_random_captains_for_teams(
    state: &SharedState,
) -> Result<SessionSnapshot, ServiceError> {
    let (_, session) = apply_with_broadcast(state, |wf| {
        Ok(select_random_captains(wf, &mut rand::rng()))
    })
    .await?;
    Ok(session)
}

/// Record the captain's call.
pub async fn set_captain_choice(
    state: &SharedState,
    choice: TossChoice,
) -> Result<SessionSnapshot, ServiceError> {
    let (_, session) = apply_with_broadcast(state, |wf| {
        wf.set_captain_choice(choice);
        Ok(())
    })
    .await?;
    Ok(session)
}

/// Flip the coin and store the outcome.
pub async fn perform_toss(state: &SharedState) -> Result<SessionSnapshot, ServiceError> {
    let (_, session) = apply_with_broadcast(state, |wf| wf.perform_toss(&mut rand::rng())).await?;
    Ok(session)
}

/// Jump to a step without checking prerequisites.
pub async fn set_step(
    state: &SharedState,
    step: WorkflowStep,
) -> Result<SessionSnapshot, ServiceError> {
    let (_, session) = apply_with_broadcast(state, |wf| {
        wf.set_step(step);
        Ok(())
    })
    .await?;
    Ok(session)
}

/// Move one step forward when its prerequisites hold.
pub async fn advance(
    state: &SharedState,
    step: WorkflowStep,
) -> Result<SessionSnapshot, ServiceError> {
    let (_, session) = apply_with_broadcast(state, |wf| wf.advance(step)).await?;
    Ok(session)
}

/// Rewind the session to an earlier step.
pub async fn reset(
    state: &SharedState,
    step: WorkflowStep,
) -> Result<SessionSnapshot, ServiceError> {
    let (_, session) = apply_with_broadcast(state, |wf| wf.reset_to_step(step)).await?;
    Ok(session)
}

/// Final session, available once the result step holds a toss outcome.
pub async fn result(state: &SharedState) -> Result<SessionSnapshot, ServiceError> {
    let session = state.snapshot().await;
    if session.result_ready {
        Ok(session)
    } else {
        Err(ServiceError::InvalidState(
            "the draft has not reached its result yet".into(),
        ))
    }
}

fn player_not_found(player_id: Uuid) -> WorkflowError {
    WorkflowError::NotFound(format!("player {player_id} not found"))
}
