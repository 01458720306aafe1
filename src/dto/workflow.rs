//! DTO definitions for the draft workflow routes and SSE payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::validation::validate_player_name,
    state::{
        model::{Player, Team, TeamId, TossChoice, TossOutcome},
        workflow::{Workflow, WorkflowStep},
    },
};

/// Payload used to add a player to the unassigned pool.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddPlayerRequest {
    /// Display name, trimmed and non-empty.
    #[validate(custom(function = "validate_player_name"))]
    pub name: String,
    /// Optional avatar; a placeholder is generated when missing or blank.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Strictly positive weight.
    #[validate(range(exclusive_min = 0.0))]
    pub weight: f64,
}

/// Target roster for a player move.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MovePlayerRequest {
    /// Destination roster.
    pub team_id: TeamId,
}

/// Appoint a captain inside one team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectCaptainRequest {
    /// Player to appoint.
    pub player_id: Uuid,
    /// Team the player belongs to.
    pub team_id: TeamId,
}

/// Requested workflow step for navigation and resets.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StepRequest {
    /// Target step.
    pub step: WorkflowStep,
}

/// Toggle for the formation-complete flag.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FormationRequest {
    /// New value of the flag.
    pub complete: bool,
}

/// Player as exposed to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Stable identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    pub image_url: String,
    /// Weight used for balancing.
    pub weight: f64,
    /// Whether the player captains its team.
    pub is_captain: bool,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            image_url: player.image_url.clone(),
            weight: player.weight,
            is_captain: player.is_captain,
        }
    }
}

/// Team roster as exposed to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamSummary {
    /// Team identifier.
    pub id: TeamId,
    /// Display name.
    pub name: String,
    /// Roster in insertion order.
    pub players: Vec<PlayerSummary>,
    /// Current captain, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captain_id: Option<Uuid>,
    /// Sum of the roster weights.
    pub total_weight: f64,
}

impl From<&Team> for TeamSummary {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            players: team.players.iter().map(PlayerSummary::from).collect(),
            captain_id: team.captain_id(),
            total_weight: team.total_weight(),
        }
    }
}

/// Complete view of the draft session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    /// Current workflow step.
    pub step: WorkflowStep,
    /// Players not yet assigned to a team.
    pub pool: Vec<PlayerSummary>,
    /// Team Alpha roster.
    pub team_alpha: TeamSummary,
    /// Team Beta roster.
    pub team_beta: TeamSummary,
    /// Whether team assignment was finalised.
    pub formation_complete: bool,
    /// Captain's call, once recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captain_choice: Option<TossChoice>,
    /// Resolved toss, once performed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toss_outcome: Option<TossOutcome>,
    /// True once the session reached the result step with a resolved toss.
    pub result_ready: bool,
}

impl From<&Workflow> for SessionSnapshot {
    fn from(workflow: &Workflow) -> Self {
        Self {
            step: workflow.step(),
            pool: workflow.pool().iter().map(PlayerSummary::from).collect(),
            team_alpha: workflow.team(TeamId::Alpha).into(),
            team_beta: workflow.team(TeamId::Beta).into(),
            formation_complete: workflow.is_team_formation_complete(),
            captain_choice: workflow.captain_choice(),
            toss_outcome: workflow.toss_outcome(),
            result_ready: workflow.is_result_ready(),
        }
    }
}

/// Response returned after a player was added.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerAddedResponse {
    /// Newly added player.
    pub player: PlayerSummary,
    /// Session after the addition.
    pub session: SessionSnapshot,
}

/// Response returned after the pool was balanced across both teams.
#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    /// Weight handed to Team Alpha by this pass.
    pub alpha_weight: f64,
    /// Weight handed to Team Beta by this pass.
    pub beta_weight: f64,
    /// Session after balancing.
    pub session: SessionSnapshot,
}
