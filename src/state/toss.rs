//! Captain selection and coin toss resolution.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::{
    model::{CoinFace, PlayerId, TeamId, TossChoice, TossOutcome},
    workflow::{Workflow, WorkflowError},
};

/// How a drawn face is turned into a toss winner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TossRule {
    /// The calling team wins when the drawn face matches its call, otherwise the other team wins.
    #[default]
    CaptainCall,
    /// Legacy rule without a call: heads goes to Team Alpha, tails to Team Beta.
    FixedMapping,
}

/// Decide the toss winner for an already drawn face.
///
/// Under [`TossRule::CaptainCall`] a missing call is a precondition failure.
pub fn resolve_toss(
    rule: TossRule,
    choice: Option<TossChoice>,
    drawn: CoinFace,
) -> Result<TossOutcome, WorkflowError> {
    let winning_team = match rule {
        TossRule::CaptainCall => {
            let choice = choice.ok_or_else(|| {
                WorkflowError::Precondition("a captain must call the toss first".into())
            })?;
            if choice.called_face == drawn {
                choice.calling_team
            } else {
                choice.calling_team.other()
            }
        }
        TossRule::FixedMapping => match drawn {
            CoinFace::Heads => TeamId::Alpha,
            CoinFace::Tails => TeamId::Beta,
        },
    };

    Ok(TossOutcome {
        result_face: drawn,
        winning_team,
    })
}

/// Pick a uniformly random captain for every non-empty team.
///
/// Empty teams are left without a captain. Returns the appointed captains.
pub fn select_random_captains<R: Rng>(
    workflow: &mut Workflow,
    rng: &mut R,
) -> Vec<(TeamId, PlayerId)> {
    let mut appointed = Vec::with_capacity(TeamId::ALL.len());
    for team_id in TeamId::ALL {
        let team = workflow.team(team_id);
        if team.is_empty() {
            continue;
        }
        let index = rng.random_range(0..team.len());
        let player = &team.players[index];
        let (player_id, name) = (player.id, player.name.clone());
        if workflow.select_captain(player_id, team_id) {
            info!(team = %team_id, captain = %name, "random captain selected");
            appointed.push((team_id, player_id));
        }
    }
    appointed
}
