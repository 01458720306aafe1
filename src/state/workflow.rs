use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::state::{
    model::{CoinFace, Player, PlayerId, Team, TeamId, TossChoice, TossOutcome},
    toss::{TossRule, resolve_toss},
};

/// Base URL used for generated avatars when a player has no image.
pub const DEFAULT_PLACEHOLDER_BASE: &str = "https://ui-avatars.com/api/";

/// Ordered steps of the draft workflow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    /// Players are collected into the pool.
    AddPlayers,
    /// Players are split between the two teams.
    FormTeams,
    /// Each team gets a captain.
    SelectCaptains,
    /// A captain calls the coin and the toss is resolved.
    Toss,
    /// Final teams, captains and toss winner are displayed.
    Result,
}

impl WorkflowStep {
    /// The step that directly follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            WorkflowStep::AddPlayers => Some(WorkflowStep::FormTeams),
            WorkflowStep::FormTeams => Some(WorkflowStep::SelectCaptains),
            WorkflowStep::SelectCaptains => Some(WorkflowStep::Toss),
            WorkflowStep::Toss => Some(WorkflowStep::Result),
            WorkflowStep::Result => None,
        }
    }
}

/// Errors raised when a workflow command is rejected.
///
/// A rejected command never leaves partial changes behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// The command carried malformed input.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The command referenced a player or team that does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The command is not allowed in the current state.
    #[error("precondition failed: {0}")]
    Precondition(String),
}

/// Where a player currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerLocation {
    /// Unassigned pool.
    Pool,
    /// Roster of the given team.
    Team(TeamId),
}

/// Single authoritative draft session.
///
/// Every player lives in exactly one of the pool, Team Alpha's roster or Team Beta's roster.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    step: WorkflowStep,
    pool: Vec<Player>,
    alpha: Team,
    beta: Team,
    formation_complete: bool,
    captain_choice: Option<TossChoice>,
    toss_outcome: Option<TossOutcome>,
    toss_rule: TossRule,
    placeholder_base: String,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::with_settings(TossRule::default(), DEFAULT_PLACEHOLDER_BASE)
    }
}

impl Workflow {
    /// Fresh session at [`WorkflowStep::AddPlayers`] using the captain's-call toss.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh session with an explicit toss rule and avatar placeholder base URL.
    pub fn with_settings(toss_rule: TossRule, placeholder_base: impl Into<String>) -> Self {
        Self {
            step: WorkflowStep::AddPlayers,
            pool: Vec::new(),
            alpha: Team::new(TeamId::Alpha),
            beta: Team::new(TeamId::Beta),
            formation_complete: false,
            captain_choice: None,
            toss_outcome: None,
            toss_rule,
            placeholder_base: placeholder_base.into(),
        }
    }

    /// Current step.
    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    /// Unassigned players in insertion order.
    pub fn pool(&self) -> &[Player] {
        &self.pool
    }

    /// Roster of the given team.
    pub fn team(&self, id: TeamId) -> &Team {
        match id {
            TeamId::Alpha => &self.alpha,
            TeamId::Beta => &self.beta,
        }
    }

    fn team_mut(&mut self, id: TeamId) -> &mut Team {
        match id {
            TeamId::Alpha => &mut self.alpha,
            TeamId::Beta => &mut self.beta,
        }
    }

    /// Whether team assignment was marked final.
    pub fn is_team_formation_complete(&self) -> bool {
        self.formation_complete
    }

    /// Captain's call, once recorded.
    pub fn captain_choice(&self) -> Option<TossChoice> {
        self.captain_choice
    }

    /// Resolved toss, once performed.
    pub fn toss_outcome(&self) -> Option<TossOutcome> {
        self.toss_outcome
    }

    /// Rule deciding who wins the toss.
    pub fn toss_rule(&self) -> TossRule {
        self.toss_rule
    }

    /// Total number of players across the pool and both rosters.
    pub fn player_count(&self) -> usize {
        self.pool.len() + self.alpha.len() + self.beta.len()
    }

    /// Every player id, pool first, then Team Alpha, then Team Beta.
    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.pool
            .iter()
            .chain(&self.alpha.players)
            .chain(&self.beta.players)
            .map(|player| player.id)
    }

    /// Locate a player in any collection.
    pub fn find_player(&self, id: PlayerId) -> Option<(PlayerLocation, &Player)> {
        if let Some(player) = self.pool.iter().find(|player| player.id == id) {
            return Some((PlayerLocation::Pool, player));
        }
        TeamId::ALL.into_iter().find_map(|team_id| {
            self.team(team_id)
                .players
                .iter()
                .find(|player| player.id == id)
                .map(|player| (PlayerLocation::Team(team_id), player))
        })
    }

    /// Whether the session sits at [`WorkflowStep::Result`] with a resolved toss.
    pub fn is_result_ready(&self) -> bool {
        self.step == WorkflowStep::Result && self.toss_outcome.is_some()
    }

    /// Append a new player to the pool and return its identifier.
    ///
    /// A blank `image_url` falls back to a placeholder avatar keyed by the name.
    pub fn add_player(
        &mut self,
        name: &str,
        image_url: Option<&str>,
        weight: f64,
    ) -> Result<PlayerId, WorkflowError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::Validation("player name is required".into()));
        }
        if !weight.is_finite() || weight <= 0.0 {
            return Err(WorkflowError::Validation(format!(
                "player weight must be a positive number (got {weight})"
            )));
        }

        let image_url = image_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| placeholder_image_url(&self.placeholder_base, name));

        let player = Player::new(name.to_string(), image_url, weight);
        let id = player.id;
        debug!(player_id = %id, name, weight, "player added to pool");
        self.pool.push(player);
        Ok(id)
    }

    /// Remove a player from whichever collection holds it.
    ///
    /// Unknown ids are ignored. Removing a captain clears that team's captaincy.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let removed = self.take_player(id);
        if removed.is_some() {
            debug!(player_id = %id, "player removed");
        }
        removed.map(|(_, player)| player)
    }

    /// Move a player to the end of `team_id`'s roster.
    ///
    /// Returns `false` when the id is unknown. A captain that leaves its roster (even to
    /// rejoin the same one) gives up the captaincy.
    pub fn move_player_to_team(&mut self, id: PlayerId, team_id: TeamId) -> bool {
        let Some((from, player)) = self.take_player(id) else {
            return false;
        };
        debug!(player_id = %id, from = ?from, to = %team_id, "player moved");
        self.team_mut(team_id).players.push(player);
        true
    }

    /// Send a player back to the end of the unassigned pool.
    ///
    /// Returns `false` when the id is unknown. A captain loses the captaincy.
    pub fn move_player_to_pool(&mut self, id: PlayerId) -> bool {
        let Some((from, player)) = self.take_player(id) else {
            return false;
        };
        debug!(player_id = %id, from = ?from, "player returned to pool");
        self.pool.push(player);
        true
    }

    /// Make `player_id` the only captain of `team_id`.
    ///
    /// Returns `false` without touching state when the player is not on that roster.
    pub fn select_captain(&mut self, player_id: PlayerId, team_id: TeamId) -> bool {
        self.team_mut(team_id).appoint_captain(player_id)
    }

    /// Jump to `step` without checking prerequisites.
    pub fn set_step(&mut self, step: WorkflowStep) {
        self.step = step;
    }

    /// Move one step forward, enforcing that step's prerequisites.
    pub fn advance(&mut self, target: WorkflowStep) -> Result<(), WorkflowError> {
        if self.step.next() != Some(target) {
            return Err(WorkflowError::Precondition(format!(
                "cannot advance from {:?} to {target:?}",
                self.step
            )));
        }

        match target {
            WorkflowStep::AddPlayers => {}
            WorkflowStep::FormTeams => {
                if self.player_count() < 2 {
                    return Err(WorkflowError::Precondition(
                        "at least 2 players are needed to form teams".into(),
                    ));
                }
            }
            WorkflowStep::SelectCaptains => {
                if self.alpha.is_empty() || self.beta.is_empty() {
                    return Err(WorkflowError::Precondition(
                        "each team must have at least 1 player".into(),
                    ));
                }
                self.formation_complete = true;
            }
            WorkflowStep::Toss => self.require_captains()?,
            WorkflowStep::Result => {
                self.require_captains()?;
                if self.toss_outcome.is_none() {
                    return Err(WorkflowError::Precondition(
                        "the toss must be performed first".into(),
                    ));
                }
            }
        }

        info!(from = ?self.step, to = ?target, "workflow advanced");
        self.step = target;
        Ok(())
    }

    /// Rewind the session to `target`, discarding whatever later steps produced.
    ///
    /// Rewinding to [`WorkflowStep::Result`] is not supported.
    pub fn reset_to_step(&mut self, target: WorkflowStep) -> Result<(), WorkflowError> {
        match target {
            WorkflowStep::AddPlayers => {
                let placeholder_base = std::mem::take(&mut self.placeholder_base);
                *self = Self::with_settings(self.toss_rule, placeholder_base);
            }
            WorkflowStep::FormTeams => {
                let alpha = self.alpha.drain();
                let beta = self.beta.drain();
                self.pool.extend(alpha);
                self.pool.extend(beta);
                self.formation_complete = false;
                self.clear_toss();
            }
            WorkflowStep::SelectCaptains => {
                self.alpha.clear_captain();
                self.beta.clear_captain();
                self.clear_toss();
            }
            WorkflowStep::Toss => self.clear_toss(),
            WorkflowStep::Result => {
                return Err(WorkflowError::Precondition(
                    "the workflow cannot be rewound to the result step".into(),
                ));
            }
        }

        info!(step = ?target, "workflow reset");
        self.step = target;
        Ok(())
    }

    /// Mark team assignment as finalised (or not).
    pub fn set_team_formation_complete(&mut self, complete: bool) {
        self.formation_complete = complete;
    }

    /// Record which team calls the toss and which face it called.
    pub fn set_captain_choice(&mut self, choice: TossChoice) {
        self.captain_choice = Some(choice);
    }

    /// Flip the coin with `rng` and store the outcome.
    pub fn perform_toss<R: Rng>(&mut self, rng: &mut R) -> Result<TossOutcome, WorkflowError> {
        self.resolve_toss_with(CoinFace::draw(rng))
    }

    /// Store the outcome of a toss whose face has already been drawn.
    pub fn resolve_toss_with(&mut self, drawn: CoinFace) -> Result<TossOutcome, WorkflowError> {
        let outcome = resolve_toss(self.toss_rule, self.captain_choice, drawn)?;
        info!(
            face = %outcome.result_face,
            winner = %outcome.winning_team,
            "toss resolved"
        );
        self.toss_outcome = Some(outcome);
        Ok(outcome)
    }

    /// Both rosters must be non-empty and led by a captain.
    fn require_captains(&self) -> Result<(), WorkflowError> {
        let led = TeamId::ALL.into_iter().all(|id| {
            let team = self.team(id);
            !team.is_empty() && team.captain_id().is_some()
        });
        if led {
            Ok(())
        } else {
            Err(WorkflowError::Precondition(
                "both teams must have a captain selected".into(),
            ))
        }
    }

    fn clear_toss(&mut self) {
        self.captain_choice = None;
        self.toss_outcome = None;
    }

    fn take_player(&mut self, id: PlayerId) -> Option<(PlayerLocation, Player)> {
        if let Some(index) = self.pool.iter().position(|player| player.id == id) {
            return Some((PlayerLocation::Pool, self.pool.remove(index)));
        }
        TeamId::ALL.into_iter().find_map(|team_id| {
            self.team_mut(team_id)
                .take(id)
                .map(|player| (PlayerLocation::Team(team_id), player))
        })
    }
}

/// Avatar URL generated from the player's name.
fn placeholder_image_url(base: &str, name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    format!("{base}?name={encoded}&background=random")
}
