use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Opaque identifier assigned to every player when it joins the pool.
pub type PlayerId = Uuid;

/// The two sides a player can be drafted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TeamId {
    /// First team; seeded with the heaviest player during balancing.
    Alpha,
    /// Second team.
    Beta,
}

impl TeamId {
    /// Both teams in their canonical order.
    pub const ALL: [TeamId; 2] = [TeamId::Alpha, TeamId::Beta];

    /// The opposing team.
    pub fn other(self) -> Self {
        match self {
            TeamId::Alpha => TeamId::Beta,
            TeamId::Beta => TeamId::Alpha,
        }
    }

    /// Human readable team name shown to participants.
    pub fn display_name(self) -> &'static str {
        match self {
            TeamId::Alpha => "Team Alpha",
            TeamId::Beta => "Team Beta",
        }
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Face of the coin, either called by a captain or drawn by the toss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CoinFace {
    /// Heads side.
    Heads,
    /// Tails side.
    Tails,
}

impl CoinFace {
    /// Draw a face uniformly at random.
    pub fn draw<R: Rng>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            CoinFace::Heads
        } else {
            CoinFace::Tails
        }
    }
}

impl fmt::Display for CoinFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinFace::Heads => f.write_str("heads"),
            CoinFace::Tails => f.write_str("tails"),
        }
    }
}

/// A participant of the draft.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Unique identifier generated on insertion.
    pub id: PlayerId,
    /// Display name, never empty.
    pub name: String,
    /// Avatar location (may be a generated placeholder).
    pub image_url: String,
    /// Strictly positive weight used by the balancing algorithm.
    pub weight: f64,
    /// Whether the player currently captains the team holding it.
    pub is_captain: bool,
}

impl Player {
    /// Build a new player with a freshly generated identifier.
    ///
    /// Input validation happens in [`crate::state::workflow::Workflow::add_player`].
    pub(crate) fn new(name: String, image_url: String, weight: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            image_url,
            weight,
            is_captain: false,
        }
    }
}

/// A team roster with an optional captain.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    /// Which side this roster belongs to.
    pub id: TeamId,
    /// Display name of the team.
    pub name: String,
    /// Ordered roster; insertion order is preserved.
    pub players: Vec<Player>,
    captain: Option<PlayerId>,
}

impl Team {
    /// Create an empty roster for `id`.
    pub fn new(id: TeamId) -> Self {
        Self {
            id,
            name: id.display_name().to_string(),
            players: Vec::new(),
            captain: None,
        }
    }

    /// Identifier of the current captain, if any.
    pub fn captain_id(&self) -> Option<PlayerId> {
        self.captain
    }

    /// The current captain, if any.
    pub fn captain(&self) -> Option<&Player> {
        let id = self.captain?;
        self.players.iter().find(|player| player.id == id)
    }

    /// Sum of the weights of every rostered player.
    pub fn total_weight(&self) -> f64 {
        self.players.iter().map(|player| player.weight).sum()
    }

    /// Whether the roster holds `player_id`.
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|player| player.id == player_id)
    }

    /// Number of rostered players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Make `player_id` the single captain of this roster.
    ///
    /// Returns `false` and leaves the roster untouched when the player is not on it.
    pub(crate) fn appoint_captain(&mut self, player_id: PlayerId) -> bool {
        if !self.contains(player_id) {
            return false;
        }
        for player in &mut self.players {
            player.is_captain = player.id == player_id;
        }
        self.captain = Some(player_id);
        true
    }

    /// Drop the captain reference and every captain flag.
    pub(crate) fn clear_captain(&mut self) {
        for player in &mut self.players {
            player.is_captain = false;
        }
        self.captain = None;
    }

    /// Remove `player_id` from the roster, clearing the captaincy if it held it.
    pub(crate) fn take(&mut self, player_id: PlayerId) -> Option<Player> {
        let index = self
            .players
            .iter()
            .position(|player| player.id == player_id)?;
        let mut player = self.players.remove(index);
        if self.captain == Some(player_id) {
            self.captain = None;
        }
        player.is_captain = false;
        Some(player)
    }

    /// Empty the roster, returning every player with its captain flag cleared.
    pub(crate) fn drain(&mut self) -> Vec<Player> {
        self.clear_captain();
        std::mem::take(&mut self.players)
    }
}

/// The call made by a captain before the coin is tossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TossChoice {
    /// Team whose captain names a face.
    pub calling_team: TeamId,
    /// The face that was called.
    pub called_face: CoinFace,
}

/// Outcome of a resolved toss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TossOutcome {
    /// Face drawn by the toss.
    pub result_face: CoinFace,
    /// Team that won the toss.
    pub winning_team: TeamId,
}
