//! Players and the session roster.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, stable identifier for one session membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for PlayerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A participant. Immutable once joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Membership identifier.
    pub id: PlayerId,
    /// Whether this player hosts the session.
    pub is_host: bool,
}

/// Players in join order. At most one host.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    /// Adds a player and returns the stored membership. Joining twice with
    /// the same id returns the original membership unchanged. A host request
    /// made while a host exists joins as a regular player.
    pub fn join(&mut self, id: PlayerId, wants_host: bool) -> Player {
        if let Some(existing) = self.get(id) {
            return existing;
        }
        let is_host = wants_host && self.host().is_none();
        let player = Player { id, is_host };
        self.players.push(player);
        player
    }

    /// Looks a player up by id.
    #[must_use]
    pub fn get(&self, id: PlayerId) -> Option<Player> {
        self.players.iter().copied().find(|p| p.id == id)
    }

    /// Whether `id` has joined.
    #[must_use]
    pub fn contains(&self, id: PlayerId) -> bool {
        self.get(id).is_some()
    }

    /// The host, if one has joined.
    #[must_use]
    pub fn host(&self) -> Option<Player> {
        self.players.iter().copied().find(|p| p.is_host)
    }

    /// Player ids in join order.
    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(|p| p.id)
    }

    /// All players in join order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Number of joined players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether nobody has joined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
