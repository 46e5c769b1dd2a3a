//! Domain events for the session context.
//!
//! These are the notifications presentation collaborators subscribe to.

use doodlefest_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};

use super::content::{BankKind, ItemId};
use super::phase::PhaseKind;
use super::player::PlayerId;

/// Emitted when a player joins the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoined {
    /// The new member.
    pub player_id: PlayerId,
    /// Whether they host.
    pub is_host: bool,
}

/// Emitted when the expected player count changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedPlayersSet {
    /// Players expected to submit and vote.
    pub count: usize,
}

/// Emitted when a bank stores a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSubmitted {
    /// The bank that stored it.
    pub bank: BankKind,
    /// The new item.
    pub item_id: ItemId,
    /// The submitting player.
    pub owner_id: PlayerId,
    /// The player's count toward this phase's quota, when the phase has one.
    pub quota_count: Option<u32>,
}

/// Emitted when a caption matched one already in the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionDuplicateIgnored {
    /// The caption that was already stored.
    pub item_id: ItemId,
    /// The player whose submission was ignored.
    pub owner_id: PlayerId,
}

/// Emitted when a vote is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCast {
    /// Who voted.
    pub voter_id: PlayerId,
    /// The chosen candidate.
    pub candidate_id: ItemId,
    /// Accepted votes so far in this phase.
    pub votes_submitted: usize,
}

/// Emitted on every phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChanged {
    /// The phase that ended.
    pub from: PhaseKind,
    /// The phase that is now active.
    pub to: PhaseKind,
}

/// Emitted when the session is wiped back to the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReset {
    /// The phase that was active before the reset.
    pub from: PhaseKind,
}

/// Event type identifier for [`PlayerJoined`].
pub const PLAYER_JOINED_EVENT_TYPE: &str = "session.player_joined";

/// Event type identifier for [`ExpectedPlayersSet`].
pub const EXPECTED_PLAYERS_SET_EVENT_TYPE: &str = "session.expected_players_set";

/// Event type identifier for [`ContentSubmitted`].
pub const CONTENT_SUBMITTED_EVENT_TYPE: &str = "session.content_submitted";

/// Event type identifier for [`CaptionDuplicateIgnored`].
pub const CAPTION_DUPLICATE_IGNORED_EVENT_TYPE: &str = "session.caption_duplicate_ignored";

/// Event type identifier for [`VoteCast`].
pub const VOTE_CAST_EVENT_TYPE: &str = "session.vote_cast";

/// Event type identifier for [`PhaseChanged`].
pub const PHASE_CHANGED_EVENT_TYPE: &str = "session.phase_changed";

/// Event type identifier for [`SessionReset`].
pub const SESSION_RESET_EVENT_TYPE: &str = "session.session_reset";

/// Event payload variants for the session context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEventKind {
    /// A player joined.
    PlayerJoined(PlayerJoined),
    /// The expected player count changed.
    ExpectedPlayersSet(ExpectedPlayersSet),
    /// A submission was stored.
    ContentSubmitted(ContentSubmitted),
    /// A duplicate caption was ignored.
    CaptionDuplicateIgnored(CaptionDuplicateIgnored),
    /// A vote was recorded.
    VoteCast(VoteCast),
    /// The active phase changed.
    PhaseChanged(PhaseChanged),
    /// The session returned to the lobby.
    SessionReset(SessionReset),
}

impl SessionEventKind {
    /// The type identifier for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PlayerJoined(_) => PLAYER_JOINED_EVENT_TYPE,
            Self::ExpectedPlayersSet(_) => EXPECTED_PLAYERS_SET_EVENT_TYPE,
            Self::ContentSubmitted(_) => CONTENT_SUBMITTED_EVENT_TYPE,
            Self::CaptionDuplicateIgnored(_) => CAPTION_DUPLICATE_IGNORED_EVENT_TYPE,
            Self::VoteCast(_) => VOTE_CAST_EVENT_TYPE,
            Self::PhaseChanged(_) => PHASE_CHANGED_EVENT_TYPE,
            Self::SessionReset(_) => SESSION_RESET_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the session context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: SessionEventKind,
}

impl SessionEvent {
    /// The transition carried by this event, if it is a phase change.
    #[must_use]
    pub fn phase_change(&self) -> Option<&PhaseChanged> {
        match &self.kind {
            SessionEventKind::PhaseChanged(change) => Some(change),
            _ => None,
        }
    }
}

impl DomainEvent for SessionEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("SessionEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
