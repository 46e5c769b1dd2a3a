//! Commands for the session context.

use doodlefest_core::command::Command;
use uuid::Uuid;

use super::content::{BankKind, ItemId, Payload};
use super::phase::PhaseKind;
use super::player::PlayerId;

macro_rules! impl_command {
    ($name:ident, $type_name:literal) => {
        impl Command for $name {
            fn command_type(&self) -> &'static str {
                $type_name
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }

            fn session_id(&self) -> Uuid {
                self.session_id
            }
        }
    };
}

/// Command to add a player to the roster.
#[derive(Debug, Clone)]
pub struct JoinSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target session.
    pub session_id: Uuid,
    /// The joining player.
    pub player_id: PlayerId,
    /// Whether the player asks to host.
    pub is_host: bool,
}

impl_command!(JoinSession, "session.join_session");

/// Command to set how many players the session waits for.
#[derive(Debug, Clone)]
pub struct SetExpectedPlayerCount {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target session.
    pub session_id: Uuid,
    /// Expected players; values below one are raised to one.
    pub count: usize,
}

impl_command!(SetExpectedPlayerCount, "session.set_expected_player_count");

/// Command to leave the lobby and begin the first draw round.
#[derive(Debug, Clone)]
pub struct StartSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target session.
    pub session_id: Uuid,
}

impl_command!(StartSession, "session.start_session");

/// Command to submit content to a bank.
#[derive(Debug, Clone)]
pub struct SubmitContent {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target session.
    pub session_id: Uuid,
    /// The bank the presentation layer believes is open.
    pub bank: BankKind,
    /// The submitting player.
    pub owner_id: PlayerId,
    /// The content.
    pub payload: Payload,
}

impl_command!(SubmitContent, "session.submit_content");

/// Command to vote for a candidate.
#[derive(Debug, Clone)]
pub struct CastVote {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target session.
    pub session_id: Uuid,
    /// The voting player.
    pub voter_id: PlayerId,
    /// The chosen item in the active voting bank.
    pub candidate_id: ItemId,
}

impl_command!(CastVote, "session.cast_vote");

/// Command to check whether the caption countdown has run out.
#[derive(Debug, Clone)]
pub struct CheckCaptionTimer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target session.
    pub session_id: Uuid,
}

impl_command!(CheckCaptionTimer, "session.check_caption_timer");

/// Command for a non-authoritative instance to follow the host's transition.
#[derive(Debug, Clone)]
pub struct ObservePhaseChange {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target session.
    pub session_id: Uuid,
    /// The phase the host left.
    pub from: PhaseKind,
    /// The phase the host entered.
    pub to: PhaseKind,
}

impl_command!(ObservePhaseChange, "session.observe_phase_change");

/// Command to wipe the session back to the lobby.
#[derive(Debug, Clone)]
pub struct ResetSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target session.
    pub session_id: Uuid,
}

impl_command!(ResetSession, "session.reset_session");
