//! Newline-delimited JSON protocol spoken by the `doodlefest` binary.
//!
//! Each input line is one [`Request`]; each output line is one
//! [`Outbound`] message: a reply, an error, or a published event.

use doodlefest_core::error::DomainError;
use doodlefest_session::application::command_handlers::SessionCommandResult;
use doodlefest_session::domain::content::{BankKind, ItemId, Payload};
use doodlefest_session::domain::events::SessionEvent;
use doodlefest_session::domain::phase::PhaseKind;
use doodlefest_session::domain::player::PlayerId;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::error::ErrorBody;
use crate::host::SessionHost;

/// One request line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Join; a player id is generated when none is given.
    Join {
        /// Existing membership id to reuse.
        #[serde(default)]
        player_id: Option<PlayerId>,
        /// Whether to host.
        #[serde(default)]
        is_host: bool,
    },
    /// Set the expected player count.
    SetPlayerCount {
        /// Players to wait for.
        count: usize,
    },
    /// Start the first draw round.
    Start,
    /// Submit content.
    Submit {
        /// Target bank.
        bank: BankKind,
        /// Submitting player.
        player_id: PlayerId,
        /// The content, decoded into a [`Payload`] once the line is accepted.
        payload: Value,
    },
    /// Cast a vote.
    Vote {
        /// Voting player.
        player_id: PlayerId,
        /// Chosen item.
        candidate_id: ItemId,
    },
    /// Check the caption countdown now.
    Tick,
    /// Follow a transition made elsewhere.
    Observe {
        /// The phase left.
        from: PhaseKind,
        /// The phase entered.
        to: PhaseKind,
    },
    /// Return to the lobby.
    Reset,
    /// Session summary.
    Session,
    /// One bank's contents.
    Bank {
        /// Which bank.
        kind: BankKind,
        /// Limit the listing to one player's submissions.
        #[serde(default)]
        owner: Option<PlayerId>,
    },
    /// The active vote.
    Tally,
    /// Vote candidates for a player.
    Candidates {
        /// The voter.
        player_id: PlayerId,
    },
    /// Creation-phase offer for a player.
    Pool {
        /// The viewer.
        player_id: PlayerId,
    },
    /// Finished votes.
    Results,
}

impl Request {
    /// Stable name of the operation, echoed in replies.
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::SetPlayerCount { .. } => "set_player_count",
            Self::Start => "start",
            Self::Submit { .. } => "submit",
            Self::Vote { .. } => "vote",
            Self::Tick => "tick",
            Self::Observe { .. } => "observe",
            Self::Reset => "reset",
            Self::Session => "session",
            Self::Bank { .. } => "bank",
            Self::Tally => "tally",
            Self::Candidates { .. } => "candidates",
            Self::Pool { .. } => "pool",
            Self::Results => "results",
        }
    }
}

/// One output line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// A request succeeded.
    Reply {
        /// The request's operation.
        op: &'static str,
        /// Operation-specific result.
        data: Value,
    },
    /// A request was rejected.
    Error {
        /// The request's operation, when the line could be decoded.
        op: Option<&'static str>,
        /// What went wrong.
        error: ErrorBody,
    },
    /// A published session event.
    Event {
        /// The event.
        event: SessionEvent,
    },
}

impl Outbound {
    /// Encodes the message as one JSON line without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns the encoder error if a payload cannot be represented as JSON.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn command_reply(result: &SessionCommandResult) -> Value {
    json!({
        "session_id": result.session_id,
        "phase": result.phase,
        "transitioned_to": result.transitioned_to(),
        "events": result.events.iter().map(|e| e.metadata.event_type.as_str()).collect::<Vec<_>>(),
    })
}

fn to_data<T: Serialize>(value: &T) -> Result<Value, DomainError> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::Infrastructure(format!("reply encoding failed: {e}")))
}

/// A payload that fails to decode is invalid content, not a malformed line.
fn decode_payload(raw: Value) -> Result<Payload, DomainError> {
    serde_json::from_value(raw)
        .map_err(|e| DomainError::Validation(format!("invalid payload: {e}")))
}

fn dispatch(host: &SessionHost, request: Request) -> Result<Value, DomainError> {
    match request {
        Request::Join { player_id, is_host } => {
            let player_id = player_id.unwrap_or_else(PlayerId::generate);
            let result = host.join(player_id, is_host)?;
            let mut reply = command_reply(&result);
            reply["player_id"] = json!(player_id);
            Ok(reply)
        }
        Request::SetPlayerCount { count } => Ok(command_reply(&host.set_expected_player_count(count)?)),
        Request::Start => Ok(command_reply(&host.start()?)),
        Request::Submit {
            bank,
            player_id,
            payload,
        } => {
            let payload = decode_payload(payload)?;
            Ok(command_reply(&host.submit(bank, player_id, payload)?))
        }
        Request::Vote {
            player_id,
            candidate_id,
        } => Ok(command_reply(&host.vote(player_id, candidate_id)?)),
        Request::Tick => Ok(command_reply(&host.tick()?)),
        Request::Observe { from, to } => Ok(command_reply(&host.observe(from, to)?)),
        Request::Reset => Ok(command_reply(&host.reset()?)),
        Request::Session => to_data(&host.view()?),
        Request::Bank { kind, owner } => to_data(&host.bank(kind, owner)?),
        Request::Tally => to_data(&host.tally()?),
        Request::Candidates { player_id } => to_data(&host.candidates(player_id)?),
        Request::Pool { player_id } => to_data(&host.pool(player_id)?),
        Request::Results => to_data(&host.results()?),
    }
}

/// Decodes and runs one request line against `host`.
#[instrument(skip_all, fields(session_id = %host.session_id()))]
pub fn handle_line(host: &SessionHost, line: &str) -> Outbound {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "malformed request line");
            return Outbound::Error {
                op: None,
                error: ErrorBody::malformed_request(&e.to_string()),
            };
        }
    };
    let op = request.op();
    info!(op, "handling request");
    match dispatch(host, request) {
        Ok(data) => Outbound::Reply { op, data },
        Err(err) => {
            if err.is_soft_warning() {
                warn!(op, error = %err, "request rejected");
            } else {
                info!(op, error = %err, "request rejected");
            }
            Outbound::Error {
                op: Some(op),
                error: ErrorBody::from(&err),
            }
        }
    }
}
