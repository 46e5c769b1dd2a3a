//! Command handlers for the session context.
//!
//! Each handler checks that the command targets the given controller, runs
//! the matching controller operation, and drains the events it produced.

use doodlefest_core::clock::Clock;
use doodlefest_core::command::Command;
use doodlefest_core::error::DomainError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::commands::{
    CastVote, CheckCaptionTimer, JoinSession, ObservePhaseChange, ResetSession,
    SetExpectedPlayerCount, StartSession, SubmitContent,
};
use crate::domain::controller::PhaseController;
use crate::domain::events::SessionEvent;
use crate::domain::phase::PhaseKind;

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct SessionCommandResult {
    /// The session the command targeted.
    pub session_id: Uuid,
    /// The active phase after the command.
    pub phase: PhaseKind,
    /// Events produced by the command, in order.
    pub events: Vec<SessionEvent>,
}

impl SessionCommandResult {
    /// The phase entered because of the command, if any.
    #[must_use]
    pub fn transitioned_to(&self) -> Option<PhaseKind> {
        self.events
            .iter()
            .filter_map(SessionEvent::phase_change)
            .last()
            .map(|change| change.to)
    }
}

fn ensure_target(command: &dyn Command, controller: &PhaseController) -> Result<(), DomainError> {
    if command.session_id() == controller.session_id() {
        Ok(())
    } else {
        Err(DomainError::SessionNotFound(command.session_id()))
    }
}

fn drain(controller: &mut PhaseController) -> SessionCommandResult {
    SessionCommandResult {
        session_id: controller.session_id(),
        phase: controller.current_phase(),
        events: controller.take_events(),
    }
}

/// Handles the `JoinSession` command.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the command targets another
/// session.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub fn handle_join_session(
    command: &JoinSession,
    controller: &mut PhaseController,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    ensure_target(command, controller)?;
    info!(correlation_id = %command.correlation_id, "handling join_session command");
    controller.add_player(command.player_id, command.is_host, command.correlation_id, clock);
    Ok(drain(controller))
}

/// Handles the `SetExpectedPlayerCount` command.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the command targets another
/// session, or `DomainError::PhaseMismatch` outside the lobby.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub fn handle_set_expected_player_count(
    command: &SetExpectedPlayerCount,
    controller: &mut PhaseController,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    ensure_target(command, controller)?;
    info!(correlation_id = %command.correlation_id, "handling set_expected_player_count command");
    controller.set_expected_player_count(command.count, command.correlation_id, clock)?;
    Ok(drain(controller))
}

/// Handles the `StartSession` command.
///
/// # Errors
///
/// Returns `DomainError` if the session is not in the lobby, this instance is
/// not authoritative, or players are missing.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub fn handle_start_session(
    command: &StartSession,
    controller: &mut PhaseController,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    ensure_target(command, controller)?;
    info!(correlation_id = %command.correlation_id, "handling start_session command");
    controller.start_session(command.correlation_id, clock)?;
    Ok(drain(controller))
}

/// Handles the `SubmitContent` command.
///
/// A duplicate caption is not an error; the result then carries a
/// `CaptionDuplicateIgnored` event instead of `ContentSubmitted`.
///
/// # Errors
///
/// Returns `DomainError` if the bank is closed in the active phase, the
/// player is unknown, or the payload is invalid.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub fn handle_submit_content(
    command: &SubmitContent,
    controller: &mut PhaseController,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    ensure_target(command, controller)?;
    info!(correlation_id = %command.correlation_id, "handling submit_content command");
    controller.submit(
        command.bank,
        command.owner_id,
        command.payload.clone(),
        command.correlation_id,
        clock,
    )?;
    Ok(drain(controller))
}

/// Handles the `CastVote` command.
///
/// # Errors
///
/// Returns `DomainError` if no vote is open, the candidate is not eligible,
/// or the voter already voted.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub fn handle_cast_vote(
    command: &CastVote,
    controller: &mut PhaseController,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    ensure_target(command, controller)?;
    info!(correlation_id = %command.correlation_id, "handling cast_vote command");
    controller.cast_vote(
        command.voter_id,
        command.candidate_id,
        command.correlation_id,
        clock,
    )?;
    Ok(drain(controller))
}

/// Handles the `CheckCaptionTimer` command. Produces no events unless the
/// countdown has expired on an authoritative instance.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the command targets another
/// session.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub fn handle_check_caption_timer(
    command: &CheckCaptionTimer,
    controller: &mut PhaseController,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    ensure_target(command, controller)?;
    info!(correlation_id = %command.correlation_id, "handling check_caption_timer command");
    controller.check_caption_timer(command.correlation_id, clock);
    Ok(drain(controller))
}

/// Handles the `ObservePhaseChange` command.
///
/// # Errors
///
/// Returns `DomainError` if this instance is authoritative or the transition
/// does not follow the active phase.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub fn handle_observe_phase_change(
    command: &ObservePhaseChange,
    controller: &mut PhaseController,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    ensure_target(command, controller)?;
    info!(correlation_id = %command.correlation_id, "handling observe_phase_change command");
    controller.observe_phase_change(command.from, command.to, command.correlation_id, clock)?;
    Ok(drain(controller))
}

/// Handles the `ResetSession` command.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the command targets another
/// session.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub fn handle_reset_session(
    command: &ResetSession,
    controller: &mut PhaseController,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    ensure_target(command, controller)?;
    info!(correlation_id = %command.correlation_id, "handling reset_session command");
    controller.reset_session(command.correlation_id, clock);
    Ok(drain(controller))
}

#[cfg(test)]
mod tests {
    use doodlefest_core::clock::Clock;
    use doodlefest_core::error::DomainError;
    use doodlefest_core::event::DomainEvent;
    use doodlefest_test_support::{FixedClock, ManualClock, fake_png, fixed_now};
    use uuid::Uuid;

    use super::*;
    use crate::domain::content::{BankKind, ImagePayload, Payload};
    use crate::domain::controller::{SessionConfig, Vantage};
    use crate::domain::events::SessionEventKind;
    use crate::domain::player::PlayerId;

    fn joined(controller: &mut PhaseController, clock: &dyn Clock) -> PlayerId {
        let player_id = PlayerId::generate();
        handle_join_session(
            &JoinSession {
                correlation_id: Uuid::new_v4(),
                session_id: controller.session_id(),
                player_id,
                is_host: true,
            },
            controller,
            clock,
        )
        .unwrap();
        player_id
    }

    #[test]
    fn test_handle_join_session_returns_player_joined_event() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let session_id = Uuid::new_v4();
        let mut controller =
            PhaseController::new(session_id, Vantage::Referee, SessionConfig::default());
        let correlation_id = Uuid::new_v4();
        let command = JoinSession {
            correlation_id,
            session_id,
            player_id: PlayerId::generate(),
            is_host: true,
        };

        // Act
        let result = handle_join_session(&command, &mut controller, &clock).unwrap();

        // Assert
        assert_eq!(result.session_id, session_id);
        assert_eq!(result.phase, PhaseKind::Lobby);
        assert_eq!(result.events.len(), 1);
        let event = &result.events[0];
        assert_eq!(event.event_type(), "session.player_joined");
        assert_eq!(event.metadata().correlation_id, correlation_id);
        assert_eq!(event.metadata().occurred_at, fixed_now());
        assert!(controller.take_events().is_empty());
    }

    #[test]
    fn test_handle_command_for_other_session_returns_session_not_found() {
        let clock = FixedClock(fixed_now());
        let mut controller =
            PhaseController::new(Uuid::new_v4(), Vantage::Referee, SessionConfig::default());
        let other = Uuid::new_v4();

        let result = handle_start_session(
            &StartSession {
                correlation_id: Uuid::new_v4(),
                session_id: other,
            },
            &mut controller,
            &clock,
        );

        match result {
            Err(DomainError::SessionNotFound(id)) => assert_eq!(id, other),
            other => panic!("expected SessionNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_handle_submit_content_reports_transition() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let session_id = Uuid::new_v4();
        let config = SessionConfig::new(1, 60).unwrap();
        let mut controller = PhaseController::new(session_id, Vantage::Referee, config);
        let player_id = joined(&mut controller, &clock);
        handle_start_session(
            &StartSession {
                correlation_id: Uuid::new_v4(),
                session_id,
            },
            &mut controller,
            &clock,
        )
        .unwrap();
        let command = SubmitContent {
            correlation_id: Uuid::new_v4(),
            session_id,
            bank: BankKind::Drawing,
            owner_id: player_id,
            payload: Payload::Drawing(ImagePayload {
                bytes: fake_png(1),
                width: 32,
                height: 32,
            }),
        };

        // Act
        let result = handle_submit_content(&command, &mut controller, &clock).unwrap();

        // Assert
        assert_eq!(result.transitioned_to(), Some(PhaseKind::Caption { round: 1 }));
        assert!(matches!(
            result.events[0].kind,
            SessionEventKind::ContentSubmitted(_)
        ));
    }

    #[test]
    fn test_handle_check_caption_timer_before_expiry_produces_nothing() {
        let clock = ManualClock::default();
        let session_id = Uuid::new_v4();
        let config = SessionConfig::new(1, 60).unwrap();
        let mut controller = PhaseController::new(session_id, Vantage::Referee, config);
        let player_id = joined(&mut controller, &clock);
        controller.start_session(Uuid::new_v4(), &clock).unwrap();
        controller
            .submit(
                BankKind::Drawing,
                player_id,
                Payload::Drawing(ImagePayload {
                    bytes: fake_png(1),
                    width: 32,
                    height: 32,
                }),
                Uuid::new_v4(),
                &clock,
            )
            .unwrap();
        controller.take_events();
        let command = CheckCaptionTimer {
            correlation_id: Uuid::new_v4(),
            session_id,
        };

        clock.advance_secs(59);
        let early = handle_check_caption_timer(&command, &mut controller, &clock).unwrap();
        clock.advance_secs(1);
        let expired = handle_check_caption_timer(&command, &mut controller, &clock).unwrap();

        assert!(early.events.is_empty());
        assert_eq!(expired.transitioned_to(), Some(PhaseKind::MemeCreate));
    }
}
