//! One hosted session: a controller behind a single-writer lock plus the
//! channel its events are published on.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use doodlefest_core::clock::Clock;
use doodlefest_core::error::DomainError;
use doodlefest_core::rng::DeterministicRng;
use doodlefest_session::application::command_handlers::{
    self, SessionCommandResult,
};
use doodlefest_session::application::query_handlers::{
    self, BankView, CandidatesView, PoolView, ResultsView, SessionView, TallyView,
};
use doodlefest_session::domain::commands::{
    CastVote, CheckCaptionTimer, JoinSession, ObservePhaseChange, ResetSession,
    SetExpectedPlayerCount, StartSession, SubmitContent,
};
use doodlefest_session::domain::content::{BankKind, ItemId, Payload};
use doodlefest_session::domain::controller::PhaseController;
use doodlefest_session::domain::events::SessionEvent;
use doodlefest_session::domain::phase::PhaseKind;
use doodlefest_session::domain::player::PlayerId;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

/// A session owned by the host.
pub struct SessionHost {
    session_id: Uuid,
    controller: Mutex<PhaseController>,
    rng: Mutex<Box<dyn DeterministicRng>>,
    clock: Arc<dyn Clock + Send + Sync>,
    events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for SessionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHost")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

fn poisoned(what: &str) -> DomainError {
    DomainError::Infrastructure(format!("{what} lock poisoned"))
}

impl SessionHost {
    /// Hosts `controller`, publishing its events on a channel holding up to
    /// `event_buffer` unread events per subscriber.
    #[must_use]
    pub fn new(
        controller: PhaseController,
        clock: Arc<dyn Clock + Send + Sync>,
        rng: Box<dyn DeterministicRng>,
        event_buffer: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            session_id: controller.session_id(),
            controller: Mutex::new(controller),
            rng: Mutex::new(rng),
            clock,
            events,
        }
    }

    /// The hosted session.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Receives every event published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> Result<MutexGuard<'_, PhaseController>, DomainError> {
        self.controller.lock().map_err(|_| poisoned("session"))
    }

    /// Runs `handler` under the session lock and publishes what it produced.
    /// Publishing happens before the lock is released so subscribers see
    /// events in sequence order.
    fn execute<C>(
        &self,
        command: &C,
        handler: fn(&C, &mut PhaseController, &dyn Clock) -> Result<SessionCommandResult, DomainError>,
    ) -> Result<SessionCommandResult, DomainError> {
        let mut controller = self.lock()?;
        let result = handler(command, &mut controller, self.clock.as_ref())?;
        self.publish(&result.events);
        drop(controller);
        Ok(result)
    }

    fn publish(&self, events: &[SessionEvent]) {
        for event in events {
            // Sending only fails when nobody is subscribed.
            if self.events.send(event.clone()).is_err() {
                debug!(session_id = %self.session_id, event_type = %event.metadata.event_type, "no subscribers");
            }
        }
    }

    // --- commands ---

    /// Adds a player.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the session lock is poisoned.
    pub fn join(&self, player_id: PlayerId, is_host: bool) -> Result<SessionCommandResult, DomainError> {
        let command = JoinSession {
            correlation_id: Uuid::new_v4(),
            session_id: self.session_id,
            player_id,
            is_host,
        };
        self.execute(&command, command_handlers::handle_join_session)
    }

    /// Sets the expected player count.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PhaseMismatch` outside the lobby.
    pub fn set_expected_player_count(&self, count: usize) -> Result<SessionCommandResult, DomainError> {
        let command = SetExpectedPlayerCount {
            correlation_id: Uuid::new_v4(),
            session_id: self.session_id,
            count,
        };
        self.execute(&command, command_handlers::handle_set_expected_player_count)
    }

    /// Starts the first draw round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the session cannot start yet.
    pub fn start(&self) -> Result<SessionCommandResult, DomainError> {
        let command = StartSession {
            correlation_id: Uuid::new_v4(),
            session_id: self.session_id,
        };
        self.execute(&command, command_handlers::handle_start_session)
    }

    /// Submits content.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the submission is rejected.
    pub fn submit(
        &self,
        bank: BankKind,
        owner_id: PlayerId,
        payload: Payload,
    ) -> Result<SessionCommandResult, DomainError> {
        let command = SubmitContent {
            correlation_id: Uuid::new_v4(),
            session_id: self.session_id,
            bank,
            owner_id,
            payload,
        };
        self.execute(&command, command_handlers::handle_submit_content)
    }

    /// Casts a vote.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the vote is rejected.
    pub fn vote(&self, voter_id: PlayerId, candidate_id: ItemId) -> Result<SessionCommandResult, DomainError> {
        let command = CastVote {
            correlation_id: Uuid::new_v4(),
            session_id: self.session_id,
            voter_id,
            candidate_id,
        };
        self.execute(&command, command_handlers::handle_cast_vote)
    }

    /// Checks the caption countdown against the host clock.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the session lock is poisoned.
    pub fn tick(&self) -> Result<SessionCommandResult, DomainError> {
        let command = CheckCaptionTimer {
            correlation_id: Uuid::new_v4(),
            session_id: self.session_id,
        };
        self.execute(&command, command_handlers::handle_check_caption_timer)
    }

    /// Follows a transition made by the authoritative instance.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the transition cannot be followed.
    pub fn observe(&self, from: PhaseKind, to: PhaseKind) -> Result<SessionCommandResult, DomainError> {
        let command = ObservePhaseChange {
            correlation_id: Uuid::new_v4(),
            session_id: self.session_id,
            from,
            to,
        };
        self.execute(&command, command_handlers::handle_observe_phase_change)
    }

    /// Returns the session to the lobby.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the session lock is poisoned.
    pub fn reset(&self) -> Result<SessionCommandResult, DomainError> {
        let command = ResetSession {
            correlation_id: Uuid::new_v4(),
            session_id: self.session_id,
        };
        self.execute(&command, command_handlers::handle_reset_session)
    }

    // --- queries ---

    /// The active phase.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the session lock is poisoned.
    pub fn current_phase(&self) -> Result<PhaseKind, DomainError> {
        Ok(self.lock()?.current_phase())
    }

    /// Time left on the caption countdown at the host clock.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the session lock is poisoned.
    pub fn caption_time_remaining(&self) -> Result<Option<Duration>, DomainError> {
        let now = self.clock.now();
        Ok(self.lock()?.caption_time_remaining(now))
    }

    /// Session summary.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the session lock is poisoned.
    pub fn view(&self) -> Result<SessionView, DomainError> {
        let now = self.clock.now();
        let controller = self.lock()?;
        Ok(query_handlers::get_session(&controller, now))
    }

    /// One bank's contents, or only `owner`'s submissions to it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the session lock is poisoned.
    pub fn bank(&self, kind: BankKind, owner: Option<PlayerId>) -> Result<BankView, DomainError> {
        let controller = self.lock()?;
        Ok(query_handlers::get_bank(&controller, kind, owner))
    }

    /// The active vote.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PhaseMismatch` outside a voting phase.
    pub fn tally(&self) -> Result<TallyView, DomainError> {
        let controller = self.lock()?;
        query_handlers::get_tally(&controller)
    }

    /// What `voter_id` may vote for.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PhaseMismatch` outside a voting phase.
    pub fn candidates(&self, voter_id: PlayerId) -> Result<CandidatesView, DomainError> {
        let controller = self.lock()?;
        query_handlers::get_candidates(&controller, voter_id)
    }

    /// The creation-phase offer for `viewer`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PhaseMismatch` outside the creation phases.
    pub fn pool(&self, viewer: PlayerId) -> Result<PoolView, DomainError> {
        let controller = self.lock()?;
        let mut rng = self.rng.lock().map_err(|_| poisoned("rng"))?;
        query_handlers::get_creation_pool(&controller, viewer, rng.as_mut())
    }

    /// Finished votes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the session lock is poisoned.
    pub fn results(&self) -> Result<ResultsView, DomainError> {
        let controller = self.lock()?;
        Ok(query_handlers::get_results(&controller))
    }

    /// Logs and swallows an error from a background caller.
    pub(crate) fn report(&self, err: &DomainError) {
        warn!(session_id = %self.session_id, error = %err, "background session call failed");
    }
}
