//! The phase controller: the session's state machine.
//!
//! The controller owns all session state and is the only component that
//! changes the active phase. Each mutating call is synchronous; callers that
//! share a controller across tasks serialize access to it.
//!
//! Mutations buffer [`SessionEvent`]s that the host drains with
//! [`PhaseController::take_events`] and publishes to subscribers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use doodlefest_core::clock::Clock;
use doodlefest_core::error::DomainError;
use doodlefest_core::event::EventMetadata;
use doodlefest_core::rng::DeterministicRng;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::bank::{Banks, SubmitOutcome};
use super::content::{BankKind, ContentItem, ItemId, Payload};
use super::events::{
    CaptionDuplicateIgnored, ContentSubmitted, ExpectedPlayersSet, PhaseChanged, PlayerJoined,
    SessionEvent, SessionEventKind, SessionReset, VoteCast,
};
use super::phase::{CaptionStage, Gate, PhaseKind};
use super::player::{Player, PlayerId, Roster};
use super::pool::{CreationPool, PoolLimits, comic_pool, meme_pool};
use super::quota::{Quota, QuotaProgress, QuotaTracker};
use super::timer::CaptionTimer;
use super::votes::{Standing, VoteOutcome, VoteTally};

/// Default caption countdown, in seconds.
pub const DEFAULT_CAPTION_SECS: i64 = 60;

/// Tunables fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Drawings each player owes per draw round.
    pub drawing_quota: Quota,
    /// Length of each caption countdown.
    pub caption_duration: Duration,
    /// Sizes of the creation-phase offers.
    pub pool_limits: PoolLimits,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            drawing_quota: Quota::DEFAULT_DRAWINGS,
            caption_duration: Duration::seconds(DEFAULT_CAPTION_SECS),
            pool_limits: PoolLimits::default(),
        }
    }
}

impl SessionConfig {
    /// Builds a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a zero drawing quota or a
    /// caption countdown shorter than one second.
    pub fn new(drawing_quota: u32, caption_secs: i64) -> Result<Self, DomainError> {
        if caption_secs < 1 {
            return Err(DomainError::Validation(format!(
                "caption countdown must be at least 1 second, got {caption_secs}"
            )));
        }
        Ok(Self {
            drawing_quota: Quota::new(drawing_quota)?,
            caption_duration: Duration::seconds(caption_secs),
            pool_limits: PoolLimits::default(),
        })
    }
}

/// Whose coordinator this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vantage {
    /// A referee instance that runs the session for everyone in-process.
    Referee,
    /// A local mirror running on one participant's device.
    Participant(PlayerId),
}

/// What a submission did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Stored, or ignored as a duplicate caption.
    pub outcome: SubmitOutcome,
    /// Quota progress, for quota-gated phases.
    pub progress: Option<QuotaProgress>,
    /// The phase entered because of this submission, if any.
    pub transitioned_to: Option<PhaseKind>,
}

/// What a vote did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteReceipt {
    /// Tally result; always `accepted` here since rejections are errors.
    pub outcome: VoteOutcome,
    /// The phase entered because of this vote, if any.
    pub transitioned_to: Option<PhaseKind>,
}

/// Final standings of the two voting phases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionResults {
    /// Meme standings, most votes first.
    pub memes: Vec<Standing>,
    /// Comic standings, most votes first.
    pub comics: Vec<Standing>,
}

impl SessionResults {
    /// The winning meme.
    #[must_use]
    pub fn meme_winner(&self) -> Option<ItemId> {
        self.memes.first().map(|s| s.candidate)
    }

    /// The winning comic.
    #[must_use]
    pub fn comic_winner(&self) -> Option<ItemId> {
        self.comics.first().map(|s| s.candidate)
    }
}

/// The session state machine.
#[derive(Debug)]
pub struct PhaseController {
    session_id: Uuid,
    vantage: Vantage,
    config: SessionConfig,
    roster: Roster,
    expected_players: usize,
    active: PhaseKind,
    caption_stage: CaptionStage,
    caption_timer: Option<CaptionTimer>,
    draw_round: u32,
    quota: QuotaTracker,
    votes: VoteTally,
    banks: Banks,
    results: SessionResults,
    /// Events already drained by the host.
    version: i64,
    uncommitted_events: Vec<SessionEvent>,
}

impl PhaseController {
    /// Creates a controller in the lobby.
    #[must_use]
    pub fn new(session_id: Uuid, vantage: Vantage, config: SessionConfig) -> Self {
        Self {
            session_id,
            vantage,
            config,
            roster: Roster::default(),
            expected_players: 1,
            active: PhaseKind::Lobby,
            caption_stage: CaptionStage::default(),
            caption_timer: None,
            draw_round: 0,
            quota: QuotaTracker::default(),
            votes: VoteTally::default(),
            banks: Banks::default(),
            results: SessionResults::default(),
            version: 0,
            uncommitted_events: Vec::new(),
        }
    }

    // --- authority ---

    /// Whether the session has, or is waiting for, more than one player.
    #[must_use]
    pub fn is_multiplayer(&self) -> bool {
        self.roster.len().max(self.expected_players) > 1
    }

    /// The single authority predicate: only an authoritative instance fires
    /// transitions. A referee always is; a participant is when it is the
    /// host or plays alone.
    #[must_use]
    pub fn is_authoritative(&self) -> bool {
        match self.vantage {
            Vantage::Referee => true,
            Vantage::Participant(local) => {
                !self.is_multiplayer() || self.roster.host().is_some_and(|h| h.id == local)
            }
        }
    }

    // --- roster ---

    /// Adds a player. Re-joining returns the original membership and emits
    /// nothing.
    pub fn add_player(
        &mut self,
        player_id: PlayerId,
        is_host: bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Player {
        if let Some(existing) = self.roster.get(player_id) {
            return existing;
        }
        let player = self.roster.join(player_id, is_host);
        if is_host && !player.is_host {
            warn!(player = %player_id, "session already has a host; joined as a player");
        }
        info!(session_id = %self.session_id, player = %player_id, is_host = player.is_host, phase = %self.active, "player joined");
        self.record(
            SessionEventKind::PlayerJoined(PlayerJoined {
                player_id,
                is_host: player.is_host,
            }),
            correlation_id,
            clock,
        );
        player
    }

    /// Sets how many players the session waits for before it can start.
    /// Values below one are raised to one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PhaseMismatch` outside the lobby.
    pub fn set_expected_player_count(
        &mut self,
        count: usize,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<usize, DomainError> {
        self.require_phase(PhaseKind::Lobby, "set_expected_player_count")?;
        let count = count.max(1);
        self.expected_players = count;
        self.record(
            SessionEventKind::ExpectedPlayersSet(ExpectedPlayersSet { count }),
            correlation_id,
            clock,
        );
        Ok(count)
    }

    // --- lifecycle ---

    /// Leaves the lobby for the first draw round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PhaseMismatch` outside the lobby,
    /// `DomainError::NotAuthoritative` on a non-authoritative instance, and
    /// `DomainError::Validation` while fewer players than expected have
    /// joined or when a multiplayer session has no host.
    pub fn start_session(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<PhaseKind, DomainError> {
        self.require_phase(PhaseKind::Lobby, "start_session")?;
        if !self.is_authoritative() {
            return Err(DomainError::NotAuthoritative);
        }
        if self.roster.is_empty() || self.roster.len() < self.expected_players {
            return Err(DomainError::Validation(format!(
                "waiting for players: {} of {} joined",
                self.roster.len(),
                self.expected_players
            )));
        }
        if self.is_multiplayer() && self.roster.host().is_none() {
            return Err(DomainError::Validation(
                "a multiplayer session needs a host".to_owned(),
            ));
        }
        let next = PhaseKind::Draw { round: 1 };
        self.transition(next, correlation_id, clock);
        Ok(next)
    }

    /// Ends the caption phase if its countdown has run out. Returns the phase
    /// entered, if any. Outside a caption phase, or on a non-authoritative
    /// instance, this only observes.
    pub fn check_caption_timer(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Option<PhaseKind> {
        let PhaseKind::Caption { .. } = self.active else {
            return None;
        };
        let expired = self
            .caption_timer
            .is_some_and(|timer| timer.is_expired(clock.now()));
        if !expired {
            return None;
        }
        if !self.is_authoritative() {
            debug!(session_id = %self.session_id, "caption countdown expired; waiting for host");
            return None;
        }
        let next = self.caption_stage.successor();
        self.transition(next, correlation_id, clock);
        Some(next)
    }

    /// Follows a transition fired by the authoritative instance.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotAuthoritative` on an authoritative instance
    /// (it fires its own transitions), `DomainError::PhaseMismatch` when
    /// `from` is not the active phase, and `DomainError::Validation` when
    /// `to` is not the phase that follows `from` or nobody has joined.
    pub fn observe_phase_change(
        &mut self,
        from: PhaseKind,
        to: PhaseKind,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.is_authoritative() {
            return Err(DomainError::NotAuthoritative);
        }
        self.require_phase(from, "observe_phase_change")?;
        let expected = self.successor_of(from);
        if expected != Some(to) {
            return Err(DomainError::Validation(format!(
                "{to} does not follow {from}"
            )));
        }
        // Quota rounds and vote quorums are sized from the roster.
        if self.roster.is_empty() {
            return Err(DomainError::Validation(
                "cannot follow a transition before any player has joined".to_owned(),
            ));
        }
        self.transition(to, correlation_id, clock);
        Ok(())
    }

    /// Wipes banks, quota, votes and results and returns to the lobby. The
    /// roster and expected player count are kept.
    pub fn reset_session(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        let from = self.active;
        self.banks.clear();
        self.votes.reset(0);
        self.quota = QuotaTracker::default();
        self.caption_stage = CaptionStage::default();
        self.caption_timer = None;
        self.draw_round = 0;
        self.results = SessionResults::default();
        self.active = PhaseKind::Lobby;
        info!(session_id = %self.session_id, %from, "session reset");
        self.record(
            SessionEventKind::SessionReset(SessionReset { from }),
            correlation_id,
            clock,
        );
    }

    // --- submissions and votes ---

    /// Stores a submission in `bank` and, in quota-gated phases, counts it
    /// toward the quota; the phase advances as soon as every expected
    /// player has met it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PhaseMismatch` when `bank` is not open in the
    /// active phase, and `DomainError::Validation` for an unknown player, a
    /// malformed payload, or a meme/comic referencing a missing drawing.
    pub fn submit(
        &mut self,
        bank: BankKind,
        owner_id: PlayerId,
        payload: Payload,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<SubmissionReceipt, DomainError> {
        if self.active.submission_bank() != Some(bank) {
            return Err(self.mismatch("submit"));
        }
        self.require_member(owner_id)?;
        let drawings = self.banks.get(BankKind::Drawing);
        if let Some(missing) = payload
            .drawing_refs()
            .into_iter()
            .find(|id| !drawings.contains(*id))
        {
            return Err(DomainError::Validation(format!(
                "drawing {missing} does not exist"
            )));
        }

        let outcome = self.banks.get_mut(bank).submit(owner_id, payload, clock)?;
        let item_id = match outcome {
            SubmitOutcome::Stored(id) => id,
            SubmitOutcome::DuplicateIgnored(id) => {
                self.record(
                    SessionEventKind::CaptionDuplicateIgnored(CaptionDuplicateIgnored {
                        item_id: id,
                        owner_id,
                    }),
                    correlation_id,
                    clock,
                );
                return Ok(SubmissionReceipt {
                    outcome,
                    progress: None,
                    transitioned_to: None,
                });
            }
        };

        let progress =
            (self.active.gate() == Gate::Quota).then(|| self.quota.register_submission(owner_id));
        self.record(
            SessionEventKind::ContentSubmitted(ContentSubmitted {
                bank,
                item_id,
                owner_id,
                quota_count: progress.map(|p| p.count),
            }),
            correlation_id,
            clock,
        );

        let mut transitioned_to = None;
        if progress.is_some_and(|p| p.quota_met) {
            if self.is_authoritative() {
                if let Some(next) = self.successor_of(self.active) {
                    info!(session_id = %self.session_id, phase = %self.active, "all players met quota");
                    self.transition(next, correlation_id, clock);
                    transitioned_to = Some(next);
                }
            } else {
                debug!(session_id = %self.session_id, "quota met; waiting for host");
            }
        }

        Ok(SubmissionReceipt {
            outcome,
            progress,
            transitioned_to,
        })
    }

    /// Records `voter_id`'s vote; the phase advances as soon as every
    /// expected player has voted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PhaseMismatch` outside a voting phase,
    /// `DomainError::Validation` for an unknown voter,
    /// `DomainError::UnknownCandidate` when the item does not exist or is the
    /// voter's own in a multiplayer session, and
    /// `DomainError::DoubleVoteRejected` when the voter already voted.
    pub fn cast_vote(
        &mut self,
        voter_id: PlayerId,
        candidate_id: ItemId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<VoteReceipt, DomainError> {
        let Some(bank) = self.active.vote_bank() else {
            return Err(self.mismatch("cast_vote"));
        };
        self.require_member(voter_id)?;
        let candidate = self
            .banks
            .get(bank)
            .get(candidate_id)
            .map_err(|_| DomainError::UnknownCandidate(candidate_id.0))?;
        if self.is_multiplayer() && candidate.owner_id == voter_id {
            return Err(DomainError::UnknownCandidate(candidate_id.0));
        }

        let outcome = self.votes.cast_vote(voter_id, candidate_id);
        if !outcome.accepted {
            return Err(DomainError::DoubleVoteRejected(voter_id.0));
        }
        self.record(
            SessionEventKind::VoteCast(VoteCast {
                voter_id,
                candidate_id,
                votes_submitted: self.votes.votes_submitted(),
            }),
            correlation_id,
            clock,
        );

        let mut transitioned_to = None;
        if outcome.quorum_reached {
            if self.is_authoritative() {
                if let Some(next) = self.successor_of(self.active) {
                    info!(session_id = %self.session_id, phase = %self.active, "all votes in");
                    self.transition(next, correlation_id, clock);
                    transitioned_to = Some(next);
                }
            } else {
                debug!(session_id = %self.session_id, "quorum reached; waiting for host");
            }
        }

        Ok(VoteReceipt {
            outcome,
            transitioned_to,
        })
    }

    // --- queries ---

    /// The session identifier.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The active phase.
    #[must_use]
    pub fn current_phase(&self) -> PhaseKind {
        self.active
    }

    /// Which creation phase the next caption countdown leads to.
    #[must_use]
    pub fn caption_stage(&self) -> CaptionStage {
        self.caption_stage
    }

    /// The roster in join order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        self.roster.players()
    }

    /// The expected player count.
    #[must_use]
    pub fn expected_players(&self) -> usize {
        self.expected_players
    }

    /// Snapshot of one bank in submission order.
    #[must_use]
    pub fn bank_snapshot(&self, kind: BankKind) -> Vec<Arc<ContentItem>> {
        self.banks.get(kind).all()
    }

    /// Snapshot of the items `owner_id` submitted to one bank.
    #[must_use]
    pub fn bank_owned_by(&self, kind: BankKind, owner_id: PlayerId) -> Vec<Arc<ContentItem>> {
        self.banks.get(kind).owned_by(owner_id)
    }

    /// Looks an item up in one bank.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the bank has no such item.
    pub fn item(&self, kind: BankKind, id: ItemId) -> Result<Arc<ContentItem>, DomainError> {
        self.banks.get(kind).get(id)
    }

    /// Votes per candidate in the active voting phase.
    #[must_use]
    pub fn tally_snapshot(&self) -> BTreeMap<ItemId, usize> {
        self.votes.tally()
    }

    /// Accepted votes and the quorum in the active voting phase.
    #[must_use]
    pub fn vote_progress(&self) -> (usize, usize) {
        (self.votes.votes_submitted(), self.votes.expected_voters())
    }

    /// The candidate `voter_id` chose in the active voting phase.
    #[must_use]
    pub fn vote_of(&self, voter_id: PlayerId) -> Option<ItemId> {
        self.active
            .vote_bank()
            .and_then(|_| self.votes.vote_of(voter_id))
    }

    /// Quota rounds started since the session was created or reset.
    #[must_use]
    pub fn quota_round(&self) -> u32 {
        self.quota.round()
    }

    /// Per-player counts in the active quota round.
    #[must_use]
    pub fn quota_snapshot(&self) -> BTreeMap<PlayerId, u32> {
        self.quota.snapshot()
    }

    /// The active quota requirement.
    #[must_use]
    pub fn active_quota(&self) -> Option<Quota> {
        (self.active.gate() == Gate::Quota).then(|| self.quota.quota())
    }

    /// Items `voter_id` may vote for in the active voting phase.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PhaseMismatch` outside a voting phase.
    pub fn candidates_for(&self, voter_id: PlayerId) -> Result<Vec<Arc<ContentItem>>, DomainError> {
        let Some(bank) = self.active.vote_bank() else {
            return Err(self.mismatch("candidates_for"));
        };
        let bank = self.banks.get(bank);
        Ok(if self.is_multiplayer() {
            bank.excluding_owner(voter_id)
        } else {
            bank.all()
        })
    }

    /// Time left on the caption countdown, if a caption phase is active.
    #[must_use]
    pub fn caption_time_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.caption_timer.map(|timer| timer.remaining(now))
    }

    /// Whole seconds left on the caption countdown, rounded up.
    #[must_use]
    pub fn caption_seconds_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.caption_timer.map(|timer| timer.remaining_secs_ceil(now))
    }

    /// When the caption countdown ends, if a caption phase is active.
    #[must_use]
    pub fn caption_deadline(&self) -> Option<DateTime<Utc>> {
        self.caption_timer.map(|timer| timer.deadline())
    }

    /// The drawings and captions `viewer` may choose from in the active
    /// creation phase.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PhaseMismatch` outside `MemeCreate` and
    /// `ComicCreate`.
    pub fn creation_pool(
        &self,
        viewer: PlayerId,
        rng: &mut dyn DeterministicRng,
    ) -> Result<CreationPool, DomainError> {
        let limits = self.config.pool_limits;
        match self.active {
            PhaseKind::MemeCreate => Ok(meme_pool(&self.banks, limits, rng)),
            PhaseKind::ComicCreate => Ok(comic_pool(
                &self.banks,
                viewer,
                self.is_multiplayer(),
                limits,
                rng,
            )),
            _ => Err(self.mismatch("creation_pool")),
        }
    }

    /// Standings of the voting phases that have finished.
    #[must_use]
    pub fn results(&self) -> &SessionResults {
        &self.results
    }

    /// Number of events already drained.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Drains buffered events for publication.
    #[allow(clippy::cast_possible_wrap)]
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        self.version += self.uncommitted_events.len() as i64;
        std::mem::take(&mut self.uncommitted_events)
    }

    // --- internals ---

    fn successor_of(&self, phase: PhaseKind) -> Option<PhaseKind> {
        match phase {
            PhaseKind::Caption { .. } => Some(self.caption_stage.successor()),
            PhaseKind::MemeVote => Some(PhaseKind::Draw {
                round: self.draw_round + 1,
            }),
            other => other.fixed_successor(),
        }
    }

    fn transition(&mut self, to: PhaseKind, correlation_id: Uuid, clock: &dyn Clock) {
        let from = self.active;
        match from {
            PhaseKind::Caption { .. } => {
                self.caption_stage = self.caption_stage.flipped();
                self.caption_timer = None;
            }
            PhaseKind::MemeVote | PhaseKind::ComicVote => {
                info!(session_id = %self.session_id, phase = %from, winner = ?self.votes.winner(), "vote closed");
                let standings = self.votes.standings();
                if from == PhaseKind::MemeVote {
                    self.results.memes = standings;
                } else {
                    self.results.comics = standings;
                }
            }
            _ => {}
        }

        self.active = to;
        match to {
            PhaseKind::Draw { round } => {
                self.draw_round = round;
                self.quota
                    .reset_for_round(self.roster.ids(), self.config.drawing_quota);
            }
            PhaseKind::MemeCreate | PhaseKind::ComicCreate => {
                self.quota.reset_for_round(self.roster.ids(), Quota::ONE);
            }
            PhaseKind::Caption { .. } => {
                self.caption_timer =
                    Some(CaptionTimer::start(clock.now(), self.config.caption_duration));
            }
            PhaseKind::MemeVote | PhaseKind::ComicVote => {
                self.votes.reset(self.roster.len());
            }
            PhaseKind::Lobby | PhaseKind::Results => {}
        }

        info!(session_id = %self.session_id, %from, %to, "phase changed");
        self.record(
            SessionEventKind::PhaseChanged(PhaseChanged { from, to }),
            correlation_id,
            clock,
        );
    }

    fn require_phase(&self, phase: PhaseKind, operation: &'static str) -> Result<(), DomainError> {
        if self.active == phase {
            Ok(())
        } else {
            Err(self.mismatch(operation))
        }
    }

    fn require_member(&self, player_id: PlayerId) -> Result<(), DomainError> {
        if self.roster.contains(player_id) {
            Ok(())
        } else {
            Err(DomainError::Validation(format!(
                "player {player_id} has not joined this session"
            )))
        }
    }

    fn mismatch(&self, operation: &'static str) -> DomainError {
        DomainError::PhaseMismatch {
            operation,
            active: self.active.to_string(),
        }
    }

    /// Returns the next sequence number for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn record(&mut self, kind: SessionEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let metadata = EventMetadata::caused_by_command(
            kind.event_type(),
            self.session_id,
            self.next_sequence_number(),
            correlation_id,
            clock,
        );
        self.uncommitted_events.push(SessionEvent { metadata, kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::{COMIC_PANEL_COUNT, ComicPanel, ComicStrip, ImagePayload, MemePayload};
    use doodlefest_test_support::{FixedClock, ManualClock, MockRng, fake_png, fixed_now};

    fn drawing(tag: u8) -> Payload {
        Payload::Drawing(ImagePayload {
            bytes: fake_png(tag),
            width: 64,
            height: 48,
        })
    }

    fn meme(drawing: u64, caption: &str) -> Payload {
        Payload::Meme(MemePayload {
            drawing: ItemId(drawing),
            caption: caption.to_owned(),
        })
    }

    fn comic(first_drawing: u64) -> Payload {
        let mut panels: [Option<ComicPanel>; COMIC_PANEL_COUNT] = Default::default();
        panels[0] = Some(ComicPanel {
            drawing: ItemId(first_drawing),
            caption: Some("and then".to_owned()),
        });
        Payload::Comic(ComicStrip::new(panels))
    }

    fn config(drawing_quota: u32) -> SessionConfig {
        SessionConfig::new(drawing_quota, DEFAULT_CAPTION_SECS).unwrap()
    }

    /// A lobby with `n` players, the first hosting.
    fn lobby(n: usize, vantage_of: Option<usize>, drawing_quota: u32) -> (PhaseController, Vec<PlayerId>) {
        let clock = FixedClock(fixed_now());
        let ids: Vec<PlayerId> = (0..n).map(|_| PlayerId::generate()).collect();
        let vantage = vantage_of.map_or(Vantage::Referee, |i| Vantage::Participant(ids[i]));
        let mut controller = PhaseController::new(Uuid::new_v4(), vantage, config(drawing_quota));
        for (i, id) in ids.iter().enumerate() {
            controller.add_player(*id, i == 0, Uuid::new_v4(), &clock);
        }
        controller
            .set_expected_player_count(n, Uuid::new_v4(), &clock)
            .unwrap();
        (controller, ids)
    }

    #[test]
    fn test_full_session_walks_every_phase_in_order() {
        // Arrange
        let clock = ManualClock::default();
        let (mut controller, ids) = lobby(2, None, 1);
        let (a, b) = (ids[0], ids[1]);
        let cid = Uuid::new_v4();

        // Act / Assert
        assert_eq!(
            controller.start_session(cid, &clock).unwrap(),
            PhaseKind::Draw { round: 1 }
        );

        let first = controller
            .submit(BankKind::Drawing, a, drawing(1), cid, &clock)
            .unwrap();
        assert_eq!(first.transitioned_to, None);
        let second = controller
            .submit(BankKind::Drawing, b, drawing(2), cid, &clock)
            .unwrap();
        assert_eq!(second.transitioned_to, Some(PhaseKind::Caption { round: 1 }));

        controller
            .submit(BankKind::Caption, a, Payload::Caption("  cats  ".to_owned()), cid, &clock)
            .unwrap();
        clock.advance_secs(30);
        assert_eq!(controller.check_caption_timer(cid, &clock), None);
        clock.advance_secs(30);
        assert_eq!(
            controller.check_caption_timer(cid, &clock),
            Some(PhaseKind::MemeCreate)
        );
        assert_eq!(controller.caption_stage(), CaptionStage::Comic);

        controller
            .submit(BankKind::Meme, a, meme(2, "mine"), cid, &clock)
            .unwrap();
        let last_meme = controller
            .submit(BankKind::Meme, b, meme(1, "yours"), cid, &clock)
            .unwrap();
        assert_eq!(last_meme.transitioned_to, Some(PhaseKind::MemeVote));

        controller.cast_vote(a, ItemId(2), cid, &clock).unwrap();
        let last_vote = controller.cast_vote(b, ItemId(1), cid, &clock).unwrap();
        assert_eq!(last_vote.transitioned_to, Some(PhaseKind::Draw { round: 2 }));
        assert_eq!(controller.results().memes.len(), 2);
        assert_eq!(controller.results().meme_winner(), Some(ItemId(2)));

        controller
            .submit(BankKind::Drawing, a, drawing(3), cid, &clock)
            .unwrap();
        controller
            .submit(BankKind::Drawing, b, drawing(4), cid, &clock)
            .unwrap();
        assert_eq!(controller.current_phase(), PhaseKind::Caption { round: 2 });
        clock.advance_secs(DEFAULT_CAPTION_SECS);
        assert_eq!(
            controller.check_caption_timer(cid, &clock),
            Some(PhaseKind::ComicCreate)
        );

        controller
            .submit(BankKind::Comic, a, comic(2), cid, &clock)
            .unwrap();
        controller
            .submit(BankKind::Comic, b, comic(3), cid, &clock)
            .unwrap();
        assert_eq!(controller.current_phase(), PhaseKind::ComicVote);

        controller.cast_vote(a, ItemId(2), cid, &clock).unwrap();
        controller.cast_vote(b, ItemId(1), cid, &clock).unwrap();
        assert_eq!(controller.current_phase(), PhaseKind::Results);
        assert_eq!(controller.results().comics.len(), 2);

        let phases: Vec<PhaseKind> = controller
            .take_events()
            .iter()
            .filter_map(|e| e.phase_change().map(|c| c.to))
            .collect();
        assert_eq!(
            phases,
            vec![
                PhaseKind::Draw { round: 1 },
                PhaseKind::Caption { round: 1 },
                PhaseKind::MemeCreate,
                PhaseKind::MemeVote,
                PhaseKind::Draw { round: 2 },
                PhaseKind::Caption { round: 2 },
                PhaseKind::ComicCreate,
                PhaseKind::ComicVote,
                PhaseKind::Results,
            ]
        );
    }

    #[test]
    fn test_one_fast_player_never_advances_the_draw_round() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let (mut controller, ids) = lobby(3, None, 3);
        controller.start_session(Uuid::new_v4(), &clock).unwrap();

        // Act
        for tag in 0..10 {
            controller
                .submit(BankKind::Drawing, ids[0], drawing(tag), Uuid::new_v4(), &clock)
                .unwrap();
        }
        for id in &ids[1..] {
            for tag in 0..2 {
                controller
                    .submit(BankKind::Drawing, *id, drawing(tag), Uuid::new_v4(), &clock)
                    .unwrap();
            }
        }

        // Assert
        assert_eq!(controller.current_phase(), PhaseKind::Draw { round: 1 });
        assert_eq!(controller.quota_snapshot()[&ids[0]], 10);

        controller
            .submit(BankKind::Drawing, ids[1], drawing(20), Uuid::new_v4(), &clock)
            .unwrap();
        let receipt = controller
            .submit(BankKind::Drawing, ids[2], drawing(21), Uuid::new_v4(), &clock)
            .unwrap();
        assert_eq!(receipt.progress.map(|p| p.quota_met), Some(true));
        assert_eq!(controller.current_phase(), PhaseKind::Caption { round: 1 });
    }

    #[test]
    fn test_submission_to_closed_bank_is_a_phase_mismatch() {
        let clock = FixedClock(fixed_now());
        let (mut controller, ids) = lobby(2, None, 1);

        let result = controller.submit(BankKind::Drawing, ids[0], drawing(1), Uuid::new_v4(), &clock);

        match result {
            Err(DomainError::PhaseMismatch { operation, active }) => {
                assert_eq!(operation, "submit");
                assert_eq!(active, "lobby");
            }
            other => panic!("expected PhaseMismatch, got {other:?}"),
        }
        assert!(controller.bank_snapshot(BankKind::Drawing).is_empty());
    }

    #[test]
    fn test_start_waits_for_expected_players() {
        let clock = FixedClock(fixed_now());
        let (mut controller, _) = lobby(2, None, 1);
        controller
            .set_expected_player_count(3, Uuid::new_v4(), &clock)
            .unwrap();

        let result = controller.start_session(Uuid::new_v4(), &clock);

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(controller.current_phase(), PhaseKind::Lobby);
    }

    #[test]
    fn test_unknown_player_cannot_submit() {
        let clock = FixedClock(fixed_now());
        let (mut controller, _) = lobby(1, None, 1);
        controller.start_session(Uuid::new_v4(), &clock).unwrap();

        let result = controller.submit(
            BankKind::Drawing,
            PlayerId::generate(),
            drawing(1),
            Uuid::new_v4(),
            &clock,
        );

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    fn at_meme_vote(players: usize) -> (PhaseController, Vec<PlayerId>, ManualClock) {
        let clock = ManualClock::default();
        let (mut controller, ids) = lobby(players, None, 1);
        let cid = Uuid::new_v4();
        controller.start_session(cid, &clock).unwrap();
        for (tag, id) in ids.iter().enumerate() {
            controller
                .submit(BankKind::Drawing, *id, drawing(u8::try_from(tag).unwrap()), cid, &clock)
                .unwrap();
        }
        clock.advance_secs(DEFAULT_CAPTION_SECS);
        controller.check_caption_timer(cid, &clock).unwrap();
        for id in &ids {
            controller
                .submit(BankKind::Meme, *id, meme(1, "caption"), cid, &clock)
                .unwrap();
        }
        assert_eq!(controller.current_phase(), PhaseKind::MemeVote);
        (controller, ids, clock)
    }

    #[test]
    fn test_vote_for_own_meme_is_unknown_candidate() {
        let (mut controller, ids, clock) = at_meme_vote(2);

        let result = controller.cast_vote(ids[0], ItemId(1), Uuid::new_v4(), &clock);

        assert!(matches!(result, Err(DomainError::UnknownCandidate(1))));
        let candidates = controller.candidates_for(ids[0]).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, ItemId(2));
    }

    #[test]
    fn test_second_vote_is_rejected_and_first_stands() {
        let (mut controller, ids, clock) = at_meme_vote(3);
        controller
            .cast_vote(ids[0], ItemId(2), Uuid::new_v4(), &clock)
            .unwrap();

        let result = controller.cast_vote(ids[0], ItemId(3), Uuid::new_v4(), &clock);

        match result {
            Err(err @ DomainError::DoubleVoteRejected(_)) => assert!(err.is_soft_warning()),
            other => panic!("expected DoubleVoteRejected, got {other:?}"),
        }
        assert_eq!(controller.tally_snapshot(), BTreeMap::from([(ItemId(2), 1)]));
        assert_eq!(controller.vote_progress(), (1, 3));
    }

    #[test]
    fn test_vote_for_missing_item_is_unknown_candidate() {
        let (mut controller, ids, clock) = at_meme_vote(2);

        let result = controller.cast_vote(ids[0], ItemId(99), Uuid::new_v4(), &clock);

        assert!(matches!(result, Err(DomainError::UnknownCandidate(99))));
    }

    #[test]
    fn test_meme_with_missing_drawing_is_rejected() {
        let clock = ManualClock::default();
        let (mut controller, ids) = lobby(1, None, 1);
        let cid = Uuid::new_v4();
        controller.start_session(cid, &clock).unwrap();
        controller
            .submit(BankKind::Drawing, ids[0], drawing(1), cid, &clock)
            .unwrap();
        clock.advance_secs(DEFAULT_CAPTION_SECS);
        controller.check_caption_timer(cid, &clock);

        let result = controller.submit(BankKind::Meme, ids[0], meme(7, "nope"), cid, &clock);

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(controller.current_phase(), PhaseKind::MemeCreate);
    }

    #[test]
    fn test_solo_player_may_vote_for_own_meme() {
        let (mut controller, ids, clock) = at_meme_vote(1);

        let receipt = controller
            .cast_vote(ids[0], ItemId(1), Uuid::new_v4(), &clock)
            .unwrap();

        assert_eq!(receipt.transitioned_to, Some(PhaseKind::Draw { round: 2 }));
    }

    #[test]
    fn test_duplicate_caption_is_ignored_without_counting() {
        let clock = FixedClock(fixed_now());
        let (mut controller, ids) = lobby(1, None, 1);
        let cid = Uuid::new_v4();
        controller.start_session(cid, &clock).unwrap();
        controller
            .submit(BankKind::Drawing, ids[0], drawing(1), cid, &clock)
            .unwrap();
        controller
            .submit(BankKind::Caption, ids[0], Payload::Caption("hi".to_owned()), cid, &clock)
            .unwrap();
        controller.take_events();

        let receipt = controller
            .submit(BankKind::Caption, ids[0], Payload::Caption(" hi ".to_owned()), cid, &clock)
            .unwrap();

        assert_eq!(receipt.outcome, SubmitOutcome::DuplicateIgnored(ItemId(1)));
        assert_eq!(controller.bank_snapshot(BankKind::Caption).len(), 1);
        let events = controller.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].kind,
            SessionEventKind::CaptionDuplicateIgnored(_)
        ));
    }

    #[test]
    fn test_non_host_participant_waits_for_host_transition() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let (mut controller, ids) = lobby(2, Some(1), 1);
        assert!(!controller.is_authoritative());
        assert!(matches!(
            controller.start_session(Uuid::new_v4(), &clock),
            Err(DomainError::NotAuthoritative)
        ));
        let draw = PhaseKind::Draw { round: 1 };
        controller
            .observe_phase_change(PhaseKind::Lobby, draw, Uuid::new_v4(), &clock)
            .unwrap();

        // Act
        for id in &ids {
            controller
                .submit(BankKind::Drawing, *id, drawing(1), Uuid::new_v4(), &clock)
                .unwrap();
        }

        // Assert
        assert_eq!(controller.current_phase(), draw);
        let caption = PhaseKind::Caption { round: 1 };
        controller
            .observe_phase_change(draw, caption, Uuid::new_v4(), &clock)
            .unwrap();
        assert_eq!(controller.current_phase(), caption);
        assert!(controller.caption_deadline().is_some());
    }

    #[test]
    fn test_observed_transition_must_follow_the_active_phase() {
        let clock = FixedClock(fixed_now());
        let (mut controller, _) = lobby(2, Some(1), 1);

        let skipped = controller.observe_phase_change(
            PhaseKind::Lobby,
            PhaseKind::MemeVote,
            Uuid::new_v4(),
            &clock,
        );
        let stale = controller.observe_phase_change(
            PhaseKind::MemeVote,
            PhaseKind::Draw { round: 2 },
            Uuid::new_v4(),
            &clock,
        );

        assert!(matches!(skipped, Err(DomainError::Validation(_))));
        assert!(matches!(stale, Err(DomainError::PhaseMismatch { .. })));
        assert_eq!(controller.current_phase(), PhaseKind::Lobby);
    }

    #[test]
    fn test_host_participant_is_authoritative() {
        let (controller, _) = lobby(2, Some(0), 1);

        assert!(controller.is_multiplayer());
        assert!(controller.is_authoritative());
    }

    #[test]
    fn test_observe_before_anyone_joined_is_rejected_and_leaves_lobby_intact() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let me = PlayerId::generate();
        let mut controller =
            PhaseController::new(Uuid::new_v4(), Vantage::Participant(me), config(1));
        controller
            .set_expected_player_count(2, Uuid::new_v4(), &clock)
            .unwrap();
        controller.take_events();
        let draw = PhaseKind::Draw { round: 1 };

        // Act
        let result = controller.observe_phase_change(PhaseKind::Lobby, draw, Uuid::new_v4(), &clock);

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(controller.current_phase(), PhaseKind::Lobby);
        assert!(controller.take_events().is_empty());
        controller.add_player(PlayerId::generate(), true, Uuid::new_v4(), &clock);
        controller.add_player(me, false, Uuid::new_v4(), &clock);
        controller
            .observe_phase_change(PhaseKind::Lobby, draw, Uuid::new_v4(), &clock)
            .unwrap();
        assert_eq!(controller.current_phase(), draw);
    }

    #[test]
    fn test_multiplayer_start_requires_a_host() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut controller = PhaseController::new(Uuid::new_v4(), Vantage::Referee, config(1));
        controller.add_player(PlayerId::generate(), false, Uuid::new_v4(), &clock);
        controller.add_player(PlayerId::generate(), false, Uuid::new_v4(), &clock);

        // Act
        let result = controller.start_session(Uuid::new_v4(), &clock);

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(controller.current_phase(), PhaseKind::Lobby);
    }

    #[test]
    fn test_reset_keeps_roster_and_clears_everything_else() {
        let (mut controller, ids, clock) = at_meme_vote(2);
        controller
            .cast_vote(ids[0], ItemId(2), Uuid::new_v4(), &clock)
            .unwrap();

        controller.reset_session(Uuid::new_v4(), &clock);

        assert_eq!(controller.current_phase(), PhaseKind::Lobby);
        assert_eq!(controller.players().len(), 2);
        assert!(BankKind::ALL
            .iter()
            .all(|kind| controller.bank_snapshot(*kind).is_empty()));
        assert!(controller.tally_snapshot().is_empty());
        assert_eq!(controller.caption_stage(), CaptionStage::Meme);
        assert_eq!(
            controller.start_session(Uuid::new_v4(), &clock).unwrap(),
            PhaseKind::Draw { round: 1 }
        );
    }

    #[test]
    fn test_creation_pool_only_in_creation_phases() {
        let (controller, ids, _) = at_meme_vote(2);

        let result = controller.creation_pool(ids[0], &mut MockRng);

        assert!(matches!(result, Err(DomainError::PhaseMismatch { .. })));
    }

    #[test]
    fn test_event_sequence_numbers_continue_across_drains() {
        let clock = FixedClock(fixed_now());
        let (mut controller, _) = lobby(2, None, 1);

        let first = controller.take_events();
        controller.start_session(Uuid::new_v4(), &clock).unwrap();
        let second = controller.take_events();

        let numbers: Vec<i64> = first
            .iter()
            .chain(second.iter())
            .map(|e| e.metadata.sequence_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(controller.version(), 4);
    }

    #[test]
    fn test_zero_caption_countdown_is_rejected() {
        assert!(matches!(
            SessionConfig::new(3, 0),
            Err(DomainError::Validation(_))
        ));
    }
}
