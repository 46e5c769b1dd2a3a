//! Query handlers for the session context.
//!
//! This module contains read-only queries over a controller that return
//! serializable view DTOs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use doodlefest_core::error::DomainError;
use doodlefest_core::rng::DeterministicRng;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::content::{BankKind, ContentItem, ItemId};
use crate::domain::controller::PhaseController;
use crate::domain::phase::{CaptionStage, PhaseKind};
use crate::domain::player::{Player, PlayerId};
use crate::domain::quota::Quota;
use crate::domain::votes::Standing;

/// Read-only view of a session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// The session identifier.
    pub session_id: Uuid,
    /// The active phase.
    pub phase: PhaseKind,
    /// Which creation phase the next caption countdown leads to.
    pub caption_stage: CaptionStage,
    /// Players in join order.
    pub players: Vec<Player>,
    /// Players the session waits for.
    pub expected_players: usize,
    /// Whether this instance fires transitions.
    pub is_authoritative: bool,
    /// Whole seconds left on the caption countdown, rounded up.
    pub caption_seconds_remaining: Option<i64>,
    /// When the caption countdown ends.
    pub caption_deadline: Option<DateTime<Utc>>,
    /// Quota rounds started so far.
    pub quota_round: u32,
    /// Active quota requirement, in quota-gated phases.
    pub quota: Option<Quota>,
    /// Per-player counts toward the active quota.
    pub quota_counts: BTreeMap<PlayerId, u32>,
    /// Items in each bank.
    pub bank_counts: BTreeMap<BankKind, usize>,
    /// Events already published.
    pub version: i64,
}

/// Read-only view of one bank.
#[derive(Debug, Serialize)]
pub struct BankView {
    /// Which bank.
    pub kind: BankKind,
    /// The player the listing is limited to, if any.
    pub owner: Option<PlayerId>,
    /// Items in submission order.
    pub items: Vec<ContentItem>,
}

/// Read-only view of the active vote.
#[derive(Debug, Serialize)]
pub struct TallyView {
    /// The voting phase.
    pub phase: PhaseKind,
    /// Accepted votes so far.
    pub votes_submitted: usize,
    /// Votes needed to end the phase.
    pub expected_voters: usize,
    /// Votes per candidate.
    pub counts: BTreeMap<u64, usize>,
}

/// Items one voter may choose from.
#[derive(Debug, Serialize)]
pub struct CandidatesView {
    /// The voter.
    pub voter_id: PlayerId,
    /// The candidate already chosen, if the voter has voted.
    pub current_vote: Option<ItemId>,
    /// Eligible items.
    pub candidates: Vec<ContentItem>,
}

/// Material offered to one player in a creation phase.
#[derive(Debug, Serialize)]
pub struct PoolView {
    /// The player the offer was sampled for.
    pub viewer: PlayerId,
    /// Offered drawings.
    pub drawings: Vec<ContentItem>,
    /// Offered captions.
    pub captions: Vec<ContentItem>,
}

/// Winners and standings of the finished votes.
#[derive(Debug, Serialize)]
pub struct ResultsView {
    /// The winning meme, with its content.
    pub meme_winner: Option<ContentItem>,
    /// The winning comic, with its content.
    pub comic_winner: Option<ContentItem>,
    /// Meme standings, most votes first.
    pub meme_standings: Vec<Standing>,
    /// Comic standings, most votes first.
    pub comic_standings: Vec<Standing>,
}

fn owned(items: Vec<std::sync::Arc<ContentItem>>) -> Vec<ContentItem> {
    items.iter().map(|item| ContentItem::clone(item)).collect()
}

/// Summarizes the session as of `now`.
#[must_use]
pub fn get_session(controller: &PhaseController, now: DateTime<Utc>) -> SessionView {
    SessionView {
        session_id: controller.session_id(),
        phase: controller.current_phase(),
        caption_stage: controller.caption_stage(),
        players: controller.players().to_vec(),
        expected_players: controller.expected_players(),
        is_authoritative: controller.is_authoritative(),
        caption_seconds_remaining: controller.caption_seconds_remaining(now),
        caption_deadline: controller.caption_deadline(),
        quota_round: controller.quota_round(),
        quota: controller.active_quota(),
        quota_counts: controller.quota_snapshot(),
        bank_counts: BankKind::ALL
            .iter()
            .map(|kind| (*kind, controller.bank_snapshot(*kind).len()))
            .collect(),
        version: controller.version(),
    }
}

/// Lists one bank, or only `owner`'s submissions to it.
#[must_use]
pub fn get_bank(controller: &PhaseController, kind: BankKind, owner: Option<PlayerId>) -> BankView {
    let items = match owner {
        Some(owner_id) => controller.bank_owned_by(kind, owner_id),
        None => controller.bank_snapshot(kind),
    };
    BankView {
        kind,
        owner,
        items: owned(items),
    }
}

/// Reports the active vote.
///
/// # Errors
///
/// Returns `DomainError::PhaseMismatch` outside a voting phase.
pub fn get_tally(controller: &PhaseController) -> Result<TallyView, DomainError> {
    let phase = controller.current_phase();
    if phase.vote_bank().is_none() {
        return Err(DomainError::PhaseMismatch {
            operation: "get_tally",
            active: phase.to_string(),
        });
    }
    let (votes_submitted, expected_voters) = controller.vote_progress();
    Ok(TallyView {
        phase,
        votes_submitted,
        expected_voters,
        counts: controller
            .tally_snapshot()
            .into_iter()
            .map(|(id, votes)| (id.0, votes))
            .collect(),
    })
}

/// Lists what `voter_id` may vote for.
///
/// # Errors
///
/// Returns `DomainError::PhaseMismatch` outside a voting phase.
pub fn get_candidates(
    controller: &PhaseController,
    voter_id: PlayerId,
) -> Result<CandidatesView, DomainError> {
    Ok(CandidatesView {
        voter_id,
        current_vote: controller.vote_of(voter_id),
        candidates: owned(controller.candidates_for(voter_id)?),
    })
}

/// Samples the creation-phase offer for `viewer`.
///
/// # Errors
///
/// Returns `DomainError::PhaseMismatch` outside the creation phases.
pub fn get_creation_pool(
    controller: &PhaseController,
    viewer: PlayerId,
    rng: &mut dyn DeterministicRng,
) -> Result<PoolView, DomainError> {
    let pool = controller.creation_pool(viewer, rng)?;
    Ok(PoolView {
        viewer,
        drawings: owned(pool.drawings),
        captions: owned(pool.captions),
    })
}

/// Reports the finished votes.
#[must_use]
pub fn get_results(controller: &PhaseController) -> ResultsView {
    let results = controller.results();
    let winner = |kind: BankKind, id: Option<ItemId>| {
        id.and_then(|id| controller.item(kind, id).ok())
            .map(|item| ContentItem::clone(&item))
    };
    ResultsView {
        meme_winner: winner(BankKind::Meme, results.meme_winner()),
        comic_winner: winner(BankKind::Comic, results.comic_winner()),
        meme_standings: results.memes.clone(),
        comic_standings: results.comics.clone(),
    }
}

#[cfg(test)]
mod tests {
    use doodlefest_core::clock::Clock;
    use doodlefest_core::error::DomainError;
    use doodlefest_test_support::{FixedClock, ManualClock, MockRng, fake_png, fixed_now};
    use uuid::Uuid;

    use super::*;
    use crate::domain::content::{ImagePayload, MemePayload, Payload};
    use crate::domain::controller::{SessionConfig, Vantage};

    fn drawing(tag: u8) -> Payload {
        Payload::Drawing(ImagePayload {
            bytes: fake_png(tag),
            width: 16,
            height: 16,
        })
    }

    /// Two players at the start of meme creation, one drawing each.
    fn at_meme_create(clock: &ManualClock) -> (PhaseController, PlayerId, PlayerId) {
        let config = SessionConfig::new(1, 60).unwrap();
        let mut controller = PhaseController::new(Uuid::new_v4(), Vantage::Referee, config);
        let (a, b) = (PlayerId::generate(), PlayerId::generate());
        controller.add_player(a, true, Uuid::new_v4(), clock);
        controller.add_player(b, false, Uuid::new_v4(), clock);
        controller.start_session(Uuid::new_v4(), clock).unwrap();
        controller
            .submit(BankKind::Drawing, a, drawing(1), Uuid::new_v4(), clock)
            .unwrap();
        controller
            .submit(BankKind::Drawing, b, drawing(2), Uuid::new_v4(), clock)
            .unwrap();
        controller
            .submit(BankKind::Caption, b, Payload::Caption("hello".to_owned()), Uuid::new_v4(), clock)
            .unwrap();
        clock.advance_secs(60);
        controller.check_caption_timer(Uuid::new_v4(), clock);
        (controller, a, b)
    }

    #[test]
    fn test_get_session_in_lobby_returns_view() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let session_id = Uuid::new_v4();
        let mut controller =
            PhaseController::new(session_id, Vantage::Referee, SessionConfig::default());
        controller.add_player(PlayerId::generate(), true, Uuid::new_v4(), &clock);

        // Act
        let view = get_session(&controller, fixed_now());

        // Assert
        assert_eq!(view.session_id, session_id);
        assert_eq!(view.phase, PhaseKind::Lobby);
        assert_eq!(view.players.len(), 1);
        assert!(view.is_authoritative);
        assert_eq!(view.caption_seconds_remaining, None);
        assert_eq!(view.bank_counts[&BankKind::Drawing], 0);
        assert_eq!(view.quota, None);
    }

    #[test]
    fn test_get_session_reports_rounded_up_countdown() {
        let clock = ManualClock::default();
        let config = SessionConfig::new(1, 60).unwrap();
        let mut controller = PhaseController::new(Uuid::new_v4(), Vantage::Referee, config);
        let player = PlayerId::generate();
        controller.add_player(player, true, Uuid::new_v4(), &clock);
        controller.start_session(Uuid::new_v4(), &clock).unwrap();
        controller
            .submit(BankKind::Drawing, player, drawing(1), Uuid::new_v4(), &clock)
            .unwrap();
        clock.advance(chrono::Duration::milliseconds(10_500));

        let view = get_session(&controller, clock.now());

        assert_eq!(view.phase, PhaseKind::Caption { round: 1 });
        assert_eq!(view.caption_seconds_remaining, Some(50));
        assert_eq!(view.caption_deadline, Some(fixed_now() + chrono::Duration::seconds(60)));
        assert_eq!(view.quota_round, 1);
    }

    #[test]
    fn test_get_tally_outside_vote_returns_phase_mismatch() {
        let controller =
            PhaseController::new(Uuid::new_v4(), Vantage::Referee, SessionConfig::default());

        let result = get_tally(&controller);

        assert!(matches!(result, Err(DomainError::PhaseMismatch { .. })));
    }

    #[test]
    fn test_get_creation_pool_during_meme_create() {
        let clock = ManualClock::default();
        let (controller, a, _) = at_meme_create(&clock);

        let pool = get_creation_pool(&controller, a, &mut MockRng).unwrap();

        assert_eq!(pool.viewer, a);
        assert_eq!(pool.drawings.len(), 2);
        assert_eq!(pool.captions.len(), 1);
    }

    #[test]
    fn test_get_results_after_meme_vote_names_winner() {
        // Arrange
        let clock = ManualClock::default();
        let (mut controller, a, b) = at_meme_create(&clock);
        for (owner, drawing) in [(a, 2), (b, 1)] {
            controller
                .submit(
                    BankKind::Meme,
                    owner,
                    Payload::Meme(MemePayload {
                        drawing: ItemId(drawing),
                        caption: "hello".to_owned(),
                    }),
                    Uuid::new_v4(),
                    &clock,
                )
                .unwrap();
        }
        let candidates = get_candidates(&controller, a).unwrap();
        assert_eq!(candidates.candidates.len(), 1);
        let pick = candidates.candidates[0].id;

        // Act
        controller.cast_vote(a, pick, Uuid::new_v4(), &clock).unwrap();
        let tally = get_tally(&controller).unwrap();
        let chosen = get_candidates(&controller, a).unwrap().current_vote;
        controller
            .cast_vote(b, ItemId(1), Uuid::new_v4(), &clock)
            .unwrap();
        let results = get_results(&controller);

        // Assert
        assert_eq!(chosen, Some(pick));
        assert_eq!(tally.votes_submitted, 1);
        assert_eq!(tally.expected_voters, 2);
        assert_eq!(results.meme_winner.map(|item| item.owner_id), Some(b));
        assert_eq!(results.meme_standings.len(), 2);
        assert!(results.comic_winner.is_none());
        assert_eq!(get_bank(&controller, BankKind::Meme, None).items.len(), 2);
        let own = get_bank(&controller, BankKind::Meme, Some(a));
        assert_eq!(own.owner, Some(a));
        assert_eq!(own.items.len(), 1);
        assert_eq!(own.items[0].owner_id, a);
    }
}
