//! Per-round submission quotas.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::num::NonZeroU32;

use doodlefest_core::error::DomainError;
use serde::Serialize;
use tracing::{debug, warn};

use super::player::PlayerId;

/// A validated per-player submission requirement (at least one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quota(NonZeroU32);

impl Quota {
    /// One submission per player.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Drawings each player owes per draw round unless configured otherwise.
    pub const DEFAULT_DRAWINGS: Self = Self(NonZeroU32::MIN.saturating_add(2));

    /// Validates a requirement.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a requirement below one.
    pub fn new(per_player: u32) -> Result<Self, DomainError> {
        NonZeroU32::new(per_player).map(Self).ok_or_else(|| {
            DomainError::Validation("per-player quota must be at least 1".to_owned())
        })
    }

    /// The requirement as a plain count.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Progress reported after one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaProgress {
    /// The submitting player's count this round, including this submission.
    pub count: u32,
    /// Whether every expected player has reached the quota.
    pub quota_met: bool,
}

/// Counts submissions per player for the current round.
#[derive(Debug)]
pub struct QuotaTracker {
    quota: Quota,
    expected: BTreeSet<PlayerId>,
    counts: HashMap<PlayerId, u32>,
    round: u32,
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self {
            quota: Quota::ONE,
            expected: BTreeSet::new(),
            counts: HashMap::new(),
            round: 0,
        }
    }
}

impl QuotaTracker {
    /// Starts a new round: clears every count and sets who must submit.
    ///
    /// A reset in the middle of a round is a full, clean reset; the discarded
    /// counts are logged.
    ///
    /// # Panics
    ///
    /// Panics if `player_ids` is empty. A round nobody is expected to finish
    /// could never advance.
    pub fn reset_for_round(
        &mut self,
        player_ids: impl IntoIterator<Item = PlayerId>,
        quota: Quota,
    ) {
        let expected: BTreeSet<PlayerId> = player_ids.into_iter().collect();
        assert!(
            !expected.is_empty(),
            "quota round started with an empty expected roster"
        );
        if !self.counts.is_empty() && !self.all_met() {
            warn!(
                round = self.round,
                discarded = self.counts.len(),
                "quota reset before the round completed"
            );
        }
        self.round += 1;
        self.quota = quota;
        self.expected = expected;
        self.counts.clear();
        debug!(round = self.round, quota = quota.get(), expected = self.expected.len(), "quota round started");
    }

    /// Counts one submission from `player_id` and re-evaluates the quota.
    ///
    /// Players outside the expected roster are counted but never stand in for
    /// an expected player who has not submitted.
    pub fn register_submission(&mut self, player_id: PlayerId) -> QuotaProgress {
        let count = self.counts.entry(player_id).or_insert(0);
        *count = count.saturating_add(1);
        let count = *count;
        let quota_met = self.all_met();
        debug!(round = self.round, player = %player_id, count, quota = self.quota.get(), quota_met, "submission counted");
        QuotaProgress { count, quota_met }
    }

    fn all_met(&self) -> bool {
        !self.expected.is_empty()
            && self
                .expected
                .iter()
                .all(|id| self.count_for(*id) >= self.quota.get())
    }

    /// Whether every expected player has reached the quota.
    #[must_use]
    pub fn quota_met(&self) -> bool {
        self.all_met()
    }

    /// Submissions from `player_id` this round.
    #[must_use]
    pub fn count_for(&self, player_id: PlayerId) -> u32 {
        self.counts.get(&player_id).copied().unwrap_or(0)
    }

    /// The current requirement.
    #[must_use]
    pub fn quota(&self) -> Quota {
        self.quota
    }

    /// How many rounds have been started.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Counts for every expected player (zero included) plus any late
    /// submitters, ordered by player id.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<PlayerId, u32> {
        let mut snapshot: BTreeMap<PlayerId, u32> =
            self.expected.iter().map(|id| (*id, 0)).collect();
        for (id, count) in &self.counts {
            snapshot.insert(*id, *count);
        }
        snapshot
    }
}
