//! One-vote-per-player tallies for the voting phases.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use super::content::ItemId;
use super::player::PlayerId;

/// Result of a vote attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    /// Whether the vote was recorded. A player's second vote is not.
    pub accepted: bool,
    /// Whether enough distinct players have voted.
    pub quorum_reached: bool,
}

/// A candidate's position in the standings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// The candidate item.
    pub candidate: ItemId,
    /// Votes received.
    pub votes: usize,
}

/// Records at most one vote per player for the active voting phase.
#[derive(Debug, Default)]
pub struct VoteTally {
    expected_voters: usize,
    /// Accepted votes in cast order.
    ballots: Vec<(PlayerId, ItemId)>,
    voted: HashMap<PlayerId, ItemId>,
}

impl VoteTally {
    /// Clears every vote and sets the quorum.
    pub fn reset(&mut self, expected_voters: usize) {
        self.expected_voters = expected_voters;
        self.ballots.clear();
        self.voted.clear();
    }

    /// Records `player_id`'s vote for `candidate` unless they already voted.
    pub fn cast_vote(&mut self, player_id: PlayerId, candidate: ItemId) -> VoteOutcome {
        if let Some(first) = self.voted.get(&player_id) {
            warn!(player = %player_id, first = first.0, rejected = candidate.0, "second vote rejected");
            return VoteOutcome {
                accepted: false,
                quorum_reached: self.quorum_reached(),
            };
        }
        self.voted.insert(player_id, candidate);
        self.ballots.push((player_id, candidate));
        let quorum_reached = self.quorum_reached();
        debug!(
            player = %player_id,
            candidate = candidate.0,
            votes = self.ballots.len(),
            expected = self.expected_voters,
            quorum_reached,
            "vote recorded"
        );
        VoteOutcome {
            accepted: true,
            quorum_reached,
        }
    }

    /// Whether the number of distinct voters has reached the quorum.
    #[must_use]
    pub fn quorum_reached(&self) -> bool {
        self.ballots.len() >= self.expected_voters
    }

    /// Number of accepted votes.
    #[must_use]
    pub fn votes_submitted(&self) -> usize {
        self.ballots.len()
    }

    /// The quorum threshold.
    #[must_use]
    pub fn expected_voters(&self) -> usize {
        self.expected_voters
    }

    /// The candidate `player_id` voted for, if any.
    #[must_use]
    pub fn vote_of(&self, player_id: PlayerId) -> Option<ItemId> {
        self.voted.get(&player_id).copied()
    }

    /// Votes per candidate, recomputed from the ballots on every call.
    #[must_use]
    pub fn tally(&self) -> BTreeMap<ItemId, usize> {
        let mut counts = BTreeMap::new();
        for (_, candidate) in &self.ballots {
            *counts.entry(*candidate).or_insert(0) += 1;
        }
        counts
    }

    /// Every voted-for candidate, most votes first. Equal counts are ordered
    /// by which candidate received its first vote earlier.
    #[must_use]
    pub fn standings(&self) -> Vec<Standing> {
        let counts = self.tally();
        let mut first_seen: Vec<ItemId> = Vec::with_capacity(counts.len());
        for (_, candidate) in &self.ballots {
            if !first_seen.contains(candidate) {
                first_seen.push(*candidate);
            }
        }
        let mut standings: Vec<(usize, Standing)> = first_seen
            .into_iter()
            .enumerate()
            .map(|(order, candidate)| {
                (
                    order,
                    Standing {
                        candidate,
                        votes: counts[&candidate],
                    },
                )
            })
            .collect();
        standings.sort_by(|(a_order, a), (b_order, b)| {
            b.votes.cmp(&a.votes).then(a_order.cmp(b_order))
        });
        standings.into_iter().map(|(_, standing)| standing).collect()
    }

    /// The winning candidate, if any votes were cast.
    #[must_use]
    pub fn winner(&self) -> Option<ItemId> {
        self.standings().first().map(|s| s.candidate)
    }
}
