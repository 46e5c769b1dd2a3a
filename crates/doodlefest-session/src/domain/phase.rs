//! The phase sequence.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::content::BankKind;

/// One stage of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PhaseKind {
    /// Players are joining.
    Lobby,
    /// Players draw until everyone meets the drawing quota.
    Draw {
        /// Draw/caption round, starting at 1.
        round: u32,
    },
    /// Players write captions until the countdown runs out.
    Caption {
        /// Draw/caption round, starting at 1.
        round: u32,
    },
    /// Each player pairs a drawing with a caption.
    MemeCreate,
    /// Players vote for the best meme.
    MemeVote,
    /// Each player assembles a four-panel comic.
    ComicCreate,
    /// Players vote for the best comic.
    ComicVote,
    /// Winners are shown. Terminal.
    Results,
}

/// What ends a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The authoritative instance starts the session by hand.
    Start,
    /// Every expected player meets a submission quota.
    Quota,
    /// Every expected player has voted.
    Quorum,
    /// The caption countdown expires.
    Timer,
    /// Nothing; the session is over.
    Terminal,
}

impl PhaseKind {
    /// What ends this phase.
    #[must_use]
    pub fn gate(self) -> Gate {
        match self {
            Self::Lobby => Gate::Start,
            Self::Draw { .. } | Self::MemeCreate | Self::ComicCreate => Gate::Quota,
            Self::MemeVote | Self::ComicVote => Gate::Quorum,
            Self::Caption { .. } => Gate::Timer,
            Self::Results => Gate::Terminal,
        }
    }

    /// The bank players submit to during this phase.
    #[must_use]
    pub fn submission_bank(self) -> Option<BankKind> {
        match self {
            Self::Draw { .. } => Some(BankKind::Drawing),
            Self::Caption { .. } => Some(BankKind::Caption),
            Self::MemeCreate => Some(BankKind::Meme),
            Self::ComicCreate => Some(BankKind::Comic),
            Self::Lobby | Self::MemeVote | Self::ComicVote | Self::Results => None,
        }
    }

    /// The bank whose items are candidates during this phase.
    #[must_use]
    pub fn vote_bank(self) -> Option<BankKind> {
        match self {
            Self::MemeVote => Some(BankKind::Meme),
            Self::ComicVote => Some(BankKind::Comic),
            _ => None,
        }
    }

    /// The phase that follows, for every phase whose successor does not
    /// depend on the caption stage flag.
    #[must_use]
    pub fn fixed_successor(self) -> Option<Self> {
        match self {
            Self::Lobby => Some(Self::Draw { round: 1 }),
            Self::Draw { round } => Some(Self::Caption { round }),
            Self::MemeCreate => Some(Self::MemeVote),
            Self::ComicCreate => Some(Self::ComicVote),
            Self::ComicVote => Some(Self::Results),
            // The round number comes from the controller.
            Self::MemeVote | Self::Caption { .. } | Self::Results => None,
        }
    }

    /// Stable snake-case name without the round.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Draw { .. } => "draw",
            Self::Caption { .. } => "caption",
            Self::MemeCreate => "meme_create",
            Self::MemeVote => "meme_vote",
            Self::ComicCreate => "comic_create",
            Self::ComicVote => "comic_vote",
            Self::Results => "results",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draw { round } | Self::Caption { round } => write!(f, "{}({round})", self.name()),
            other => f.write_str(other.name()),
        }
    }
}

/// Which creation phase the next caption countdown leads to. Flips every
/// time a caption phase ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionStage {
    /// The next caption phase ends in `MemeCreate`.
    #[default]
    Meme,
    /// The next caption phase ends in `ComicCreate`.
    Comic,
}

impl CaptionStage {
    /// The creation phase this stage leads to.
    #[must_use]
    pub fn successor(self) -> PhaseKind {
        match self {
            Self::Meme => PhaseKind::MemeCreate,
            Self::Comic => PhaseKind::ComicCreate,
        }
    }

    /// The other stage.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Meme => Self::Comic,
            Self::Comic => Self::Meme,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gates_match_phase_kinds() {
        assert_eq!(PhaseKind::Draw { round: 2 }.gate(), Gate::Quota);
        assert_eq!(PhaseKind::MemeCreate.gate(), Gate::Quota);
        assert_eq!(PhaseKind::ComicCreate.gate(), Gate::Quota);
        assert_eq!(PhaseKind::MemeVote.gate(), Gate::Quorum);
        assert_eq!(PhaseKind::ComicVote.gate(), Gate::Quorum);
        assert_eq!(PhaseKind::Caption { round: 1 }.gate(), Gate::Timer);
        assert_eq!(PhaseKind::Results.gate(), Gate::Terminal);
    }

    #[test]
    fn test_stage_flag_alternates() {
        let stage = CaptionStage::default();

        assert_eq!(stage.successor(), PhaseKind::MemeCreate);
        assert_eq!(stage.flipped().successor(), PhaseKind::ComicCreate);
        assert_eq!(stage.flipped().flipped(), stage);
    }

    #[test]
    fn test_display_includes_round() {
        assert_eq!(PhaseKind::Draw { round: 2 }.to_string(), "draw(2)");
        assert_eq!(PhaseKind::MemeVote.to_string(), "meme_vote");
    }

    #[test]
    fn test_phase_serializes_with_tag() {
        let json = serde_json::to_value(PhaseKind::Caption { round: 1 }).unwrap();

        assert_eq!(json, serde_json::json!({"phase": "caption", "round": 1}));
    }
}
