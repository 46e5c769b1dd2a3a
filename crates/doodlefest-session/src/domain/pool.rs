//! Material offered to players in the creation phases.
//!
//! Pools are sampled on demand and never stored: two calls may offer
//! different material. Sampling goes through the injected RNG so tests and
//! replays see the same offer.

use std::sync::Arc;

use doodlefest_core::rng::{DeterministicRng, shuffle};
use serde::{Deserialize, Serialize};

use super::bank::Banks;
use super::content::{BankKind, ContentItem};
use super::player::PlayerId;

/// How much material each creation phase offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLimits {
    /// Drawings offered when making a meme.
    pub meme_drawings: usize,
    /// Drawings offered when making a comic.
    pub comic_drawings: usize,
    /// Captions offered in either creation phase.
    pub captions: usize,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            meme_drawings: 3,
            comic_drawings: 10,
            captions: 20,
        }
    }
}

/// Drawings and captions a player may pick from.
#[derive(Debug, Clone, Default)]
pub struct CreationPool {
    /// Offered drawings.
    pub drawings: Vec<Arc<ContentItem>>,
    /// Offered captions.
    pub captions: Vec<Arc<ContentItem>>,
}

/// Offer for the meme phase: a few drawings from the whole bank (own
/// drawings included) and a shuffled slice of captions.
pub fn meme_pool(banks: &Banks, limits: PoolLimits, rng: &mut dyn DeterministicRng) -> CreationPool {
    let mut drawings = banks.get(BankKind::Drawing).all();
    shuffle(&mut drawings, rng);
    drawings.truncate(limits.meme_drawings);

    let mut captions = banks.get(BankKind::Caption).all();
    shuffle(&mut captions, rng);
    captions.truncate(limits.captions);

    CreationPool { drawings, captions }
}

/// Offer for the comic phase. Other players' drawings only, when
/// `exclude_own` is set; a random third of the captions is held back for
/// variety before the rest is capped.
pub fn comic_pool(
    banks: &Banks,
    viewer: PlayerId,
    exclude_own: bool,
    limits: PoolLimits,
    rng: &mut dyn DeterministicRng,
) -> CreationPool {
    let drawing_bank = banks.get(BankKind::Drawing);
    let mut drawings = if exclude_own {
        drawing_bank.excluding_owner(viewer)
    } else {
        drawing_bank.all()
    };
    shuffle(&mut drawings, rng);
    drawings.truncate(limits.comic_drawings);

    let mut captions = banks.get(BankKind::Caption).all();
    shuffle(&mut captions, rng);
    let held_back = captions.len() / 3;
    let captions = captions
        .into_iter()
        .skip(held_back)
        .take(limits.captions)
        .collect();

    CreationPool { drawings, captions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::{ImagePayload, ItemId, Payload};
    use doodlefest_test_support::{FixedClock, MockRng, SequenceRng, fake_png, fixed_now};

    fn seeded_banks(me: PlayerId, you: PlayerId) -> Banks {
        let clock = FixedClock(fixed_now());
        let mut banks = Banks::default();
        for (tag, owner) in [(1, me), (2, you), (3, me), (4, you), (5, you)] {
            banks
                .get_mut(BankKind::Drawing)
                .submit(
                    owner,
                    Payload::Drawing(ImagePayload {
                        bytes: fake_png(tag),
                        width: 64,
                        height: 64,
                    }),
                    &clock,
                )
                .unwrap();
        }
        for n in 0..6 {
            banks
                .get_mut(BankKind::Caption)
                .submit(you, Payload::Caption(format!("caption {n}")), &clock)
                .unwrap();
        }
        banks
    }

    fn ids(items: &[Arc<ContentItem>]) -> Vec<u64> {
        items.iter().map(|item| item.id.0).collect()
    }

    #[test]
    fn test_meme_pool_caps_drawings_and_keeps_own() {
        let me = PlayerId::generate();
        let banks = seeded_banks(me, PlayerId::generate());

        let pool = meme_pool(&banks, PoolLimits::default(), &mut MockRng);

        assert_eq!(ids(&pool.drawings), vec![1, 2, 3]);
        assert_eq!(pool.captions.len(), 6);
    }

    #[test]
    fn test_comic_pool_excludes_own_drawings_and_holds_back_a_third() {
        let me = PlayerId::generate();
        let banks = seeded_banks(me, PlayerId::generate());

        let pool = comic_pool(&banks, me, true, PoolLimits::default(), &mut MockRng);

        assert_eq!(ids(&pool.drawings), vec![2, 4, 5]);
        assert!(pool.drawings.iter().all(|item| item.owner_id != me));
        assert_eq!(ids(&pool.captions), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_comic_pool_in_solo_offers_own_drawings() {
        let me = PlayerId::generate();
        let banks = seeded_banks(me, PlayerId::generate());

        let pool = comic_pool(&banks, me, false, PoolLimits::default(), &mut MockRng);

        assert_eq!(pool.drawings.len(), 5);
    }

    #[test]
    fn test_pool_order_follows_rng() {
        let me = PlayerId::generate();
        let banks = seeded_banks(me, PlayerId::generate());
        let limits = PoolLimits {
            meme_drawings: 2,
            comic_drawings: 10,
            captions: 0,
        };
        // Five drawings: swaps at i=0..3, then six captions: i=0..4.
        let mut rng = SequenceRng::new(vec![4, 1, 2, 3, 0, 1, 2, 3, 4]);

        let pool = meme_pool(&banks, limits, &mut rng);

        assert_eq!(ids(&pool.drawings), vec![5, 2]);
        assert!(pool.captions.is_empty());
        assert_eq!(rng.drawn(), 9);
        assert!(banks.get(BankKind::Drawing).contains(ItemId(5)));
    }
}
