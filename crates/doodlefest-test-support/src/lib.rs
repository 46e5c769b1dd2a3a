//! Shared test doubles and fixtures for the Doodlefest coordinator.

mod clock;
mod fixtures;
mod rng;

pub use clock::{FixedClock, ManualClock, fixed_now};
pub use fixtures::{fake_png, player_ids};
pub use rng::{MockRng, SequenceRng};
