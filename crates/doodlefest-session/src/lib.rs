//! Doodlefest session phase coordinator.
//!
//! Responsible for the shared state of one party-game session: the roster,
//! the append-only content banks, per-round submission quotas, vote tallies,
//! and the ordered phase sequence that ties them together.

pub mod application;
pub mod domain;
