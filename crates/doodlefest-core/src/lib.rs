//! Doodlefest core: shared abstractions.
//!
//! This crate defines the traits and types the session context and the host
//! depend on: time, randomness, commands, events and the domain error. It
//! contains no game rules.

pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod rng;
