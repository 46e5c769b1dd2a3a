//! Domain model for the session context.

pub mod bank;
pub mod commands;
pub mod content;
pub mod controller;
pub mod events;
pub mod phase;
pub mod player;
pub mod pool;
pub mod quota;
pub mod timer;
pub mod votes;
