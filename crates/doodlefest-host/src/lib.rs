//! Doodlefest host: runs session coordinators in-process.
//!
//! Each session lives behind a single-writer lock, publishes its events on a
//! broadcast channel, and has its caption countdown driven by a tokio task.

pub mod config;
pub mod error;
pub mod host;
pub mod protocol;
pub mod registry;
pub mod timer;
