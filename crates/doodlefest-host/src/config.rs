//! Host configuration read from the environment.

use std::time::Duration;

use doodlefest_session::domain::controller::{DEFAULT_CAPTION_SECS, SessionConfig};
use doodlefest_session::domain::quota::Quota;

use crate::error::AppError;

/// Drawings per player per draw round.
pub const DRAWING_QUOTA_VAR: &str = "DOODLEFEST_DRAWING_QUOTA";
/// Caption countdown length in seconds.
pub const CAPTION_SECONDS_VAR: &str = "DOODLEFEST_CAPTION_SECONDS";
/// Caption countdown polling interval in milliseconds.
pub const TICK_MILLIS_VAR: &str = "DOODLEFEST_TICK_MILLIS";
/// Capacity of each session's notification channel.
pub const EVENT_BUFFER_VAR: &str = "DOODLEFEST_EVENT_BUFFER";
/// Seed for creation-pool sampling; unset means seeded from the OS.
pub const RNG_SEED_VAR: &str = "DOODLEFEST_RNG_SEED";

const DEFAULT_TICK_MILLIS: u64 = 250;
const DEFAULT_EVENT_BUFFER: usize = 256;

/// Everything the host needs to run sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    /// Per-session tunables.
    pub session: SessionConfig,
    /// How often the caption ticker wakes when no deadline is nearer.
    pub tick_interval: Duration,
    /// Notification channel capacity; slow subscribers lag past it.
    pub event_buffer: usize,
    /// Fixed seed for creation-pool sampling.
    pub rng_seed: Option<u64>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MILLIS),
            event_buffer: DEFAULT_EVENT_BUFFER,
            rng_seed: None,
        }
    }
}

impl HostConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for
    /// unset variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let drawing_quota: u32 = parse_or(&lookup, DRAWING_QUOTA_VAR, Quota::DEFAULT_DRAWINGS.get())?;
        let caption_secs: i64 = parse_or(&lookup, CAPTION_SECONDS_VAR, DEFAULT_CAPTION_SECS)?;
        let tick_millis: u64 = parse_or(&lookup, TICK_MILLIS_VAR, DEFAULT_TICK_MILLIS)?;
        let event_buffer: usize = parse_or(&lookup, EVENT_BUFFER_VAR, DEFAULT_EVENT_BUFFER)?;
        let rng_seed = lookup(RNG_SEED_VAR)
            .map(|raw| {
                raw.parse::<u64>()
                    .map_err(|e| AppError::Config(format!("{RNG_SEED_VAR} must be a valid u64: {e}")))
            })
            .transpose()?;

        if tick_millis == 0 {
            return Err(AppError::Config(format!("{TICK_MILLIS_VAR} must be at least 1")));
        }
        if event_buffer == 0 {
            return Err(AppError::Config(format!("{EVENT_BUFFER_VAR} must be at least 1")));
        }
        let session = SessionConfig::new(drawing_quota, caption_secs)
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            session,
            tick_interval: Duration::from_millis(tick_millis),
            event_buffer,
            rng_seed,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid number: {e}"))),
    }
}
