//! Several isolated sessions in one process.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use doodlefest_core::clock::Clock;
use doodlefest_core::error::DomainError;
use doodlefest_core::rng::{DeterministicRng, StdRandom};
use doodlefest_session::domain::controller::{PhaseController, Vantage};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::config::HostConfig;
use crate::host::SessionHost;
use crate::timer::spawn_caption_ticker;

struct Entry {
    host: Arc<SessionHost>,
    ticker: Option<JoinHandle<()>>,
}

/// Owns every hosted session. Sessions share nothing but the clock.
pub struct SessionRegistry {
    config: HostConfig,
    clock: Arc<dyn Clock + Send + Sync>,
    sessions: RwLock<HashMap<Uuid, Entry>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: HostConfig, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            config,
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn rng_for(&self, session_id: Uuid) -> Box<dyn DeterministicRng> {
        match self.config.rng_seed {
            // Per-session stream derived from the configured seed.
            Some(seed) => Box::new(StdRandom::seeded(seed ^ session_id.as_u64_pair().0)),
            None => Box::new(StdRandom::from_os()),
        }
    }

    /// Creates a session seen from `vantage`. When `run_ticker` is set a
    /// caption ticker task is spawned, which requires a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the registry lock is poisoned.
    pub fn create(&self, vantage: Vantage, run_ticker: bool) -> Result<Arc<SessionHost>, DomainError> {
        let session_id = Uuid::new_v4();
        let controller = PhaseController::new(session_id, vantage, self.config.session);
        let host = Arc::new(SessionHost::new(
            controller,
            Arc::clone(&self.clock),
            self.rng_for(session_id),
            self.config.event_buffer,
        ));
        let ticker = run_ticker
            .then(|| spawn_caption_ticker(Arc::downgrade(&host), self.config.tick_interval));

        self.sessions
            .write()
            .map_err(|_| DomainError::Infrastructure("registry lock poisoned".to_owned()))?
            .insert(
                session_id,
                Entry {
                    host: Arc::clone(&host),
                    ticker,
                },
            );
        info!(%session_id, ?vantage, "session created");
        Ok(host)
    }

    /// Looks a session up.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` for an unknown id.
    pub fn get(&self, session_id: Uuid) -> Result<Arc<SessionHost>, DomainError> {
        self.sessions
            .read()
            .map_err(|_| DomainError::Infrastructure("registry lock poisoned".to_owned()))?
            .get(&session_id)
            .map(|entry| Arc::clone(&entry.host))
            .ok_or(DomainError::SessionNotFound(session_id))
    }

    /// Stops hosting a session and its ticker.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` for an unknown id.
    pub fn remove(&self, session_id: Uuid) -> Result<(), DomainError> {
        let entry = self
            .sessions
            .write()
            .map_err(|_| DomainError::Infrastructure("registry lock poisoned".to_owned()))?
            .remove(&session_id)
            .ok_or(DomainError::SessionNotFound(session_id))?;
        if let Some(ticker) = entry.ticker {
            ticker.abort();
        }
        info!(%session_id, "session removed");
        Ok(())
    }

    /// Ids of every hosted session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the registry lock is poisoned.
    pub fn session_ids(&self) -> Result<Vec<Uuid>, DomainError> {
        Ok(self
            .sessions
            .read()
            .map_err(|_| DomainError::Infrastructure("registry lock poisoned".to_owned()))?
            .keys()
            .copied()
            .collect())
    }
}
