//! Background task that drives the caption countdown.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::host::SessionHost;

/// Spawns a task that ticks `host` at least every `interval` and right at the
/// caption deadline. The task ends once the host is dropped or its lock is
/// poisoned.
pub fn spawn_caption_ticker(host: Weak<SessionHost>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = {
                let Some(host) = host.upgrade() else { break };
                match host.caption_time_remaining() {
                    Ok(remaining) => remaining
                        .and_then(|left| left.to_std().ok())
                        .filter(|left| !left.is_zero())
                        .map_or(interval, |left| left.min(interval)),
                    Err(err) => {
                        host.report(&err);
                        break;
                    }
                }
            };
            tokio::time::sleep(wait).await;

            let Some(host) = host.upgrade() else { break };
            if let Err(err) = host.tick() {
                host.report(&err);
                break;
            }
        }
        debug!("caption ticker stopped");
    })
}
