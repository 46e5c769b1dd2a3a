//! Shared helpers for host integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use doodlefest_core::clock::Clock;
use doodlefest_host::config::HostConfig;
use doodlefest_host::registry::SessionRegistry;
use doodlefest_session::domain::content::{
    COMIC_PANEL_COUNT, ComicPanel, ComicStrip, ImagePayload, ItemId, MemePayload, Payload,
};
use doodlefest_session::domain::controller::SessionConfig;
use doodlefest_session::domain::events::SessionEvent;
use doodlefest_test_support::{ManualClock, fake_png};
use tokio::sync::broadcast;

/// A registry on a manual clock with a one-drawing quota and a seeded RNG.
pub fn build_test_registry(clock: Arc<ManualClock>) -> SessionRegistry {
    let config = HostConfig {
        session: SessionConfig::new(1, 60).unwrap(),
        rng_seed: Some(7),
        ..HostConfig::default()
    };
    let clock: Arc<dyn Clock + Send + Sync> = clock;
    SessionRegistry::new(config, clock)
}

pub fn drawing(tag: u8) -> Payload {
    Payload::Drawing(ImagePayload {
        bytes: fake_png(tag),
        width: 32,
        height: 32,
    })
}

pub fn caption(text: &str) -> Payload {
    Payload::Caption(text.to_owned())
}

pub fn meme(drawing: ItemId, caption: &str) -> Payload {
    Payload::Meme(MemePayload {
        drawing,
        caption: caption.to_owned(),
    })
}

/// A comic with `drawings` in the leading panels and the rest empty.
pub fn comic(drawings: &[ItemId]) -> Payload {
    let mut panels: [Option<ComicPanel>; COMIC_PANEL_COUNT] = Default::default();
    for (slot, drawing) in panels.iter_mut().zip(drawings) {
        *slot = Some(ComicPanel {
            drawing: *drawing,
            caption: None,
        });
    }
    Payload::Comic(ComicStrip::new(panels))
}

/// Everything already published on `events`.
pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
