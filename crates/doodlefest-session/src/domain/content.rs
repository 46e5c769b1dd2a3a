//! Content items and their payloads.
//!
//! A payload is a closed set of shapes. The comic shape is fixed at four
//! panel slots by its type; the only way to build one from a list is the
//! validating `TryFrom`.

use std::fmt;

use chrono::{DateTime, Utc};
use doodlefest_core::error::DomainError;
use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// Number of panel slots in every comic.
pub const COMIC_PANEL_COUNT: usize = 4;

/// Longest caption accepted, in characters.
pub const CAPTION_CHAR_LIMIT: usize = 150;

/// Identifier of an item, unique within its bank. Assigned in submission
/// order starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kinds of content a session collects, one bank each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankKind {
    /// Freehand drawings from the draw rounds.
    Drawing,
    /// Caption text from the caption rounds.
    Caption,
    /// A drawing paired with a caption.
    Meme,
    /// Four panels of drawings and captions.
    Comic,
}

impl BankKind {
    /// Every bank kind, in a fixed order.
    pub const ALL: [Self; 4] = [Self::Drawing, Self::Caption, Self::Meme, Self::Comic];

    /// Duplicate handling for this kind of bank.
    #[must_use]
    pub fn dedup_policy(self) -> DedupPolicy {
        match self {
            Self::Caption => DedupPolicy::ExactText,
            Self::Drawing | Self::Meme | Self::Comic => DedupPolicy::Never,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drawing => "drawing",
            Self::Caption => "caption",
            Self::Meme => "meme",
            Self::Comic => "comic",
        }
    }
}

impl fmt::Display for BankKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a bank treats a submission equal to one it already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Identical text (case-sensitive) is ignored and the stored id returned.
    ExactText,
    /// Every submission is stored, even if it looks identical.
    Never,
}

/// An encoded image as produced by the drawing canvas. The bytes are opaque
/// here; decoding is the presentation layer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A drawing from the drawing bank with a chosen caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemePayload {
    /// Drawing bank reference.
    pub drawing: ItemId,
    /// Caption text.
    pub caption: String,
}

/// One filled comic panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicPanel {
    /// Drawing bank reference.
    pub drawing: ItemId,
    /// Optional caption under the drawing.
    pub caption: Option<String>,
}

/// A comic: exactly [`COMIC_PANEL_COUNT`] slots, each possibly unfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<Option<ComicPanel>>",
    into = "Vec<Option<ComicPanel>>"
)]
pub struct ComicStrip {
    panels: [Option<ComicPanel>; COMIC_PANEL_COUNT],
}

impl ComicStrip {
    /// Builds a strip from exactly four slots.
    #[must_use]
    pub fn new(panels: [Option<ComicPanel>; COMIC_PANEL_COUNT]) -> Self {
        Self { panels }
    }

    /// Number of filled slots.
    #[must_use]
    pub fn filled_count(&self) -> usize {
        self.panels.iter().flatten().count()
    }
}

impl TryFrom<Vec<Option<ComicPanel>>> for ComicStrip {
    type Error = DomainError;

    fn try_from(panels: Vec<Option<ComicPanel>>) -> Result<Self, Self::Error> {
        let count = panels.len();
        let panels: [Option<ComicPanel>; COMIC_PANEL_COUNT] =
            panels.try_into().map_err(|_| {
                DomainError::Validation(format!(
                    "comic must have exactly {COMIC_PANEL_COUNT} panels, got {count}"
                ))
            })?;
        Ok(Self { panels })
    }
}

impl From<ComicStrip> for Vec<Option<ComicPanel>> {
    fn from(strip: ComicStrip) -> Self {
        strip.panels.into()
    }
}

/// What a player submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// A drawing.
    Drawing(ImagePayload),
    /// Caption text.
    Caption(String),
    /// A meme.
    Meme(MemePayload),
    /// A comic.
    Comic(ComicStrip),
}

impl Payload {
    /// The bank this payload belongs in.
    #[must_use]
    pub fn kind(&self) -> BankKind {
        match self {
            Self::Drawing(_) => BankKind::Drawing,
            Self::Caption(_) => BankKind::Caption,
            Self::Meme(_) => BankKind::Meme,
            Self::Comic(_) => BankKind::Comic,
        }
    }

    /// Drawing bank items this payload points at.
    #[must_use]
    pub fn drawing_refs(&self) -> Vec<ItemId> {
        match self {
            Self::Meme(meme) => vec![meme.drawing],
            Self::Comic(strip) => strip.panels.iter().flatten().map(|p| p.drawing).collect(),
            Self::Drawing(_) | Self::Caption(_) => Vec::new(),
        }
    }

    /// Checks the shape rules that need nothing but the payload itself and
    /// returns the payload in stored form (caption text trimmed).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` describing the first violated rule.
    pub fn normalized(self) -> Result<Self, DomainError> {
        match self {
            Self::Drawing(image) => {
                if image.width == 0 || image.height == 0 {
                    return Err(DomainError::Validation(format!(
                        "drawing must have non-zero size, got {}x{}",
                        image.width, image.height
                    )));
                }
                if image.bytes.is_empty() {
                    return Err(DomainError::Validation("drawing has no image data".to_owned()));
                }
                Ok(Self::Drawing(image))
            }
            Self::Caption(text) => Ok(Self::Caption(checked_caption(&text)?)),
            Self::Meme(meme) => Ok(Self::Meme(MemePayload {
                drawing: meme.drawing,
                caption: checked_caption(&meme.caption)?,
            })),
            Self::Comic(strip) => {
                if strip.filled_count() == 0 {
                    return Err(DomainError::Validation(
                        "comic needs at least one filled panel".to_owned(),
                    ));
                }
                Ok(Self::Comic(strip))
            }
        }
    }

    /// The text compared for de-duplication, if this payload is text.
    #[must_use]
    pub fn dedup_text(&self) -> Option<&str> {
        match self {
            Self::Caption(text) => Some(text),
            _ => None,
        }
    }
}

fn checked_caption(text: &str) -> Result<String, DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation("caption is empty".to_owned()));
    }
    let chars = trimmed.chars().count();
    if chars > CAPTION_CHAR_LIMIT {
        return Err(DomainError::Validation(format!(
            "caption is {chars} characters, limit is {CAPTION_CHAR_LIMIT}"
        )));
    }
    Ok(trimmed.to_owned())
}

/// A stored submission. Never mutated after it enters a bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    /// Identifier within the bank.
    pub id: ItemId,
    /// Who submitted it.
    pub owner_id: PlayerId,
    /// The submitted content.
    pub payload: Payload,
    /// When the bank accepted it.
    pub submitted_at: DateTime<Utc>,
}
