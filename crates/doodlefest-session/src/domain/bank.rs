//! Append-only content banks.

use std::collections::HashMap;
use std::sync::Arc;

use doodlefest_core::clock::Clock;
use doodlefest_core::error::DomainError;
use tracing::{debug, warn};

use super::content::{BankKind, ContentItem, DedupPolicy, ItemId, Payload};
use super::player::PlayerId;

/// Result of a submission that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new item was stored under this id.
    Stored(ItemId),
    /// The bank already held identical text; nothing was stored.
    DuplicateIgnored(ItemId),
}

impl SubmitOutcome {
    /// The id of the stored or matching item.
    #[must_use]
    pub fn id(self) -> ItemId {
        match self {
            Self::Stored(id) | Self::DuplicateIgnored(id) => id,
        }
    }
}

/// Append-only store for one kind of content.
///
/// Items are held as shared immutable handles, so a snapshot is a cheap copy
/// of handles and can never observe a half-written item.
#[derive(Debug)]
pub struct ContentBank {
    kind: BankKind,
    items: Vec<Arc<ContentItem>>,
    by_id: HashMap<ItemId, usize>,
    next_id: u64,
}

impl ContentBank {
    /// Creates an empty bank for `kind`.
    #[must_use]
    pub fn new(kind: BankKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            by_id: HashMap::new(),
            next_id: 1,
        }
    }

    /// Validates and stores a submission.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the payload is for another bank
    /// or fails its shape rules. Nothing is stored in that case.
    pub fn submit(
        &mut self,
        owner_id: PlayerId,
        payload: Payload,
        clock: &dyn Clock,
    ) -> Result<SubmitOutcome, DomainError> {
        if payload.kind() != self.kind {
            return Err(DomainError::Validation(format!(
                "{} payload submitted to the {} bank",
                payload.kind(),
                self.kind
            )));
        }
        let payload = payload.normalized()?;

        if self.kind.dedup_policy() == DedupPolicy::ExactText {
            if let Some(existing) = self.find_text(payload.dedup_text()) {
                warn!(bank = %self.kind, item_id = existing.0, "duplicate text ignored");
                return Ok(SubmitOutcome::DuplicateIgnored(existing));
            }
        }

        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.by_id.insert(id, self.items.len());
        self.items.push(Arc::new(ContentItem {
            id,
            owner_id,
            payload,
            submitted_at: clock.now(),
        }));
        debug!(bank = %self.kind, item_id = id.0, owner = %owner_id, "content stored");
        Ok(SubmitOutcome::Stored(id))
    }

    fn find_text(&self, text: Option<&str>) -> Option<ItemId> {
        let text = text?;
        self.items
            .iter()
            .find(|item| item.payload.dedup_text() == Some(text))
            .map(|item| item.id)
    }

    /// Looks an item up by id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the bank has no such item.
    pub fn get(&self, id: ItemId) -> Result<Arc<ContentItem>, DomainError> {
        self.by_id
            .get(&id)
            .map(|&index| Arc::clone(&self.items[index]))
            .ok_or(DomainError::NotFound(id.0))
    }

    /// Whether an item with this id exists.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Point-in-time snapshot in submission order.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<ContentItem>> {
        self.items.clone()
    }

    /// Snapshot of items not owned by `player`, in submission order.
    #[must_use]
    pub fn excluding_owner(&self, player: PlayerId) -> Vec<Arc<ContentItem>> {
        self.items
            .iter()
            .filter(|item| item.owner_id != player)
            .cloned()
            .collect()
    }

    /// Snapshot of items owned by `player`, in submission order.
    #[must_use]
    pub fn owned_by(&self, player: PlayerId) -> Vec<Arc<ContentItem>> {
        self.items
            .iter()
            .filter(|item| item.owner_id == player)
            .cloned()
            .collect()
    }

    /// Number of stored items.
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Whether the bank is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Empties the bank and restarts id assignment. Full session reset only.
    pub fn clear(&mut self) {
        self.items.clear();
        self.by_id.clear();
        self.next_id = 1;
    }
}

/// One bank per [`BankKind`].
#[derive(Debug)]
pub struct Banks {
    drawings: ContentBank,
    captions: ContentBank,
    memes: ContentBank,
    comics: ContentBank,
}

impl Default for Banks {
    fn default() -> Self {
        Self {
            drawings: ContentBank::new(BankKind::Drawing),
            captions: ContentBank::new(BankKind::Caption),
            memes: ContentBank::new(BankKind::Meme),
            comics: ContentBank::new(BankKind::Comic),
        }
    }
}

impl Banks {
    /// The bank for `kind`.
    #[must_use]
    pub fn get(&self, kind: BankKind) -> &ContentBank {
        match kind {
            BankKind::Drawing => &self.drawings,
            BankKind::Caption => &self.captions,
            BankKind::Meme => &self.memes,
            BankKind::Comic => &self.comics,
        }
    }

    /// Mutable access to the bank for `kind`.
    pub fn get_mut(&mut self, kind: BankKind) -> &mut ContentBank {
        match kind {
            BankKind::Drawing => &mut self.drawings,
            BankKind::Caption => &mut self.captions,
            BankKind::Meme => &mut self.memes,
            BankKind::Comic => &mut self.comics,
        }
    }

    /// Empties every bank.
    pub fn clear(&mut self) {
        for kind in BankKind::ALL {
            self.get_mut(kind).clear();
        }
    }
}
