use std::collections::BTreeMap;

use snafu::Snafu;

use crate::ids::{EntryId, IdAllocator};
use crate::message::{Entry, Message};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TranscriptError {
    #[snafu(display("typing placeholder {existing} is still outstanding"))]
    PlaceholderOutstanding {
        stage: &'static str,
        existing: EntryId,
    },
}

pub type TranscriptResult<T> = Result<T, TranscriptError>;

/// Append-only, ordered record of the conversation.
///
/// Entries are keyed by monotonically increasing ids, so iteration order is
/// append order and removal by handle never scans. The welcome banner is shown
/// until the first message lands and never comes back.
#[derive(Debug)]
pub struct Transcript {
    entries: BTreeMap<EntryId, Entry>,
    ids: IdAllocator,
    placeholder: Option<EntryId>,
    welcome_visible: bool,
    scroll_pending: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            ids: IdAllocator::new(),
            placeholder: None,
            welcome_visible: true,
            scroll_pending: false,
        }
    }

    pub fn append(&mut self, message: Message) -> EntryId {
        let id = self.ids.next_entry();
        tracing::debug!(entry = %id, role = ?message.role, "appending transcript message");
        self.entries.insert(id, Entry::Message(message));
        self.dismiss_welcome();
        self.scroll_pending = true;
        id
    }

    pub fn append_placeholder(&mut self) -> TranscriptResult<EntryId> {
        if let Some(existing) = self.placeholder {
            return PlaceholderOutstandingSnafu {
                stage: "append-placeholder",
                existing,
            }
            .fail();
        }

        let id = self.ids.next_entry();
        self.entries.insert(id, Entry::Typing);
        self.placeholder = Some(id);
        self.scroll_pending = true;
        Ok(id)
    }

    /// Removes one entry. Returns `false` when the handle is already gone.
    pub fn remove(&mut self, id: EntryId) -> bool {
        if self.placeholder == Some(id) {
            self.placeholder = None;
        }

        let removed = self.entries.remove(&id).is_some();
        if !removed {
            tracing::trace!(entry = %id, "ignoring removal of an entry that is already gone");
        }
        removed
    }

    pub fn entries(&self) -> impl Iterator<Item = (EntryId, &Entry)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.entries.values().filter_map(Entry::as_message)
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    pub fn placeholder(&self) -> Option<EntryId> {
        self.placeholder
    }

    pub fn welcome_visible(&self) -> bool {
        self.welcome_visible
    }

    /// Returns true once per append that has not yet been scrolled into view.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn dismiss_welcome(&mut self) {
        if self.welcome_visible {
            self.welcome_visible = false;
            tracing::debug!("welcome banner dismissed");
        }
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
