//! Transcript assembly.
//!
//! User and assistant transcripts arrive on independent, overlapping timelines,
//! so each role gets its own rolling buffer. Deltas are only buffered here; the
//! session manager owns the debounce timers and calls the flush methods when
//! they fire.
//!
//! Invariants:
//! - at most one non-final item per role exists at any time
//! - a final item is never modified again
//! - a role's buffer is only cleared by a successful flush for that role
//! - assistant deltas are withheld until some user item is final, so a reply
//!   never shows up above the question it answers

use time::OffsetDateTime;

use super::base::{TranscriptItem, TranscriptRole};

/// Outcome of a flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered
    Empty,
    /// Buffered text landed in the item with this id
    Flushed(u64),
    /// Withheld by the ordering gate; the buffer is kept
    Deferred,
}

/// Text waiting for the next flush.
#[derive(Debug, Clone, Default)]
pub struct PendingBuffer {
    pub user_delta: String,
    pub assistant_delta: String,
    /// Complete entries (typed input, notes) waiting for the next user flush
    pub pending_items: Vec<(TranscriptRole, String)>,
}

impl PendingBuffer {
    fn delta_mut(&mut self, role: TranscriptRole) -> Option<&mut String> {
        match role {
            TranscriptRole::User => Some(&mut self.user_delta),
            TranscriptRole::Assistant => Some(&mut self.assistant_delta),
            TranscriptRole::System | TranscriptRole::Tool => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_delta.is_empty() && self.assistant_delta.is_empty() && self.pending_items.is_empty()
    }
}

/// Append-only transcript log plus its pending buffers.
#[derive(Debug, Clone, Default)]
pub struct TranscriptAssembler {
    items: Vec<TranscriptItem>,
    buffer: PendingBuffer,
    next_id: u64,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[TranscriptItem] {
        &self.items
    }

    pub fn buffer(&self) -> &PendingBuffer {
        &self.buffer
    }

    /// Buffer a delta for `role`. Returns false when nothing was buffered.
    pub fn push_delta(&mut self, role: TranscriptRole, delta: &str) -> bool {
        if delta.is_empty() {
            return false;
        }
        match self.buffer.delta_mut(role) {
            Some(buf) => {
                buf.push_str(delta);
                true
            }
            None => {
                tracing::warn!(%role, "Ignoring transcript delta for non-speaking role");
                false
            }
        }
    }

    /// Queue a complete entry; it lands on the next user flush.
    pub fn queue_item(&mut self, role: TranscriptRole, text: impl Into<String>) {
        self.buffer.pending_items.push((role, text.into()));
    }

    /// Whether the transcript holds at least one final user item.
    pub fn has_final_user(&self) -> bool {
        self.items
            .iter()
            .any(|i| i.role == TranscriptRole::User && i.is_final)
    }

    /// Flush queued entries and the user delta buffer.
    ///
    /// Assistant deltas are deliberately left alone.
    pub fn flush_user(&mut self) -> FlushOutcome {
        let mut outcome = FlushOutcome::Empty;

        for (role, text) in std::mem::take(&mut self.buffer.pending_items) {
            let id = self.append(role, text, true);
            outcome = FlushOutcome::Flushed(id);
        }

        if self.buffer.user_delta.is_empty() {
            return outcome;
        }
        let delta = std::mem::take(&mut self.buffer.user_delta);
        FlushOutcome::Flushed(self.append_to_open(TranscriptRole::User, &delta))
    }

    /// Flush the assistant delta buffer.
    ///
    /// Without `force` the flush is deferred until a final user item exists.
    pub fn flush_assistant(&mut self, force: bool) -> FlushOutcome {
        if self.buffer.assistant_delta.is_empty() {
            return FlushOutcome::Empty;
        }
        if !force && !self.has_final_user() {
            return FlushOutcome::Deferred;
        }
        let delta = std::mem::take(&mut self.buffer.assistant_delta);
        FlushOutcome::Flushed(self.append_to_open(TranscriptRole::Assistant, &delta))
    }

    /// Apply an authoritative final text for `role`.
    ///
    /// Pending text for the role is flushed first, then the open item is
    /// overwritten and finalized. Returns the id of the finalized item.
    pub fn complete(&mut self, role: TranscriptRole, final_text: &str) -> u64 {
        match role {
            TranscriptRole::User => {
                self.flush_user();
            }
            TranscriptRole::Assistant => {
                self.flush_assistant(true);
            }
            TranscriptRole::System | TranscriptRole::Tool => {}
        }

        if let Some(item) = self.open_item_mut(role) {
            item.text = final_text.to_string();
            item.is_final = true;
            return item.id;
        }

        tracing::debug!(%role, "Completion without an open item, appending final entry");
        self.append(role, final_text.to_string(), true)
    }

    /// Text accumulated so far for `role`: the open item plus unflushed deltas.
    pub fn pending_text(&self, role: TranscriptRole) -> String {
        let mut text = self
            .items
            .iter()
            .rev()
            .find(|i| i.role == role && !i.is_final)
            .map(|i| i.text.clone())
            .unwrap_or_default();
        match role {
            TranscriptRole::User => text.push_str(&self.buffer.user_delta),
            TranscriptRole::Assistant => text.push_str(&self.buffer.assistant_delta),
            TranscriptRole::System | TranscriptRole::Tool => {}
        }
        text
    }

    /// Drop every item and all buffered text.
    pub fn clear(&mut self) {
        self.items.clear();
        self.buffer = PendingBuffer::default();
    }

    /// Drop buffered text but keep the log.
    pub fn clear_buffers(&mut self) {
        self.buffer = PendingBuffer::default();
    }

    fn open_item_mut(&mut self, role: TranscriptRole) -> Option<&mut TranscriptItem> {
        self.items
            .iter_mut()
            .rev()
            .find(|i| i.role == role && !i.is_final)
    }

    fn append_to_open(&mut self, role: TranscriptRole, delta: &str) -> u64 {
        if let Some(item) = self.open_item_mut(role) {
            item.text.push_str(delta);
            return item.id;
        }
        self.append(role, delta.to_string(), false)
    }

    fn append(&mut self, role: TranscriptRole, text: String, is_final: bool) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.items.push(TranscriptItem {
            id,
            role,
            text,
            is_final,
            timestamp: OffsetDateTime::now_utc(),
        });
        id
    }
}
