//! Committer: read the surface back into document items.
//!
//! DESIGN
//! ======
//! A commit request never writes. It builds a draft, compares it with the
//! latest known document, and on a real difference raises the frame flag.
//! The write happens on the next [`PageScene::on_frame`], which rebuilds the
//! draft so several requests inside one frame coalesce into one up-to-date
//! write. Live text edits arm a debounce deadline instead; leaving edit mode
//! cancels it and requests a commit straight away.
//!
//! Nothing here runs while the hydration fence is engaged.

#[cfg(test)]
#[path = "commit_test.rs"]
mod commit_test;

use std::collections::HashMap;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::equality::items_equal;
use crate::item::{DocumentItem, ItemId, ItemKind};
use crate::scene::{Action, PageScene};
use crate::surface::Surface;
use crate::translate::{normalize_text_scale, to_document_item};

/// What asked for a commit. Used for logging and debounce handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTrigger {
    /// Drag, resize, or rotate released.
    Modified,
    /// Text edit mode left.
    EditingExited,
    /// No keystrokes for the debounce period.
    DebounceElapsed,
    /// An object was deleted on the surface.
    Removed,
    /// A drop or paste created an item.
    Ingested,
    /// A dropped image adopted its decoded size.
    Resized,
}

/// Frame flag and debounce deadline.
#[derive(Debug, Default)]
pub struct CommitScheduler {
    frame_pending: bool,
    debounce_deadline: Option<Instant>,
}

impl CommitScheduler {
    pub fn schedule_frame(&mut self) {
        self.frame_pending = true;
    }

    /// Clear and return the frame flag.
    pub fn take_frame(&mut self) -> bool {
        std::mem::take(&mut self.frame_pending)
    }

    #[must_use]
    pub fn is_frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Push the debounce deadline out to `deadline`.
    pub fn arm_debounce(&mut self, deadline: Instant) {
        self.debounce_deadline = Some(deadline);
    }

    pub fn cancel_debounce(&mut self) {
        self.debounce_deadline = None;
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.debounce_deadline
    }

    /// Clear the deadline and return `true` if it has passed at `now`.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.debounce_deadline {
            Some(deadline) if deadline <= now => {
                self.debounce_deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Order `draft` so ids known in `previous` keep their relative order and
/// new ids follow in the order they appear in `draft`.
#[must_use]
pub fn stabilize_order(draft: Vec<DocumentItem>, previous: &[DocumentItem]) -> Vec<DocumentItem> {
    let rank: HashMap<&ItemId, usize> = previous.iter().enumerate().map(|(i, item)| (&item.id, i)).collect();
    let (mut known, fresh): (Vec<DocumentItem>, Vec<DocumentItem>) =
        draft.into_iter().partition(|item| rank.contains_key(&item.id));
    known.sort_by_key(|item| rank.get(&item.id).copied().unwrap_or(usize::MAX));
    known.extend(fresh);
    known
}

impl<S: Surface> PageScene<S> {
    /// Schedule a write if the surface differs from the latest document.
    pub fn request_commit(&mut self, trigger: CommitTrigger) {
        if self.fence.is_fenced() {
            trace!(?trigger, "commit suppressed by fence");
            return;
        }
        if trigger == CommitTrigger::EditingExited {
            self.scheduler.cancel_debounce();
        }
        let draft = self.build_draft();
        if items_equal(&draft, &self.document) {
            trace!(?trigger, "surface matches document; nothing to commit");
            return;
        }
        trace!(?trigger, "commit scheduled for next frame");
        self.scheduler.schedule_frame();
    }

    /// A keystroke landed; commit once typing pauses.
    pub fn schedule_text_commit(&mut self, now: Instant) {
        if self.fence.is_fenced() {
            trace!("text commit suppressed by fence");
            return;
        }
        self.scheduler.arm_debounce(now + self.config.text_debounce);
    }

    /// Commit if the typing pause has elapsed at `now`.
    pub fn on_debounce_elapsed(&mut self, now: Instant) {
        if self.scheduler.take_due(now) {
            self.request_commit(CommitTrigger::DebounceElapsed);
        }
    }

    /// Frame boundary: perform the pending write, if any.
    pub fn on_frame(&mut self) -> Option<Action> {
        if self.fence.is_fenced() || !self.scheduler.take_frame() {
            return None;
        }
        let draft = self.build_draft();
        if items_equal(&draft, &self.document) {
            trace!("pending commit became a no-op");
            return None;
        }
        debug!(page_id = %self.page_id, items = draft.len(), "items changed");
        self.document.clone_from(&draft);
        Some(Action::ItemsChanged { page_id: self.page_id.clone(), items: draft })
    }

    /// Write out a scheduled commit or pending typing right away. Returns the
    /// document the edits were made against along with the write.
    pub(crate) fn take_unsaved_edits(&mut self) -> Option<(Vec<DocumentItem>, Action)> {
        if self.fence.is_fenced() {
            return None;
        }
        if !self.scheduler.is_frame_pending() && self.scheduler.deadline().is_none() {
            return None;
        }
        let previous = self.document.clone();
        self.scheduler.cancel_debounce();
        self.scheduler.schedule_frame();
        let action = self.on_frame()?;
        Some((previous, action))
    }

    /// Settle everything outstanding now: queued events, a pending debounce,
    /// and the frame write.
    pub fn flush(&mut self, now: Instant) -> Vec<Action> {
        let mut actions = self.process_surface_events(now);
        if self.scheduler.deadline().is_some() {
            self.scheduler.cancel_debounce();
            self.request_commit(CommitTrigger::DebounceElapsed);
        }
        actions.extend(self.on_frame());
        actions
    }

    /// Translate the surface into a stabilized item list.
    pub(crate) fn build_draft(&mut self) -> Vec<DocumentItem> {
        self.fenced(|scene| {
            for handle in scene.surface.paint_order() {
                normalize_text_scale(&mut scene.surface, handle);
            }
        });

        let mut draft = Vec::with_capacity(self.index.len());
        for handle in self.surface.paint_order() {
            let Some(id) = self.index.id_for(handle) else {
                continue;
            };
            let (Some(object), Some(entry)) = (self.surface.object(handle), self.index.get(id)) else {
                continue;
            };
            let src = match entry.kind {
                ItemKind::Image => entry.src.clone(),
                ItemKind::Text => None,
            };
            draft.push(to_document_item(id.clone(), src, object));
        }
        stabilize_order(draft, &self.document)
    }
}
