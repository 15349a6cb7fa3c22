//! Per-page scene: the surface, its side-table, and the reconciliation state.
//!
//! DESIGN
//! ======
//! A [`PageScene`] is a synchronous state machine. The host drives it with
//! document snapshots (`reconcile`), surface events (`process_surface_events`),
//! decode completions (`apply_decoded`), and frame ticks (`on_frame`). It
//! answers with [`Action`]s the host forwards to its collaborators. Nothing in
//! here awaits; the async driver lives in `session`.
//!
//! Item identity never rides on surface objects. The [`SceneIndex`] maps each
//! item id to the handle currently standing for it, plus what that object is
//! showing and which decode (if any) it is waiting on.
//!
//! Every programmatic surface mutation runs inside [`PageScene::fenced`]: user
//! events already queued are moved aside first, the fence is engaged, and the
//! events produced by the mutation itself are drained and dropped before the
//! fence is released.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashMap;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::commit::{CommitScheduler, CommitTrigger};
use crate::config::SceneConfig;
use crate::construct::DecodeRequest;
use crate::fence::HydrationFence;
use crate::item::{DocumentItem, ItemId, ItemKind, Orientation, PageId, PageSize};
use crate::surface::{ObjectHandle, Surface, SurfaceEvent};

// =============================================================================
// ACTIONS
// =============================================================================

/// Outputs for the host to process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    /// A user-driven change produced a new item list for the page.
    ItemsChanged { page_id: PageId, items: Vec<DocumentItem> },
    /// The user changed the active object directly on the surface.
    SelectionChanged { page_id: PageId, item_id: Option<ItemId> },
    /// An image resource could not be loaded; the item stays a placeholder.
    ImageLoadFailed { page_id: PageId, item_id: ItemId, message: String },
}

// =============================================================================
// SIDE-TABLE
// =============================================================================

/// What a tracked surface object is currently displaying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Text,
    Placeholder,
    /// A decoded bitmap of this source.
    Bitmap(String),
}

/// A decode the entry is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDecode {
    pub src: String,
    pub ticket: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneEntry {
    pub handle: ObjectHandle,
    pub kind: ItemKind,
    /// The resolved source the document wants, for image items.
    pub src: Option<String>,
    pub shown: Shown,
    pub pending: Option<PendingDecode>,
    /// Last source that failed to load; not retried until `src` changes.
    pub failed_src: Option<String>,
    /// Adopt the decoded natural size (fitted) instead of the stand-in size.
    pub fit_on_load: bool,
}

impl SceneEntry {
    #[must_use]
    pub fn new(handle: ObjectHandle, kind: ItemKind, src: Option<String>) -> Self {
        let shown = match kind {
            ItemKind::Text => Shown::Text,
            ItemKind::Image => Shown::Placeholder,
        };
        Self { handle, kind, src, shown, pending: None, failed_src: None, fit_on_load: false }
    }
}

/// Item id to surface handle, and back.
#[derive(Debug, Default)]
pub struct SceneIndex {
    entries: HashMap<ItemId, SceneEntry>,
    by_handle: HashMap<ObjectHandle, ItemId>,
}

impl SceneIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&SceneEntry> {
        self.entries.get(id)
    }

    /// Mutable access for bookkeeping. Use [`SceneIndex::rebind`] to change
    /// the handle so the reverse map stays in step.
    pub(crate) fn get_mut(&mut self, id: &ItemId) -> Option<&mut SceneEntry> {
        self.entries.get_mut(id)
    }

    #[must_use]
    pub fn handle_of(&self, id: &ItemId) -> Option<ObjectHandle> {
        self.entries.get(id).map(|entry| entry.handle)
    }

    #[must_use]
    pub fn id_for(&self, handle: ObjectHandle) -> Option<&ItemId> {
        self.by_handle.get(&handle)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.entries.keys()
    }

    /// Track `id`, replacing any previous entry for it.
    pub(crate) fn insert(&mut self, id: ItemId, entry: SceneEntry) {
        if let Some(previous) = self.entries.get(&id) {
            self.by_handle.remove(&previous.handle);
        }
        self.by_handle.insert(entry.handle, id.clone());
        self.entries.insert(id, entry);
    }

    pub(crate) fn remove(&mut self, id: &ItemId) -> Option<SceneEntry> {
        let entry = self.entries.remove(id)?;
        self.by_handle.remove(&entry.handle);
        Some(entry)
    }

    /// Point `id` at a replacement object.
    pub(crate) fn rebind(&mut self, id: &ItemId, handle: ObjectHandle) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        self.by_handle.remove(&entry.handle);
        entry.handle = handle;
        self.by_handle.insert(handle, id.clone());
    }
}

// =============================================================================
// SCENE
// =============================================================================

pub struct PageScene<S: Surface> {
    pub(crate) page_id: PageId,
    pub(crate) surface: S,
    pub(crate) config: SceneConfig,
    pub(crate) fence: HydrationFence,
    pub(crate) index: SceneIndex,
    /// Latest known document items for this page.
    pub(crate) document: Vec<DocumentItem>,
    pub(crate) scheduler: CommitScheduler,
    pub(crate) decode_requests: Vec<DecodeRequest>,
    pub(crate) next_ticket: u64,
    /// Selection last pushed to (or agreed with) the host.
    pub(crate) applied_selection: Option<ItemId>,
    /// Selection last reported to the host.
    pub(crate) reported_selection: Option<ItemId>,
    /// User events set aside while the fence was engaged.
    pub(crate) backlog: Vec<SurfaceEvent>,
    pub(crate) orientation: Orientation,
}

impl<S: Surface> PageScene<S> {
    /// Wrap `surface` for page `page_id`, sized for `orientation`.
    pub fn new(page_id: PageId, surface: S, orientation: Orientation, config: SceneConfig) -> Self {
        let mut scene = Self {
            page_id,
            surface,
            config,
            fence: HydrationFence::new(),
            index: SceneIndex::new(),
            document: Vec::new(),
            scheduler: CommitScheduler::default(),
            decode_requests: Vec::new(),
            next_ticket: 0,
            applied_selection: None,
            reported_selection: None,
            backlog: Vec::new(),
            orientation,
        };
        scene.fenced(|scene| {
            let size = PageSize::for_orientation(orientation);
            scene.surface.set_dimensions(size.width, size.height);
        });
        scene
    }

    // --- Accessors ---

    #[must_use]
    pub fn page_id(&self) -> &PageId {
        &self.page_id
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    #[must_use]
    pub fn fence(&self) -> &HydrationFence {
        &self.fence
    }

    #[must_use]
    pub fn index(&self) -> &SceneIndex {
        &self.index
    }

    /// The latest known document items.
    #[must_use]
    pub fn document(&self) -> &[DocumentItem] {
        &self.document
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn page_size(&self) -> PageSize {
        PageSize::for_orientation(self.orientation)
    }

    /// Item ids in surface paint order, bottom to top. Objects the scene does
    /// not track are skipped.
    #[must_use]
    pub fn paint_order_ids(&self) -> Vec<ItemId> {
        self.surface
            .paint_order()
            .into_iter()
            .filter_map(|handle| self.index.id_for(handle).cloned())
            .collect()
    }

    /// The single selected item, if the active object is a tracked one.
    #[must_use]
    pub fn selected_item(&self) -> Option<ItemId> {
        self.surface
            .active_object()
            .and_then(|handle| self.index.id_for(handle).cloned())
    }

    /// Drain decodes requested since the last call.
    pub fn take_decode_requests(&mut self) -> Vec<DecodeRequest> {
        std::mem::take(&mut self.decode_requests)
    }

    #[must_use]
    pub fn commit_pending(&self) -> bool {
        self.scheduler.is_frame_pending()
    }

    #[must_use]
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    // --- Host inputs ---

    /// Run user-side code against the surface, the way pointer and keyboard
    /// input would. Events it causes are picked up by the next
    /// [`PageScene::process_surface_events`].
    pub fn interact<R>(&mut self, f: impl FnOnce(&mut S, &SceneIndex) -> R) -> R {
        f(&mut self.surface, &self.index)
    }

    /// Resize the surface for a new orientation.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        if orientation == self.orientation {
            return;
        }
        self.orientation = orientation;
        self.fenced(|scene| {
            let size = PageSize::for_orientation(orientation);
            scene.surface.set_dimensions(size.width, size.height);
            scene.surface.request_render();
        });
        debug!(page_id = %self.page_id, ?orientation, "page resized");
    }

    // --- Surface events ---

    /// Handle one surface event. Every path checks the fence first.
    pub fn handle_surface_event(&mut self, event: SurfaceEvent, now: Instant) -> Option<Action> {
        if self.fence.is_fenced() {
            trace!(?event, "surface event suppressed by fence");
            return None;
        }
        match event {
            SurfaceEvent::ObjectModified(_) => {
                self.request_commit(CommitTrigger::Modified);
                None
            }
            SurfaceEvent::TextChanged(_) => {
                self.schedule_text_commit(now);
                None
            }
            SurfaceEvent::TextEditingExited(_) => {
                self.request_commit(CommitTrigger::EditingExited);
                None
            }
            SurfaceEvent::SelectionChanged => self.report_selection(),
            SurfaceEvent::ObjectRemoved(handle) => {
                let Some(id) = self.index.id_for(handle).cloned() else {
                    return None;
                };
                self.index.remove(&id);
                debug!(page_id = %self.page_id, item_id = %id, "item deleted on surface");
                self.request_commit(CommitTrigger::Removed);
                None
            }
            SurfaceEvent::ObjectAdded(_) | SurfaceEvent::TextEditingEntered(_) => None,
        }
    }

    /// Drain and handle every queued surface event, including any set aside
    /// while the fence was engaged.
    pub fn process_surface_events(&mut self, now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();
        loop {
            let mut batch = std::mem::take(&mut self.backlog);
            batch.extend(self.surface.take_events());
            if batch.is_empty() {
                return actions;
            }
            for event in batch {
                actions.extend(self.handle_surface_event(event, now));
            }
        }
    }

    /// Emit a selection change if the active item differs from what the host
    /// last heard.
    pub(crate) fn report_selection(&mut self) -> Option<Action> {
        let current = self.selected_item();
        if current == self.reported_selection {
            return None;
        }
        self.reported_selection.clone_from(&current);
        self.applied_selection.clone_from(&current);
        Some(Action::SelectionChanged { page_id: self.page_id.clone(), item_id: current })
    }

    // --- Fencing ---

    /// Run a programmatic surface mutation with the fence engaged.
    ///
    /// User events queued before the outermost mutation are kept; events the
    /// mutation itself produces are dropped.
    pub(crate) fn fenced<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        if !self.fence.is_fenced() {
            let pending = self.surface.take_events();
            self.backlog.extend(pending);
        }
        let _guard = self.fence.guard();
        let result = f(self);
        self.drain_fenced_events();
        result
    }

    fn drain_fenced_events(&mut self) {
        let events = self.surface.take_events();
        if !events.is_empty() {
            trace!(count = events.len(), "dropping events raised while fenced");
        }
    }

    pub(crate) fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }
}
