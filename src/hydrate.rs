//! Hydrator: project document items onto the surface.
//!
//! DESIGN
//! ======
//! `reconcile` runs fully inside the hydration fence and in four passes:
//! orphan removal, upsert in array order, one z-order pass that brings every
//! object to the front in array order, then selection. Images never block the
//! pass: an image with a source gets a placeholder stand-in and a ticketed
//! decode request. When the decode settles, `apply_decoded` swaps the bitmap
//! in if the ticket is still the one the entry is waiting on. Anything else
//! is stale and dropped.
//!
//! Swaps are add-then-remove. The replacement is moved back to the stand-in's
//! slot in paint order by re-raising everything that was above it.

#[cfg(test)]
#[path = "hydrate_test.rs"]
mod hydrate_test;

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::commit::CommitTrigger;
use crate::consts::DEFAULT_TEXT_FILL;
use crate::construct::{DecodeOutcome, DecodeRequest, placeholder_object, text_object};
use crate::equality::items_equal;
use crate::item::{DocumentItem, ItemContent, ItemId, TextContent};
use crate::scene::{Action, PageScene, PendingDecode, SceneEntry, Shown};
use crate::surface::{ObjectBody, ObjectHandle, ObjectPatch, Surface, SurfaceObject};

impl<S: Surface> PageScene<S> {
    /// Make the surface show `items` in array order, and apply `selected` if
    /// it changed since the last reconcile. Idempotent.
    ///
    /// User edits still waiting on a frame or the typing pause are written
    /// out first and returned as an `ItemsChanged`. A snapshot equal to the
    /// document those edits were made against is stale and leaves the surface
    /// as the user left it.
    pub fn reconcile(&mut self, items: &[DocumentItem], selected: Option<&ItemId>) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some((previous, action)) = self.take_unsaved_edits() {
            actions.push(action);
            if items_equal(items, &previous) {
                debug!(page_id = %self.page_id, "snapshot predates unsaved edits; surface kept");
                return actions;
            }
        }

        self.fenced(|scene| {
            let previous_active = scene.selected_item();
            scene.document = items.to_vec();
            scene.remove_orphans(items);

            let mut swapped = Vec::new();
            for item in items {
                if scene.upsert(item) {
                    swapped.push(item.id.clone());
                }
            }

            scene.restore_paint_order();
            scene.restore_selection(previous_active.as_ref(), &swapped, selected);
            scene.surface.request_render();
        });
        debug!(page_id = %self.page_id, items = items.len(), "reconciled");
        actions
    }

    /// Land a settled decode.
    ///
    /// Outcomes whose ticket is no longer the one the entry waits on are
    /// discarded. A failure keeps the placeholder and is reported once.
    pub fn apply_decoded(&mut self, outcome: DecodeOutcome) -> Vec<Action> {
        let DecodeOutcome { item_id, src, ticket, result } = outcome;
        let Some(entry) = self.index.get_mut(&item_id) else {
            debug!(item_id = %item_id, ticket, "discarding decode for removed item");
            return Vec::new();
        };
        if entry.pending.as_ref().is_none_or(|pending| pending.ticket != ticket) {
            debug!(item_id = %item_id, ticket, "discarding stale decode");
            return Vec::new();
        }
        entry.pending = None;

        let object = match result {
            Ok(object) => object,
            Err(error) => {
                warn!(page_id = %self.page_id, item_id = %item_id, %src, %error, "image load failed");
                entry.failed_src = Some(src);
                entry.fit_on_load = false;
                if matches!(entry.shown, Shown::Bitmap(_)) {
                    self.fenced(|scene| scene.fall_back_to_placeholder(&item_id));
                }
                return vec![Action::ImageLoadFailed {
                    page_id: self.page_id.clone(),
                    item_id,
                    message: error.to_string(),
                }];
            }
        };

        let fit = entry.fit_on_load;
        let landed = self.fenced(|scene| scene.land_bitmap(&item_id, src, object));
        if landed && fit {
            self.request_commit(CommitTrigger::Resized);
        }
        Vec::new()
    }

    // --- Passes ---

    fn remove_orphans(&mut self, items: &[DocumentItem]) {
        let wanted: HashSet<&ItemId> = items.iter().map(|item| &item.id).collect();
        let orphans: Vec<ItemId> = self.index.ids().filter(|id| !wanted.contains(id)).cloned().collect();
        for id in orphans {
            let Some(entry) = self.index.remove(&id) else {
                continue;
            };
            if !self.surface.remove(entry.handle) {
                debug!(item_id = %id, handle = %entry.handle, "orphan already absent from surface");
            }
        }
    }

    /// Create or patch the object for `item`. Returns `true` if the object
    /// was replaced.
    fn upsert(&mut self, item: &DocumentItem) -> bool {
        let existing = self
            .index
            .get(&item.id)
            .filter(|entry| self.surface.contains(entry.handle))
            .map(|entry| (entry.handle, entry.kind));
        let Some((handle, kind)) = existing else {
            self.create(item);
            return false;
        };

        if kind != item.kind() {
            let replacement = stand_in(item);
            let handle = self.swap(&item.id, handle, replacement);
            self.index.insert(item.id.clone(), SceneEntry::new(handle, item.kind(), None));
            if let Some(src) = item.src() {
                self.track_source(&item.id, src);
            }
            self.apply_common(item, handle);
            return true;
        }

        let swapped = match &item.content {
            ItemContent::Text(content) => {
                self.patch_text(handle, content);
                false
            }
            ItemContent::Image(image) => self.sync_image(&item.id, handle, item, image.src.as_deref()),
        };
        if let Some(handle) = self.index.handle_of(&item.id) {
            self.apply_common(item, handle);
        }
        swapped
    }

    fn create(&mut self, item: &DocumentItem) {
        let handle = self.surface.add(stand_in(item));
        self.index.insert(item.id.clone(), SceneEntry::new(handle, item.kind(), None));
        if let Some(src) = item.src() {
            self.track_source(&item.id, src);
        }
        self.apply_common(item, handle);
    }

    fn patch_text(&mut self, handle: ObjectHandle, content: &TextContent) {
        let Some(body) = self.surface.object(handle).and_then(SurfaceObject::as_text) else {
            return;
        };
        let editing = self.surface.editing_object() == Some(handle);
        let mut patch = ObjectPatch::default();
        if !editing && body.text != content.text {
            patch.text = Some(content.text.clone());
        }
        if body.font_family != content.font_family {
            patch.font_family = Some(content.font_family.clone());
        }
        if (body.font_size - content.font_size).abs() >= f64::EPSILON {
            patch.font_size = Some(content.font_size);
        }
        if body.font_weight != content.font_weight {
            patch.font_weight = Some(content.font_weight);
        }
        if body.italic != content.italic {
            patch.italic = Some(content.italic);
        }
        if body.align != content.align {
            patch.align = Some(content.align);
        }
        if !patch.is_empty() {
            self.surface.update(handle, &patch);
        }
    }

    /// Bring an image entry in line with the wanted source. Returns `true`
    /// if the object was replaced.
    fn sync_image(&mut self, id: &ItemId, handle: ObjectHandle, item: &DocumentItem, src: Option<&str>) -> bool {
        if let Some(src) = src {
            self.track_source(id, src);
            return false;
        }
        let Some(entry) = self.index.get_mut(id) else {
            return false;
        };
        entry.src = None;
        entry.pending = None;
        entry.failed_src = None;
        entry.fit_on_load = false;
        if !matches!(entry.shown, Shown::Bitmap(_)) {
            return false;
        }
        let placeholder = placeholder_object(item.x, item.y, item.width, item.height);
        self.swap(id, handle, placeholder);
        if let Some(entry) = self.index.get_mut(id) {
            entry.shown = Shown::Placeholder;
        }
        true
    }

    /// Record `src` as wanted and request a decode unless it is already
    /// shown, in flight, or known to fail.
    pub(crate) fn track_source(&mut self, id: &ItemId, src: &str) {
        let Some(entry) = self.index.get_mut(id) else {
            return;
        };
        if entry.src.as_deref() != Some(src) {
            entry.src = Some(src.to_string());
            entry.failed_src = None;
        }
        let shown = matches!(&entry.shown, Shown::Bitmap(current) if current == src);
        let pending = entry.pending.as_ref().is_some_and(|pending| pending.src == src);
        let failed = entry.failed_src.as_deref() == Some(src);
        if shown {
            entry.pending = None;
            return;
        }
        if pending || failed {
            return;
        }
        let ticket = self.issue_ticket();
        if let Some(entry) = self.index.get_mut(id) {
            entry.pending = Some(PendingDecode { src: src.to_string(), ticket });
        }
        debug!(item_id = %id, %src, ticket, "decode requested");
        self.decode_requests.push(DecodeRequest { item_id: id.clone(), src: src.to_string(), ticket });
    }

    /// Position, rotation, flags, and scale. Applied on every pass.
    fn apply_common(&mut self, item: &DocumentItem, handle: ObjectHandle) {
        let Some(object) = self.surface.object(handle) else {
            return;
        };
        let (scale_x, scale_y) = match object.body {
            ObjectBody::Text(_) => (1.0, 1.0),
            ObjectBody::Image(_) | ObjectBody::Placeholder(_) => {
                (scale_for(item.width, object.width), scale_for(item.height, object.height))
            }
        };
        let patch = ObjectPatch {
            left: Some(item.x),
            top: Some(item.y),
            angle: Some(item.angle),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            visible: Some(item.visible),
            interactive: Some(!item.locked),
            ..Default::default()
        };
        self.surface.update(handle, &patch);
    }

    fn restore_paint_order(&mut self) {
        for item in &self.document {
            if let Some(handle) = self.index.handle_of(&item.id) {
                self.surface.bring_to_front(handle);
            }
        }
    }

    fn restore_selection(&mut self, previous_active: Option<&ItemId>, swapped: &[ItemId], selected: Option<&ItemId>) {
        if let Some(id) = previous_active.filter(|id| swapped.contains(*id)) {
            let handle = self.index.handle_of(id);
            self.surface.set_active_object(handle);
        }
        if selected == self.applied_selection.as_ref() {
            return;
        }
        let handle = selected
            .and_then(|id| self.index.handle_of(id))
            .filter(|handle| self.surface.object(*handle).is_some_and(|object| object.interactive));
        if let (Some(id), None) = (selected, handle) {
            debug!(item_id = %id, "selected item is locked or not on the page");
        }
        self.surface.set_active_object(handle);
        self.applied_selection = selected.cloned();
        self.reported_selection = handle.and(selected.cloned());
    }

    /// Replace `old` with `object`, keeping its slot in paint order.
    fn swap(&mut self, id: &ItemId, old: ObjectHandle, object: SurfaceObject) -> ObjectHandle {
        let order = self.surface.paint_order();
        let above: Vec<ObjectHandle> = match order.iter().position(|handle| *handle == old) {
            Some(pos) => order[pos + 1..].to_vec(),
            None => Vec::new(),
        };
        let handle = self.surface.add(object);
        if !self.surface.remove(old) {
            debug!(item_id = %id, handle = %old, "swapped object already absent from surface");
        }
        for handle in above {
            self.surface.bring_to_front(handle);
        }
        self.index.rebind(id, handle);
        handle
    }

    /// Replace a bitmap that no longer matches the wanted source with a
    /// placeholder of the same footprint. Must run fenced.
    fn fall_back_to_placeholder(&mut self, id: &ItemId) {
        let Some(old) = self.index.handle_of(id) else {
            return;
        };
        let Some(current) = self.surface.object(old).cloned() else {
            return;
        };
        let mut placeholder =
            placeholder_object(current.left, current.top, current.scaled_width(), current.scaled_height());
        placeholder.angle = current.angle;
        placeholder.visible = current.visible;
        placeholder.interactive = current.interactive;
        let was_active = self.surface.active_objects().contains(&old);
        let handle = self.swap(id, old, placeholder);
        if was_active {
            self.surface.set_active_object(Some(handle));
        }
        if let Some(entry) = self.index.get_mut(id) {
            entry.shown = Shown::Placeholder;
        }
    }

    /// Put a decoded bitmap in place of the entry's stand-in. Must run fenced.
    fn land_bitmap(&mut self, id: &ItemId, src: String, mut object: SurfaceObject) -> bool {
        let Some(entry) = self.index.get(id) else {
            return false;
        };
        let (old, fit) = (entry.handle, entry.fit_on_load);
        let Some(current) = self.surface.object(old).cloned() else {
            debug!(item_id = %id, "stand-in gone before decode landed");
            return false;
        };
        let (width, height) = if fit {
            fit_within(object.width, object.height, self.config.max_dropped_image_side)
        } else {
            (current.scaled_width(), current.scaled_height())
        };
        object.left = current.left;
        object.top = current.top;
        object.angle = current.angle;
        object.visible = current.visible;
        object.interactive = current.interactive;
        object.scale_x = scale_for(width, object.width);
        object.scale_y = scale_for(height, object.height);

        let was_active = self.surface.active_objects().contains(&old);
        let handle = self.swap(id, old, object);
        if was_active {
            self.surface.set_active_object(Some(handle));
        }
        if let Some(entry) = self.index.get_mut(id) {
            entry.shown = Shown::Bitmap(src);
            entry.fit_on_load = false;
        }
        self.surface.request_render();
        debug!(item_id = %id, handle = %handle, "bitmap landed");
        true
    }
}

/// The synchronous object for `item`: text, or a placeholder for images.
fn stand_in(item: &DocumentItem) -> SurfaceObject {
    match &item.content {
        ItemContent::Text(content) => text_object(item.x, item.y, content, DEFAULT_TEXT_FILL),
        ItemContent::Image(_) => placeholder_object(item.x, item.y, item.width, item.height),
    }
}

fn scale_for(target: f64, intrinsic: f64) -> f64 {
    if intrinsic > 0.0 && target > 0.0 { target / intrinsic } else { 1.0 }
}

/// Scale `(width, height)` down to fit a `max_side` square, keeping aspect.
#[must_use]
pub fn fit_within(width: f64, height: f64, max_side: f64) -> (f64, f64) {
    let longest = width.max(height);
    if longest <= max_side || longest <= 0.0 {
        return (width, height);
    }
    let factor = max_side / longest;
    ((width * factor).round(), (height * factor).round())
}
