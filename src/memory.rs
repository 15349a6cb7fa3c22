//! In-memory [`Surface`] implementation.
//!
//! Holds objects in a handle map plus a bottom-to-top order vector, measures
//! text deterministically from glyph counts, and queues the same events a
//! browser surface would. The gesture helpers (`drag_by`, `scale_by`,
//! `type_text`, ...) stand in for the surface's own input handling: they
//! mutate objects directly and queue user-facing events, bypassing the engine
//! exactly like real pointer and keyboard input does.

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;

use std::collections::HashMap;

use crate::consts::{BOLD_ADVANCE, GLYPH_ADVANCE, TEXT_LINE_HEIGHT};
use crate::item::FontWeight;
use crate::surface::{ObjectBody, ObjectHandle, ObjectPatch, Surface, SurfaceEvent, SurfaceObject, TextBody};

#[derive(Debug, Default)]
pub struct MemorySurface {
    objects: HashMap<ObjectHandle, SurfaceObject>,
    /// Paint order, bottom to top.
    order: Vec<ObjectHandle>,
    active: Vec<ObjectHandle>,
    editing: Option<ObjectHandle>,
    events: Vec<SurfaceEvent>,
    next_handle: u64,
    width: f64,
    height: f64,
    renders: usize,
}

/// Natural size of a text body: widest line by glyph count, lines by line height.
#[must_use]
pub fn measure_text(body: &TextBody) -> (f64, f64) {
    let lines: Vec<&str> = body.text.split('\n').collect();
    let widest = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
    let advance = match body.font_weight {
        FontWeight::Normal => GLYPH_ADVANCE,
        FontWeight::Bold => GLYPH_ADVANCE * BOLD_ADVANCE,
    };
    #[allow(clippy::cast_precision_loss)]
    let width = widest as f64 * body.font_size * advance;
    #[allow(clippy::cast_precision_loss)]
    let height = lines.len() as f64 * body.font_size * TEXT_LINE_HEIGHT;
    (width, height)
}

impl MemorySurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[must_use]
    pub fn dimensions(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Number of render requests received.
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.renders
    }

    /// Events queued but not yet drained.
    #[must_use]
    pub fn pending_events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    fn is_interactive(&self, handle: ObjectHandle) -> bool {
        self.objects.get(&handle).is_some_and(|object| object.interactive)
    }

    fn remeasure(object: &mut SurfaceObject) {
        if let ObjectBody::Text(body) = &object.body {
            let (width, height) = measure_text(body);
            object.width = width;
            object.height = height;
        }
    }

    fn select(&mut self, handles: Vec<ObjectHandle>) {
        if self.active != handles {
            self.active = handles;
            self.events.push(SurfaceEvent::SelectionChanged);
        }
    }

    // --- User gestures ---

    /// Click an object. Non-interactive objects cannot be selected.
    pub fn click(&mut self, handle: ObjectHandle) -> bool {
        if !self.is_interactive(handle) {
            return false;
        }
        self.select(vec![handle]);
        true
    }

    /// Marquee-select several objects; non-interactive ones are skipped.
    pub fn select_many(&mut self, handles: &[ObjectHandle]) {
        let picked = handles.iter().copied().filter(|h| self.is_interactive(*h)).collect();
        self.select(picked);
    }

    /// Click on empty space.
    pub fn clear_selection(&mut self) {
        self.select(Vec::new());
    }

    /// Drag an object and release.
    pub fn drag_by(&mut self, handle: ObjectHandle, dx: f64, dy: f64) -> bool {
        let Some(object) = self.objects.get_mut(&handle).filter(|o| o.interactive) else {
            return false;
        };
        object.left += dx;
        object.top += dy;
        self.events.push(SurfaceEvent::ObjectModified(handle));
        true
    }

    /// Drag the whole active selection and release.
    pub fn drag_selection(&mut self, dx: f64, dy: f64) -> usize {
        let active = self.active.clone();
        active.into_iter().filter(|handle| self.drag_by(*handle, dx, dy)).count()
    }

    /// Resize through a corner or edge handle and release.
    pub fn scale_by(&mut self, handle: ObjectHandle, sx: f64, sy: f64) -> bool {
        let Some(object) = self.objects.get_mut(&handle).filter(|o| o.interactive) else {
            return false;
        };
        object.scale_x *= sx;
        object.scale_y *= sy;
        self.events.push(SurfaceEvent::ObjectModified(handle));
        true
    }

    /// Rotate through the rotation handle and release.
    pub fn rotate_to(&mut self, handle: ObjectHandle, angle: f64) -> bool {
        let Some(object) = self.objects.get_mut(&handle).filter(|o| o.interactive) else {
            return false;
        };
        object.angle = angle;
        self.events.push(SurfaceEvent::ObjectModified(handle));
        true
    }

    /// Double-click a text object to enter edit mode.
    pub fn enter_editing(&mut self, handle: ObjectHandle) -> bool {
        let editable = self
            .objects
            .get(&handle)
            .is_some_and(|object| object.interactive && object.as_text().is_some());
        if !editable {
            return false;
        }
        self.select(vec![handle]);
        self.editing = Some(handle);
        self.events.push(SurfaceEvent::TextEditingEntered(handle));
        true
    }

    fn edit_text(&mut self, edit: impl FnOnce(&mut String)) -> bool {
        let Some(handle) = self.editing else {
            return false;
        };
        let Some(object) = self.objects.get_mut(&handle) else {
            return false;
        };
        let ObjectBody::Text(body) = &mut object.body else {
            return false;
        };
        edit(&mut body.text);
        Self::remeasure(object);
        self.events.push(SurfaceEvent::TextChanged(handle));
        true
    }

    /// Type characters one keystroke at a time into the edited object.
    pub fn type_text(&mut self, typed: &str) -> usize {
        typed.chars().filter(|ch| self.edit_text(|text| text.push(*ch))).count()
    }

    /// Select-all and delete inside the edited object.
    pub fn clear_text(&mut self) -> bool {
        self.edit_text(String::clear)
    }

    /// Press Escape or click away to leave edit mode.
    pub fn exit_editing(&mut self) -> bool {
        let Some(handle) = self.editing.take() else {
            return false;
        };
        self.events.push(SurfaceEvent::TextEditingExited(handle));
        true
    }

    /// Press Delete with objects selected.
    pub fn delete_active(&mut self) -> usize {
        let active = self.active.clone();
        active.into_iter().filter(|handle| self.remove(*handle)).count()
    }
}

impl Surface for MemorySurface {
    fn add(&mut self, mut object: SurfaceObject) -> ObjectHandle {
        self.next_handle += 1;
        let handle = ObjectHandle::new(self.next_handle);
        Self::remeasure(&mut object);
        self.objects.insert(handle, object);
        self.order.push(handle);
        self.events.push(SurfaceEvent::ObjectAdded(handle));
        handle
    }

    fn remove(&mut self, handle: ObjectHandle) -> bool {
        if self.objects.remove(&handle).is_none() {
            return false;
        }
        self.order.retain(|h| *h != handle);
        if self.editing == Some(handle) {
            self.editing = None;
        }
        self.events.push(SurfaceEvent::ObjectRemoved(handle));
        if self.active.contains(&handle) {
            let remaining = self.active.iter().copied().filter(|h| *h != handle).collect();
            self.select(remaining);
        }
        true
    }

    fn object(&self, handle: ObjectHandle) -> Option<&SurfaceObject> {
        self.objects.get(&handle)
    }

    fn update(&mut self, handle: ObjectHandle, patch: &ObjectPatch) -> bool {
        let Some(object) = self.objects.get_mut(&handle) else {
            return false;
        };
        if let Some(left) = patch.left {
            object.left = left;
        }
        if let Some(top) = patch.top {
            object.top = top;
        }
        if let Some(angle) = patch.angle {
            object.angle = angle;
        }
        if let Some(scale_x) = patch.scale_x {
            object.scale_x = scale_x;
        }
        if let Some(scale_y) = patch.scale_y {
            object.scale_y = scale_y;
        }
        if let Some(visible) = patch.visible {
            object.visible = visible;
        }
        if let Some(interactive) = patch.interactive {
            object.interactive = interactive;
        }
        if let ObjectBody::Text(body) = &mut object.body {
            if let Some(text) = &patch.text {
                body.text.clone_from(text);
            }
            if let Some(family) = &patch.font_family {
                body.font_family.clone_from(family);
            }
            if let Some(size) = patch.font_size {
                body.font_size = size;
            }
            if let Some(weight) = patch.font_weight {
                body.font_weight = weight;
            }
            if let Some(italic) = patch.italic {
                body.italic = italic;
            }
            if let Some(align) = patch.align {
                body.align = align;
            }
        }
        if patch.touches_text() {
            Self::remeasure(object);
        }
        true
    }

    fn bring_to_front(&mut self, handle: ObjectHandle) {
        if let Some(pos) = self.order.iter().position(|h| *h == handle) {
            self.order.remove(pos);
            self.order.push(handle);
        }
    }

    fn paint_order(&self) -> Vec<ObjectHandle> {
        self.order.clone()
    }

    fn active_objects(&self) -> Vec<ObjectHandle> {
        self.active.clone()
    }

    fn set_active_object(&mut self, handle: Option<ObjectHandle>) {
        let next = handle.filter(|h| self.objects.contains_key(h)).into_iter().collect();
        self.select(next);
    }

    fn editing_object(&self) -> Option<ObjectHandle> {
        self.editing
    }

    fn set_dimensions(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    fn request_render(&mut self) {
        self.renders += 1;
    }
}
