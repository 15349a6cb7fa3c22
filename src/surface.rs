//! Rendering surface capability.
//!
//! The engine does not render. It drives a retained-mode surface through the
//! fixed operation set in [`Surface`] and reads state back from the
//! [`SurfaceObject`]s it exposes. Objects carry no document metadata; the
//! mapping from item ids to handles lives in the engine's side-table.
//!
//! Surfaces report what happened through [`SurfaceEvent`]s, queued and drained
//! with [`Surface::take_events`]. Programmatic mutations queue events exactly
//! like user input does; the hydration fence is what tells them apart.

use std::fmt;

use crate::item::{FontWeight, TextAlign};

/// Opaque reference to an object owned by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(u64);

impl ObjectHandle {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBody {
    pub text: String,
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: FontWeight,
    pub italic: bool,
    pub align: TextAlign,
    pub fill: String,
}

/// A decoded bitmap. `src` is the resource it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBody {
    pub src: String,
}

/// Bordered rectangle with a crossing diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderBody {
    pub stroke: String,
    pub fill: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectBody {
    Text(TextBody),
    Image(ImageBody),
    Placeholder(PlaceholderBody),
}

/// A retained-mode object as the surface holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceObject {
    pub left: f64,
    pub top: f64,
    /// Unscaled width: measured content for text, intrinsic size for images
    /// and placeholders.
    pub width: f64,
    /// Unscaled height, see `width`.
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in degrees.
    pub angle: f64,
    pub visible: bool,
    /// Draggable, resizable and selectable.
    pub interactive: bool,
    pub body: ObjectBody,
}

impl SurfaceObject {
    /// An unscaled, visible, interactive object at the origin.
    #[must_use]
    pub fn new(body: ObjectBody, width: f64, height: f64) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            visible: true,
            interactive: true,
            body,
        }
    }

    #[must_use]
    pub fn scaled_width(&self) -> f64 {
        self.width * self.scale_x
    }

    #[must_use]
    pub fn scaled_height(&self) -> f64 {
        self.height * self.scale_y
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&TextBody> {
        match &self.body {
            ObjectBody::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self.body, ObjectBody::Placeholder(_))
    }

    /// Source of the displayed bitmap, if this is a decoded image.
    #[must_use]
    pub fn image_src(&self) -> Option<&str> {
        match &self.body {
            ObjectBody::Image(image) => Some(&image.src),
            _ => None,
        }
    }
}

/// Sparse update for a surface object. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPatch {
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub angle: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    pub visible: Option<bool>,
    pub interactive: Option<bool>,
    /// Text fields; ignored by non-text objects.
    pub text: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub font_weight: Option<FontWeight>,
    pub italic: Option<bool>,
    pub align: Option<TextAlign>,
}

impl ObjectPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the patch changes text content or style.
    #[must_use]
    pub fn touches_text(&self) -> bool {
        self.text.is_some()
            || self.font_family.is_some()
            || self.font_size.is_some()
            || self.font_weight.is_some()
            || self.italic.is_some()
            || self.align.is_some()
    }
}

/// Notifications queued by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    ObjectAdded(ObjectHandle),
    ObjectRemoved(ObjectHandle),
    /// A drag, resize, or rotate gesture was released.
    ObjectModified(ObjectHandle),
    /// The active object set changed.
    SelectionChanged,
    TextEditingEntered(ObjectHandle),
    /// Live content change while in text-edit mode.
    TextChanged(ObjectHandle),
    TextEditingExited(ObjectHandle),
}

/// The operations the engine needs from a rendering surface.
pub trait Surface {
    /// Add an object on top of the paint order.
    fn add(&mut self, object: SurfaceObject) -> ObjectHandle;

    /// Remove an object. Returns `false` if it was already gone.
    fn remove(&mut self, handle: ObjectHandle) -> bool;

    fn object(&self, handle: ObjectHandle) -> Option<&SurfaceObject>;

    /// Apply a sparse update. Text objects are re-measured when text fields
    /// change. Returns `false` if the object is gone.
    fn update(&mut self, handle: ObjectHandle, patch: &ObjectPatch) -> bool;

    fn bring_to_front(&mut self, handle: ObjectHandle);

    /// Handles bottom to top.
    fn paint_order(&self) -> Vec<ObjectHandle>;

    /// The current selection. More than one entry means a multi-selection.
    fn active_objects(&self) -> Vec<ObjectHandle>;

    fn set_active_object(&mut self, handle: Option<ObjectHandle>);

    /// The text object currently in edit mode, if any.
    fn editing_object(&self) -> Option<ObjectHandle>;

    /// Size the surface in page-space units.
    fn set_dimensions(&mut self, width: f64, height: f64);

    /// Drain queued events.
    fn take_events(&mut self) -> Vec<SurfaceEvent>;

    fn request_render(&mut self);

    /// The single active object; `None` for no selection or a multi-selection.
    fn active_object(&self) -> Option<ObjectHandle> {
        match self.active_objects().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    fn contains(&self, handle: ObjectHandle) -> bool {
        self.object(handle).is_some()
    }
}
