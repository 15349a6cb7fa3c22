//! Document model: page items, their content variants, and the page record.
//!
//! This is the authoritative, serializable side of reconciliation. Array order
//! of `Page::items` is paint order (bottom to top); nothing here refers to the
//! rendering surface. The JSON shape uses camelCase keys and a `kind` tag so a
//! page round-trips through persistence unchanged.

#[cfg(test)]
#[path = "item_test.rs"]
mod item_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{PAGE_LONG_EDGE_IN, PAGE_SHORT_EDGE_IN, UNITS_PER_INCH};

/// Stable opaque identifier of a page item. Never reused within a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Allocate a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Identifier of a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// The two item variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Text,
    Image,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Image => f.write_str("image"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Text-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
    pub font_family: String,
    pub font_size: f64,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub align: TextAlign,
}

/// Image-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    /// Resolved resource locator. Absent means the item is a placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Mirrors the absence of `src`.
    #[serde(default)]
    pub placeholder: bool,
    /// Reserved; always `None`.
    #[serde(default)]
    pub crop: Option<serde_json::Value>,
}

impl ImageContent {
    #[must_use]
    pub fn new(src: Option<String>) -> Self {
        let placeholder = src.is_none();
        Self { src, placeholder, crop: None }
    }
}

/// Per-variant content, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemContent {
    Text(TextContent),
    Image(ImageContent),
}

/// One positioned item on a page.
///
/// For text items `width`/`height` are derived from the rendered content and
/// are not authoritative. For images they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentItem {
    pub id: ItemId,
    #[serde(flatten)]
    pub content: ItemContent,
    /// Left edge in page-space units.
    pub x: f64,
    /// Top edge in page-space units.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees.
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Locked items are not interactive on the surface.
    #[serde(default)]
    pub locked: bool,
    /// Reserved. Array position is the paint order; this is never consulted.
    #[serde(default)]
    pub z: i64,
}

fn default_visible() -> bool {
    true
}

impl DocumentItem {
    /// A text item at `(x, y)`. Footprint is zero until measured by a surface.
    #[must_use]
    pub fn text(id: ItemId, x: f64, y: f64, content: TextContent) -> Self {
        Self {
            id,
            content: ItemContent::Text(content),
            x,
            y,
            width: 0.0,
            height: 0.0,
            angle: 0.0,
            visible: true,
            locked: false,
            z: 0,
        }
    }

    /// An image item; `placeholder` is derived from `src`.
    #[must_use]
    pub fn image(id: ItemId, x: f64, y: f64, width: f64, height: f64, src: Option<String>) -> Self {
        Self {
            id,
            content: ItemContent::Image(ImageContent::new(src)),
            x,
            y,
            width,
            height,
            angle: 0.0,
            visible: true,
            locked: false,
            z: 0,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self.content {
            ItemContent::Text(_) => ItemKind::Text,
            ItemContent::Image(_) => ItemKind::Image,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&TextContent> {
        match &self.content {
            ItemContent::Text(text) => Some(text),
            ItemContent::Image(_) => None,
        }
    }

    #[must_use]
    pub fn as_image(&self) -> Option<&ImageContent> {
        match &self.content {
            ItemContent::Image(image) => Some(image),
            ItemContent::Text(_) => None,
        }
    }

    /// The resolved image source, if this is an image item that has one.
    #[must_use]
    pub fn src(&self) -> Option<&str> {
        self.as_image().and_then(|image| image.src.as_deref())
    }
}

/// Page orientation; determines the surface size in page space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page dimensions in page-space units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    #[must_use]
    pub fn for_orientation(orientation: Orientation) -> Self {
        let short = PAGE_SHORT_EDGE_IN * UNITS_PER_INCH;
        let long = PAGE_LONG_EDGE_IN * UNITS_PER_INCH;
        match orientation {
            Orientation::Portrait => Self { width: short, height: long },
            Orientation::Landscape => Self { width: long, height: short },
        }
    }

    /// Clamp a point into the page rectangle.
    #[must_use]
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }
}

/// A page record as held by the document model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    #[serde(default)]
    pub orientation: Orientation,
    /// Paint order, bottom to top.
    #[serde(default)]
    pub items: Vec<DocumentItem>,
    #[serde(default)]
    pub selected_item_id: Option<ItemId>,
}

impl Page {
    #[must_use]
    pub fn new(id: PageId, orientation: Orientation) -> Self {
        Self { id, orientation, items: Vec::new(), selected_item_id: None }
    }

    #[must_use]
    pub fn size(&self) -> PageSize {
        PageSize::for_orientation(self.orientation)
    }

    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&DocumentItem> {
        self.items.iter().find(|item| &item.id == id)
    }
}
