//! Translator: surface object snapshots to document items.
//!
//! Pure mapping plus scale folding. Geometry is rounded to whole page-space
//! units on the way out so repeated float transforms never drift the
//! document. Text objects never leave here with a scale other than 1: any
//! resize is folded into the font size first.

#[cfg(test)]
#[path = "translate_test.rs"]
mod translate_test;

use crate::consts::MIN_FONT_SIZE;
use crate::item::{DocumentItem, ImageContent, ItemContent, ItemId, TextContent};
use crate::surface::{ObjectBody, ObjectHandle, ObjectPatch, Surface, SurfaceObject};

/// Font size after folding a resize of `scale_y` into it.
#[must_use]
pub fn folded_font_size(font_size: f64, scale_y: f64) -> f64 {
    (font_size * scale_y).round().max(MIN_FONT_SIZE)
}

/// Fold a text object's scale into its font size and reset the scale to 1.
///
/// Returns `true` if the object was changed. Non-text objects and unscaled
/// text are left alone.
pub fn normalize_text_scale<S: Surface>(surface: &mut S, handle: ObjectHandle) -> bool {
    let Some(object) = surface.object(handle) else {
        return false;
    };
    let Some(text) = object.as_text() else {
        return false;
    };
    if is_unit(object.scale_x) && is_unit(object.scale_y) {
        return false;
    }
    let patch = ObjectPatch {
        font_size: Some(folded_font_size(text.font_size, object.scale_y)),
        scale_x: Some(1.0),
        scale_y: Some(1.0),
        ..Default::default()
    };
    surface.update(handle, &patch)
}

fn is_unit(scale: f64) -> bool {
    (scale - 1.0).abs() < f64::EPSILON
}

/// Snapshot one surface object as a document item.
///
/// `src` is the resolved source the side-table holds for an image item; a
/// placeholder standing in for a decode in flight still carries its source.
#[must_use]
pub fn to_document_item(id: ItemId, src: Option<String>, object: &SurfaceObject) -> DocumentItem {
    let content = match &object.body {
        ObjectBody::Text(text) => ItemContent::Text(TextContent {
            text: text.text.clone(),
            font_family: text.font_family.clone(),
            font_size: text.font_size,
            font_weight: text.font_weight,
            italic: text.italic,
            align: text.align,
        }),
        ObjectBody::Image(_) | ObjectBody::Placeholder(_) => ItemContent::Image(ImageContent::new(src)),
    };
    DocumentItem {
        id,
        content,
        x: object.left.round(),
        y: object.top.round(),
        width: object.scaled_width().round(),
        height: object.scaled_height().round(),
        angle: object.angle.round(),
        visible: object.visible,
        locked: !object.interactive,
        z: 0,
    }
}

/// Canonical form of an item as hydration followed by commit would produce it.
#[must_use]
pub fn normalize_item(item: &DocumentItem) -> DocumentItem {
    let content = match &item.content {
        ItemContent::Text(text) => ItemContent::Text(text.clone()),
        ItemContent::Image(image) => ItemContent::Image(ImageContent::new(image.src.clone())),
    };
    DocumentItem {
        id: item.id.clone(),
        content,
        x: item.x.round(),
        y: item.y.round(),
        width: item.width.round(),
        height: item.height.round(),
        angle: item.angle.round(),
        visible: item.visible,
        locked: item.locked,
        z: 0,
    }
}
