//! Order-independent, float-tolerant comparison of item lists.
//!
//! Derived fields are ignored: a text item's width and height come from
//! measurement and jitter with re-layout, so they never count as a change.
//! The reserved `z` field is ignored as well.

#[cfg(test)]
#[path = "equality_test.rs"]
mod equality_test;

use std::collections::HashMap;

use crate::consts::{IMAGE_SIZE_TOLERANCE, POSITION_TOLERANCE};
use crate::item::{DocumentItem, ItemContent, ItemId};

/// Whether two item lists describe the same page content.
#[must_use]
pub fn items_equal(a: &[DocumentItem], b: &[DocumentItem]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let by_id: HashMap<&ItemId, &DocumentItem> = b.iter().map(|item| (&item.id, item)).collect();
    if by_id.len() != b.len() {
        return false;
    }
    a.iter()
        .all(|item| by_id.get(&item.id).is_some_and(|other| item_equal(item, other)))
}

/// Whether two items with the same id are equal within tolerance.
#[must_use]
pub fn item_equal(a: &DocumentItem, b: &DocumentItem) -> bool {
    let base = within(a.x, b.x, POSITION_TOLERANCE)
        && within(a.y, b.y, POSITION_TOLERANCE)
        && within(a.angle, b.angle, POSITION_TOLERANCE)
        && a.visible == b.visible
        && a.locked == b.locked;
    if !base {
        return false;
    }
    match (&a.content, &b.content) {
        (ItemContent::Text(ta), ItemContent::Text(tb)) => {
            ta.text == tb.text
                && ta.font_family == tb.font_family
                && (ta.font_size - tb.font_size).abs() < f64::EPSILON
                && ta.font_weight == tb.font_weight
                && ta.italic == tb.italic
                && ta.align == tb.align
        }
        (ItemContent::Image(ia), ItemContent::Image(ib)) => {
            ia.src == ib.src
                && within(a.width, b.width, IMAGE_SIZE_TOLERANCE)
                && within(a.height, b.height, IMAGE_SIZE_TOLERANCE)
        }
        _ => false,
    }
}

fn within(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}
