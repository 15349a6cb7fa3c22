//! Drop and paste ingestion.
//!
//! A drop synthesizes exactly one new item at the pointer, selects it, and
//! requests a commit; the host learns about the item through the regular
//! `ItemsChanged` write. Image files and URLs start as a placeholder carrying
//! the resolved source and take the decoded size, fitted into
//! `max_dropped_image_side`, once the decode lands.

#[cfg(test)]
#[path = "ingest_test.rs"]
mod ingest_test;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::commit::CommitTrigger;
use crate::consts::{DEFAULT_TEXT, DEFAULT_TEXT_FILL, IMAGE_SOURCE_PREFIXES};
use crate::construct::{placeholder_object, text_object};
use crate::item::{FontWeight, ItemId, ItemKind, TextAlign, TextContent};
use crate::scene::{Action, PageScene, SceneEntry};
use crate::surface::Surface;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid drop payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("dropped image has no source")]
    EmptySource,
    #[error("unsupported image source: {0}")]
    UnsupportedSource(String),
}

/// What was dropped or pasted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DropPayload {
    /// The text palette entry.
    Text,
    /// The image palette entry; becomes a placeholder.
    Image,
    /// An image file, already resolved to a locator (usually `blob:`).
    File { src: String },
    /// An image URL.
    Url { src: String },
}

impl DropPayload {
    /// Parse a drag-and-drop data transfer payload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if `raw` is not a known payload.
    pub fn from_json(raw: &str) -> Result<Self, IngestError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// A pointer position in page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePoint {
    pub x: f64,
    pub y: f64,
}

impl PagePoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The result of a successful drop.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub item_id: ItemId,
    /// The selection change caused by selecting the new item.
    pub selection: Option<Action>,
}

/// Check a dropped image source and return it trimmed.
///
/// # Errors
///
/// `EmptySource` for a blank source, `UnsupportedSource` for anything that is
/// not a blob, an image data URL, or an http(s) URL.
pub fn validate_source(src: &str) -> Result<String, IngestError> {
    let src = src.trim();
    if src.is_empty() {
        return Err(IngestError::EmptySource);
    }
    if !IMAGE_SOURCE_PREFIXES.iter().any(|prefix| src.starts_with(prefix)) {
        return Err(IngestError::UnsupportedSource(src.to_string()));
    }
    Ok(src.to_string())
}

impl<S: Surface> PageScene<S> {
    /// Create one item from a drop at `at`, clamped into the page.
    ///
    /// # Errors
    ///
    /// Fails without touching the surface if an image source is rejected.
    pub fn ingest(&mut self, payload: DropPayload, at: PagePoint) -> Result<Ingested, IngestError> {
        let (x, y) = self.page_size().clamp(at.x, at.y);
        let src = match &payload {
            DropPayload::File { src } | DropPayload::Url { src } => Some(validate_source(src)?),
            DropPayload::Text | DropPayload::Image => None,
        };
        let item_id = ItemId::generate();

        self.fenced(|scene| {
            let (object, kind) = match payload {
                DropPayload::Text => {
                    let content = TextContent {
                        text: DEFAULT_TEXT.to_string(),
                        font_family: scene.config.default_font_family.clone(),
                        font_size: scene.config.default_font_size,
                        font_weight: FontWeight::Normal,
                        italic: false,
                        align: TextAlign::Left,
                    };
                    (text_object(x, y, &content, DEFAULT_TEXT_FILL), ItemKind::Text)
                }
                DropPayload::Image | DropPayload::File { .. } | DropPayload::Url { .. } => {
                    let side = scene.config.placeholder_size;
                    (placeholder_object(x, y, side, side), ItemKind::Image)
                }
            };
            let handle = scene.surface.add(object);
            scene.index.insert(item_id.clone(), SceneEntry::new(handle, kind, None));
            if let Some(src) = &src {
                if let Some(entry) = scene.index.get_mut(&item_id) {
                    entry.fit_on_load = true;
                }
                scene.track_source(&item_id, src);
            }
            scene.surface.set_active_object(Some(handle));
            scene.surface.request_render();
        });

        info!(page_id = %self.page_id, item_id = %item_id, x, y, "item dropped");
        let selection = self.report_selection();
        self.request_commit(CommitTrigger::Ingested);
        Ok(Ingested { item_id, selection })
    }
}
