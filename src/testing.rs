//! Shared fakes and builders for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::config::SceneConfig;
use crate::construct::{DecodeQueue, DecodedImage, ImageLoader, LoadError};
use crate::item::{DocumentItem, FontWeight, ItemId, Orientation, PageId, TextAlign, TextContent};
use crate::memory::MemorySurface;
use crate::scene::{Action, PageScene};
use crate::surface::{ObjectHandle, Surface};

// =============================================================================
// LOADERS
// =============================================================================

/// Resolves known sources immediately; everything else fails to fetch.
pub(crate) struct FixedLoader {
    sizes: HashMap<String, (f64, f64)>,
}

impl FixedLoader {
    pub(crate) fn new(entries: &[(&str, f64, f64)]) -> Self {
        let sizes = entries.iter().map(|(src, w, h)| ((*src).to_string(), (*w, *h))).collect();
        Self { sizes }
    }
}

#[async_trait]
impl ImageLoader for FixedLoader {
    async fn decode(&self, src: &str) -> Result<DecodedImage, LoadError> {
        match self.sizes.get(src) {
            Some((width, height)) => Ok(DecodedImage { src: src.to_string(), width: *width, height: *height }),
            None => Err(LoadError::Fetch { src: src.to_string(), reason: "not found".into() }),
        }
    }
}

/// Resolves known sources after a per-source delay on the tokio clock.
pub(crate) struct DelayedLoader {
    entries: HashMap<String, (f64, f64, u64)>,
}

impl DelayedLoader {
    pub(crate) fn new(entries: &[(&str, f64, f64, u64)]) -> Self {
        let entries = entries.iter().map(|(src, w, h, ms)| ((*src).to_string(), (*w, *h, *ms))).collect();
        Self { entries }
    }
}

#[async_trait]
impl ImageLoader for DelayedLoader {
    async fn decode(&self, src: &str) -> Result<DecodedImage, LoadError> {
        let Some((width, height, delay_ms)) = self.entries.get(src).copied() else {
            return Err(LoadError::Fetch { src: src.to_string(), reason: "not found".into() });
        };
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        Ok(DecodedImage { src: src.to_string(), width, height })
    }
}

type GateResult = Result<DecodedImage, LoadError>;

/// Holds every decode until the test opens its gate.
pub(crate) struct GatedLoader {
    gates: Mutex<HashMap<String, oneshot::Receiver<GateResult>>>,
}

/// Test-side end of a gated decode.
pub(crate) struct Gate {
    src: String,
    tx: oneshot::Sender<GateResult>,
}

impl Gate {
    pub(crate) fn open(self, width: f64, height: f64) {
        let decoded = DecodedImage { src: self.src, width, height };
        if self.tx.send(Ok(decoded)).is_err() {
            tracing::debug!("gated decode was dropped before opening");
        }
    }

    pub(crate) fn fail(self, reason: &str) {
        let error = LoadError::Decode { src: self.src, reason: reason.into() };
        if self.tx.send(Err(error)).is_err() {
            tracing::debug!("gated decode was dropped before failing");
        }
    }
}

impl GatedLoader {
    pub(crate) fn new() -> Self {
        Self { gates: Mutex::new(HashMap::new()) }
    }

    /// Register a gate for the next decode of `src`.
    pub(crate) fn gate(&self, src: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        let mut gates = match self.gates.lock() {
            Ok(gates) => gates,
            Err(poisoned) => poisoned.into_inner(),
        };
        gates.insert(src.to_string(), rx);
        Gate { src: src.to_string(), tx }
    }

    fn take(&self, src: &str) -> Option<oneshot::Receiver<GateResult>> {
        let mut gates = match self.gates.lock() {
            Ok(gates) => gates,
            Err(poisoned) => poisoned.into_inner(),
        };
        gates.remove(src)
    }
}

#[async_trait]
impl ImageLoader for GatedLoader {
    async fn decode(&self, src: &str) -> Result<DecodedImage, LoadError> {
        let Some(rx) = self.take(src) else {
            return Err(LoadError::Fetch { src: src.to_string(), reason: "no gate".into() });
        };
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(LoadError::Fetch { src: src.to_string(), reason: "gate dropped".into() }),
        }
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

pub(crate) fn scene() -> PageScene<MemorySurface> {
    PageScene::new(PageId::from("p1"), MemorySurface::new(), Orientation::Portrait, SceneConfig::default())
}

/// The handle standing for `id`, or a handle no surface ever issues.
pub(crate) fn handle<S: Surface>(scene: &PageScene<S>, id: &str) -> ObjectHandle {
    scene.index().handle_of(&ItemId::from(id)).unwrap_or(ObjectHandle::new(0))
}

pub(crate) fn text_item(id: &str, x: f64, y: f64, text: &str) -> DocumentItem {
    DocumentItem::text(
        ItemId::from(id),
        x,
        y,
        TextContent {
            text: text.into(),
            font_family: "Inter".into(),
            font_size: 24.0,
            font_weight: FontWeight::Normal,
            italic: false,
            align: TextAlign::Left,
        },
    )
}

pub(crate) fn image_item(id: &str, src: Option<&str>) -> DocumentItem {
    DocumentItem::image(ItemId::from(id), 40.0, 60.0, 200.0, 100.0, src.map(String::from))
}

pub(crate) fn ids(items: &[DocumentItem]) -> Vec<ItemId> {
    items.iter().map(|item| item.id.clone()).collect()
}

/// Run every queued and in-flight decode to completion.
pub(crate) async fn settle<S: Surface>(scene: &mut PageScene<S>, queue: &mut DecodeQueue) -> Vec<Action> {
    let mut actions = Vec::new();
    loop {
        queue.extend(scene.take_decode_requests());
        let Some(outcome) = queue.next().await else {
            return actions;
        };
        actions.extend(scene.apply_decoded(outcome));
    }
}
