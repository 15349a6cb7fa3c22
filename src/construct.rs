//! Object constructors and the image decode pipeline.
//!
//! Text and placeholder objects are built synchronously. Image objects need a
//! decode first, which goes through an [`ImageLoader`]. Decodes run in a
//! [`DecodeQueue`] and come back as [`DecodeOutcome`]s stamped with the ticket
//! the scene issued, so a result that lands after its item was removed or
//! re-pointed can be recognized and dropped.

#[cfg(test)]
#[path = "construct_test.rs"]
mod construct_test;

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;

use crate::consts::{PLACEHOLDER_FILL, PLACEHOLDER_STROKE};
use crate::item::{ItemId, TextContent};
use crate::surface::{ImageBody, ObjectBody, PlaceholderBody, SurfaceObject, TextBody};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("failed to fetch {src}: {reason}")]
    Fetch { src: String, reason: String },
    #[error("failed to decode {src}: {reason}")]
    Decode { src: String, reason: String },
    #[error("unsupported image source: {0}")]
    UnsupportedSource(String),
}

// =============================================================================
// LOADER
// =============================================================================

/// A decoded bitmap's identity and natural size.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub src: String,
    pub width: f64,
    pub height: f64,
}

/// Fetches and decodes image resources. Implemented by the host.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Decode `src` into a bitmap.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when the resource cannot be fetched or decoded.
    async fn decode(&self, src: &str) -> Result<DecodedImage, LoadError>;
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Build a text object at `(left, top)`. Scale is always 1; the surface
/// measures the footprint.
#[must_use]
pub fn text_object(left: f64, top: f64, content: &TextContent, fill: &str) -> SurfaceObject {
    let body = ObjectBody::Text(TextBody {
        text: content.text.clone(),
        font_family: content.font_family.clone(),
        font_size: content.font_size,
        font_weight: content.font_weight,
        italic: content.italic,
        align: content.align,
        fill: fill.to_string(),
    });
    let mut object = SurfaceObject::new(body, 0.0, 0.0);
    object.left = left;
    object.top = top;
    object
}

/// Build the stand-in marker for an image without a bitmap.
#[must_use]
pub fn placeholder_object(left: f64, top: f64, width: f64, height: f64) -> SurfaceObject {
    let body = ObjectBody::Placeholder(PlaceholderBody {
        stroke: PLACEHOLDER_STROKE.to_string(),
        fill: PLACEHOLDER_FILL.to_string(),
    });
    let mut object = SurfaceObject::new(body, width.max(1.0), height.max(1.0));
    object.left = left;
    object.top = top;
    object
}

/// Build an image object at its natural size from a decoded bitmap.
#[must_use]
pub fn image_object(left: f64, top: f64, decoded: &DecodedImage) -> SurfaceObject {
    let body = ObjectBody::Image(ImageBody { src: decoded.src.clone() });
    let mut object = SurfaceObject::new(body, decoded.width, decoded.height);
    object.left = left;
    object.top = top;
    object
}

/// Decode `src` and build an image object from it.
///
/// # Errors
///
/// Returns `UnsupportedSource` for an empty source, `Decode` for a bitmap
/// without area, and whatever the loader reports otherwise.
pub async fn load_image_object(loader: &dyn ImageLoader, src: &str) -> Result<SurfaceObject, LoadError> {
    if src.trim().is_empty() {
        return Err(LoadError::UnsupportedSource(src.to_string()));
    }
    let decoded = loader.decode(src).await?;
    if decoded.width <= 0.0 || decoded.height <= 0.0 {
        return Err(LoadError::Decode { src: src.to_string(), reason: "image has no area".into() });
    }
    Ok(image_object(0.0, 0.0, &decoded))
}

// =============================================================================
// DECODE QUEUE
// =============================================================================

/// A decode the scene wants, stamped with a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    pub item_id: ItemId,
    pub src: String,
    pub ticket: u64,
}

/// A settled decode.
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    pub item_id: ItemId,
    pub src: String,
    pub ticket: u64,
    pub result: Result<SurfaceObject, LoadError>,
}

/// Runs decode requests concurrently and yields outcomes as they settle, in
/// completion order.
pub struct DecodeQueue {
    loader: Arc<dyn ImageLoader>,
    inflight: FuturesUnordered<BoxFuture<'static, DecodeOutcome>>,
}

impl DecodeQueue {
    #[must_use]
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        Self { loader, inflight: FuturesUnordered::new() }
    }

    pub fn submit(&mut self, request: DecodeRequest) {
        let loader = Arc::clone(&self.loader);
        self.inflight.push(Box::pin(async move {
            let result = load_image_object(loader.as_ref(), &request.src).await;
            DecodeOutcome { item_id: request.item_id, src: request.src, ticket: request.ticket, result }
        }));
    }

    pub fn extend(&mut self, requests: impl IntoIterator<Item = DecodeRequest>) {
        for request in requests {
            self.submit(request);
        }
    }

    /// The next settled decode, or `None` when nothing is in flight.
    pub async fn next(&mut self) -> Option<DecodeOutcome> {
        self.inflight.next().await
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.inflight.is_empty()
    }
}
