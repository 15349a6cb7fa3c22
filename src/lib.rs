//! Scene reconciliation engine for printable pages.
//!
//! Keeps a page's document model (an ordered list of text and image items)
//! and an interactive retained-mode surface in step in both directions:
//! document snapshots are hydrated onto the surface, and user edits on the
//! surface are committed back as new item lists. A per-page hydration fence
//! keeps the two directions from feeding each other. The host wires a
//! [`surface::Surface`] implementation and an [`construct::ImageLoader`] to
//! a [`scene::PageScene`] (or a [`session`] task) and persists the
//! [`scene::Action`]s it gets back.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`item`] | Document model: items, pages, orientation and page size |
//! | [`surface`] | Surface capability trait, objects, patches, events |
//! | [`memory`] | In-memory surface with user-gesture helpers |
//! | [`fence`] | Reentrant hydration fence |
//! | [`construct`] | Object constructors, image loader trait, decode queue |
//! | [`translate`] | Surface object to document item, text scale folding |
//! | [`equality`] | Tolerant, order-independent item list comparison |
//! | [`scene`] | Per-page scene state, side-table, surface events, actions |
//! | [`hydrate`] | Document to surface reconciliation and decode landing |
//! | [`commit`] | Surface to document commits, frame coalescing, debounce |
//! | [`ingest`] | Drop and paste ingestion |
//! | [`session`] | Async per-page driver task |
//! | [`config`] | Engine configuration |
//! | [`consts`] | Shared tolerances, defaults and page constants |

pub mod commit;
pub mod config;
pub mod consts;
pub mod construct;
pub mod equality;
pub mod fence;
pub mod hydrate;
pub mod ingest;
pub mod item;
pub mod memory;
pub mod scene;
pub mod session;
pub mod surface;
pub mod translate;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SceneConfig;
pub use construct::{DecodeQueue, DecodedImage, ImageLoader, LoadError};
pub use ingest::{DropPayload, IngestError, PagePoint};
pub use item::{DocumentItem, ItemId, Orientation, Page, PageId};
pub use memory::MemorySurface;
pub use scene::{Action, PageScene};
pub use session::{SessionError, SessionHandle, spawn_page_session};
pub use surface::Surface;
