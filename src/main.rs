//! `scene-replay`: drive a page session from a JSON script.
//!
//! The script carries the starting page, a fixture table of image sizes the
//! loader pretends to decode, and a list of steps (host reconciles, drops,
//! and user gestures). Every action the engine emits is printed as one JSON
//! line; the final page follows. A built-in host echoes each `ItemsChanged`
//! back as a reconcile, the way a document store would.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use scenesync::{
    Action, DecodedImage, DocumentItem, DropPayload, ImageLoader, ItemId, LoadError, MemorySurface, Orientation, Page,
    PagePoint, PageScene, SceneConfig, SessionError, SessionHandle, Surface, spawn_page_session,
};

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid script or output: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Parser, Debug)]
#[command(name = "scene-replay", about = "Replay a page editing script through the reconciliation engine")]
struct Cli {
    /// Path to the JSON replay script.
    script: PathBuf,

    /// How long to let decodes and commits settle after the last step.
    #[arg(long, env = "SCENE_REPLAY_SETTLE_MS", default_value_t = 500)]
    settle_ms: u64,

    /// Pretty-print emitted JSON.
    #[arg(long)]
    pretty: bool,
}

// =============================================================================
// SCRIPT
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Script {
    page: Page,
    #[serde(default)]
    images: HashMap<String, Fixture>,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fixture {
    width: f64,
    height: f64,
    #[serde(default)]
    delay_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Step {
    /// The host pushes a new document snapshot.
    Reconcile {
        items: Vec<DocumentItem>,
        #[serde(default)]
        selected: Option<ItemId>,
    },
    Drop {
        payload: DropPayload,
        x: f64,
        y: f64,
    },
    Drag {
        item: ItemId,
        dx: f64,
        dy: f64,
    },
    Scale {
        item: ItemId,
        sx: f64,
        sy: f64,
    },
    Rotate {
        item: ItemId,
        angle: f64,
    },
    /// Click an item, or empty space when `item` is absent.
    Select {
        #[serde(default)]
        item: Option<ItemId>,
    },
    /// Enter edit mode on a text item and type into it.
    Type {
        item: ItemId,
        text: String,
    },
    EndEdit,
    /// Delete the active selection.
    Delete,
    Orientation {
        orientation: Orientation,
    },
    Wait {
        ms: u64,
    },
}

/// Pretends to decode the fixture images, honoring their delays.
struct FixtureLoader {
    images: HashMap<String, Fixture>,
}

#[async_trait]
impl ImageLoader for FixtureLoader {
    async fn decode(&self, src: &str) -> Result<DecodedImage, LoadError> {
        let Some(fixture) = self.images.get(src).copied() else {
            return Err(LoadError::Fetch { src: src.to_string(), reason: "no fixture for source".into() });
        };
        sleep(Duration::from_millis(fixture.delay_ms)).await;
        Ok(DecodedImage { src: src.to_string(), width: fixture.width, height: fixture.height })
    }
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "replay failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ReplayError> {
    let raw = tokio::fs::read_to_string(&cli.script).await?;
    let script: Script = serde_json::from_str(&raw)?;
    let config = SceneConfig::from_env();
    let scene = PageScene::new(script.page.id.clone(), MemorySurface::new(), script.page.orientation, config);
    let loader = Arc::new(FixtureLoader { images: script.images });
    let (session, actions, task) = spawn_page_session(scene, loader);

    session.reconcile(script.page.items.clone(), script.page.selected_item_id.clone())?;
    let page = Arc::new(Mutex::new(script.page));
    let host = tokio::spawn(host(Arc::clone(&page), session.clone(), actions, cli.pretty));

    for (index, step) in script.steps.into_iter().enumerate() {
        debug!(step = index, ?step, "replaying step");
        apply_step(&session, &page, step).await?;
    }

    sleep(Duration::from_millis(cli.settle_ms)).await;
    session.shutdown()?;
    let scene = task.await?;
    let emitted = host.await??;

    let page = page.lock().await;
    println!("{}", render(&*page, cli.pretty)?);
    info!(emitted, objects = scene.surface().len(), "replay finished");
    Ok(())
}

/// Print actions and keep the page in step, echoing commits back.
async fn host(
    page: Arc<Mutex<Page>>,
    session: SessionHandle<MemorySurface>,
    mut actions: mpsc::UnboundedReceiver<Action>,
    pretty: bool,
) -> Result<usize, ReplayError> {
    let mut emitted = 0;
    while let Some(action) = actions.recv().await {
        println!("{}", render(&action, pretty)?);
        emitted += 1;
        let mut page = page.lock().await;
        match action {
            Action::ItemsChanged { items, .. } => {
                page.items.clone_from(&items);
                if session.reconcile(items, page.selected_item_id.clone()).is_err() {
                    debug!("session closed; commit not echoed");
                }
            }
            Action::SelectionChanged { item_id, .. } => page.selected_item_id = item_id,
            Action::ImageLoadFailed { item_id, message, .. } => {
                warn!(item_id = %item_id, %message, "image stays a placeholder");
            }
        }
    }
    Ok(emitted)
}

async fn apply_step(
    session: &SessionHandle<MemorySurface>,
    page: &Mutex<Page>,
    step: Step,
) -> Result<(), ReplayError> {
    match step {
        Step::Reconcile { items, selected } => {
            let mut page = page.lock().await;
            page.items.clone_from(&items);
            page.selected_item_id.clone_from(&selected);
            session.reconcile(items, selected)?;
        }
        Step::Drop { payload, x, y } => {
            let item_id = session.ingest(payload, PagePoint::new(x, y)).await?;
            debug!(item_id = %item_id, "drop accepted");
        }
        Step::Drag { item, dx, dy } => {
            session.interact(move |surface, index| {
                if let Some(handle) = index.handle_of(&item) {
                    surface.drag_by(handle, dx, dy);
                } else {
                    warn!(item_id = %item, "drag target not on page");
                }
            })?;
        }
        Step::Scale { item, sx, sy } => {
            session.interact(move |surface, index| {
                if let Some(handle) = index.handle_of(&item) {
                    surface.scale_by(handle, sx, sy);
                } else {
                    warn!(item_id = %item, "scale target not on page");
                }
            })?;
        }
        Step::Rotate { item, angle } => {
            session.interact(move |surface, index| {
                if let Some(handle) = index.handle_of(&item) {
                    surface.rotate_to(handle, angle);
                } else {
                    warn!(item_id = %item, "rotate target not on page");
                }
            })?;
        }
        Step::Select { item } => {
            session.interact(move |surface, index| match item.as_ref().and_then(|id| index.handle_of(id)) {
                Some(handle) => {
                    surface.click(handle);
                }
                None => surface.clear_selection(),
            })?;
        }
        Step::Type { item, text } => {
            session.interact(move |surface, index| {
                let Some(handle) = index.handle_of(&item) else {
                    warn!(item_id = %item, "type target not on page");
                    return;
                };
                if surface.editing_object() != Some(handle) && !surface.enter_editing(handle) {
                    warn!(item_id = %item, "item is not editable text");
                    return;
                }
                surface.type_text(&text);
            })?;
        }
        Step::EndEdit => {
            session.interact(|surface, _| {
                surface.exit_editing();
            })?;
        }
        Step::Delete => {
            session.interact(|surface, _| {
                surface.delete_active();
            })?;
        }
        Step::Orientation { orientation } => session.set_orientation(orientation)?,
        Step::Wait { ms } => sleep(Duration::from_millis(ms)).await,
    }
    Ok(())
}

fn render<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) }
}
