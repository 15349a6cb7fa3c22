//! Async per-page driver.
//!
//! DESIGN
//! ======
//! One tokio task owns a [`PageScene`] and a [`DecodeQueue`]. It selects over
//! host commands, decode completions, the text debounce deadline, and a frame
//! ticker. After every wake-up it hands new decode requests to the queue,
//! handles queued surface events, and forwards the resulting [`Action`]s.
//! Pages never share state; each gets its own task.
//!
//! The frame ticker uses `MissedTickBehavior::Skip`: a stalled page flushes
//! one coalesced write when it wakes up, not a burst.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep_until};
use tracing::{debug, info};

use crate::construct::{DecodeQueue, ImageLoader};
use crate::ingest::{DropPayload, IngestError, PagePoint};
use crate::item::{DocumentItem, ItemId, Orientation};
use crate::scene::{Action, PageScene, SceneIndex};
use crate::surface::Surface;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("page session closed")]
    Closed,
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

/// User-side code run against the surface inside the session task.
pub type Interaction<S> = Box<dyn FnOnce(&mut S, &SceneIndex) + Send>;

pub enum SessionCommand<S> {
    Reconcile { items: Vec<DocumentItem>, selected: Option<ItemId> },
    Interact(Interaction<S>),
    Ingest { payload: DropPayload, at: PagePoint, reply: oneshot::Sender<Result<ItemId, IngestError>> },
    SetOrientation(Orientation),
    Shutdown,
}

/// Cloneable sender for one page session.
pub struct SessionHandle<S> {
    tx: mpsc::UnboundedSender<SessionCommand<S>>,
}

impl<S> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<S> SessionHandle<S> {
    fn send(&self, command: SessionCommand<S>) -> Result<(), SessionError> {
        self.tx.send(command).map_err(|_| SessionError::Closed)
    }

    /// Push a document snapshot to the page.
    ///
    /// # Errors
    ///
    /// `Closed` if the session has stopped.
    pub fn reconcile(&self, items: Vec<DocumentItem>, selected: Option<ItemId>) -> Result<(), SessionError> {
        self.send(SessionCommand::Reconcile { items, selected })
    }

    /// Run user input against the surface.
    ///
    /// # Errors
    ///
    /// `Closed` if the session has stopped.
    pub fn interact(&self, f: impl FnOnce(&mut S, &SceneIndex) + Send + 'static) -> Result<(), SessionError> {
        self.send(SessionCommand::Interact(Box::new(f)))
    }

    /// Drop a payload on the page and wait for the new item's id.
    ///
    /// # Errors
    ///
    /// `Closed` if the session has stopped, `Ingest` if the drop is rejected.
    pub async fn ingest(&self, payload: DropPayload, at: PagePoint) -> Result<ItemId, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Ingest { payload, at, reply })?;
        let result = rx.await.map_err(|_| SessionError::Closed)?;
        Ok(result?)
    }

    /// # Errors
    ///
    /// `Closed` if the session has stopped.
    pub fn set_orientation(&self, orientation: Orientation) -> Result<(), SessionError> {
        self.send(SessionCommand::SetOrientation(orientation))
    }

    /// Flush outstanding commits and stop the task.
    ///
    /// # Errors
    ///
    /// `Closed` if the session has already stopped.
    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown)
    }
}

/// Spawn the driver task for `scene`. The join handle yields the scene back
/// once the session stops.
pub fn spawn_page_session<S>(
    scene: PageScene<S>,
    loader: Arc<dyn ImageLoader>,
) -> (SessionHandle<S>, mpsc::UnboundedReceiver<Action>, JoinHandle<PageScene<S>>)
where
    S: Surface + Send + 'static,
{
    let (tx, commands) = mpsc::unbounded_channel();
    let (actions, action_rx) = mpsc::unbounded_channel();
    let queue = DecodeQueue::new(loader);
    let task = tokio::spawn(run(scene, queue, commands, actions));
    (SessionHandle { tx }, action_rx, task)
}

async fn run<S: Surface>(
    mut scene: PageScene<S>,
    mut queue: DecodeQueue,
    mut commands: mpsc::UnboundedReceiver<SessionCommand<S>>,
    actions: mpsc::UnboundedSender<Action>,
) -> PageScene<S> {
    let mut frames = interval(scene.config().frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(page_id = %scene.page_id(), "page session started");

    loop {
        let deadline = scene.debounce_deadline();
        let mut out = Vec::new();

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                if !apply_command(&mut scene, command, &mut out) {
                    break;
                }
            }
            Some(outcome) = queue.next(), if !queue.is_idle() => {
                out.extend(scene.apply_decoded(outcome));
            }
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                scene.on_debounce_elapsed(Instant::now());
            }
            _ = frames.tick() => {
                out.extend(scene.on_frame());
            }
        }

        queue.extend(scene.take_decode_requests());
        out.extend(scene.process_surface_events(Instant::now()));
        forward(&actions, out);
    }

    forward(&actions, scene.flush(Instant::now()));
    info!(page_id = %scene.page_id(), pending_decodes = queue.len(), "page session stopped");
    scene
}

/// Apply one host command. Returns `false` on shutdown.
fn apply_command<S: Surface>(scene: &mut PageScene<S>, command: SessionCommand<S>, out: &mut Vec<Action>) -> bool {
    match command {
        SessionCommand::Reconcile { items, selected } => {
            out.extend(scene.reconcile(&items, selected.as_ref()));
        }
        SessionCommand::Interact(f) => {
            scene.interact(|surface, index| f(surface, index));
        }
        SessionCommand::Ingest { payload, at, reply } => {
            let result = scene.ingest(payload, at).map(|ingested| {
                out.extend(ingested.selection);
                ingested.item_id
            });
            if reply.send(result).is_err() {
                debug!("ingest caller went away before the reply");
            }
        }
        SessionCommand::SetOrientation(orientation) => scene.set_orientation(orientation),
        SessionCommand::Shutdown => return false,
    }
    true
}

fn forward(actions: &mpsc::UnboundedSender<Action>, out: Vec<Action>) {
    for action in out {
        if actions.send(action).is_err() {
            debug!("action receiver dropped");
            return;
        }
    }
}
