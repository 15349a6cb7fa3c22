#![allow(clippy::float_cmp)]

use std::time::Duration;

use tokio::time::{Instant, timeout};

use super::*;
use crate::memory::MemorySurface;
use crate::testing::{DelayedLoader, FixedLoader, image_item, scene, text_item};

async fn next_items(actions: &mut mpsc::UnboundedReceiver<Action>) -> Vec<DocumentItem> {
    loop {
        match actions.recv().await {
            Some(Action::ItemsChanged { items, .. }) => return items,
            Some(_) => {}
            None => panic!("session closed before a commit"),
        }
    }
}

fn text_of(item: &DocumentItem) -> String {
    item.as_text().map(|text| text.text.clone()).unwrap_or_default()
}

// =============================================================================
// Commit cadence
// =============================================================================

#[tokio::test(start_paused = true)]
async fn text_drop_then_typing_commits_once_per_phase() {
    let (handle, mut actions, task) = spawn_page_session(scene(), Arc::new(FixedLoader::new(&[])));
    handle.reconcile(Vec::new(), None).unwrap();

    let id = handle.ingest(DropPayload::Text, PagePoint::new(100.0, 50.0)).await.unwrap();
    let items = next_items(&mut actions).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, id);
    assert_eq!((items[0].x, items[0].y), (100.0, 50.0));
    assert_eq!(text_of(&items[0]), "New text");
    handle.reconcile(items, Some(id.clone())).unwrap();

    let typed = id.clone();
    handle
        .interact(move |surface: &mut MemorySurface, index| {
            let object = index.handle_of(&typed).unwrap();
            surface.enter_editing(object);
            surface.clear_text();
            surface.type_text("Hello");
            surface.exit_editing();
        })
        .unwrap();

    let items = next_items(&mut actions).await;
    assert_eq!(items.len(), 1);
    assert_eq!(text_of(&items[0]), "Hello");
    assert!(timeout(Duration::from_secs(1), next_items(&mut actions)).await.is_err());

    handle.shutdown().unwrap();
    let scene = task.await.unwrap();
    assert_eq!(text_of(&scene.document()[0]), "Hello");
}

#[tokio::test(start_paused = true)]
async fn live_typing_commits_after_debounce() {
    let (handle, mut actions, _task) = spawn_page_session(scene(), Arc::new(FixedLoader::new(&[])));
    handle.reconcile(vec![text_item("t", 0.0, 0.0, "Hi")], None).unwrap();
    handle
        .interact(|surface: &mut MemorySurface, index| {
            let object = index.handle_of(&ItemId::from("t")).unwrap();
            surface.enter_editing(object);
            surface.type_text("!!");
        })
        .unwrap();

    let start = Instant::now();
    let items = next_items(&mut actions).await;
    assert!(start.elapsed() >= Duration::from_millis(120));
    assert_eq!(text_of(&items[0]), "Hi!!");
}

#[tokio::test(start_paused = true)]
async fn drag_is_committed_on_a_frame() {
    let (handle, mut actions, _task) = spawn_page_session(scene(), Arc::new(FixedLoader::new(&[])));
    handle.reconcile(vec![text_item("t", 10.0, 10.0, "Hi")], None).unwrap();
    handle
        .interact(|surface: &mut MemorySurface, index| {
            let object = index.handle_of(&ItemId::from("t")).unwrap();
            surface.drag_by(object, 5.0, 5.0);
            surface.drag_by(object, 5.0, 5.0);
        })
        .unwrap();
    let items = next_items(&mut actions).await;
    assert_eq!((items[0].x, items[0].y), (20.0, 20.0));
    assert!(timeout(Duration::from_millis(200), next_items(&mut actions)).await.is_err());
}

// =============================================================================
// Decodes
// =============================================================================

#[tokio::test(start_paused = true)]
async fn concurrent_decodes_settle_in_document_order() {
    let loader = DelayedLoader::new(&[("blob:a", 40.0, 40.0, 50), ("blob:b", 40.0, 40.0, 10)]);
    let (handle, _actions, task) = spawn_page_session(scene(), Arc::new(loader));
    handle.reconcile(vec![image_item("a", None), image_item("b", None)], None).unwrap();
    handle.reconcile(vec![image_item("a", Some("blob:a")), image_item("b", Some("blob:b"))], None).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.shutdown().unwrap();
    let scene = task.await.unwrap();

    assert_eq!(scene.paint_order_ids(), vec![ItemId::from("a"), ItemId::from("b")]);
    for object in scene.surface().paint_order() {
        assert!(scene.surface().object(object).unwrap().image_src().is_some());
    }
    assert_eq!(scene.surface().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn load_failure_is_forwarded() {
    let (handle, mut actions, _task) = spawn_page_session(scene(), Arc::new(FixedLoader::new(&[])));
    handle.reconcile(vec![image_item("a", Some("blob:missing"))], None).unwrap();
    match actions.recv().await {
        Some(Action::ImageLoadFailed { item_id, .. }) => assert_eq!(item_id, ItemId::from("a")),
        other => panic!("expected ImageLoadFailed, got {other:?}"),
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn rejected_drop_returns_ingest_error() {
    let (handle, _actions, _task) = spawn_page_session(scene(), Arc::new(FixedLoader::new(&[])));
    let err = handle.ingest(DropPayload::Url { src: "ftp://x".into() }, PagePoint::new(0.0, 0.0)).await.unwrap_err();
    assert!(matches!(err, SessionError::Ingest(IngestError::UnsupportedSource(_))));
}

#[tokio::test(start_paused = true)]
async fn orientation_change_reaches_surface() {
    let (handle, _actions, task) = spawn_page_session(scene(), Arc::new(FixedLoader::new(&[])));
    handle.set_orientation(Orientation::Landscape).unwrap();
    handle.shutdown().unwrap();
    let scene = task.await.unwrap();
    assert_eq!(scene.surface().dimensions(), (1056.0, 816.0));
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_pending_typing_and_closes() {
    let (handle, mut actions, task) = spawn_page_session(scene(), Arc::new(FixedLoader::new(&[])));
    handle.reconcile(vec![text_item("t", 0.0, 0.0, "")], None).unwrap();
    handle
        .interact(|surface: &mut MemorySurface, index| {
            let object = index.handle_of(&ItemId::from("t")).unwrap();
            surface.enter_editing(object);
            surface.type_text("x");
        })
        .unwrap();
    handle.shutdown().unwrap();
    task.await.unwrap();

    let items = next_items(&mut actions).await;
    assert_eq!(text_of(&items[0]), "x");
    assert!(matches!(handle.reconcile(Vec::new(), None), Err(SessionError::Closed)));
}
