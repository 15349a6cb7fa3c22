#![allow(clippy::float_cmp)]

use std::sync::Arc;

use tokio::time::Instant;

use super::*;
use crate::construct::DecodeQueue;
use crate::item::{DocumentItem, PageId};
use crate::testing::{FixedLoader, scene, settle, text_item};

fn committed<S: Surface>(scene: &mut PageScene<S>) -> Vec<DocumentItem> {
    match scene.on_frame() {
        Some(Action::ItemsChanged { items, .. }) => items,
        other => panic!("expected ItemsChanged, got {other:?}"),
    }
}

// =============================================================
// Payloads
// =============================================================

#[test]
fn payloads_parse_from_json() {
    assert_eq!(DropPayload::from_json(r#"{"kind":"text"}"#).unwrap(), DropPayload::Text);
    assert_eq!(DropPayload::from_json(r#"{"kind":"image"}"#).unwrap(), DropPayload::Image);
    assert_eq!(
        DropPayload::from_json(r#"{"kind":"url","src":"https://x.test/a.png"}"#).unwrap(),
        DropPayload::Url { src: "https://x.test/a.png".into() }
    );
}

#[test]
fn unknown_payload_is_rejected() {
    let err = DropPayload::from_json(r#"{"kind":"video"}"#).unwrap_err();
    assert!(matches!(err, IngestError::InvalidPayload(_)));
    assert!(DropPayload::from_json("not json").is_err());
}

#[test]
fn sources_are_validated() {
    assert_eq!(validate_source("  blob:abc ").unwrap(), "blob:abc");
    assert!(validate_source("data:image/png;base64,AAAA").is_ok());
    assert!(matches!(validate_source("   "), Err(IngestError::EmptySource)));
    assert!(matches!(validate_source("ftp://x/a.png"), Err(IngestError::UnsupportedSource(_))));
    assert!(matches!(validate_source("data:text/plain,hi"), Err(IngestError::UnsupportedSource(_))));
}

// =============================================================
// Drops
// =============================================================

#[test]
fn text_drop_creates_selected_item_at_pointer() {
    let mut scene = scene();
    scene.reconcile(&[], None);
    let ingested = scene.ingest(DropPayload::Text, PagePoint::new(100.0, 50.0)).unwrap();
    assert_eq!(
        ingested.selection,
        Some(Action::SelectionChanged { page_id: PageId::from("p1"), item_id: Some(ingested.item_id.clone()) })
    );
    assert!(scene.commit_pending());

    let items = committed(&mut scene);
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.id, ingested.item_id);
    assert_eq!((item.x, item.y), (100.0, 50.0));
    let text = item.as_text().unwrap();
    assert_eq!(text.text, "New text");
    assert_eq!(text.font_size, 32.0);
    assert_eq!(text.font_family, "Inter");
    assert!(scene.process_surface_events(Instant::now()).is_empty());
}

#[test]
fn drop_appends_after_existing_items() {
    let mut scene = scene();
    scene.reconcile(&[text_item("a", 0.0, 0.0, "a")], None);
    let ingested = scene.ingest(DropPayload::Image, PagePoint::new(10.0, 10.0)).unwrap();
    let items = committed(&mut scene);
    assert_eq!(items[0].id, ItemId::from("a"));
    assert_eq!(items[1].id, ingested.item_id);
}

#[test]
fn drop_point_is_clamped_into_page() {
    let mut scene = scene();
    scene.ingest(DropPayload::Text, PagePoint::new(-20.0, 5000.0)).unwrap();
    let items = committed(&mut scene);
    assert_eq!((items[0].x, items[0].y), (0.0, 1056.0));
}

#[test]
fn image_palette_drop_creates_placeholder() {
    let mut scene = scene();
    let ingested = scene.ingest(DropPayload::Image, PagePoint::new(10.0, 20.0)).unwrap();
    let items = committed(&mut scene);
    let item = &items[0];
    assert_eq!(item.id, ingested.item_id);
    assert_eq!((item.width, item.height), (240.0, 240.0));
    assert!(item.src().is_none());
    assert!(item.as_image().unwrap().placeholder);
    assert!(scene.take_decode_requests().is_empty());
}

#[test]
fn rejected_drop_leaves_surface_alone() {
    let mut scene = scene();
    let err = scene.ingest(DropPayload::Url { src: "ftp://x/a.png".into() }, PagePoint::new(0.0, 0.0)).unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedSource(_)));
    assert!(scene.surface().is_empty());
    assert!(!scene.commit_pending());
}

#[tokio::test]
async fn dropped_file_adopts_fitted_natural_size() {
    let mut scene = scene();
    let mut queue = DecodeQueue::new(Arc::new(FixedLoader::new(&[("blob:big", 1600.0, 800.0)])));
    let ingested =
        scene.ingest(DropPayload::File { src: "blob:big".into() }, PagePoint::new(30.0, 40.0)).unwrap();

    let first = committed(&mut scene);
    assert_eq!(first[0].src(), Some("blob:big"));
    assert_eq!((first[0].width, first[0].height), (240.0, 240.0));

    assert!(settle(&mut scene, &mut queue).await.is_empty());
    assert!(scene.commit_pending());
    let items = committed(&mut scene);
    assert_eq!(items[0].id, ingested.item_id);
    assert_eq!((items[0].x, items[0].y), (30.0, 40.0));
    assert_eq!((items[0].width, items[0].height), (400.0, 200.0));
    assert_eq!(scene.selected_item(), Some(ingested.item_id));
}

#[tokio::test]
async fn dropped_file_that_fails_stays_placeholder() {
    let mut scene = scene();
    let mut queue = DecodeQueue::new(Arc::new(FixedLoader::new(&[])));
    scene.ingest(DropPayload::File { src: "blob:gone".into() }, PagePoint::new(0.0, 0.0)).unwrap();
    let actions = settle(&mut scene, &mut queue).await;
    assert!(matches!(actions.as_slice(), [Action::ImageLoadFailed { .. }]));
    let items = committed(&mut scene);
    assert_eq!((items[0].width, items[0].height), (240.0, 240.0));
    assert_eq!(items[0].src(), Some("blob:gone"));
}
