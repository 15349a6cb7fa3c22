use super::*;

#[test]
fn new_fence_is_open() {
    let fence = HydrationFence::new();
    assert!(!fence.is_fenced());
    assert_eq!(fence.depth(), 0);
}

#[test]
fn enter_exit_counts() {
    let fence = HydrationFence::new();
    fence.enter();
    fence.enter();
    assert_eq!(fence.depth(), 2);
    fence.exit();
    assert!(fence.is_fenced());
    fence.exit();
    assert!(!fence.is_fenced());
}

#[test]
fn unbalanced_exit_does_not_underflow() {
    let fence = HydrationFence::new();
    fence.exit();
    assert_eq!(fence.depth(), 0);
    fence.enter();
    assert!(fence.is_fenced());
}

#[test]
fn nested_guards_release_only_at_outermost() {
    let fence = HydrationFence::new();
    let outer = fence.guard();
    {
        let _inner = fence.guard();
        assert_eq!(fence.depth(), 2);
    }
    assert!(fence.is_fenced());
    drop(outer);
    assert!(!fence.is_fenced());
}

#[test]
fn with_fence_returns_value_and_releases() {
    let fence = HydrationFence::new();
    let seen = fence.with_fence(|| fence.is_fenced());
    assert!(seen);
    assert!(!fence.is_fenced());
}

#[test]
fn with_fence_is_reentrant() {
    let fence = HydrationFence::new();
    let depth = fence.with_fence(|| fence.with_fence(|| fence.depth()));
    assert_eq!(depth, 2);
    assert_eq!(fence.depth(), 0);
}

#[test]
fn with_fence_releases_on_panic() {
    let fence = HydrationFence::new();
    let inner = fence.clone();
    let result = std::panic::catch_unwind(move || {
        inner.with_fence(|| panic!("boom"));
    });
    assert!(result.is_err());
    assert!(!fence.is_fenced());
}

#[test]
fn clones_share_the_counter() {
    let fence = HydrationFence::new();
    let other = fence.clone();
    let _guard = other.guard();
    assert!(fence.is_fenced());
}

#[tokio::test]
async fn with_fence_async_holds_across_await() {
    let fence = HydrationFence::new();
    let probe = fence.clone();
    let depth = fence
        .with_fence_async(async move {
            tokio::task::yield_now().await;
            probe.depth()
        })
        .await;
    assert_eq!(depth, 1);
    assert!(!fence.is_fenced());
}

#[tokio::test]
async fn with_fence_async_releases_on_error() {
    let fence = HydrationFence::new();
    let result: Result<(), &str> = fence.with_fence_async(async { Err("decode failed") }).await;
    assert!(result.is_err());
    assert!(!fence.is_fenced());
}

#[tokio::test]
async fn with_fence_async_releases_when_dropped() {
    let fence = HydrationFence::new();
    let work = fence.with_fence_async(std::future::pending::<()>());
    let timed_out = tokio::time::timeout(std::time::Duration::from_millis(1), work).await;
    assert!(timed_out.is_err());
    assert!(!fence.is_fenced());
}
