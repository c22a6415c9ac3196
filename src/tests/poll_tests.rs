use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn key(id: &str, kind: PollKind) -> PollKey {
    PollKey::new(WorkspaceId::new(id), kind)
}

fn counting_body(
    ticks: Arc<AtomicUsize>,
    period: Duration,
) -> impl FnOnce(CancellationToken) -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> {
    move |cancel| {
        Box::pin(async move {
            let mut interval = ticker(period, true);
            while next_tick(&mut interval, &cancel).await {
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        })
    }
}

#[tokio::test(start_paused = true)]
async fn stop_halts_the_task() {
    let registry = PollRegistry::new();
    let ticks = Arc::new(AtomicUsize::new(0));
    let handle = registry.spawn(
        key("1", PollKind::Logs),
        counting_body(ticks.clone(), Duration::from_millis(100)),
    );

    tokio::time::sleep(Duration::from_millis(350)).await;
    let seen = ticks.load(Ordering::SeqCst);
    assert!(seen >= 3, "expected ticks before stop, got {seen}");

    handle.stop();
    assert!(!handle.is_active());
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), seen);
}

#[tokio::test(start_paused = true)]
async fn second_spawn_for_same_key_cancels_the_first() {
    let registry = PollRegistry::new();
    let first_ticks = Arc::new(AtomicUsize::new(0));
    let second_ticks = Arc::new(AtomicUsize::new(0));

    let first = registry.spawn(
        key("1", PollKind::Lifecycle),
        counting_body(first_ticks.clone(), Duration::from_millis(100)),
    );
    tokio::time::sleep(Duration::from_millis(150)).await;

    let second = registry.spawn(
        key("1", PollKind::Lifecycle),
        counting_body(second_ticks.clone(), Duration::from_millis(100)),
    );
    assert!(!first.is_active());
    assert!(second.is_active());
    assert_eq!(registry.live_count(), 1);

    let frozen = first_ticks.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(first_ticks.load(Ordering::SeqCst), frozen);
    assert!(second_ticks.load(Ordering::SeqCst) >= 3);
}

#[tokio::test(start_paused = true)]
async fn different_kinds_for_same_workspace_coexist() {
    let registry = PollRegistry::new();
    let a = registry.spawn(
        key("1", PollKind::Lifecycle),
        counting_body(Arc::new(AtomicUsize::new(0)), Duration::from_millis(100)),
    );
    let b = registry.spawn(
        key("1", PollKind::Logs),
        counting_body(Arc::new(AtomicUsize::new(0)), Duration::from_millis(100)),
    );
    assert!(a.is_active());
    assert!(b.is_active());
    assert_eq!(registry.live_count(), 2);

    registry.cancel_all();
    assert!(!a.is_active());
    assert!(!b.is_active());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_cancels_the_poll() {
    let registry = PollRegistry::new();
    let k = key("9", PollKind::Logs);
    let handle = registry.spawn(
        k.clone(),
        counting_body(Arc::new(AtomicUsize::new(0)), Duration::from_millis(100)),
    );
    assert!(registry.is_live(&k));
    drop(handle);
    assert!(!registry.is_live(&k));
}

#[tokio::test(start_paused = true)]
async fn slow_ticks_are_skipped_not_queued() {
    let period = Duration::from_millis(100);
    let cancel = CancellationToken::new();
    let mut interval = ticker(period, false);

    let started = Instant::now();
    assert!(next_tick(&mut interval, &cancel).await);
    assert!(started.elapsed() >= period);

    // Simulates a fetch spanning several periods.
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(next_tick(&mut interval, &cancel).await);
    let after_slow = Instant::now();
    assert!(next_tick(&mut interval, &cancel).await);
    assert!(after_slow.elapsed() > Duration::ZERO);

    cancel.cancel();
    assert!(!next_tick(&mut interval, &cancel).await);
}
