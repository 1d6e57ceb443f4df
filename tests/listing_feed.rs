use autolot::admin::{AdminService, ListingForm};
use autolot::backend::memory::sample_listings;
use autolot::backend::{ChangeEvent, MemoryBackend};
use autolot::catalog::{CatalogQuery, CatalogView};
use autolot::listings::{FeedState, FetchOptions, ListingFeed, RefreshPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

fn feed(backend: &Arc<MemoryBackend>, options: FetchOptions) -> ListingFeed {
    ListingFeed::new(backend.clone(), backend.clone(), "cars", options)
}

fn kia_form() -> ListingForm {
    let mut form = ListingForm::create();
    form.draft.brand = "Kia".into();
    form.draft.model = "Sportage".into();
    form.draft.year = 2022;
    form.draft.price = "15000000".into();
    form
}

async fn wait_until<F>(updates: &mut watch::Receiver<FeedState>, condition: F) -> FeedState
where
    F: FnMut(&FeedState) -> bool,
{
    timeout(Duration::from_secs(5), updates.wait_for(condition))
        .await
        .expect("feed did not reach the expected state")
        .expect("feed closed")
        .clone()
}

#[tokio::test]
async fn start_loads_newest_first() {
    let backend = Arc::new(MemoryBackend::with_sample_listings());
    let mut feed = feed(&backend, FetchOptions::default());
    assert!(feed.is_loading());

    feed.start().await.unwrap();

    let state = feed.state();
    assert!(!state.is_loading);
    assert_eq!(state.error_message, None);
    assert_eq!(state.items.len(), 5);
    assert!(state
        .items
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
}

#[tokio::test]
async fn refetches_when_another_client_writes() {
    let backend = Arc::new(MemoryBackend::with_sample_listings());
    let session = backend.register_admin("a@example.com", "password1");
    let mut feed = feed(&backend, FetchOptions::default());
    feed.start().await.unwrap();
    let mut updates = feed.watch();

    let service = AdminService::new(backend.clone(), backend.clone());
    let created = service.submit(&session, &mut kia_form()).await.unwrap();

    let state = wait_until(&mut updates, |s| s.items.len() == 6 && !s.is_loading).await;
    assert_eq!(state.items[0].id, created.id);

    service.delete(&session, &created).await.unwrap();
    let state = wait_until(&mut updates, |s| s.items.len() == 5 && !s.is_loading).await;
    assert!(state.items.iter().all(|l| l.id != created.id));
}

#[tokio::test(start_paused = true)]
async fn write_during_initial_load_is_picked_up() {
    let backend = Arc::new(MemoryBackend::with_sample_listings());
    let session = backend.register_admin("a@example.com", "password1");
    // the initial list answers late, after the write below has landed
    backend.delay_lists([Duration::from_millis(100)]);
    let mut feed = feed(&backend, FetchOptions::default());
    let mut updates = feed.watch();
    let service = AdminService::new(backend.clone(), backend.clone());

    let (started, created) = tokio::join!(feed.start(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        service.submit(&session, &mut kia_form()).await
    });
    started.unwrap();
    let created = created.unwrap();

    let state = wait_until(&mut updates, |s| {
        !s.is_loading && s.items.iter().any(|l| l.id == created.id)
    })
    .await;
    assert_eq!(state.items.len(), 6);
    assert_eq!(state.error_message, None);
}

#[tokio::test(start_paused = true)]
async fn slow_older_fetch_does_not_overwrite_newer_result() {
    let backend = Arc::new(MemoryBackend::with_sample_listings());
    let session = backend.register_admin("a@example.com", "password1");
    backend.delay_lists([Duration::from_millis(100)]);
    let feed = feed(&backend, FetchOptions::default());
    let service = AdminService::new(backend.clone(), backend.clone());

    let (slow, (fresh, after_fresh)) = tokio::join!(feed.refetch(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        service.submit(&session, &mut kia_form()).await.unwrap();
        let result = feed.refetch().await;
        (result, feed.state())
    });
    slow.unwrap();
    fresh.unwrap();

    assert!(!after_fresh.is_loading);
    assert_eq!(after_fresh.items.len(), 6);

    let state = feed.state();
    assert!(!state.is_loading);
    assert_eq!(state.items.len(), 6);
    assert_eq!(state.items[0].brand, "Kia");
}

#[tokio::test]
async fn patch_policy_applies_changes_without_refetching() {
    let backend = Arc::new(MemoryBackend::with_sample_listings());
    let options = FetchOptions {
        policy: RefreshPolicy::Patch,
        ..FetchOptions::default()
    };
    let mut feed = feed(&backend, options);
    feed.start().await.unwrap();
    let mut updates = feed.watch();

    // a refetch would fail, so only a patch can remove the row
    backend.fail_next_lists(10);
    backend.notify(ChangeEvent::Delete {
        id: "sample-2".to_string(),
    });

    let state = wait_until(&mut updates, |s| s.items.len() == 4).await;
    assert_eq!(state.error_message, None);
    assert!(state.items.iter().all(|l| l.id != "sample-2"));
}

#[tokio::test]
async fn undecodable_change_falls_back_to_refetch() {
    let backend = Arc::new(MemoryBackend::with_sample_listings());
    let options = FetchOptions {
        policy: RefreshPolicy::Patch,
        ..FetchOptions::default()
    };
    let mut feed = feed(&backend, options);
    feed.start().await.unwrap();
    let mut updates = feed.watch();

    backend.fail_next_lists(1);
    backend.notify(ChangeEvent::Other);

    let state = wait_until(&mut updates, |s| s.error_message.is_some()).await;
    assert_eq!(state.items.len(), 5);
    assert!(!state.is_loading);
}

#[tokio::test]
async fn fetch_failure_is_reported_and_recoverable() {
    let backend = Arc::new(MemoryBackend::with_sample_listings());
    backend.fail_next_lists(1);
    let mut feed = feed(&backend, FetchOptions::default());

    feed.start().await.unwrap();
    let state = feed.state();
    assert!(!state.is_loading);
    assert!(state.items.is_empty());
    assert_eq!(
        state.error_message.as_deref(),
        Some("Network error: connection reset")
    );

    feed.refetch().await.unwrap();
    assert_eq!(feed.error_message(), None);
    assert_eq!(feed.items().len(), 5);
}

#[tokio::test]
async fn bounded_retry_recovers_from_transient_failures() {
    let backend = Arc::new(MemoryBackend::with_sample_listings());
    backend.fail_next_lists(2);
    let options = FetchOptions {
        max_attempts: 3,
        backoff: Duration::from_millis(5),
        ..FetchOptions::default()
    };
    let feed = feed(&backend, options);

    feed.refetch().await.unwrap();
    assert_eq!(feed.items().len(), 5);

    backend.fail_next_lists(3);
    assert!(feed.refetch().await.is_err());
    assert_eq!(feed.items().len(), 5);
    assert!(feed.error_message().is_some());
}

#[tokio::test]
async fn shutdown_stops_following_changes() {
    let backend = Arc::new(MemoryBackend::with_sample_listings());
    let mut feed = feed(&backend, FetchOptions::default());
    feed.start().await.unwrap();
    feed.shutdown();

    let mut updates = feed.watch();
    backend.notify(ChangeEvent::Other);

    let changed = timeout(Duration::from_millis(200), updates.changed()).await;
    assert!(changed.is_err(), "feed reacted after shutdown");
}

#[tokio::test]
async fn catalog_view_over_the_feed() {
    let backend = Arc::new(MemoryBackend::with_listings(sample_listings()));
    let mut feed = feed(&backend, FetchOptions::default());
    feed.start().await.unwrap();

    let mut view = CatalogView::new(2);
    view.replace_listings(feed.items());
    view.set_query(CatalogQuery {
        search: "toyota".to_string(),
        ..CatalogQuery::default()
    });

    let titles: Vec<String> = view.visible().iter().map(|l| l.title()).collect();
    assert_eq!(titles, vec!["Toyota Corolla", "Toyota Camry"]);
    assert!(!view.has_more());
}
