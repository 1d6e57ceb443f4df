use crate::backend::{BackendResult, ChangeEvent, ChangeFeed, ListingTable};
use crate::models::Listing;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What the feed does with a change notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Re-read the whole table
    #[default]
    Refetch,
    /// Apply the changed row to the cached list; falls back to a refetch
    /// when the notification carries no usable row
    Patch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Attempts per fetch, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure
    pub backoff: Duration,
    pub policy: RefreshPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(500),
            policy: RefreshPolicy::Refetch,
        }
    }
}

/// Snapshot published to views
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    pub items: Vec<Listing>,
    pub is_loading: bool,
    pub error_message: Option<String>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_loading: true,
            error_message: None,
        }
    }
}

struct FeedInner {
    table: Arc<dyn ListingTable>,
    options: FetchOptions,
    state: watch::Sender<FeedState>,
    /// Bumped by every fetch; only the latest fetch may publish its result
    generation: AtomicU64,
}

impl FeedInner {
    async fn fetch_with_retry(&self) -> BackendResult<Vec<Listing>> {
        let attempts = self.options.max_attempts.max(1);
        let mut delay = self.options.backoff;
        let mut attempt = 1;

        loop {
            match self.table.list().await {
                Ok(items) => return Ok(items),
                Err(e) if attempt < attempts => {
                    warn!(
                        "Fetching listings failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn refetch(&self) -> BackendResult<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error_message = None;
        });

        let result = self.fetch_with_retry().await;

        let current = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            state.is_loading = false;
            match &result {
                Ok(items) => state.items = items.clone(),
                Err(e) => state.error_message = Some(e.to_string()),
            }
            true
        });

        if !current {
            debug!("Dropping listings from superseded fetch #{}", generation);
            return result.map(|_| ());
        }

        match result {
            Ok(items) => {
                debug!("Loaded {} listings from {}", items.len(), self.table.backend_name());
                Ok(())
            }
            Err(e) => {
                error!("Error fetching listings: {}", e);
                Err(e)
            }
        }
    }

    async fn on_change(&self, event: ChangeEvent) {
        if self.options.policy == RefreshPolicy::Patch {
            // a fetch in flight may predate this change, so supersede it
            let patched = self.state.send_if_modified(|state| {
                !state.is_loading && patch(&mut state.items, &event)
            });
            if patched {
                return;
            }
        }

        // failures are already recorded in the published state
        let _ = self.refetch().await;
    }
}

/// Apply one change to a list kept newest-first. Returns false when the
/// event carries nothing to apply.
pub fn patch(items: &mut Vec<Listing>, event: &ChangeEvent) -> bool {
    match event {
        ChangeEvent::Insert(listing) | ChangeEvent::Update(listing) => {
            items.retain(|item| item.id != listing.id);
            let at = items
                .iter()
                .position(|item| item.created_at < listing.created_at)
                .unwrap_or(items.len());
            items.insert(at, listing.clone());
            true
        }
        ChangeEvent::Delete { id } => {
            items.retain(|item| &item.id != id);
            true
        }
        ChangeEvent::Other => false,
    }
}

/// Keeps an in-memory copy of the listings table current.
///
/// The copy is loaded on [`ListingFeed::start`] and refreshed on every
/// change notification until the feed is shut down or dropped.
pub struct ListingFeed {
    inner: Arc<FeedInner>,
    changes: Arc<dyn ChangeFeed>,
    table_name: String,
    listener: Option<JoinHandle<()>>,
}

impl ListingFeed {
    pub fn new(
        table: Arc<dyn ListingTable>,
        changes: Arc<dyn ChangeFeed>,
        table_name: impl Into<String>,
        options: FetchOptions,
    ) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            inner: Arc::new(FeedInner {
                table,
                options,
                state,
                generation: AtomicU64::new(0),
            }),
            changes,
            table_name: table_name.into(),
            listener: None,
        }
    }

    /// Follow the table's change stream, then load it.
    ///
    /// The subscription is opened first so a write landing during the
    /// initial load still triggers a refresh. A failed load is reported
    /// through the state, not the return value; an error here means the
    /// subscription could not be opened.
    pub async fn start(&mut self) -> BackendResult<()> {
        if self.listener.is_none() {
            let mut subscription = self.changes.subscribe(&self.table_name).await?;
            let inner = self.inner.clone();
            let table = self.table_name.clone();

            self.listener = Some(tokio::spawn(async move {
                while let Some(event) = subscription.recv().await {
                    debug!("Change notification on {}: {:?}", table, event);
                    inner.on_change(event).await;
                }
                info!("Change stream for {} ended", table);
            }));
        }

        let _ = self.inner.refetch().await;
        Ok(())
    }

    /// Manual reload, e.g. the retry button or after an admin mutation
    pub async fn refetch(&self) -> BackendResult<()> {
        self.inner.refetch().await
    }

    pub fn state(&self) -> FeedState {
        self.inner.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<Listing> {
        self.inner.state.borrow().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner.state.borrow().error_message.clone()
    }

    /// Receiver that wakes on every state change
    pub fn watch(&self) -> watch::Receiver<FeedState> {
        self.inner.state.subscribe()
    }

    /// Stop following the change stream
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            info!("Unsubscribed from {} changes", self.table_name);
        }
    }
}

impl Drop for ListingFeed {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Price;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn car(id: &str, hours: i64) -> Listing {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap() + ChronoDuration::hours(hours);
        Listing {
            id: id.to_string(),
            brand: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: 2020,
            price: Price::Number(1.0),
            description: None,
            image_url: None,
            image_urls: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn ids(items: &[Listing]) -> Vec<&str> {
        items.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn patch_inserts_in_creation_order() {
        let mut items = vec![car("c", 3), car("a", 1)];
        assert!(patch(&mut items, &ChangeEvent::Insert(car("d", 4))));
        assert!(patch(&mut items, &ChangeEvent::Insert(car("b", 2))));
        assert_eq!(ids(&items), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn patch_replaces_and_removes_by_id() {
        let mut items = vec![car("b", 2), car("a", 1)];
        let mut edited = car("a", 1);
        edited.model = "Corolla".to_string();

        assert!(patch(&mut items, &ChangeEvent::Update(edited)));
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].model, "Corolla");

        assert!(patch(&mut items, &ChangeEvent::Delete { id: "b".into() }));
        assert_eq!(ids(&items), vec!["a"]);

        assert!(!patch(&mut items, &ChangeEvent::Other));
    }
}
