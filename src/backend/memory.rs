use crate::backend::error::{BackendError, BackendResult};
use crate::backend::traits::{AuthProvider, ChangeFeed, ListingTable, ObjectStorage};
use crate::backend::types::{AdminSession, ChangeEvent, ChangeSubscription, Credentials, ObjectUpload};
use crate::models::{Listing, ListingRecord, Price};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

const PUBLIC_BASE: &str = "memory://car-images";

/// Backend call recorded by [`MemoryBackend`], in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Insert(String),
    Update(String),
    DeleteRow(String),
    Upload(String),
    RemoveObjects(Vec<String>),
}

#[derive(Debug, Default)]
struct FailurePlan {
    failed_lists: usize,
    uploads_before_failure: Option<usize>,
    fail_removals: bool,
    list_delays: VecDeque<std::time::Duration>,
}

/// In-process stand-in for the managed backend.
///
/// Used by demo mode and tests. Rows, objects and accounts live in memory,
/// changes are fanned out over a broadcast channel, and failures can be
/// scheduled for list, upload and remove calls.
pub struct MemoryBackend {
    rows: Mutex<Vec<Listing>>,
    objects: Mutex<BTreeMap<String, ObjectUpload>>,
    accounts: Mutex<HashMap<String, (String, String)>>,
    tokens: Mutex<HashSet<String>>,
    journal: Mutex<Vec<Operation>>,
    failures: Mutex<FailurePlan>,
    changes: broadcast::Sender<ChangeEvent>,
    next_id: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            rows: Mutex::new(Vec::new()),
            objects: Mutex::new(BTreeMap::new()),
            accounts: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashSet::new()),
            journal: Mutex::new(Vec::new()),
            failures: Mutex::new(FailurePlan::default()),
            changes,
            next_id: AtomicU64::new(1),
        }
    }

    /// Backend pre-filled with rows, kept newest first
    pub fn with_listings(listings: Vec<Listing>) -> Self {
        let backend = Self::new();
        {
            let mut rows = lock(&backend.rows);
            rows.extend(listings);
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        backend
    }

    /// Demo inventory used when no project is configured
    pub fn with_sample_listings() -> Self {
        info!("📋 Seeding in-memory backend with sample listings");
        Self::with_listings(sample_listings())
    }

    /// Register an admin account and return a signed-in session for it
    pub fn register_admin(&self, email: &str, password: &str) -> AdminSession {
        let user_id = format!("user-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.accounts).insert(email.to_string(), (password.to_string(), user_id.clone()));
        self.issue_session(user_id, email)
    }

    /// Fail the next `count` list calls
    pub fn fail_next_lists(&self, count: usize) {
        lock(&self.failures).failed_lists = count;
    }

    /// Let `count` more uploads succeed, then fail every upload after them
    pub fn fail_uploads_after(&self, count: usize) {
        lock(&self.failures).uploads_before_failure = Some(count);
    }

    /// Answer the next list calls late, one delay per call. Rows are read
    /// before the wait, like a response that is slow to arrive.
    pub fn delay_lists(&self, delays: impl IntoIterator<Item = std::time::Duration>) {
        lock(&self.failures).list_delays.extend(delays);
    }

    pub fn fail_removals(&self, fail: bool) {
        lock(&self.failures).fail_removals = fail;
    }

    pub fn journal(&self) -> Vec<Operation> {
        lock(&self.journal).clone()
    }

    pub fn rows(&self) -> Vec<Listing> {
        lock(&self.rows).clone()
    }

    pub fn object_names(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    /// Push a change notification as if another client had written the row
    pub fn notify(&self, event: ChangeEvent) {
        let _ = self.changes.send(event);
    }

    fn issue_session(&self, user_id: String, email: &str) -> AdminSession {
        let token = format!("token-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.tokens).insert(token.clone());
        AdminSession {
            user_id,
            email: Some(email.to_string()),
            access_token: token,
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::hours(1)),
        }
    }

    fn authorize(&self, session: &AdminSession) -> BackendResult<()> {
        if lock(&self.tokens).contains(&session.access_token) {
            Ok(())
        } else {
            Err(BackendError::Unauthorized("Invalid or expired session".to_string()))
        }
    }

    fn record(&self, op: Operation) {
        lock(&self.journal).push(op);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl ListingTable for MemoryBackend {
    async fn list(&self) -> BackendResult<Vec<Listing>> {
        let delay = {
            let mut failures = lock(&self.failures);
            if failures.failed_lists > 0 {
                failures.failed_lists -= 1;
                return Err(BackendError::Network("connection reset".to_string()));
            }
            failures.list_delays.pop_front()
        };

        let rows = self.rows();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(rows)
    }

    async fn insert(&self, record: &ListingRecord, session: &AdminSession) -> BackendResult<Listing> {
        self.authorize(session)?;

        let id = format!("car-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let listing = record.clone().into_listing(id.clone(), record.updated_at);
        lock(&self.rows).insert(0, listing.clone());

        self.record(Operation::Insert(id));
        self.notify(ChangeEvent::Insert(listing.clone()));
        Ok(listing)
    }

    async fn update(
        &self,
        id: &str,
        record: &ListingRecord,
        session: &AdminSession,
    ) -> BackendResult<Listing> {
        self.authorize(session)?;

        let listing = {
            let mut rows = lock(&self.rows);
            let row = rows
                .iter_mut()
                .find(|row| row.id == id)
                .ok_or_else(|| BackendError::NotFound(format!("listing {}", id)))?;
            *row = record.clone().into_listing(row.id.clone(), row.created_at);
            row.clone()
        };

        self.record(Operation::Update(id.to_string()));
        self.notify(ChangeEvent::Update(listing.clone()));
        Ok(listing)
    }

    async fn delete(&self, id: &str, session: &AdminSession) -> BackendResult<()> {
        self.authorize(session)?;

        {
            let mut rows = lock(&self.rows);
            let before = rows.len();
            rows.retain(|row| row.id != id);
            if rows.len() == before {
                return Err(BackendError::NotFound(format!("listing {}", id)));
            }
        }

        self.record(Operation::DeleteRow(id.to_string()));
        self.notify(ChangeEvent::Delete { id: id.to_string() });
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn upload(
        &self,
        name: &str,
        object: ObjectUpload,
        session: &AdminSession,
    ) -> BackendResult<()> {
        self.authorize(session)?;

        {
            let mut failures = lock(&self.failures);
            match failures.uploads_before_failure.as_mut() {
                Some(0) => {
                    return Err(BackendError::Storage(format!("upload of {} rejected", name)));
                }
                Some(remaining) => *remaining -= 1,
                None => {}
            }
        }

        let mut objects = lock(&self.objects);
        if objects.contains_key(name) {
            return Err(BackendError::Storage(format!("{} already exists", name)));
        }
        objects.insert(name.to_string(), object);
        drop(objects);

        debug!("Stored object {}", name);
        self.record(Operation::Upload(name.to_string()));
        Ok(())
    }

    async fn remove(&self, names: &[String], session: &AdminSession) -> BackendResult<()> {
        self.authorize(session)?;
        self.record(Operation::RemoveObjects(names.to_vec()));

        if lock(&self.failures).fail_removals {
            return Err(BackendError::Storage("bucket unavailable".to_string()));
        }

        let mut objects = lock(&self.objects);
        for name in names {
            objects.remove(name);
        }
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}/{}", PUBLIC_BASE, name)
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in(&self, credentials: &Credentials) -> BackendResult<AdminSession> {
        let user_id = {
            let accounts = lock(&self.accounts);
            match accounts.get(&credentials.email) {
                Some((password, user_id)) if *password == credentials.password => user_id.clone(),
                _ => {
                    return Err(BackendError::Unauthorized(
                        "Invalid login credentials".to_string(),
                    ))
                }
            }
        };
        Ok(self.issue_session(user_id, &credentials.email))
    }

    async fn sign_up(&self, credentials: &Credentials) -> BackendResult<Option<AdminSession>> {
        if lock(&self.accounts).contains_key(&credentials.email) {
            return Err(BackendError::Validation("User already registered".to_string()));
        }
        if credentials.password.len() < 6 {
            return Err(BackendError::Validation(
                "Password should be at least 6 characters".to_string(),
            ));
        }
        Ok(Some(self.register_admin(&credentials.email, &credentials.password)))
    }

    async fn sign_out(&self, session: &AdminSession) -> BackendResult<()> {
        lock(&self.tokens).remove(&session.access_token);
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for MemoryBackend {
    async fn subscribe(&self, table: &str) -> BackendResult<ChangeSubscription> {
        let mut source = self.changes.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        debug!("In-memory subscription to {}", table);

        let task = tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    // a lagging subscriber still needs to hear that something changed
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        if tx.send(ChangeEvent::Other).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(ChangeSubscription::new(rx, task))
    }
}

/// Sample inventory for demo mode
pub fn sample_listings() -> Vec<Listing> {
    let base = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).single().unwrap_or_else(Utc::now);
    let entry = |id: &str, brand: &str, model: &str, year: i32, price: Price, days: i64, description: &str| {
        let at = base + Duration::days(days);
        Listing {
            id: id.to_string(),
            brand: brand.to_string(),
            model: model.to_string(),
            year,
            price,
            description: Some(description.to_string()),
            image_url: Some(format!("{}/{}.jpg", PUBLIC_BASE, id)),
            image_urls: Some(vec![format!("{}/{}.jpg", PUBLIC_BASE, id)]),
            created_at: at,
            updated_at: at,
        }
    };

    vec![
        entry("sample-1", "Toyota", "Camry", 2020, Price::Number(5_000_000.0), 0,
            "Foreign used. Full option, leather seats, reverse camera."),
        entry("sample-2", "Honda", "Accord", 2018, Price::Number(4_000_000.0), 3,
            "Clean title. Accident free with complete service history."),
        entry("sample-3", "Lexus", "RX 350", 2019, Price::Text("18500000".to_string()), 7,
            "Panoramic roof.\nThird key included.\nNew tyres."),
        entry("sample-4", "Mercedes-Benz", "C300", 2017, Price::Number(12_750_000.0), 10,
            "AMG package, ambient lighting, keyless entry."),
        entry("sample-5", "Toyota", "Corolla", 2015, Price::Number(3_200_000.0), 14,
            "Nigerian used, first body, cold AC."),
    ]
}
