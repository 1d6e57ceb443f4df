use crate::backend::error::BackendResult;
use crate::backend::types::{AdminSession, ChangeSubscription, Credentials, ObjectUpload};
use crate::models::{Listing, ListingRecord};
use async_trait::async_trait;

/// Row access to the listings table
#[async_trait]
pub trait ListingTable: Send + Sync {
    /// All rows, newest `created_at` first
    async fn list(&self) -> BackendResult<Vec<Listing>>;

    async fn insert(&self, record: &ListingRecord, session: &AdminSession) -> BackendResult<Listing>;

    /// Full-record overwrite of the row with `id`
    async fn update(
        &self,
        id: &str,
        record: &ListingRecord,
        session: &AdminSession,
    ) -> BackendResult<Listing>;

    async fn delete(&self, id: &str, session: &AdminSession) -> BackendResult<()>;

    /// Get the name of the backend
    fn backend_name(&self) -> &'static str;
}

/// Image bucket
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        name: &str,
        object: ObjectUpload,
        session: &AdminSession,
    ) -> BackendResult<()>;

    async fn remove(&self, names: &[String], session: &AdminSession) -> BackendResult<()>;

    fn public_url(&self, name: &str) -> String;

    /// Object name behind a public URL: its last path segment
    fn object_name(&self, public_url: &str) -> Option<String> {
        public_url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// Email/password authentication
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> BackendResult<AdminSession>;

    /// Register a seller account. Returns `None` when the backend requires
    /// email confirmation before issuing a session.
    async fn sign_up(&self, credentials: &Credentials) -> BackendResult<Option<AdminSession>>;

    async fn sign_out(&self, session: &AdminSession) -> BackendResult<()>;
}

/// Push notifications of row changes
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, table: &str) -> BackendResult<ChangeSubscription>;
}
