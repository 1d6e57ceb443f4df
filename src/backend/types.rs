use crate::models::Listing;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Email/password pair submitted from the admin login form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Authenticated admin identity.
///
/// Passed explicitly to every mutation; the token is sent as the bearer
/// credential so row-level policies apply to the signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSession {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AdminSession {
    /// Sessions without an expiry never expire
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// An object to place in storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Row change pushed by the backend for the listings table
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Insert(Listing),
    Update(Listing),
    Delete { id: String },
    /// A change whose row could not be decoded
    Other,
}

/// Live subscription to a table's change stream.
///
/// Dropping the subscription unsubscribes: the background task feeding it
/// is stopped.
#[derive(Debug)]
pub struct ChangeSubscription {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    task: JoinHandle<()>,
}

impl ChangeSubscription {
    pub fn new(events: mpsc::UnboundedReceiver<ChangeEvent>, task: JoinHandle<()>) -> Self {
        Self { events, task }
    }

    /// Next change, or `None` once the stream has closed
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
