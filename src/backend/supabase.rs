use crate::backend::error::{BackendError, BackendResult};
use crate::backend::realtime;
use crate::backend::traits::{AuthProvider, ChangeFeed, ListingTable, ObjectStorage};
use crate::backend::types::{AdminSession, ChangeSubscription, Credentials, ObjectUpload};
use crate::config::Config;
use crate::models::{Listing, ListingRecord, LISTING_COLUMNS};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Client for a Supabase project: PostgREST table, storage bucket, GoTrue
/// auth and the realtime change stream.
pub struct SupabaseClient {
    client: Client,
    base_url: Url,
    anon_key: String,
    table: String,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
    // signup without a session returns the bare user object
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

impl SupabaseClient {
    /// Create a client for the project named in the configuration
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.supabase_url)
            .with_context(|| format!("Invalid SUPABASE_URL: {}", config.supabase_url))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!("autolot/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            anon_key: config.supabase_anon_key.clone(),
            table: config.table.clone(),
            bucket: config.bucket.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> BackendResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Validation(format!("Invalid endpoint {}: {}", path, e)))
    }

    fn table_url(&self) -> BackendResult<Url> {
        self.endpoint(&format!("rest/v1/{}", self.table))
    }

    fn row_url(&self, id: &str) -> BackendResult<Url> {
        let mut url = self.table_url()?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));
        Ok(url)
    }

    /// Attach project key and bearer token; anonymous calls use the anon key
    fn authorize(&self, request: RequestBuilder, session: Option<&AdminSession>) -> RequestBuilder {
        let token = session
            .map(|s| s.access_token.as_str())
            .unwrap_or(self.anon_key.as_str());

        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    async fn read_rows(&self, response: Response) -> BackendResult<Vec<Listing>> {
        let response = check(response).await?;
        Ok(response.json::<Vec<Listing>>().await?)
    }

    async fn single_row(&self, response: Response, id: &str) -> BackendResult<Listing> {
        self.read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("listing {}", id)))
    }

    fn session_from(&self, body: TokenResponse) -> Option<AdminSession> {
        let access_token = body.access_token?;
        let user = body.user?;

        Some(AdminSession {
            user_id: user.id,
            email: user.email,
            access_token,
            refresh_token: body.refresh_token,
            expires_at: body
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        })
    }
}

/// Pass successful responses through; turn failures into a backend error
async fn check(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("Backend returned status {}: {}", status, body);
    Err(BackendError::from_status(status, error_message(&body, status)))
}

async fn check_storage(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("Storage returned status {}: {}", status, body);
    Err(BackendError::from_storage_status(status, error_message(&body, status)))
}

/// Best human-readable message from a PostgREST, storage or GoTrue error body
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();

    parsed
        .as_ref()
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        })
}

#[async_trait]
impl ListingTable for SupabaseClient {
    async fn list(&self) -> BackendResult<Vec<Listing>> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("select", LISTING_COLUMNS)
            .append_pair("order", "created_at.desc");

        debug!("Fetching listings: {}", url);

        let response = self.authorize(self.client.get(url), None).send().await?;
        let rows = self.read_rows(response).await?;

        debug!("Fetched {} listings", rows.len());
        Ok(rows)
    }

    async fn insert(&self, record: &ListingRecord, session: &AdminSession) -> BackendResult<Listing> {
        let response = self
            .authorize(self.client.post(self.table_url()?), Some(session))
            .header("Prefer", "return=representation")
            .json(&[record])
            .send()
            .await?;

        let listing = self.single_row(response, "insert").await?;
        info!("Created listing {} ({})", listing.id, listing.title());
        Ok(listing)
    }

    async fn update(
        &self,
        id: &str,
        record: &ListingRecord,
        session: &AdminSession,
    ) -> BackendResult<Listing> {
        let response = self
            .authorize(self.client.patch(self.row_url(id)?), Some(session))
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        let listing = self.single_row(response, id).await?;
        info!("Updated listing {}", id);
        Ok(listing)
    }

    async fn delete(&self, id: &str, session: &AdminSession) -> BackendResult<()> {
        let response = self
            .authorize(self.client.delete(self.row_url(id)?), Some(session))
            .header("Prefer", "return=representation")
            .send()
            .await?;

        self.single_row(response, id).await?;
        info!("Deleted listing {}", id);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Supabase"
    }
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    async fn upload(
        &self,
        name: &str,
        object: ObjectUpload,
        session: &AdminSession,
    ) -> BackendResult<()> {
        let url = self.endpoint(&format!("storage/v1/object/{}/{}", self.bucket, name))?;
        let size = object.bytes.len();

        let response = self
            .authorize(self.client.post(url), Some(session))
            .header("Content-Type", object.content_type)
            .header("x-upsert", "false")
            .body(object.bytes)
            .send()
            .await
            .map_err(|e| BackendError::Storage(e.to_string()))?;

        check_storage(response).await?;
        debug!("Uploaded {} ({} bytes)", name, size);
        Ok(())
    }

    async fn remove(&self, names: &[String], session: &AdminSession) -> BackendResult<()> {
        if names.is_empty() {
            return Ok(());
        }

        let url = self.endpoint(&format!("storage/v1/object/{}", self.bucket))?;
        let response = self
            .authorize(self.client.delete(url), Some(session))
            .json(&json!({ "prefixes": names }))
            .send()
            .await
            .map_err(|e| BackendError::Storage(e.to_string()))?;

        check_storage(response).await?;
        debug!("Removed {} objects from {}", names.len(), self.bucket);
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.bucket,
            name
        )
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn sign_in(&self, credentials: &Credentials) -> BackendResult<AdminSession> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .authorize(self.client.post(url), None)
            .json(credentials)
            .send()
            .await?;

        let body: TokenResponse = check(response).await?.json().await?;
        let session = self
            .session_from(body)
            .ok_or_else(|| BackendError::Unauthorized("No session was issued".to_string()))?;

        info!("Signed in as {}", session.email.as_deref().unwrap_or(&session.user_id));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> BackendResult<Option<AdminSession>> {
        let url = self.endpoint("auth/v1/signup")?;

        let response = self
            .authorize(self.client.post(url), None)
            .json(credentials)
            .send()
            .await?;

        let body: TokenResponse = check(response).await?.json().await?;
        if body.access_token.is_none() {
            info!(
                "Account {} created; awaiting email confirmation (user {})",
                credentials.email,
                body.id.as_deref().unwrap_or("unknown")
            );
            return Ok(None);
        }

        Ok(self.session_from(body))
    }

    async fn sign_out(&self, session: &AdminSession) -> BackendResult<()> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self
            .authorize(self.client.post(url), Some(session))
            .send()
            .await?;

        check(response).await?;
        info!("Signed out {}", session.user_id);
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for SupabaseClient {
    async fn subscribe(&self, table: &str) -> BackendResult<ChangeSubscription> {
        let url = realtime::socket_url(&self.base_url, &self.anon_key)?;
        realtime::subscribe(url, table, &self.anon_key).await
    }
}
