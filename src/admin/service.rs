use crate::admin::form::{ListingDraft, ListingForm, NewImage};
use crate::admin::upload::upload_images;
use crate::backend::{AdminSession, BackendResult, ListingTable, ObjectStorage};
use crate::models::Listing;
use chrono::{Datelike, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Create, edit and delete listings on behalf of a signed-in admin
#[derive(Clone)]
pub struct AdminService {
    table: Arc<dyn ListingTable>,
    storage: Arc<dyn ObjectStorage>,
}

impl AdminService {
    pub fn new(table: Arc<dyn ListingTable>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { table, storage }
    }

    /// Save a create or edit.
    ///
    /// New files are uploaded first; the row is only written once every
    /// upload has succeeded. Existing images come first in the gallery,
    /// followed by the new uploads.
    pub async fn save(
        &self,
        session: &AdminSession,
        editing: Option<&Listing>,
        draft: &ListingDraft,
        existing_images: &[String],
        new_images: &[NewImage],
    ) -> BackendResult<Listing> {
        draft.validate(Utc::now().year())?;

        let uploaded = upload_images(self.storage.as_ref(), new_images, session).await?;
        let images: Vec<String> = existing_images.iter().cloned().chain(uploaded).collect();
        let record = draft.to_record(images, Utc::now())?;

        match editing {
            Some(listing) => self.table.update(&listing.id, &record, session).await,
            None => self.table.insert(&record, session).await,
        }
    }

    /// Submit a form, recording any failure as the form's inline error
    pub async fn submit(&self, session: &AdminSession, form: &mut ListingForm) -> BackendResult<Listing> {
        form.is_submitting = true;
        form.error = None;

        let result = self
            .save(
                session,
                form.editing.as_ref(),
                &form.draft,
                form.images.existing(),
                form.images.pending(),
            )
            .await;

        form.is_submitting = false;
        if let Err(e) = &result {
            warn!("Form submission error: {}", e);
            form.error = Some(e.message().to_string());
        }
        result
    }

    /// Remove a listing's images from storage, then its row.
    ///
    /// Image cleanup is best effort: a storage failure is logged and the row
    /// is deleted anyway, which can leave orphaned objects behind.
    pub async fn delete(&self, session: &AdminSession, listing: &Listing) -> BackendResult<()> {
        let names: Vec<String> = listing
            .images()
            .iter()
            .filter_map(|url| self.storage.object_name(url))
            .collect();

        if !names.is_empty() {
            if let Err(e) = self.storage.remove(&names, session).await {
                warn!("Could not remove images of listing {}: {}", listing.id, e);
            }
        }

        self.table.delete(&listing.id, session).await?;
        info!("Deleted {} ({})", listing.title(), listing.id);
        Ok(())
    }
}

/// Question shown before a delete
pub fn delete_prompt(listing: &Listing) -> String {
    format!("Are you sure you want to delete {}?", listing.title())
}
