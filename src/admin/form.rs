use crate::backend::{BackendError, BackendResult};
use crate::catalog::MIN_YEAR;
use crate::models::{Listing, ListingRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use std::path::Path;

/// Editable fields of the listing form, as typed by the admin
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: String,
    pub description: String,
}

impl Default for ListingDraft {
    fn default() -> Self {
        Self {
            brand: String::new(),
            model: String::new(),
            year: Utc::now().year(),
            price: String::new(),
            description: String::new(),
        }
    }
}

impl ListingDraft {
    /// Prefill from the listing being edited
    pub fn from_listing(listing: &Listing) -> Self {
        let price = match listing.price.amount() {
            Some(value) => value.to_string(),
            None => String::new(),
        };

        Self {
            brand: listing.brand.clone(),
            model: listing.model.clone(),
            year: listing.year,
            price,
            description: listing.description.clone().unwrap_or_default(),
        }
    }

    /// Input constraints of the form: required text fields, year between
    /// 1990 and `current_year`, non-negative price. Returns the parsed price.
    pub fn validate(&self, current_year: i32) -> BackendResult<f64> {
        if self.brand.trim().is_empty() {
            return Err(BackendError::Validation("Brand is required".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(BackendError::Validation("Model is required".to_string()));
        }
        if !(MIN_YEAR..=current_year).contains(&self.year) {
            return Err(BackendError::Validation(format!(
                "Year must be between {} and {}",
                MIN_YEAR, current_year
            )));
        }

        match self.price.trim().parse::<f64>() {
            Ok(price) if price.is_finite() && price >= 0.0 => Ok(price),
            _ => Err(BackendError::Validation(
                "Price must be a non-negative number".to_string(),
            )),
        }
    }

    /// Row to write, with the final gallery. The first image doubles as the
    /// single-image field read by older clients.
    pub fn to_record(&self, images: Vec<String>, now: DateTime<Utc>) -> BackendResult<ListingRecord> {
        let price = self.validate(now.year())?;
        let description = self.description.trim();

        Ok(ListingRecord {
            brand: self.brand.trim().to_string(),
            model: self.model.trim().to_string(),
            year: self.year,
            price,
            description: (!description.is_empty()).then(|| description.to_string()),
            image_url: images.first().cloned(),
            image_urls: (!images.is_empty()).then_some(images),
            updated_at: now,
        })
    }
}

/// A file picked in the form, not yet uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl NewImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self::new(file_name, bytes))
    }
}

/// Gallery being edited: images already stored plus files waiting to upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSelection {
    existing: Vec<String>,
    pending: Vec<NewImage>,
}

impl ImageSelection {
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            existing: listing.images(),
            pending: Vec::new(),
        }
    }

    pub fn existing(&self) -> &[String] {
        &self.existing
    }

    pub fn pending(&self) -> &[NewImage] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.existing.is_empty() && self.pending.is_empty()
    }

    pub fn add_files(&mut self, files: impl IntoIterator<Item = NewImage>) {
        self.pending.extend(files);
    }

    pub fn remove_existing(&mut self, index: usize) -> Option<String> {
        (index < self.existing.len()).then(|| self.existing.remove(index))
    }

    pub fn remove_new(&mut self, index: usize) -> Option<NewImage> {
        (index < self.pending.len()).then(|| self.pending.remove(index))
    }

    /// Label of the upload area
    pub fn upload_prompt(&self) -> &'static str {
        if self.is_empty() {
            "Upload Car Images"
        } else {
            "Add More Images"
        }
    }
}

/// Create/edit form for one listing
#[derive(Debug, Clone, Default)]
pub struct ListingForm {
    pub editing: Option<Listing>,
    pub draft: ListingDraft,
    pub images: ImageSelection,
    pub error: Option<String>,
    pub is_submitting: bool,
}

impl ListingForm {
    pub fn create() -> Self {
        Self::default()
    }

    pub fn edit(listing: &Listing) -> Self {
        Self {
            editing: Some(listing.clone()),
            draft: ListingDraft::from_listing(listing),
            images: ImageSelection::from_listing(listing),
            error: None,
            is_submitting: false,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.editing.is_some()
    }

    pub fn title(&self) -> &'static str {
        if self.is_edit() {
            "Edit Car"
        } else {
            "Add New Car"
        }
    }
}
