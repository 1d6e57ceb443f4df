use crate::models::{format_price, Listing};

/// Totals shown above the admin table
#[derive(Debug, Clone, PartialEq)]
pub struct InventorySummary {
    pub total_listings: usize,
    pub total_value: f64,
}

impl InventorySummary {
    /// Invalid or negative prices count as zero
    pub fn from_listings(listings: &[Listing]) -> Self {
        Self {
            total_listings: listings.len(),
            total_value: listings.iter().map(|l| l.price.display_amount()).sum(),
        }
    }

    pub fn total_value_text(&self) -> String {
        format_price(self.total_value)
    }
}

/// One line of the admin listings table
#[derive(Debug, Clone, PartialEq)]
pub struct AdminTableRow {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub thumbnail: Option<String>,
    pub year: i32,
    pub price: String,
    pub added: String,
}

impl From<&Listing> for AdminTableRow {
    fn from(listing: &Listing) -> Self {
        Self {
            id: listing.id.clone(),
            title: listing.title(),
            summary: listing
                .description
                .as_deref()
                .and_then(|d| d.lines().next())
                .map(str::to_string),
            thumbnail: listing.image_url.clone(),
            year: listing.year,
            price: listing.price.to_string(),
            added: listing.created_at.format("%d/%m/%Y").to_string(),
        }
    }
}

pub fn table_rows(listings: &[Listing]) -> Vec<AdminTableRow> {
    listings.iter().map(AdminTableRow::from).collect()
}
