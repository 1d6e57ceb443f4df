use crate::models::{Gallery, Listing};

const CLAMP_LINES: usize = 3;
const CLAMP_CHARS: usize = 150;

/// `tel:` link that opens the dialer
pub fn dial_link(phone: &str) -> String {
    let number: String = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    format!("tel:{}", number)
}

/// Catalog card for one listing
#[derive(Debug, Clone)]
pub struct ListingCard {
    pub title: String,
    pub year: i32,
    pub price: String,
    pub description: Option<String>,
    pub gallery: Gallery,
    pub show_full_description: bool,
    pub show_image_viewer: bool,
    call_link: String,
}

impl ListingCard {
    pub fn new(listing: &Listing, phone: &str) -> Self {
        Self {
            title: listing.title(),
            year: listing.year,
            price: listing.price.to_string(),
            description: listing.description.clone().filter(|d| !d.trim().is_empty()),
            gallery: Gallery::new(listing.images()),
            show_full_description: false,
            show_image_viewer: false,
            call_link: dial_link(phone),
        }
    }

    /// Long descriptions are clamped with a "View More" toggle
    pub fn is_description_long(&self) -> bool {
        self.description
            .as_deref()
            .map(|d| d.lines().count() > CLAMP_LINES || d.chars().count() > CLAMP_CHARS)
            .unwrap_or(false)
    }

    pub fn toggle_description(&mut self) {
        self.show_full_description = !self.show_full_description;
    }

    pub fn description_toggle_label(&self) -> Option<&'static str> {
        if !self.is_description_long() {
            return None;
        }
        Some(if self.show_full_description { "View Less" } else { "View More" })
    }

    /// Opening the viewer needs at least one image
    pub fn open_viewer(&mut self) -> bool {
        self.show_image_viewer = !self.gallery.is_empty();
        self.show_image_viewer
    }

    pub fn close_viewer(&mut self) {
        self.show_image_viewer = false;
    }

    /// Target of the "Call for Inspection" button
    pub fn call_link(&self) -> &str {
        &self.call_link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Price;
    use chrono::{TimeZone, Utc};

    fn listing(description: Option<&str>, images: Option<Vec<&str>>) -> Listing {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Listing {
            id: "1".into(),
            brand: "Lexus".into(),
            model: "RX 350".into(),
            year: 2019,
            price: Price::Text("18500000".into()),
            description: description.map(str::to_string),
            image_url: None,
            image_urls: images.map(|v| v.into_iter().map(str::to_string).collect()),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn dial_link_strips_formatting() {
        assert_eq!(dial_link("+234 916 253-4022"), "tel:+2349162534022");
    }

    #[test]
    fn card_formats_price_and_call_link() {
        let card = ListingCard::new(&listing(None, None), "+2349162534022");
        assert_eq!(card.title, "Lexus RX 350");
        assert_eq!(card.price, "₦18,500,000");
        assert_eq!(card.call_link(), "tel:+2349162534022");
    }

    #[test]
    fn long_descriptions_get_a_toggle() {
        let mut card = ListingCard::new(&listing(Some("a\nb\nc\nd"), None), "1");
        assert_eq!(card.description_toggle_label(), Some("View More"));
        card.toggle_description();
        assert_eq!(card.description_toggle_label(), Some("View Less"));

        let long = "x".repeat(151);
        assert!(ListingCard::new(&listing(Some(&long), None), "1").is_description_long());

        let short = ListingCard::new(&listing(Some("One owner."), None), "1");
        assert_eq!(short.description_toggle_label(), None);
    }

    #[test]
    fn viewer_needs_images() {
        let mut bare = ListingCard::new(&listing(None, None), "1");
        assert!(!bare.open_viewer());

        let mut card = ListingCard::new(&listing(None, Some(vec!["a.jpg", "b.jpg"])), "1");
        assert!(card.open_viewer());
        card.gallery.next();
        assert_eq!(card.gallery.current(), Some("b.jpg"));
        card.close_viewer();
        assert!(!card.show_image_viewer);
    }
}
