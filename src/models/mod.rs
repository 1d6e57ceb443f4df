pub mod gallery;
pub mod price;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use gallery::Gallery;
pub use price::{format_price, Price};

/// Columns requested when reading the listings table
pub const LISTING_COLUMNS: &str =
    "id,model,brand,year,price,description,image_url,image_urls,created_at,updated_at";

/// A vehicle listing as stored by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub price: Price,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// "Brand Model", as shown on cards and the admin table
    pub fn title(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }

    /// Primary image followed by the additional images, without duplicates
    pub fn images(&self) -> Vec<String> {
        let mut images: Vec<String> = Vec::new();
        let candidates = self
            .image_url
            .iter()
            .chain(self.image_urls.iter().flatten());

        for url in candidates {
            if !url.is_empty() && !images.contains(url) {
                images.push(url.clone());
            }
        }

        images
    }
}

/// Row payload written on insert and update.
///
/// The backend owns `id` and `created_at`, so neither is part of the write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub updated_at: DateTime<Utc>,
}

impl ListingRecord {
    /// Materialize the row the backend would return for this record
    pub fn into_listing(self, id: String, created_at: DateTime<Utc>) -> Listing {
        Listing {
            id,
            brand: self.brand,
            model: self.model,
            year: self.year,
            price: Price::Number(self.price),
            description: self.description,
            image_url: self.image_url,
            image_urls: self.image_urls,
            created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn listing(image_url: Option<&str>, image_urls: Option<Vec<&str>>) -> Listing {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Listing {
            id: "1".to_string(),
            brand: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: 2020,
            price: Price::Number(5_000_000.0),
            description: None,
            image_url: image_url.map(str::to_string),
            image_urls: image_urls.map(|urls| urls.into_iter().map(str::to_string).collect()),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn images_put_primary_first_and_skip_duplicates() {
        let car = listing(Some("a.jpg"), Some(vec!["a.jpg", "b.jpg", "", "b.jpg", "c.jpg"]));
        assert_eq!(car.images(), vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn images_without_primary_use_the_list() {
        let car = listing(None, Some(vec!["b.jpg", "c.jpg"]));
        assert_eq!(car.images(), vec!["b.jpg", "c.jpg"]);
        assert!(listing(None, None).images().is_empty());
    }

    #[test]
    fn decodes_backend_row_with_string_price() {
        let row = serde_json::json!({
            "id": "9f1c",
            "model": "Accord",
            "brand": "Honda",
            "year": 2018,
            "price": "4000000",
            "description": null,
            "image_url": null,
            "image_urls": null,
            "created_at": "2024-05-02T10:11:12.345678+00:00",
            "updated_at": "2024-05-02T10:11:12.345678+00:00"
        });

        let car: Listing = serde_json::from_value(row).unwrap();
        assert_eq!(car.price, Price::Text("4000000".to_string()));
        assert_eq!(car.price.amount(), Some(4_000_000.0));
        assert_eq!(car.title(), "Honda Accord");
    }

    #[test]
    fn rows_without_a_usable_price_still_decode() {
        let row = |id: &str, price: Option<serde_json::Value>| {
            let mut row = serde_json::json!({
                "id": id,
                "model": "Camry",
                "brand": "Toyota",
                "year": 2020,
                "description": null,
                "image_url": null,
                "image_urls": null,
                "created_at": "2024-05-02T10:11:12+00:00",
                "updated_at": "2024-05-02T10:11:12+00:00"
            });
            if let Some(price) = price {
                row["price"] = price;
            }
            row
        };
        let rows = serde_json::Value::Array(vec![
            row("ok", Some(serde_json::json!(5000000))),
            row("null", Some(serde_json::Value::Null)),
            row("absent", None),
        ]);

        let cars: Vec<Listing> = serde_json::from_value(rows).unwrap();
        assert_eq!(cars.len(), 3);
        assert_eq!(cars[0].price.amount(), Some(5_000_000.0));
        assert_eq!(cars[1].price, Price::Missing);
        assert_eq!(cars[2].price, Price::Missing);
        assert_eq!(cars[2].price.to_string(), "₦0");
    }
}
