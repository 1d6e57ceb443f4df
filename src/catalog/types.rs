use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Upper bound of the price slider
pub const MAX_PRICE: f64 = 2_000_000_000_000.0;
/// Oldest model year offered by the year filter
pub const MIN_YEAR: i32 = 1990;

/// Ordering options of the catalog sort selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    YearDesc,
    YearAsc,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Newest,
        SortKey::PriceAsc,
        SortKey::PriceDesc,
        SortKey::YearDesc,
        SortKey::YearAsc,
    ];

    /// Value used by the sort selector
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::PriceAsc => "price-low",
            SortKey::PriceDesc => "price-high",
            SortKey::YearDesc => "year-new",
            SortKey::YearAsc => "year-old",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Newest => "Newest First",
            SortKey::PriceAsc => "Price: Low to High",
            SortKey::PriceDesc => "Price: High to Low",
            SortKey::YearDesc => "Year: Newest First",
            SortKey::YearAsc => "Year: Oldest First",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| {
                let options: Vec<&str> = SortKey::ALL.iter().map(SortKey::as_str).collect();
                format!("unknown sort '{}' (expected one of: {})", s, options.join(", "))
            })
    }
}

/// User-supplied catalog parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub search: String,
    pub brand: Option<String>,
    pub price_range: (f64, f64),
    pub year_range: (i32, i32),
    pub sort: SortKey,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            brand: None,
            price_range: (0.0, MAX_PRICE),
            year_range: default_year_range(),
            sort: SortKey::default(),
        }
    }
}

impl CatalogQuery {
    pub fn price_bounds(&self) -> RangeInclusive<f64> {
        self.price_range.0..=self.price_range.1
    }

    pub fn year_bounds(&self) -> RangeInclusive<i32> {
        self.year_range.0..=self.year_range.1
    }
}

/// 1990 through the current calendar year
pub fn default_year_range() -> (i32, i32) {
    (MIN_YEAR, Utc::now().year())
}
