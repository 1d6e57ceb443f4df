use crate::catalog::types::{CatalogQuery, SortKey};
use crate::models::Listing;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Whether a listing passes every filter of the query.
///
/// `needle` is the trimmed, lowercased search term. Listings with an
/// unreadable price never match.
fn matches(listing: &Listing, query: &CatalogQuery, needle: &str) -> bool {
    let Some(price) = listing.price.amount() else {
        return false;
    };

    let matches_search = needle.is_empty()
        || listing.brand.to_lowercase().contains(needle)
        || listing.model.to_lowercase().contains(needle)
        || listing.year.to_string().contains(needle);

    let matches_brand = query
        .brand
        .as_deref()
        .map_or(true, |brand| brand.is_empty() || listing.brand == brand);

    matches_search
        && matches_brand
        && query.price_bounds().contains(&price)
        && query.year_bounds().contains(&listing.year)
}

fn compare(a: &Listing, b: &Listing, sort: SortKey) -> Ordering {
    let price = |l: &Listing| l.price.amount().unwrap_or(0.0);
    match sort {
        SortKey::Newest => b.created_at.cmp(&a.created_at),
        SortKey::PriceAsc => price(a).total_cmp(&price(b)),
        SortKey::PriceDesc => price(b).total_cmp(&price(a)),
        SortKey::YearDesc => b.year.cmp(&a.year),
        SortKey::YearAsc => a.year.cmp(&b.year),
    }
}

/// Positions in `listings` of the matching rows, in display order.
///
/// The sort is stable, so ties keep fetch order.
pub fn matching_indices(listings: &[Listing], query: &CatalogQuery) -> Vec<usize> {
    let needle = query.search.trim().to_lowercase();

    let mut indices: Vec<usize> = listings
        .iter()
        .enumerate()
        .filter(|(_, listing)| matches(listing, query, &needle))
        .map(|(i, _)| i)
        .collect();

    indices.sort_by(|&a, &b| compare(&listings[a], &listings[b], query.sort));
    indices
}

/// Filtered and sorted listings
pub fn apply<'a>(listings: &'a [Listing], query: &CatalogQuery) -> Vec<&'a Listing> {
    matching_indices(listings, query)
        .into_iter()
        .map(|i| &listings[i])
        .collect()
}

/// Distinct brands, alphabetically, for the brand filter
pub fn brands(listings: &[Listing]) -> Vec<String> {
    listings
        .iter()
        .map(|l| l.brand.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
