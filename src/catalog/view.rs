use crate::catalog::engine;
use crate::catalog::types::{default_year_range, CatalogQuery, SortKey, MAX_PRICE};
use crate::config::DEFAULT_PAGE_SIZE;
use crate::models::Listing;

/// Catalog page state: the source list, the active query and how many
/// results are revealed so far.
///
/// Results are recomputed whenever the source or the query changes, and
/// every such change collapses the reveal window back to one page.
#[derive(Debug, Clone)]
pub struct CatalogView {
    listings: Vec<Listing>,
    query: CatalogQuery,
    matches: Vec<usize>,
    page_size: usize,
    revealed: usize,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl CatalogView {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            listings: Vec::new(),
            query: CatalogQuery::default(),
            matches: Vec::new(),
            page_size,
            revealed: page_size,
        }
    }

    pub fn query(&self) -> &CatalogQuery {
        &self.query
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn revealed(&self) -> usize {
        self.revealed
    }

    /// New data from the fetch collaborator
    pub fn replace_listings(&mut self, listings: Vec<Listing>) {
        self.listings = listings;
        self.recompute();
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.query.search = term.into();
        self.recompute();
    }

    /// `None` or an empty string means all brands
    pub fn set_brand(&mut self, brand: Option<String>) {
        self.query.brand = brand.filter(|b| !b.is_empty());
        self.recompute();
    }

    pub fn set_price_range(&mut self, min: f64, max: f64) {
        self.query.price_range = (min, max);
        self.recompute();
    }

    pub fn set_year_range(&mut self, min: i32, max: i32) {
        self.query.year_range = (min, max);
        self.recompute();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.query.sort = sort;
        self.recompute();
    }

    pub fn set_query(&mut self, query: CatalogQuery) {
        self.query = query;
        self.recompute();
    }

    /// One-click reset offered by the empty state
    pub fn clear_search(&mut self) {
        self.set_search(String::new());
    }

    /// Back to the full catalog, keeping the chosen sort
    pub fn reset_filters(&mut self) {
        let sort = self.query.sort;
        self.query = CatalogQuery {
            search: String::new(),
            brand: None,
            price_range: (0.0, MAX_PRICE),
            year_range: default_year_range(),
            sort,
        };
        self.recompute();
    }

    /// Grow the window by one page, as when the viewport hits the bottom.
    /// Returns whether anything new was revealed.
    pub fn reveal_more(&mut self) -> bool {
        if !self.has_more() {
            return false;
        }
        self.revealed += self.page_size;
        true
    }

    pub fn has_more(&self) -> bool {
        self.revealed < self.matches.len()
    }

    pub fn filtered_count(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The revealed window of filtered, sorted listings
    pub fn visible(&self) -> Vec<&Listing> {
        self.matches
            .iter()
            .take(self.revealed)
            .map(|&i| &self.listings[i])
            .collect()
    }

    pub fn brands(&self) -> Vec<String> {
        engine::brands(&self.listings)
    }

    /// "3 cars found"
    pub fn results_label(&self) -> String {
        let count = self.filtered_count();
        format!("{} car{} found", count, if count == 1 { "" } else { "s" })
    }

    fn recompute(&mut self) {
        self.matches = engine::matching_indices(&self.listings, &self.query);
        self.revealed = self.page_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Price;
    use chrono::{Duration, TimeZone, Utc};

    fn inventory(n: usize) -> Vec<Listing> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let at = start - Duration::hours(i as i64);
                Listing {
                    id: format!("car-{i}"),
                    brand: if i % 2 == 0 { "Toyota" } else { "Honda" }.to_string(),
                    model: format!("Model {i}"),
                    year: 2000 + (i % 20) as i32,
                    price: Price::Number(1_000_000.0 + i as f64),
                    description: None,
                    image_url: None,
                    image_urls: None,
                    created_at: at,
                    updated_at: at,
                }
            })
            .collect()
    }

    #[test]
    fn reveals_one_page_at_a_time() {
        let mut view = CatalogView::new(12);
        view.replace_listings(inventory(30));

        assert_eq!(view.visible().len(), 12);
        assert!(view.reveal_more());
        assert_eq!(view.visible().len(), 24);
        assert!(view.reveal_more());
        assert_eq!(view.visible().len(), 30);
        assert!(!view.has_more());
        assert!(!view.reveal_more());
        assert_eq!(view.revealed(), 36);
        assert_eq!(view.visible().len(), 30);
    }

    #[test]
    fn search_change_resets_reveal_count() {
        let mut view = CatalogView::new(5);
        view.replace_listings(inventory(20));
        view.reveal_more();
        view.reveal_more();
        assert_eq!(view.revealed(), 15);

        view.set_search("model");
        assert_eq!(view.revealed(), 5);

        view.reveal_more();
        view.set_search("model 1");
        assert_eq!(view.revealed(), 5);
    }

    #[test]
    fn any_filter_change_and_new_data_reset_reveal_count() {
        let mut view = CatalogView::new(4);
        view.replace_listings(inventory(20));

        let changes: Vec<Box<dyn Fn(&mut CatalogView)>> = vec![
            Box::new(|v: &mut CatalogView| v.set_brand(Some("Toyota".into()))),
            Box::new(|v: &mut CatalogView| v.set_price_range(0.0, 2_000_000.0)),
            Box::new(|v: &mut CatalogView| v.set_year_range(2000, 2020)),
            Box::new(|v: &mut CatalogView| v.set_sort(SortKey::YearAsc)),
            Box::new(|v: &mut CatalogView| v.replace_listings(inventory(18))),
        ];
        for change in changes {
            view.reveal_more();
            assert!(view.revealed() > 4);
            change(&mut view);
            assert_eq!(view.revealed(), 4);
        }
    }

    #[test]
    fn visible_items_are_unique() {
        let mut view = CatalogView::new(7);
        view.replace_listings(inventory(20));
        while view.reveal_more() {}

        let mut ids: Vec<&str> = view.visible().iter().map(|l| l.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn empty_state_and_resets() {
        let mut view = CatalogView::new(12);
        view.replace_listings(inventory(3));
        view.set_search("ferrari");
        assert!(view.is_empty());
        assert_eq!(view.results_label(), "0 cars found");

        view.clear_search();
        assert_eq!(view.results_label(), "3 cars found");

        view.set_brand(Some("Honda".into()));
        assert_eq!(view.results_label(), "1 car found");
        view.set_sort(SortKey::PriceDesc);
        view.reset_filters();
        assert_eq!(view.filtered_count(), 3);
        assert_eq!(view.query().sort, SortKey::PriceDesc);
        assert_eq!(view.brands(), vec!["Honda", "Toyota"]);
    }
}
