pub mod engine;
pub mod types;
pub mod view;

pub use engine::{apply, brands};
pub use types::{CatalogQuery, SortKey, MAX_PRICE, MIN_YEAR};
pub use view::CatalogView;
