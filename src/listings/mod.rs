pub mod feed;

pub use feed::{FeedState, FetchOptions, ListingFeed, RefreshPolicy};
