pub mod card;
pub mod contact;
pub mod route;

pub use card::{dial_link, ListingCard};
pub use contact::{ContactForm, Notice};
pub use route::{resolve_view, Route, View};
