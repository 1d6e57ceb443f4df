//! Dealership catalog and listing administration backed by a managed
//! Supabase project.

pub mod admin;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod listings;
pub mod models;
pub mod site;
