//! Resumable harvesting of listing pages from a JavaScript-rendered site.
//!
//! A [`runner::ResumableRunner`] walks an externally supplied identifier table, skips
//! identifiers already present in the [`store::JsonStore`], and has a
//! [`scrapers::RoomAssembler`] drive a rendered page through the detail, photos and
//! reviews sub-pages of every other listing.

pub mod config;
pub mod error;
pub mod input;
pub mod models;
pub mod runner;
pub mod scrapers;
pub mod store;

pub use config::HarvestConfig;
pub use error::{HarvestError, Result};
pub use models::{ListingId, ListingRecord, ReviewEntry, NA};
pub use runner::{ResumableRunner, RunReport};
pub use store::JsonStore;
