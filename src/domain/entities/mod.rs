//! Core domain entities representing the business data model.
//!
//! # Entity Types
//!
//! - [`Link`] - A short code mapped to a target URL, with usage metadata
//! - [`LinkStats`] - Usage snapshot returned by the stats query
//! - [`PopularityEntry`] - A code and its score in the popularity ranking
//!
//! # Design Pattern
//!
//! Creation and mutation inputs are separate types:
//! - `NewLink` - For creating new records
//! - `LinkUpdate` - For single atomic changes to an existing record

pub mod link;

pub use link::{Link, LinkStats, LinkUpdate, NewLink, PopularityEntry};
