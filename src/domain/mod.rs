//! Domain layer containing business entities and contracts.
//!
//! This module defines entities, the store contract and caller identity,
//! independent of infrastructure concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`caller`] - Caller identity and the mutation capability check
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by infrastructure layer
//! - Business logic is encapsulated in services (see [`crate::application::services`])
//!
//! # Link Lifecycle
//!
//! `Active → Expired → Deleted`. `Expired` is never stored: it is computed on
//! read from `expires_at` and immediately folds into a deletion.

pub mod caller;
pub mod entities;
pub mod repositories;
