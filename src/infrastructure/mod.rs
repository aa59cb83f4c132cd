//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence and caching.
//!
//! # Modules
//!
//! - [`cache`] - Snapshot cache and popularity ranking (Redis, in-memory, no-op)
//! - [`persistence`] - Link stores (PostgreSQL, in-memory)

pub mod cache;
pub mod persistence;
