//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls,
//! cache capabilities, validation and access rules. Services consume
//! repository and cache traits and provide a clean API for HTTP handlers and
//! the admin CLI.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Link lifecycle, expiry and popularity
//! - [`services::auth_service::AuthService`] - API token authentication

pub mod services;
