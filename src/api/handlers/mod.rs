//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod health;
pub mod links;
pub mod redirect;
pub mod stats;

pub use health::health_handler;
pub use links::{delete_link_handler, regenerate_link_handler, shorten_handler, update_link_handler};
pub use redirect::redirect_handler;
pub use stats::{expired_links_handler, popular_handler, search_handler, stats_handler};
