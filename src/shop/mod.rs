//! WooCommerce shop access: API types, the HTTP session and the fetch
//! orchestration that produces raw appointments.

pub mod api_types;
pub mod client;
pub mod fetch;

pub use client::{ShopClient, Timeouts};
pub use fetch::fetch_all;
