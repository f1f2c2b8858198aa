//! Appointment pipeline: SKU date normalization, variation cleaning and
//! collation into the list that gets cached and rendered.

pub mod clean;
pub mod collate;
pub mod date;
mod types;

pub use clean::{clean_product_variations, DEFAULT_INDIVIDUAL_MARKER};
pub use collate::collate_today;
pub use types::Appointment;
