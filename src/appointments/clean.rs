//! Turns one product's raw variations into appointments.

use tracing::warn;

use super::date::normalize_sku_date;
use super::types::Appointment;
use crate::shop::api_types::{ProductKey, RawVariation};

/// Marker shops put in the SKU of on-request ("individual") bookings.
pub const DEFAULT_INDIVIDUAL_MARKER: &str = "individuell";

/// Whether a variation is a scheduled, published session.
///
/// The marker is matched case-insensitively. A blank marker matches nothing.
pub fn is_eligible(variation: &RawVariation, individual_marker: &str) -> bool {
  let marker = individual_marker.trim().to_lowercase();
  variation.is_published()
    && !variation.sku.trim().is_empty()
    && (marker.is_empty() || !variation.sku.to_lowercase().contains(&marker))
}

/// Filter and map the variations of a single product, keeping input order.
///
/// Variations whose SKU date can't be parsed are logged and skipped.
pub fn clean_product_variations(
  variations: &[RawVariation],
  product: &ProductKey,
  individual_marker: &str,
) -> Vec<Appointment> {
  variations
    .iter()
    .filter(|v| is_eligible(v, individual_marker))
    .filter_map(|v| match normalize_sku_date(&v.sku) {
      Ok(span) => Some(Appointment {
        product_id: product.id.to_string(),
        training_name: product.name.clone(),
        sku_date: span.display(),
        reversed_sku_date: span.sortable(),
        permalink: v.permalink.clone(),
      }),
      Err(e) => {
        warn!(product = %product, sku = %v.sku, error = %e, "Skipping variation with unreadable date");
        None
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn variation(status: &str, sku: &str) -> RawVariation {
    RawVariation {
      status: status.to_string(),
      sku: sku.to_string(),
      permalink: format!("https://shop.example/{}", sku.replace(' ', "")),
    }
  }

  fn product() -> ProductKey {
    ProductKey {
      id: 42,
      name: "Testing Fundamentals".to_string(),
    }
  }

  #[test]
  fn test_maps_published_variation() {
    let out = clean_product_variations(
      &[variation("publish", "01.03.24 - 03.03.24 (special)")],
      &product(),
      DEFAULT_INDIVIDUAL_MARKER,
    );
    assert_eq!(
      out,
      vec![Appointment {
        product_id: "42".to_string(),
        training_name: "Testing Fundamentals".to_string(),
        sku_date: "01.03.2024 - 03.03.2024".to_string(),
        reversed_sku_date: "2024.03.01 - 2024.03.03".to_string(),
        permalink: "https://shop.example/01.03.24-03.03.24(special)".to_string(),
      }]
    );
  }

  #[test]
  fn test_drops_drafts_and_individual_bookings() {
    let out = clean_product_variations(
      &[
        variation("draft", "01.03.24"),
        variation("publish", "Individuell"),
        variation("publish", "INDIVIDUELL 01.03.24"),
        variation("private", "02.03.24"),
      ],
      &product(),
      DEFAULT_INDIVIDUAL_MARKER,
    );
    assert!(out.is_empty());
  }

  #[test]
  fn test_skips_unparseable_dates_but_keeps_the_rest() {
    let out = clean_product_variations(
      &[
        variation("publish", "05.05.25"),
        variation("publish", "on request"),
        variation("publish", "01.04.25"),
      ],
      &product(),
      DEFAULT_INDIVIDUAL_MARKER,
    );
    let dates: Vec<&str> = out.iter().map(|a| a.sku_date.as_str()).collect();
    assert_eq!(dates, vec!["05.05.2025", "01.04.2025"]);
  }

  #[test]
  fn test_blank_marker_matches_nothing() {
    let published = variation("publish", "01.03.99");
    assert!(is_eligible(&published, ""));
    assert!(is_eligible(&published, "  "));

    let out = clean_product_variations(&[published], &product(), "");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].sku_date, "01.03.2099");
  }

  #[test]
  fn test_empty_sku_is_not_eligible() {
    assert!(!is_eligible(&variation("publish", ""), DEFAULT_INDIVIDUAL_MARKER));
    assert!(!is_eligible(&variation("publish", "   "), DEFAULT_INDIVIDUAL_MARKER));
  }

  #[test]
  fn test_custom_marker() {
    let out = clean_product_variations(
      &[variation("publish", "01.03.24 (Inhouse)")],
      &product(),
      "inhouse",
    );
    assert!(out.is_empty());
  }
}
