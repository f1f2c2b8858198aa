//! Serde-deserializable types matching WooCommerce REST API v3 responses.
//!
//! Only the fields the appointment pipeline reads are modelled; everything
//! else in the (large) product and variation payloads is ignored.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Status a variation must have to be bookable.
pub const PUBLISHED: &str = "publish";

/// Entry of `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShopProduct {
  pub id: u64,
  #[serde(default)]
  pub name: String,
}

/// Entry of `GET /products/{id}/variations`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVariation {
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub sku: String,
  #[serde(default)]
  pub permalink: String,
}

impl RawVariation {
  pub fn is_published(&self) -> bool {
    self.status == PUBLISHED
  }
}

/// Tags a variation request with its parent product, since variation
/// payloads don't repeat the product name.
///
/// Renders as `"{id}_x_{name}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductKey {
  pub id: u64,
  pub name: String,
}

const KEY_SEPARATOR: &str = "_x_";

impl From<&ShopProduct> for ProductKey {
  fn from(product: &ShopProduct) -> Self {
    ProductKey {
      id: product.id,
      name: product.name.clone(),
    }
  }
}

impl fmt::Display for ProductKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}{}", self.id, KEY_SEPARATOR, self.name)
  }
}

impl FromStr for ProductKey {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (id, name) = s
      .split_once(KEY_SEPARATOR)
      .ok_or_else(|| format!("missing '{}' in product key '{}'", KEY_SEPARATOR, s))?;
    let id = id
      .parse()
      .map_err(|e| format!("bad product id in key '{}': {}", s, e))?;
    Ok(ProductKey {
      id,
      name: name.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_product_key_keeps_separator_in_name() {
    let key = ProductKey {
      id: 12345,
      name: "BDD_x_Advanced".to_string(),
    };
    assert_eq!(key.to_string(), "12345_x_BDD_x_Advanced");
    assert_eq!("12345_x_BDD_x_Advanced".parse::<ProductKey>().unwrap(), key);
  }

  #[test]
  fn test_product_key_rejects_garbage() {
    assert!("BDD".parse::<ProductKey>().is_err());
    assert!("abc_x_BDD".parse::<ProductKey>().is_err());
  }

  #[test]
  fn test_variation_ignores_unknown_fields() {
    let body = r#"[{"id": 7, "status": "publish", "sku": "01.03.24", "permalink": "https://shop/p/7", "price": "10"}]"#;
    let variations: Vec<RawVariation> = serde_json::from_str(body).unwrap();
    assert_eq!(variations.len(), 1);
    assert!(variations[0].is_published());
    assert_eq!(variations[0].sku, "01.03.24");
  }
}
