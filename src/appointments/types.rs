use serde::{Deserialize, Serialize};

use super::date::RANGE_SEPARATOR;

/// A bookable training session, as cached and rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
  pub product_id: String,
  pub training_name: String,
  /// `DD.MM.YYYY[ - DD.MM.YYYY]`
  pub sku_date: String,
  /// `YYYY.MM.DD[ - YYYY.MM.DD]`
  pub reversed_sku_date: String,
  pub permalink: String,
}

impl Appointment {
  /// Sortable start date, e.g. `2024.03.01`.
  pub fn start_key(&self) -> &str {
    self
      .reversed_sku_date
      .split(RANGE_SEPARATOR.trim())
      .next()
      .unwrap_or_default()
      .trim()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn appointment(reversed: &str) -> Appointment {
    Appointment {
      product_id: "1".to_string(),
      training_name: "BDD".to_string(),
      sku_date: String::new(),
      reversed_sku_date: reversed.to_string(),
      permalink: String::new(),
    }
  }

  #[test]
  fn test_start_key_of_range() {
    assert_eq!(appointment("2024.03.01 - 2024.03.03").start_key(), "2024.03.01");
  }

  #[test]
  fn test_start_key_of_single_day() {
    assert_eq!(appointment("2024.03.01").start_key(), "2024.03.01");
  }
}
