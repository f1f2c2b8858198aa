//! Normalization of the date ranges shops embed in variation SKUs.
//!
//! SKUs look like `"01.03.24 - 03.03.24 (Weekend)"`: one or two `D.M.Y`
//! dates, an optional parenthetical suffix, and sometimes an en dash instead
//! of a hyphen.

use chrono::NaiveDate;

use crate::error::DateParseError;

const DISPLAY_FORMAT: &str = "%d.%m.%Y";
const SORTABLE_FORMAT: &str = "%Y.%m.%d";

/// Separator between the start and end date in both rendered forms.
pub const RANGE_SEPARATOR: &str = " - ";

/// A normalized SKU date: a single day or a start/end pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
  pub start: NaiveDate,
  /// `None` when the SKU named a single day.
  pub end: Option<NaiveDate>,
}

impl DateSpan {
  /// `DD.MM.YYYY[ - DD.MM.YYYY]`
  pub fn display(&self) -> String {
    self.render(DISPLAY_FORMAT)
  }

  /// `YYYY.MM.DD[ - YYYY.MM.DD]`, lexicographic order equals chronological order.
  pub fn sortable(&self) -> String {
    self.render(SORTABLE_FORMAT)
  }

  fn render(&self, format: &str) -> String {
    match self.end {
      Some(end) => format!(
        "{}{}{}",
        self.start.format(format),
        RANGE_SEPARATOR,
        end.format(format)
      ),
      None => self.start.format(format).to_string(),
    }
  }
}

/// Format a day the way sortable SKU dates are written, for comparisons.
pub fn sortable_day(date: NaiveDate) -> String {
  date.format(SORTABLE_FORMAT).to_string()
}

/// Parse the date range out of a SKU.
///
/// Everything from the first `(` on is discarded. Two-digit years are read as
/// `20YY`. Input that does not hold one or two well-formed dates is an error;
/// callers decide whether to skip it.
pub fn normalize_sku_date(sku: &str) -> Result<DateSpan, DateParseError> {
  let head = match sku.find('(') {
    Some(idx) => &sku[..idx],
    None => sku,
  };
  let head = head.replace(['\u{2013}', '\u{2014}'], "-");

  let tokens: Vec<&str> = head.split('-').map(str::trim).collect();
  match tokens.as_slice() {
    [single] => Ok(DateSpan {
      start: parse_token(single, sku)?,
      end: None,
    }),
    [start, end] => Ok(DateSpan {
      start: parse_token(start, sku)?,
      end: Some(parse_token(end, sku)?),
    }),
    _ => Err(DateParseError::TooManyDates(sku.to_string())),
  }
}

fn parse_token(token: &str, sku: &str) -> Result<NaiveDate, DateParseError> {
  if token.is_empty() {
    return Err(DateParseError::Empty(sku.to_string()));
  }

  let parts: Vec<&str> = token.split('.').collect();
  let &[day, month, year] = parts.as_slice() else {
    return Err(DateParseError::WrongArity(token.to_string()));
  };

  let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
  if !(all_digits(day) && all_digits(month) && all_digits(year)) {
    return Err(DateParseError::NotNumeric(token.to_string()));
  }

  let year = match year.len() {
    // Good until 2100.
    2 => format!("20{}", year),
    4 => year.to_string(),
    _ => return Err(DateParseError::YearLength(token.to_string())),
  };

  let invalid = || DateParseError::InvalidDate(token.to_string());
  let day: u32 = day.parse().map_err(|_| invalid())?;
  let month: u32 = month.parse().map_err(|_| invalid())?;
  let year: i32 = year.parse().map_err(|_| invalid())?;

  NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_range_with_suffix() {
    let span = normalize_sku_date("01.03.24 - 03.03.24 (special)").unwrap();
    assert_eq!(span.display(), "01.03.2024 - 03.03.2024");
    assert_eq!(span.sortable(), "2024.03.01 - 2024.03.03");
  }

  #[test]
  fn test_single_date() {
    let span = normalize_sku_date("15.11.2025").unwrap();
    assert_eq!(span.display(), "15.11.2025");
    assert_eq!(span.sortable(), "2025.11.15");
    assert_eq!(span.end, None);
  }

  #[test]
  fn test_en_dash_and_em_dash() {
    let en = normalize_sku_date("01.03.24 – 03.03.24").unwrap();
    let em = normalize_sku_date("01.03.24—03.03.24").unwrap();
    let plain = normalize_sku_date("01.03.24-03.03.24").unwrap();
    assert_eq!(en, plain);
    assert_eq!(em, plain);
  }

  #[test]
  fn test_sortable_is_reversed_display() {
    let span = normalize_sku_date("07.10.25 - 09.10.25").unwrap();
    let display = span.display();
    let sortable = span.sortable();
    for (shown, sorted) in display.split(RANGE_SEPARATOR).zip(sortable.split(RANGE_SEPARATOR)) {
      let mut parts: Vec<&str> = shown.split('.').collect();
      parts.reverse();
      assert_eq!(parts.join("."), sorted);
    }
    assert!(sortable.starts_with("2025."));
  }

  #[test]
  fn test_unpadded_input_is_padded() {
    let span = normalize_sku_date("1.3.24").unwrap();
    assert_eq!(span.display(), "01.03.2024");
    assert_eq!(span.sortable(), "2024.03.01");
  }

  #[test]
  fn test_malformed_tokens() {
    assert!(matches!(
      normalize_sku_date("Individuell"),
      Err(DateParseError::WrongArity(_))
    ));
    assert!(matches!(
      normalize_sku_date("aa.03.24"),
      Err(DateParseError::NotNumeric(_))
    ));
    assert!(matches!(
      normalize_sku_date("01.03.124"),
      Err(DateParseError::YearLength(_))
    ));
    assert!(matches!(
      normalize_sku_date("31.02.24"),
      Err(DateParseError::InvalidDate(_))
    ));
    assert!(matches!(
      normalize_sku_date("01.01.24 - 02.01.24 - 03.01.24"),
      Err(DateParseError::TooManyDates(_))
    ));
    assert!(matches!(
      normalize_sku_date("(only a note)"),
      Err(DateParseError::Empty(_))
    ));
  }
}
