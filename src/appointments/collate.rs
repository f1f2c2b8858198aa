//! Merges the appointments of all products into the list we cache.

use chrono::{Local, NaiveDate};
use std::collections::HashSet;

use super::date::sortable_day;
use super::types::Appointment;

/// Sort ascending by start date, keep the first appointment per product and
/// drop those starting before `today`.
pub fn collate(mut appointments: Vec<Appointment>, today: NaiveDate) -> Vec<Appointment> {
  // Stable, so same-day entries keep fetch order.
  appointments.sort_by(|a, b| a.start_key().cmp(b.start_key()));

  let mut seen = HashSet::new();
  appointments.retain(|a| seen.insert(a.product_id.clone()));

  remove_past(appointments, today)
}

/// [`collate`] against the local calendar date.
pub fn collate_today(appointments: Vec<Appointment>) -> Vec<Appointment> {
  collate(appointments, Local::now().date_naive())
}

/// Expects input sorted ascending; stops at the first entry not in the past.
fn remove_past(appointments: Vec<Appointment>, today: NaiveDate) -> Vec<Appointment> {
  let today = sortable_day(today);
  let first_current = appointments
    .iter()
    .position(|a| a.start_key() >= today.as_str())
    .unwrap_or(appointments.len());
  appointments.into_iter().skip(first_current).collect()
}
