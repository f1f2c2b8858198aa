//! HTML for the `[show_training]` shortcode.

use serde::Serialize;

use crate::appointments::Appointment;
use crate::settings::DisplayMode;

/// How many appointments "next three" shows.
const NEXT_APPOINTMENTS: usize = 3;

/// Data handed to the browser next to the rendered markup.
#[derive(Debug, Serialize)]
struct ScriptData<'a> {
  #[serde(rename = "APPOINTMENTS")]
  appointments: &'a [Appointment],
  #[serde(rename = "SHOW_ALL")]
  show_all: bool,
}

/// Render the appointments container. No appointments render as nothing at
/// all, so the page simply has no section.
pub fn render(appointments: &[Appointment], mode: DisplayMode) -> String {
  if appointments.is_empty() {
    return String::new();
  }

  let show_all = mode.shows_all();
  let shown = if show_all {
    appointments
  } else {
    &appointments[..appointments.len().min(NEXT_APPOINTMENTS)]
  };

  let mut html = String::from("<div id=\"next-appointments\" class=\"wrap\">");
  for appointment in shown {
    html.push_str(&format!(
      "<p><a href=\"{}\"><b>{}</b><br/>{}</a></p>",
      html_escape(&appointment.permalink),
      html_escape(&appointment.sku_date),
      html_escape(&appointment.training_name),
    ));
  }
  html.push_str("</div>");

  let data = ScriptData {
    appointments: shown,
    show_all,
  };
  // Serializing plain strings and bools can't fail.
  let json = serde_json::to_string(&data).unwrap_or_else(|_| "{}".to_string());
  html.push_str(&format!(
    "<script>const SCRIPT_DATA = {};</script>",
    escape_script(&json)
  ));
  html
}

fn html_escape(s: &str) -> String {
  s.replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
    .replace('\'', "&#x27;")
}

/// Keep JSON from closing the script element early.
fn escape_script(json: &str) -> String {
  json.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn appointment(n: u32) -> Appointment {
    Appointment {
      product_id: n.to_string(),
      training_name: format!("Training {}", n),
      sku_date: format!("0{}.01.2099", n),
      reversed_sku_date: format!("2099.01.0{}", n),
      permalink: format!("https://shop.example/p/{}", n),
    }
  }

  #[test]
  fn test_empty_renders_nothing() {
    assert_eq!(render(&[], DisplayMode::NextThreeAppointments), "");
  }

  #[test]
  fn test_next_three_limits_output() {
    let appointments: Vec<_> = (1..=5).map(appointment).collect();
    let html = render(&appointments, DisplayMode::NextThreeAppointments);
    assert_eq!(html.matches("<p>").count(), 3);
    assert!(html.contains("Training 3"));
    assert!(!html.contains("Training 4"));
    assert!(html.contains("\"SHOW_ALL\":false"));
  }

  #[test]
  fn test_one_per_training_shows_all() {
    let appointments: Vec<_> = (1..=5).map(appointment).collect();
    let html = render(&appointments, DisplayMode::OneAppointmentPerTraining);
    assert_eq!(html.matches("<p>").count(), 5);
    assert!(html.contains("\"SHOW_ALL\":true"));
  }

  #[test]
  fn test_entry_markup() {
    let html = render(&[appointment(1)], DisplayMode::NextThreeAppointments);
    assert!(html.starts_with(
      "<div id=\"next-appointments\" class=\"wrap\"><p><a href=\"https://shop.example/p/1\"><b>01.01.2099</b><br/>Training 1</a></p></div>"
    ));
  }

  #[test]
  fn test_escapes_shop_data() {
    let mut evil = appointment(1);
    evil.training_name = "<script>alert('x')</script>".to_string();
    evil.permalink = "https://shop.example/\"onmouseover=\"x".to_string();
    let html = render(&[evil], DisplayMode::NextThreeAppointments);
    assert!(html.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"));
    assert!(html.contains("&quot;onmouseover=&quot;x"));
    assert!(!html.contains("</script></script>"));
    assert_eq!(html.matches("</script>").count(), 1);
  }
}
