//! Fetches every product's variations and turns them into appointments.

use tracing::{info, instrument, warn};

use super::api_types::{ProductKey, RawVariation, ShopProduct};
use super::client::{api_endpoint, ShopClient};
use crate::appointments::{clean_product_variations, Appointment};

/// WooCommerce caps `per_page` at 100.
pub const MAX_PER_PAGE: u32 = 100;

/// List up to `max_products` products.
///
/// Failures are logged and yield no products: an unreachable shop renders as
/// "no appointments", never as an error page.
#[instrument(skip(client), fields(shop = %client.base_url()))]
pub async fn fetch_products(client: &ShopClient, max_products: u32) -> Vec<ShopProduct> {
  let per_page = max_products.clamp(1, MAX_PER_PAGE);
  match client
    .get_json::<Vec<ShopProduct>>(&api_endpoint("products"), &[("per_page", per_page.to_string())])
    .await
  {
    Ok(products) => products,
    Err(e) => {
      warn!(error = %e, "Failed to list products");
      Vec::new()
    }
  }
}

/// Fetch the variations of all products in one concurrent batch and clean
/// them.
///
/// A product whose request fails contributes nothing; the rest of the batch
/// is unaffected. The result is flattened in product order, not yet sorted.
#[instrument(skip_all, fields(products = products.len()))]
pub async fn fetch_variations_of_all_products(
  client: &ShopClient,
  products: &[ShopProduct],
  individual_marker: &str,
) -> Vec<Appointment> {
  if products.is_empty() {
    return Vec::new();
  }

  let requests: Vec<(String, String)> = products
    .iter()
    .map(|p| {
      let key = ProductKey::from(p).to_string();
      let path = api_endpoint(&format!("products/{}/variations", p.id));
      (key, path)
    })
    .collect();

  let responses = client
    .get_many::<String, Vec<RawVariation>>(
      requests,
      &[("per_page", MAX_PER_PAGE.to_string())],
    )
    .await;

  let mut appointments = Vec::new();
  for (key, result) in responses {
    let product: ProductKey = match key.parse() {
      Ok(product) => product,
      Err(e) => {
        warn!(key = %key, error = %e, "Dropping response with unreadable product key");
        continue;
      }
    };

    let variations = match result {
      Ok(variations) => variations,
      Err(e) => {
        warn!(product = %product, error = %e, "Failed to fetch variations");
        continue;
      }
    };

    let cleaned = clean_product_variations(&variations, &product, individual_marker);
    if !cleaned.is_empty() {
      appointments.extend(cleaned);
    }
  }

  appointments
}

/// Products, then their variations, cleaned. No retries here: a failed run
/// is retried by the next cache miss or scheduled refresh.
pub async fn fetch_all(
  client: &ShopClient,
  max_products: u32,
  individual_marker: &str,
) -> Vec<Appointment> {
  let products = fetch_products(client, max_products).await;
  let appointments = fetch_variations_of_all_products(client, &products, individual_marker).await;
  info!(
    products = products.len(),
    appointments = appointments.len(),
    "Fetched appointments from shop"
  );
  appointments
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::appointments::DEFAULT_INDIVIDUAL_MARKER;
  use crate::settings::Settings;
  use crate::shop::client::Timeouts;
  use serde_json::json;
  use std::time::Duration;
  use wiremock::matchers::{method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client(base_url: &str) -> ShopClient {
    let settings = Settings {
      consumer_key: "ck".to_string(),
      consumer_secret: "cs".to_string(),
      base_url: base_url.to_string(),
      ..Settings::default()
    };
    let timeouts = Timeouts {
      connect: Duration::from_secs(2),
      request: Duration::from_secs(2),
    };
    ShopClient::new(&settings, timeouts).unwrap()
  }

  async fn mount_products(server: &MockServer, products: serde_json::Value) {
    Mock::given(method("GET"))
      .and(path("/wp-json/wc/v3/products"))
      .respond_with(ResponseTemplate::new(200).set_body_json(products))
      .mount(server)
      .await;
  }

  async fn mount_variations(server: &MockServer, id: u64, template: ResponseTemplate) {
    Mock::given(method("GET"))
      .and(path(format!("/wp-json/wc/v3/products/{}/variations", id)))
      .respond_with(template)
      .mount(server)
      .await;
  }

  fn session(sku: &str) -> serde_json::Value {
    json!({"status": "publish", "sku": sku, "permalink": format!("https://shop.example/{}", sku)})
  }

  #[tokio::test]
  async fn test_products_request_is_capped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/wp-json/wc/v3/products"))
      .and(query_param("per_page", "100"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "A"}])))
      .expect(1)
      .mount(&server)
      .await;

    let products = fetch_products(&client(&server.uri()), 500).await;
    assert_eq!(products, vec![ShopProduct { id: 1, name: "A".to_string() }]);
  }

  #[tokio::test]
  async fn test_product_listing_failure_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/wp-json/wc/v3/products"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let appointments = fetch_all(&client(&server.uri()), 18, DEFAULT_INDIVIDUAL_MARKER).await;
    assert!(appointments.is_empty());
  }

  #[tokio::test]
  async fn test_unreachable_shop_is_empty() {
    // Nothing listens on port 9 (discard) on test hosts.
    let appointments = fetch_all(&client("http://127.0.0.1:9"), 18, DEFAULT_INDIVIDUAL_MARKER).await;
    assert!(appointments.is_empty());
  }

  #[tokio::test]
  async fn test_one_failing_product_does_not_sink_the_batch() {
    let server = MockServer::start().await;
    mount_products(
      &server,
      json!([
        {"id": 1, "name": "One"},
        {"id": 2, "name": "Two"},
        {"id": 3, "name": "Three"},
        {"id": 4, "name": "Four"},
        {"id": 5, "name": "Five"}
      ]),
    )
    .await;
    for id in [1u64, 2, 4, 5] {
      mount_variations(
        &server,
        id,
        ResponseTemplate::new(200).set_body_json(json!([session(&format!("0{}.01.99", id))])),
      )
      .await;
    }
    mount_variations(&server, 3, ResponseTemplate::new(503)).await;

    let appointments = fetch_all(&client(&server.uri()), 18, DEFAULT_INDIVIDUAL_MARKER).await;
    let ids: Vec<&str> = appointments.iter().map(|a| a.product_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "4", "5"]);
    assert_eq!(appointments[1].training_name, "Two");
    assert_eq!(appointments[1].sku_date, "02.01.2099");
  }

  #[tokio::test]
  async fn test_slow_product_times_out_alone() {
    let server = MockServer::start().await;
    mount_products(&server, json!([{"id": 1, "name": "Fast"}, {"id": 2, "name": "Slow"}])).await;
    mount_variations(
      &server,
      1,
      ResponseTemplate::new(200).set_body_json(json!([session("01.01.99")])),
    )
    .await;
    mount_variations(
      &server,
      2,
      ResponseTemplate::new(200)
        .set_body_json(json!([session("02.01.99")]))
        .set_delay(Duration::from_secs(5)),
    )
    .await;

    let appointments = fetch_all(&client(&server.uri()), 18, DEFAULT_INDIVIDUAL_MARKER).await;
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].training_name, "Fast");
  }

  #[tokio::test]
  async fn test_malformed_body_counts_as_failure() {
    let server = MockServer::start().await;
    mount_products(&server, json!([{"id": 1, "name": "Broken"}, {"id": 2, "name": "Fine"}])).await;
    mount_variations(&server, 1, ResponseTemplate::new(200).set_body_string("<html>")).await;
    mount_variations(
      &server,
      2,
      ResponseTemplate::new(200).set_body_json(json!([session("01.01.99")])),
    )
    .await;

    let appointments = fetch_all(&client(&server.uri()), 18, DEFAULT_INDIVIDUAL_MARKER).await;
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].training_name, "Fine");
  }

  #[tokio::test]
  async fn test_filters_apply_per_product() {
    let server = MockServer::start().await;
    mount_products(&server, json!([{"id": 9, "name": "BDD"}])).await;
    mount_variations(
      &server,
      9,
      ResponseTemplate::new(200).set_body_json(json!([
        {"status": "draft", "sku": "01.01.99", "permalink": "x"},
        {"status": "publish", "sku": "Individuell", "permalink": "y"},
        session("03.01.99 - 04.01.99")
      ])),
    )
    .await;

    let appointments = fetch_all(&client(&server.uri()), 18, DEFAULT_INDIVIDUAL_MARKER).await;
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].reversed_sku_date, "2099.01.03 - 2099.01.04");
  }
}
