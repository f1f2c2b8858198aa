use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::settings::Settings;

const API_PREFIX: &str = "/wp-json/wc/v3/";

/// Build the path of a WooCommerce v3 endpoint, e.g. `products` ->
/// `/wp-json/wc/v3/products`. The base URL is prepended by the client.
pub fn api_endpoint(short_endpoint: &str) -> String {
  format!("{}{}", API_PREFIX, short_endpoint.trim().trim_start_matches('/'))
}

/// Connection timeouts shared by every request of a session.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
  pub connect: Duration,
  pub request: Duration,
}

/// HTTP session against one shop: base URL, Basic auth with the consumer
/// key/secret and the JSON content type on every request.
#[derive(Clone)]
pub struct ShopClient {
  http: reqwest::Client,
  base_url: String,
  consumer_key: String,
  consumer_secret: String,
}

impl ShopClient {
  pub fn new(settings: &Settings, timeouts: Timeouts) -> color_eyre::Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .connect_timeout(timeouts.connect)
      .timeout(timeouts.request)
      .build()
      .map_err(|e| color_eyre::eyre::eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: settings.base_url.trim_end_matches('/').to_string(),
      consumer_key: settings.consumer_key.clone(),
      consumer_secret: settings.consumer_secret.clone(),
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn url_for(&self, path: &str) -> Result<Url, FetchError> {
    let raw = format!("{}{}", self.base_url, path);
    if self.base_url.is_empty() {
      return Err(FetchError::InvalidUrl {
        url: raw,
        reason: "no shop URL configured".to_string(),
      });
    }
    Url::parse(&raw).map_err(|e| FetchError::InvalidUrl {
      url: raw.clone(),
      reason: e.to_string(),
    })
  }

  /// GET a JSON document. Anything but `200 OK` is an error.
  pub async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T, FetchError> {
    let url = self.url_for(path)?;
    let url_str = url.to_string();
    debug!(url = %url_str, "GET");

    let response = self
      .http
      .get(url)
      .query(query)
      .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
      .send()
      .await
      .map_err(|source| FetchError::Transport {
        url: url_str.clone(),
        source,
      })?;

    if response.status() != StatusCode::OK {
      return Err(FetchError::HttpStatus {
        url: url_str,
        status: response.status().as_u16(),
      });
    }

    let body = response
      .bytes()
      .await
      .map_err(|source| FetchError::Transport {
        url: url_str.clone(),
        source,
      })?;

    serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
      url: url_str,
      source,
    })
  }

  /// Issue all GETs concurrently and wait for every one of them.
  ///
  /// Each request resolves on its own; one failure doesn't cancel or hide
  /// the others. Results come back in request order, tagged with their key.
  pub async fn get_many<K, T>(
    &self,
    requests: Vec<(K, String)>,
    query: &[(&str, String)],
  ) -> Vec<(K, Result<T, FetchError>)>
  where
    T: DeserializeOwned,
  {
    let pending = requests.into_iter().map(|(key, path)| async move {
      let result = self.get_json(&path, query).await;
      (key, result)
    });
    join_all(pending).await
  }
}
