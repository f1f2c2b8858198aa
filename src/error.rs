//! Error taxonomy for the fetch and normalization pipeline.
//!
//! Plumbing (config files, storage, server startup) reports through
//! `color_eyre::Result`; the types here are the failures the pipeline itself
//! decides on: which ones are logged and skipped, which ones empty a product.

use thiserror::Error;

/// A failed request against the shop API.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Connection, timeout or TLS failure.
  #[error("transport error for {url}: {source}")]
  Transport {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// The shop answered with something other than 200.
  #[error("unexpected status {status} for {url}")]
  HttpStatus { url: String, status: u16 },

  /// The body was not the JSON shape we expect.
  #[error("failed to decode response from {url}: {source}")]
  Decode {
    url: String,
    #[source]
    source: serde_json::Error,
  },

  /// Base URL missing or unusable, usually unconfigured settings.
  #[error("invalid request url '{url}': {reason}")]
  InvalidUrl { url: String, reason: String },
}

/// A SKU date token that could not be normalized.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateParseError {
  #[error("no date found in '{0}'")]
  Empty(String),

  #[error("more than two dates in '{0}'")]
  TooManyDates(String),

  #[error("date '{0}' is not in D.M.Y form")]
  WrongArity(String),

  #[error("date '{0}' has a non-numeric component")]
  NotNumeric(String),

  #[error("date '{0}' has a year that is neither 2 nor 4 digits")]
  YearLength(String),

  #[error("date '{0}' is not a calendar date")]
  InvalidDate(String),
}
